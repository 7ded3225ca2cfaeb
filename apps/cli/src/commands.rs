//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use scriptcrew_core::assembler::save_script;
use scriptcrew_core::pipeline::{
    CREATIVE_CHAIN, FORMATTER_AGENT, REVIEWER_AGENT, WRITER_AGENT,
};
use scriptcrew_core::{ProgressReporter, SKELETON_FAILURE, ScriptPipeline, ScriptRun};
use scriptcrew_llm::OpenAiCompatClient;
use scriptcrew_shared::{
    AppConfig, CrewDefinition, LlmConfig, init_config, load_config, load_crew_definition,
};
use scriptcrew_tools::ToolRegistry;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// scriptcrew: long-form scripts from a crew of AI agents.
#[derive(Parser)]
#[command(
    name = "scriptcrew",
    version,
    about = "Generate long-form scripts on a category with a crew of language-model agents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a script for a category.
    Generate {
        /// Subject of the script, e.g. "Tecnologia e Privacidade".
        category: String,

        /// Crew definition YAML (defaults to `defaults.crew_config`).
        #[arg(long)]
        crew_config: Option<PathBuf>,

        /// Directory for the script file (defaults to `defaults.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the script without writing a file.
        #[arg(long)]
        no_save: bool,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Load and validate a crew definition.
    Validate {
        /// Crew definition YAML (defaults to `defaults.crew_config`).
        #[arg(long)]
        crew_config: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Model overrides. These win over the environment and the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct LlmArgs {
    /// Model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI-compatible base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "scriptcrew=info",
        1 => "scriptcrew=debug",
        _ => "scriptcrew=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            category,
            crew_config,
            out,
            no_save,
            llm,
        } => cmd_generate(&category, crew_config, out, no_save, &llm).await,
        Command::Validate { crew_config } => cmd_validate(crew_config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Flag → environment → config file → built-in default.
fn resolve_llm_config(config: &AppConfig, args: &LlmArgs) -> Result<LlmConfig> {
    Ok(apply_overrides(LlmConfig::from_env(config)?, args))
}

fn apply_overrides(mut llm: LlmConfig, args: &LlmArgs) -> LlmConfig {
    if let Some(model) = &args.model {
        llm.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        llm.base_url = base_url.clone();
    }
    if let Some(temperature) = args.temperature {
        llm.temperature = temperature;
    }
    llm
}

fn crew_config_path(config: &AppConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(&config.defaults.crew_config))
}

/// Check the parts of a definition the pipeline depends on by name.
fn check_pipeline_requirements(definition: &CrewDefinition) -> Result<()> {
    definition.require_tasks(&CREATIVE_CHAIN)?;
    definition.require_agents(&[FORMATTER_AGENT, WRITER_AGENT, REVIEWER_AGENT])?;
    Ok(())
}

async fn cmd_generate(
    category: &str,
    crew_config: Option<PathBuf>,
    out: Option<PathBuf>,
    no_save: bool,
    llm_args: &LlmArgs,
) -> Result<()> {
    let category = category.trim();
    if category.is_empty() {
        return Err(eyre!("category must not be empty"));
    }

    let config = load_config()?;
    let llm = resolve_llm_config(&config, llm_args)?;
    let crew_path = crew_config_path(&config, crew_config);
    let definition = load_crew_definition(&crew_path)?;

    info!(
        category,
        model = %llm.model,
        base_url = %llm.base_url,
        crew = %crew_path.display(),
        "generating script"
    );

    let model = Arc::new(OpenAiCompatClient::new(llm)?);
    let tools = ToolRegistry::new(&config)?;
    let pipeline = ScriptPipeline::with_model(definition, model, &tools, &config.defaults)?;

    let reporter = CliProgress::new();
    let outcome = pipeline.run(category, &reporter).await;
    reporter.clear();

    let Some(run) = outcome? else {
        println!("{SKELETON_FAILURE}");
        std::process::exit(1);
    };

    println!("{}", run.script);

    let saved = if no_save {
        None
    } else {
        let dir = out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));
        Some(save_script(&dir, category, &run.script)?)
    };

    print_summary(&run, saved.as_deref());
    Ok(())
}

fn print_summary(run: &ScriptRun, saved: Option<&Path>) {
    eprintln!();
    eprintln!("  Script generated successfully!");
    eprintln!("  Run:      {}", run.run_id);
    eprintln!("  Category: {}", run.category);
    eprintln!("  Topics:   {}", run.topics.len());
    eprintln!("  Chars:    {}", run.script.chars().count());
    if let Some(path) = saved {
        eprintln!("  Saved:    {}", path.display());
    }
    eprintln!(
        "  Time:     {:.1}s",
        run.elapsed.as_secs_f64()
    );
    eprintln!();
}

fn cmd_validate(crew_config: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let crew_path = crew_config_path(&config, crew_config);
    let definition = load_crew_definition(&crew_path)?;
    check_pipeline_requirements(&definition)?;

    println!("Crew definition OK: {}", crew_path.display());
    println!();
    println!("Agents ({}):", definition.agents.len());
    for (id, agent) in &definition.agents {
        let tools: Vec<&str> = agent.tools.iter().map(|t| t.as_str()).collect();
        let tools = if tools.is_empty() {
            "-".to_string()
        } else {
            tools.join(", ")
        };
        println!("  {id:<22} {:<40} tools: {tools}", agent.role);
    }
    println!();
    println!("Tasks ({}):", definition.tasks.len());
    for (id, task) in &definition.tasks {
        let context = task.context_ids().join(", ");
        println!(
            "  {id:<26} agent: {:<20} context: [{context}]",
            task.agent
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn topic_started(&self, topic: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Developing [{current}/{total}] {topic}"));
    }

    fn done(&self, _run: &ScriptRun) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_overrides() {
        let cli = Cli::try_parse_from([
            "scriptcrew",
            "-v",
            "generate",
            "Tecnologia e Privacidade",
            "--no-save",
            "--model",
            "qwen2.5:7b",
            "--temperature",
            "0.2",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Generate {
                category,
                no_save,
                llm,
                crew_config,
                ..
            } => {
                assert_eq!(category, "Tecnologia e Privacidade");
                assert!(no_save);
                assert_eq!(llm.model.as_deref(), Some("qwen2.5:7b"));
                assert_eq!(llm.temperature, Some(0.2));
                assert!(crew_config.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn flags_override_resolved_settings() {
        let args = LlmArgs {
            model: Some("mistral".into()),
            base_url: None,
            temperature: Some(0.1),
        };
        let resolved = LlmConfig::from_lookup(&AppConfig::default(), |_| None).unwrap();
        assert_eq!(resolved.model, "llama3:8b");

        let llm = apply_overrides(resolved, &args);
        assert_eq!(llm.model, "mistral");
        assert_eq!(llm.base_url, "http://localhost:11434/v1");
        assert!((llm.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn shipped_crew_meets_pipeline_requirements() {
        let definition =
            load_crew_definition(Path::new("../../config/crew.yaml")).unwrap();
        check_pipeline_requirements(&definition).unwrap();
    }

    #[test]
    fn crew_path_defaults_to_config() {
        let config = AppConfig::default();
        assert_eq!(crew_config_path(&config, None), PathBuf::from("config/crew.yaml"));
        assert_eq!(
            crew_config_path(&config, Some(PathBuf::from("x.yaml"))),
            PathBuf::from("x.yaml")
        );
    }
}
