//! Three-phase script pipeline: skeleton → topic development → assembly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use scriptcrew_llm::ChatModel;
use scriptcrew_shared::{
    CrewDefinition, DefaultsConfig, Result, RunId, ScriptCrewError,
};
use scriptcrew_tools::ToolRegistry;

use crate::agents::AgentRegistry;
use crate::assembler::{FRAGMENT_SEPARATOR, assemble};
use crate::crew::{Crew, CrewRunner, SequentialCrewRunner};
use crate::executor::AgentExecutor;
use crate::extract::extract_topics;
use crate::prompts;
use crate::tasks::{ExecutableTask, Inputs, TaskFactory};

pub const IDENTIFY_TRENDS: &str = "identify_current_trends";
pub const SELECT_THEME: &str = "select_viral_theme";
pub const WRITE_ENGAGEMENT: &str = "write_engagement_script";
pub const STRUCTURE_SCRIPT: &str = "structure_long_script";

/// The creative chain of Phase 1, in execution order.
pub const CREATIVE_CHAIN: [&str; 4] =
    [IDENTIFY_TRENDS, SELECT_THEME, WRITE_ENGAGEMENT, STRUCTURE_SCRIPT];

pub const FORMATTER_AGENT: &str = "list_json_formatter";
pub const WRITER_AGENT: &str = "provocative_writer";
pub const REVIEWER_AGENT: &str = "language_reviewer";

const STRUCTURE_TASK: &str = "structure_topics_json";
const DRAFT_TASK: &str = "draft_topic";
const REVIEW_TASK: &str = "review_topic";

/// Fragments of recent text shown to the writer.
pub const DEFAULT_CONTEXT_WINDOW: usize = 2;

/// Returned by [`ScriptPipeline::generate_long_script`] when no skeleton
/// could be produced.
pub const SKELETON_FAILURE: &str =
    "ERROR: Failed to generate the script skeleton in Phase 1. Check the logs.";

/// Phase 1 output.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    /// Engagement script, used verbatim as the first fragment.
    pub introduction: String,
    /// Free-text outline from the last creative task.
    pub raw_outline: String,
    /// Non-empty, ordered topic list.
    pub topics: Vec<String>,
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct ScriptRun {
    pub run_id: RunId,
    pub category: String,
    pub topics: Vec<String>,
    /// Introduction followed by one fragment per topic.
    pub fragments: Vec<String>,
    pub script: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each topic is drafted (1-based `current`).
    fn topic_started(&self, topic: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, run: &ScriptRun);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn topic_started(&self, _topic: &str, _current: usize, _total: usize) {}
    fn done(&self, _run: &ScriptRun) {}
}

/// Last `window` fragments joined with a blank line.
pub fn recent_context(fragments: &[String], window: usize) -> String {
    let start = fragments.len().saturating_sub(window);
    fragments[start..].join(FRAGMENT_SEPARATOR)
}

/// The orchestrator. One instance can serve any number of runs; each run
/// owns its own tasks and fragments.
pub struct ScriptPipeline {
    factory: TaskFactory,
    runner: Arc<dyn CrewRunner>,
    context_window: usize,
}

impl ScriptPipeline {
    /// Fails unless the definition carries every task and agent the
    /// pipeline drives directly.
    pub fn new(
        definition: CrewDefinition,
        agents: AgentRegistry,
        runner: Arc<dyn CrewRunner>,
    ) -> Result<Self> {
        definition.require_tasks(&CREATIVE_CHAIN)?;
        definition.require_agents(&[FORMATTER_AGENT, WRITER_AGENT, REVIEWER_AGENT])?;

        Ok(Self {
            factory: TaskFactory::new(definition.tasks, Arc::new(agents)),
            runner,
            context_window: DEFAULT_CONTEXT_WINDOW,
        })
    }

    /// Wire the production stack: agents bound to `model` and `tools`, run
    /// by a [`SequentialCrewRunner`].
    pub fn with_model(
        definition: CrewDefinition,
        model: Arc<dyn ChatModel>,
        tools: &ToolRegistry,
        defaults: &DefaultsConfig,
    ) -> Result<Self> {
        let agents = AgentRegistry::build(&definition, model, tools)?;
        let runner = Arc::new(SequentialCrewRunner::new(AgentExecutor::new(
            defaults.max_tool_iterations,
        )));
        Ok(Self::new(definition, agents, runner)?.with_context_window(defaults.context_window))
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    /// Generate a script, or [`SKELETON_FAILURE`] if Phase 1 produced no
    /// topics. Model and transport errors are returned as `Err`.
    pub async fn generate_long_script(&self, category: &str) -> Result<String> {
        Ok(match self.run(category, &SilentProgress).await? {
            Some(run) => run.script,
            None => SKELETON_FAILURE.to_string(),
        })
    }

    /// Run all three phases. `None` means Phase 1 produced no skeleton.
    #[instrument(skip_all, fields(category = %category))]
    pub async fn run(
        &self,
        category: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Option<ScriptRun>> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = RunId::new();

        info!(%run_id, "starting script generation");

        // --- Phase 1: Skeleton ---
        progress.phase("Generating skeleton");
        let Some(skeleton) = self.generate_skeleton(category).await? else {
            error!(%run_id, "phase 1 produced no skeleton, aborting run");
            return Ok(None);
        };

        // --- Phase 2: Topic development ---
        progress.phase("Developing topics");
        let fragments = self
            .develop_topics(&skeleton.introduction, &skeleton.topics, progress)
            .await?;

        // --- Phase 3: Assembly ---
        progress.phase("Assembling script");
        let script = assemble(&fragments);

        let run = ScriptRun {
            run_id,
            category: category.to_string(),
            topics: skeleton.topics,
            fragments,
            script,
            started_at,
            elapsed: start.elapsed(),
        };

        info!(
            run_id = %run.run_id,
            topics = run.topics.len(),
            chars = run.script.len(),
            elapsed_ms = run.elapsed.as_millis() as u64,
            "script generated"
        );

        progress.done(&run);
        Ok(Some(run))
    }

    /// Phase 1: run the creative chain, then structure its outline.
    ///
    /// Structuring problems (unparseable reply, missing or empty `topics`,
    /// missing introduction) are logged and yield `Ok(None)`. Crew failures
    /// propagate.
    #[instrument(skip(self))]
    pub async fn generate_skeleton(&self, category: &str) -> Result<Option<Skeleton>> {
        let chain = self.factory.create_chain(&CREATIVE_CHAIN)?;
        let crew = Crew::new("creative", chain)?;
        let inputs = Inputs::from([("category".to_string(), category.to_string())]);

        let creative = self.runner.kickoff(&crew, &inputs).await?;

        let Some(introduction) = creative.output_of(WRITE_ENGAGEMENT) else {
            warn!(task = WRITE_ENGAGEMENT, "creative crew returned no introduction");
            return Ok(None);
        };
        let introduction = introduction.raw.clone();
        let raw_outline = creative.raw;

        match self.structure_topics(&raw_outline).await {
            Ok(topics) => {
                info!(topics = topics.len(), "skeleton ready");
                Ok(Some(Skeleton {
                    introduction,
                    raw_outline,
                    topics,
                }))
            }
            Err(ScriptCrewError::Extraction(reason)) => {
                warn!(%reason, "could not structure the topic list");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Ask the formatter agent for `{"topics": [..]}` and parse it.
    #[instrument(skip_all, fields(outline_chars = raw_outline.len()))]
    pub async fn structure_topics(&self, raw_outline: &str) -> Result<Vec<String>> {
        let formatter = self.factory.agents().get(FORMATTER_AGENT)?;
        let task = ExecutableTask::inline(
            STRUCTURE_TASK,
            formatter,
            prompts::structuring_description(raw_outline),
            prompts::STRUCTURING_EXPECTED,
        );
        let crew = Crew::new("structuring", vec![task])?;

        let result = self.runner.kickoff(&crew, &Inputs::new()).await?;
        Ok(extract_topics(&result.raw)?)
    }

    /// Phase 2: draft and review each topic in order, seeded with the
    /// introduction. Any crew failure aborts the loop.
    #[instrument(skip_all, fields(topics = topics.len()))]
    pub async fn develop_topics(
        &self,
        introduction: &str,
        topics: &[String],
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<String>> {
        let writer = self.factory.agents().get(WRITER_AGENT)?;
        let reviewer = self.factory.agents().get(REVIEWER_AGENT)?;

        let mut fragments = Vec::with_capacity(topics.len() + 1);
        fragments.push(introduction.to_string());

        for (i, topic) in topics.iter().enumerate() {
            progress.topic_started(topic, i + 1, topics.len());
            info!(%topic, current = i + 1, total = topics.len(), "developing topic");

            let context = recent_context(&fragments, self.context_window);
            let draft = ExecutableTask::inline(
                DRAFT_TASK,
                Arc::clone(&writer),
                prompts::draft_description(topic, &context),
                prompts::DRAFT_EXPECTED,
            );
            let review = ExecutableTask::inline(
                REVIEW_TASK,
                Arc::clone(&reviewer),
                prompts::REVIEW_DESCRIPTION,
                prompts::REVIEW_EXPECTED,
            )
            .with_context(DRAFT_TASK);

            let crew = Crew::new("topic", vec![draft, review])?;
            let result = self.runner.kickoff(&crew, &Inputs::new()).await?;
            fragments.push(result.raw);
        }

        Ok(fragments)
    }
}
