//! Declarative crew definition (agents + tasks), loaded from YAML.
//!
//! The document is validated eagerly: required fields and tool identifiers
//! are enforced by deserialization, cross references by [`CrewDefinition::validate`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptCrewError};
use crate::types::ToolKind;

/// Root of the crew YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewDefinition {
    /// Agent identifier → agent definition.
    pub agents: BTreeMap<String, AgentDefinition>,
    /// Task identifier → task definition.
    pub tasks: BTreeMap<String, TaskDefinition>,
}

/// One `agents.<id>` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Tools granted to the agent.
    #[serde(default)]
    pub tools: Vec<ToolKind>,
    /// Log this agent's work at `info` instead of `debug`.
    #[serde(default)]
    pub verbose: bool,
    /// The agent must answer with a single JSON object.
    #[serde(default)]
    pub output_json: bool,
}

/// One `tasks.<id>` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Prompt template; `{name}` placeholders are filled from kickoff inputs.
    pub description: String,
    /// Identifier of the agent that performs the task.
    pub agent: String,
    pub expected_output: String,
    /// Upstream tasks whose outputs feed this task.
    #[serde(default)]
    pub context: Option<Vec<String>>,
    #[serde(default)]
    pub verbose: bool,
}

impl TaskDefinition {
    /// Upstream task identifiers (empty when `context` is absent or null).
    pub fn context_ids(&self) -> &[String] {
        self.context.as_deref().unwrap_or_default()
    }
}

impl CrewDefinition {
    /// Parse and validate a YAML document.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let definition: Self = serde_yaml::from_str(source)
            .map_err(|e| ScriptCrewError::config(format!("malformed crew definition: {e}")))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Check cross references between tasks and agents.
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(ScriptCrewError::config("crew definition declares no agents"));
        }
        if self.tasks.is_empty() {
            return Err(ScriptCrewError::config("crew definition declares no tasks"));
        }

        for (id, task) in &self.tasks {
            if !self.agents.contains_key(&task.agent) {
                return Err(ScriptCrewError::config(format!(
                    "task '{id}' references unknown agent '{}'",
                    task.agent
                )));
            }
            for upstream in task.context_ids() {
                if upstream == id {
                    return Err(ScriptCrewError::config(format!(
                        "task '{id}' lists itself as context"
                    )));
                }
                if !self.tasks.contains_key(upstream) {
                    return Err(ScriptCrewError::config(format!(
                        "task '{id}' references unknown context task '{upstream}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Fail unless every listed agent is defined.
    pub fn require_agents(&self, ids: &[&str]) -> Result<()> {
        match ids.iter().find(|id| !self.agents.contains_key(**id)) {
            Some(missing) => Err(ScriptCrewError::config(format!(
                "crew definition is missing required agent '{missing}'"
            ))),
            None => Ok(()),
        }
    }

    /// Fail unless every listed task is defined.
    pub fn require_tasks(&self, ids: &[&str]) -> Result<()> {
        match ids.iter().find(|id| !self.tasks.contains_key(**id)) {
            Some(missing) => Err(ScriptCrewError::config(format!(
                "crew definition is missing required task '{missing}'"
            ))),
            None => Ok(()),
        }
    }
}

/// Load and validate a crew definition from a YAML file.
///
/// An unreadable path is reported as a configuration error: nothing can run
/// without the definition.
pub fn load_crew_definition(path: &Path) -> Result<CrewDefinition> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ScriptCrewError::config(format!(
            "cannot read crew definition '{}': {e}",
            path.display()
        ))
    })?;

    let definition = CrewDefinition::from_yaml(&content).map_err(|e| match e {
        ScriptCrewError::Config { message } => {
            ScriptCrewError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    tracing::debug!(
        path = %path.display(),
        agents = definition.agents.len(),
        tasks = definition.tasks.len(),
        "crew definition loaded"
    );

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
agents:
  writer:
    role: Writer
    goal: Write things
    backstory: Has written before
    tools: [search_tool]
tasks:
  draft:
    description: Draft about {category}
    agent: writer
    expected_output: A draft
  polish:
    description: Polish the draft
    agent: writer
    expected_output: A polished draft
    context: [draft]
"#;

    #[test]
    fn parses_minimal_definition() {
        let def = CrewDefinition::from_yaml(MINIMAL).expect("parse");
        let writer = &def.agents["writer"];
        assert_eq!(writer.tools, vec![ToolKind::SearchTool]);
        assert!(!writer.verbose);
        assert!(!writer.output_json);
        assert!(def.tasks["draft"].context_ids().is_empty());
        assert_eq!(def.tasks["polish"].context_ids(), ["draft".to_string()]);
    }

    #[test]
    fn null_context_is_empty() {
        let yaml = MINIMAL.replace("context: [draft]", "context: null");
        let def = CrewDefinition::from_yaml(&yaml).expect("parse");
        assert!(def.tasks["polish"].context_ids().is_empty());
    }

    #[test]
    fn missing_sections_are_config_errors() {
        let err = CrewDefinition::from_yaml("agents: {}\n").unwrap_err();
        assert!(err.is_config());

        let err = CrewDefinition::from_yaml("something_else: 1\n").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("agents"));
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let err = CrewDefinition::from_yaml("agents: [unclosed").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let yaml = MINIMAL.replace("[search_tool]", "[shell_tool]");
        let err = CrewDefinition::from_yaml(&yaml).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("shell_tool"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let yaml = MINIMAL.replace("    backstory: Has written before\n", "");
        let err = CrewDefinition::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("backstory"));
    }

    #[test]
    fn unknown_agent_reference_is_rejected() {
        let yaml = MINIMAL.replace("agent: writer\n    expected_output: A draft", "agent: ghost\n    expected_output: A draft");
        let err = CrewDefinition::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown agent 'ghost'"));
    }

    #[test]
    fn unknown_context_reference_is_rejected() {
        let yaml = MINIMAL.replace("context: [draft]", "context: [outline]");
        let err = CrewDefinition::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown context task 'outline'"));
    }

    #[test]
    fn self_context_is_rejected() {
        let yaml = MINIMAL.replace("context: [draft]", "context: [polish]");
        let err = CrewDefinition::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn require_helpers_report_missing_ids() {
        let def = CrewDefinition::from_yaml(MINIMAL).expect("parse");
        assert!(def.require_agents(&["writer"]).is_ok());
        assert!(def.require_tasks(&["draft", "polish"]).is_ok());
        let err = def.require_agents(&["writer", "editor"]).unwrap_err();
        assert!(err.to_string().contains("'editor'"));
    }

    #[test]
    fn unreadable_path_is_config_error() {
        let err = load_crew_definition(Path::new("/no/such/crew.yaml")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn shipped_crew_definition_validates() {
        let def = load_crew_definition(Path::new("../../../config/crew.yaml"))
            .expect("load shipped crew definition");
        assert!(def.agents.contains_key("list_json_formatter"));
        assert!(def.agents.contains_key("language_reviewer"));
        assert_eq!(def.tasks["structure_long_script"].context_ids().len(), 3);
    }
}
