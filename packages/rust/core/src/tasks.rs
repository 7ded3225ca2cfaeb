//! Task factory: turns task definitions into executable tasks.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use tracing::debug;

use scriptcrew_shared::{Result, ScriptCrewError, TaskDefinition};

use crate::agents::{AgentRegistry, AgentSpec};

/// Kickoff inputs substituted into `{key}` placeholders.
pub type Inputs = BTreeMap<String, String>;

/// A task bound to its agent and to the upstream tasks it reads from.
#[derive(Debug, Clone)]
pub struct ExecutableTask {
    pub id: String,
    pub description: String,
    pub expected_output: String,
    pub agent: Arc<AgentSpec>,
    /// Upstream task ids whose outputs form this task's context.
    pub context: Vec<String>,
    pub verbose: bool,
}

impl ExecutableTask {
    /// A task built in code rather than from the crew definition.
    pub fn inline(
        id: impl Into<String>,
        agent: Arc<AgentSpec>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            context: Vec::new(),
            verbose: false,
        }
    }

    pub fn with_context(mut self, upstream: impl Into<String>) -> Self {
        self.context.push(upstream.into());
        self
    }
}

/// Instantiates configured tasks against an agent registry.
#[derive(Debug)]
pub struct TaskFactory {
    tasks: BTreeMap<String, TaskDefinition>,
    agents: Arc<AgentRegistry>,
}

impl TaskFactory {
    pub fn new(tasks: BTreeMap<String, TaskDefinition>, agents: Arc<AgentRegistry>) -> Self {
        Self { tasks, agents }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Instantiate `task_id`, keeping only the context entries already
    /// present in `instantiated`. Missing upstream tasks are skipped so a
    /// chain can be built one task at a time.
    pub fn create_task(
        &self,
        task_id: &str,
        instantiated: &BTreeMap<String, ExecutableTask>,
    ) -> Result<ExecutableTask> {
        let def = self
            .tasks
            .get(task_id)
            .ok_or_else(|| ScriptCrewError::crew(format!("unknown task '{task_id}'")))?;
        let agent = self.agents.get(&def.agent)?;

        let (context, skipped): (Vec<String>, Vec<String>) = def
            .context_ids()
            .iter()
            .cloned()
            .partition(|id| instantiated.contains_key(id));

        if !skipped.is_empty() {
            debug!(task = %task_id, ?skipped, "context tasks not instantiated yet");
        }

        Ok(ExecutableTask {
            id: task_id.to_string(),
            description: def.description.clone(),
            expected_output: def.expected_output.clone(),
            agent,
            context,
            verbose: def.verbose,
        })
    }

    /// Instantiate a chain in order, each task seeing the ones before it.
    pub fn create_chain(&self, task_ids: &[&str]) -> Result<Vec<ExecutableTask>> {
        let mut instantiated = BTreeMap::new();
        let mut chain = Vec::with_capacity(task_ids.len());

        for id in task_ids {
            let task = self.create_task(id, &instantiated)?;
            instantiated.insert((*id).to_string(), task.clone());
            chain.push(task);
        }

        Ok(chain)
    }
}

/// Replace `{key}` placeholders with values from `inputs`.
/// Unknown placeholders are left as they are.
pub fn interpolate(template: &str, inputs: &Inputs) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

    if inputs.is_empty() {
        return template.to_string();
    }

    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match inputs.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
