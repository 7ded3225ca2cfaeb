//! Agent registry: crew-definition personas bound to a model and tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use scriptcrew_llm::ChatModel;
use scriptcrew_shared::{CrewDefinition, Result, ScriptCrewError};
use scriptcrew_tools::{Tool, ToolRegistry};

/// A resolved agent, ready to execute tasks.
pub struct AgentSpec {
    pub id: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub verbose: bool,
    /// Agents never hand work to each other.
    pub allow_delegation: bool,
    /// Answers must be a single JSON object.
    pub output_json: bool,
    pub model: Arc<dyn ChatModel>,
}

impl std::fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSpec")
            .field("id", &self.id)
            .field("role", &self.role)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("verbose", &self.verbose)
            .field("output_json", &self.output_json)
            .field("model", &self.model.model_id())
            .finish()
    }
}

/// All agents of one crew definition, keyed by identifier.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<AgentSpec>>,
}

impl AgentRegistry {
    /// Resolve every agent of `definition`. Fails on the first tool that the
    /// registry cannot provide; no partial registry is returned.
    pub fn build(
        definition: &CrewDefinition,
        model: Arc<dyn ChatModel>,
        tools: &ToolRegistry,
    ) -> Result<Self> {
        let mut agents = BTreeMap::new();

        for (id, def) in &definition.agents {
            let resolved = def
                .tools
                .iter()
                .map(|kind| {
                    tools.get(*kind).ok_or_else(|| {
                        ScriptCrewError::config(format!(
                            "agent '{id}' requests tool '{kind}' which is not available"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            debug!(agent = %id, tools = resolved.len(), "agent registered");

            agents.insert(
                id.clone(),
                Arc::new(AgentSpec {
                    id: id.clone(),
                    role: def.role.clone(),
                    goal: def.goal.clone(),
                    backstory: def.backstory.clone(),
                    tools: resolved,
                    verbose: def.verbose,
                    allow_delegation: false,
                    output_json: def.output_json,
                    model: Arc::clone(&model),
                }),
            );
        }

        Ok(Self { agents })
    }

    pub fn get(&self, id: &str) -> Result<Arc<AgentSpec>> {
        self.agents
            .get(id)
            .cloned()
            .ok_or_else(|| ScriptCrewError::crew(format!("unknown agent '{id}'")))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
