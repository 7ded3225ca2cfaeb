//! Tools the agents can call during a task.
//!
//! Every tool takes a single string argument and always answers with text:
//! failures are reported back to the model as a message instead of aborting
//! the task.

pub mod content;
mod net;
pub mod scrape;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use scriptcrew_shared::{AppConfig, Result, ToolKind};

pub use scrape::ScrapeTool;
pub use search::SearchTool;

/// A capability an agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Function name exposed to the model.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn description(&self) -> &str;

    /// Name of the single string argument.
    fn input_field(&self) -> &str;

    fn input_description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                self.input_field(): {
                    "type": "string",
                    "description": self.input_description(),
                }
            },
            "required": [self.input_field()],
        })
    }

    /// Execute the tool. Errors come back as text.
    async fn run(&self, input: &str) -> String;
}

/// Tool instances keyed by kind, shared between agents.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with every built-in tool configured from `config`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::default()
            .with_tool(Arc::new(SearchTool::new(&config.search)?))
            .with_tool(Arc::new(ScrapeTool::new(&config.scrape)?)))
    }

    /// Register (or replace) a tool under its own kind.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.kind(), tool);
        self
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_every_builtin_tool() {
        let registry = ToolRegistry::new(&AppConfig::default()).unwrap();
        for kind in ToolKind::ALL {
            let tool = registry.get(kind).expect("tool registered");
            assert_eq!(tool.name(), kind.as_str());
        }
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn input_schema_requires_the_single_field() {
        let registry = ToolRegistry::new(&AppConfig::default()).unwrap();
        let schema = registry.get(ToolKind::SearchTool).unwrap().input_schema();
        assert_eq!(schema["required"][0], "query");
        assert_eq!(schema["properties"]["query"]["type"], "string");

        let schema = registry.get(ToolKind::ScrapeTool).unwrap().input_schema();
        assert_eq!(schema["required"][0], "website_url");
    }
}
