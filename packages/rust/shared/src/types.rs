//! Core domain types shared across scriptcrew crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ToolKind
// ---------------------------------------------------------------------------

/// The fixed table of tools an agent may be granted in the crew definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Web search returning the top results as text.
    SearchTool,
    /// Fetch a web page and return its readable text.
    ScrapeTool,
}

impl ToolKind {
    /// Every tool kind, in registry order.
    pub const ALL: [ToolKind; 2] = [ToolKind::SearchTool, ToolKind::ScrapeTool];

    /// Identifier used in configuration and exposed to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchTool => "search_tool",
            Self::ScrapeTool => "scrape_tool",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown tool '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Crew outputs
// ---------------------------------------------------------------------------

/// Output of a single executed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Key of the task inside its crew.
    pub task: String,
    /// Agent that produced the output.
    pub agent: String,
    /// Final answer text.
    pub raw: String,
}

impl std::fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Result of one crew kickoff: per-task outputs in execution order plus the
/// aggregate raw output (the final task's answer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewResult {
    /// Aggregate output of the crew.
    pub raw: String,
    /// Per-task outputs, in execution order.
    pub tasks_output: Vec<TaskOutput>,
}

impl CrewResult {
    /// Build a result from ordered task outputs; `raw` is the last output.
    pub fn from_outputs(tasks_output: Vec<TaskOutput>) -> Self {
        let raw = tasks_output
            .last()
            .map(|o| o.raw.clone())
            .unwrap_or_default();
        Self { raw, tasks_output }
    }

    /// Look up a task's output by key.
    pub fn output_of(&self, task: &str) -> Option<&TaskOutput> {
        self.tasks_output.iter().find(|o| o.task == task)
    }
}
