//! Core orchestration for scriptcrew.
//!
//! Resolves the crew definition into agents and tasks, runs crews as task
//! graphs, and drives the three-phase script pipeline (`ScriptPipeline`).

pub mod agents;
pub mod assembler;
pub mod crew;
pub mod executor;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use agents::{AgentRegistry, AgentSpec};
pub use crew::{Crew, CrewRunner, SequentialCrewRunner};
pub use executor::AgentExecutor;
pub use extract::{ExtractionError, extract_topics};
pub use pipeline::{
    ProgressReporter, SKELETON_FAILURE, ScriptPipeline, ScriptRun, SilentProgress, Skeleton,
};
pub use tasks::{ExecutableTask, Inputs, TaskFactory, interpolate};
