//! Shared types, error model, and configuration for scriptcrew.
//!
//! This crate is the foundation depended on by all other scriptcrew crates.
//! It provides:
//! - [`ScriptCrewError`], the unified error type
//! - Domain types ([`ToolKind`], [`TaskOutput`], [`CrewResult`], [`RunId`])
//! - Configuration ([`AppConfig`], [`LlmConfig`], config loading)
//! - The declarative crew definition ([`CrewDefinition`])

pub mod config;
pub mod crew;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, LlmSection, ScrapeConfig, SearchConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use crew::{AgentDefinition, CrewDefinition, TaskDefinition, load_crew_definition};
pub use error::{Result, ScriptCrewError};
pub use types::{CrewResult, RunId, TaskOutput, ToolKind};
