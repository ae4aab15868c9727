//! Concrete collaborators and command wiring for the debate arena.
//!
//! - [`llm::OpenAiCompatClient`] — chat-completions model client
//! - [`search::HttpEvidenceSource`] — evidence search over HTTP
//! - [`store::JsonFileStore`] — one JSON document per debate
//! - [`config::RunnerConfig`] — TOML file plus `ARENA_*` overrides
//! - [`app::Arena`] — builds the orchestrator and judge from a config

pub mod app;
pub mod config;
pub mod llm;
pub mod search;
pub mod store;

pub use app::Arena;
pub use config::{EndpointConfig, RunnerConfig};
pub use llm::OpenAiCompatClient;
pub use search::HttpEvidenceSource;
pub use store::JsonFileStore;
