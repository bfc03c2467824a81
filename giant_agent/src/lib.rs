//! The agent loop: Context Manager, Prompt Builder, and Agent Runner state
//! machine that together drive one vision-LLM [`giant_provider::Provider`]
//! over one [`giant_slide::SlideHandle`] to a [`giant_core::model::RunResult`].

pub mod context;
pub mod prompt;
pub mod runner;

pub use context::ContextManager;
pub use runner::AgentRunner;
