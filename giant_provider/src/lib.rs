//! The provider substrate (§4.5): one `Provider` trait, two concrete wire
//! implementations (`JsonSchemaProvider`, `ToolUseProvider`), and the
//! resilience and cost-accounting plumbing both share.
//!
//! A request's round trip is always: build the wire body (`json_schema`/
//! `tool_use`), send it through [`provider::through_resilience_stack`]
//! (circuit breaker -> rate limiter -> retry, innermost to outermost),
//! decode the response into a [`giant_core::model::Action`]
//! ([`action_wire`]), then price it ([`cost`]).

pub mod action_wire;
pub mod circuit_breaker;
pub mod cost;
pub mod http;
pub mod json_schema;
pub mod message;
pub mod provider;
pub mod rate_limiter;
pub mod retry;
pub mod tool_use;

pub use json_schema::JsonSchemaProvider;
pub use provider::{Provider, ProviderRegistry, ProviderState};
pub use tool_use::ToolUseProvider;
