//! # emberbot Core
//!
//! Domain types, traits, and error definitions for the emberbot
//! conversational engine. This crate has **zero framework dependencies**: it
//! defines the model that the retrieval, memory, profile, and agent crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the completion endpoint or storage backend via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod storage;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ChatMessage, Role, ScoredMessage};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use session::SessionId;
pub use storage::{ChatTurnRecord, ProfileRecord, Storage};
