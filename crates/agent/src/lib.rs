//! The emberbot turn pipeline.
//!
//! A turn follows a fixed **score → retrieve → trim → assemble → complete**
//! cycle:
//!
//! 1. **Validate** raw input (canned replies for empty or oversized text)
//! 2. **Score** the message and update the session's user profile
//! 3. **Retrieve** roast context from the corpus index
//! 4. **Trim** the scored history to the token budget
//! 5. **Assemble** persona prompt, profile block, history and context
//! 6. **Complete** via the configured provider, whole or streamed
//! 7. **Record** the exchange in memory and durable storage
//!
//! Sessions are isolated and each is serialized behind its own lock.

pub mod assembler;
pub mod engine;
pub mod persona;
pub mod session;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::{PromptParts, assemble, final_user_message};
pub use engine::{APOLOGY_PREFIX, ChatEngine, EngineSettings, apology};
pub use persona::RoastMode;
pub use session::{SessionRegistry, SessionState};
pub use validation::{EMPTY_INPUT_REPLY, MAX_INPUT_CHARS, TOO_LONG_REPLY, validate_input};
