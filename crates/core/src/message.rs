//! Message domain types.
//!
//! These are the value objects that flow through a turn:
//! user text → scored into a `ScoredMessage` → trimmed down to a `ChatMessage`
//! → sent to the completion endpoint alongside the system prompt.

use serde::{Deserialize, Serialize};

/// Highest importance a message can carry.
pub const MAX_IMPORTANCE: u8 = 10;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (persona, profile, rules)
    System,
}

impl Role {
    /// Wire name used by OpenAI-compatible endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Whether `other` completes a user/assistant exchange with `self`.
    pub fn complements(&self, other: Role) -> bool {
        matches!(
            (self, other),
            (Role::User, Role::Assistant) | (Role::Assistant, Role::User)
        )
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain role/content pair, the unit sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A chat message annotated with an importance score (0–10).
///
/// Immutable once created: the store only ever appends or evicts whole
/// entries, it never edits one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredMessage {
    role: Role,
    content: String,
    importance: u8,
}

impl ScoredMessage {
    /// Create a scored message. Importance above 10 is clamped.
    pub fn new(role: Role, content: impl Into<String>, importance: u8) -> Self {
        Self {
            role,
            content: content.into(),
            importance: importance.min(MAX_IMPORTANCE),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn importance(&self) -> u8 {
        self.importance
    }

    /// Drop the score, keeping the role/content pair.
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

impl From<ScoredMessage> for ChatMessage {
    fn from(msg: ScoredMessage) -> Self {
        ChatMessage {
            role: msg.role,
            content: msg.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = ChatMessage::user("Hello, roaster!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, roaster!");
    }

    #[test]
    fn importance_is_clamped() {
        let msg = ScoredMessage::new(Role::User, "hi", 42);
        assert_eq!(msg.importance(), MAX_IMPORTANCE);
    }

    #[test]
    fn complementary_roles() {
        assert!(Role::User.complements(Role::Assistant));
        assert!(Role::Assistant.complements(Role::User));
        assert!(!Role::User.complements(Role::User));
        assert!(!Role::System.complements(Role::User));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert!(json.contains("\"assistant\""));
    }

    #[test]
    fn scored_message_drops_score() {
        let scored = ScoredMessage::new(Role::Assistant, "burn", 7);
        let plain: ChatMessage = scored.clone().into();
        assert_eq!(plain, scored.to_chat_message());
        assert_eq!(plain.content, "burn");
    }
}
