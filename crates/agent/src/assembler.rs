//! Prompt assembly.
//!
//! Order is fixed: one system message (persona + profile block), the trimmed
//! history as-is, then one user message carrying the retrieved context and
//! the current input.

use emberbot_core::message::ChatMessage;

/// Everything that goes into one prompt.
#[derive(Debug, Clone)]
pub struct PromptParts<'a> {
    pub base_prompt: &'a str,
    /// Already delimited by the profile; empty when there is nothing to add.
    pub profile_snippet: &'a str,
    pub retrieved_context: &'a str,
    pub history: Vec<ChatMessage>,
    pub current_input: &'a str,
}

/// Build the final message list for the completion endpoint.
pub fn assemble(parts: PromptParts<'_>) -> Vec<ChatMessage> {
    let mut system = String::with_capacity(parts.base_prompt.len() + parts.profile_snippet.len());
    system.push_str(parts.base_prompt);
    system.push_str(parts.profile_snippet);

    let mut messages = Vec::with_capacity(parts.history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(parts.history);
    messages.push(ChatMessage::user(final_user_message(
        parts.retrieved_context,
        parts.current_input,
    )));
    messages
}

/// The labelled user message that closes every prompt.
pub fn final_user_message(context: &str, input: &str) -> String {
    format!("Roast context:\n{context}\n\nCurrent message:\n{input}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberbot_core::message::Role;

    #[test]
    fn layout_is_system_history_user() {
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("bye")];
        let messages = assemble(PromptParts {
            base_prompt: "You are RoastBot",
            profile_snippet: "\n\n[USER PROFILE]\n• x\n[/USER PROFILE]\n",
            retrieved_context: "ctx",
            history: history.clone(),
            current_input: "roast me",
        });

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("You are RoastBot\n\n[USER PROFILE]"));
        assert_eq!(&messages[1..3], history.as_slice());
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "Roast context:\nctx\n\nCurrent message:\nroast me");
    }

    #[test]
    fn empty_snippet_leaves_base_prompt_alone() {
        let messages = assemble(PromptParts {
            base_prompt: "base",
            profile_snippet: "",
            retrieved_context: "",
            history: vec![],
            current_input: "x",
        });
        assert_eq!(messages[0].content, "base");
        assert_eq!(messages.len(), 2);
    }
}
