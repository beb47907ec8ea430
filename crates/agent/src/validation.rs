//! Input validation at the turn boundary.

/// Longest accepted message, in characters.
pub const MAX_INPUT_CHARS: usize = 5000;

pub const EMPTY_INPUT_REPLY: &str =
    "You sent me nothing? Even your messages are empty, just like your GitHub contribution graph. 🔥";

pub const TOO_LONG_REPLY: &str =
    "Wow, you broke the character limit. That's impressive. 🔥 Please send a shorter message.";

/// Check raw user input.
///
/// Returns the trimmed message, or the canned reply to send back instead.
pub fn validate_input(raw: &str) -> Result<&str, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EMPTY_INPUT_REPLY);
    }
    if raw.chars().count() > MAX_INPUT_CHARS {
        return Err(TOO_LONG_REPLY);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_rejected() {
        assert_eq!(validate_input(""), Err(EMPTY_INPUT_REPLY));
        assert_eq!(validate_input("   \n\t"), Err(EMPTY_INPUT_REPLY));
        assert!(EMPTY_INPUT_REPLY.contains("nothing"));
    }

    #[test]
    fn oversized_rejected() {
        let long = "a".repeat(MAX_INPUT_CHARS + 1);
        assert_eq!(validate_input(&long), Err(TOO_LONG_REPLY));
        let limit = "a".repeat(MAX_INPUT_CHARS);
        assert!(validate_input(&limit).is_ok());
    }

    #[test]
    fn valid_input_is_trimmed() {
        assert_eq!(validate_input("  roast me  "), Ok("roast me"));
    }
}
