//! Importance-aware history trimming under a token budget.
//!
//! The last exchange is never removed. Among the rest, the lowest-importance
//! message goes first (oldest on ties), taking its complementary neighbour
//! with it so no half-exchange is left behind. If that still isn't enough,
//! the oldest messages are dropped. The result never shrinks below
//! [`MIN_MESSAGES`], even if that leaves it over budget.

use emberbot_core::message::{ChatMessage, ScoredMessage};
use tracing::debug;

use crate::token::TokenCounter;

/// Messages at the end of history that are never removed.
pub const PROTECTED_TAIL: usize = 2;

/// Trimming never leaves fewer messages than this.
pub const MIN_MESSAGES: usize = 2;

/// Default history token budget.
pub const DEFAULT_BUDGET: usize = 3000;

/// Token count of all message contents joined with spaces.
pub fn total_tokens(messages: &[&ScoredMessage], counter: &dyn TokenCounter) -> usize {
    let joined = messages
        .iter()
        .map(|m| m.content())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    counter.count(&joined)
}

/// Trim `messages` to fit `budget` tokens, keeping chronological order.
pub fn trim_history(
    messages: &[ScoredMessage],
    budget: usize,
    counter: &dyn TokenCounter,
) -> Vec<ChatMessage> {
    let mut kept: Vec<&ScoredMessage> = messages.iter().collect();

    if total_tokens(&kept, counter) <= budget {
        return to_chat(&kept);
    }

    let mut removed = 0usize;

    while kept.len() > MIN_MESSAGES && total_tokens(&kept, counter) > budget {
        let candidates = kept.len().saturating_sub(PROTECTED_TAIL);
        if candidates == 0 {
            break;
        }

        let Some(drop_idx) = (0..candidates).min_by_key(|&i| (kept[i].importance(), i)) else {
            break;
        };

        let next = drop_idx + 1;
        let take_pair = next < candidates
            && kept[drop_idx].role().complements(kept[next].role())
            && kept.len() - 2 >= MIN_MESSAGES;

        if take_pair {
            kept.drain(drop_idx..=next);
            removed += 2;
        } else {
            kept.remove(drop_idx);
            removed += 1;
        }
    }

    // Recency fallback
    while kept.len() > MIN_MESSAGES && total_tokens(&kept, counter) > budget {
        kept.remove(0);
        removed += 1;
    }

    debug!(
        removed,
        kept = kept.len(),
        budget,
        tokens = total_tokens(&kept, counter),
        "Trimmed history"
    );

    to_chat(&kept)
}

fn to_chat(messages: &[&ScoredMessage]) -> Vec<ChatMessage> {
    messages.iter().map(|m| m.to_chat_message()).collect()
}
