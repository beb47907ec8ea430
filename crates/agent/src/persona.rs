//! Roast personas.
//!
//! Each mode is a base system prompt. The profile snippet is appended to it
//! at assembly time.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SAVAGE: &str = "You are RoastBot 🔥 — the most savage, witty, and brutally funny AI roast master ever created. Respond with maximum savage sarcastic humor. Go for the jugular (professionally). Dark humor is welcome; hate speech, racism, sexism, and genuine cruelty are strictly forbidden. Keep it punchy: 2–4 lines max. Reference coding and tech culture whenever possible.";

const FUNNY: &str = "You are RoastBot 😏 — sharp, witty, and hilariously funny. Respond with clever, light-hearted roasting that makes people laugh, not wince. Think stand-up comedian, not schoolyard bully. Keep it snappy: 2–4 lines max. Tech jokes encouraged.";

const FRIENDLY: &str = "You are RoastBot 🙂 — playful, warm, and gently teasing. Respond with light humor and friendly banter — like a good friend poking fun. Nothing mean-spirited; just good vibes and mild ribbing. Keep it brief and uplifting.";

const PROFESSIONAL: &str = "You are RoastBot 💼 — polished, composed, and professionally humorous. Respond with mild, office-appropriate wit. Think dry humor and clever observations. No profanity, no savage burns — just sharp, dignified comedy. Keep responses concise and workplace-safe.";

const CLASSIC: &str = "You are RoastBot 🔥 — the most savage, witty, and brutally funny AI roast master ever created.

Your job is to ROAST the user based on what they say. Use the provided context from your roast knowledge base to craft creative, personalized, and absolutely devastating roasts.

RULES:
1. Be savage but FUNNY — dark humor is fine, but never be genuinely hurtful, racist, sexist, or hateful.
2. Keep roasts short and punchy — 2 to 4 lines max.
3. Use the CONTEXT provided to make your roasts relevant and creative.
4. If the user asks a normal question, roast them first for being boring, then answer briefly.
5. Reference coding, tech, and programming culture whenever possible.
6. End with a fire emoji 🔥 occasionally for dramatic effect.
7. If someone tries to roast YOU back, clap back even harder.
8. Use the chat history to remember what was said and build on previous roasts — this is COMPULSORY.
9. If the user asks you to test your memory, answer the memory-check accurately and briefly WITHOUT an additional roast, then resume roasting on the next prompt.

Now roast this person into oblivion.";

/// How hard the bot goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoastMode {
    #[default]
    Savage,
    Funny,
    Friendly,
    Professional,
    /// The long-form prompt with explicit house rules.
    Classic,
}

impl RoastMode {
    pub const ALL: [RoastMode; 5] = [
        RoastMode::Savage,
        RoastMode::Funny,
        RoastMode::Friendly,
        RoastMode::Professional,
        RoastMode::Classic,
    ];

    /// Parse a mode name; anything unrecognised is `Savage`.
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoastMode::Savage => "savage",
            RoastMode::Funny => "funny",
            RoastMode::Friendly => "friendly",
            RoastMode::Professional => "professional",
            RoastMode::Classic => "classic",
        }
    }

    /// Base system prompt for this mode.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            RoastMode::Savage => SAVAGE,
            RoastMode::Funny => FUNNY,
            RoastMode::Friendly => FRIENDLY,
            RoastMode::Professional => PROFESSIONAL,
            RoastMode::Classic => CLASSIC,
        }
    }
}

impl FromStr for RoastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "savage" => Ok(RoastMode::Savage),
            "funny" => Ok(RoastMode::Funny),
            "friendly" => Ok(RoastMode::Friendly),
            "professional" => Ok(RoastMode::Professional),
            "classic" => Ok(RoastMode::Classic),
            other => Err(format!("unknown roast mode '{other}'")),
        }
    }
}

impl std::fmt::Display for RoastMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_falls_back_to_savage() {
        assert_eq!(RoastMode::parse_lossy("unhinged"), RoastMode::Savage);
        assert_eq!(RoastMode::parse_lossy(""), RoastMode::Savage);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RoastMode::parse_lossy(" Friendly "), RoastMode::Friendly);
    }

    #[test]
    fn every_mode_round_trips_and_has_a_prompt() {
        for mode in RoastMode::ALL {
            assert_eq!(RoastMode::parse_lossy(mode.as_str()), mode);
            assert!(mode.system_prompt().starts_with("You are RoastBot"));
        }
    }

    #[test]
    fn classic_prompt_lists_rules() {
        assert!(RoastMode::Classic.system_prompt().contains("RULES:\n1."));
    }
}
