//! Per-session user profile.
//!
//! Accumulates what the scorer finds turn after turn and renders it as a
//! short block for the system prompt.

use serde::{Deserialize, Serialize};

use crate::scorer::{TurnSignals, analyze};

/// Highest importance a turn can score.
pub const MAX_SCORE: u8 = 10;

/// Turns needed before the profile is worth injecting.
pub const MIN_TURNS_FOR_SNIPPET: u32 = 2;

const RECENT_ITEMS: usize = 3;
const TOP_THEMES: usize = 3;
const TOP_TRAITS: usize = 2;
const RECURRING_THEME_THRESHOLD: u32 = 3;

/// Insertion-ordered name → count tally.
///
/// Serialized as a list of `[name, count]` pairs so first-seen order
/// survives a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tally(Vec<(String, u32)>);

impl Tally {
    /// Add `by` to `name`, returning the new count.
    pub fn add(&mut self, name: &str, by: u32) -> u32 {
        if let Some((_, count)) = self.0.iter_mut().find(|(n, _)| n == name) {
            *count += by;
            return *count;
        }
        self.0.push((name.to_string(), by));
        by
    }

    pub fn get(&self, name: &str) -> u32 {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `n` highest counts, ties in first-seen order.
    pub fn top(&self, n: usize) -> Vec<(String, u32)> {
        let mut sorted = self.0.clone();
        // Stable sort keeps first-seen order among equal counts
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(n);
        sorted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(n, c)| (n.as_str(), *c))
    }
}

/// What the bot has learned about one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    themes: Tally,
    #[serde(default)]
    traits: Tally,
    #[serde(default)]
    turn_count: u32,
}

/// Structured view of a profile for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub turn_count: u32,
    pub skills: Vec<String>,
    pub weaknesses: Vec<String>,
    pub top_themes: Vec<(String, u32)>,
    pub top_traits: Vec<(String, u32)>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score a user message and fold its signals into the profile.
    ///
    /// `bot_reply` may be empty; a reply of more than five words earns an
    /// engagement bonus. Always increments `turn_count` by one and returns a
    /// score in `0..=10`.
    pub fn update(&mut self, user_msg: &str, bot_reply: &str) -> u8 {
        self.turn_count += 1;
        let signals = analyze(user_msg);
        self.apply(&signals, bot_reply)
    }

    fn apply(&mut self, signals: &TurnSignals, bot_reply: &str) -> u8 {
        let mut score: u32 = 0;

        if let Some(skill) = &signals.skill {
            score += 3;
            push_unique(&mut self.skills, skill);
        }

        if let Some(weakness) = &signals.weakness {
            score += 3;
            push_unique(&mut self.weaknesses, weakness);
        }

        for (theme, hits) in &signals.themes {
            let count = self.themes.add(theme, *hits);
            score += 1;
            if count > RECURRING_THEME_THRESHOLD {
                score += 1;
            }
        }

        if signals.emotional {
            score += 2;
        }

        for t in &signals.traits {
            self.traits.add(t, 1);
            score += 1;
        }

        if signals.question {
            score += 1;
        }

        if signals.word_count < 4 {
            score = score.saturating_sub(1);
        }

        if !bot_reply.is_empty() && bot_reply.split_whitespace().count() > 5 {
            score = (score + 1).min(u32::from(MAX_SCORE));
        }

        score.min(u32::from(MAX_SCORE)) as u8
    }

    /// The adaptive-context block for the system prompt, or `""` when there
    /// is not enough to say yet.
    pub fn to_snippet(&self) -> String {
        if self.turn_count < MIN_TURNS_FOR_SNIPPET {
            return String::new();
        }

        let mut parts = Vec::new();

        if !self.skills.is_empty() {
            parts.push(format!("Claims to be good at: {}", recent(&self.skills).join("; ")));
        }
        if !self.weaknesses.is_empty() {
            parts.push(format!(
                "Has revealed weaknesses / slip-ups: {}",
                recent(&self.weaknesses).join("; ")
            ));
        }
        if !self.themes.is_empty() {
            parts.push(format!("Recurring topics: {}", names(&self.themes.top(TOP_THEMES))));
        }
        if !self.traits.is_empty() {
            parts.push(format!("Personality signals: {}", names(&self.traits.top(TOP_TRAITS))));
        }

        if parts.is_empty() {
            return String::new();
        }

        let body = parts
            .iter()
            .map(|p| format!("• {p}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!("\n\n[USER PROFILE — use this to craft personalised roasts]\n{body}\n[/USER PROFILE]\n")
    }

    /// Structured view for display.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            turn_count: self.turn_count,
            skills: recent(&self.skills).to_vec(),
            weaknesses: recent(&self.weaknesses).to_vec(),
            top_themes: self.themes.top(TOP_THEMES),
            top_traits: self.traits.top(TOP_TRAITS),
        }
    }

    /// Flat record for persistence.
    pub fn to_record(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Rebuild from a record produced by [`to_record`](Self::to_record).
    /// Missing keys fall back to empty values.
    pub fn from_record(record: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(record)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn weaknesses(&self) -> &[String] {
        &self.weaknesses
    }

    pub fn themes(&self) -> &Tally {
        &self.themes
    }

    pub fn traits(&self) -> &Tally {
        &self.traits
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !item.is_empty() && !list.iter().any(|s| s == item) {
        list.push(item.to_string());
    }
}

fn recent(list: &[String]) -> &[String] {
    &list[list.len().saturating_sub(RECENT_ITEMS)..]
}

fn names(items: &[(String, u32)]) -> String {
    items
        .iter()
        .map(|(n, _)| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::fmt::Display for ProfileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Turns analysed: {}", self.turn_count)?;
        let list = |items: &[String]| {
            if items.is_empty() {
                "(none yet)".to_string()
            } else {
                items.join("; ")
            }
        };
        let tally = |items: &[(String, u32)]| {
            if items.is_empty() {
                "(none yet)".to_string()
            } else {
                items
                    .iter()
                    .map(|(n, c)| format!("{n} ({c})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };
        writeln!(f, "Skills:      {}", list(&self.skills))?;
        writeln!(f, "Weaknesses:  {}", list(&self.weaknesses))?;
        writeln!(f, "Topics:      {}", tally(&self.top_themes))?;
        write!(f, "Traits:      {}", tally(&self.top_traits))
    }
}
