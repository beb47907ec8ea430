//! Signal extraction from a single user message.
//!
//! [`analyze`] is pure. Turning signals into an importance score needs the
//! running theme counts, so that part lives in
//! [`UserProfile::update`](crate::UserProfile::update).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;

/// Max characters kept from a message when recording a skill or weakness.
pub const SNIPPET_CHARS: usize = 60;

const SKILL_PATTERN: &str = r"(?i)\b(i (?:am|can|know|built|made|work|use|code|wrote|designed|developed|lead|created)|my (?:project|work|job|startup|company|code|app|bot|api|skill)|i(?:'m| am) (?:a|an) \w+)\b";

const WEAKNESS_PATTERN: &str = r"(?i)\b(i (?:can'?t|couldn'?t|don'?t know|failed|forgot|broke|messed|struggle|suck|don'?t understand)|my (?:code|bug|error|mistake|issue|problem)|why (?:doesn'?t|isn'?t|won'?t|can'?t))\b";

static SKILL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(SKILL_PATTERN).ok());
static WEAKNESS_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(WEAKNESS_PATTERN).ok());
static WORD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b\w+\b").ok());

/// Topic categories and their keywords.
pub const THEMES: &[(&str, &[&str])] = &[
    (
        "coding",
        &[
            "code", "python", "javascript", "bug", "git", "commit", "deploy", "debug",
            "function", "loop", "error", "exception", "stack", "api", "sql", "framework",
        ],
    ),
    (
        "career",
        &[
            "job", "interview", "resume", "cv", "salary", "promotion", "manager", "startup",
            "intern", "hire", "fired",
        ],
    ),
    (
        "relationships",
        &[
            "girlfriend", "boyfriend", "date", "dating", "crush", "friend", "family", "mom",
            "dad", "ex",
        ],
    ),
    (
        "fitness",
        &["gym", "workout", "diet", "weight", "run", "exercise", "fat", "muscle", "protein"],
    ),
    (
        "gaming",
        &["game", "gamer", "play", "level", "rank", "noob", "pvp", "fps", "rpg", "stream"],
    ),
    (
        "ai_ml",
        &[
            "ai", "ml", "model", "neural", "gpt", "llm", "dataset", "train", "loss",
            "accuracy", "embedding",
        ],
    ),
    (
        "college",
        &[
            "college", "university", "degree", "exam", "assignment", "professor", "student",
            "gpa", "lecture",
        ],
    ),
];

/// Words that signal an emotionally charged message.
pub const EMOTIONS: &[&str] = &[
    "hate", "love", "scared", "proud", "angry", "excited", "sad", "happy", "frustrated",
    "confused", "lost", "embarrassed", "awesome", "terrible", "horrible", "amazing",
    "disgusting", "jealous",
];

/// Personality traits and the phrases that give them away.
pub const TRAITS: &[(&str, &[&str])] = &[
    (
        "overconfident",
        &["obviously", "trust me", "i know best", "clearly", "of course i", "no one can"],
    ),
    (
        "self_deprecating",
        &["lol i", "haha i suck", "i know i'm bad", "don't roast me", "i'm the worst"],
    ),
    (
        "curious",
        &["how does", "why does", "can you explain", "what is", "what are", "how do i"],
    ),
    (
        "defensive",
        &["that's not fair", "actually i", "you're wrong", "not true", "stop roasting"],
    ),
];

/// Everything one message reveals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSignals {
    /// Snippet to record when the message claims a skill.
    pub skill: Option<String>,
    /// Snippet to record when the message admits a weakness.
    pub weakness: Option<String>,
    /// Matched topic categories with their keyword hit counts.
    pub themes: Vec<(&'static str, u32)>,
    pub emotional: bool,
    /// Trait categories with at least one matching phrase.
    pub traits: Vec<&'static str>,
    pub question: bool,
    /// Whitespace-separated word count.
    pub word_count: usize,
}

/// First [`SNIPPET_CHARS`] characters of `text`, trimmed.
pub fn snippet(text: &str) -> String {
    text.chars()
        .take(SNIPPET_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

fn matches(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Extract signals from a user message.
pub fn analyze(text: &str) -> TurnSignals {
    let lower = text.to_lowercase();

    let words: HashSet<&str> = match WORD_RE.as_ref() {
        Some(re) => re.find_iter(&lower).map(|m| m.as_str()).collect(),
        None => lower.split_whitespace().collect(),
    };

    let skill = matches(&SKILL_RE, text).then(|| snippet(text));
    let weakness = matches(&WEAKNESS_RE, text).then(|| snippet(text));

    let themes = THEMES
        .iter()
        .filter_map(|(name, keywords)| {
            let hits = keywords.iter().filter(|k| words.contains(*k)).count() as u32;
            (hits > 0).then_some((*name, hits))
        })
        .collect();

    let emotional = EMOTIONS.iter().any(|e| words.contains(e));

    let traits = TRAITS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(name, _)| *name)
        .collect();

    TurnSignals {
        skill,
        weakness,
        themes,
        emotional,
        traits,
        question: text.contains('?'),
        word_count: text.split_whitespace().count(),
    }
}
