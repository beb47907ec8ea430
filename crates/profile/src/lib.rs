//! User profiling for emberbot.
//!
//! Every user message is scored for importance (0–10) and mined for skills,
//! weaknesses, recurring topics and personality traits. The accumulated
//! [`UserProfile`] renders a snippet that personalises the system prompt.

pub mod profile;
pub mod scorer;

use chrono::Utc;
use emberbot_core::session::SessionId;
use emberbot_core::storage::ProfileRecord;

pub use profile::{MAX_SCORE, ProfileSummary, Tally, UserProfile};
pub use scorer::{TurnSignals, analyze};

impl UserProfile {
    /// Wrap this profile as a storage record for `session`.
    pub fn to_storage_record(&self, session: &SessionId) -> ProfileRecord {
        ProfileRecord {
            session_id: session.clone(),
            profile: self.to_record(),
            updated_at: Utc::now(),
        }
    }

    /// Restore from a storage record, falling back to an empty profile when
    /// the stored JSON is unreadable.
    pub fn from_storage_record(record: &ProfileRecord) -> Self {
        Self::from_record(&record.profile).unwrap_or_else(|e| {
            tracing::warn!(session = %record.session_id, error = %e, "Discarding unreadable profile");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_record_round_trip() {
        let mut p = UserProfile::new();
        p.update("I work at a startup and hate my manager", "");
        let record = p.to_storage_record(&SessionId::from("s"));
        assert_eq!(record.session_id.as_str(), "s");
        assert_eq!(UserProfile::from_storage_record(&record), p);
    }

    #[test]
    fn corrupt_record_yields_empty_profile() {
        let record = ProfileRecord {
            session_id: SessionId::from("s"),
            profile: serde_json::json!({"skills": 42}),
            updated_at: Utc::now(),
        };
        assert_eq!(UserProfile::from_storage_record(&record), UserProfile::default());
    }
}
