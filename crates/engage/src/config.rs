use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Experience credited per created record. Zero skips the credit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    pub comment_experience: i64,
    pub review_experience: i64,
    pub vote_experience: i64,
    pub report_experience: i64,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            comment_experience: 5,
            review_experience: 10,
            vote_experience: 2,
            report_experience: 0,
        }
    }
}

/// Pipeline tuning. Every field has a default; a JSON document only needs
/// the fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub rewards: RewardSchedule,
    #[serde(with = "duration_secs")]
    pub listing_cache_ttl: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_comment_length: usize,
    pub max_review_title_length: usize,
    pub max_review_length: usize,
    pub max_report_reason_length: usize,
    pub unknown_user: String,
    pub vote_denied_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rewards: RewardSchedule::default(),
            listing_cache_ttl: Duration::from_secs(300),
            default_page_size: 20,
            max_page_size: 100,
            max_comment_length: 2000,
            max_review_title_length: 100,
            max_review_length: 10_000,
            max_report_reason_length: 500,
            unknown_user: "Unknown User".to_string(),
            vote_denied_message: "You are not eligible to vote right now".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_rewards(mut self, rewards: RewardSchedule) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_listing_cache_ttl(mut self, ttl: Duration) -> Self {
        self.listing_cache_ttl = ttl;
        self
    }

    pub fn with_page_sizes(mut self, default_size: u32, max_size: u32) -> Self {
        self.default_page_size = default_size;
        self.max_page_size = max_size;
        self
    }

    pub fn with_unknown_user(mut self, placeholder: impl Into<String>) -> Self {
        self.unknown_user = placeholder.into();
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_defaults() {
        let cfg = PipelineConfig::from_json(
            r#"{"rewards": {"comment_experience": 8}, "listing_cache_ttl": 60}"#,
        )
        .unwrap();
        assert_eq!(cfg.rewards.comment_experience, 8);
        assert_eq!(cfg.rewards.review_experience, 10);
        assert_eq!(cfg.listing_cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.unknown_user, "Unknown User");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(PipelineConfig::from_json("{\"max_page_size\": \"lots\"}").is_err());
    }
}
