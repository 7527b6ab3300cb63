use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of human annotation attached to a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub text: String,
    #[serde(default)]
    pub info: DescriptionInfo,
}

/// Metadata about who provided a description and how it was received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionInfo {
    /// Influence of the description when ranking.
    pub prominence: i32,
    /// Rating given by other reviewers.
    pub rate: i32,
    pub provider: Option<String>,
    pub registered_at: Option<DateTime<Utc>>,
}

impl Description {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            info: DescriptionInfo::default(),
        }
    }

    /// Stamp the description with its provider and the current time.
    pub fn provided_by(mut self, provider: impl Into<String>) -> Self {
        self.info.provider = Some(provider.into());
        self.info.registered_at = Some(Utc::now());
        self
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
