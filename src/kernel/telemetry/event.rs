use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One human-readable line in the session history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: Uuid,
    /// Wall-clock display string (`HH:MM:SS`, local zone).
    pub timestamp: String,
    pub text: String,
}

impl EventEntry {
    pub fn new(timestamp: String, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for EventEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp, self.text)
    }
}
