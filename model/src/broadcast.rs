//! Broadcast records shown to every client for a short time.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A promotional entry point pointing at a room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LuckyBag {
    pub id: String,
    pub room_id: String,
    pub sender_name: String,
    pub amount: i64,
    /// Epoch milliseconds assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl LuckyBag {
    /// Age check against a window; a bag without a timestamp counts as new
    pub fn is_fresh(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        is_within(self.created_at, now, window)
    }
}

/// A banner message such as a large gift being sent somewhere
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalAnnouncement {
    pub id: String,
    pub sender_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl GlobalAnnouncement {
    pub fn is_fresh(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        is_within(self.created_at, now, window)
    }
}

fn is_within(created_at: Option<i64>, now: DateTime<Utc>, window: TimeDelta) -> bool {
    let now_millis = now.timestamp_millis();
    let created = created_at.unwrap_or(now_millis);
    now_millis - created < window.num_milliseconds()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_freshness() {
        let now = DateTime::from_timestamp_millis(1_700_000_060_000).unwrap();
        let window = TimeDelta::seconds(60);

        let mut bag = LuckyBag {
            created_at: Some(1_700_000_000_001),
            ..Default::default()
        };
        assert!(bag.is_fresh(now, window));

        bag.created_at = Some(1_700_000_000_000);
        assert!(!bag.is_fresh(now, window));

        bag.created_at = None;
        assert!(bag.is_fresh(now, window));
    }
}
