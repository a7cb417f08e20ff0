//! User records: identity, economy, inventory and social counters.

use serde::{Deserialize, Serialize};

/// Prefix of the inventory marker recording that a user follows another.
/// Follow state shares the `ownedItems` set with purchased items.
pub const FOLLOW_PREFIX: &str = "follow_";

/// Inventory marker for following `target_id`
pub fn follow_marker(target_id: &str) -> String {
    format!("{FOLLOW_PREFIX}{target_id}")
}

/// Ordered user tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserLevel {
    #[default]
    New,
    Bronze,
    Silver,
    Gold,
    Diamond,
    Vip,
}

impl UserLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::New => "New",
            UserLevel::Bronze => "Bronze",
            UserLevel::Silver => "Silver",
            UserLevel::Gold => "Gold",
            UserLevel::Diamond => "Diamond",
            UserLevel::Vip => "VIP",
        }
    }
}

impl std::fmt::Display for UserLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub likes: i64,
    pub visitors: i64,
    pub following: i64,
    pub followers: i64,
}

/// A user record as stored under `users/<id>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    /// Short shareable number, also used as the key of rooms this user hosts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<u64>,
    pub name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_bubble: Option<String>,
    pub bio: String,
    pub location: String,
    pub level: UserLevel,

    // === Economy ===
    /// Spendable balance
    pub coins: i64,
    /// Earned balance
    pub diamonds: i64,
    pub is_vip: bool,
    pub vip_level: u32,
    pub wealth: i64,
    pub charm: i64,
    /// Purchased item ids, plus `follow_<id>` markers
    pub owned_items: Vec<String>,

    // === Moderation ===
    pub is_banned: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    pub stats: UserStats,
}

impl User {
    /// Whether this user's inventory holds the follow marker for `target_id`
    pub fn follows(&self, target_id: &str) -> bool {
        let marker = follow_marker(target_id);
        self.owned_items.iter().any(|item| *item == marker)
    }

    /// Whether this user owns a purchasable item (follow markers excluded)
    pub fn owns(&self, item_id: &str) -> bool {
        !item_id.starts_with(FOLLOW_PREFIX) && self.owned_items.iter().any(|item| item == item_id)
    }

    /// Ids of users this user follows, recovered from inventory markers
    pub fn followed_ids(&self) -> impl Iterator<Item = &str> {
        self.owned_items
            .iter()
            .filter_map(|item| item.strip_prefix(FOLLOW_PREFIX))
    }

    /// Name shown to others, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_partial_record() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "name": "Mira",
            "customId": 48213,
            "isBanned": true,
            "stats": { "followers": 3 }
        }))
        .unwrap();

        assert_eq!(user.custom_id, Some(48213));
        assert!(user.is_banned);
        assert_eq!(user.stats.followers, 3);
        assert_eq!(user.stats.following, 0);
        assert_eq!(user.level, UserLevel::New);
        assert!(user.owned_items.is_empty());
    }

    #[test]
    fn test_encode_uses_store_field_names() {
        let user = User {
            id: "u1".to_string(),
            owned_items: vec!["frame_gold".to_string()],
            is_vip: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&user).unwrap();

        assert_eq!(value["ownedItems"], json!(["frame_gold"]));
        assert_eq!(value["isVip"], json!(true));
        assert!(value.get("customId").is_none());
    }

    #[test]
    fn test_level_ordering() {
        assert!(UserLevel::New < UserLevel::Silver);
        assert!(UserLevel::Gold < UserLevel::Vip);
        assert_eq!(serde_json::to_value(UserLevel::Vip).unwrap(), json!("VIP"));
    }

    #[test]
    fn test_follow_markers_share_inventory() {
        let user = User {
            owned_items: vec!["frame_gold".to_string(), follow_marker("u7")],
            ..Default::default()
        };

        assert!(user.follows("u7"));
        assert!(!user.follows("u8"));
        assert!(user.owns("frame_gold"));
        assert!(!user.owns("follow_u7"));
        assert_eq!(user.followed_ids().collect::<Vec<_>>(), vec!["u7"]);
    }
}
