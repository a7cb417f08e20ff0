//! Singleton configuration documents under `appSettings/*` and the
//! fallback catalogs used when they are absent.

use serde::{Deserialize, Serialize};

use crate::document::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuckyMultiplier {
    pub label: String,
    pub value: u32,
    /// Percentage weight
    pub chance: u32,
}

/// Tuning for the in-room games, all rates in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub slots_win_rate: u32,
    pub wheel_win_rate: u32,
    pub lucky_gift_win_rate: u32,
    pub lucky_gift_refund_percent: u32,
    pub lucky_x_enabled: bool,
    pub lucky_multipliers: Vec<LuckyMultiplier>,
    pub wheel_jackpot_x: u32,
    pub wheel_normal_x: u32,
    pub slots_seven_x: u32,
    pub slots_fruit_x: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        let multiplier = |label: &str, value, chance| LuckyMultiplier {
            label: label.to_string(),
            value,
            chance,
        };

        Self {
            slots_win_rate: 35,
            wheel_win_rate: 45,
            lucky_gift_win_rate: 30,
            lucky_gift_refund_percent: 200,
            lucky_x_enabled: true,
            lucky_multipliers: vec![
                multiplier("X10", 10, 70),
                multiplier("X50", 50, 20),
                multiplier("X100", 100, 8),
                multiplier("X500", 500, 2),
            ],
            wheel_jackpot_x: 8,
            wheel_normal_x: 2,
            slots_seven_x: 20,
            slots_fruit_x: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gift {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub cost: i64,
    #[serde(default)]
    pub is_lucky: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreItemKind {
    Frame,
    Bubble,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: StoreItemKind,
    pub price: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VipPackage {
    pub level: u32,
    pub name: String,
    pub cost: i64,
    #[serde(default)]
    pub frame_url: String,
    #[serde(default)]
    pub name_style: String,
}

fn gift(id: &str, name: &str, icon: &str, cost: i64, is_lucky: bool) -> Gift {
    Gift {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        cost,
        is_lucky,
    }
}

fn item(id: &str, name: &str, kind: StoreItemKind, price: i64, url: &str) -> StoreItem {
    StoreItem {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        price,
        url: url.to_string(),
    }
}

fn vip(level: u32, name: &str, cost: i64) -> VipPackage {
    VipPackage {
        level,
        name: name.to_string(),
        cost,
        frame_url: format!("https://cdn.chorus.live/frames/vip{level}.png"),
        name_style: format!("vip-name-{level}"),
    }
}

pub fn default_gifts() -> Vec<Gift> {
    vec![
        gift("rose", "Rose", "🌹", 10, false),
        gift("heart", "Heart", "💖", 50, false),
        gift("clover", "Lucky Clover", "🍀", 100, true),
        gift("crown", "Crown", "👑", 1000, false),
        gift("rocket", "Rocket", "🚀", 5000, false),
    ]
}

pub fn default_store_items() -> Vec<StoreItem> {
    vec![
        item("frame_gold", "Gold Frame", StoreItemKind::Frame, 2000, "https://cdn.chorus.live/frames/gold.png"),
        item("frame_neon", "Neon Frame", StoreItemKind::Frame, 3500, "https://cdn.chorus.live/frames/neon.png"),
        item("bubble_star", "Star Bubble", StoreItemKind::Bubble, 1500, "https://cdn.chorus.live/bubbles/star.png"),
    ]
}

pub fn default_vip_levels() -> Vec<VipPackage> {
    vec![
        vip(1, "VIP 1", 5_000),
        vip(2, "VIP 2", 20_000),
        vip(3, "VIP 3", 50_000),
        vip(4, "VIP 4", 150_000),
    ]
}

/// Cached copies of every settings document
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub banner: Option<String>,
    pub game: GameSettings,
    pub gifts: Vec<Gift>,
    pub store_items: Vec<StoreItem>,
    pub vip_levels: Vec<VipPackage>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            banner: None,
            game: GameSettings::default(),
            gifts: default_gifts(),
            store_items: default_store_items(),
            vip_levels: default_vip_levels(),
        }
    }
}

fn list_field<T: serde::de::DeserializeOwned>(doc: &Document, field: &str) -> Option<Vec<T>> {
    doc.field(field)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

impl AppSettings {
    /// `appSettings/global`: only fields present in the document are applied;
    /// an absent document leaves the cache as is
    pub fn apply_global(&mut self, doc: Option<&Document>) {
        let Some(doc) = doc else { return };

        if let Some(banner) = doc.field("appBanner").and_then(|v| v.as_str())
            && !banner.is_empty()
        {
            self.banner = Some(banner.to_string());
        }

        if let Some(game) = doc
            .field("gameSettings")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
        {
            self.game = game;
        }
    }

    /// `appSettings/gifts`: falls back to the built-in catalog
    pub fn apply_gifts(&mut self, doc: Option<&Document>) {
        self.gifts = doc
            .and_then(|doc| list_field(doc, "gifts"))
            .unwrap_or_else(default_gifts);
    }

    /// `appSettings/store`: falls back to the built-in catalog
    pub fn apply_store(&mut self, doc: Option<&Document>) {
        self.store_items = doc
            .and_then(|doc| list_field(doc, "items"))
            .unwrap_or_else(default_store_items);
    }

    /// `appSettings/vip`: an absent document leaves the cache as is
    pub fn apply_vip(&mut self, doc: Option<&Document>) {
        if let Some(doc) = doc {
            self.vip_levels = list_field(doc, "levels").unwrap_or_else(default_vip_levels);
        }
    }

    pub fn store_item(&self, id: &str) -> Option<&StoreItem> {
        self.store_items.iter().find(|item| item.id == id)
    }

    pub fn vip_level(&self, level: u32) -> Option<&VipPackage> {
        self.vip_levels.iter().find(|pkg| pkg.level == level)
    }
}
