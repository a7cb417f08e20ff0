//! Profile patches for purchases and equipping cosmetics.
//!
//! Balances are written as absolute values computed from the local profile,
//! so two purchases racing from different devices can lose one debit.

use chorus_model::{Patch, StoreItem, StoreItemKind, User, VipPackage};
use serde_json::Value;

use crate::PresenceError;

fn debit(user: &User, amount: i64) -> Result<i64, PresenceError> {
    if user.coins < amount {
        return Err(PresenceError::InsufficientCoins {
            needed: amount,
            available: user.coins,
        });
    }
    Ok(user.coins - amount)
}

pub fn purchase_item(user: &User, item: &StoreItem) -> Result<Patch, PresenceError> {
    if user.owns(&item.id) {
        return Err(PresenceError::AlreadyOwned(item.id.clone()));
    }

    let coins = debit(user, item.price)?;
    Ok(Patch::new()
        .set("coins", coins)
        .array_union("ownedItems", vec![Value::String(item.id.clone())]))
}

pub fn purchase_vip(user: &User, package: &VipPackage) -> Result<Patch, PresenceError> {
    let coins = debit(user, package.cost)?;
    Ok(Patch::new()
        .set("isVip", true)
        .set("vipLevel", package.level)
        .set("coins", coins)
        .set("frame", package.frame_url.clone())
        .set("nameStyle", package.name_style.clone()))
}

pub fn equip(user: &User, item: &StoreItem) -> Result<Patch, PresenceError> {
    if !user.owns(&item.id) {
        return Err(PresenceError::NotOwned(item.id.clone()));
    }

    let field = match item.kind {
        StoreItemKind::Frame => "frame",
        StoreItemKind::Bubble => "activeBubble",
    };
    Ok(Patch::new().set(field, item.url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_model::FieldOp;
    use serde_json::json;

    fn frame() -> StoreItem {
        StoreItem {
            id: "frame_gold".to_string(),
            name: "Gold".to_string(),
            kind: StoreItemKind::Frame,
            price: 2000,
            url: "gold.png".to_string(),
        }
    }

    fn buyer(coins: i64, owned: &[&str]) -> User {
        User {
            id: "u1".to_string(),
            coins,
            owned_items: owned.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_purchase_item_debits_and_grants() {
        let patch = purchase_item(&buyer(5000, &[]), &frame()).unwrap();

        assert_eq!(patch.get("coins"), Some(&FieldOp::Set(json!(3000))));
        assert_eq!(
            patch.get("ownedItems"),
            Some(&FieldOp::ArrayUnion(vec![json!("frame_gold")]))
        );
    }

    #[test]
    fn test_purchase_rejections() {
        assert!(matches!(
            purchase_item(&buyer(1999, &[]), &frame()),
            Err(PresenceError::InsufficientCoins { needed: 2000, available: 1999 })
        ));
        assert!(matches!(
            purchase_item(&buyer(5000, &["frame_gold"]), &frame()),
            Err(PresenceError::AlreadyOwned(_))
        ));
    }

    #[test]
    fn test_purchase_vip() {
        let package = VipPackage {
            level: 2,
            name: "VIP 2".to_string(),
            cost: 100,
            frame_url: "vip2.png".to_string(),
            name_style: "vip-name-2".to_string(),
        };
        let patch = purchase_vip(&buyer(150, &[]), &package).unwrap();

        assert_eq!(patch.get("isVip"), Some(&FieldOp::Set(json!(true))));
        assert_eq!(patch.get("vipLevel"), Some(&FieldOp::Set(json!(2))));
        assert_eq!(patch.get("coins"), Some(&FieldOp::Set(json!(50))));
        assert_eq!(patch.get("frame"), Some(&FieldOp::Set(json!("vip2.png"))));
    }

    #[test]
    fn test_equip_by_kind() {
        let patch = equip(&buyer(0, &["frame_gold"]), &frame()).unwrap();
        assert_eq!(patch.get("frame"), Some(&FieldOp::Set(json!("gold.png"))));

        let bubble = StoreItem {
            id: "bubble_star".to_string(),
            kind: StoreItemKind::Bubble,
            ..frame()
        };
        let patch = equip(&buyer(0, &["bubble_star"]), &bubble).unwrap();
        assert_eq!(patch.get("activeBubble"), Some(&FieldOp::Set(json!("gold.png"))));

        assert!(matches!(equip(&buyer(0, &[]), &frame()), Err(PresenceError::NotOwned(_))));
    }
}
