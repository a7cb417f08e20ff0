//! Follow relationships.

use chorus_model::{DocPath, Patch, User, follow_marker};
use serde_json::Value;

use crate::PresenceError;

/// The writes behind one follow toggle.
///
/// `actor` and `target` are separate documents written one after the other
/// with no transaction. If the target write fails after the actor write
/// landed, the marker and `following` counter disagree with the target's
/// `followers` counter and nothing corrects it.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowPlan {
    /// Whether the actor follows the target once both writes land
    pub now_following: bool,
    /// Marker union/removal plus `stats.following` adjustment
    pub actor: (DocPath, Patch),
    /// `stats.followers` adjustment
    pub target: (DocPath, Patch),
}

/// Plan the inverse of the actor's current follow state for `target_id`
pub fn follow_toggle(actor: &User, target_id: &str) -> Result<FollowPlan, PresenceError> {
    if actor.id == target_id {
        return Err(PresenceError::SelfFollow);
    }

    let marker = vec![Value::String(follow_marker(target_id))];
    let now_following = !actor.follows(target_id);
    let delta = if now_following { 1 } else { -1 };

    let actor_patch = if now_following {
        Patch::new().array_union("ownedItems", marker)
    } else {
        Patch::new().array_remove("ownedItems", marker)
    }
    .increment("stats.following", delta);

    Ok(FollowPlan {
        now_following,
        actor: (DocPath::user(actor.id.clone()), actor_patch),
        target: (
            DocPath::user(target_id),
            Patch::new().increment("stats.followers", delta),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_model::FieldOp;
    use serde_json::json;

    fn user(id: &str, owned: &[&str]) -> User {
        User {
            id: id.to_string(),
            owned_items: owned.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_follow_adds_marker_and_counters() {
        let plan = follow_toggle(&user("a", &[]), "b").unwrap();

        assert!(plan.now_following);
        assert_eq!(plan.actor.0, DocPath::user("a"));
        assert_eq!(
            plan.actor.1.get("ownedItems"),
            Some(&FieldOp::ArrayUnion(vec![json!("follow_b")]))
        );
        assert_eq!(plan.actor.1.get("stats.following"), Some(&FieldOp::Increment(1)));
        assert_eq!(plan.target.0, DocPath::user("b"));
        assert_eq!(plan.target.1.get("stats.followers"), Some(&FieldOp::Increment(1)));
        assert_eq!(plan.target.1.len(), 1);
    }

    #[test]
    fn test_unfollow_is_exact_inverse() {
        let plan = follow_toggle(&user("a", &["follow_b"]), "b").unwrap();

        assert!(!plan.now_following);
        assert_eq!(
            plan.actor.1.get("ownedItems"),
            Some(&FieldOp::ArrayRemove(vec![json!("follow_b")]))
        );
        assert_eq!(plan.actor.1.get("stats.following"), Some(&FieldOp::Increment(-1)));
        assert_eq!(plan.target.1.get("stats.followers"), Some(&FieldOp::Increment(-1)));
    }

    #[test]
    fn test_cannot_follow_self() {
        assert!(matches!(
            follow_toggle(&user("a", &[]), "a"),
            Err(PresenceError::SelfFollow)
        ));
    }
}
