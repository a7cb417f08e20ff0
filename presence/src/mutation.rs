//! Room writes derived from user actions.
//!
//! Each function returns the patch to send plus, where the write is echoed
//! locally, the room copy to show until the next snapshot arrives.

use chorus_model::{Patch, Room, RoomDraft, SEAT_CAPACITY, Seat, User};
use serde_json::Value;

use crate::PresenceError;

/// Reject users the last synced profile marks as banned
pub fn ensure_can_join(user: &User) -> Result<(), PresenceError> {
    if user.is_banned {
        return Err(PresenceError::Banned);
    }
    Ok(())
}

/// Atomic `+1` on the listener counter
pub fn join_patch() -> Patch {
    Patch::new().increment("listeners", 1)
}

/// Local copy of `room` after our join lands
pub fn joined_echo(room: &Room) -> Room {
    Room {
        listeners: room.listeners.max(0) + 1,
        ..room.clone()
    }
}

/// Remove `user_id`'s seat and decrement the listener count, floored at
/// zero, as a single merge-write.
///
/// Both fields are absolute values computed from `room`, so the write is
/// only as fresh as the local copy.
pub fn leave_patch(room: &Room, user_id: &str) -> Result<Patch, PresenceError> {
    let speakers: Vec<Seat> = room
        .speakers
        .iter()
        .filter(|seat| seat.id != user_id)
        .cloned()
        .collect();

    Ok(seats_patch(&speakers)?.set("listeners", (room.listeners - 1).max(0)))
}

/// Seats after `user` claims `index`. A user already seated elsewhere moves.
pub fn take_seat(room: &Room, user: &User, index: usize) -> Result<Vec<Seat>, PresenceError> {
    if index >= SEAT_CAPACITY {
        return Err(PresenceError::SeatOutOfRange {
            index,
            capacity: SEAT_CAPACITY,
        });
    }

    if let Some(occupant) = room.seat_at(index) {
        if occupant.id == user.id {
            return Ok(room.speakers.clone());
        }
        return Err(PresenceError::SeatTaken(index));
    }

    let mut seats: Vec<Seat> = room
        .speakers
        .iter()
        .filter(|seat| seat.id != user.id)
        .cloned()
        .collect();
    seats.push(Seat::for_user(user, index));
    seats.sort_by_key(|seat| seat.seat_index);

    Ok(seats)
}

/// Seats after `user_id` steps down
pub fn leave_seat(room: &Room, user_id: &str) -> Result<Vec<Seat>, PresenceError> {
    if room.seat_of(user_id).is_none() {
        return Err(PresenceError::NotSeated);
    }

    Ok(room
        .speakers
        .iter()
        .filter(|seat| seat.id != user_id)
        .cloned()
        .collect())
}

/// Full rewrite of the seat array
pub fn seats_patch(seats: &[Seat]) -> Result<Patch, PresenceError> {
    let speakers = serde_json::to_value(seats).map_err(chorus_model::ModelError::from)?;
    Ok(Patch::new().set("speakers", speakers))
}

/// Local copy of `room` with `seats` applied
pub fn seated_echo(room: &Room, seats: Vec<Seat>) -> Room {
    Room {
        speakers: seats,
        ..room.clone()
    }
}

/// Full document for a newly opened room: the host takes seat 0 and counts
/// as the first listener
pub fn new_room(draft: &RoomDraft, host: &User, room_id: Option<&str>) -> Result<Patch, PresenceError> {
    let mut patch = Patch::from_fields(draft)?
        .set("hostId", host.id.clone())
        .set("listeners", 1)
        .set("speakers", seats_value(&[Seat::for_user(host, 0)])?)
        .server_timestamp("createdAt");

    if let Some(id) = room_id {
        patch = patch.set("id", Value::String(id.to_string()));
    }

    Ok(patch)
}

fn seats_value(seats: &[Seat]) -> Result<Value, PresenceError> {
    Ok(serde_json::to_value(seats).map_err(chorus_model::ModelError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_model::FieldOp;
    use serde_json::json;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_uppercase(),
            ..Default::default()
        }
    }

    fn room_with(listeners: i64, seated: &[(&str, usize)]) -> Room {
        Room {
            id: "r1".to_string(),
            host_id: "host".to_string(),
            listeners,
            speakers: seated
                .iter()
                .map(|(id, index)| Seat::for_user(&user(id), *index))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_banned_user_cannot_join() {
        let mut banned = user("u1");
        banned.is_banned = true;

        assert!(matches!(ensure_can_join(&banned), Err(PresenceError::Banned)));
        assert!(ensure_can_join(&user("u2")).is_ok());
    }

    #[test]
    fn test_join_is_an_increment() {
        assert_eq!(join_patch().get("listeners"), Some(&FieldOp::Increment(1)));
        assert_eq!(joined_echo(&room_with(3, &[])).listeners, 4);
        assert_eq!(joined_echo(&room_with(-1, &[])).listeners, 1);
    }

    #[test]
    fn test_leave_decrements() {
        let patch = leave_patch(&room_with(3, &[]), "a").unwrap();
        assert_eq!(patch.get("listeners"), Some(&FieldOp::Set(json!(2))));
    }

    #[test]
    fn test_leave_floors_at_zero() {
        let patch = leave_patch(&room_with(0, &[]), "a").unwrap();
        assert_eq!(patch.get("listeners"), Some(&FieldOp::Set(json!(0))));
    }

    #[test]
    fn test_leave_removes_own_seat_only() {
        let patch = leave_patch(&room_with(5, &[("a", 0), ("b", 1)]), "a").unwrap();
        let Some(FieldOp::Set(speakers)) = patch.get("speakers") else {
            panic!("speakers not rewritten");
        };

        let ids: Vec<&str> = speakers
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_take_free_seat() {
        let seats = take_seat(&room_with(2, &[("a", 0)]), &user("b"), 3).unwrap();
        assert_eq!(seats.len(), 2);
        assert_eq!(seats[1].id, "b");
        assert_eq!(seats[1].seat_index, 3);
    }

    #[test]
    fn test_take_seat_moves_existing_occupant() {
        let seats = take_seat(&room_with(2, &[("a", 0), ("b", 1)]), &user("b"), 5).unwrap();
        assert_eq!(seats.iter().filter(|s| s.id == "b").count(), 1);
        assert_eq!(seats.iter().find(|s| s.id == "b").map(|s| s.seat_index), Some(5));
    }

    #[test]
    fn test_take_seat_rejections() {
        let room = room_with(2, &[("a", 0)]);

        assert!(matches!(take_seat(&room, &user("b"), 0), Err(PresenceError::SeatTaken(0))));
        assert!(matches!(
            take_seat(&room, &user("b"), SEAT_CAPACITY),
            Err(PresenceError::SeatOutOfRange { .. })
        ));
        assert_eq!(take_seat(&room, &user("a"), 0).unwrap(), room.speakers);
    }

    #[test]
    fn test_leave_seat_requires_seat() {
        let room = room_with(2, &[("a", 0)]);
        assert!(matches!(leave_seat(&room, "b"), Err(PresenceError::NotSeated)));
        assert!(leave_seat(&room, "a").unwrap().is_empty());
    }

    #[test]
    fn test_new_room_document() {
        let draft = RoomDraft {
            title: "Evening talk".to_string(),
            ..Default::default()
        };
        let patch = new_room(&draft, &user("host"), Some("48213")).unwrap();

        assert_eq!(patch.get("title"), Some(&FieldOp::Set(json!("Evening talk"))));
        assert_eq!(patch.get("hostId"), Some(&FieldOp::Set(json!("host"))));
        assert_eq!(patch.get("listeners"), Some(&FieldOp::Set(json!(1))));
        assert_eq!(patch.get("id"), Some(&FieldOp::Set(json!("48213"))));
        assert_eq!(patch.get("createdAt"), Some(&FieldOp::ServerTimestamp));

        let generated = new_room(&draft, &user("host"), None).unwrap();
        assert!(generated.get("id").is_none());
    }
}
