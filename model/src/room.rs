//! Rooms and the seats inside them.

use serde::{Deserialize, Serialize};

use crate::user::{User, UserLevel};

/// Number of speaking seats in a room
pub const SEAT_CAPACITY: usize = 10;

/// An occupied speaking slot. Holds a snapshot of the occupant taken when
/// the seat was claimed, not a live reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Seat {
    /// Occupant's user id
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    pub level: UserLevel,
    pub vip_level: u32,
    pub seat_index: usize,
    /// Charm collected while seated, reset when the seat is claimed
    pub charm: i64,
}

impl Seat {
    pub fn for_user(user: &User, seat_index: usize) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            frame: user.frame.clone(),
            level: user.level,
            vip_level: user.vip_level,
            seat_index,
            charm: 0,
        }
    }
}

/// A live room as stored under `rooms/<id>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub host_id: String,
    /// Listener counter. Mutated remotely by increments, so a raced
    /// decrement may leave it below zero in the store.
    pub listeners: i64,
    pub speakers: Vec<Seat>,
    /// Epoch milliseconds assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl Room {
    /// Listener count as displayed, never negative
    pub fn listener_count(&self) -> u64 {
        self.listeners.max(0) as u64
    }

    pub fn seat_of(&self, user_id: &str) -> Option<&Seat> {
        self.speakers.iter().find(|seat| seat.id == user_id)
    }

    pub fn seat_at(&self, index: usize) -> Option<&Seat> {
        self.speakers.iter().find(|seat| seat.seat_index == index)
    }

    pub fn is_full(&self) -> bool {
        self.speakers.len() >= SEAT_CAPACITY
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }
}

/// Fields a host picks when opening a room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_room_with_seats() {
        let room: Room = serde_json::from_value(json!({
            "id": "48213",
            "hostId": "u1",
            "listeners": 3,
            "speakers": [
                { "id": "u1", "name": "Mira", "seatIndex": 0, "charm": 12, "coins": 999 }
            ]
        }))
        .unwrap();

        assert_eq!(room.listener_count(), 3);
        assert_eq!(room.seat_of("u1").map(|s| s.charm), Some(12));
        assert_eq!(room.seat_at(0).map(|s| s.name.as_str()), Some("Mira"));
        assert!(room.is_host("u1"));
    }

    #[test]
    fn test_negative_listeners_display_as_zero() {
        let room = Room {
            listeners: -2,
            ..Default::default()
        };
        assert_eq!(room.listener_count(), 0);
    }

    #[test]
    fn test_seat_snapshot_resets_charm() {
        let user = User {
            id: "u1".to_string(),
            name: "Mira".to_string(),
            charm: 500,
            vip_level: 3,
            ..Default::default()
        };
        let seat = Seat::for_user(&user, 4);

        assert_eq!(seat.seat_index, 4);
        assert_eq!(seat.charm, 0);
        assert_eq!(seat.vip_level, 3);
    }
}
