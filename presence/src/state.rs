//! PresenceState - the room the user is in and how it is shown

use chorus_model::Room;

/// Which room surface is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// No active room
    Hidden,
    /// Full room view
    Full,
    /// Compact floating player
    Mini,
}

/// Result of folding a room-list snapshot into the state
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// No room was active
    Idle,
    /// The active room was found and replaced with its latest copy
    Refreshed,
    /// The active room is still listed but its latest copy couldn't be
    /// read; the previous copy was kept
    Unreadable,
    /// The active room is missing from the list and was dropped
    Evicted(Room),
}

/// Local presence state.
///
/// Invariant: `minimized` implies an active room. Every transition below
/// preserves it.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceState {
    active: Option<Room>,
    minimized: bool,
    muted: bool,
}

impl Default for PresenceState {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceState {
    pub fn new() -> Self {
        Self {
            active: None,
            minimized: false,
            muted: true,
        }
    }

    pub fn active(&self) -> Option<&Room> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|room| room.id.as_str())
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn view(&self) -> View {
        match (&self.active, self.minimized) {
            (None, _) => View::Hidden,
            (Some(_), false) => View::Full,
            (Some(_), true) => View::Mini,
        }
    }

    /// Make `room` the active room, shown full-size and muted
    pub fn enter(&mut self, room: Room) {
        self.active = Some(room);
        self.minimized = false;
        self.muted = true;
    }

    /// Drop the active room. Mute is left as is; the next `enter` resets it.
    pub fn exit(&mut self) -> Option<Room> {
        self.minimized = false;
        self.active.take()
    }

    /// Switch to the floating player. No-op without an active room.
    pub fn minimize(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.minimized = true;
        true
    }

    pub fn expand(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.minimized = false;
        true
    }

    /// Flip the microphone flag and return the new value
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    /// Replace the active room's copy with a locally echoed write. Ignored
    /// if the user has since moved to a different room.
    pub fn echo(&mut self, room: Room) -> bool {
        match &mut self.active {
            Some(active) if active.id == room.id => {
                *active = room;
                true
            }
            _ => false,
        }
    }

    /// Fold a full room-list snapshot into the state.
    ///
    /// `rooms` holds the decoded rooms and `listed` the id of every document
    /// in the snapshot. The active room is replaced wholesale by its copy in
    /// `rooms`, kept as is if it is listed but didn't decode, or dropped
    /// together with the minimized flag if it isn't listed.
    pub fn reconcile(&mut self, rooms: &[Room], listed: &[&str]) -> Reconciliation {
        let Some(active_id) = self.active_id() else {
            return Reconciliation::Idle;
        };

        if let Some(latest) = rooms.iter().find(|room| room.id == active_id) {
            self.active = Some(latest.clone());
            return Reconciliation::Refreshed;
        }
        if listed.iter().any(|id| *id == active_id) {
            return Reconciliation::Unreadable;
        }

        match self.exit() {
            Some(room) => Reconciliation::Evicted(room),
            None => Reconciliation::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, listeners: i64) -> Room {
        Room {
            id: id.to_string(),
            listeners,
            ..Default::default()
        }
    }

    fn assert_invariant(state: &PresenceState) {
        if state.is_minimized() {
            assert!(state.active().is_some());
        }
    }

    #[test]
    fn test_new_state() {
        let state = PresenceState::new();
        assert_eq!(state.view(), View::Hidden);
        assert!(state.is_muted());
    }

    #[test]
    fn test_enter_resets_mute() {
        let mut state = PresenceState::new();
        state.enter(room("a", 1));
        assert!(!state.toggle_mute());
        assert!(!state.is_muted());

        state.enter(room("b", 1));
        assert!(state.is_muted());
        assert_eq!(state.active_id(), Some("b"));
    }

    #[test]
    fn test_mute_survives_minimize_and_expand() {
        let mut state = PresenceState::new();
        state.enter(room("a", 1));
        state.toggle_mute();

        assert!(state.minimize());
        assert_eq!(state.view(), View::Mini);
        assert!(!state.is_muted());

        assert!(state.expand());
        assert_eq!(state.view(), View::Full);
        assert!(!state.is_muted());
    }

    #[test]
    fn test_minimize_without_room_is_noop() {
        let mut state = PresenceState::new();
        assert!(!state.minimize());
        assert!(!state.is_minimized());
        assert_invariant(&state);
    }

    #[test]
    fn test_exit_clears_minimized() {
        let mut state = PresenceState::new();
        state.enter(room("a", 1));
        state.minimize();

        assert_eq!(state.exit().map(|r| r.id), Some("a".to_string()));
        assert!(!state.is_minimized());
        assert_eq!(state.view(), View::Hidden);
    }

    #[test]
    fn test_reconcile_replaces_active_room() {
        let mut state = PresenceState::new();
        state.enter(room("a", 1));
        state.minimize();

        let outcome = state.reconcile(&[room("b", 9), room("a", 7)], &["b", "a"]);
        assert_eq!(outcome, Reconciliation::Refreshed);
        assert_eq!(state.active().map(|r| r.listeners), Some(7));
        assert!(state.is_minimized());
    }

    #[test]
    fn test_reconcile_evicts_missing_room() {
        let mut state = PresenceState::new();
        state.enter(room("a", 1));
        state.minimize();

        let outcome = state.reconcile(&[room("b", 9)], &["b"]);
        assert!(matches!(outcome, Reconciliation::Evicted(ref r) if r.id == "a"));
        assert_eq!(state.view(), View::Hidden);
        assert_invariant(&state);
    }

    #[test]
    fn test_reconcile_keeps_unreadable_room() {
        let mut state = PresenceState::new();
        state.enter(room("a", 4));
        state.minimize();

        // "a" is in the snapshot but failed to decode
        let outcome = state.reconcile(&[room("b", 9)], &["b", "a"]);
        assert_eq!(outcome, Reconciliation::Unreadable);
        assert_eq!(state.active().map(|r| r.listeners), Some(4));
        assert_eq!(state.view(), View::Mini);
    }

    #[test]
    fn test_reconcile_idle_without_room() {
        let mut state = PresenceState::new();
        assert_eq!(state.reconcile(&[], &[]), Reconciliation::Idle);
        assert_eq!(state.reconcile(&[room("a", 1)], &["a"]), Reconciliation::Idle);
        assert!(state.active().is_none());
    }

    #[test]
    fn test_echo_ignores_other_rooms() {
        let mut state = PresenceState::new();
        state.enter(room("a", 1));

        assert!(!state.echo(room("b", 5)));
        assert!(state.echo(room("a", 5)));
        assert_eq!(state.active().map(|r| r.listeners), Some(5));
    }
}
