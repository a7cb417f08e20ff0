//! Display windows for lucky bags and announcements.
//!
//! Visibility is computed from timestamps when queried, so no timers are
//! needed; store state is never consulted to hide anything.

use chrono::{DateTime, TimeDelta, Utc};
use chorus_model::{GlobalAnnouncement, LuckyBag};

/// A bag older than this when it arrives is never shown
pub const LUCKY_BAG_MAX_AGE_SECS: i64 = 60;
/// How long a shown bag stays up
pub const LUCKY_BAG_DISPLAY_SECS: i64 = 15;
/// How long an announcement banner stays up
pub const ANNOUNCEMENT_DISPLAY_SECS: i64 = 8;

#[derive(Debug, Clone)]
struct Shown<T> {
    item: T,
    until: DateTime<Utc>,
}

impl<T> Shown<T> {
    fn visible(&self, now: DateTime<Utc>) -> Option<&T> {
        (now < self.until).then_some(&self.item)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Broadcasts {
    lucky_bag: Option<Shown<LuckyBag>>,
    announcement: Option<Shown<GlobalAnnouncement>>,
}

impl Broadcasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the latest bag if it is recent enough. Returns whether it was shown.
    pub fn offer_lucky_bag(&mut self, bag: LuckyBag, now: DateTime<Utc>) -> bool {
        if !bag.is_fresh(now, TimeDelta::seconds(LUCKY_BAG_MAX_AGE_SECS)) {
            return false;
        }

        self.lucky_bag = Some(Shown {
            item: bag,
            until: now + TimeDelta::seconds(LUCKY_BAG_DISPLAY_SECS),
        });
        true
    }

    pub fn lucky_bag(&self, now: DateTime<Utc>) -> Option<&LuckyBag> {
        self.lucky_bag.as_ref().and_then(|shown| shown.visible(now))
    }

    pub fn dismiss_lucky_bag(&mut self) {
        self.lucky_bag = None;
    }

    pub fn announce(&mut self, announcement: GlobalAnnouncement, now: DateTime<Utc>) {
        self.announcement = Some(Shown {
            item: announcement,
            until: now + TimeDelta::seconds(ANNOUNCEMENT_DISPLAY_SECS),
        });
    }

    pub fn announcement(&self, now: DateTime<Utc>) -> Option<&GlobalAnnouncement> {
        self.announcement.as_ref().and_then(|shown| shown.visible(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn bag_created_at(secs: i64) -> LuckyBag {
        LuckyBag {
            id: "bag".to_string(),
            room_id: "48213".to_string(),
            created_at: Some(at(secs).timestamp_millis()),
            ..Default::default()
        }
    }

    #[test]
    fn test_stale_bag_is_never_shown() {
        let mut board = Broadcasts::new();
        assert!(!board.offer_lucky_bag(bag_created_at(0), at(60)));
        assert!(board.lucky_bag(at(60)).is_none());
    }

    #[test]
    fn test_bag_hides_after_display_window() {
        let mut board = Broadcasts::new();
        assert!(board.offer_lucky_bag(bag_created_at(0), at(10)));

        assert!(board.lucky_bag(at(24)).is_some());
        assert!(board.lucky_bag(at(25)).is_none());
    }

    #[test]
    fn test_dismiss_bag() {
        let mut board = Broadcasts::new();
        board.offer_lucky_bag(bag_created_at(0), at(1));
        board.dismiss_lucky_bag();
        assert!(board.lucky_bag(at(2)).is_none());
    }

    #[test]
    fn test_announcement_window() {
        let mut board = Broadcasts::new();
        board.announce(GlobalAnnouncement::default(), at(0));

        assert!(board.announcement(at(7)).is_some());
        assert!(board.announcement(at(8)).is_none());
    }
}
