//! Head-of-feed change detection.
//!
//! The feed is newest-first, so "a new earthquake happened" reduces to
//! "the identity of index 0 changed between two polls". State is an
//! explicit value owned by the caller; nothing global.

use chrono::{DateTime, Utc};

use crate::models::Quake;

/// Poll-to-poll detector state.
///
/// One instance per watch loop. `polls` is a monotonic sequence number,
/// useful for log correlation when a UI refresh races the timer poll.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    /// Identity of the newest event seen on the last non-empty poll.
    last_newest_id: Option<String>,
    /// When the last check ran.
    last_poll: Option<DateTime<Utc>>,
    /// Number of checks performed.
    polls: u64,
}

impl PollState {
    /// Fresh state: the next check is treated as the first poll.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a transition check against this poll's normalized sequence.
    ///
    /// - Empty sequence: no-op, identity state untouched.
    /// - First poll: records the head identity, reports no transition
    ///   (suppresses a spurious notification on startup).
    /// - Head identity changed: reports the new head event.
    ///
    /// The stored identity is always overwritten with the current head
    /// afterwards, whatever the outcome.
    pub fn check(&mut self, quakes: &[Quake], now: DateTime<Utc>) -> Transition {
        self.polls += 1;
        self.last_poll = Some(now);

        let Some(head) = quakes.first() else {
            return Transition::None;
        };

        let outcome = match self.last_newest_id.as_deref() {
            None => Transition::None,
            Some(prev) if prev == head.id => Transition::None,
            Some(_) => Transition::NewQuake(head.clone()),
        };

        self.last_newest_id = Some(head.id.clone());
        outcome
    }

    /// Sequence number of the most recent check.
    #[must_use]
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// When the most recent check ran, if any.
    #[must_use]
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.last_poll
    }
}

/// Result of a transition check.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Head identity unchanged (or nothing to compare yet).
    None,
    /// The feed's newest event changed; payload is the new head.
    NewQuake(Quake),
}

impl Transition {
    /// Whether this check found a new event.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::NewQuake(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quake(id: &str, mag: f64) -> Quake {
        Quake {
            id: id.to_string(),
            magnitude: mag,
            place: "test".to_string(),
            occurred_at: Utc::now(),
            latitude: 0.0,
            longitude: 0.0,
            located: false,
        }
    }

    #[test]
    fn test_first_poll_never_notifies() {
        let mut state = PollState::new();
        let t = state.check(&[quake("a", 4.2)], Utc::now());
        assert!(!t.is_new());
        assert_eq!(state.polls(), 1);
    }

    #[test]
    fn test_unchanged_head_no_transition() {
        let mut state = PollState::new();
        state.check(&[quake("a", 4.2)], Utc::now());
        let t = state.check(&[quake("a", 4.2)], Utc::now());
        assert!(!t.is_new());
    }

    #[test]
    fn test_changed_head_reports_new_event() {
        let mut state = PollState::new();
        state.check(&[quake("a", 4.2)], Utc::now());

        let t = state.check(&[quake("b", 6.1), quake("a", 4.2)], Utc::now());
        match t {
            Transition::NewQuake(q) => {
                assert_eq!(q.id, "b");
                assert!((q.magnitude - 6.1).abs() < 1e-9);
            }
            Transition::None => panic!("expected a transition"),
        }

        // Exactly one transition: the same head again is quiet.
        let t = state.check(&[quake("b", 6.1)], Utc::now());
        assert!(!t.is_new());
    }

    #[test]
    fn test_empty_poll_is_a_noop() {
        let mut state = PollState::new();
        state.check(&[quake("a", 4.2)], Utc::now());

        // Feed momentarily empty: identity must survive.
        let t = state.check(&[], Utc::now());
        assert!(!t.is_new());

        // Same head as before the gap, still no transition.
        let t = state.check(&[quake("a", 4.2)], Utc::now());
        assert!(!t.is_new());

        assert_eq!(state.polls(), 3);
    }

    #[test]
    fn test_polls_over_raw_records() {
        use serde_json::json;

        use crate::normalize;

        let mut state = PollState::new();
        let now = Utc::now();

        let poll1 = [json!({"id": "a", "mag": 4.2, "title": "X"})];
        let quakes = normalize::normalize_all(&poll1, now);
        assert_eq!(quakes[0].id, "a");
        assert_eq!(quakes[0].place, "X");
        assert!(!state.check(&quakes, now).is_new());

        let poll2 = [
            json!({"id": "b", "mag": 6.1, "title": "Y"}),
            json!({"id": "a", "mag": 4.2, "title": "X"}),
        ];
        let quakes = normalize::normalize_all(&poll2, now);
        match state.check(&quakes, now) {
            Transition::NewQuake(q) => {
                assert_eq!(q.id, "b");
                assert_eq!(q.place, "Y");
            }
            Transition::None => panic!("expected a transition"),
        }
    }

    #[test]
    fn test_last_poll_tracks_every_check() {
        let mut state = PollState::new();
        assert!(state.last_poll().is_none());

        let now = Utc::now();
        state.check(&[], now);
        assert_eq!(state.last_poll(), Some(now));
    }
}
