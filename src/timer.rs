//! Single-shot cancelable timer slot
//!
//! Each component that defers work owns exactly one `TimerSlot`. Arming a
//! slot replaces whatever was pending, so a component can never leak or
//! double-fire a timer. The slot carries a payload describing what the
//! timer was armed for; the owner re-checks that payload when it fires.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct TimerSlot<T> {
    pending: Option<(Instant, T)>,
}

impl<T> Default for TimerSlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> TimerSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot to fire `delay` after `now`, cancelling any pending timer
    pub fn arm(&mut self, now: Instant, delay: Duration, payload: T) {
        self.pending = Some((now + delay, payload));
    }

    /// Cancel the pending timer, if any. Returns true if something was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn payload(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, payload)| payload)
    }

    /// Disarm and return the payload if the deadline has been reached
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => {
                self.pending.take().map(|(_, payload)| payload)
            }
            _ => None,
        }
    }
}

/// Earliest of a set of optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_replaces_pending_timer() {
        let now = Instant::now();
        let mut slot = TimerSlot::new();
        slot.arm(now, Duration::from_millis(100), "first");
        slot.arm(now, Duration::from_millis(300), "second");

        assert_eq!(slot.deadline(), Some(now + Duration::from_millis(300)));
        assert!(slot.take_due(now + Duration::from_millis(100)).is_none());
        assert_eq!(slot.take_due(now + Duration::from_millis(300)), Some("second"));
        assert!(slot.deadline().is_none());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let now = Instant::now();
        let mut slot = TimerSlot::new();
        slot.arm(now, Duration::from_millis(10), ());
        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert!(slot.take_due(now + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_earliest_skips_empty_slots() {
        let now = Instant::now();
        let later = now + Duration::from_millis(5);
        assert_eq!(earliest([None, Some(later), Some(now)]), Some(now));
        assert_eq!(earliest([None, None]), None);
    }
}
