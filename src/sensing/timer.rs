//! One-shot timers and a manually advanced clock
//!
//! Components arm timers through `TimerService` and remember the handle.
//! The host advances a `ManualClock` and routes each fired handle back to
//! whoever armed it. Fired handles come out one at a time from `pop_due`,
//! so a callback that re-arms with a tiny delay is picked up by the host's
//! loop rather than by recursion.

use std::collections::BTreeMap;

use crate::core::types::Seconds;

/// Opaque handle for a pending one-shot timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Timer scheduling capability handed to components
pub trait TimerService {
    /// Current clock time
    fn now(&self) -> Seconds;

    /// Arm a one-shot timer firing `delay` seconds from now
    fn set_timer(&mut self, delay: Seconds) -> TimerHandle;

    /// Seconds since the timer was armed, None if it is not pending
    fn timer_elapsed(&self, handle: TimerHandle) -> Option<Seconds>;

    /// Cancel a pending timer. Unknown handles are ignored.
    fn clear_timer(&mut self, handle: TimerHandle);

    fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timer_elapsed(handle).is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    armed_at: Seconds,
    due: Seconds,
}

/// Deterministic clock for headless runs and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Seconds,
    target: Seconds,
    next_id: u64,
    pending: BTreeMap<TimerHandle, PendingTimer>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the target time forward by `dt`
    ///
    /// The clock stops at each due timer as `pop_due` hands it out and
    /// reaches the target once nothing else is due. Drain `pop_due` after
    /// each call.
    pub fn advance(&mut self, dt: Seconds) {
        self.target += dt.max(0.0);
        if self.next_due_time().map_or(true, |due| due > self.target) {
            self.now = self.target;
        }
    }

    /// Pop the earliest timer due at or before the target time
    ///
    /// Moves the clock to that timer's due time. Returns None, with the clock
    /// on the target, once nothing else is due.
    pub fn pop_due(&mut self) -> Option<TimerHandle> {
        let due = self
            .pending
            .iter()
            .filter(|(_, t)| t.due <= self.target)
            .min_by(|(ha, a), (hb, b)| a.due.total_cmp(&b.due).then(ha.cmp(hb)))
            .map(|(h, t)| (*h, t.due));

        match due {
            Some((handle, at)) => {
                self.pending.remove(&handle);
                self.now = self.now.max(at);
                Some(handle)
            }
            None => {
                self.now = self.target;
                None
            }
        }
    }

    /// Time the clock is heading for
    pub fn target_time(&self) -> Seconds {
        self.target
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Due time of the earliest pending timer
    pub fn next_due_time(&self) -> Option<Seconds> {
        self.pending
            .values()
            .map(|t| t.due)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn due_time(&self, handle: TimerHandle) -> Option<Seconds> {
        self.pending.get(&handle).map(|t| t.due)
    }
}

impl TimerService for ManualClock {
    fn now(&self) -> Seconds {
        self.now
    }

    fn set_timer(&mut self, delay: Seconds) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.insert(
            handle,
            PendingTimer {
                armed_at: self.now,
                due: self.now + delay.max(0.0),
            },
        );
        handle
    }

    fn timer_elapsed(&self, handle: TimerHandle) -> Option<Seconds> {
        self.pending.get(&handle).map(|t| self.now - t.armed_at)
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut ManualClock) -> Vec<TimerHandle> {
        let mut fired = Vec::new();
        while let Some(h) = clock.pop_due() {
            fired.push(h);
        }
        fired
    }

    #[test]
    fn test_timer_fires_when_due() {
        let mut clock = ManualClock::new();
        let h = clock.set_timer(0.5);

        clock.advance(0.4);
        assert!(drain(&mut clock).is_empty());
        assert!((clock.now() - 0.4).abs() < 1e-6);
        assert!((clock.timer_elapsed(h).unwrap() - 0.4).abs() < 1e-6);

        clock.advance(0.2);
        assert_eq!(drain(&mut clock), vec![h]);
        assert!(!clock.is_pending(h));
        assert!(clock.timer_elapsed(h).is_none());
        assert!((clock.now() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let mut clock = ManualClock::new();
        let late = clock.set_timer(0.3);
        let early = clock.set_timer(0.1);

        clock.advance(1.0);
        assert_eq!(clock.pop_due(), Some(early));
        assert!((clock.now() - 0.1).abs() < 1e-6);
        assert_eq!(clock.pop_due(), Some(late));
        assert!((clock.now() - 0.3).abs() < 1e-6);
        assert_eq!(clock.pop_due(), None);
        assert!((clock.now() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_timer_armed_during_drain_fires_in_same_window() {
        let mut clock = ManualClock::new();
        let first = clock.set_timer(0.1);

        clock.advance(0.5);
        assert_eq!(clock.pop_due(), Some(first));

        // Re-armed from the callback at t = 0.1, due at 0.35
        let second = clock.set_timer(0.25);
        assert!((clock.due_time(second).unwrap() - 0.35).abs() < 1e-6);
        assert_eq!(clock.pop_due(), Some(second));
        assert_eq!(clock.pop_due(), None);
    }

    #[test]
    fn test_clear_timer() {
        let mut clock = ManualClock::new();
        let h = clock.set_timer(0.1);
        clock.clear_timer(h);
        clock.clear_timer(h);

        clock.advance(1.0);
        assert!(drain(&mut clock).is_empty());
        assert_eq!(clock.pending_count(), 0);
    }
}
