//! Timer scheduling for animation ticks and delayed status changes.
//!
//! Ticks are delivered one firing at a time through [`Scheduler::poll_until`],
//! so a dispatch that cancels a timer takes effect before that timer could be
//! polled again.

use std::{collections::BTreeMap, time::Duration};

/// Opaque handle to an installed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

pub trait Scheduler {
    /// Installs a recurring timer whose first firing is one `interval` away.
    fn every(&mut self, interval: Duration) -> TimerHandle;

    /// Installs a one-shot timer.
    fn after(&mut self, delay: Duration) -> TimerHandle;

    /// Removes a timer. Returns `false` when it was not live.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Current position of the scheduler clock.
    fn now(&self) -> Duration;

    /// Pops the earliest firing due at or before `deadline`, moving the clock
    /// to its due time. Returns `None` once nothing is due, leaving the clock
    /// at `deadline`.
    fn poll_until(&mut self, deadline: Duration) -> Option<TimerHandle>;

    fn is_live(&self, handle: TimerHandle) -> bool;
}

#[derive(Debug, Clone)]
struct Timer {
    due: Duration,
    period: Option<Duration>,
}

/// Scheduler driven by an explicit clock. The caller decides how time passes:
/// from wall-clock deltas in an interactive run, or in fixed steps when output
/// must be reproducible.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<TimerHandle, Timer>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }

    fn install(&mut self, delay: Duration, period: Option<Duration>) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.insert(
            handle,
            Timer {
                due: self.now + delay,
                period,
            },
        );
        handle
    }
}

impl Scheduler for VirtualScheduler {
    fn every(&mut self, interval: Duration) -> TimerHandle {
        let interval = interval.max(Duration::from_millis(1));
        self.install(interval, Some(interval))
    }

    fn after(&mut self, delay: Duration) -> TimerHandle {
        self.install(delay, None)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    fn now(&self) -> Duration {
        self.now
    }

    fn poll_until(&mut self, deadline: Duration) -> Option<TimerHandle> {
        // Ties resolve in installation order.
        let next = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(handle, timer)| (timer.due, **handle))
            .map(|(handle, timer)| (*handle, timer.due));

        let Some((handle, due)) = next else {
            self.now = self.now.max(deadline);
            return None;
        };

        self.now = self.now.max(due);
        match self.timers.get(&handle).and_then(|timer| timer.period) {
            Some(period) => {
                if let Some(timer) = self.timers.get_mut(&handle) {
                    timer.due = due + period;
                }
            }
            None => {
                self.timers.remove(&handle);
            }
        }
        Some(handle)
    }

    fn is_live(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }
}

/// Formats an elapsed duration as `HH:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
