//! Sweep scheduling state.
//!
//! At most one sweep runs at a time. While one is pending every caller gets
//! a clone of the same [`SweepHandle`]; otherwise sweeps are gated by the
//! suspension flag, host readiness and a minimum interval.

use std::fmt;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt, Shared};

/// Lower bound of the interval between two sweeps.
pub const SWEEP_INTERVAL_MIN: Duration = Duration::from_secs(60);
/// Upper bound of the interval between two sweeps.
pub const SWEEP_INTERVAL_MAX: Duration = Duration::from_secs(300);

/// Awaitable outcome of a sweep request. Clones observe the same sweep.
pub type SweepHandle = Shared<BoxFuture<'static, ()>>;

/// Half the item lifetime, clamped into the allowed interval range.
pub fn sweep_interval_for(expiration: Duration) -> Duration {
    (expiration / 2).clamp(SWEEP_INTERVAL_MIN, SWEEP_INTERVAL_MAX)
}

/// Handle of a sweep request that had nothing to do.
pub(crate) fn completed_handle() -> SweepHandle {
    future::ready(()).boxed().shared()
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    Idle,
    Sweeping,
    /// Sweeping disabled; an already running sweep still completes
    Suspended,
}

pub(crate) enum SweepPhase {
    Idle,
    Sweeping(SweepHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    Suspended,
    NotReady,
    TooSoon,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Suspended => "sweeping suspended",
            SkipReason::NotReady => "host not ready",
            SkipReason::TooSoon => "interval not elapsed",
        })
    }
}

pub(crate) enum SweepDecision {
    Join(SweepHandle),
    Skip(SkipReason),
    Start,
}

// == Sweep State ==
pub(crate) struct SweepState {
    pub(crate) phase: SweepPhase,
    pub(crate) suspended: bool,
    /// Completion time of the last sweep, or creation time (Unix ms)
    pub(crate) last_sweep_ms: i64,
}

impl SweepState {
    pub(crate) fn new(now_ms: i64) -> Self {
        Self {
            phase: SweepPhase::Idle,
            suspended: false,
            last_sweep_ms: now_ms,
        }
    }

    pub(crate) fn status(&self) -> SweepStatus {
        match (&self.phase, self.suspended) {
            (_, true) => SweepStatus::Suspended,
            (SweepPhase::Sweeping(_), false) => SweepStatus::Sweeping,
            (SweepPhase::Idle, false) => SweepStatus::Idle,
        }
    }

    /// Decides what a sweep request made at `now_ms` should do.
    ///
    /// A pending sweep is joined even when suspended or not ready.
    pub(crate) fn decide(
        &self,
        now_ms: i64,
        interval: Duration,
        host_ready: bool,
        ignore_interval: bool,
    ) -> SweepDecision {
        if let SweepPhase::Sweeping(handle) = &self.phase {
            return SweepDecision::Join(handle.clone());
        }
        if self.suspended {
            return SweepDecision::Skip(SkipReason::Suspended);
        }
        if !host_ready {
            return SweepDecision::Skip(SkipReason::NotReady);
        }
        let elapsed = now_ms.saturating_sub(self.last_sweep_ms);
        if !ignore_interval && elapsed < i64::try_from(interval.as_millis()).unwrap_or(i64::MAX) {
            return SweepDecision::Skip(SkipReason::TooSoon);
        }
        SweepDecision::Start
    }

    pub(crate) fn finish(&mut self, now_ms: i64) {
        self.phase = SweepPhase::Idle;
        self.last_sweep_ms = now_ms;
    }
}
