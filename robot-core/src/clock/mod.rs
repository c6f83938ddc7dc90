//! Monotonic time points shared by the control loop, the scheduler and telemetry.
//!
//! A [`TimePoint`] pairs a coarse millisecond counter, advanced once per timer
//! tick, with a sub-millisecond remainder. The coarse counter is allowed to wrap;
//! differences are taken with wrapping arithmetic so a wrap between two nearby
//! points still yields a small elapsed time.

use core::time::Duration;

use portable_atomic::{AtomicU32, Ordering};

use crate::telemetry::TelemetryInstant;

const MICROS_PER_MILLI: u16 = 1_000;

/// Instant on the robot's monotonic time base.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint {
    millis: u32,
    micros: u16,
}

impl TimePoint {
    /// Boot instant.
    pub const ZERO: Self = Self {
        millis: 0,
        micros: 0,
    };

    /// Builds a time point, carrying any whole milliseconds out of `micros`.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn new(millis: u32, micros: u16) -> Self {
        Self {
            millis: millis.wrapping_add((micros / MICROS_PER_MILLI) as u32),
            micros: micros % MICROS_PER_MILLI,
        }
    }

    /// Builds a time point from a microsecond count since boot.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_micros(micros: u64) -> Self {
        // The coarse counter wraps, so truncation is the intended behaviour.
        Self {
            millis: (micros / 1_000) as u32,
            micros: (micros % 1_000) as u16,
        }
    }

    #[must_use]
    pub const fn from_millis(millis: u32) -> Self {
        Self { millis, micros: 0 }
    }

    #[must_use]
    pub const fn millis(self) -> u32 {
        self.millis
    }

    /// Sub-millisecond remainder, always below 1000.
    #[must_use]
    pub const fn micros(self) -> u16 {
        self.micros
    }

    /// Signed seconds elapsed from `earlier` to `self`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    pub fn seconds_since(self, earlier: Self) -> f32 {
        let millis = self.millis.wrapping_sub(earlier.millis) as i32;
        let micros = i32::from(self.micros) - i32::from(earlier.micros);
        millis as f32 / 1_000.0 + micros as f32 / 1_000_000.0
    }

    /// Returns `self` advanced by `duration`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn offset_by(self, duration: Duration) -> Self {
        let total = u64::from(self.micros) + duration.as_micros() as u64;
        Self::new(
            self.millis.wrapping_add((total / 1_000) as u32),
            (total % 1_000) as u16,
        )
    }
}

impl TimePoint {
    /// Returns `self` moved back by `duration`, wrapping like the coarse counter.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn rewind_by(self, duration: Duration) -> Self {
        const WRAP_MICROS: u64 = (u32::MAX as u64 + 1) * 1_000;
        let total = u64::from(self.millis) * 1_000 + u64::from(self.micros);
        let back = (duration.as_micros() % u128::from(WRAP_MICROS)) as u64;
        Self::from_micros((total + WRAP_MICROS - back) % WRAP_MICROS)
    }
}

impl TelemetryInstant for TimePoint {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let millis = self.millis.wrapping_sub(earlier.millis);
        // Anything past half the counter range is an earlier point, not a wrap.
        if millis > u32::MAX / 2 {
            return Duration::ZERO;
        }
        let micros = u64::from(millis) * 1_000 + u64::from(self.micros);
        Duration::from_micros(micros.saturating_sub(u64::from(earlier.micros)))
    }
}

/// Source of the current [`TimePoint`].
pub trait Clock {
    fn now(&self) -> TimePoint;
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    fn now(&self) -> TimePoint {
        (**self).now()
    }
}

/// Millisecond counter advanced by a periodic tick.
///
/// [`TickClock::tick`] must have a single caller, the timer tick handler; every
/// other context only reads. The counter lives in a `portable_atomic` cell so
/// the read is tear-free on cores without native 32-bit atomics.
#[derive(Debug, Default)]
pub struct TickClock {
    millis: AtomicU32,
}

impl TickClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            millis: AtomicU32::new(0),
        }
    }

    /// Advances the coarse counter by one millisecond.
    pub fn tick(&self) {
        self.millis.fetch_add(1, Ordering::Relaxed);
    }

    /// Advances the coarse counter by `millis` ticks at once.
    pub fn advance(&self, millis: u32) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }

    /// Combines the coarse counter with a sub-tick reading from a hardware counter.
    #[must_use]
    pub fn now_with_sub_tick(&self, micros: u16) -> TimePoint {
        TimePoint::new(self.millis.load(Ordering::Relaxed), micros)
    }

    /// Rewinds the counter to the boot instant.
    pub fn reset(&self) {
        self.millis.store(0, Ordering::Relaxed);
    }
}

impl Clock for TickClock {
    fn now(&self) -> TimePoint {
        self.now_with_sub_tick(0)
    }
}
