use embassy_time::Instant;
use robot_core::clock::{Clock, TimePoint};

/// Reads time from the embassy time driver (TIM1), which keeps counting
/// regardless of how busy the executor is.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> TimePoint {
        TimePoint::from_micros(Instant::now().as_micros())
    }
}
