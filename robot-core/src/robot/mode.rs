use core::fmt;

use crate::clock::TimePoint;

/// Closed-loop motion modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MotionMode {
    Distance,
    Velocity,
}

impl MotionMode {
    pub const ALL: [MotionMode; 2] = [MotionMode::Distance, MotionMode::Velocity];

    #[must_use]
    pub const fn index(self) -> u16 {
        match self {
            MotionMode::Distance => 0,
            MotionMode::Velocity => 1,
        }
    }

    #[must_use]
    pub const fn from_index(index: u16) -> Option<Self> {
        match index {
            0 => Some(MotionMode::Distance),
            1 => Some(MotionMode::Velocity),
            _ => None,
        }
    }
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MotionMode::Distance => "distance",
            MotionMode::Velocity => "velocity",
        })
    }
}

/// How a motion mode ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModeOutcome {
    /// Both wheels reached their targets.
    Reached,
    /// The requested duration elapsed first.
    TimedOut,
    /// A stop, restart or newer mode ended the run.
    Cancelled,
}

impl fmt::Display for ModeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeOutcome::Reached => "reached",
            ModeOutcome::TimedOut => "timed-out",
            ModeOutcome::Cancelled => "cancelled",
        })
    }
}

/// State of the motion mode currently driving the wheels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MotionRun {
    pub mode: MotionMode,
    /// Per-wheel set point: metres for distance mode, metres per second for
    /// velocity mode.
    pub target_left: f32,
    pub target_right: f32,
    /// Wheel angles when the run started, in radians.
    pub start_left: f32,
    pub start_right: f32,
    pub started_at: TimePoint,
    pub last_update: TimePoint,
    /// Seconds after which the run ends regardless of progress.
    pub limit: Option<f32>,
    pub updates: usize,
}

impl MotionRun {
    #[must_use]
    pub fn expired(&self, now: TimePoint) -> bool {
        self.limit
            .is_some_and(|limit| now.seconds_since(self.started_at) >= limit)
    }

    /// Seconds since the previous controller update.
    #[must_use]
    pub fn step(&self, now: TimePoint) -> f32 {
        now.seconds_since(self.last_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(limit: Option<f32>) -> MotionRun {
        MotionRun {
            mode: MotionMode::Distance,
            target_left: 0.1,
            target_right: 0.1,
            start_left: 0.0,
            start_right: 0.0,
            started_at: TimePoint::from_millis(1_000),
            last_update: TimePoint::from_millis(1_000),
            limit,
            updates: 0,
        }
    }

    #[test]
    fn untimed_runs_never_expire() {
        assert!(!run(None).expired(TimePoint::from_millis(u32::MAX / 4)));
    }

    #[test]
    fn timed_run_expires_at_limit() {
        let run = run(Some(0.5));
        assert!(!run.expired(TimePoint::from_millis(1_499)));
        assert!(run.expired(TimePoint::from_millis(1_500)));
    }

    #[test]
    fn zero_limit_expires_immediately() {
        assert!(run(Some(0.0)).expired(TimePoint::from_millis(1_000)));
    }

    #[test]
    fn mode_index_round_trips() {
        for mode in MotionMode::ALL {
            assert_eq!(MotionMode::from_index(mode.index()), Some(mode));
        }
        assert_eq!(MotionMode::from_index(2), None);
    }
}
