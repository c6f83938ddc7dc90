//! Kinematic wheel model for host tooling.
//!
//! [`WheelPlant`] turns motor duties into wheel travel and raises the Gray-code
//! edges real encoders would produce, so the emulator and the integration tests
//! exercise the decoder and controllers exactly as the firmware does.

use crate::config::RobotConfig;
use crate::encoder::{EncoderCounts, Side, counts_to_radians};

/// Wheel speed per unit of PWM duty, in metres per second.
pub const DEFAULT_GAIN: f32 = 0.01;

/// Gray-code (A, B) sequence for forward rotation.
const GRAY: [(bool, bool); 4] = [(false, false), (true, false), (true, true), (false, true)];

/// First-order model: wheel speed proportional to duty, no inertia.
#[derive(Clone, Debug)]
pub struct WheelPlant {
    gain: f32,
    metres_per_count: f32,
    position: [f32; 2],
    emitted: [i32; 2],
    phase: [usize; 2],
}

impl WheelPlant {
    #[must_use]
    pub fn new(config: &RobotConfig) -> Self {
        Self::with_gain(config, DEFAULT_GAIN)
    }

    #[must_use]
    pub fn with_gain(config: &RobotConfig, gain: f32) -> Self {
        Self {
            gain,
            metres_per_count: config.wheel_distance(counts_to_radians(1, config.counts_per_rev)),
            position: [0.0; 2],
            emitted: [0; 2],
            phase: [0; 2],
        }
    }

    /// Distance the wheel has rolled since construction, in metres.
    #[must_use]
    pub fn position(&self, side: Side) -> f32 {
        self.position[index(side)]
    }

    /// Integrates one millisecond at the given duties and raises the edges
    /// the wheels would produce.
    #[allow(clippy::cast_possible_truncation)]
    pub fn step(&mut self, encoders: &EncoderCounts, duties: (i16, i16), enabled: bool) {
        for (side, duty) in [(Side::Left, duties.0), (Side::Right, duties.1)] {
            let i = index(side);
            if enabled {
                self.position[i] += self.gain * f32::from(duty) * 0.001;
            }
            let target = (self.position[i] / self.metres_per_count) as i32;
            while self.emitted[i] != target {
                let forward = target > self.emitted[i];
                self.phase[i] = if forward {
                    (self.phase[i] + 1) % GRAY.len()
                } else {
                    (self.phase[i] + GRAY.len() - 1) % GRAY.len()
                };
                let (a, b) = GRAY[self.phase[i]];
                encoders.on_edge(side, a ^ b, b);
                self.emitted[i] += if forward { 1 } else { -1 };
            }
        }
    }
}

const fn index(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}
