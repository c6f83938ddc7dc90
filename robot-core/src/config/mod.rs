//! Compile-time robot configuration.
//!
//! Everything here is plain data with `const` constructors so firmware can keep
//! its configuration in flash. Defaults describe the stock chassis: 35 mm drive
//! wheels 84 mm apart, 909.7 encoder counts per revolution and a 400-step PWM
//! timer.

use crate::encoder::DEFAULT_COUNTS_PER_REV;

/// Control period shared by both wheel controllers, in seconds.
pub const DEFAULT_UPDATE_PERIOD: f32 = 0.005;

/// PWM timer top; duty commands are clamped to `±DEFAULT_MAX_PWM`.
pub const DEFAULT_MAX_PWM: i16 = 400;

/// Distance-mode completion tolerance, in metres.
pub const DEFAULT_DISTANCE_TOLERANCE: f32 = 0.001;

/// Chassis dimensions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Geometry {
    /// Drive wheel radius in metres.
    pub wheel_radius: f32,
    /// Distance between the wheel contact lines in metres.
    pub track_width: f32,
}

impl Geometry {
    pub const DEFAULT: Self = Self {
        wheel_radius: 0.0175,
        track_width: 0.084,
    };

    /// Splits a body-frame command into (left, right) wheel values: `lin ∓ track·ang/2`.
    #[must_use]
    pub fn split(&self, linear: f32, angular: f32) -> (f32, f32) {
        let offset = self.track_width * angular / 2.0;
        (linear - offset, linear + offset)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Gain and compensator coefficients for one wheel controller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub kp: f32,
    pub numerator: &'static [f32],
    pub denominator: &'static [f32],
}

impl ControllerConfig {
    pub const LEFT: Self = Self {
        kp: 138.6274,
        numerator: &[1.0, -0.925],
        denominator: &[8.7776, -8.7026],
    };

    pub const RIGHT: Self = Self {
        kp: 138.2969,
        numerator: &[1.0, -0.9249],
        denominator: &[8.8115, -8.7364],
    };
}

/// Battery sense sampling and warning thresholds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BatteryConfig {
    /// Seconds between ADC samples.
    pub sample_period: f32,
    /// Seconds between repeated low-battery or power-off warnings.
    pub warn_interval: f32,
    /// Ratio of pack voltage to sense-pin voltage.
    pub divider: f32,
    /// Pack voltage at or below which a low-battery warning is raised.
    pub low_threshold: f32,
    /// Pack voltage at or below which the pack is considered switched off.
    pub off_threshold: f32,
    /// Smoothing filter numerator.
    pub numerator: &'static [f32],
    /// Smoothing filter denominator.
    pub denominator: &'static [f32],
}

impl BatteryConfig {
    /// Four NiMH cells; fourth-order Butterworth smoothing.
    pub const DEFAULT: Self = Self {
        sample_period: 0.002,
        warn_interval: 3.0,
        divider: 2.0,
        low_threshold: 1.1875 * 4.0,
        off_threshold: 3.0,
        numerator: &[
            0.001_782_61,
            0.007_130_44,
            0.010_695_66,
            0.007_130_44,
            0.001_782_61,
        ],
        denominator: &[
            1.0,
            -2.773_682_3,
            3.019_038_7,
            -1.504_765_1,
            0.287_930_43,
        ],
    };
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete robot configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RobotConfig {
    pub geometry: Geometry,
    pub update_period: f32,
    pub max_pwm: i16,
    pub counts_per_rev: f32,
    pub distance_tolerance: f32,
    pub left: ControllerConfig,
    pub right: ControllerConfig,
    pub battery: BatteryConfig,
}

impl RobotConfig {
    pub const DEFAULT: Self = Self {
        geometry: Geometry::DEFAULT,
        update_period: DEFAULT_UPDATE_PERIOD,
        max_pwm: DEFAULT_MAX_PWM,
        counts_per_rev: DEFAULT_COUNTS_PER_REV,
        distance_tolerance: DEFAULT_DISTANCE_TOLERANCE,
        left: ControllerConfig::LEFT,
        right: ControllerConfig::RIGHT,
        battery: BatteryConfig::DEFAULT,
    };

    /// Distance travelled by a wheel for a given angle in radians.
    #[must_use]
    pub fn wheel_distance(&self, radians: f32) -> f32 {
        radians * self.geometry.wheel_radius
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
