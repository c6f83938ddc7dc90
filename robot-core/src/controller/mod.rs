//! Proportional wheel controller with an IIR compensator on the measurement.
//!
//! The compensator smooths the measured position before it is compared with the
//! target; the output is `kp × (target − filtered)`. Exactly one [`ControlTarget`]
//! is active at a time.

use crate::config::ControllerConfig;
use crate::filter::{FilterError, IirFilter};

/// Set point currently tracked by a [`MotionController`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ControlTarget {
    /// Hold an absolute position.
    Position(f32),
    /// Advance at a constant rate; the target leads the measurement by `dt × v`.
    ///
    /// The robot loop does not use this form: its velocity mode moves a
    /// [`ControlTarget::Position`] reference each update, which removes the
    /// steady-state lag a leading target leaves behind.
    Velocity(f32),
}

impl Default for ControlTarget {
    fn default() -> Self {
        ControlTarget::Position(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct MotionController {
    filter: IirFilter,
    kp: f32,
    update_period: f32,
    target: ControlTarget,
}

impl MotionController {
    /// # Errors
    ///
    /// Propagates [`FilterError`] for unusable compensator coefficients.
    pub fn new(
        kp: f32,
        numerator: &[f32],
        denominator: &[f32],
        update_period: f32,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            filter: IirFilter::new(numerator, denominator)?,
            kp,
            update_period,
            target: ControlTarget::default(),
        })
    }

    /// # Errors
    ///
    /// Propagates [`FilterError`] for unusable compensator coefficients.
    pub fn from_config(config: &ControllerConfig, update_period: f32) -> Result<Self, FilterError> {
        Self::new(
            config.kp,
            config.numerator,
            config.denominator,
            update_period,
        )
    }

    #[must_use]
    pub fn target(&self) -> ControlTarget {
        self.target
    }

    #[must_use]
    pub fn update_period(&self) -> f32 {
        self.update_period
    }

    pub fn set_target_velocity(&mut self, velocity: f32) {
        self.target = ControlTarget::Velocity(velocity);
    }

    /// Targets the distance covered in one update period at `velocity`.
    pub fn set_target_position(&mut self, velocity: f32) {
        self.target = ControlTarget::Position(velocity * self.update_period);
    }

    /// Targets an absolute position.
    pub fn hold_position(&mut self, position: f32) {
        self.target = ControlTarget::Position(position);
    }

    /// Feeds one measurement taken `dt` seconds after the previous one and
    /// returns the control command.
    pub fn update(&mut self, measurement: f32, dt: f32) -> f32 {
        let filtered = self.filter.value(measurement);
        let target = match self.target {
            ControlTarget::Position(position) => position,
            ControlTarget::Velocity(velocity) => measurement + dt * velocity,
        };
        self.kp * (target - filtered)
    }

    /// Last compensator output.
    #[must_use]
    pub fn last(&self) -> f32 {
        self.filter.last_output()
    }

    /// Presets the compensator so `measurement` produces no transient.
    pub fn set_to(&mut self, measurement: f32) {
        self.filter.set_to(measurement);
    }

    /// Shifts the compensator history, e.g. after re-zeroing the measurement.
    pub fn shift_by(&mut self, delta: f32) {
        self.filter.shift_by(delta);
    }

    /// Clears the compensator history and returns to holding position zero.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.target = ControlTarget::default();
    }
}
