//! Motor output abstraction.
//!
//! Firmware implements [`MotorDriver`] over the PWM timer and direction pins;
//! the emulator implements it over its wheel plant. [`MotorPwm`] sits in front
//! of either and clamps every command to the configured duty range.

/// Hardware side of the drive motors.
pub trait MotorDriver {
    /// Enables or disables both H-bridge channels.
    fn set_enabled(&mut self, enabled: bool);

    /// Applies signed duties; the sign selects direction.
    fn apply(&mut self, left: i16, right: i16);
}

impl<D> MotorDriver for &mut D
where
    D: MotorDriver + ?Sized,
{
    fn set_enabled(&mut self, enabled: bool) {
        (**self).set_enabled(enabled);
    }

    fn apply(&mut self, left: i16, right: i16) {
        (**self).apply(left, right);
    }
}

/// Driver that discards every command.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopMotorDriver;

impl MotorDriver for NoopMotorDriver {
    fn set_enabled(&mut self, _enabled: bool) {}

    fn apply(&mut self, _left: i16, _right: i16) {}
}

/// Clamping front end for a [`MotorDriver`].
#[derive(Debug)]
pub struct MotorPwm<D> {
    driver: D,
    max_pwm: i16,
    left: i16,
    right: i16,
    enabled: bool,
}

impl<D> MotorPwm<D>
where
    D: MotorDriver,
{
    /// Wraps `driver`; `max_pwm` is taken as an absolute value.
    pub fn new(driver: D, max_pwm: i16) -> Self {
        Self {
            driver,
            max_pwm: max_pwm.saturating_abs(),
            left: 0,
            right: 0,
            enabled: false,
        }
    }

    #[must_use]
    pub fn max_pwm(&self) -> i16 {
        self.max_pwm
    }

    /// Last duties applied, after clamping.
    #[must_use]
    pub fn duties(&self) -> (i16, i16) {
        (self.left, self.right)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.driver.set_enabled(enabled);
    }

    /// Applies duties clamped to `±max_pwm`.
    pub fn set(&mut self, left: i16, right: i16) {
        self.left = left.clamp(-self.max_pwm, self.max_pwm);
        self.right = right.clamp(-self.max_pwm, self.max_pwm);
        self.driver.apply(self.left, self.right);
    }

    /// Applies controller outputs, truncated toward zero and clamped.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_from_commands(&mut self, left: f32, right: f32) {
        let limit = f32::from(self.max_pwm);
        // Saturating float-to-int casts; NaN maps to zero.
        let left = left.clamp(-limit, limit) as i16;
        let right = right.clamp(-limit, limit) as i16;
        self.set(left, right);
    }

    /// Zeroes both duties and disables the bridge.
    pub fn stop(&mut self) {
        self.set(0, 0);
        self.set_enabled(false);
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
