//! Battery sense smoothing and low-voltage warnings.

use crate::clock::TimePoint;
use crate::config::BatteryConfig;
use crate::filter::{FilterError, IirFilter};

/// Source of raw battery sense readings.
pub trait BatterySensor {
    /// Sense-pin voltage, or `None` when no conversion is available.
    fn read_volts(&mut self) -> Option<f32>;
}

impl<S> BatterySensor for &mut S
where
    S: BatterySensor + ?Sized,
{
    fn read_volts(&mut self) -> Option<f32> {
        (**self).read_volts()
    }
}

/// Sensor returning a fixed reading; `None` models a board without a sense line.
#[derive(Copy, Clone, Debug, Default)]
pub struct FixedBattery(pub Option<f32>);

impl BatterySensor for FixedBattery {
    fn read_volts(&mut self) -> Option<f32> {
        self.0
    }
}

/// Warning raised by [`BatteryMonitor::poll`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BatteryWarning {
    /// Pack is below the low threshold but still powered.
    Low(f32),
    /// Pack reads as switched off.
    PowerOff,
}

#[derive(Clone, Debug)]
pub struct BatteryMonitor {
    config: BatteryConfig,
    filter: IirFilter,
    voltage: f32,
    primed: bool,
    last_sample: TimePoint,
    last_warning: TimePoint,
}

impl BatteryMonitor {
    /// # Errors
    ///
    /// Returns [`FilterError`] when the smoothing coefficients are unusable.
    pub fn new(config: BatteryConfig) -> Result<Self, FilterError> {
        Ok(Self {
            filter: IirFilter::new(config.numerator, config.denominator)?,
            config,
            voltage: 0.0,
            primed: false,
            last_sample: TimePoint::ZERO,
            last_warning: TimePoint::ZERO,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    /// Latest filtered pack voltage; `0.0` before the first sample.
    #[must_use]
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    #[must_use]
    pub fn has_sample(&self) -> bool {
        self.primed
    }

    /// Samples the sensor when the sample period has elapsed and evaluates the
    /// warning thresholds once per warning interval.
    pub fn poll<S>(&mut self, now: TimePoint, sensor: &mut S) -> Option<BatteryWarning>
    where
        S: BatterySensor + ?Sized,
    {
        if !self.primed || now.seconds_since(self.last_sample) >= self.config.sample_period {
            self.sample(now, sensor);
        }

        if !self.primed || now.seconds_since(self.last_warning) < self.config.warn_interval {
            return None;
        }
        self.last_warning = now;
        self.warning()
    }

    /// Reads the sensor once and folds the reading into the filter.
    pub fn sample<S>(&mut self, now: TimePoint, sensor: &mut S) -> Option<f32>
    where
        S: BatterySensor + ?Sized,
    {
        let raw = sensor.read_volts()?;
        self.last_sample = now;
        if !self.primed {
            // Start from the first reading instead of ramping up from zero.
            self.filter.set_to(raw);
            self.primed = true;
        }
        self.voltage = self.config.divider * self.filter.value(raw);
        Some(self.voltage)
    }

    /// Warning for the current filtered voltage, ignoring the interval.
    #[must_use]
    pub fn warning(&self) -> Option<BatteryWarning> {
        if !self.primed {
            return None;
        }
        if self.voltage <= self.config.off_threshold {
            Some(BatteryWarning::PowerOff)
        } else if self.voltage <= self.config.low_threshold {
            Some(BatteryWarning::Low(self.voltage))
        } else {
            None
        }
    }

    /// Forgets every sample; the warning interval restarts at `now`.
    pub fn reset(&mut self, now: TimePoint) {
        self.filter.reset();
        self.voltage = 0.0;
        self.primed = false;
        self.last_sample = now;
        self.last_warning = now;
    }
}
