//! Battery sense through ADC1.

use embassy_stm32::adc::{Adc, AdcChannel, AnyAdcChannel, SampleTime};
use embassy_stm32::peripherals::ADC1;
use embassy_stm32::Peri;
use robot_core::battery::BatterySensor;

/// ADC reference, in volts.
const VREF: f32 = 3.3;
/// Full-scale 12-bit conversion.
const FULL_SCALE: f32 = 4095.0;

/// Blocking single-channel reader behind [`BatterySensor`].
pub struct AdcBattery<'d> {
    adc: Adc<'d, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl<'d> AdcBattery<'d> {
    pub fn new(mut adc: Adc<'d, ADC1>, pin: Peri<'d, impl AdcChannel<ADC1>>) -> Self {
        adc.set_sample_time(SampleTime::CYCLES160_5);
        Self {
            adc,
            channel: pin.degrade_adc(),
        }
    }
}

impl BatterySensor for AdcBattery<'_> {
    fn read_volts(&mut self) -> Option<f32> {
        let raw = self.adc.blocking_read(&mut self.channel);
        Some(f32::from(raw) * VREF / FULL_SCALE)
    }
}
