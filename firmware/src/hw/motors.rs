//! H-bridge output: TIM3 PWM magnitude plus one direction pin per wheel.

use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::timer::Channel;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use robot_core::motor::MotorDriver;

const LEFT: Channel = Channel::Ch1;
const RIGHT: Channel = Channel::Ch2;

/// [`MotorDriver`] over a two-channel [`SimplePwm`].
///
/// Duties arrive already clamped to `±max_pwm`, which maps to 100 % duty.
pub struct PwmMotorDriver<'d> {
    pwm: SimplePwm<'d, TIM3>,
    left_dir: Output<'d>,
    right_dir: Output<'d>,
    enable: Output<'d>,
    max_pwm: u16,
}

impl<'d> PwmMotorDriver<'d> {
    pub fn new(
        mut pwm: SimplePwm<'d, TIM3>,
        left_dir: Output<'d>,
        right_dir: Output<'d>,
        enable: Output<'d>,
        max_pwm: i16,
    ) -> Self {
        for channel in [LEFT, RIGHT] {
            let mut output = pwm.channel(channel);
            output.set_duty_cycle_fully_off();
            output.enable();
        }
        Self {
            pwm,
            left_dir,
            right_dir,
            enable,
            max_pwm: max_pwm.unsigned_abs().max(1),
        }
    }

    fn drive(&mut self, channel: Channel, duty: i16) {
        let reverse = duty < 0;
        match channel {
            Channel::Ch1 => self.left_dir.set_level(reverse.into()),
            _ => self.right_dir.set_level(reverse.into()),
        }
        let magnitude = duty.unsigned_abs().min(self.max_pwm);
        self.pwm
            .channel(channel)
            .set_duty_cycle_fraction(magnitude.into(), self.max_pwm.into());
    }
}

impl MotorDriver for PwmMotorDriver<'_> {
    fn set_enabled(&mut self, enabled: bool) {
        self.enable.set_level(enabled.into());
    }

    fn apply(&mut self, left: i16, right: i16) {
        self.drive(LEFT, left);
        self.drive(RIGHT, right);
    }
}
