use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32 as hal;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::adc::Adc;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::khz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use robot_core::config::RobotConfig;
use robot_core::encoder::{EncoderCounts, Side};
use robot_core::robot::Robot;
use static_cell::StaticCell;

use crate::hw::{AdcBattery, MonotonicClock, PwmMotorDriver};
use crate::link::LinkQueue;
use crate::usb;

mod control_task;
mod encoder_task;
mod usb_task;

/// PWM carrier frequency, above the audible range.
const PWM_FREQUENCY_KHZ: u32 = 20;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type FirmwareRobot =
    Robot<'static, MonotonicClock, PwmMotorDriver<'static>, AdcBattery<'static>>;

pub(super) static LINK: LinkQueue = LinkQueue::new();
pub(super) static ENCODERS: EncoderCounts = EncoderCounts::new();
pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

/// Runs the encoder tasks above thread mode so edges preempt the control loop.
static ENCODER_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

// SPI2/3 is unused on this board; its vector drives the encoder executor.
#[interrupt]
unsafe fn SPI2_3() {
    unsafe { ENCODER_EXECUTOR.on_interrupt() }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA4,
        PA5,
        PA6,
        PA7,
        PA8,
        PA9,
        PA11,
        PA12,
        PB0,
        PB3,
        PB5,
        EXTI3,
        EXTI5,
        EXTI8,
        EXTI9,
        TIM3,
        ADC1,
        USB,
        ..
    } = hal::init(config);

    let robot_config = RobotConfig::DEFAULT;

    let pwm = SimplePwm::new(
        TIM3,
        Some(PwmPin::new(PA6, OutputType::PushPull)),
        Some(PwmPin::new(PA7, OutputType::PushPull)),
        None,
        None,
        khz(PWM_FREQUENCY_KHZ),
        CountingMode::EdgeAlignedUp,
    );
    let motors = PwmMotorDriver::new(
        pwm,
        Output::new(PA4, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PB0, Level::Low, Speed::Low),
        robot_config.max_pwm,
    );
    let battery = AdcBattery::new(Adc::new(ADC1), PA0);

    let robot = Robot::new(robot_config, MonotonicClock, &ENCODERS, motors, battery)
        .expect("robot configuration rejected");

    interrupt::SPI2_3.set_priority(Priority::P1);
    let encoder_spawner = ENCODER_EXECUTOR.start(interrupt::SPI2_3);

    encoder_spawner
        .spawn(encoder_task::run(
            Side::Left,
            ExtiInput::new(PA8, EXTI8, Pull::Up),
            ExtiInput::new(PA9, EXTI9, Pull::Up),
        ))
        .expect("failed to spawn left encoder task");
    encoder_spawner
        .spawn(encoder_task::run(
            Side::Right,
            ExtiInput::new(PB3, EXTI3, Pull::Up),
            ExtiInput::new(PB5, EXTI5, Pull::Up),
        ))
        .expect("failed to spawn right encoder task");

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB task");

    spawner
        .spawn(control_task::run(robot))
        .expect("failed to spawn control task");

    core::future::pending::<()>().await;
}
