//! Board bindings for the robot core traits.
//!
//! Pin assignment (STM32G0B1KE):
//!
//! | Signal            | Pin  | Peripheral      |
//! |-------------------|------|-----------------|
//! | left encoder A/B  | PA8 / PA9 | EXTI8 / EXTI9 |
//! | right encoder A/B | PB3 / PB5 | EXTI3 / EXTI5 |
//! | left / right PWM  | PA6 / PA7 | TIM3 CH1 / CH2 |
//! | left / right DIR  | PA4 / PA5 | GPIO out    |
//! | motor enable      | PB0  | GPIO out        |
//! | battery sense     | PA0  | ADC1 IN0        |
//! | USB D- / D+       | PA11 / PA12 | USB      |

pub mod battery;
pub mod clock;
pub mod motors;

pub use battery::AdcBattery;
pub use clock::MonotonicClock;
pub use motors::PwmMotorDriver;
