// Control core for a two-wheeled differential-drive robot.
//
// Everything here runs without the Rust standard library so the same code backs
// the MCU firmware, the host emulator and the test suite.
#![no_std]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod battery;
pub mod clock;
pub mod config;
pub mod console;
pub mod controller;
pub mod encoder;
pub mod filter;
pub mod motor;
pub mod protocol;
pub mod ring_buffer;
pub mod robot;
pub mod scheduler;
pub mod sim;
pub mod telemetry;
