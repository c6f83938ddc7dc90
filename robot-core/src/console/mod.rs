//! Operator console: a line-oriented front end that lowers human-friendly
//! commands to binary protocol messages.

pub mod catalog;
pub mod grammar;

use core::fmt;
use core::time::Duration;

use crate::protocol::Command;

pub use grammar::{LexError, ParseError, parse};

/// Action requested by one console line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConsoleCommand<'a> {
    /// Encode and deliver to the robot.
    Send(Command),
    /// Keep the robot running for the given time before reading more input.
    Wait(Duration),
    Help(Option<&'a str>),
}

/// Writes the command list, or the usage of one command when `topic` names it.
///
/// # Errors
///
/// Propagates errors from `out`.
pub fn write_help<W>(out: &mut W, topic: Option<&str>) -> fmt::Result
where
    W: fmt::Write + ?Sized,
{
    match topic {
        None => {
            for spec in catalog::COMMANDS {
                writeln!(out, "{:<10} {}", spec.name, spec.summary)?;
            }
            Ok(())
        }
        Some(topic) => match catalog::find(topic) {
            Some(spec) => writeln!(out, "usage: {}\n  {}", spec.usage, spec.summary),
            None => writeln!(out, "no help for `{topic}`"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_command() {
        let mut text: heapless::String<2048> = heapless::String::new();
        write_help(&mut text, None).unwrap();
        assert_eq!(text.lines().count(), catalog::COMMANDS.len());
        assert!(text.lines().any(|line| line.starts_with("velocity")));
    }

    #[test]
    fn help_topic_shows_usage() {
        let mut text: heapless::String<256> = heapless::String::new();
        write_help(&mut text, Some("PWM")).unwrap();
        assert!(text.starts_with("usage: pwm <left> <right> [for <duration>]"));

        text.clear();
        write_help(&mut text, Some("jump")).unwrap();
        assert_eq!(text.as_str(), "no help for `jump`\n");
    }
}
