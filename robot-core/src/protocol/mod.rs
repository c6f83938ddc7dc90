//! Host link byte protocol.
//!
//! Inbound messages are a command byte followed by a fixed little-endian
//! payload; [`message_len`] gives the total size for every known command byte.
//! [`parse`] is pure and works on a complete frame. [`MessageQueue`] accumulates
//! raw link bytes until a full message is present. Replies are built as
//! [`Reply`] values and framed by [`Reply::encode`].

mod queue;
mod reply;

use core::fmt;

use winnow::binary::{le_f32, le_i16, u8 as byte};
use winnow::error::ContextError;
use winnow::prelude::*;

pub use queue::{MessageQueue, QUEUE_SIZE};
pub use reply::{Frame, MAX_FRAME_LEN, Reply, ReplySink};

/// Longest inbound message, in bytes.
pub const MAX_COMMAND_LEN: usize = 13;

/// Total message length for a command byte, including the byte itself.
#[must_use]
pub const fn message_len(command: u8) -> Option<usize> {
    match command {
        b'~' | b'e' | b'b' | b's' | b'S' | b'q' => Some(1),
        b't' => Some(2),
        b'E' | b'B' | b'Q' | b'p' => Some(5),
        b'T' => Some(6),
        b'*' | b'/' | b'+' | b'-' | b'P' | b'd' | b'v' => Some(9),
        b'D' | b'V' => Some(13),
        _ => None,
    }
}

/// Arithmetic echo operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            ArithmeticOp::Add => b'+',
            ArithmeticOp::Subtract => b'-',
            ArithmeticOp::Multiply => b'*',
            ArithmeticOp::Divide => b'/',
        }
    }

    #[must_use]
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            b'+' => Some(ArithmeticOp::Add),
            b'-' => Some(ArithmeticOp::Subtract),
            b'*' => Some(ArithmeticOp::Multiply),
            b'/' => Some(ArithmeticOp::Divide),
            _ => None,
        }
    }

    #[must_use]
    pub fn apply(self, lhs: f32, rhs: f32) -> f32 {
        match self {
            ArithmeticOp::Add => lhs + rhs,
            ArithmeticOp::Subtract => lhs - rhs,
            ArithmeticOp::Multiply => lhs * rhs,
            ArithmeticOp::Divide => lhs / rhs,
        }
    }
}

/// What a time request measures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeRequest {
    /// Seconds since boot.
    Now,
    /// Duration of one main-loop iteration.
    LoopTime,
    /// Time taken to queue a float reply.
    FloatSend,
}

impl TimeRequest {
    /// Subcommand used by the one-shot `t` form.
    #[must_use]
    pub const fn once_code(self) -> u8 {
        match self {
            TimeRequest::Now => 0,
            TimeRequest::LoopTime => 1,
            TimeRequest::FloatSend => 2,
        }
    }

    #[must_use]
    pub const fn from_once_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TimeRequest::Now),
            1 => Some(TimeRequest::LoopTime),
            2 => Some(TimeRequest::FloatSend),
            _ => None,
        }
    }

    /// Subcommand used by the repeating `T` form; `0` there means cancel.
    #[must_use]
    pub const fn repeat_code(self) -> u8 {
        self.once_code() + 1
    }

    #[must_use]
    pub const fn from_repeat_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TimeRequest::Now),
            2 => Some(TimeRequest::LoopTime),
            3 => Some(TimeRequest::FloatSend),
            _ => None,
        }
    }
}

/// Decoded inbound message.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    /// `~`: re-initialize everything.
    Restart,
    /// `+ - * /`: answered immediately with the result.
    Arithmetic { op: ArithmeticOp, lhs: f32, rhs: f32 },
    /// `t`: one time report.
    Time(TimeRequest),
    /// `T`: time report every `period_ms`.
    TimeEvery { request: TimeRequest, period_ms: f32 },
    /// `T` with subcommand 0: cancel every time report.
    TimeCancel,
    /// `e`: one encoder report.
    Encoder,
    /// `E`: encoder report every `period_ms`; non-positive cancels.
    EncoderEvery { period_ms: f32 },
    /// `b`: one battery report.
    Battery,
    /// `B`: battery report every `period_s` seconds; non-positive cancels.
    BatteryEvery { period_s: f32 },
    /// `p` / `P`: raw duty for both wheels, optionally for `duration_ms`.
    Pwm {
        left: i16,
        right: i16,
        duration_ms: Option<f32>,
    },
    /// `s` / `S`: stop the motors and any motion mode.
    Stop,
    /// `q`: one system information report.
    SysInfo,
    /// `Q`: system information every `period_ms`; non-positive cancels.
    SysInfoEvery { period_ms: f32 },
    /// `d` / `D`: drive a distance (m) and rotation (rad).
    Distance {
        linear: f32,
        angular: f32,
        duration_ms: Option<f32>,
    },
    /// `v` / `V`: drive at a linear (m/s) and angular (rad/s) speed.
    Velocity {
        linear: f32,
        angular: f32,
        duration_ms: Option<f32>,
    },
}

impl Command {
    /// Command byte this message is sent with.
    #[must_use]
    pub const fn byte(&self) -> u8 {
        match self {
            Command::Restart => b'~',
            Command::Arithmetic { op, .. } => op.byte(),
            Command::Time(_) => b't',
            Command::TimeEvery { .. } | Command::TimeCancel => b'T',
            Command::Encoder => b'e',
            Command::EncoderEvery { .. } => b'E',
            Command::Battery => b'b',
            Command::BatteryEvery { .. } => b'B',
            Command::Pwm {
                duration_ms: None, ..
            } => b'p',
            Command::Pwm { .. } => b'P',
            Command::Stop => b's',
            Command::SysInfo => b'q',
            Command::SysInfoEvery { .. } => b'Q',
            Command::Distance {
                duration_ms: None, ..
            } => b'd',
            Command::Distance { .. } => b'D',
            Command::Velocity {
                duration_ms: None, ..
            } => b'v',
            Command::Velocity { .. } => b'V',
        }
    }

    /// Serializes the message in wire layout, as a host would send it.
    #[must_use]
    pub fn encode(&self) -> heapless::Vec<u8, MAX_COMMAND_LEN> {
        let mut out = heapless::Vec::new();
        let mut put = |bytes: &[u8]| {
            // Every layout fits MAX_COMMAND_LEN.
            let _ = out.extend_from_slice(bytes);
        };

        put(&[self.byte()]);
        match *self {
            Command::Restart
            | Command::Encoder
            | Command::Battery
            | Command::Stop
            | Command::SysInfo => {}
            Command::Arithmetic { lhs, rhs, .. } => {
                put(&lhs.to_le_bytes());
                put(&rhs.to_le_bytes());
            }
            Command::Time(request) => put(&[request.once_code()]),
            Command::TimeEvery { request, period_ms } => {
                put(&[request.repeat_code()]);
                put(&period_ms.to_le_bytes());
            }
            Command::TimeCancel => {
                put(&[0]);
                put(&0.0f32.to_le_bytes());
            }
            Command::EncoderEvery { period_ms: period }
            | Command::BatteryEvery { period_s: period }
            | Command::SysInfoEvery { period_ms: period } => put(&period.to_le_bytes()),
            Command::Pwm {
                left,
                right,
                duration_ms,
            } => {
                put(&left.to_le_bytes());
                put(&right.to_le_bytes());
                if let Some(duration) = duration_ms {
                    put(&duration.to_le_bytes());
                }
            }
            Command::Distance {
                linear,
                angular,
                duration_ms,
            }
            | Command::Velocity {
                linear,
                angular,
                duration_ms,
            } => {
                put(&linear.to_le_bytes());
                put(&angular.to_le_bytes());
                if let Some(duration) = duration_ms {
                    put(&duration.to_le_bytes());
                }
            }
        }
        out
    }
}

/// Inbound protocol failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame contained no bytes.
    Empty,
    /// Leading byte is not a known command.
    UnknownCommand(u8),
    /// Fewer bytes than the command's fixed length.
    Truncated {
        command: u8,
        expected: usize,
        found: usize,
    },
    /// Subcommand byte outside the command's accepted range.
    UnknownSubcommand { command: u8, subcommand: u8 },
    /// Payload could not be decoded.
    Malformed(u8),
}

impl ProtocolError {
    /// Byte echoed back to the host in a `?` reply, if any.
    #[must_use]
    pub const fn echo_byte(&self) -> Option<u8> {
        match self {
            ProtocolError::UnknownCommand(byte) | ProtocolError::Malformed(byte) => Some(*byte),
            ProtocolError::UnknownSubcommand { subcommand, .. } => Some(*subcommand),
            ProtocolError::Empty | ProtocolError::Truncated { .. } => None,
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Empty => f.write_str("empty frame"),
            ProtocolError::UnknownCommand(byte) => write!(f, "unknown command byte 0x{byte:02x}"),
            ProtocolError::Truncated {
                command,
                expected,
                found,
            } => write!(
                f,
                "command '{}' needs {expected} bytes, got {found}",
                char::from(*command)
            ),
            ProtocolError::UnknownSubcommand {
                command,
                subcommand,
            } => write!(
                f,
                "command '{}' has no subcommand {subcommand}",
                char::from(*command)
            ),
            ProtocolError::Malformed(byte) => {
                write!(f, "malformed payload for '{}'", char::from(*byte))
            }
        }
    }
}

/// Decodes one complete message. Bytes past the command's length are ignored.
///
/// # Errors
///
/// Returns a [`ProtocolError`] for unknown command bytes, short frames and
/// out-of-range subcommands.
pub fn parse(frame: &[u8]) -> Result<Command, ProtocolError> {
    let Some(&command) = frame.first() else {
        return Err(ProtocolError::Empty);
    };
    let expected = message_len(command).ok_or(ProtocolError::UnknownCommand(command))?;
    if frame.len() < expected {
        return Err(ProtocolError::Truncated {
            command,
            expected,
            found: frame.len(),
        });
    }

    let mut payload = &frame[1..expected];
    decode(command, &mut payload)
}

fn float(input: &mut &[u8]) -> winnow::Result<f32> {
    le_f32(input)
}

fn int16(input: &mut &[u8]) -> winnow::Result<i16> {
    le_i16(input)
}

fn subcommand(input: &mut &[u8]) -> winnow::Result<u8> {
    byte(input)
}

fn decode(command: u8, payload: &mut &[u8]) -> Result<Command, ProtocolError> {
    let malformed = |_: ContextError| ProtocolError::Malformed(command);
    let unknown_sub = |subcommand: u8| ProtocolError::UnknownSubcommand {
        command,
        subcommand,
    };

    let decoded = match command {
        b'~' => Command::Restart,
        b'+' | b'-' | b'*' | b'/' => {
            let (lhs, rhs) = (float, float).parse_next(payload).map_err(malformed)?;
            let op =
                ArithmeticOp::from_byte(command).ok_or(ProtocolError::UnknownCommand(command))?;
            Command::Arithmetic { op, lhs, rhs }
        }
        b't' => {
            let code = subcommand(payload).map_err(malformed)?;
            let request = TimeRequest::from_once_code(code).ok_or_else(|| unknown_sub(code))?;
            Command::Time(request)
        }
        b'T' => {
            let (code, period_ms) = (subcommand, float).parse_next(payload).map_err(malformed)?;
            if code == 0 {
                Command::TimeCancel
            } else {
                let request =
                    TimeRequest::from_repeat_code(code).ok_or_else(|| unknown_sub(code))?;
                Command::TimeEvery { request, period_ms }
            }
        }
        b'e' => Command::Encoder,
        b'E' => Command::EncoderEvery {
            period_ms: float(payload).map_err(malformed)?,
        },
        b'b' => Command::Battery,
        b'B' => Command::BatteryEvery {
            period_s: float(payload).map_err(malformed)?,
        },
        b'p' | b'P' => {
            let (left, right) = (int16, int16).parse_next(payload).map_err(malformed)?;
            let duration_ms = if command == b'P' {
                Some(float(payload).map_err(malformed)?)
            } else {
                None
            };
            Command::Pwm {
                left,
                right,
                duration_ms,
            }
        }
        b's' | b'S' => Command::Stop,
        b'q' => Command::SysInfo,
        b'Q' => Command::SysInfoEvery {
            period_ms: float(payload).map_err(malformed)?,
        },
        b'd' | b'D' | b'v' | b'V' => {
            let (linear, angular) = (float, float).parse_next(payload).map_err(malformed)?;
            let duration_ms = if command.is_ascii_uppercase() {
                Some(float(payload).map_err(malformed)?)
            } else {
                None
            };
            if command.eq_ignore_ascii_case(&b'd') {
                Command::Distance {
                    linear,
                    angular,
                    duration_ms,
                }
            } else {
                Command::Velocity {
                    linear,
                    angular,
                    duration_ms,
                }
            }
        }
        other => return Err(ProtocolError::UnknownCommand(other)),
    };

    Ok(decoded)
}
