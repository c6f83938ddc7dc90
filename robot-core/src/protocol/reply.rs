use core::fmt;

use heapless::Vec;

/// Largest encoded reply frame.
pub const MAX_FRAME_LEN: usize = 32;

/// Encoded reply bytes.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

const LOW_BATTERY_TEXT: &[u8; 7] = b"BAT LOW";
const POWER_OFF_TEXT: &[u8; 9] = b"POWER OFF";
const FLOAT_PROBE_VALUE: f32 = 9.81;

/// Outbound message.
///
/// On the wire each reply is `[len][format][0][command][payload]`, where `len`
/// counts every byte after itself and `format` is a short type string (`c`
/// char, `B` byte, `f` f32, `4h` four i16, `7s` seven-char string) that lets the
/// host unpack the payload without knowing the command.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Reply {
    /// Result of an arithmetic request, tagged with its operator byte.
    Arithmetic { op: u8, value: f32 },
    /// Time measurement for a `t`/`T` request.
    Time {
        command: u8,
        subcommand: u8,
        seconds: f32,
    },
    /// Fixed float sent while measuring reply latency.
    FloatProbe,
    /// Wheel angles in radians (`e` once, `E` periodic).
    Encoder { command: u8, left: f32, right: f32 },
    /// Filtered pack voltage (`b` once, `B` periodic).
    Voltage { command: u8, volts: f32 },
    /// Uptime, last duties and raw encoder counts (`q` once, `Q` periodic).
    SysInfo {
        command: u8,
        seconds: f32,
        pwm_left: i16,
        pwm_right: i16,
        encoder_left: i16,
        encoder_right: i16,
    },
    /// Controller commands issued during a distance-mode step.
    PwmEcho { left: f32, right: f32 },
    LowBattery { volts: f32 },
    PowerOff,
    /// Unrecognized command or subcommand byte.
    Unknown { byte: u8 },
}

impl Reply {
    /// Leading command byte of the reply.
    #[must_use]
    pub const fn command(&self) -> u8 {
        match self {
            Reply::Arithmetic { op, .. } => *op,
            Reply::Time { command, .. }
            | Reply::Encoder { command, .. }
            | Reply::Voltage { command, .. }
            | Reply::SysInfo { command, .. } => *command,
            Reply::FloatProbe => b'g',
            Reply::PwmEcho { .. } => b'p',
            Reply::LowBattery { .. } | Reply::PowerOff => b'!',
            Reply::Unknown { .. } => b'?',
        }
    }

    /// Type string describing the command byte and payload.
    #[must_use]
    pub const fn format(&self) -> &'static str {
        match self {
            Reply::Arithmetic { .. } | Reply::FloatProbe | Reply::Voltage { .. } => "cf",
            Reply::Time { .. } => "cBf",
            Reply::Encoder { .. } | Reply::PwmEcho { .. } => "cff",
            Reply::SysInfo { .. } => "cf4h",
            Reply::LowBattery { .. } => "c7sf",
            Reply::PowerOff => "c9s",
            Reply::Unknown { .. } => "cc",
        }
    }

    /// Frames the reply for the link.
    #[must_use]
    pub fn encode(&self) -> Frame {
        let mut payload: Vec<u8, MAX_FRAME_LEN> = Vec::new();
        let mut put = |bytes: &[u8]| {
            let _ = payload.extend_from_slice(bytes);
        };

        match *self {
            Reply::Arithmetic { value, .. } => put(&value.to_le_bytes()),
            Reply::Time {
                subcommand,
                seconds,
                ..
            } => {
                put(&[subcommand]);
                put(&seconds.to_le_bytes());
            }
            Reply::FloatProbe => put(&FLOAT_PROBE_VALUE.to_le_bytes()),
            Reply::Encoder { left, right, .. } | Reply::PwmEcho { left, right } => {
                put(&left.to_le_bytes());
                put(&right.to_le_bytes());
            }
            Reply::Voltage { volts, .. } => put(&volts.to_le_bytes()),
            Reply::SysInfo {
                seconds,
                pwm_left,
                pwm_right,
                encoder_left,
                encoder_right,
                ..
            } => {
                put(&seconds.to_le_bytes());
                for value in [pwm_left, pwm_right, encoder_left, encoder_right] {
                    put(&value.to_le_bytes());
                }
            }
            Reply::LowBattery { volts } => {
                put(LOW_BATTERY_TEXT);
                put(&volts.to_le_bytes());
            }
            Reply::PowerOff => put(POWER_OFF_TEXT),
            Reply::Unknown { byte } => put(&[byte]),
        }

        let format = self.format().as_bytes();
        let body_len = format.len() + 1 + 1 + payload.len();
        let mut frame = Frame::new();
        // Longest reply (system info) is 19 bytes, well inside MAX_FRAME_LEN.
        let _ = frame.push(u8::try_from(body_len).unwrap_or(u8::MAX));
        let _ = frame.extend_from_slice(format);
        let _ = frame.push(0);
        let _ = frame.push(self.command());
        let _ = frame.extend_from_slice(&payload);
        frame
    }

    /// Value carried by a [`Reply::FloatProbe`].
    #[must_use]
    pub const fn float_probe_value() -> f32 {
        FLOAT_PROBE_VALUE
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = char::from(self.command());
        match self {
            Reply::Arithmetic { value, .. } => write!(f, "{command} = {value}"),
            Reply::Time {
                subcommand,
                seconds,
                ..
            } => write!(f, "{command}{subcommand} time {seconds:.6}s"),
            Reply::FloatProbe => write!(f, "g {FLOAT_PROBE_VALUE}"),
            Reply::Encoder { left, right, .. } => {
                write!(f, "{command} encoder L={left:.4}rad R={right:.4}rad")
            }
            Reply::Voltage { volts, .. } => write!(f, "{command} battery {volts:.3}V"),
            Reply::SysInfo {
                seconds,
                pwm_left,
                pwm_right,
                encoder_left,
                encoder_right,
                ..
            } => write!(
                f,
                "{command} t={seconds:.3}s pwm={pwm_left}/{pwm_right} enc={encoder_left}/{encoder_right}"
            ),
            Reply::PwmEcho { left, right } => write!(f, "p pwm L={left:.2} R={right:.2}"),
            Reply::LowBattery { volts } => write!(f, "! BAT LOW {volts:.3}V"),
            Reply::PowerOff => f.write_str("! POWER OFF"),
            Reply::Unknown { byte } => write!(f, "? 0x{byte:02x}"),
        }
    }
}

/// Destination for replies produced by the main loop.
pub trait ReplySink {
    fn send(&mut self, reply: Reply);
}

impl<S> ReplySink for &mut S
where
    S: ReplySink + ?Sized,
{
    fn send(&mut self, reply: Reply) {
        (**self).send(reply);
    }
}

/// Bounded buffer; replies past capacity are dropped.
impl<const N: usize> ReplySink for Vec<Reply, N> {
    fn send(&mut self, reply: Reply) {
        let _ = self.push(reply);
    }
}

#[cfg(feature = "alloc")]
impl ReplySink for alloc::vec::Vec<Reply> {
    fn send(&mut self, reply: Reply) {
        self.push(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_carries_length_format_and_command() {
        let frame = Reply::Arithmetic {
            op: b'+',
            value: 3.5,
        }
        .encode();

        let mut expected: Vec<u8, MAX_FRAME_LEN> = Vec::new();
        expected.extend_from_slice(&[8, b'c', b'f', 0, b'+']).unwrap();
        expected.extend_from_slice(&3.5f32.to_le_bytes()).unwrap();
        assert_eq!(frame, expected);
        assert_eq!(usize::from(frame[0]), frame.len() - 1);
    }

    #[test]
    fn time_reply_includes_subcommand() {
        let frame = Reply::Time {
            command: b'T',
            subcommand: 2,
            seconds: 0.5,
        }
        .encode();
        assert_eq!(&frame[..7], &[10, b'c', b'B', b'f', 0, b'T', 2]);
        assert_eq!(&frame[7..], &0.5f32.to_le_bytes());
        assert_eq!(usize::from(frame[0]), frame.len() - 1);
    }

    #[test]
    fn sys_info_packs_four_shorts() {
        let frame = Reply::SysInfo {
            command: b'q',
            seconds: 1.0,
            pwm_left: 100,
            pwm_right: -100,
            encoder_left: 7,
            encoder_right: -7,
        }
        .encode();
        assert_eq!(frame.len(), 1 + 5 + 1 + 4 + 8);
        assert_eq!(&frame[1..6], b"cf4h\0");
        assert_eq!(&frame[11..13], &100i16.to_le_bytes());
        assert_eq!(&frame[17..19], &(-7i16).to_le_bytes());
        assert_eq!(usize::from(frame[0]), frame.len() - 1);
    }

    #[test]
    fn battery_warnings_carry_text() {
        let low = Reply::LowBattery { volts: 4.5 }.encode();
        assert_eq!(&low[1..7], b"c7sf\0!");
        assert_eq!(&low[7..14], b"BAT LOW");
        assert_eq!(usize::from(low[0]), low.len() - 1);

        let off = Reply::PowerOff.encode();
        assert_eq!(&off[5..], b"!POWER OFF");
        assert_eq!(usize::from(off[0]), off.len() - 1);
    }

    #[test]
    fn unknown_echoes_byte() {
        let frame = Reply::Unknown { byte: b'x' }.encode();
        assert_eq!(frame.as_slice(), &[5, b'c', b'c', 0, b'?', b'x']);
    }

    #[test]
    fn length_byte_counts_the_rest_of_every_frame() {
        let replies = [
            Reply::Arithmetic {
                op: b'*',
                value: -1.0,
            },
            Reply::Time {
                command: b't',
                subcommand: 1,
                seconds: 2.0,
            },
            Reply::FloatProbe,
            Reply::Encoder {
                command: b'e',
                left: 0.25,
                right: -0.25,
            },
            Reply::Voltage {
                command: b'b',
                volts: 5.1,
            },
            Reply::SysInfo {
                command: b'Q',
                seconds: 3.0,
                pwm_left: 1,
                pwm_right: 2,
                encoder_left: 3,
                encoder_right: 4,
            },
            Reply::PwmEcho {
                left: 10.0,
                right: 20.0,
            },
            Reply::LowBattery { volts: 4.6 },
            Reply::PowerOff,
            Reply::Unknown { byte: 0x7f },
        ];

        for reply in replies {
            let frame = reply.encode();
            assert_eq!(usize::from(frame[0]), frame.len() - 1, "{reply:?}");
            assert_eq!(&frame[1..=reply.format().len()], reply.format().as_bytes());
            assert_eq!(frame[reply.format().len() + 2], reply.command());
        }
    }

    #[test]
    fn heapless_sink_drops_overflow() {
        let mut sink: Vec<Reply, 1> = Vec::new();
        sink.send(Reply::PowerOff);
        sink.send(Reply::FloatProbe);
        assert_eq!(sink.as_slice(), &[Reply::PowerOff]);
    }
}
