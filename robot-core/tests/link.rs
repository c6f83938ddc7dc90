mod common;

use common::{Replies, robot};
use robot_core::clock::{Clock, TickClock};
use robot_core::encoder::EncoderCounts;
use robot_core::protocol::{ArithmeticOp, Command, Reply};
use robot_core::scheduler::{FlagState, TaskId};

#[test]
fn commands_split_across_reads_are_reassembled() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    let mut stream = Vec::new();
    stream.extend_from_slice(
        &Command::Arithmetic {
            op: ArithmeticOp::Multiply,
            lhs: 3.0,
            rhs: -2.5,
        }
        .encode(),
    );
    stream.extend_from_slice(&Command::SysInfoEvery { period_ms: 250.0 }.encode());
    stream.extend_from_slice(b"b");

    for chunk in stream.chunks(3) {
        robot.receive(chunk, &mut replies);
    }

    assert_eq!(
        replies.as_slice(),
        &[Reply::Arithmetic {
            op: b'*',
            value: -7.5
        }]
    );
    assert_eq!(robot.flags().state(TaskId::SendSysInfo), FlagState::Repeating);
    assert_eq!(robot.flags().state(TaskId::SendVoltage), FlagState::OneShot);
}

#[test]
fn unknown_byte_resynchronizes_on_next_message() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    robot.receive(b"x", &mut replies);
    robot.receive(b"e", &mut replies);
    robot.poll(&mut replies);

    assert_eq!(replies[0], Reply::Unknown { byte: b'x' });
    assert!(matches!(replies[1], Reply::Encoder { command: b'e', .. }));
    assert_eq!(replies.len(), 2);
}

#[test]
fn unknown_time_subcommand_is_echoed() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    robot.receive(b"t\x07", &mut replies);
    robot.poll(&mut replies);

    assert_eq!(replies.as_slice(), &[Reply::Unknown { byte: 0x07 }]);
    assert!(robot.flags().due(clock.now()).next().is_none());
}

#[test]
fn reply_frames_carry_length_and_format() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    clock.advance(500);
    robot.receive(b"t\x00", &mut replies);
    robot.poll(&mut replies);

    let frame = replies[0].encode();
    let mut expected = vec![10, b'c', b'B', b'f', 0, b't', 0];
    expected.extend_from_slice(&0.5f32.to_le_bytes());
    assert_eq!(usize::from(frame[0]), frame.len() - 1);
    assert_eq!(frame.as_slice(), expected.as_slice());
}

#[test]
fn restart_drops_partial_input() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    robot.receive(b"~", &mut replies);
    robot.receive(b"E\x00", &mut replies);
    robot.poll(&mut replies);

    // The partial `E` was flushed by the restart, so these bytes start fresh.
    robot.receive(b"q", &mut replies);
    robot.poll(&mut replies);

    assert_eq!(replies.len(), 1);
    assert!(matches!(replies[0], Reply::SysInfo { command: b'q', .. }));
}
