mod common;

use common::{Replies, WheelPlant, robot, run_with_plant, send};
use robot_core::clock::TickClock;
use robot_core::encoder::{EncoderCounts, Side};
use robot_core::protocol::{Command, Reply};
use robot_core::robot::{ModeOutcome, MotionMode};
use robot_core::scheduler::TaskId;
use robot_core::telemetry::{TelemetryEventKind, TelemetryPayload};

#[test]
fn distance_mode_reaches_target_and_stops() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut plant = WheelPlant::new(robot.config());
    let mut replies = Replies::new();

    let command = Command::Distance {
        linear: 0.1,
        angular: 0.0,
        duration_ms: None,
    };
    send(&mut robot, command, &mut replies);
    assert!(replies.is_empty(), "distance mode has no immediate reply");
    assert_eq!(robot.motion().map(|run| run.mode), Some(MotionMode::Distance));

    let mut echoes = Vec::new();
    let mut reports = Vec::new();
    run_with_plant(&mut robot, &clock, &encoders, &mut plant, 3_000, |now, reply| {
        match *reply {
            Reply::PwmEcho { left, right } => echoes.push((now, left, right)),
            Reply::Encoder {
                command,
                left,
                right,
            } => reports.push((command, left, right)),
            _ => {}
        }
    });

    assert!(robot.motion().is_none(), "run should have finished");
    assert!(!robot.motors().is_enabled());
    assert_eq!(robot.motors().duties(), (0, 0));
    assert!(!robot.flags().is_active(TaskId::DistanceMode));

    let (first_at, first_left, _) = echoes[0];
    let (last_at, last_left, last_right) = echoes[echoes.len() - 1];
    assert_eq!(first_at, 0, "first control update runs on the first poll");
    assert!(last_at < 1_500, "converged at {last_at} ms");
    assert!(first_left > last_left && last_left > 0.0);
    assert!(last_right > 0.0);

    assert_eq!(reports.len(), 1, "completion sends one encoder report");
    let (command, left, right) = reports[0];
    assert_eq!(command, b'e');
    for angle in [left, right] {
        let travelled = robot.config().wheel_distance(angle);
        assert!((travelled - 0.1).abs() < 0.002, "travelled {travelled} m");
    }
    assert!((plant.position(Side::Left) - 0.1).abs() < 0.002);

    let finished = robot
        .telemetry()
        .oldest_first()
        .find(|record| record.event == TelemetryEventKind::ModeFinished(MotionMode::Distance))
        .expect("mode completion is recorded");
    match finished.details {
        TelemetryPayload::Mode(mode) => {
            assert_eq!(mode.outcome, Some(ModeOutcome::Reached));
            assert!(mode.updates > 100);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn distance_mode_times_out_when_wheels_cannot_move() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    let command = Command::Distance {
        linear: 0.5,
        angular: 0.0,
        duration_ms: Some(200.0),
    };
    send(&mut robot, command, &mut replies);

    for _ in 0..=200 {
        robot.poll(&mut replies);
        replies.clear();
        clock.tick();
    }
    robot.poll(&mut replies);

    assert!(robot.motion().is_none());
    assert!(!robot.motors().is_enabled());
    assert!(
        robot
            .telemetry()
            .oldest_first()
            .any(|record| matches!(
                record.details,
                TelemetryPayload::Mode(mode) if mode.outcome == Some(ModeOutcome::TimedOut)
            ))
    );
}

#[test]
fn turning_in_place_drives_wheels_apart() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut plant = WheelPlant::new(robot.config());
    let mut replies = Replies::new();

    let command = Command::Distance {
        linear: 0.0,
        angular: 1.0,
        duration_ms: None,
    };
    send(&mut robot, command, &mut replies);
    run_with_plant(&mut robot, &clock, &encoders, &mut plant, 3_000, |_, _| {});

    assert!(robot.motion().is_none());
    let half_track = robot.config().geometry.track_width / 2.0;
    assert!((plant.position(Side::Left) + half_track).abs() < 0.002);
    assert!((plant.position(Side::Right) - half_track).abs() < 0.002);
}

#[test]
fn velocity_mode_moves_forward_until_duration_elapses() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut plant = WheelPlant::new(robot.config());
    let mut replies = Replies::new();

    let command = Command::Velocity {
        linear: 0.1,
        angular: 0.0,
        duration_ms: Some(1_000.0),
    };
    send(&mut robot, command, &mut replies);

    let mut echoed = false;
    let mut observe = |_: u32, reply: &Reply| echoed |= matches!(reply, Reply::PwmEcho { .. });
    run_with_plant(&mut robot, &clock, &encoders, &mut plant, 300, &mut observe);
    let settled = plant.position(Side::Left);
    run_with_plant(&mut robot, &clock, &encoders, &mut plant, 600, &mut observe);
    let speed = (plant.position(Side::Left) - settled) / 0.6;
    assert!((speed - 0.1).abs() < 0.01, "steady speed {speed} m/s");
    run_with_plant(&mut robot, &clock, &encoders, &mut plant, 200, &mut observe);

    assert!(!echoed, "velocity mode does not echo duties");
    assert!(robot.motion().is_none());
    assert!(!robot.motors().is_enabled());
    for side in Side::BOTH {
        let travelled = plant.position(side);
        assert!(travelled > 0.03 && travelled < 0.11, "{side:?} travelled {travelled} m");
    }
}

#[test]
fn pwm_command_cancels_motion_mode() {
    let clock = TickClock::new();
    let encoders = EncoderCounts::new();
    let mut robot = robot(&clock, &encoders);
    let mut replies = Replies::new();

    let distance = Command::Distance {
        linear: 0.2,
        angular: 0.0,
        duration_ms: None,
    };
    send(&mut robot, distance, &mut replies);
    robot.poll(&mut replies);

    let pwm = Command::Pwm {
        left: 30,
        right: 30,
        duration_ms: None,
    };
    send(&mut robot, pwm, &mut replies);
    assert!(robot.motion().is_none());
    assert!(!robot.flags().is_active(TaskId::DistanceMode));

    clock.tick();
    robot.poll(&mut replies);
    assert_eq!(robot.motors().duties(), (30, 30));
    assert!(robot.motors().is_enabled());
}
