#![allow(dead_code)]

use robot_core::battery::FixedBattery;
use robot_core::clock::{Clock, TickClock};
use robot_core::config::RobotConfig;
use robot_core::encoder::EncoderCounts;
use robot_core::motor::NoopMotorDriver;
use robot_core::protocol::{Command, Reply};
use robot_core::robot::Robot;
pub use robot_core::sim::WheelPlant;

pub type TestRobot<'a> = Robot<'a, &'a TickClock, NoopMotorDriver, FixedBattery>;
pub type Replies = heapless::Vec<Reply, 256>;

pub fn robot<'a>(clock: &'a TickClock, encoders: &'a EncoderCounts) -> TestRobot<'a> {
    Robot::new(
        RobotConfig::DEFAULT,
        clock,
        encoders,
        NoopMotorDriver,
        FixedBattery(Some(2.6)),
    )
    .expect("default configuration is valid")
}

pub fn send(robot: &mut TestRobot<'_>, command: Command, replies: &mut Replies) {
    robot.receive(&command.encode(), replies);
}

/// Runs the loop for `millis` one-millisecond iterations with the plant
/// attached, handing every reply to `observe`.
pub fn run_with_plant(
    robot: &mut TestRobot<'_>,
    clock: &TickClock,
    encoders: &EncoderCounts,
    plant: &mut WheelPlant,
    millis: u32,
    mut observe: impl FnMut(u32, &Reply),
) {
    let mut replies = Replies::new();
    for _ in 0..millis {
        robot.poll(&mut replies);
        let now = clock.now().millis();
        for reply in &replies {
            observe(now, reply);
        }
        replies.clear();
        let motors = robot.motors();
        plant.step(encoders, motors.duties(), motors.is_enabled());
        clock.tick();
    }
}
