//! Main control loop: command dispatch and the per-iteration flag poll.
//!
//! [`Robot::receive`] feeds link bytes through the [`MessageQueue`] and turns
//! each complete command into flag updates (arithmetic is answered on the
//! spot). [`Robot::poll`] runs one loop iteration: battery sampling first, then
//! every due flag in [`TaskId`] order. Both run in the same execution context;
//! only the encoder counts are shared with interrupt handlers.

mod mode;

pub use mode::{ModeOutcome, MotionMode, MotionRun};

use crate::battery::{BatteryMonitor, BatterySensor, BatteryWarning};
use crate::clock::{Clock, TimePoint};
use crate::config::RobotConfig;
use crate::controller::MotionController;
use crate::encoder::EncoderCounts;
use crate::filter::FilterError;
use crate::motor::{MotorDriver, MotorPwm};
use crate::protocol::{Command, MessageQueue, ProtocolError, Reply, ReplySink, TimeRequest};
use crate::scheduler::{MessageFlags, TaskId};
use crate::telemetry::{TelemetryEventKind, TelemetryPayload, TelemetryRecorder};

const MILLIS_PER_SECOND: f32 = 1_000.0;

/// Robot state owned by the main loop.
pub struct Robot<'a, C, M, B>
where
    C: Clock,
    M: MotorDriver,
    B: BatterySensor,
{
    config: RobotConfig,
    clock: C,
    encoders: &'a EncoderCounts,
    motors: MotorPwm<M>,
    sensor: B,
    battery: BatteryMonitor,
    flags: MessageFlags,
    queue: MessageQueue,
    left: MotionController,
    right: MotionController,
    requested_pwm: (i16, i16),
    run: Option<MotionRun>,
    loop_started: Option<TimePoint>,
    telemetry: TelemetryRecorder<TimePoint>,
}

impl<'a, C, M, B> Robot<'a, C, M, B>
where
    C: Clock,
    M: MotorDriver,
    B: BatterySensor,
{
    /// # Errors
    ///
    /// Returns [`FilterError`] when a controller or battery filter in `config`
    /// has unusable coefficients.
    pub fn new(
        config: RobotConfig,
        clock: C,
        encoders: &'a EncoderCounts,
        motors: M,
        sensor: B,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            left: MotionController::from_config(&config.left, config.update_period)?,
            right: MotionController::from_config(&config.right, config.update_period)?,
            battery: BatteryMonitor::new(config.battery)?,
            motors: MotorPwm::new(motors, config.max_pwm),
            config,
            clock,
            encoders,
            sensor,
            flags: MessageFlags::new(),
            queue: MessageQueue::new(),
            requested_pwm: (0, 0),
            run: None,
            loop_started: None,
            telemetry: TelemetryRecorder::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    #[must_use]
    pub fn flags(&self) -> &MessageFlags {
        &self.flags
    }

    #[must_use]
    pub fn motors(&self) -> &MotorPwm<M> {
        &self.motors
    }

    pub fn motors_mut(&mut self) -> &mut MotorPwm<M> {
        &mut self.motors
    }

    #[must_use]
    pub fn battery(&self) -> &BatteryMonitor {
        &self.battery
    }

    pub fn sensor_mut(&mut self) -> &mut B {
        &mut self.sensor
    }

    /// Motion mode currently driving the wheels, if any.
    #[must_use]
    pub fn motion(&self) -> Option<&MotionRun> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryRecorder<TimePoint> {
        &self.telemetry
    }

    #[must_use]
    pub fn now(&self) -> TimePoint {
        self.clock.now()
    }

    /// Wheel travel since `start` angles, in metres.
    #[must_use]
    pub fn travelled(&self, start_left: f32, start_right: f32) -> (f32, f32) {
        let (left, right) = self.wheel_angles();
        (
            self.config.wheel_distance(left - start_left),
            self.config.wheel_distance(right - start_right),
        )
    }

    fn wheel_angles(&self) -> (f32, f32) {
        self.encoders
            .snapshot()
            .radians(self.config.counts_per_rev)
    }

    /// Feeds raw link bytes and dispatches every complete command.
    pub fn receive<S>(&mut self, bytes: &[u8], sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        for &byte in bytes {
            self.queue.push(byte);
            while let Some(result) = self.queue.next_command() {
                match result {
                    Ok(command) => self.handle(command, sink),
                    Err(error) => self.reject(error, sink),
                }
            }
        }
    }

    fn reject<S>(&mut self, error: ProtocolError, sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        if let Some(byte) = error.echo_byte() {
            sink.send(Reply::Unknown { byte });
            self.telemetry.record(
                TelemetryEventKind::UnknownCommand(byte),
                TelemetryPayload::none(),
                self.clock.now(),
            );
        }
    }

    /// Applies one decoded command.
    pub fn handle<S>(&mut self, command: Command, sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        let now = self.clock.now();
        let byte = command.byte();

        match command {
            Command::Restart => self.flags.arm_once(TaskId::Restart, byte, 0),
            Command::Arithmetic { op, lhs, rhs } => sink.send(Reply::Arithmetic {
                op: byte,
                value: op.apply(lhs, rhs),
            }),
            Command::Time(request) => {
                let task = time_task(request);
                if task == TaskId::LoopTimer {
                    self.loop_started = None;
                }
                self.flags.arm_once(task, byte, request.once_code());
            }
            Command::TimeEvery { request, period_ms } => {
                let task = time_task(request);
                if task == TaskId::LoopTimer {
                    self.loop_started = None;
                }
                self.flags.arm_repeating(
                    task,
                    now,
                    period_ms / MILLIS_PER_SECOND,
                    byte,
                    request.repeat_code(),
                );
            }
            Command::TimeCancel => {
                for task in [TaskId::SendTime, TaskId::LoopTimer, TaskId::TimeFloatSend] {
                    self.flags.cancel(task);
                }
                self.loop_started = None;
            }
            Command::Encoder => self.flags.arm_once(TaskId::SendEncoder, byte, 0),
            Command::EncoderEvery { period_ms } => self.flags.arm_repeating(
                TaskId::SendEncoder,
                now,
                period_ms / MILLIS_PER_SECOND,
                byte,
                0,
            ),
            Command::Battery => self.flags.arm_once(TaskId::SendVoltage, byte, 0),
            Command::BatteryEvery { period_s } => {
                self.flags
                    .arm_repeating(TaskId::SendVoltage, now, period_s, byte, 0);
            }
            Command::Pwm {
                left,
                right,
                duration_ms,
            } => {
                self.end_run(ModeOutcome::Cancelled, now);
                self.requested_pwm = (left, right);
                self.flags.arm_once(TaskId::SetPwm, byte, 0);
                match duration_ms {
                    Some(duration) => self.flags.arm_deadline(
                        TaskId::StopPwm,
                        now,
                        duration / MILLIS_PER_SECOND,
                        byte,
                    ),
                    None => self.flags.cancel(TaskId::StopPwm),
                }
            }
            Command::Stop => self.flags.arm_once(TaskId::StopPwm, byte, 0),
            Command::SysInfo => self.flags.arm_once(TaskId::SendSysInfo, byte, 0),
            Command::SysInfoEvery { period_ms } => self.flags.arm_repeating(
                TaskId::SendSysInfo,
                now,
                period_ms / MILLIS_PER_SECOND,
                byte,
                0,
            ),
            Command::Distance {
                linear,
                angular,
                duration_ms,
            } => self.start_run(MotionMode::Distance, linear, angular, duration_ms, byte, now),
            Command::Velocity {
                linear,
                angular,
                duration_ms,
            } => self.start_run(MotionMode::Velocity, linear, angular, duration_ms, byte, now),
        }
    }

    fn start_run(
        &mut self,
        mode: MotionMode,
        linear: f32,
        angular: f32,
        duration_ms: Option<f32>,
        byte: u8,
        now: TimePoint,
    ) {
        self.end_run(ModeOutcome::Cancelled, now);
        if duration_ms.is_some_and(|duration| duration < 0.0) {
            self.flags.arm_once(TaskId::StopPwm, byte, 0);
            return;
        }

        let (target_left, target_right) = self.config.geometry.split(linear, angular);
        let (start_left, start_right) = self.wheel_angles();
        self.left.reset();
        self.right.reset();
        if mode == MotionMode::Distance {
            self.left.hold_position(target_left);
            self.right.hold_position(target_right);
        }

        self.run = Some(MotionRun {
            mode,
            target_left,
            target_right,
            start_left,
            start_right,
            started_at: now,
            last_update: now,
            limit: duration_ms.map(|duration| duration / MILLIS_PER_SECOND),
            updates: 0,
        });
        self.flags.cancel(TaskId::StopPwm);
        self.flags.arm_repeating(
            mode_task(mode),
            now,
            self.config.update_period,
            byte,
            0,
        );
        self.motors.set_enabled(true);
        self.telemetry.record_mode_started(mode, now);
    }

    /// Ends the active motion mode, if any, and cancels its flag.
    fn end_run(&mut self, outcome: ModeOutcome, now: TimePoint) {
        if let Some(run) = self.run.take() {
            self.flags.cancel(mode_task(run.mode));
            self.telemetry
                .record_mode_finished(run.mode, outcome, run.updates, now);
        }
    }

    /// Runs one main-loop iteration.
    pub fn poll<S>(&mut self, sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        let now = self.clock.now();
        self.check_battery(now, sink);

        for task in TaskId::ALL {
            if !self.flags.should_execute(task, now) {
                continue;
            }
            if !matches!(task, TaskId::DistanceMode | TaskId::VelocityMode) {
                // Control ticks are summarized by the mode records.
                self.telemetry.record_flag_fired(task, now);
            }
            if self.run_task(task, now, sink) {
                self.flags.mark_fired(task, now);
            }
        }
    }

    fn check_battery<S>(&mut self, now: TimePoint, sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        match self.battery.poll(now, &mut self.sensor) {
            Some(BatteryWarning::Low(volts)) => {
                sink.send(Reply::LowBattery { volts });
                self.motors.set_enabled(false);
                self.telemetry.record_battery(false, volts, now);
            }
            Some(BatteryWarning::PowerOff) => {
                sink.send(Reply::PowerOff);
                self.telemetry
                    .record_battery(true, self.battery.voltage(), now);
            }
            None => {}
        }
    }

    /// Executes the body of `task`. Returns `false` when the firing should not
    /// count, leaving the flag due on the next iteration.
    fn run_task<S>(&mut self, task: TaskId, now: TimePoint, sink: &mut S) -> bool
    where
        S: ReplySink + ?Sized,
    {
        let flag = *self.flags.get(task);
        match task {
            TaskId::Restart => self.restart(),
            TaskId::SendTime => sink.send(Reply::Time {
                command: flag.command,
                subcommand: flag.subcommand,
                seconds: now.seconds_since(TimePoint::ZERO),
            }),
            TaskId::LoopTimer => {
                let Some(started) = self.loop_started.take() else {
                    self.loop_started = Some(now);
                    return false;
                };
                sink.send(Reply::Time {
                    command: flag.command,
                    subcommand: flag.subcommand,
                    seconds: now.seconds_since(started),
                });
            }
            TaskId::TimeFloatSend => {
                let started = self.clock.now();
                sink.send(Reply::FloatProbe);
                let seconds = self.clock.now().seconds_since(started);
                sink.send(Reply::Time {
                    command: flag.command,
                    subcommand: flag.subcommand,
                    seconds,
                });
            }
            TaskId::SendEncoder => {
                let (left, right) = self.wheel_angles();
                sink.send(Reply::Encoder {
                    command: flag.command,
                    left,
                    right,
                });
            }
            TaskId::SendVoltage => sink.send(Reply::Voltage {
                command: flag.command,
                volts: self.battery.voltage(),
            }),
            TaskId::SetPwm => {
                let (left, right) = self.requested_pwm;
                self.motors.set_enabled(true);
                self.motors.set(left, right);
                let (left, right) = self.motors.duties();
                self.telemetry.record_motors(true, left, right, now);
            }
            TaskId::StopPwm => self.stop(now),
            TaskId::SendSysInfo => self.send_sys_info(flag.command, now, sink),
            TaskId::DistanceMode => self.distance_step(now, sink),
            TaskId::VelocityMode => self.velocity_step(now),
        }
        true
    }

    #[allow(clippy::cast_possible_truncation)]
    fn send_sys_info<S>(&mut self, command: u8, now: TimePoint, sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        let (pwm_left, pwm_right) = self.motors.duties();
        let counts = self.encoders.snapshot();
        sink.send(Reply::SysInfo {
            command,
            seconds: now.seconds_since(TimePoint::ZERO),
            pwm_left,
            pwm_right,
            // Counts are reported modulo the i16 range.
            encoder_left: counts.left as i16,
            encoder_right: counts.right as i16,
        });
    }

    fn distance_step<S>(&mut self, now: TimePoint, sink: &mut S)
    where
        S: ReplySink + ?Sized,
    {
        let Some(run) = self.run.filter(|run| run.mode == MotionMode::Distance) else {
            self.flags.cancel(TaskId::DistanceMode);
            return;
        };
        if run.expired(now) {
            self.end_run(ModeOutcome::TimedOut, now);
            self.flags.arm_once(TaskId::StopPwm, b'D', 0);
            return;
        }

        let (left, right) = self.travelled(run.start_left, run.start_right);
        let tolerance = self.config.distance_tolerance;
        if (left - run.target_left).abs() <= tolerance
            && (right - run.target_right).abs() <= tolerance
        {
            self.end_run(ModeOutcome::Reached, now);
            self.flags.arm_once(TaskId::SendEncoder, b'e', 0);
            self.flags.arm_once(TaskId::StopPwm, b'd', 0);
            return;
        }

        let dt = run.step(now);
        let left_command = self.left.update(left, dt);
        let right_command = self.right.update(right, dt);
        sink.send(Reply::PwmEcho {
            left: left_command,
            right: right_command,
        });
        self.motors.set_from_commands(left_command, right_command);
        self.advance_run(now);
    }

    fn velocity_step(&mut self, now: TimePoint) {
        let Some(run) = self.run.filter(|run| run.mode == MotionMode::Velocity) else {
            self.flags.cancel(TaskId::VelocityMode);
            return;
        };
        if run.expired(now) {
            self.end_run(ModeOutcome::TimedOut, now);
            self.flags.arm_once(TaskId::StopPwm, b'V', 0);
            return;
        }

        // Track a reference that advances at the requested speed, aimed at
        // where each wheel should be by the next update.
        let elapsed = now.seconds_since(run.started_at) + self.config.update_period;
        self.left.hold_position(run.target_left * elapsed);
        self.right.hold_position(run.target_right * elapsed);

        let (left, right) = self.travelled(run.start_left, run.start_right);
        let dt = run.step(now);
        let left_command = self.left.update(left, dt);
        let right_command = self.right.update(right, dt);
        self.motors.set_from_commands(left_command, right_command);
        self.advance_run(now);
    }

    fn advance_run(&mut self, now: TimePoint) {
        if let Some(run) = self.run.as_mut() {
            run.last_update = now;
            run.updates += 1;
        }
    }

    /// Zeroes and disables the motors and ends any motion mode.
    pub fn stop(&mut self, now: TimePoint) {
        self.end_run(ModeOutcome::Cancelled, now);
        for task in [TaskId::StopPwm, TaskId::DistanceMode, TaskId::VelocityMode] {
            self.flags.cancel(task);
        }
        let was_enabled = self.motors.is_enabled();
        self.motors.stop();
        if was_enabled {
            self.telemetry.record_motors(false, 0, 0, now);
        }
    }

    /// Returns every flag, controller and encoder count to its initial state.
    pub fn restart(&mut self) {
        let now = self.clock.now();
        self.stop(now);
        self.flags.reset();
        self.queue.flush();
        self.encoders.reset();
        self.left.reset();
        self.right.reset();
        self.requested_pwm = (0, 0);
        self.loop_started = None;
        self.telemetry.record(
            TelemetryEventKind::Restart,
            TelemetryPayload::none(),
            now,
        );
    }
}

const fn time_task(request: TimeRequest) -> TaskId {
    match request {
        TimeRequest::Now => TaskId::SendTime,
        TimeRequest::LoopTime => TaskId::LoopTimer,
        TimeRequest::FloatSend => TaskId::TimeFloatSend,
    }
}

const fn mode_task(mode: MotionMode) -> TaskId {
    match mode {
        MotionMode::Distance => TaskId::DistanceMode,
        MotionMode::Velocity => TaskId::VelocityMode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::FixedBattery;
    use crate::clock::TickClock;
    use crate::motor::NoopMotorDriver;
    use crate::protocol::ArithmeticOp;
    use crate::scheduler::FlagState;

    type Replies = heapless::Vec<Reply, 64>;

    fn robot<'a>(
        clock: &'a TickClock,
        encoders: &'a EncoderCounts,
    ) -> Robot<'a, &'a TickClock, NoopMotorDriver, FixedBattery> {
        Robot::new(
            RobotConfig::DEFAULT,
            clock,
            encoders,
            NoopMotorDriver,
            FixedBattery(Some(2.6)),
        )
        .unwrap()
    }

    #[test]
    fn arithmetic_is_answered_on_receive() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        let command = Command::Arithmetic {
            op: ArithmeticOp::Divide,
            lhs: 1.0,
            rhs: 4.0,
        };
        robot.receive(&command.encode(), &mut replies);
        assert_eq!(
            replies.as_slice(),
            &[Reply::Arithmetic {
                op: b'/',
                value: 0.25
            }]
        );
    }

    #[test]
    fn unknown_byte_is_echoed() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        robot.receive(b"z", &mut replies);
        assert_eq!(replies.as_slice(), &[Reply::Unknown { byte: b'z' }]);
        assert_eq!(
            robot.telemetry().latest().map(|record| record.event),
            Some(TelemetryEventKind::UnknownCommand(b'z'))
        );
    }

    #[test]
    fn loop_timer_reports_one_iteration() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        robot.receive(b"t\x01", &mut replies);
        robot.poll(&mut replies);
        assert!(replies.is_empty());
        assert!(robot.flags().is_active(TaskId::LoopTimer));

        clock.advance(3);
        robot.poll(&mut replies);
        assert_eq!(
            replies.as_slice(),
            &[Reply::Time {
                command: b't',
                subcommand: 1,
                seconds: 0.003
            }]
        );
        assert_eq!(robot.flags().state(TaskId::LoopTimer), FlagState::Idle);
    }

    #[test]
    fn float_send_reports_probe_then_time() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        robot.receive(b"t\x02", &mut replies);
        robot.poll(&mut replies);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], Reply::FloatProbe);
        assert!(matches!(
            replies[1],
            Reply::Time {
                command: b't',
                subcommand: 2,
                ..
            }
        ));
    }

    #[test]
    fn timed_pwm_stops_after_duration() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        let command = Command::Pwm {
            left: 500,
            right: -120,
            duration_ms: Some(100.0),
        };
        robot.receive(&command.encode(), &mut replies);
        robot.poll(&mut replies);
        assert!(robot.motors().is_enabled());
        assert_eq!(robot.motors().duties(), (400, -120));

        clock.advance(99);
        robot.poll(&mut replies);
        assert!(robot.motors().is_enabled());

        clock.advance(1);
        robot.poll(&mut replies);
        assert!(!robot.motors().is_enabled());
        assert_eq!(robot.motors().duties(), (0, 0));
        assert_eq!(robot.flags().state(TaskId::StopPwm), FlagState::Idle);
    }

    #[test]
    fn negative_duration_cancels_motion() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        let start = Command::Velocity {
            linear: 0.1,
            angular: 0.0,
            duration_ms: None,
        };
        robot.receive(&start.encode(), &mut replies);
        assert_eq!(robot.motion().map(|run| run.mode), Some(MotionMode::Velocity));

        let cancel = Command::Velocity {
            linear: 0.0,
            angular: 0.0,
            duration_ms: Some(-1.0),
        };
        robot.receive(&cancel.encode(), &mut replies);
        assert!(robot.motion().is_none());
        assert!(!robot.flags().is_active(TaskId::VelocityMode));

        robot.poll(&mut replies);
        assert!(!robot.motors().is_enabled());
    }

    #[test]
    fn velocity_mode_splits_wheel_speeds() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        let command = Command::Velocity {
            linear: 1.0,
            angular: 10.0,
            duration_ms: Some(50.0),
        };
        robot.receive(&command.encode(), &mut replies);
        let run = *robot.motion().unwrap();
        assert!((run.target_left - 0.58).abs() < 1e-6);
        assert!((run.target_right - 1.42).abs() < 1e-6);

        // Wheels never move here, so the reference runs away from them and the
        // commanded duty grows.
        let mut duties = (0, 0);
        for _ in 0..10 {
            robot.poll(&mut replies);
            duties = robot.motors().duties();
            clock.advance(5);
        }
        assert!(duties.0 > 0);
        assert!(duties.1 > duties.0);

        robot.poll(&mut replies);
        assert!(robot.motion().is_none());
        robot.poll(&mut replies);
        assert!(!robot.motors().is_enabled());
    }

    #[test]
    fn sys_info_reports_duties_and_counts() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        for (xor, b) in [(true, false), (false, false), (true, true)] {
            encoders.on_edge(crate::encoder::Side::Left, xor, b);
        }
        let pwm = Command::Pwm {
            left: 50,
            right: 60,
            duration_ms: None,
        };
        robot.receive(&pwm.encode(), &mut replies);
        robot.receive(b"q", &mut replies);
        clock.advance(1_500);
        robot.poll(&mut replies);

        let counts = encoders.snapshot();
        let report = replies
            .iter()
            .find(|reply| matches!(reply, Reply::SysInfo { .. }))
            .copied()
            .unwrap();
        assert_eq!(
            report,
            Reply::SysInfo {
                command: b'q',
                seconds: 1.5,
                pwm_left: 50,
                pwm_right: 60,
                encoder_left: i16::try_from(counts.left).unwrap(),
                encoder_right: 0,
            }
        );
    }

    #[test]
    fn low_battery_disables_motors() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = Robot::new(
            RobotConfig::DEFAULT,
            &clock,
            &encoders,
            NoopMotorDriver,
            FixedBattery(Some(2.2)),
        )
        .unwrap();
        let mut replies = Replies::new();

        robot.poll(&mut replies);
        robot.motors_mut().set_enabled(true);
        clock.advance(3_000);
        robot.poll(&mut replies);

        assert!(matches!(replies.last(), Some(Reply::LowBattery { .. })));
        assert!(!robot.motors().is_enabled());
    }

    #[test]
    fn restart_clears_flags_and_counts() {
        let clock = TickClock::new();
        let encoders = EncoderCounts::new();
        let mut robot = robot(&clock, &encoders);
        let mut replies = Replies::new();

        encoders.on_edge(crate::encoder::Side::Right, true, false);
        robot.receive(&Command::EncoderEvery { period_ms: 10.0 }.encode(), &mut replies);
        robot.receive(b"~", &mut replies);
        robot.poll(&mut replies);

        assert_eq!(robot.flags().due(clock.now()).count(), 0);
        assert_eq!(encoders.snapshot().right, 0);
        assert!(replies.is_empty());
    }
}
