use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use robot_core::battery::BatterySensor;
use robot_core::clock::{Clock, TickClock, TimePoint};
use robot_core::config::RobotConfig;
use robot_core::console::{self, ConsoleCommand};
use robot_core::encoder::{EncoderCounts, Side};
use robot_core::motor::NoopMotorDriver;
use robot_core::protocol::Reply;
use robot_core::robot::Robot;
use robot_core::sim::WheelPlant;
use robot_core::telemetry::{EventId, TelemetryEventKind};

/// Replies printed for one console line before the rest are summarized.
const MAX_REPLY_LINES: usize = 40;

/// Sense-pin reading of a charged pack (5.2 V behind the 2:1 divider).
const CHARGED_SENSE_VOLTS: f32 = 2.6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Drive,
    Schedule,
    Battery,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Drive => "transcripts/emulator-drive.log",
            TranscriptProfile::Schedule => "transcripts/emulator-schedule.log",
            TranscriptProfile::Battery => "transcripts/emulator-battery.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Drive => "Robot emulator drive transcript",
            TranscriptProfile::Schedule => "Robot emulator scheduling transcript",
            TranscriptProfile::Battery => "Robot emulator battery transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("drive") {
            Ok(Self::Drive)
        } else if tag.eq_ignore_ascii_case("schedule") {
            Ok(Self::Schedule)
        } else if tag.eq_ignore_ascii_case("battery") {
            Ok(Self::Battery)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }

    /// Sense voltage lost per battery sample; only the battery profile sags.
    fn sag_per_read(self) -> f32 {
        match self {
            TranscriptProfile::Battery => 0.000_2,
            TranscriptProfile::Drive | TranscriptProfile::Schedule => 0.0,
        }
    }
}

/// Battery sense line that loses a fixed amount per reading.
#[derive(Clone, Copy, Debug)]
pub struct SaggingBattery {
    volts: f32,
    sag_per_read: f32,
}

impl SaggingBattery {
    pub fn new(volts: f32, sag_per_read: f32) -> Self {
        Self {
            volts,
            sag_per_read,
        }
    }
}

impl BatterySensor for SaggingBattery {
    fn read_volts(&mut self) -> Option<f32> {
        let reading = self.volts;
        self.volts = (self.volts - self.sag_per_read).max(0.0);
        Some(reading)
    }
}

type SimRobot = Robot<'static, &'static TickClock, NoopMotorDriver, SaggingBattery>;

/// Simulated robot driven through the byte protocol from console lines.
pub struct Session {
    robot: SimRobot,
    clock: &'static TickClock,
    encoders: &'static EncoderCounts,
    plant: WheelPlant,
    transcript: TranscriptLogger,
    telemetry_cursor: EventId,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(profile)?;
        // The robot borrows both for its whole life, which is the process's.
        let clock: &'static TickClock = Box::leak(Box::new(TickClock::new()));
        let encoders: &'static EncoderCounts = Box::leak(Box::new(EncoderCounts::new()));

        let config = RobotConfig::DEFAULT;
        let battery = SaggingBattery::new(CHARGED_SENSE_VOLTS, profile.sag_per_read());
        let robot = Robot::new(config, clock, encoders, NoopMotorDriver, battery)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
        let plant = WheelPlant::new(&config);

        Ok(Self {
            telemetry_cursor: robot.telemetry().next_event_id(),
            robot,
            clock,
            encoders,
            plant,
            transcript,
        })
    }

    pub fn position(&self, side: Side) -> f32 {
        self.plant.position(side)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.elapsed();
        self.transcript
            .append_line(elapsed, TranscriptRole::Host, trimmed)?;

        let lines = match console::parse(trimmed) {
            Ok(ConsoleCommand::Send(command)) => {
                let bytes = command.encode();
                let mut lines = vec![format!("sent {}", hex(&bytes))];
                let mut replies = Vec::new();
                self.robot.receive(&bytes, &mut replies);
                // One loop iteration so one-shot requests answer right away.
                lines.extend(self.run_for(1, replies));
                lines
            }
            Ok(ConsoleCommand::Wait(duration)) => {
                let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
                let mut lines = self.run_for(millis, Vec::new());
                lines.push(format!(
                    "waited {millis} ms; wheels L={:.4}m R={:.4}m",
                    self.plant.position(Side::Left),
                    self.plant.position(Side::Right),
                ));
                lines
            }
            Ok(ConsoleCommand::Help(topic)) => {
                let mut text = String::new();
                // Writing into a String cannot fail.
                let _ = console::write_help(&mut text, topic);
                text.lines().map(str::to_string).collect()
            }
            Err(err) => vec![format!("ERR {err}")],
        };

        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    /// Runs `millis` loop iterations with the plant attached; `replies`
    /// holds output already produced by the dispatcher.
    fn run_for(&mut self, millis: u32, mut replies: Vec<Reply>) -> Vec<String> {
        let mut lines = Vec::new();
        let mut omitted = 0usize;
        let mut emit = |now: TimePoint, text: String| {
            if lines.len() < MAX_REPLY_LINES {
                lines.push(format!("{:>8.3}s {text}", now.seconds_since(TimePoint::ZERO)));
            } else {
                omitted += 1;
            }
        };

        for _ in 0..millis {
            self.robot.poll(&mut replies);
            let now = self.clock.now();
            for reply in replies.drain(..) {
                emit(now, reply.to_string());
            }

            let telemetry = self.robot.telemetry();
            for record in telemetry.records_since(self.telemetry_cursor) {
                if !matches!(record.event, TelemetryEventKind::FlagFired(_)) {
                    emit(record.timestamp, format!("~ {}", record.event));
                }
            }
            self.telemetry_cursor = telemetry.next_event_id();

            let motors = self.robot.motors();
            self.plant
                .step(self.encoders, motors.duties(), motors.is_enabled());
            self.clock.tick();
        }

        if omitted > 0 {
            lines.push(format!("... {omitted} more line(s)"));
        }
        lines
    }

    /// Simulated time since the session started.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(u64::from(self.clock.now().millis()))
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(elapsed, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() * 3);
    for (index, byte) in bytes.iter().enumerate() {
        if index > 0 {
            text.push(' ');
        }
        let _ = write!(text, "{byte:02x}");
    }
    text
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds of simulated robot time"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
