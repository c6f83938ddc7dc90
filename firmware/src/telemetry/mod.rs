//! Telemetry log sink.
//!
//! The control loop owns the telemetry ring; after every iteration it walks the
//! records added since its cursor and hands each one to [`log_record`]. On the
//! target lines go out over defmt-rtt, on the host they go to stdout.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::Write;

use robot_core::clock::TimePoint;
use robot_core::telemetry::{TelemetryEventKind, TelemetryPayload, TelemetryRecord};

/// Longest rendered telemetry line; longer lines are truncated.
pub const LOG_LINE_LEN: usize = 96;

pub type LogLine = heapless::String<LOG_LINE_LEN>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Per-iteration noise such as flag firings.
    Trace,
    Info,
    Warn,
}

pub const fn severity(event: TelemetryEventKind) -> Severity {
    match event {
        TelemetryEventKind::FlagFired(_) => Severity::Trace,
        TelemetryEventKind::BatteryLow
        | TelemetryEventKind::PowerOff
        | TelemetryEventKind::UnknownCommand(_) => Severity::Warn,
        _ => Severity::Info,
    }
}

/// Renders one record as `#id t=seconds event details`.
pub fn describe(record: &TelemetryRecord<TimePoint>) -> LogLine {
    let mut line = LogLine::new();
    let seconds = record.timestamp.seconds_since(TimePoint::ZERO);
    // Overflow only truncates the line.
    let _ = write!(line, "#{} t={seconds:.3}s {}", record.id, record.event);
    let _ = match record.details {
        TelemetryPayload::None => Ok(()),
        TelemetryPayload::Motors(motors) => {
            write!(line, " pwm={}/{}", motors.left, motors.right)
        }
        TelemetryPayload::Mode(mode) => {
            if let Some(outcome) = mode.outcome {
                let _ = write!(line, " {outcome}");
            }
            if let Some(duration) = mode.duration {
                let _ = write!(line, " after={}ms", duration.as_millis());
            }
            write!(line, " updates={}", mode.updates)
        }
        TelemetryPayload::Battery(battery) => write!(line, " {}mV", battery.millivolts),
    };
    line
}

pub fn log_record(record: &TelemetryRecord<TimePoint>) {
    emit_log(severity(record.event), &describe(record));
}

/// Logs how many reply frames were lost since the previous report.
pub fn log_dropped_frames(count: u32) {
    let mut line = LogLine::new();
    let _ = write!(line, "link dropped {count} reply frame(s)");
    emit_log(Severity::Warn, &line);
}

#[cfg(target_os = "none")]
fn emit_log(severity: Severity, line: &str) {
    match severity {
        Severity::Trace => defmt::trace!("telemetry {}", line),
        Severity::Info => defmt::info!("telemetry {}", line),
        Severity::Warn => defmt::warn!("telemetry {}", line),
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(severity: Severity, line: &str) {
    match severity {
        Severity::Trace => {}
        Severity::Info => println!("telemetry {line}"),
        Severity::Warn => println!("telemetry warn {line}"),
    }
}
