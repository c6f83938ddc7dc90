//! Telemetry event catalog and the bounded recorder shared by firmware and host.
//!
//! The main loop records what it does (flags firing, motion modes starting and
//! finishing, motor enable changes, battery warnings, rejected commands) into a
//! fixed-size history. Firmware drains new records to defmt; the emulator prints
//! them into its transcript. Event kinds encode to compact numeric codes so they
//! can travel over diagnostics channels without the payload.

use core::{convert::TryFrom, fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::robot::{ModeOutcome, MotionMode};
use crate::scheduler::TaskId;

/// Monotonic identifier assigned to each record; wraps.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    FlagFired(TaskId),
    ModeStarted(MotionMode),
    ModeFinished(MotionMode),
    MotorsEnabled,
    MotorsDisabled,
    BatteryLow,
    PowerOff,
    UnknownCommand(u8),
    Restart,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::FlagFired(task) => write!(f, "flag-fired {task}"),
            TelemetryEventKind::ModeStarted(mode) => write!(f, "mode-started {mode}"),
            TelemetryEventKind::ModeFinished(mode) => write!(f, "mode-finished {mode}"),
            TelemetryEventKind::MotorsEnabled => f.write_str("motors-enabled"),
            TelemetryEventKind::MotorsDisabled => f.write_str("motors-disabled"),
            TelemetryEventKind::BatteryLow => f.write_str("battery-low"),
            TelemetryEventKind::PowerOff => f.write_str("power-off"),
            TelemetryEventKind::UnknownCommand(byte) => write!(f, "unknown-command 0x{byte:02x}"),
            TelemetryEventKind::Restart => f.write_str("restart"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const FLAG_FIRED_BASE: u16 = 0x0000;
    const MODE_STARTED_BASE: u16 = 0x0010;
    const MODE_FINISHED_BASE: u16 = 0x0014;
    const MOTORS_ENABLED_CODE: u16 = 0x0018;
    const MOTORS_DISABLED_CODE: u16 = 0x0019;
    const BATTERY_LOW_CODE: u16 = 0x001A;
    const POWER_OFF_CODE: u16 = 0x001B;
    const RESTART_CODE: u16 = 0x001C;
    const UNKNOWN_COMMAND_BASE: u16 = 0x0100;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::FlagFired(task) => Self::FLAG_FIRED_BASE + task.index() as u16,
            TelemetryEventKind::ModeStarted(mode) => Self::MODE_STARTED_BASE + mode.index(),
            TelemetryEventKind::ModeFinished(mode) => Self::MODE_FINISHED_BASE + mode.index(),
            TelemetryEventKind::MotorsEnabled => Self::MOTORS_ENABLED_CODE,
            TelemetryEventKind::MotorsDisabled => Self::MOTORS_DISABLED_CODE,
            TelemetryEventKind::BatteryLow => Self::BATTERY_LOW_CODE,
            TelemetryEventKind::PowerOff => Self::POWER_OFF_CODE,
            TelemetryEventKind::Restart => Self::RESTART_CODE,
            TelemetryEventKind::UnknownCommand(byte) => Self::UNKNOWN_COMMAND_BASE + byte as u16,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant into a telemetry event, falling back to [`Custom`].
    ///
    /// [`Custom`]: TelemetryEventKind::Custom
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        match code {
            Self::MOTORS_ENABLED_CODE => TelemetryEventKind::MotorsEnabled,
            Self::MOTORS_DISABLED_CODE => TelemetryEventKind::MotorsDisabled,
            Self::BATTERY_LOW_CODE => TelemetryEventKind::BatteryLow,
            Self::POWER_OFF_CODE => TelemetryEventKind::PowerOff,
            Self::RESTART_CODE => TelemetryEventKind::Restart,
            value if (Self::FLAG_FIRED_BASE..Self::MODE_STARTED_BASE).contains(&value) => {
                TaskId::from_index(usize::from(value - Self::FLAG_FIRED_BASE))
                    .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::FlagFired)
            }
            value if (Self::MODE_STARTED_BASE..Self::MODE_FINISHED_BASE).contains(&value) => {
                MotionMode::from_index(value - Self::MODE_STARTED_BASE)
                    .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::ModeStarted)
            }
            value if (Self::MODE_FINISHED_BASE..Self::MOTORS_ENABLED_CODE).contains(&value) => {
                MotionMode::from_index(value - Self::MODE_FINISHED_BASE)
                    .map_or(TelemetryEventKind::Custom(value), TelemetryEventKind::ModeFinished)
            }
            value
                if (Self::UNKNOWN_COMMAND_BASE..Self::UNKNOWN_COMMAND_BASE + 0x100)
                    .contains(&value) =>
            {
                u8::try_from(value - Self::UNKNOWN_COMMAND_BASE)
                    .map_or(TelemetryEventKind::Custom(value), |byte| {
                        TelemetryEventKind::UnknownCommand(byte)
                    })
            }
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Duties applied when the motors changed state.
    Motors(MotorTelemetry),
    /// Summary of a motion mode run.
    Mode(ModeTelemetry),
    /// Filtered pack voltage behind a battery warning.
    Battery(BatteryTelemetry),
}

impl TelemetryPayload {
    /// Convenience constructor when no payload data is needed.
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MotorTelemetry {
    pub left: i16,
    pub right: i16,
}

impl MotorTelemetry {
    #[must_use]
    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }
}

/// Motion mode summary payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModeTelemetry {
    pub outcome: Option<ModeOutcome>,
    pub duration: Option<Duration>,
    pub updates: u16,
}

impl ModeTelemetry {
    #[must_use]
    pub const fn new(
        outcome: Option<ModeOutcome>,
        duration: Option<Duration>,
        updates: u16,
    ) -> Self {
        Self {
            outcome,
            duration,
            updates,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BatteryTelemetry {
    pub millivolts: u16,
}

impl BatteryTelemetry {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_volts(volts: f32) -> Self {
        // Saturating cast; negative and NaN readings record as zero.
        Self {
            millivolts: (volts * 1_000.0) as u16,
        }
    }
}

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    mode_started_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            mode_started_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier the next record will receive; use as a drain cursor.
    pub fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Records with an id at or after `cursor`, oldest first.
    ///
    /// Records already overwritten by newer ones are silently skipped.
    pub fn records_since(
        &self,
        cursor: EventId,
    ) -> impl Iterator<Item = &TelemetryRecord<TInstant>> + '_ {
        let pending = self.next_event_id.wrapping_sub(cursor);
        self.ring
            .oldest_ordered()
            .filter(move |record| self.next_event_id.wrapping_sub(record.id) <= pending)
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }

    pub fn record_flag_fired(&mut self, task: TaskId, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::FlagFired(task),
            TelemetryPayload::none(),
            timestamp,
        )
    }

    /// Records the start of a motion mode and remembers when it began.
    pub fn record_mode_started(&mut self, mode: MotionMode, timestamp: TInstant) -> EventId {
        self.mode_started_at = Some(timestamp);
        self.record(
            TelemetryEventKind::ModeStarted(mode),
            TelemetryPayload::Mode(ModeTelemetry::new(None, None, 0)),
            timestamp,
        )
    }

    /// Records the end of a motion mode with its run time when the start was seen.
    pub fn record_mode_finished(
        &mut self,
        mode: MotionMode,
        outcome: ModeOutcome,
        updates: usize,
        timestamp: TInstant,
    ) -> EventId {
        let duration = self
            .mode_started_at
            .take()
            .map(|start| timestamp.saturating_duration_since(start));
        let payload = TelemetryPayload::Mode(ModeTelemetry::new(
            Some(outcome),
            duration,
            truncate_count(updates),
        ));
        self.record(TelemetryEventKind::ModeFinished(mode), payload, timestamp)
    }

    pub fn record_motors(
        &mut self,
        enabled: bool,
        left: i16,
        right: i16,
        timestamp: TInstant,
    ) -> EventId {
        let event = if enabled {
            TelemetryEventKind::MotorsEnabled
        } else {
            TelemetryEventKind::MotorsDisabled
        };
        self.record(
            event,
            TelemetryPayload::Motors(MotorTelemetry::new(left, right)),
            timestamp,
        )
    }

    pub fn record_battery(&mut self, power_off: bool, volts: f32, timestamp: TInstant) -> EventId {
        let event = if power_off {
            TelemetryEventKind::PowerOff
        } else {
            TelemetryEventKind::BatteryLow
        };
        self.record(
            event,
            TelemetryPayload::Battery(BatteryTelemetry::from_volts(volts)),
            timestamp,
        )
    }

    /// Forgets every record; ids keep counting so drain cursors stay valid.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.mode_started_at = None;
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_count(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}
