//! Cooperative "message flag" scheduler.
//!
//! Each [`TaskId`] owns one [`MessageFlag`]. The command dispatcher arms flags;
//! the main loop asks [`MessageFlags::should_execute`] for each task in
//! declaration order, runs the task body, then calls
//! [`MessageFlags::mark_fired`]. A flag with a non-positive duration is a
//! one-shot and returns to idle once fired; a positive duration re-arms the
//! flag relative to the time it fired.
//!
//! Dispatcher and loop run in the same execution context, so the flags need no
//! synchronization; ownership of the [`MessageFlags`] value is the lock.

use core::fmt;
use core::time::Duration;

use crate::clock::TimePoint;

/// Schedulable tasks, in main-loop poll order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskId {
    Restart,
    SendTime,
    LoopTimer,
    TimeFloatSend,
    SendEncoder,
    SendVoltage,
    SetPwm,
    StopPwm,
    SendSysInfo,
    DistanceMode,
    VelocityMode,
}

impl TaskId {
    pub const COUNT: usize = 11;

    /// Every task in poll order.
    pub const ALL: [TaskId; Self::COUNT] = [
        TaskId::Restart,
        TaskId::SendTime,
        TaskId::LoopTimer,
        TaskId::TimeFloatSend,
        TaskId::SendEncoder,
        TaskId::SendVoltage,
        TaskId::SetPwm,
        TaskId::StopPwm,
        TaskId::SendSysInfo,
        TaskId::DistanceMode,
        TaskId::VelocityMode,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TaskId::Restart => "restart",
            TaskId::SendTime => "send-time",
            TaskId::LoopTimer => "loop-timer",
            TaskId::TimeFloatSend => "time-float-send",
            TaskId::SendEncoder => "send-encoder",
            TaskId::SendVoltage => "send-voltage",
            TaskId::SetPwm => "set-pwm",
            TaskId::StopPwm => "stop-pwm",
            TaskId::SendSysInfo => "send-sys-info",
            TaskId::DistanceMode => "distance-mode",
            TaskId::VelocityMode => "velocity-mode",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observable flag state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagState {
    Idle,
    OneShot,
    Repeating,
}

/// Scheduling record for one task.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MessageFlag {
    pub active: bool,
    /// Seconds between firings; non-positive means one-shot.
    pub duration: f32,
    pub last_trigger: TimePoint,
    /// Command byte that armed the flag, echoed in replies.
    pub command: u8,
    pub subcommand: u8,
}

impl MessageFlag {
    pub const IDLE: Self = Self {
        active: false,
        duration: -1.0,
        last_trigger: TimePoint::ZERO,
        command: 0,
        subcommand: 0,
    };

    /// `true` when the flag is armed and its period has elapsed at `now`.
    #[must_use]
    pub fn execute(&self, now: TimePoint) -> bool {
        self.active && now.seconds_since(self.last_trigger) >= self.duration
    }

    #[must_use]
    pub fn state(&self) -> FlagState {
        match (self.active, self.duration > 0.0) {
            (false, _) => FlagState::Idle,
            (true, false) => FlagState::OneShot,
            (true, true) => FlagState::Repeating,
        }
    }

    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.state() == FlagState::Repeating
    }
}

impl Default for MessageFlag {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Flag table for every [`TaskId`].
#[derive(Clone, Debug)]
pub struct MessageFlags {
    flags: [MessageFlag; TaskId::COUNT],
}

impl MessageFlags {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: [MessageFlag::IDLE; TaskId::COUNT],
        }
    }

    #[must_use]
    pub fn get(&self, id: TaskId) -> &MessageFlag {
        &self.flags[id.index()]
    }

    pub fn get_mut(&mut self, id: TaskId) -> &mut MessageFlag {
        &mut self.flags[id.index()]
    }

    #[must_use]
    pub fn state(&self, id: TaskId) -> FlagState {
        self.get(id).state()
    }

    #[must_use]
    pub fn is_active(&self, id: TaskId) -> bool {
        self.get(id).active
    }

    /// Arms `id` to run once on the next poll.
    pub fn arm_once(&mut self, id: TaskId, command: u8, subcommand: u8) {
        *self.get_mut(id) = MessageFlag {
            active: true,
            command,
            subcommand,
            ..MessageFlag::IDLE
        };
    }

    /// Arms `id` to run now and then every `seconds`; non-positive periods cancel.
    pub fn arm_repeating(
        &mut self,
        id: TaskId,
        now: TimePoint,
        seconds: f32,
        command: u8,
        subcommand: u8,
    ) {
        if seconds <= 0.0 || seconds.is_nan() {
            self.cancel(id);
            return;
        }

        // Back-date the trigger so the first firing happens on the next poll.
        let last_trigger = Duration::try_from_secs_f32(seconds).map_or(now, |period| {
            now.rewind_by(period.saturating_add(Duration::from_micros(1)))
        });
        *self.get_mut(id) = MessageFlag {
            active: true,
            duration: seconds,
            last_trigger,
            command,
            subcommand,
        };
    }

    /// Arms `id` to run once after `seconds` have elapsed from `now`.
    pub fn arm_deadline(&mut self, id: TaskId, now: TimePoint, seconds: f32, command: u8) {
        *self.get_mut(id) = MessageFlag {
            active: true,
            duration: seconds.max(0.0),
            last_trigger: now,
            command,
            subcommand: 0,
        };
    }

    /// Returns `id` to idle defaults. Cancelling an idle flag is a no-op.
    pub fn cancel(&mut self, id: TaskId) {
        *self.get_mut(id) = MessageFlag::IDLE;
    }

    /// Returns every flag to idle defaults.
    pub fn reset(&mut self) {
        self.flags = [MessageFlag::IDLE; TaskId::COUNT];
    }

    #[must_use]
    pub fn should_execute(&self, id: TaskId, now: TimePoint) -> bool {
        self.get(id).execute(now)
    }

    /// Records a firing: one-shots go idle, repeating flags restart their period.
    pub fn mark_fired(&mut self, id: TaskId, now: TimePoint) {
        let flag = self.get_mut(id);
        if flag.is_repeating() {
            flag.last_trigger = now;
        } else {
            *flag = MessageFlag::IDLE;
        }
    }

    /// Tasks whose flags are due at `now`, in poll order.
    pub fn due(&self, now: TimePoint) -> impl Iterator<Item = TaskId> + '_ {
        TaskId::ALL
            .into_iter()
            .filter(move |id| self.should_execute(*id, now))
    }
}

impl Default for MessageFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: u32) -> TimePoint {
        TimePoint::from_millis(millis)
    }

    #[test]
    fn defaults_are_idle() {
        let flags = MessageFlags::new();
        for id in TaskId::ALL {
            let flag = flags.get(id);
            assert!(!flag.active);
            assert_eq!(flag.duration, -1.0);
            assert_eq!(flag.last_trigger, TimePoint::ZERO);
            assert!(!flags.should_execute(id, at(1_000)));
        }
    }

    #[test]
    fn one_shot_fires_once() {
        let mut flags = MessageFlags::new();
        flags.arm_once(TaskId::SendTime, b't', 0);
        assert_eq!(flags.state(TaskId::SendTime), FlagState::OneShot);
        assert!(flags.should_execute(TaskId::SendTime, at(0)));

        flags.mark_fired(TaskId::SendTime, at(0));
        assert_eq!(flags.state(TaskId::SendTime), FlagState::Idle);
        assert!(!flags.should_execute(TaskId::SendTime, at(10)));
    }

    #[test]
    fn repeating_flag_waits_for_period() {
        let mut flags = MessageFlags::new();
        flags.arm_repeating(TaskId::SendEncoder, at(0), 0.05, b'E', 0);

        assert!(flags.should_execute(TaskId::SendEncoder, at(0)));
        flags.mark_fired(TaskId::SendEncoder, at(0));

        for millis in [1, 10, 25, 49] {
            assert!(
                !flags.should_execute(TaskId::SendEncoder, at(millis)),
                "fired early at {millis} ms"
            );
        }
        assert!(flags.should_execute(TaskId::SendEncoder, at(50)));
        flags.mark_fired(TaskId::SendEncoder, at(50));
        assert_eq!(flags.state(TaskId::SendEncoder), FlagState::Repeating);
        assert!(!flags.should_execute(TaskId::SendEncoder, at(99)));
    }

    #[test]
    fn non_positive_period_cancels() {
        let mut flags = MessageFlags::new();
        flags.arm_repeating(TaskId::SendVoltage, at(5), 1.0, b'B', 0);
        assert!(flags.is_active(TaskId::SendVoltage));

        flags.arm_repeating(TaskId::SendVoltage, at(6), 0.0, b'B', 0);
        assert_eq!(*flags.get(TaskId::SendVoltage), MessageFlag::IDLE);

        flags.arm_repeating(TaskId::SendVoltage, at(7), -3.0, b'B', 0);
        assert_eq!(flags.state(TaskId::SendVoltage), FlagState::Idle);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut flags = MessageFlags::new();
        flags.arm_once(TaskId::StopPwm, b's', 0);
        flags.cancel(TaskId::StopPwm);
        flags.cancel(TaskId::StopPwm);
        assert_eq!(*flags.get(TaskId::StopPwm), MessageFlag::IDLE);
    }

    #[test]
    fn deadline_fires_after_duration() {
        let mut flags = MessageFlags::new();
        flags.arm_deadline(TaskId::StopPwm, at(100), 0.2, b'P');
        assert!(!flags.should_execute(TaskId::StopPwm, at(299)));
        assert!(flags.should_execute(TaskId::StopPwm, at(300)));
    }

    #[test]
    fn due_reports_poll_order() {
        let mut flags = MessageFlags::new();
        flags.arm_once(TaskId::VelocityMode, b'v', 0);
        flags.arm_once(TaskId::Restart, b'~', 0);
        flags.arm_once(TaskId::SendEncoder, b'e', 0);

        let mut due = flags.due(at(0));
        assert_eq!(due.next(), Some(TaskId::Restart));
        assert_eq!(due.next(), Some(TaskId::SendEncoder));
        assert_eq!(due.next(), Some(TaskId::VelocityMode));
        assert_eq!(due.next(), None);
    }

    #[test]
    fn reset_idles_every_flag() {
        let mut flags = MessageFlags::new();
        flags.arm_repeating(TaskId::SendSysInfo, at(0), 0.5, b'Q', 0);
        flags.arm_once(TaskId::SetPwm, b'p', 0);
        flags.reset();
        assert_eq!(flags.due(at(10_000)).count(), 0);
    }

    #[test]
    fn task_index_round_trips() {
        for (index, id) in TaskId::ALL.into_iter().enumerate() {
            assert_eq!(id.index(), index);
            assert_eq!(TaskId::from_index(index), Some(id));
        }
        assert_eq!(TaskId::from_index(TaskId::COUNT), None);
    }
}
