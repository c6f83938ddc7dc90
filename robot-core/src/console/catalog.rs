//! Console command table shared by the parser and the help output.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Restart,
    Add,
    Sub,
    Mul,
    Div,
    Time,
    Encoder,
    Battery,
    Pwm,
    Stop,
    Info,
    Distance,
    Velocity,
    Wait,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "restart",
        tag: CommandTag::Restart,
        usage: "restart",
        summary: "stop everything and clear all schedules",
    },
    CommandSpec {
        name: "add",
        tag: CommandTag::Add,
        usage: "add <a> <b>",
        summary: "echo a + b",
    },
    CommandSpec {
        name: "sub",
        tag: CommandTag::Sub,
        usage: "sub <a> <b>",
        summary: "echo a - b",
    },
    CommandSpec {
        name: "mul",
        tag: CommandTag::Mul,
        usage: "mul <a> <b>",
        summary: "echo a * b",
    },
    CommandSpec {
        name: "div",
        tag: CommandTag::Div,
        usage: "div <a> <b>",
        summary: "echo a / b",
    },
    CommandSpec {
        name: "time",
        tag: CommandTag::Time,
        usage: "time [now|loop|float] | time every <duration> [now|loop|float] | time cancel",
        summary: "report the clock, loop period or float send time",
    },
    CommandSpec {
        name: "encoder",
        tag: CommandTag::Encoder,
        usage: "encoder [every <duration>|cancel]",
        summary: "report wheel angles in radians",
    },
    CommandSpec {
        name: "battery",
        tag: CommandTag::Battery,
        usage: "battery [every <duration>|cancel]",
        summary: "report the filtered pack voltage",
    },
    CommandSpec {
        name: "pwm",
        tag: CommandTag::Pwm,
        usage: "pwm <left> <right> [for <duration>]",
        summary: "apply raw motor duties",
    },
    CommandSpec {
        name: "stop",
        tag: CommandTag::Stop,
        usage: "stop",
        summary: "stop the motors and any motion mode",
    },
    CommandSpec {
        name: "info",
        tag: CommandTag::Info,
        usage: "info [every <duration>|cancel]",
        summary: "report time, duties and encoder counts",
    },
    CommandSpec {
        name: "distance",
        tag: CommandTag::Distance,
        usage: "distance <metres> <radians> [for <duration>]",
        summary: "drive a distance and rotation under closed loop",
    },
    CommandSpec {
        name: "velocity",
        tag: CommandTag::Velocity,
        usage: "velocity <m/s> <rad/s> [for <duration>]",
        summary: "drive at a linear and angular speed under closed loop",
    },
    CommandSpec {
        name: "wait",
        tag: CommandTag::Wait,
        usage: "wait <duration>",
        summary: "let the robot run before the next command",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        usage: "help [command]",
        summary: "list commands or show one command's usage",
    },
];

/// Looks up a command by name, ignoring ASCII case.
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|spec| spec.name.eq_ignore_ascii_case(name))
}

#[must_use]
pub fn spec(tag: CommandTag) -> &'static CommandSpec {
    // Every tag has exactly one table entry; the fallback is the help entry.
    COMMANDS
        .iter()
        .find(|spec| spec.tag == tag)
        .unwrap_or(&COMMANDS[COMMANDS.len() - 1])
}
