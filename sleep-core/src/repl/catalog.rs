//! Operator console command catalog.
//!
//! The parser and the `help` command read the same table, so keywords,
//! argument shapes, and usage strings cannot drift apart.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Sleep,
    Action,
    Minutes,
    Status,
    Events,
    Help,
    Advance,
    Context,
    Extend,
    Retract,
    Mobile,
    Break,
    Repair,
}

/// Shape of the single argument a command accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgSpec {
    None,
    /// Decimal number, required.
    Number,
    /// Duration literal (`250ms`, `30s`, `1.5m`) or bare seconds, required.
    Duration,
    /// One keyword out of a fixed set, required.
    Choice(&'static [&'static str]),
    /// Optional free identifier.
    Topic,
}

/// Which console audience a command belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// Mirrors a control the host exposes to players.
    Operator,
    /// Drives the simulated actuator, clock, or context.
    Rig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub arg: ArgSpec,
    pub audience: Audience,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const CONTEXT_CHOICES: [&str; 3] = ["editor", "flight", "other"];
pub const TOGGLE_CHOICES: [&str; 2] = ["on", "off"];
pub const ACTION_CHOICES: [&str; 1] = ["sleep"];

const COMMANDS: [CommandSpec; 13] = [
    CommandSpec {
        name: "sleep",
        tag: CommandTag::Sleep,
        arg: ArgSpec::None,
        audience: Audience::Operator,
        usage: "sleep",
        summary: "retract and arm the wake timer",
    },
    CommandSpec {
        name: "action",
        tag: CommandTag::Action,
        arg: ArgSpec::Choice(&ACTION_CHOICES),
        audience: Audience::Operator,
        usage: "action <sleep>",
        summary: "fire the bindable sleep action",
    },
    CommandSpec {
        name: "minutes",
        tag: CommandTag::Minutes,
        arg: ArgSpec::Number,
        audience: Audience::Operator,
        usage: "minutes <0.5-20>",
        summary: "set the sleep duration in half-minute steps",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        arg: ArgSpec::None,
        audience: Audience::Operator,
        usage: "status",
        summary: "show timer, actuator, and control state",
    },
    CommandSpec {
        name: "events",
        tag: CommandTag::Events,
        arg: ArgSpec::None,
        audience: Audience::Operator,
        usage: "events",
        summary: "list recent scheduler events",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        arg: ArgSpec::Topic,
        audience: Audience::Operator,
        usage: "help [command]",
        summary: "describe commands",
    },
    CommandSpec {
        name: "advance",
        tag: CommandTag::Advance,
        arg: ArgSpec::Duration,
        audience: Audience::Rig,
        usage: "advance <duration>",
        summary: "move the clock forward, ticking once per second",
    },
    CommandSpec {
        name: "context",
        tag: CommandTag::Context,
        arg: ArgSpec::Choice(&CONTEXT_CHOICES),
        audience: Audience::Rig,
        usage: "context <editor|flight|other>",
        summary: "switch the execution context",
    },
    CommandSpec {
        name: "extend",
        tag: CommandTag::Extend,
        arg: ArgSpec::None,
        audience: Audience::Rig,
        usage: "extend",
        summary: "extend the actuator by hand",
    },
    CommandSpec {
        name: "retract",
        tag: CommandTag::Retract,
        arg: ArgSpec::None,
        audience: Audience::Rig,
        usage: "retract",
        summary: "retract the actuator by hand",
    },
    CommandSpec {
        name: "mobile",
        tag: CommandTag::Mobile,
        arg: ArgSpec::Choice(&TOGGLE_CHOICES),
        audience: Audience::Rig,
        usage: "mobile <on|off>",
        summary: "allow or block actuator motion",
    },
    CommandSpec {
        name: "break",
        tag: CommandTag::Break,
        arg: ArgSpec::None,
        audience: Audience::Rig,
        usage: "break",
        summary: "break the actuator",
    },
    CommandSpec {
        name: "repair",
        tag: CommandTag::Repair,
        arg: ArgSpec::None,
        audience: Audience::Rig,
        usage: "repair",
        summary: "repair a broken actuator, leaving it retracted",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}
