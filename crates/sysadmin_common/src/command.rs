//! Command - a structured invocation ready for the executor
//!
//! Tool code never builds shell strings. Distro command sets produce `Command`
//! values (an argv, optional env and stdin) and the executor runs argv[0]
//! directly without a shell.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One invocation: program + arguments, never a shell string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// argv[0] is the program, the rest are its arguments
    pub argv: Vec<String>,

    /// Extra environment merged over the inherited environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Data written to the child's stdin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,

    /// Run only if this command exits 0 (e.g. firewall-cmd --reload)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and_then: Option<Box<Command>>,
}

impl Command {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            stdin: None,
            and_then: None,
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Chain a follow-up command, appended after any existing chain
    pub fn and_then(mut self, next: Command) -> Self {
        match self.and_then.take() {
            Some(existing) => self.and_then = Some(Box::new(existing.and_then(next))),
            None => self.and_then = Some(Box::new(next)),
        }
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    /// Iterate this command and every chained follow-up in order
    pub fn chain(&self) -> impl Iterator<Item = &Command> {
        std::iter::successors(Some(self), |c| c.and_then.as_deref())
    }

    /// Human/shell-readable rendering used in previews and escalation matching
    pub fn render(&self) -> String {
        self.chain()
            .map(|c| {
                c.argv
                    .iter()
                    .map(|a| quote_arg(a))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Single-quote an argument only when it would otherwise be ambiguous
fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+${}\\".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// =============================================================================
// Typed parameters
// =============================================================================

/// Firewall rule action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
    Reject,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Deny => "deny",
            RuleAction::Reject => "reject",
        }
    }
}

/// Traffic direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    #[default]
    Any,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Any => "any",
        }
    }
}

/// Unified firewall rule, rendered per backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub action: RuleAction,
    pub direction: Direction,
    /// Single port or a range such as "6000:6007"
    pub port: String,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FirewallRule {
    pub fn allow_in(port: impl Into<String>) -> Self {
        Self {
            action: RuleAction::Allow,
            direction: Direction::In,
            port: port.into(),
            protocol: Protocol::Any,
            source: None,
            destination: None,
            comment: None,
        }
    }
}

/// User creation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreateParams {
    pub username: String,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// User modification parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModifyParams {
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Append to supplementary groups instead of replacing them
    #[serde(default = "default_true")]
    pub append_groups: bool,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub unlock: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for UserModifyParams {
    fn default() -> Self {
        Self {
            shell: None,
            groups: Vec::new(),
            append_groups: true,
            lock: false,
            unlock: false,
            comment: None,
        }
    }
}

/// systemd unit control action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Reload,
    Enable,
    Disable,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Reload => "reload",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
