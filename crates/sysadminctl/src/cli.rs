//! Command-line surface

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use sysadmin_common::{Direction, Protocol, RuleAction, ServiceAction};

#[derive(Parser, Debug)]
#[command(name = "sysadminctl")]
#[command(about = "Guarded administration of the local Linux host", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: $LINUX_SYSADMIN_CONFIG or ~/.config/linux-sysadmin/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the detected distro context
    Detect,

    /// Show session state: distro, sudo, config, knowledge summary
    Session,

    /// Show knowledge profiles (active ones by default)
    Knowledge {
        /// Include inactive profiles
        #[arg(long)]
        all: bool,

        /// Show one profile by id
        id: Option<String>,
    },

    /// Package management
    #[command(subcommand)]
    Pkg(PkgCommand),

    /// Service control
    Svc(SvcArgs),

    /// Firewall management
    #[command(subcommand)]
    Fw(FwCommand),

    /// User account management
    #[command(subcommand)]
    User(UserCommand),
}

/// Flags every state-changing subcommand accepts
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Guard {
    /// Execute without asking for confirmation
    #[arg(long)]
    pub confirmed: bool,

    /// Preview instead of executing
    #[arg(long)]
    pub dry_run: bool,
}

// =============================================================================
// Packages
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum PkgCommand {
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
        #[command(flatten)]
        guard: Guard,
    },
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
        #[command(flatten)]
        guard: Guard,
    },
    /// Remove packages and their configuration
    Purge {
        #[arg(required = true)]
        packages: Vec<String>,
        #[command(flatten)]
        guard: Guard,
    },
    /// Upgrade named packages, or everything
    Update {
        packages: Vec<String>,
        #[command(flatten)]
        guard: Guard,
    },
    Search {
        query: String,
    },
    Info {
        package: String,
    },
    /// List installed packages
    List {
        filter: Option<String>,
    },
    CheckUpdates,
    History,
}

// =============================================================================
// Services
// =============================================================================

#[derive(Args, Debug)]
pub struct SvcArgs {
    pub action: SvcAction,
    pub unit: String,
    #[command(flatten)]
    pub guard: Guard,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvcAction {
    Start,
    Stop,
    Restart,
    Reload,
    Enable,
    Disable,
    Status,
}

impl SvcAction {
    /// None for the read-only status query
    pub fn control(self) -> Option<ServiceAction> {
        match self {
            SvcAction::Start => Some(ServiceAction::Start),
            SvcAction::Stop => Some(ServiceAction::Stop),
            SvcAction::Restart => Some(ServiceAction::Restart),
            SvcAction::Reload => Some(ServiceAction::Reload),
            SvcAction::Enable => Some(ServiceAction::Enable),
            SvcAction::Disable => Some(ServiceAction::Disable),
            SvcAction::Status => None,
        }
    }
}

// =============================================================================
// Firewall
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum FwCommand {
    Status,
    List,
    Add {
        #[command(flatten)]
        rule: RuleArgs,
        #[command(flatten)]
        guard: Guard,
    },
    Remove {
        #[command(flatten)]
        rule: RuleArgs,
        #[command(flatten)]
        guard: Guard,
    },
    Enable {
        #[command(flatten)]
        guard: Guard,
    },
    Disable {
        #[command(flatten)]
        guard: Guard,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RuleArgs {
    /// Port or range, e.g. 443 or 6000:6007
    pub port: String,
    #[arg(long, value_enum, default_value_t = CliRuleAction::Allow)]
    pub action: CliRuleAction,
    #[arg(long, value_enum, default_value_t = CliDirection::In)]
    pub direction: CliDirection,
    #[arg(long, value_enum, default_value_t = CliProtocol::Any)]
    pub protocol: CliProtocol,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub destination: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliRuleAction {
    Allow,
    Deny,
    Reject,
}

impl From<CliRuleAction> for RuleAction {
    fn from(a: CliRuleAction) -> Self {
        match a {
            CliRuleAction::Allow => RuleAction::Allow,
            CliRuleAction::Deny => RuleAction::Deny,
            CliRuleAction::Reject => RuleAction::Reject,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliDirection {
    In,
    Out,
}

impl From<CliDirection> for Direction {
    fn from(d: CliDirection) -> Self {
        match d {
            CliDirection::In => Direction::In,
            CliDirection::Out => Direction::Out,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliProtocol {
    Tcp,
    Udp,
    Any,
}

impl From<CliProtocol> for Protocol {
    fn from(p: CliProtocol) -> Self {
        match p {
            CliProtocol::Tcp => Protocol::Tcp,
            CliProtocol::Udp => Protocol::Udp,
            CliProtocol::Any => Protocol::Any,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Create {
        username: String,
        #[arg(long)]
        shell: Option<String>,
        #[arg(long)]
        home: Option<String>,
        /// Supplementary groups, comma separated
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
        #[arg(long)]
        system: bool,
        #[arg(long)]
        comment: Option<String>,
        #[command(flatten)]
        guard: Guard,
    },
    Delete {
        username: String,
        #[arg(long)]
        remove_home: bool,
        #[command(flatten)]
        guard: Guard,
    },
    Modify {
        username: String,
        #[arg(long)]
        shell: Option<String>,
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
        /// Replace supplementary groups instead of appending
        #[arg(long)]
        replace_groups: bool,
        #[arg(long, conflicts_with = "unlock")]
        lock: bool,
        #[arg(long)]
        unlock: bool,
        #[arg(long)]
        comment: Option<String>,
        #[command(flatten)]
        guard: Guard,
    },
}
