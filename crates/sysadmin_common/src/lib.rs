//! sysadmin_common - guarded command execution for Linux host administration
//!
//! Abstract intents (install a package, restart a service, open a port,
//! create a user) become concrete argument vectors for the detected distro
//! family. A safety gate decides for each state-changing call whether it
//! runs, needs explicit confirmation, or is refused.

pub mod command;
pub mod config;
pub mod context;
pub mod distro;
pub mod errors;
pub mod executor;
pub mod knowledge;
pub mod logging;
pub mod response;
pub mod risk;
pub mod safety;
pub mod tools;
pub mod units;

pub use command::{
    Command, Direction, FirewallRule, Protocol, RuleAction, ServiceAction, UserCreateParams,
    UserModifyParams,
};
pub use config::{LoadedConfig, SafetyConfig, SysadminConfig};
pub use context::{HostFacts, SessionInfo, SysadminContext};
pub use distro::{
    create_distro_commands, detect, verify_sudo, DistroCommands, DistroContext, DistroFamily,
    DistroOverrides,
};
pub use errors::{ConfigError, ExecError, StartupError};
pub use executor::{ExecResult, Executor, LocalExecutor};
pub use knowledge::{
    load_knowledge_base, Escalation, KnowledgeBase, KnowledgeProfile, LoadError, LoadOptions,
    ProfileStatus, ResolvedProfile,
};
pub use response::{ErrorCategory, Preview, ToolResponse};
pub use risk::{DurationCategory, RiskLevel};
pub use safety::{GateDecision, GateRequest, SafetyGate};
pub use tools::{DryRunMode, ToolRequest, ToolRunner, ToolSpec, TOOL_CATALOG};
