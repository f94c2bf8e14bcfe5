//! Distro context - what kind of host we are administering
//!
//! Populated once at startup by the detector, optionally overridden by
//! configuration, then shared read-only with every component.

pub mod commands;
pub mod detector;

pub use commands::{create_distro_commands, DebianCommands, DistroCommands, RhelCommands};
pub use detector::{detect, detect_with, verify_sudo, HostProbe, SystemProbe};

use serde::{Deserialize, Serialize};

/// Distribution family sharing a package manager and command set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    Debian,
    Rhel,
}

impl DistroFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistroFamily::Debian => "debian",
            DistroFamily::Rhel => "rhel",
        }
    }

    pub fn package_manager(&self) -> PackageManager {
        match self {
            DistroFamily::Debian => PackageManager::Apt,
            DistroFamily::Rhel => PackageManager::Dnf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Dnf,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
        }
    }
}

/// Only systemd hosts are supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitSystem {
    Systemd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallBackend {
    Ufw,
    Firewalld,
    Nftables,
    None,
}

/// Mandatory access control system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacSystem {
    Apparmor,
    Selinux,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacMode {
    Enforcing,
    Permissive,
    Complaining,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Podman,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSystem {
    Journald,
    Rsyslog,
    Both,
}

/// Preferred user management commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserManagement {
    Adduser,
    Useradd,
}

/// Runtime description of the managed host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroContext {
    pub family: DistroFamily,
    pub name: String,
    pub version: String,
    pub codename: Option<String>,
    pub package_manager: PackageManager,
    pub init_system: InitSystem,
    pub firewall_backend: FirewallBackend,
    pub mac_system: MacSystem,
    pub mac_mode: Option<MacMode>,
    pub container_runtime: ContainerRuntime,
    pub log_system: LogSystem,
    pub user_management: UserManagement,
}

impl DistroContext {
    /// Safe context for a host nothing could be learned about
    pub fn fallback() -> Self {
        Self {
            family: DistroFamily::Debian,
            name: "Unknown".to_string(),
            version: "unknown".to_string(),
            codename: None,
            package_manager: PackageManager::Apt,
            init_system: InitSystem::Systemd,
            firewall_backend: FirewallBackend::None,
            mac_system: MacSystem::None,
            mac_mode: None,
            container_runtime: ContainerRuntime::None,
            log_system: LogSystem::Journald,
            user_management: UserManagement::Useradd,
        }
    }
}

/// Config-supplied replacements; only fields that are set are applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistroOverrides {
    pub family: Option<DistroFamily>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub codename: Option<String>,
    pub package_manager: Option<PackageManager>,
    pub firewall_backend: Option<FirewallBackend>,
    pub mac_system: Option<MacSystem>,
    pub mac_mode: Option<MacMode>,
    pub container_runtime: Option<ContainerRuntime>,
    pub log_system: Option<LogSystem>,
    pub user_management: Option<UserManagement>,
}

impl DistroOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply set fields over a detected context
    pub fn apply(&self, mut ctx: DistroContext) -> DistroContext {
        if let Some(family) = self.family {
            ctx.family = family;
            // A family override without an explicit package manager implies it
            if self.package_manager.is_none() {
                ctx.package_manager = family.package_manager();
            }
        }
        if let Some(name) = &self.name {
            ctx.name = name.clone();
        }
        if let Some(version) = &self.version {
            ctx.version = version.clone();
        }
        if let Some(codename) = &self.codename {
            ctx.codename = Some(codename.clone());
        }
        if let Some(pm) = self.package_manager {
            ctx.package_manager = pm;
        }
        if let Some(fw) = self.firewall_backend {
            ctx.firewall_backend = fw;
        }
        if let Some(mac) = self.mac_system {
            ctx.mac_system = mac;
        }
        if let Some(mode) = self.mac_mode {
            ctx.mac_mode = Some(mode);
        }
        if let Some(runtime) = self.container_runtime {
            ctx.container_runtime = runtime;
        }
        if let Some(logs) = self.log_system {
            ctx.log_system = logs;
        }
        if let Some(users) = self.user_management {
            ctx.user_management = users;
        }
        ctx
    }
}
