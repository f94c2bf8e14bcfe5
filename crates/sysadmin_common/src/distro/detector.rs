//! Distro detection
//!
//! Probes the host once at startup. Every probe fails soft: a missing binary
//! or unreadable file yields a safe default (`none` / `unknown`) and a log
//! line, never an error, so the rest of the system can start degraded.

use super::{
    ContainerRuntime, DistroContext, DistroFamily, DistroOverrides, FirewallBackend,
    InitSystem, LogSystem, MacMode, MacSystem, UserManagement,
};
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

const OS_RELEASE_PATH: &str = "/etc/os-release";

const DEBIAN_IDS: &[&str] = &["debian", "ubuntu"];
const DEBIAN_LIKE: &[&str] = &["debian", "ubuntu"];
const RHEL_IDS: &[&str] = &["fedora", "rhel", "centos", "rocky", "almalinux", "alma", "ol"];
const RHEL_LIKE: &[&str] = &["rhel", "fedora", "centos"];

// =============================================================================
// Host probe seam
// =============================================================================

/// Read-only view of the host used by detection
pub trait HostProbe {
    /// Contents of /etc/os-release, if readable
    fn os_release(&self) -> Option<String>;

    /// Whether a binary is on PATH
    fn command_exists(&self, cmd: &str) -> bool;

    fn path_exists(&self, path: &str) -> bool;

    /// Trimmed stdout of a successful command, None on any failure
    fn capture(&self, argv: &[&str]) -> Option<String>;
}

/// Probe backed by the real filesystem and PATH
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn os_release(&self) -> Option<String> {
        match std::fs::read_to_string(OS_RELEASE_PATH) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Could not read {}: {}", OS_RELEASE_PATH, e);
                None
            }
        }
    }

    fn command_exists(&self, cmd: &str) -> bool {
        which::which(cmd).is_ok()
    }

    fn path_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn capture(&self, argv: &[&str]) -> Option<String> {
        let (program, args) = argv.split_first()?;
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

// =============================================================================
// os-release parsing
// =============================================================================

/// Parse KEY=value lines, stripping surrounding quotes
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
            continue;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        fields.insert(key.to_string(), value.to_string());
    }
    fields
}

/// Map os-release identity to a family; unknown distros fall back to debian
pub fn resolve_family(os_release: &HashMap<String, String>) -> DistroFamily {
    let id = os_release.get("ID").map(|s| s.to_lowercase()).unwrap_or_default();
    let id_like = os_release
        .get("ID_LIKE")
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let like: Vec<&str> = id_like.split_whitespace().collect();

    if DEBIAN_IDS.contains(&id.as_str()) || like.iter().any(|l| DEBIAN_LIKE.contains(l)) {
        return DistroFamily::Debian;
    }
    if RHEL_IDS.contains(&id.as_str()) || like.iter().any(|l| RHEL_LIKE.contains(l)) {
        return DistroFamily::Rhel;
    }

    warn!(
        "Unknown distro family (ID={:?}, ID_LIKE={:?}), defaulting to debian",
        id, id_like
    );
    DistroFamily::Debian
}

// =============================================================================
// Subsystem probes
// =============================================================================

fn detect_firewall(probe: &dyn HostProbe) -> FirewallBackend {
    if probe.command_exists("ufw") {
        FirewallBackend::Ufw
    } else if probe.command_exists("firewall-cmd") {
        FirewallBackend::Firewalld
    } else if probe.command_exists("nft") {
        FirewallBackend::Nftables
    } else {
        debug!("No firewall frontend found");
        FirewallBackend::None
    }
}

fn detect_mac(probe: &dyn HostProbe) -> (MacSystem, Option<MacMode>) {
    if let Some(out) = probe.capture(&["getenforce"]) {
        let mode = match out.to_lowercase().as_str() {
            "enforcing" => Some(MacMode::Enforcing),
            "permissive" => Some(MacMode::Permissive),
            "disabled" => Some(MacMode::Disabled),
            _ => None,
        };
        if mode.is_some() {
            return (MacSystem::Selinux, mode);
        }
    }

    if probe.path_exists("/sys/module/apparmor") || probe.command_exists("aa-status") {
        let status = probe
            .capture(&["sudo", "-n", "aa-status"])
            .unwrap_or_default()
            .to_lowercase();
        // Without a readable status the loaded module is assumed to enforce
        let mode = if status.contains("complain") && !status.contains("enforce") {
            MacMode::Complaining
        } else {
            MacMode::Enforcing
        };
        return (MacSystem::Apparmor, Some(mode));
    }

    (MacSystem::None, None)
}

fn detect_container_runtime(probe: &dyn HostProbe) -> ContainerRuntime {
    if probe.command_exists("docker") {
        ContainerRuntime::Docker
    } else if probe.command_exists("podman") {
        ContainerRuntime::Podman
    } else {
        ContainerRuntime::None
    }
}

fn detect_log_system(probe: &dyn HostProbe) -> LogSystem {
    let journald = probe.command_exists("journalctl");
    let rsyslog = probe.command_exists("rsyslogd");
    match (journald, rsyslog) {
        (true, true) => LogSystem::Both,
        (false, true) => LogSystem::Rsyslog,
        _ => LogSystem::Journald,
    }
}

fn detect_user_management(probe: &dyn HostProbe, family: DistroFamily) -> UserManagement {
    if family == DistroFamily::Debian && probe.command_exists("adduser") {
        UserManagement::Adduser
    } else {
        UserManagement::Useradd
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Detect the local host and apply config overrides
pub fn detect(overrides: &DistroOverrides) -> DistroContext {
    detect_with(&SystemProbe, overrides)
}

/// Detect through an explicit probe (tests inject a fake host)
pub fn detect_with(probe: &dyn HostProbe, overrides: &DistroOverrides) -> DistroContext {
    info!("Starting distro detection");

    let os_release = probe
        .os_release()
        .map(|content| parse_os_release(&content))
        .unwrap_or_default();

    let family = resolve_family(&os_release);
    let (mac_system, mac_mode) = detect_mac(probe);

    let detected = DistroContext {
        family,
        name: os_release
            .get("NAME")
            .or_else(|| os_release.get("ID"))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        version: os_release
            .get("VERSION_ID")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        codename: os_release.get("VERSION_CODENAME").cloned(),
        package_manager: family.package_manager(),
        init_system: InitSystem::Systemd,
        firewall_backend: detect_firewall(probe),
        mac_system,
        mac_mode,
        container_runtime: detect_container_runtime(probe),
        log_system: detect_log_system(probe),
        user_management: detect_user_management(probe, family),
    };

    let context = overrides.apply(detected);
    info!(
        "Distro detection complete: {} {} ({}), firewall={:?}, mac={:?}, containers={:?}",
        context.name,
        context.version,
        context.family.as_str(),
        context.firewall_backend,
        context.mac_system,
        context.container_runtime
    );
    context
}

/// Check for passwordless sudo without prompting
pub fn verify_sudo() -> bool {
    Command::new("sudo")
        .args(["-n", "true"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeHost {
        os_release: Option<String>,
        commands: HashSet<&'static str>,
        paths: HashSet<&'static str>,
        outputs: HashMap<&'static str, &'static str>,
    }

    impl HostProbe for FakeHost {
        fn os_release(&self) -> Option<String> {
            self.os_release.clone()
        }

        fn command_exists(&self, cmd: &str) -> bool {
            self.commands.contains(cmd)
        }

        fn path_exists(&self, path: &str) -> bool {
            self.paths.contains(path)
        }

        fn capture(&self, argv: &[&str]) -> Option<String> {
            self.outputs.get(argv.join(" ").as_str()).map(|s| s.to_string())
        }
    }

    const UBUNTU: &str = r#"NAME="Ubuntu"
VERSION_ID="24.04"
VERSION_CODENAME=noble
ID=ubuntu
ID_LIKE=debian
"#;

    const ROCKY: &str = r#"NAME="Rocky Linux"
VERSION_ID="9.3"
ID="rocky"
ID_LIKE="rhel centos fedora"
"#;

    #[test]
    fn test_parse_os_release_strips_quotes() {
        let fields = parse_os_release(UBUNTU);
        assert_eq!(fields.get("NAME").map(String::as_str), Some("Ubuntu"));
        assert_eq!(fields.get("VERSION_CODENAME").map(String::as_str), Some("noble"));
        assert!(!fields.contains_key("noise"));
    }

    #[test]
    fn test_resolve_family() {
        assert_eq!(resolve_family(&parse_os_release(UBUNTU)), DistroFamily::Debian);
        assert_eq!(resolve_family(&parse_os_release(ROCKY)), DistroFamily::Rhel);
        assert_eq!(
            resolve_family(&parse_os_release("ID=fedora\n")),
            DistroFamily::Rhel
        );
        assert_eq!(
            resolve_family(&parse_os_release("ID=linuxmint\nID_LIKE=\"ubuntu debian\"\n")),
            DistroFamily::Debian
        );
    }

    #[test]
    fn test_unknown_family_defaults_to_debian() {
        assert_eq!(resolve_family(&parse_os_release("ID=arch\n")), DistroFamily::Debian);
        assert_eq!(resolve_family(&HashMap::new()), DistroFamily::Debian);
    }

    #[test]
    fn test_detect_ubuntu_host() {
        let host = FakeHost {
            os_release: Some(UBUNTU.to_string()),
            commands: ["ufw", "nft", "docker", "journalctl", "adduser"].into_iter().collect(),
            paths: ["/sys/module/apparmor"].into_iter().collect(),
            ..Default::default()
        };
        let ctx = detect_with(&host, &DistroOverrides::default());
        assert_eq!(ctx.family, DistroFamily::Debian);
        assert_eq!(ctx.name, "Ubuntu");
        assert_eq!(ctx.codename.as_deref(), Some("noble"));
        assert_eq!(ctx.firewall_backend, FirewallBackend::Ufw);
        assert_eq!(ctx.mac_system, MacSystem::Apparmor);
        assert_eq!(ctx.mac_mode, Some(MacMode::Enforcing));
        assert_eq!(ctx.container_runtime, ContainerRuntime::Docker);
        assert_eq!(ctx.log_system, LogSystem::Journald);
        assert_eq!(ctx.user_management, UserManagement::Adduser);
    }

    #[test]
    fn test_detect_rhel_host_with_selinux() {
        let host = FakeHost {
            os_release: Some(ROCKY.to_string()),
            commands: ["firewall-cmd", "podman", "journalctl", "rsyslogd", "adduser"]
                .into_iter()
                .collect(),
            outputs: [("getenforce", "Permissive")].into_iter().collect(),
            ..Default::default()
        };
        let ctx = detect_with(&host, &DistroOverrides::default());
        assert_eq!(ctx.family, DistroFamily::Rhel);
        assert_eq!(ctx.firewall_backend, FirewallBackend::Firewalld);
        assert_eq!(ctx.mac_system, MacSystem::Selinux);
        assert_eq!(ctx.mac_mode, Some(MacMode::Permissive));
        assert_eq!(ctx.container_runtime, ContainerRuntime::Podman);
        assert_eq!(ctx.log_system, LogSystem::Both);
        // adduser is only preferred on debian-family hosts
        assert_eq!(ctx.user_management, UserManagement::Useradd);
    }

    #[test]
    fn test_detect_bare_host_soft_fails() {
        let ctx = detect_with(&FakeHost::default(), &DistroOverrides::default());
        assert_eq!(ctx.family, DistroFamily::Debian);
        assert_eq!(ctx.name, "Unknown");
        assert_eq!(ctx.version, "unknown");
        assert_eq!(ctx.firewall_backend, FirewallBackend::None);
        assert_eq!(ctx.mac_system, MacSystem::None);
        assert_eq!(ctx.container_runtime, ContainerRuntime::None);
    }

    #[test]
    fn test_overrides_win_over_probes() {
        let host = FakeHost {
            os_release: Some(UBUNTU.to_string()),
            commands: ["ufw"].into_iter().collect(),
            ..Default::default()
        };
        let overrides = DistroOverrides {
            firewall_backend: Some(FirewallBackend::Nftables),
            ..Default::default()
        };
        let ctx = detect_with(&host, &overrides);
        assert_eq!(ctx.firewall_backend, FirewallBackend::Nftables);
        assert_eq!(ctx.name, "Ubuntu");
    }
}
