//! Error types and stderr classification
//!
//! Three failure domains stay separate: configuration/startup (`ConfigError`,
//! `StartupError`), process execution (`ExecError`), and failed commands,
//! which are data and get classified into a stable code/category pair.

use crate::distro::DistroFamily;
use crate::response::{BlockedResponse, ErrorCategory, ErrorResponse, ToolResponse};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error enums
// =============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No config directory could be determined")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Passwordless sudo is unavailable and degraded mode is disabled (privilege.degrade_without_sudo = false)")]
    SudoRequired,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Host probe task failed: {0}")]
    Probe(#[from] tokio::task::JoinError),
}

// =============================================================================
// stderr classification
// =============================================================================

/// Classified failure with remediation hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClass {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub transient: bool,
    pub remediation: Vec<String>,
}

impl ErrorClass {
    pub fn is_lock(&self) -> bool {
        self.category == ErrorCategory::Lock
    }
}

struct ErrorPattern {
    matches: fn(&str) -> bool,
    code: &'static str,
    category: ErrorCategory,
    transient: bool,
    remediation: fn(DistroFamily) -> Vec<String>,
}

fn any_of(s: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| s.contains(n))
}

fn hints(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

/// Checked in order against lowercased stderr; first match wins
const ERROR_PATTERNS: &[ErrorPattern] = &[
    ErrorPattern {
        matches: |s| any_of(s, &["permission denied", "sudo:", "operation not permitted"]),
        code: "PERMISSION_DENIED",
        category: ErrorCategory::Privilege,
        transient: false,
        remediation: |family| {
            let manager = family.package_manager().as_str();
            vec![
                "Verify passwordless sudo is configured for this user".to_string(),
                format!(
                    "Add a NOPASSWD rule to /etc/sudoers.d/linux-sysadmin for {} commands",
                    manager
                ),
                "Run 'sudo -n true' to test sudo access".to_string(),
            ]
        },
    },
    ErrorPattern {
        matches: |s| any_of(s, &["unable to locate package", "no match for argument", "no packages found"]),
        code: "PACKAGE_NOT_FOUND",
        category: ErrorCategory::NotFound,
        transient: false,
        remediation: |_| hints(&["Check the package name spelling", "Run pkg_search to find available packages"]),
    },
    ErrorPattern {
        matches: |s| {
            (s.contains("unit") && (s.contains("not found") || s.contains("could not be found")))
                || (s.contains("no such file") && s.contains("systemd"))
        },
        code: "SERVICE_NOT_FOUND",
        category: ErrorCategory::NotFound,
        transient: false,
        remediation: |_| hints(&["Check the unit name with svc_status", "Check if the service is installed"]),
    },
    ErrorPattern {
        matches: |s| any_of(s, &["unmet dependencies", "dependency problems", "depsolve error"]),
        code: "DEPENDENCY_CONFLICT",
        category: ErrorCategory::Dependency,
        transient: false,
        remediation: |_| hints(&["Review the dependency conflict details", "Retry with dry_run to preview the transaction"]),
    },
    ErrorPattern {
        matches: |s| any_of(s, &["no space left on device", "cannot allocate memory"]),
        code: "RESOURCE_EXHAUSTED",
        category: ErrorCategory::Resource,
        transient: false,
        remediation: |_| hints(&["Check disk and memory usage", "Clean up temporary files or old logs"]),
    },
    ErrorPattern {
        matches: |s| any_of(s, &["could not get lock", "dpkg frontend lock", "rpm.lock"]),
        code: "RESOURCE_LOCKED",
        category: ErrorCategory::Lock,
        transient: false,
        remediation: |_| hints(&["Another package manager process may be running", "Wait for it to complete, then retry"]),
    },
    ErrorPattern {
        matches: |s| any_of(s, &["could not resolve", "failed to fetch", "connection timed out", "network is unreachable"]),
        code: "NETWORK_ERROR",
        category: ErrorCategory::Network,
        transient: true,
        remediation: |_| hints(&["Check network connectivity", "Verify DNS resolution"]),
    },
];

/// Classify a failed command by its stderr
pub fn categorize_error(stderr: &str, family: DistroFamily) -> ErrorClass {
    let lowered = stderr.to_lowercase();
    for pattern in ERROR_PATTERNS {
        if (pattern.matches)(&lowered) {
            return ErrorClass {
                code: pattern.code,
                category: pattern.category,
                transient: pattern.transient,
                remediation: (pattern.remediation)(family),
            };
        }
    }
    ErrorClass {
        code: "COMMAND_FAILED",
        category: ErrorCategory::State,
        transient: false,
        remediation: hints(&[
            "Review the stderr output for the specific error",
            "Retry with dry_run to preview the operation without executing",
            "Run session to verify sudo availability and distro detection",
        ]),
    }
}

/// Error for a command that ran and failed; lock contention becomes `blocked`
pub fn categorized_response(
    tool: &str,
    target_host: &str,
    duration_ms: u64,
    command: &str,
    stderr: &str,
    family: DistroFamily,
) -> ToolResponse {
    let class = categorize_error(stderr, family);
    let trimmed = stderr.trim();

    if class.is_lock() {
        let message = if trimmed.is_empty() {
            "Resource is locked by another process".to_string()
        } else {
            trimmed.to_string()
        };
        return ToolResponse::Blocked(BlockedResponse {
            tool: tool.to_string(),
            target_host: target_host.to_string(),
            duration_ms: Some(duration_ms),
            command_executed: Some(command.to_string()),
            error_code: class.code.to_string(),
            error_category: class.category,
            message,
            remediation: class.remediation,
        });
    }

    let message = if trimmed.is_empty() {
        "Command exited with a non-zero status".to_string()
    } else {
        trimmed.to_string()
    };
    ToolResponse::Error(ErrorResponse {
        tool: tool.to_string(),
        target_host: target_host.to_string(),
        duration_ms: Some(duration_ms),
        command_executed: Some(command.to_string()),
        error_code: class.code.to_string(),
        error_category: class.category,
        message,
        transient: class.transient,
        remediation: class.remediation,
    })
}

/// Error for a command the executor could not run to completion
pub fn exec_error_response(
    tool: &str,
    target_host: &str,
    command: &str,
    err: &ExecError,
) -> ToolResponse {
    let (code, category, transient, remediation, duration_ms) = match err {
        ExecError::TimedOut(after) => (
            "COMMAND_TIMEOUT",
            ErrorCategory::Timeout,
            true,
            hints(&[
                "The command was killed at its timeout",
                "Raise errors.command_timeout_ceiling if the operation is expected to be slow",
            ]),
            Some(after.as_millis() as u64),
        ),
        ExecError::NotFound(program) => (
            "COMMAND_NOT_FOUND",
            ErrorCategory::NotFound,
            false,
            vec![format!("Install the package that provides '{}'", program)],
            None,
        ),
        ExecError::EmptyCommand | ExecError::Spawn { .. } | ExecError::Io(_) => (
            "SPAWN_FAILED",
            ErrorCategory::State,
            false,
            hints(&["Check that the command exists and is executable"]),
            None,
        ),
    };

    ToolResponse::Error(ErrorResponse {
        tool: tool.to_string(),
        target_host: target_host.to_string(),
        duration_ms,
        command_executed: Some(command.to_string()),
        error_code: code.to_string(),
        error_category: category,
        message: err.to_string(),
        transient,
        remediation,
    })
}

/// Error for a mutating tool while running without sudo
pub fn sudo_unavailable_response(tool: &str, target_host: &str, family: DistroFamily) -> ToolResponse {
    ToolResponse::Error(ErrorResponse {
        tool: tool.to_string(),
        target_host: target_host.to_string(),
        duration_ms: None,
        command_executed: None,
        error_code: "SUDO_UNAVAILABLE".to_string(),
        error_category: ErrorCategory::Privilege,
        message: "Running in degraded mode: passwordless sudo is unavailable, only read-only tools are enabled".to_string(),
        transient: false,
        remediation: vec![
            "Configure passwordless sudo for this user and restart".to_string(),
            format!(
                "Add a NOPASSWD rule to /etc/sudoers.d/linux-sysadmin for {} commands",
                family.package_manager().as_str()
            ),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_case_stderr_is_matched() {
        let class = categorize_error("E: Unable to locate package nosuchpkg", DistroFamily::Debian);
        assert_eq!(class.code, "PACKAGE_NOT_FOUND");
        let class = categorize_error("Error: Unable to find a match. No match for argument: foo", DistroFamily::Rhel);
        assert_eq!(class.code, "PACKAGE_NOT_FOUND");
        let class = categorize_error("Failed to start foo.service: Unit foo.service not found.", DistroFamily::Debian);
        assert_eq!(class.code, "SERVICE_NOT_FOUND");
    }

    #[test]
    fn test_privilege_hint_follows_family() {
        let debian = categorize_error("sudo: a password is required", DistroFamily::Debian);
        assert_eq!(debian.category, ErrorCategory::Privilege);
        assert!(debian.remediation.iter().any(|r| r.contains("apt")));
        let rhel = categorize_error("sudo: a password is required", DistroFamily::Rhel);
        assert!(rhel.remediation.iter().any(|r| r.contains("dnf")));
    }

    #[test]
    fn test_systemctl_missing_unit_wording() {
        let class = categorize_error("Unit nosuch.service could not be found.\n", DistroFamily::Debian);
        assert_eq!(class.code, "SERVICE_NOT_FOUND");
        assert_eq!(class.category, ErrorCategory::NotFound);
    }

    #[test]
    fn test_timed_out_message_is_not_rounded() {
        assert_eq!(
            ExecError::TimedOut(Duration::from_millis(300)).to_string(),
            "Command timed out after 300ms"
        );
        assert_eq!(
            ExecError::TimedOut(Duration::from_secs(30)).to_string(),
            "Command timed out after 30s"
        );
    }

    #[test]
    fn test_network_is_transient() {
        let class = categorize_error("W: Failed to fetch http://deb.debian.org/...", DistroFamily::Debian);
        assert_eq!(class.code, "NETWORK_ERROR");
        assert!(class.transient);
    }

    #[test]
    fn test_unknown_falls_back_to_command_failed() {
        let class = categorize_error("something odd happened", DistroFamily::Debian);
        assert_eq!(class.code, "COMMAND_FAILED");
        assert_eq!(class.category, ErrorCategory::State);
    }

    #[test]
    fn test_lock_is_returned_as_blocked() {
        let stderr = "E: Could not get lock /var/lib/dpkg/lock-frontend. It is held by process 1234 (apt)";
        let response = categorized_response("pkg_install", "web01", 40, "sudo apt install -y htop", stderr, DistroFamily::Debian);
        match response {
            ToolResponse::Blocked(b) => {
                assert_eq!(b.error_code, "RESOURCE_LOCKED");
                assert_eq!(b.error_category, ErrorCategory::Lock);
            }
            other => panic!("expected blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_response_is_distinct() {
        let err = ExecError::TimedOut(Duration::from_secs(5));
        let response = exec_error_response("svc_status", "web01", "systemctl status x", &err);
        match response {
            ToolResponse::Error(e) => {
                assert_eq!(e.error_code, "COMMAND_TIMEOUT");
                assert_eq!(e.error_category, ErrorCategory::Timeout);
                assert!(e.transient);
                assert_eq!(e.duration_ms, Some(5000));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }
}
