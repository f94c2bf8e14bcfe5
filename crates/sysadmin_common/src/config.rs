//! Configuration
//!
//! Config file: ~/.config/linux-sysadmin/config.toml (or $LINUX_SYSADMIN_CONFIG,
//! or an explicit path). Every section is `#[serde(default)]`, so a partial
//! file only overrides the keys it names. A missing file is created with the
//! commented defaults on first run; an unreadable or invalid file is logged
//! and replaced by defaults.

use crate::distro::DistroOverrides;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const CONFIG_ENV: &str = "LINUX_SYSADMIN_CONFIG";
pub const KNOWLEDGE_DIR_ENV: &str = "LINUX_SYSADMIN_KNOWLEDGE_DIR";
const SYSTEM_KNOWLEDGE_DIR: &str = "/usr/share/linux-sysadmin/knowledge";

/// Written verbatim on first run
pub const DEFAULT_CONFIG_TOML: &str = r#"# Linux SysAdmin configuration
# Generated automatically on first run. All values shown are defaults.

[privilege]
# Start with read-only tools only when passwordless sudo is unavailable.
# When false, startup fails instead.
degrade_without_sudo = true

[errors]
# Upper bound in seconds for any command timeout (0 = no ceiling)
command_timeout_ceiling = 0

[safety]
# Dry-run calls skip the confirmation step
dry_run_bypass_confirmation = true
# Tools refused outright, e.g. ["user_delete", "fw_disable"]
blocked_tools = []

[knowledge]
# builtin_path = "/usr/share/linux-sysadmin/knowledge"
additional_paths = []
disabled_profiles = []

[output]
# Maximum lines returned by list tools
default_limit = 50

# Distro override (auto-detected if omitted)
# [distro]
# family = "debian"
# firewall_backend = "ufw"
"#;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeConfig {
    pub degrade_without_sudo: bool,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            degrade_without_sudo: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Seconds; 0 disables the ceiling
    pub command_timeout_ceiling: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub dry_run_bypass_confirmation: bool,
    /// Tool names refused regardless of confirmation
    pub blocked_tools: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            dry_run_bypass_confirmation: true,
            blocked_tools: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub builtin_path: Option<PathBuf>,
    pub additional_paths: Vec<PathBuf>,
    pub disabled_profiles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_limit: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { default_limit: 50 }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysadminConfig {
    pub privilege: PrivilegeConfig,
    pub errors: ErrorsConfig,
    pub safety: SafetyConfig,
    pub knowledge: KnowledgeConfig,
    pub output: OutputConfig,
    pub distro: DistroOverrides,
}

/// Loaded config plus where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SysadminConfig,
    pub path: PathBuf,
    pub first_run: bool,
}

impl SysadminConfig {
    /// ~/.config/linux-sysadmin/config.toml
    pub fn user_config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("linux-sysadmin").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Explicit path, else $LINUX_SYSADMIN_CONFIG, else the user path
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::user_config_path(),
        }
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Write the commented default file, creating parent directories
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML).map_err(write_err)
    }

    /// Load from a resolved path; only failing to resolve a path is an error
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        let path = Self::resolve_path(explicit)?;
        Ok(Self::load_from(&path))
    }

    /// Load from `path`, generating defaults on first run
    pub fn load_from(path: &Path) -> LoadedConfig {
        if !path.exists() {
            info!("No config file at {}, generating defaults (first run)", path.display());
            if let Err(e) = Self::write_default(path) {
                warn!("Could not write default config: {}", e);
            }
            return LoadedConfig {
                config: Self::default(),
                path: path.to_path_buf(),
                first_run: true,
            };
        }

        let config = match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}; using defaults", e);
                Self::default()
            }
        };
        LoadedConfig {
            config,
            path: path.to_path_buf(),
            first_run: false,
        }
    }

    /// Built-in knowledge directory: config, env, system install, source tree
    pub fn builtin_knowledge_dir(&self) -> PathBuf {
        if let Some(path) = &self.knowledge.builtin_path {
            return path.clone();
        }
        if let Ok(path) = std::env::var(KNOWLEDGE_DIR_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        let system = PathBuf::from(SYSTEM_KNOWLEDGE_DIR);
        if system.is_dir() {
            return system;
        }
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../knowledge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::FirewallBackend;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_parses_to_defaults() {
        let parsed = SysadminConfig::parse(DEFAULT_CONFIG_TOML, Path::new("default")).unwrap();
        assert_eq!(parsed, SysadminConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let content = r#"
[safety]
blocked_tools = ["user_delete"]

[distro]
firewall_backend = "nftables"
"#;
        let config = SysadminConfig::parse(content, Path::new("partial")).unwrap();
        assert_eq!(config.safety.blocked_tools, vec!["user_delete".to_string()]);
        assert!(config.safety.dry_run_bypass_confirmation);
        assert!(config.privilege.degrade_without_sudo);
        assert_eq!(config.output.default_limit, 50);
        assert_eq!(config.distro.firewall_backend, Some(FirewallBackend::Nftables));
        assert_eq!(config.distro.family, None);
    }

    #[test]
    fn test_first_run_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let loaded = SysadminConfig::load_from(&path);
        assert!(loaded.first_run);
        assert!(path.exists());

        let again = SysadminConfig::load_from(&path);
        assert!(!again.first_run);
        assert_eq!(again.config, SysadminConfig::default());
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[safety\nblocked_tools = 3").unwrap();

        let loaded = SysadminConfig::load_from(&path);
        assert!(!loaded.first_run);
        assert_eq!(loaded.config, SysadminConfig::default());
        assert!(matches!(
            SysadminConfig::read(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_explicit_builtin_path_wins() {
        let mut config = SysadminConfig::default();
        config.knowledge.builtin_path = Some(PathBuf::from("/opt/kb"));
        assert_eq!(config.builtin_knowledge_dir(), PathBuf::from("/opt/kb"));
    }
}
