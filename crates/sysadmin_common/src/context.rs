//! SysadminContext - everything built once at startup
//!
//! Phases: config -> distro detection -> sudo check -> command set ->
//! executor -> running units -> knowledge base -> safety gate -> host name.
//! The result is immutable and shared through `Arc`.

use crate::config::{LoadedConfig, SysadminConfig};
use crate::distro::{self, create_distro_commands, DistroCommands, DistroContext, DistroOverrides};
use crate::errors::{ConfigError, StartupError};
use crate::executor::{Executor, LocalExecutor};
use crate::knowledge::{load_knowledge_base, KnowledgeBase, KnowledgeSummary, LoadOptions};
use crate::safety::SafetyGate;
use crate::tools::ToolRunner;
use crate::units::list_active_units;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SysadminContext {
    pub config: SysadminConfig,
    pub config_path: PathBuf,
    pub first_run: bool,
    pub distro: Arc<DistroContext>,
    pub sudo_available: bool,
    pub commands: Arc<dyn DistroCommands>,
    pub executor: Arc<dyn Executor>,
    pub knowledge: Arc<KnowledgeBase>,
    pub gate: Arc<SafetyGate>,
    pub runner: ToolRunner,
    pub target_host: String,
}

/// Operator-facing snapshot of the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub target_host: String,
    pub distro: DistroContext,
    pub sudo_available: bool,
    pub degraded_mode: bool,
    pub config_path: String,
    pub first_run: bool,
    pub knowledge: KnowledgeSummary,
    pub blocked_tools: Vec<String>,
    pub dry_run_bypass_confirmation: bool,
}

/// Host facts gathered with blocking probes (files, `which`, `sudo -n`)
#[derive(Debug, Clone)]
pub struct HostFacts {
    pub distro: DistroContext,
    pub sudo_available: bool,
    pub hostname: String,
}

impl HostFacts {
    /// Blocking; call from a blocking thread
    pub fn probe(overrides: &DistroOverrides) -> Self {
        Self {
            distro: distro::detect(overrides),
            sudo_available: distro::verify_sudo(),
            hostname: resolve_hostname(),
        }
    }
}

impl SysadminContext {
    /// Probe the local host and build the context
    pub async fn bootstrap(config_path: Option<&Path>) -> Result<Self, StartupError> {
        let path = config_path.map(Path::to_path_buf);
        let (loaded, facts) = tokio::task::spawn_blocking(move || -> Result<_, ConfigError> {
            let loaded = SysadminConfig::load(path.as_deref())?;
            let facts = HostFacts::probe(&loaded.config.distro);
            Ok((loaded, facts))
        })
        .await??;
        info!("Config loaded from {}", loaded.path.display());

        let HostFacts {
            distro,
            sudo_available,
            hostname,
        } = facts;
        if !sudo_available {
            if !loaded.config.privilege.degrade_without_sudo {
                return Err(StartupError::SudoRequired);
            }
            warn!("Passwordless sudo unavailable, starting in degraded (read-only) mode");
        }

        let executor: Arc<dyn Executor> = Arc::new(LocalExecutor::new());
        let active_units = list_active_units(executor.as_ref()).await;

        Ok(Self::assemble(
            loaded,
            distro,
            sudo_available,
            executor,
            active_units,
            hostname,
        ))
    }

    /// Build from already-gathered inputs (no host probing)
    pub fn assemble(
        loaded: LoadedConfig,
        distro: DistroContext,
        sudo_available: bool,
        executor: Arc<dyn Executor>,
        active_units: Vec<String>,
        target_host: String,
    ) -> Self {
        let LoadedConfig {
            config,
            path: config_path,
            first_run,
        } = loaded;

        let commands: Arc<dyn DistroCommands> = Arc::from(create_distro_commands(&distro));

        let knowledge = load_knowledge_base(&LoadOptions {
            builtin_dir: config.builtin_knowledge_dir(),
            additional_dirs: config.knowledge.additional_paths.clone(),
            disabled_ids: config.knowledge.disabled_profiles.clone(),
            active_unit_names: active_units,
        });

        let gate = Arc::new(SafetyGate::new(
            config.safety.clone(),
            knowledge.escalations().to_vec(),
        ));

        let runner = ToolRunner::new(gate.clone(), executor.clone(), distro.family, target_host.clone())
            .degraded(!sudo_available)
            .timeout_ceiling(config.errors.command_timeout_ceiling)
            .output_limit(config.output.default_limit);

        info!(
            "Ready: {} {} on {} ({})",
            distro.name,
            distro.version,
            target_host,
            if sudo_available { "full" } else { "degraded" }
        );

        Self {
            config,
            config_path,
            first_run,
            distro: Arc::new(distro),
            sudo_available,
            commands,
            executor,
            knowledge: Arc::new(knowledge),
            gate,
            runner,
            target_host,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.sudo_available
    }

    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            target_host: self.target_host.clone(),
            distro: (*self.distro).clone(),
            sudo_available: self.sudo_available,
            degraded_mode: self.is_degraded(),
            config_path: self.config_path.display().to_string(),
            first_run: self.first_run,
            knowledge: self.knowledge.summary(),
            blocked_tools: self.config.safety.blocked_tools.clone(),
            dry_run_bypass_confirmation: self.config.safety.dry_run_bypass_confirmation,
        }
    }
}

/// /etc/hostname, else `hostname`, else localhost
pub fn resolve_hostname() -> String {
    if let Ok(name) = std::fs::read_to_string("/etc/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    if let Ok(output) = std::process::Command::new("hostname").output() {
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() && !name.is_empty() {
            return name;
        }
    }
    "localhost".to_string()
}
