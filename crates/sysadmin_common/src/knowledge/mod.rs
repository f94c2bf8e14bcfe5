//! Knowledge base - declarative service profiles resolved against live units
//!
//! Loading order:
//! 1. built-in directory
//! 2. each additional directory, same id overwrites (last writer wins)
//! 3. disabled ids removed
//! 4. active iff any declared unit name is in the running inventory
//! 5. required roles resolved against other active profile ids
//! 6. escalating interactions of active profiles flattened
//!
//! A broken document is recorded in `load_errors` and skipped. Nothing here
//! aborts the load.

pub mod schema;

pub use schema::{
    strip_service_suffix, ExpectOutput, HealthCheck, Interaction, KnowledgeProfile, RequiredRole,
};

use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Inactive,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Inactive => "inactive",
        }
    }
}

/// Profile plus its runtime status and dependency resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProfile {
    pub profile: KnowledgeProfile,
    pub status: ProfileStatus,
    /// role -> id of the active profile that fills it
    pub roles_resolved: BTreeMap<String, String>,
    pub unresolved_roles: Vec<String>,
}

impl ResolvedProfile {
    pub fn is_active(&self) -> bool {
        self.status == ProfileStatus::Active
    }
}

/// Risk-raising rule contributed by an active profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub trigger: String,
    pub profile_id: String,
    pub warning: String,
    pub risk_level: RiskLevel,
}

/// A document or directory that could not be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadError {
    pub file: String,
    pub reason: String,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.reason)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub builtin_dir: PathBuf,
    pub additional_dirs: Vec<PathBuf>,
    pub disabled_ids: Vec<String>,
    pub active_unit_names: Vec<String>,
}

/// Counts surfaced to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSummary {
    pub total: usize,
    pub active: usize,
    pub active_ids: Vec<String>,
    pub escalations: usize,
    pub load_errors: Vec<String>,
}

/// Immutable after load; shared read-only
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    profiles: BTreeMap<String, KnowledgeProfile>,
    resolved: Vec<ResolvedProfile>,
    escalations: Vec<Escalation>,
    load_errors: Vec<LoadError>,
}

impl KnowledgeBase {
    pub fn get_profile(&self, id: &str) -> Option<&KnowledgeProfile> {
        self.profiles.get(id)
    }

    pub fn active_profiles(&self) -> Vec<&ResolvedProfile> {
        self.resolved.iter().filter(|r| r.is_active()).collect()
    }

    /// Every profile, ordered by id
    pub fn resolved(&self) -> &[ResolvedProfile] {
        &self.resolved
    }

    pub fn escalations(&self) -> &[Escalation] {
        &self.escalations
    }

    pub fn load_errors(&self) -> &[LoadError] {
        &self.load_errors
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn summary(&self) -> KnowledgeSummary {
        let active: Vec<String> = self
            .active_profiles()
            .iter()
            .map(|r| r.profile.id.clone())
            .collect();
        KnowledgeSummary {
            total: self.profiles.len(),
            active: active.len(),
            active_ids: active,
            escalations: self.escalations.len(),
            load_errors: self.load_errors.iter().map(ToString::to_string).collect(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load and resolve all profiles
pub fn load_knowledge_base(options: &LoadOptions) -> KnowledgeBase {
    let mut profiles = BTreeMap::new();
    let mut errors = Vec::new();

    if options.builtin_dir.is_dir() {
        load_profiles_from_dir(&options.builtin_dir, &mut profiles, &mut errors);
    } else {
        warn!(
            "Built-in knowledge directory {} not found",
            options.builtin_dir.display()
        );
    }

    for dir in &options.additional_dirs {
        if dir.exists() {
            load_profiles_from_dir(dir, &mut profiles, &mut errors);
        } else {
            debug!("Skipping missing knowledge directory {}", dir.display());
        }
    }

    for id in &options.disabled_ids {
        if profiles.remove(id).is_some() {
            debug!("Disabled knowledge profile {}", id);
        }
    }

    let (resolved, escalations) = resolve(&profiles, &options.active_unit_names);

    let kb = KnowledgeBase {
        profiles,
        resolved,
        escalations,
        load_errors: errors,
    };

    info!(
        "Knowledge base loaded: {} profiles, {} active, {} escalations, {} load errors",
        kb.profile_count(),
        kb.active_profiles().len(),
        kb.escalations.len(),
        kb.load_errors.len()
    );
    for error in &kb.load_errors {
        warn!("Knowledge load error: {}", error);
    }

    kb
}

/// Steps 4-6: status, role resolution, escalation extraction
fn resolve(
    profiles: &BTreeMap<String, KnowledgeProfile>,
    active_units: &[String],
) -> (Vec<ResolvedProfile>, Vec<Escalation>) {
    let mut resolved: Vec<ResolvedProfile> = profiles
        .values()
        .map(|profile| {
            let active = profile.matches_units(active_units.iter().map(String::as_str));
            ResolvedProfile {
                profile: profile.clone(),
                status: if active {
                    ProfileStatus::Active
                } else {
                    ProfileStatus::Inactive
                },
                roles_resolved: BTreeMap::new(),
                unresolved_roles: Vec::new(),
            }
        })
        .collect();

    let active_ids: BTreeSet<String> = resolved
        .iter()
        .filter(|r| r.is_active())
        .map(|r| r.profile.id.clone())
        .collect();

    for r in resolved.iter_mut().filter(|r| r.status == ProfileStatus::Active) {
        for dep in &r.profile.dependencies.requires {
            match dep.typical_services.iter().find(|id| active_ids.contains(*id)) {
                Some(filler) => {
                    r.roles_resolved.insert(dep.role.clone(), filler.clone());
                }
                None => r.unresolved_roles.push(dep.role.clone()),
            }
        }
    }

    let escalations = resolved
        .iter()
        .filter(|r| r.is_active())
        .flat_map(|r| {
            r.profile.interactions.iter().filter_map(move |i| {
                i.risk_escalation.map(|level| Escalation {
                    trigger: i.trigger.clone(),
                    profile_id: r.profile.id.clone(),
                    warning: i.warning.clone(),
                    risk_level: level,
                })
            })
        })
        .collect();

    (resolved, escalations)
}

fn is_profile_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        )
}

fn load_profiles_from_dir(
    dir: &Path,
    profiles: &mut BTreeMap<String, KnowledgeProfile>,
    errors: &mut Vec<LoadError>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read knowledge directory {}: {}", dir.display(), e);
            errors.push(LoadError {
                file: dir.display().to_string(),
                reason: format!("could not read directory: {}", e),
            });
            return;
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_profile_file(path))
        .collect();
    files.sort();

    for path in files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match parse_profile(&path) {
            Ok(profile) => {
                if profiles.contains_key(&profile.id) {
                    debug!("Profile {} overridden by {}", profile.id, path.display());
                }
                profiles.insert(profile.id.clone(), profile);
            }
            Err(reason) => errors.push(LoadError { file, reason }),
        }
    }
}

fn parse_profile(path: &Path) -> Result<KnowledgeProfile, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let profile: KnowledgeProfile = serde_yaml::from_str(&content).map_err(|e| e.to_string())?;
    match profile.validate() {
        Some(reason) => Err(reason.to_string()),
        None => Ok(profile),
    }
}
