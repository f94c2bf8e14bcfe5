//! Knowledge profile document schema
//!
//! One YAML document describes one managed service. Only `id`, `name` and a
//! non-empty `service.unit_names` are required; everything else defaults.

use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

fn default_schema_version() -> u32 {
    1
}

fn default_category() -> String {
    "general".to_string()
}

/// Declarative description of one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_notes: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub service: ServiceSpec,
    #[serde(default)]
    pub config: ConfigSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_checks: Vec<HealthCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_tools: Vec<CliTool>,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<Interaction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub troubleshooting: Vec<Troubleshooting>,
}

impl KnowledgeProfile {
    /// Reason the document is unusable, if any
    pub fn validate(&self) -> Option<&'static str> {
        if self.id.trim().is_empty() || self.name.trim().is_empty() || self.service.unit_names.is_empty() {
            Some("missing required fields (id, name, service.unit_names)")
        } else {
            None
        }
    }

    /// Whether any declared unit name appears in the live inventory
    pub fn matches_units<'a, I>(&self, active_units: I) -> bool
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.service.unit_names.iter().any(|declared| {
            let declared = strip_service_suffix(declared);
            active_units
                .clone()
                .into_iter()
                .any(|live| strip_service_suffix(live) == declared)
        })
    }
}

/// `sshd.service` and `sshd` name the same unit
pub fn strip_service_suffix(unit: &str) -> &str {
    unit.strip_suffix(".service").unwrap_or(unit)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default)]
    pub unit_names: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional: Vec<ConfigFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backup_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mutable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journald_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub description: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

/// `expect_output` is either a flag (any output) or an exact string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectOutput {
    Any(bool),
    Exact(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_exit: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_output: Option<ExpectOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_contains: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliTool {
    pub command: String,
    #[serde(default)]
    pub subcommands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiredRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_by: Vec<DependentRole>,
}

/// A role this service needs, with profile ids that typically fill it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredRole {
    pub role: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub impact_if_down: String,
    #[serde(default)]
    pub typical_services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentRole {
    pub role: String,
    #[serde(default)]
    pub reason: String,
}

/// Trigger substring plus warning; an escalation when `risk_escalation` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub trigger: String,
    pub warning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_escalation: Option<RiskLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Troubleshooting {
    pub symptom: String,
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(default)]
    pub common_causes: Vec<String>,
}
