//! ToolResponse - the wire contract returned for every tool call
//!
//! Serialized verbatim as JSON. Field names are stable; consumers key on
//! `status`, `error_code`, `error_category`, `risk_level` and `preview.*`.

use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

/// Classified failure domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Privilege,
    NotFound,
    Dependency,
    Resource,
    Lock,
    Network,
    Timeout,
    Validation,
    State,
    Policy,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Privilege => "privilege",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Dependency => "dependency",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Lock => "lock",
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Validation => "validation",
            ErrorCategory::State => "state",
            ErrorCategory::Policy => "policy",
        }
    }
}

/// Tagged union on `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    Success(SuccessResponse),
    Error(ErrorResponse),
    Blocked(BlockedResponse),
    ConfirmationRequired(ConfirmationResponse),
}

impl ToolResponse {
    pub fn status(&self) -> &'static str {
        match self {
            ToolResponse::Success(_) => "success",
            ToolResponse::Error(_) => "error",
            ToolResponse::Blocked(_) => "blocked",
            ToolResponse::ConfirmationRequired(_) => "confirmation_required",
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            ToolResponse::Success(r) => &r.tool,
            ToolResponse::Error(r) => &r.tool,
            ToolResponse::Blocked(r) => &r.tool,
            ToolResponse::ConfirmationRequired(r) => &r.tool,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResponse::Success(_))
    }

    /// Pretty JSON for operators; serialization of these types cannot fail
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!("{{\"status\":\"error\",\"message\":\"serialization failed: {}\"}}", e)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub tool: String,
    pub target_host: String,
    pub duration_ms: Option<u64>,
    pub command_executed: Option<String>,
    pub data: serde_json::Value,
    /// Line count before truncation, for list-returning tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub tool: String,
    pub target_host: String,
    pub duration_ms: Option<u64>,
    pub command_executed: Option<String>,
    pub error_code: String,
    pub error_category: ErrorCategory,
    pub message: String,
    pub transient: bool,
    pub remediation: Vec<String>,
}

/// Refused outright: policy deny list or an OS resource lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedResponse {
    pub tool: String,
    pub target_host: String,
    pub duration_ms: Option<u64>,
    pub command_executed: Option<String>,
    pub error_code: String,
    pub error_category: ErrorCategory,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResponse {
    pub tool: String,
    pub target_host: String,
    /// Always null: nothing ran
    pub duration_ms: Option<u64>,
    pub command_executed: Option<String>,
    pub risk_level: RiskLevel,
    pub dry_run_available: bool,
    pub preview: Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub command: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
}
