//! Safety gate - decides whether a proposed action may run
//!
//! A pure decision function over the request, the deployment's safety config
//! and the escalations collected from active knowledge profiles. It never
//! errors and holds no per-call state, so an unconfirmed retry gets the
//! identical answer.
//!
//! Order:
//! 1. read-only base risk: proceed
//! 2. tool on the deny list: blocked
//! 3. dry-run with bypass enabled: proceed
//! 4. effective risk = max(base, matching escalations)
//! 5. confirmed: proceed
//! 6. otherwise: confirmation required

use crate::config::SafetyConfig;
use crate::knowledge::Escalation;
use crate::response::{
    BlockedResponse, ConfirmationResponse, ErrorCategory, Preview, ToolResponse,
};
use crate::risk::RiskLevel;
use tracing::info;

/// One proposed action as seen by the gate
#[derive(Debug, Clone)]
pub struct GateRequest<'a> {
    pub tool: &'a str,
    pub base_risk: RiskLevel,
    pub target_host: &'a str,
    /// Rendered command, as shown in the preview
    pub command: &'a str,
    pub description: &'a str,
    pub confirmed: bool,
    pub dry_run: bool,
    pub service: Option<&'a str>,
    /// Whether the tool has a dry-run path to offer instead
    pub dry_run_available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Proceed,
    ConfirmationRequired(ConfirmationResponse),
    Blocked(BlockedResponse),
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }

    /// The response to return instead of executing, if any
    pub fn into_response(self) -> Option<ToolResponse> {
        match self {
            GateDecision::Proceed => None,
            GateDecision::ConfirmationRequired(c) => Some(ToolResponse::ConfirmationRequired(c)),
            GateDecision::Blocked(b) => Some(ToolResponse::Blocked(b)),
        }
    }
}

/// Result of matching escalations against a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub effective_risk: RiskLevel,
    pub warnings: Vec<String>,
    pub escalation_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SafetyGate {
    config: SafetyConfig,
    escalations: Vec<Escalation>,
}

impl SafetyGate {
    pub fn new(config: SafetyConfig, escalations: Vec<Escalation>) -> Self {
        Self { config, escalations }
    }

    pub fn escalations(&self) -> &[Escalation] {
        &self.escalations
    }

    pub fn is_blocked(&self, tool: &str) -> bool {
        self.config.blocked_tools.iter().any(|t| t == tool)
    }

    pub fn check(&self, req: &GateRequest<'_>) -> GateDecision {
        if req.base_risk.is_read_only() {
            return GateDecision::Proceed;
        }

        if self.is_blocked(req.tool) {
            info!("Tool {} is on the blocked_tools list", req.tool);
            return GateDecision::Blocked(BlockedResponse {
                tool: req.tool.to_string(),
                target_host: req.target_host.to_string(),
                duration_ms: None,
                command_executed: None,
                error_code: "TOOL_BLOCKED".to_string(),
                error_category: ErrorCategory::Policy,
                message: format!("Tool '{}' is blocked by deployment configuration", req.tool),
                remediation: vec![
                    "Remove the tool from safety.blocked_tools in the config file to allow it".to_string(),
                ],
            });
        }

        if req.dry_run && self.config.dry_run_bypass_confirmation {
            return GateDecision::Proceed;
        }

        let assessment = self.assess(req);

        if req.confirmed {
            return GateDecision::Proceed;
        }

        info!(
            "Confirmation required for {} (base {}, effective {})",
            req.tool, req.base_risk, assessment.effective_risk
        );

        GateDecision::ConfirmationRequired(ConfirmationResponse {
            tool: req.tool.to_string(),
            target_host: req.target_host.to_string(),
            duration_ms: None,
            command_executed: None,
            risk_level: assessment.effective_risk,
            dry_run_available: req.dry_run_available,
            preview: Preview {
                command: req.command.to_string(),
                description: req.description.to_string(),
                warnings: assessment.warnings,
                affected_services: req.service.map(|s| vec![s.to_string()]),
                escalation_reason: assessment.escalation_reason,
            },
        })
    }

    /// Effective risk and warnings; never below the base level
    pub fn assess(&self, req: &GateRequest<'_>) -> Assessment {
        let mut effective = req.base_risk;
        let mut warnings: Vec<String> = Vec::new();
        let mut reason = None;

        for esc in self.escalations.iter().filter(|e| Self::matches(e, req)) {
            if !warnings.contains(&esc.warning) {
                warnings.push(esc.warning.clone());
            }
            if esc.risk_level > effective {
                effective = esc.risk_level;
                reason = Some(format!(
                    "Knowledge profile '{}' escalates from {} to {}: '{}'",
                    esc.profile_id, req.base_risk, esc.risk_level, esc.warning
                ));
            }
        }

        Assessment {
            effective_risk: effective,
            warnings,
            escalation_reason: reason,
        }
    }

    fn matches(esc: &Escalation, req: &GateRequest<'_>) -> bool {
        if esc.trigger.is_empty() {
            return false;
        }
        if req.command.contains(&esc.trigger) || req.description.contains(&esc.trigger) {
            return true;
        }
        match req.service.map(|s| s.strip_suffix(".service").unwrap_or(s)) {
            Some(service) if !service.is_empty() => contains_word(&esc.trigger, service),
            _ => false,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `word` occurs in `haystack` with no word character directly on either side
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}
