//! Tool catalog and runner
//!
//! Every operation is described by a static `ToolSpec`. The runner takes a
//! spec plus a rendered request and walks the fixed chain:
//! dry-run support -> degraded mode -> safety gate -> executor -> response.

use crate::command::Command;
use crate::distro::DistroFamily;
use crate::errors::{
    categorize_error, categorized_response, exec_error_response, sudo_unavailable_response,
};
use crate::executor::{ExecResult, Executor};
use crate::knowledge::{ExpectOutput, HealthCheck, KnowledgeProfile};
use crate::response::{ErrorCategory, ErrorResponse, SuccessResponse, ToolResponse};
use crate::risk::{DurationCategory, RiskLevel};
use crate::safety::{GateRequest, SafetyGate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolModule {
    Packages,
    Services,
    Firewall,
    Users,
}

/// How a tool honours `dry_run`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DryRunMode {
    /// The rendered command is the tool's own preview path and is executed
    Native,
    /// Nothing runs; the rendered command is returned
    Preview,
    /// Dry-run requests are rejected
    Unsupported,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub module: ToolModule,
    pub description: &'static str,
    pub risk: RiskLevel,
    pub duration: DurationCategory,
    pub dry_run: DryRunMode,
    /// Exit codes that count as success besides 0
    pub extra_exit_codes: &'static [i32],
    /// Output is a line listing subject to the output limit
    pub list_output: bool,
    /// Lowercase stderr markers of a failed run that mean "nothing matched"
    pub empty_listing: &'static [&'static str],
}

impl ToolSpec {
    pub fn find(name: &str) -> Option<&'static ToolSpec> {
        TOOL_CATALOG.iter().find(|t| t.name == name)
    }

    pub fn dry_run_available(&self) -> bool {
        self.dry_run != DryRunMode::Unsupported
    }

    pub fn accepts_exit(&self, code: i32) -> bool {
        code == 0 || self.extra_exit_codes.contains(&code)
    }

    pub fn is_empty_listing(&self, stderr: &str) -> bool {
        if self.empty_listing.is_empty() {
            return false;
        }
        let lowered = stderr.to_lowercase();
        self.empty_listing.iter().any(|m| lowered.contains(m))
    }
}

const fn tool(
    name: &'static str,
    module: ToolModule,
    description: &'static str,
    risk: RiskLevel,
    duration: DurationCategory,
    dry_run: DryRunMode,
) -> ToolSpec {
    ToolSpec {
        name,
        module,
        description,
        risk,
        duration,
        dry_run,
        extra_exit_codes: &[],
        list_output: false,
        empty_listing: &[],
    }
}

const fn listing(mut spec: ToolSpec) -> ToolSpec {
    spec.list_output = true;
    spec
}

const fn empty_when(mut spec: ToolSpec, markers: &'static [&'static str]) -> ToolSpec {
    spec.empty_listing = markers;
    spec
}

const fn also_accepts(mut spec: ToolSpec, codes: &'static [i32]) -> ToolSpec {
    spec.extra_exit_codes = codes;
    spec
}

use DryRunMode::{Native, Preview, Unsupported};
use DurationCategory::{Normal, Quick, Slow};
use RiskLevel::{Critical, High, Moderate, ReadOnly};
use ToolModule::{Firewall, Packages, Services, Users};

pub static TOOL_CATALOG: &[ToolSpec] = &[
    // Packages
    empty_when(
        listing(tool("pkg_list_installed", Packages, "List installed packages, optionally filtered by name", ReadOnly, Quick, Unsupported)),
        // dpkg-query exits 1 when a pattern matches no installed package
        &["no packages found matching"],
    ),
    listing(tool("pkg_search", Packages, "Search available packages by name or keyword", ReadOnly, Normal, Unsupported)),
    tool("pkg_info", Packages, "Show details for a package", ReadOnly, Quick, Unsupported),
    also_accepts(
        listing(tool("pkg_check_updates", Packages, "List available updates without applying them", ReadOnly, Normal, Unsupported)),
        &[100],
    ),
    listing(tool("pkg_history", Packages, "Show package transaction history", ReadOnly, Quick, Unsupported)),
    tool("pkg_install", Packages, "Install one or more packages", Moderate, Slow, Native),
    tool("pkg_update", Packages, "Upgrade named packages, or all packages", Moderate, Slow, Native),
    tool("pkg_remove", Packages, "Remove packages, keeping configuration", High, Normal, Native),
    tool("pkg_purge", Packages, "Remove packages and their configuration", Critical, Normal, Native),
    // Services
    also_accepts(
        tool("svc_status", Services, "Detailed status of a service", ReadOnly, Quick, Unsupported),
        &[3],
    ),
    tool("svc_start", Services, "Start a service", Moderate, Quick, Preview),
    tool("svc_stop", Services, "Stop a service", Moderate, Quick, Preview),
    tool("svc_restart", Services, "Restart a service", Moderate, Quick, Preview),
    tool("svc_reload", Services, "Reload a service's configuration", Moderate, Quick, Preview),
    tool("svc_enable", Services, "Enable a service at boot", Moderate, Quick, Preview),
    tool("svc_disable", Services, "Disable a service at boot", Moderate, Quick, Preview),
    // Firewall
    tool("fw_status", Firewall, "Show firewall status", ReadOnly, Quick, Unsupported),
    tool("fw_list", Firewall, "List firewall rules", ReadOnly, Quick, Unsupported),
    tool("fw_add", Firewall, "Add a firewall rule", High, Quick, Native),
    tool("fw_remove", Firewall, "Remove a firewall rule", High, Quick, Preview),
    tool("fw_enable", Firewall, "Enable the firewall", Critical, Quick, Unsupported),
    tool("fw_disable", Firewall, "Disable the firewall", Critical, Quick, Unsupported),
    // Users
    tool("user_create", Users, "Create a user account", Moderate, Quick, Preview),
    tool("user_modify", Users, "Modify a user account", Moderate, Quick, Preview),
    tool("user_delete", Users, "Delete a user account", Critical, Quick, Preview),
];

// =============================================================================
// Requests
// =============================================================================

/// One rendered invocation of a tool
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub command: Command,
    pub description: String,
    pub confirmed: bool,
    pub dry_run: bool,
    pub service: Option<String>,
    /// Extra fields merged into the success payload
    pub details: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(command: Command, description: impl Into<String>) -> Self {
        Self {
            command,
            description: description.into(),
            confirmed: false,
            dry_run: false,
            service: None,
            details: Map::new(),
        }
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Executes tool requests through the gate
#[derive(Clone)]
pub struct ToolRunner {
    gate: Arc<SafetyGate>,
    executor: Arc<dyn Executor>,
    family: DistroFamily,
    target_host: String,
    degraded: bool,
    timeout_ceiling_secs: u64,
    output_limit: usize,
}

impl ToolRunner {
    pub fn new(
        gate: Arc<SafetyGate>,
        executor: Arc<dyn Executor>,
        family: DistroFamily,
        target_host: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            executor,
            family,
            target_host: target_host.into(),
            degraded: false,
            timeout_ceiling_secs: 0,
            output_limit: 50,
        }
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }

    pub fn timeout_ceiling(mut self, secs: u64) -> Self {
        self.timeout_ceiling_secs = secs;
        self
    }

    pub fn output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }

    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn timeout_for(&self, spec: &ToolSpec) -> Duration {
        spec.duration.timeout_with_ceiling(self.timeout_ceiling_secs)
    }

    pub async fn run(&self, spec: &ToolSpec, req: ToolRequest) -> ToolResponse {
        let rendered = req.command.render();

        if req.dry_run && spec.dry_run == DryRunMode::Unsupported && !spec.risk.is_read_only() {
            return self.validation_error(spec, &format!("{} has no dry-run mode", spec.name));
        }

        if self.degraded && !spec.risk.is_read_only() {
            return sudo_unavailable_response(spec.name, &self.target_host, self.family);
        }

        let decision = self.gate.check(&GateRequest {
            tool: spec.name,
            base_risk: spec.risk,
            target_host: &self.target_host,
            command: &rendered,
            description: &req.description,
            confirmed: req.confirmed,
            dry_run: req.dry_run,
            service: req.service.as_deref(),
            dry_run_available: spec.dry_run_available(),
        });
        if let Some(response) = decision.into_response() {
            return response;
        }

        if req.dry_run && spec.dry_run == DryRunMode::Preview {
            let mut data = req.details;
            data.insert("would_run".to_string(), Value::String(rendered));
            return ToolResponse::Success(SuccessResponse {
                tool: spec.name.to_string(),
                target_host: self.target_host.clone(),
                duration_ms: None,
                command_executed: None,
                data: Value::Object(data),
                total: None,
                returned: None,
                truncated: None,
                dry_run: Some(true),
            });
        }

        info!("Running {}: {}", spec.name, rendered);
        let result = match self.executor.execute(&req.command, self.timeout_for(spec)).await {
            Ok(result) => result,
            Err(e) => return exec_error_response(spec.name, &self.target_host, &rendered, &e),
        };

        if !spec.accepts_exit(result.exit_code) && spec.is_empty_listing(&result.stderr) {
            debug!("{} matched nothing", spec.name);
            let empty = ExecResult {
                stdout: String::new(),
                exit_code: 0,
                ..result
            };
            return self.success(spec, req.details, req.dry_run, &rendered, &empty);
        }

        if !spec.accepts_exit(result.exit_code) {
            let native_preview = req.dry_run && spec.dry_run == DryRunMode::Native;
            let unclassified =
                categorize_error(&result.stderr, self.family).category == ErrorCategory::State;
            if !(native_preview && unclassified) {
                debug!("{} exited {}", spec.name, result.exit_code);
                return categorized_response(
                    spec.name,
                    &self.target_host,
                    result.duration_ms,
                    &rendered,
                    &result.stderr,
                    self.family,
                );
            }
        }

        self.success(spec, req.details, req.dry_run, &rendered, &result)
    }

    fn success(
        &self,
        spec: &ToolSpec,
        mut data: Map<String, Value>,
        dry_run: bool,
        rendered: &str,
        result: &ExecResult,
    ) -> ToolResponse {
        let mut response = SuccessResponse {
            tool: spec.name.to_string(),
            target_host: self.target_host.clone(),
            duration_ms: Some(result.duration_ms),
            command_executed: Some(rendered.to_string()),
            data: Value::Null,
            total: None,
            returned: None,
            truncated: None,
            dry_run: dry_run.then_some(true),
        };

        if spec.list_output {
            let lines: Vec<&str> = result.stdout.lines().filter(|l| !l.trim().is_empty()).collect();
            let returned = lines.len().min(self.output_limit);
            data.insert("lines".to_string(), json!(lines[..returned]));
            response.total = Some(lines.len());
            response.returned = Some(returned);
            response.truncated = Some(returned < lines.len());
        } else {
            data.insert("output".to_string(), Value::String(result.stdout.trim().to_string()));
        }
        if result.exit_code != 0 {
            data.insert("exit_code".to_string(), json!(result.exit_code));
        }
        if dry_run && !result.stderr.trim().is_empty() {
            data.insert("stderr".to_string(), Value::String(result.stderr.trim().to_string()));
        }

        response.data = Value::Object(data);
        ToolResponse::Success(response)
    }

    fn validation_error(&self, spec: &ToolSpec, message: &str) -> ToolResponse {
        ToolResponse::Error(ErrorResponse {
            tool: spec.name.to_string(),
            target_host: self.target_host.clone(),
            duration_ms: None,
            command_executed: None,
            error_code: "DRY_RUN_UNSUPPORTED".to_string(),
            error_category: ErrorCategory::Validation,
            message: message.to_string(),
            transient: false,
            remediation: vec!["Call again without dry_run after reviewing the confirmation preview".to_string()],
        })
    }

    /// Run a profile's health checks without a shell
    pub async fn health_checks(&self, profile: &KnowledgeProfile) -> Vec<HealthCheckResult> {
        let mut results = Vec::with_capacity(profile.health_checks.len());
        for check in &profile.health_checks {
            results.push(self.health_check(check).await);
        }
        results
    }

    async fn health_check(&self, check: &HealthCheck) -> HealthCheckResult {
        let mut outcome = HealthCheckResult {
            description: check.description.clone(),
            command: check.command.clone(),
            passed: None,
            output: String::new(),
            skipped: None,
        };

        let Some(argv) = health_check_argv(&check.command) else {
            outcome.skipped = Some("requires shell syntax".to_string());
            return outcome;
        };

        let timeout = DurationCategory::Instant.timeout_with_ceiling(self.timeout_ceiling_secs);
        match self.executor.execute(&Command::new(argv), timeout).await {
            Ok(result) => {
                outcome.passed = Some(evaluate_health_check(check, &result));
                outcome.output = result.stdout.trim().chars().take(200).collect();
            }
            Err(e) => {
                outcome.passed = Some(false);
                outcome.output = e.to_string();
            }
        }
        outcome
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub description: String,
    pub command: String,
    pub passed: Option<bool>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

const SHELL_SYNTAX: &[&str] = &["|", "&&", "||", ";", ">", "<", "$(", "`", "*", "\"", "'"];

/// Whitespace argv for a simple command; None if it needs a shell
pub fn health_check_argv(command: &str) -> Option<Vec<String>> {
    if command.trim().is_empty() || SHELL_SYNTAX.iter().any(|s| command.contains(s)) {
        return None;
    }
    Some(command.split_whitespace().map(str::to_string).collect())
}

/// Default expectation is exit 0
pub fn evaluate_health_check(check: &HealthCheck, result: &ExecResult) -> bool {
    let mut passed = result.exit_code == check.expect_exit.unwrap_or(0);
    if let Some(needle) = &check.expect_contains {
        passed = passed && result.stdout.contains(needle.as_str());
    }
    match &check.expect_output {
        Some(ExpectOutput::Any(true)) => passed && !result.stdout.trim().is_empty(),
        Some(ExpectOutput::Any(false)) => passed && result.stdout.trim().is_empty(),
        Some(ExpectOutput::Exact(expected)) => passed && result.stdout.trim() == expected.trim(),
        None => passed,
    }
}
