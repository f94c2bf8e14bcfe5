//! Safety gate decision properties over the whole tool catalog

use sysadmin_common::config::SafetyConfig;
use sysadmin_common::knowledge::Escalation;
use sysadmin_common::safety::{GateDecision, GateRequest, SafetyGate};
use sysadmin_common::{ErrorCategory, RiskLevel, TOOL_CATALOG};

const LEVELS: [RiskLevel; 4] = [
    RiskLevel::ReadOnly,
    RiskLevel::Moderate,
    RiskLevel::High,
    RiskLevel::Critical,
];

fn escalation(trigger: &str, profile: &str, level: RiskLevel) -> Escalation {
    Escalation {
        trigger: trigger.to_string(),
        profile_id: profile.to_string(),
        warning: format!("{} is sensitive", trigger),
        risk_level: level,
    }
}

fn sshd_gate(config: SafetyConfig) -> SafetyGate {
    SafetyGate::new(
        config,
        vec![
            escalation("edit /etc/ssh/sshd_config", "sshd", RiskLevel::High),
            escalation("sshd", "sshd", RiskLevel::High),
            escalation("ufw disable", "ufw", RiskLevel::Critical),
        ],
    )
}

fn request<'a>(tool: &'a str, base: RiskLevel, command: &'a str) -> GateRequest<'a> {
    GateRequest {
        tool,
        base_risk: base,
        target_host: "web01",
        command,
        description: "test",
        confirmed: false,
        dry_run: false,
        service: None,
        dry_run_available: true,
    }
}

#[test]
fn test_read_only_always_proceeds() {
    let gate = sshd_gate(SafetyConfig {
        dry_run_bypass_confirmation: false,
        blocked_tools: vec!["svc_status".into()],
    });
    for command in ["systemctl status sshd", "ufw disable", "edit /etc/ssh/sshd_config"] {
        let req = request("svc_status", RiskLevel::ReadOnly, command);
        assert!(gate.check(&req).is_proceed(), "{}", command);
    }
}

#[test]
fn test_every_mutating_catalog_tool_requires_confirmation() {
    let gate = sshd_gate(SafetyConfig::default());
    for spec in TOOL_CATALOG.iter().filter(|s| !s.risk.is_read_only()) {
        let req = request(spec.name, spec.risk, "sudo true");
        match gate.check(&req) {
            GateDecision::ConfirmationRequired(c) => {
                assert_eq!(c.tool, spec.name);
                assert!(c.risk_level >= spec.risk);
                assert!(c.duration_ms.is_none());
                assert!(c.command_executed.is_none());
            }
            other => panic!("{}: expected confirmation, got {:?}", spec.name, other),
        }

        let confirmed = GateRequest { confirmed: true, ..req };
        assert!(gate.check(&confirmed).is_proceed(), "{}", spec.name);
    }
}

#[test]
fn test_dry_run_bypass_is_unconditional() {
    let gate = sshd_gate(SafetyConfig::default());
    for level in &LEVELS[1..] {
        let req = GateRequest {
            dry_run: true,
            ..request("fw_disable", *level, "sudo ufw disable")
        };
        assert!(gate.check(&req).is_proceed());
    }
}

#[test]
fn test_dry_run_bypass_can_be_disabled() {
    let gate = sshd_gate(SafetyConfig {
        dry_run_bypass_confirmation: false,
        blocked_tools: Vec::new(),
    });
    let req = GateRequest {
        dry_run: true,
        ..request("pkg_install", RiskLevel::Moderate, "sudo apt install -y curl")
    };
    assert!(matches!(gate.check(&req), GateDecision::ConfirmationRequired(_)));
}

#[test]
fn test_block_list_beats_confirmed_and_dry_run() {
    let gate = sshd_gate(SafetyConfig {
        dry_run_bypass_confirmation: true,
        blocked_tools: vec!["user_delete".into()],
    });
    let req = GateRequest {
        confirmed: true,
        dry_run: true,
        ..request("user_delete", RiskLevel::Critical, "sudo deluser bob")
    };
    match gate.check(&req) {
        GateDecision::Blocked(b) => {
            assert_eq!(b.error_code, "TOOL_BLOCKED");
            assert_eq!(b.error_category, ErrorCategory::Policy);
        }
        other => panic!("expected blocked, got {:?}", other),
    }
}

#[test]
fn test_escalation_monotonic() {
    let gate = sshd_gate(SafetyConfig::default());
    let commands = [
        "sudo apt install -y curl",
        "sudo systemctl restart sshd",
        "sudo ufw disable",
        "edit /etc/ssh/sshd_config",
    ];
    for base in LEVELS {
        for command in commands {
            let assessed = gate.assess(&request("t", base, command));
            assert!(assessed.effective_risk >= base);
            if assessed.effective_risk > base {
                assert!(assessed.escalation_reason.is_some());
            }
        }
    }
}

#[test]
fn test_no_matching_trigger_keeps_base_level() {
    let gate = sshd_gate(SafetyConfig::default());
    let req = request("pkg_install", RiskLevel::Moderate, "install package X");
    match gate.check(&req) {
        GateDecision::ConfirmationRequired(c) => {
            assert_eq!(c.risk_level, RiskLevel::Moderate);
            assert!(c.preview.escalation_reason.is_none());
            assert!(c.preview.warnings.is_empty());
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
}

#[test]
fn test_service_name_matches_trigger() {
    let gate = sshd_gate(SafetyConfig::default());
    let req = GateRequest {
        service: Some("ssh"),
        ..request("svc_restart", RiskLevel::Moderate, "sudo systemctl restart ssh")
    };
    match gate.check(&req) {
        GateDecision::ConfirmationRequired(c) => {
            assert_eq!(c.risk_level, RiskLevel::High);
            assert_eq!(c.preview.affected_services, Some(vec!["ssh".to_string()]));
            let reason = c.preview.escalation_reason.unwrap();
            assert!(reason.contains("'sshd'"));
            assert!(reason.contains("moderate to high"));
        }
        other => panic!("expected confirmation, got {:?}", other),
    }
}

#[test]
fn test_unconfirmed_repeat_is_identical() {
    let gate = sshd_gate(SafetyConfig::default());
    let req = request("fw_disable", RiskLevel::Critical, "sudo ufw disable");
    let first = gate.check(&req);
    let second = gate.check(&req);
    assert_eq!(first, second);
}

#[test]
fn test_confirmation_carries_dry_run_availability() {
    let gate = SafetyGate::default();
    let req = GateRequest {
        dry_run_available: false,
        ..request("fw_enable", RiskLevel::Critical, "sudo ufw --force enable")
    };
    match gate.check(&req) {
        GateDecision::ConfirmationRequired(c) => assert!(!c.dry_run_available),
        other => panic!("expected confirmation, got {:?}", other),
    }
}
