//! Knowledge base loading against the shipped profiles and temp fixtures

use std::fs;
use std::path::PathBuf;

use sysadmin_common::knowledge::{load_knowledge_base, LoadOptions, ProfileStatus};
use sysadmin_common::RiskLevel;
use tempfile::TempDir;

const BUILTIN_IDS: [&str; 8] = [
    "crowdsec", "docker", "fail2ban", "nginx", "pihole", "sshd", "ufw", "unbound",
];

fn builtin_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../knowledge")
}

fn options(active: &[&str]) -> LoadOptions {
    LoadOptions {
        builtin_dir: builtin_dir(),
        active_unit_names: active.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_builtin_profiles_all_load() {
    let kb = load_knowledge_base(&options(&[]));
    assert!(kb.load_errors().is_empty(), "{:?}", kb.load_errors());
    assert_eq!(kb.profile_count(), BUILTIN_IDS.len());
    for id in BUILTIN_IDS {
        let profile = kb.get_profile(id).unwrap_or_else(|| panic!("missing {}", id));
        assert_eq!(profile.id, id);
        assert!(!profile.name.is_empty());
        assert!(!profile.service.unit_names.is_empty());
    }
}

#[test]
fn test_get_profile_unknown_is_none() {
    let kb = load_knowledge_base(&options(&[]));
    assert!(kb.get_profile("sshd").is_some());
    assert!(kb.get_profile("fake").is_none());
}

#[test]
fn test_malformed_yaml_is_recorded_not_fatal() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.yaml", ":\n  :\n    - [invalid: {yaml: ]]]");
    write(&dir, "ok.yaml", "id: ok\nname: Ok\nservice:\n  unit_names: [ok]\n");

    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    assert_eq!(kb.profile_count(), 1);
    assert_eq!(kb.load_errors().len(), 1);
    assert_eq!(kb.load_errors()[0].file, "broken.yaml");
}

#[test]
fn test_empty_unit_names_rejected() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "incomplete.yaml",
        "id: incomplete\nname: Incomplete\nschema_version: 1\ncategory: test\nservice:\n  unit_names: []\n",
    );
    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    assert_eq!(kb.profile_count(), 0);
    assert!(kb.load_errors()[0].reason.contains("missing required fields"));
}

#[test]
fn test_unknown_risk_level_is_load_error() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "low.yaml",
        "id: low\nname: Low\nservice:\n  unit_names: [low]\ninteractions:\n  - trigger: x\n    warning: y\n    risk_escalation: low\n",
    );
    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    assert_eq!(kb.profile_count(), 0);
    assert_eq!(kb.load_errors().len(), 1);
}

#[test]
fn test_non_yaml_files_ignored() {
    let dir = TempDir::new().unwrap();
    write(&dir, "README.md", "# not a profile");
    write(&dir, "a.yml", "id: a\nname: A\nservice:\n  unit_names: [a]\n");
    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    assert_eq!(kb.profile_count(), 1);
    assert!(kb.load_errors().is_empty());
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_status_follows_unit_inventory() {
    let kb = load_knowledge_base(&options(&["sshd"]));
    let sshd = kb.resolved().iter().find(|r| r.profile.id == "sshd").unwrap();
    assert_eq!(sshd.status, ProfileStatus::Active);

    let kb = load_knowledge_base(&options(&[]));
    assert!(kb.active_profiles().is_empty());
}

#[test]
fn test_any_declared_unit_name_activates() {
    let kb = load_knowledge_base(&options(&["ssh"]));
    assert!(kb.active_profiles().iter().any(|r| r.profile.id == "sshd"));

    let kb = load_knowledge_base(&options(&["ssh.service"]));
    assert!(kb.active_profiles().iter().any(|r| r.profile.id == "sshd"));
}

#[test]
fn test_active_profiles_only_active() {
    let kb = load_knowledge_base(&options(&["sshd", "nginx"]));
    let ids: Vec<&str> = kb.active_profiles().iter().map(|r| r.profile.id.as_str()).collect();
    assert_eq!(ids, vec!["nginx", "sshd"]);
}

#[test]
fn test_disabled_ids_removed() {
    let mut opts = options(&[]);
    opts.disabled_ids = vec!["sshd".into(), "nginx".into()];
    let kb = load_knowledge_base(&opts);
    assert_eq!(kb.profile_count(), BUILTIN_IDS.len() - 2);
    assert!(kb.get_profile("sshd").is_none());
    assert!(kb.get_profile("nginx").is_none());
}

#[test]
fn test_role_resolved_by_active_profile() {
    let kb = load_knowledge_base(&options(&["pihole-FTL", "unbound"]));
    let pihole = kb.resolved().iter().find(|r| r.profile.id == "pihole").unwrap();
    assert!(pihole.is_active());
    assert_eq!(pihole.roles_resolved.get("upstream_dns").map(String::as_str), Some("unbound"));
    assert!(pihole.unresolved_roles.is_empty());
}

#[test]
fn test_role_unresolved_without_provider() {
    let kb = load_knowledge_base(&options(&["pihole-FTL"]));
    let pihole = kb.resolved().iter().find(|r| r.profile.id == "pihole").unwrap();
    assert_eq!(pihole.unresolved_roles, vec!["upstream_dns"]);
}

#[test]
fn test_inactive_profile_has_no_role_resolution() {
    let kb = load_knowledge_base(&options(&["unbound"]));
    let pihole = kb.resolved().iter().find(|r| r.profile.id == "pihole").unwrap();
    assert_eq!(pihole.status, ProfileStatus::Inactive);
    assert!(pihole.roles_resolved.is_empty());
    assert!(pihole.unresolved_roles.is_empty());
}

// =============================================================================
// Escalations
// =============================================================================

#[test]
fn test_escalations_from_active_profiles_only() {
    let kb = load_knowledge_base(&options(&[]));
    assert!(kb.escalations().is_empty());

    let kb = load_knowledge_base(&options(&["sshd"]));
    assert!(!kb.escalations().is_empty());
    assert!(kb.escalations().iter().all(|e| e.profile_id == "sshd"));
}

#[test]
fn test_null_escalation_not_extracted() {
    let kb = load_knowledge_base(&options(&["sshd"]));
    assert!(!kb.escalations().iter().any(|e| e.trigger == "restart sshd"));
}

#[test]
fn test_sshd_config_edit_escalates_to_high() {
    let kb = load_knowledge_base(&options(&["sshd"]));
    let edit = kb
        .escalations()
        .iter()
        .find(|e| e.trigger == "edit /etc/ssh/sshd_config")
        .unwrap();
    assert_eq!(edit.risk_level, RiskLevel::High);
    assert!(!edit.warning.is_empty());
}

// =============================================================================
// Overrides and determinism
// =============================================================================

#[test]
fn test_additional_dir_overrides_by_id() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "my-ssh.yaml",
        "id: sshd\nname: \"Custom SSH Override\"\ncategory: remote_access\nservice:\n  unit_names: [\"sshd\"]\n",
    );
    let mut opts = options(&["sshd"]);
    opts.additional_dirs = vec![dir.path().to_path_buf()];
    let kb = load_knowledge_base(&opts);

    assert_eq!(kb.profile_count(), BUILTIN_IDS.len());
    assert_eq!(kb.get_profile("sshd").unwrap().name, "Custom SSH Override");
    // override has no interactions
    assert!(!kb.escalations().iter().any(|e| e.profile_id == "sshd"));
}

#[test]
fn test_missing_additional_dir_skipped() {
    let mut opts = options(&[]);
    opts.additional_dirs = vec![PathBuf::from("/tmp/nonexistent-knowledge-dir-9999")];
    let kb = load_knowledge_base(&opts);
    assert_eq!(kb.profile_count(), BUILTIN_IDS.len());
    assert!(kb.load_errors().is_empty());
}

#[test]
fn test_missing_builtin_dir_yields_empty_base() {
    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: PathBuf::from("/nonexistent/knowledge"),
        ..Default::default()
    });
    assert_eq!(kb.profile_count(), 0);
    assert!(kb.escalations().is_empty());
}

#[test]
fn test_same_dir_duplicate_id_last_file_wins() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.yaml", "id: web\nname: First\nservice:\n  unit_names: [web]\n");
    write(&dir, "b.yaml", "id: web\nname: Second\nservice:\n  unit_names: [web]\n");

    for _ in 0..3 {
        let kb = load_knowledge_base(&LoadOptions {
            builtin_dir: dir.path().to_path_buf(),
            ..Default::default()
        });
        assert_eq!(kb.get_profile("web").unwrap().name, "Second");
    }
}

#[test]
fn test_summary_counts() {
    let kb = load_knowledge_base(&options(&["sshd", "docker"]));
    let summary = kb.summary();
    assert_eq!(summary.total, BUILTIN_IDS.len());
    assert_eq!(summary.active, 2);
    assert_eq!(summary.active_ids, vec!["docker", "sshd"]);
    assert_eq!(summary.escalations, kb.escalations().len());
}

// =============================================================================
// Single-profile sshd scenario
// =============================================================================

const SSHD_ONLY: &str = r#"
id: sshd
name: "OpenSSH Server"
service:
  unit_names: ["ssh", "sshd"]
interactions:
  - trigger: "edit /etc/ssh/sshd_config"
    warning: "Config errors lock out remote sessions"
    risk_escalation: high
"#;

#[test]
fn test_single_sshd_profile_active() {
    let dir = TempDir::new().unwrap();
    write(&dir, "sshd.yaml", SSHD_ONLY);
    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: dir.path().to_path_buf(),
        active_unit_names: vec!["sshd".into()],
        ..Default::default()
    });

    let active = kb.active_profiles();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, ProfileStatus::Active);
    assert_eq!(kb.escalations().len(), 1);
    assert_eq!(kb.escalations()[0].risk_level, RiskLevel::High);
}

#[test]
fn test_single_sshd_profile_inactive() {
    let dir = TempDir::new().unwrap();
    write(&dir, "sshd.yaml", SSHD_ONLY);
    let kb = load_knowledge_base(&LoadOptions {
        builtin_dir: dir.path().to_path_buf(),
        ..Default::default()
    });

    assert!(kb.escalations().is_empty());
    assert_eq!(kb.resolved()[0].status, ProfileStatus::Inactive);
}

#[test]
fn test_resolution_is_deterministic() {
    let active = ["pihole-FTL", "unbound", "fail2ban", "sshd"];
    let first = load_knowledge_base(&options(&active));
    for _ in 0..5 {
        let again = load_knowledge_base(&options(&active));
        assert_eq!(again.resolved(), first.resolved());
        assert_eq!(again.escalations(), first.escalations());
    }
}
