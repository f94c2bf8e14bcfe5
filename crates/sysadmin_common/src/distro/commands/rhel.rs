//! RHEL / Fedora / Rocky / Alma: dnf, rpm, firewalld, useradd

use super::{filter_glob, systemctl_control, systemctl_status, usermod, DistroCommands};
use crate::command::{
    Command, FirewallRule, Protocol, RuleAction, ServiceAction, UserCreateParams,
    UserModifyParams,
};
use crate::distro::DistroFamily;

const RPM_FORMAT: &str = "%{NAME}\\t%{VERSION}-%{RELEASE}\\t%{ARCH}\\n";

#[derive(Debug, Default, Clone, Copy)]
pub struct RhelCommands;

impl RhelCommands {
    pub fn new() -> Self {
        Self
    }

    /// `sudo dnf <verb> -y|--assumeno <packages...>`
    fn dnf(verb: &str, packages: &[String], dry_run: bool) -> Command {
        let mut argv: Vec<String> = vec!["sudo".into(), "dnf".into(), verb.into()];
        argv.push(if dry_run { "--assumeno" } else { "-y" }.into());
        argv.extend(packages.iter().cloned());
        Command::new(argv)
    }

    /// firewalld rich rule text for a unified rule
    pub fn rich_rule(rule: &FirewallRule) -> String {
        // firewalld port rules need a concrete protocol
        let protocol = match rule.protocol {
            Protocol::Any => "tcp",
            other => other.as_str(),
        };
        let verdict = match rule.action {
            RuleAction::Allow => "accept",
            RuleAction::Reject => "reject",
            RuleAction::Deny => "drop",
        };

        let mut text = String::from("rule family=\"ipv4\"");
        if let Some(source) = &rule.source {
            text.push_str(&format!(" source address=\"{}\"", source));
        }
        if let Some(destination) = &rule.destination {
            text.push_str(&format!(" destination address=\"{}\"", destination));
        }
        // firewalld writes ranges with a dash
        let port = rule.port.replace(':', "-");
        text.push_str(&format!(" port port=\"{}\" protocol=\"{}\" {}", port, protocol, verdict));
        text
    }

    fn firewall_cmd(flag: &str, rule: &FirewallRule) -> Command {
        Command::new([
            "sudo".to_string(),
            "firewall-cmd".to_string(),
            "--permanent".to_string(),
            format!("{}={}", flag, Self::rich_rule(rule)),
        ])
    }

    fn reload() -> Command {
        Command::new(["sudo", "firewall-cmd", "--reload"])
    }
}

impl DistroCommands for RhelCommands {
    fn family(&self) -> DistroFamily {
        DistroFamily::Rhel
    }

    fn package_install(&self, packages: &[String], dry_run: bool) -> Command {
        Self::dnf("install", packages, dry_run)
    }

    /// dnf has no separate purge; configuration files are left as .rpmsave
    fn package_remove(&self, packages: &[String], _purge: bool, dry_run: bool) -> Command {
        Self::dnf("remove", packages, dry_run)
    }

    fn package_search(&self, query: &str) -> Command {
        Command::new(["dnf", "search", query])
    }

    fn package_info(&self, package: &str) -> Command {
        Command::new(["dnf", "info", package])
    }

    fn package_list_installed(&self, filter: Option<&str>) -> Command {
        let mut argv: Vec<String> = vec!["rpm".into(), "-qa".into(), "--queryformat".into(), RPM_FORMAT.into()];
        if let Some(filter) = filter {
            argv.push(filter_glob(filter));
        }
        Command::new(argv)
    }

    /// Exits 100 when updates are available
    fn package_check_updates(&self) -> Command {
        Command::new(["dnf", "check-update"])
    }

    fn package_update(&self, packages: &[String], dry_run: bool) -> Command {
        Self::dnf("upgrade", packages, dry_run)
    }

    fn package_history(&self) -> Command {
        Command::new(["dnf", "history", "list", "--reverse"])
    }

    fn firewall_status(&self) -> Command {
        Command::new(["sudo", "firewall-cmd", "--state"])
    }

    fn firewall_list_rules(&self) -> Command {
        Command::new(["sudo", "firewall-cmd", "--list-all"])
    }

    /// Dry-run queries the permanent config for the rule instead of adding it
    fn firewall_add_rule(&self, rule: &FirewallRule, dry_run: bool) -> Command {
        if dry_run {
            Self::firewall_cmd("--query-rich-rule", rule)
        } else {
            Self::firewall_cmd("--add-rich-rule", rule).and_then(Self::reload())
        }
    }

    fn firewall_remove_rule(&self, rule: &FirewallRule) -> Command {
        Self::firewall_cmd("--remove-rich-rule", rule).and_then(Self::reload())
    }

    fn firewall_enable(&self) -> Command {
        Command::new(["sudo", "systemctl", "enable", "--now", "firewalld"])
    }

    fn firewall_disable(&self) -> Command {
        Command::new(["sudo", "systemctl", "disable", "--now", "firewalld"])
    }

    fn user_create(&self, params: &UserCreateParams) -> Command {
        let mut argv: Vec<String> = vec!["sudo".into(), "useradd".into()];
        if let Some(shell) = &params.shell {
            argv.extend(["-s".into(), shell.clone()]);
        }
        if let Some(home) = &params.home {
            argv.extend(["-d".into(), home.clone()]);
        }
        if !params.groups.is_empty() {
            argv.extend(["-G".into(), params.groups.join(",")]);
        }
        if params.system {
            argv.push("-r".into());
        }
        if let Some(comment) = &params.comment {
            argv.extend(["-c".into(), comment.clone()]);
        }
        argv.extend(["-m".into(), params.username.clone()]);
        Command::new(argv)
    }

    fn user_delete(&self, username: &str, remove_home: bool) -> Command {
        let mut argv = vec!["sudo", "userdel"];
        if remove_home {
            argv.push("-r");
        }
        argv.push(username);
        Command::new(argv)
    }

    fn user_modify(&self, username: &str, params: &UserModifyParams) -> Command {
        usermod(username, params)
    }

    fn service_control(&self, unit: &str, action: ServiceAction) -> Command {
        systemctl_control(unit, action)
    }

    fn service_status(&self, unit: &str) -> Command {
        systemctl_status(unit)
    }
}
