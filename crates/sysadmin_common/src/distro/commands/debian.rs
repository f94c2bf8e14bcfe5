//! Debian / Ubuntu: apt, dpkg, ufw, adduser

use super::{filter_glob, systemctl_control, systemctl_status, usermod, DistroCommands};
use crate::command::{
    Command, FirewallRule, Protocol, ServiceAction, UserCreateParams, UserModifyParams,
};
use crate::distro::DistroFamily;

const DPKG_FORMAT: &str = "${Package}\\t${Version}\\t${Architecture}\\t${Status}\\n";
const APT_HISTORY_LOG: &str = "/var/log/apt/history.log";

#[derive(Debug, Default, Clone, Copy)]
pub struct DebianCommands;

impl DebianCommands {
    pub fn new() -> Self {
        Self
    }

    /// `sudo apt <verb> [--dry-run] -y <extra...>` without debconf prompts
    fn apt(verb: &str, extra: &[&str], packages: &[String], dry_run: bool) -> Command {
        let mut argv: Vec<String> = vec!["sudo".into(), "apt".into(), verb.into()];
        if dry_run {
            argv.push("--dry-run".into());
        }
        argv.extend(extra.iter().map(|s| s.to_string()));
        argv.push("-y".into());
        argv.extend(packages.iter().cloned());
        Command::new(argv).env("DEBIAN_FRONTEND", "noninteractive")
    }

    /// Common ufw rule tail: `[from SRC] [to DST] port P [proto X]`
    fn ufw_rule_args(rule: &FirewallRule, argv: &mut Vec<String>) {
        if let Some(source) = &rule.source {
            argv.extend(["from".into(), source.clone()]);
        }
        if let Some(destination) = &rule.destination {
            argv.extend(["to".into(), destination.clone()]);
        }
        argv.extend(["port".into(), rule.port.clone()]);
        if rule.protocol != Protocol::Any {
            argv.extend(["proto".into(), rule.protocol.as_str().into()]);
        }
    }
}

impl DistroCommands for DebianCommands {
    fn family(&self) -> DistroFamily {
        DistroFamily::Debian
    }

    fn package_install(&self, packages: &[String], dry_run: bool) -> Command {
        Self::apt("install", &[], packages, dry_run)
    }

    fn package_remove(&self, packages: &[String], purge: bool, dry_run: bool) -> Command {
        let verb = if purge { "purge" } else { "remove" };
        Self::apt(verb, &[], packages, dry_run)
    }

    fn package_search(&self, query: &str) -> Command {
        Command::new(["apt", "search", query])
    }

    fn package_info(&self, package: &str) -> Command {
        Command::new(["apt", "show", package])
    }

    fn package_list_installed(&self, filter: Option<&str>) -> Command {
        let mut argv: Vec<String> = vec!["dpkg-query".into(), "-W".into(), "-f".into(), DPKG_FORMAT.into()];
        if let Some(filter) = filter {
            argv.push(filter_glob(filter));
        }
        Command::new(argv)
    }

    fn package_check_updates(&self) -> Command {
        Command::new(["apt", "list", "--upgradable"]).env("DEBIAN_FRONTEND", "noninteractive")
    }

    fn package_update(&self, packages: &[String], dry_run: bool) -> Command {
        if packages.is_empty() {
            Self::apt("upgrade", &[], packages, dry_run)
        } else {
            Self::apt("install", &["--only-upgrade"], packages, dry_run)
        }
    }

    fn package_history(&self) -> Command {
        Command::new(["tail", "-n", "200", APT_HISTORY_LOG])
    }

    fn firewall_status(&self) -> Command {
        Command::new(["sudo", "ufw", "status", "verbose"])
    }

    fn firewall_list_rules(&self) -> Command {
        Command::new(["sudo", "ufw", "status", "numbered"])
    }

    fn firewall_add_rule(&self, rule: &FirewallRule, dry_run: bool) -> Command {
        let mut argv: Vec<String> = vec!["sudo".into(), "ufw".into()];
        if dry_run {
            argv.push("--dry-run".into());
        }
        argv.extend([rule.action.as_str().into(), rule.direction.as_str().into()]);
        Self::ufw_rule_args(rule, &mut argv);
        if let Some(comment) = &rule.comment {
            argv.extend(["comment".into(), comment.clone()]);
        }
        Command::new(argv)
    }

    fn firewall_remove_rule(&self, rule: &FirewallRule) -> Command {
        let mut argv: Vec<String> = vec![
            "sudo".into(),
            "ufw".into(),
            "delete".into(),
            rule.action.as_str().into(),
            rule.direction.as_str().into(),
        ];
        Self::ufw_rule_args(rule, &mut argv);
        Command::new(argv)
    }

    fn firewall_enable(&self) -> Command {
        Command::new(["sudo", "ufw", "--force", "enable"])
    }

    fn firewall_disable(&self) -> Command {
        Command::new(["sudo", "ufw", "disable"])
    }

    fn user_create(&self, params: &UserCreateParams) -> Command {
        let mut argv: Vec<String> = vec![
            "sudo".into(),
            "adduser".into(),
            "--disabled-password".into(),
            "--gecos".into(),
            params.comment.clone().unwrap_or_default(),
        ];
        if let Some(shell) = &params.shell {
            argv.extend(["--shell".into(), shell.clone()]);
        }
        if let Some(home) = &params.home {
            argv.extend(["--home".into(), home.clone()]);
        }
        if params.system {
            argv.push("--system".into());
        }
        argv.push(params.username.clone());

        let create = Command::new(argv);
        // adduser takes no group list; supplementary groups follow via usermod
        if params.groups.is_empty() {
            create
        } else {
            create.and_then(Command::new([
                "sudo".to_string(),
                "usermod".to_string(),
                "-aG".to_string(),
                params.groups.join(","),
                params.username.clone(),
            ]))
        }
    }

    fn user_delete(&self, username: &str, remove_home: bool) -> Command {
        let mut argv = vec!["sudo", "deluser"];
        if remove_home {
            argv.push("--remove-home");
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
