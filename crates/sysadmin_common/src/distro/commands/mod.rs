//! Distro command sets
//!
//! One trait, one independent struct per family. Every method is pure: it
//! renders a `Command` and never executes anything. Dry-run is a parameter
//! that swaps in the underlying tool's own preview path.

mod debian;
mod rhel;

pub use debian::DebianCommands;
pub use rhel::RhelCommands;

use super::{DistroContext, DistroFamily};
use crate::command::{Command, FirewallRule, ServiceAction, UserCreateParams, UserModifyParams};

/// Family-specific translation of abstract operations into commands
pub trait DistroCommands: Send + Sync {
    fn family(&self) -> DistroFamily;

    // -------------------------------------------------------------------------
    // Packages
    // -------------------------------------------------------------------------

    fn package_install(&self, packages: &[String], dry_run: bool) -> Command;

    /// `purge` also removes configuration where the package manager supports it
    fn package_remove(&self, packages: &[String], purge: bool, dry_run: bool) -> Command;

    fn package_search(&self, query: &str) -> Command;

    fn package_info(&self, package: &str) -> Command;

    /// `filter` is a substring, passed to the package database as a glob
    fn package_list_installed(&self, filter: Option<&str>) -> Command;

    fn package_check_updates(&self) -> Command;

    /// Upgrade the named packages, or everything when `packages` is empty
    fn package_update(&self, packages: &[String], dry_run: bool) -> Command;

    fn package_history(&self) -> Command;

    // -------------------------------------------------------------------------
    // Firewall
    // -------------------------------------------------------------------------

    fn firewall_status(&self) -> Command;

    fn firewall_list_rules(&self) -> Command;

    fn firewall_add_rule(&self, rule: &FirewallRule, dry_run: bool) -> Command;

    fn firewall_remove_rule(&self, rule: &FirewallRule) -> Command;

    fn firewall_enable(&self) -> Command;

    fn firewall_disable(&self) -> Command;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    fn user_create(&self, params: &UserCreateParams) -> Command;

    fn user_delete(&self, username: &str, remove_home: bool) -> Command;

    fn user_modify(&self, username: &str, params: &UserModifyParams) -> Command;

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    fn service_control(&self, unit: &str, action: ServiceAction) -> Command;

    fn service_status(&self, unit: &str) -> Command;
}

/// Select the command set for the detected family
pub fn create_distro_commands(ctx: &DistroContext) -> Box<dyn DistroCommands> {
    match ctx.family {
        DistroFamily::Debian => Box::new(DebianCommands::new()),
        DistroFamily::Rhel => Box::new(RhelCommands::new()),
    }
}

// =============================================================================
// Shared renderers (systemd and shadow-utils are the same on both families)
// =============================================================================

pub(crate) fn systemctl_control(unit: &str, action: ServiceAction) -> Command {
    Command::new(["sudo", "systemctl", action.as_str(), unit])
}

pub(crate) fn systemctl_status(unit: &str) -> Command {
    Command::new(["systemctl", "status", unit, "--no-pager"])
}

pub(crate) fn usermod(username: &str, params: &UserModifyParams) -> Command {
    let mut argv: Vec<String> = vec!["sudo".into(), "usermod".into()];
    if let Some(shell) = &params.shell {
        argv.extend(["-s".into(), shell.clone()]);
    }
    if !params.groups.is_empty() {
        let flag = if params.append_groups { "-aG" } else { "-G" };
        argv.extend([flag.into(), params.groups.join(",")]);
    }
    if params.lock {
        argv.push("-L".into());
    }
    if params.unlock {
        argv.push("-U".into());
    }
    if let Some(comment) = &params.comment {
        argv.extend(["-c".into(), comment.clone()]);
    }
    argv.push(username.into());
    Command::new(argv)
}

/// Wrap a substring filter as a case-insensitive package-database glob.
/// A filter that already contains glob syntax is passed through as written.
pub(crate) fn filter_glob(filter: &str) -> String {
    if filter.contains(['*', '?', '[']) {
        return filter.to_string();
    }
    let mut glob = String::from("*");
    for c in filter.chars() {
        let (lower, upper) = (c.to_ascii_lowercase(), c.to_ascii_uppercase());
        if lower == upper {
            glob.push(c);
        } else {
            glob.extend(['[', lower, upper, ']']);
        }
    }
    glob.push('*');
    glob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_by_family() {
        let mut ctx = DistroContext::fallback();
        assert_eq!(create_distro_commands(&ctx).family(), DistroFamily::Debian);
        ctx.family = DistroFamily::Rhel;
        assert_eq!(create_distro_commands(&ctx).family(), DistroFamily::Rhel);
    }

    #[test]
    fn test_service_commands_are_shared() {
        let debian = DebianCommands::new();
        let rhel = RhelCommands::new();
        assert_eq!(
            debian.service_control("nginx", ServiceAction::Reload),
            rhel.service_control("nginx", ServiceAction::Reload)
        );
        assert_eq!(
            debian.service_status("sshd").argv,
            vec!["systemctl", "status", "sshd", "--no-pager"]
        );
    }

    #[test]
    fn test_usermod_replace_groups_and_lock() {
        let params = UserModifyParams {
            groups: vec!["wheel".into(), "docker".into()],
            append_groups: false,
            lock: true,
            ..Default::default()
        };
        assert_eq!(
            usermod("deploy", &params).render(),
            "sudo usermod -G wheel,docker -L deploy"
        );
    }

    #[test]
    fn test_filter_glob() {
        assert_eq!(filter_glob("ssl"), "*[sS][sS][lL]*");
        assert_eq!(filter_glob("Net-2"), "*[nN][eE][tT]-2*");
        assert_eq!(filter_glob("lib*-dev"), "lib*-dev");
    }
}
