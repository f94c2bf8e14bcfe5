//! Subcommand -> ToolRequest translation
//!
//! Each function renders the command through the distro command set, then
//! hands it to the runner so every call goes through the safety gate.

use crate::cli::{FwCommand, Guard, PkgCommand, RuleArgs, SvcAction, SvcArgs, UserCommand};
use serde_json::{json, Value};
use sysadmin_common::knowledge::KnowledgeProfile;
use sysadmin_common::response::ErrorResponse;
use sysadmin_common::{
    ErrorCategory, FirewallRule, SysadminContext, ToolRequest, ToolResponse, ToolSpec, UserCreateParams,
    UserModifyParams,
};
use tracing::debug;

async fn run_tool(ctx: &SysadminContext, tool: &str, req: ToolRequest) -> ToolResponse {
    match ToolSpec::find(tool) {
        Some(spec) => ctx.runner.run(spec, req).await,
        None => ToolResponse::Error(ErrorResponse {
            tool: tool.to_string(),
            target_host: ctx.target_host.clone(),
            duration_ms: None,
            command_executed: None,
            error_code: "UNKNOWN_TOOL".to_string(),
            error_category: ErrorCategory::Validation,
            message: format!("No tool named '{}'", tool),
            transient: false,
            remediation: Vec::new(),
        }),
    }
}

fn guarded(req: ToolRequest, guard: Guard) -> ToolRequest {
    req.confirmed(guard.confirmed).dry_run(guard.dry_run)
}

// =============================================================================
// Packages
// =============================================================================

pub async fn pkg(ctx: &SysadminContext, command: PkgCommand) -> ToolResponse {
    let cmds = ctx.commands.as_ref();
    match command {
        PkgCommand::Install { packages, guard } => {
            let req = ToolRequest::new(
                cmds.package_install(&packages, guard.dry_run),
                format!("Install packages: {}", packages.join(", ")),
            )
            .detail("packages", packages);
            run_tool(ctx, "pkg_install", guarded(req, guard)).await
        }
        PkgCommand::Remove { packages, guard } => {
            let req = ToolRequest::new(
                cmds.package_remove(&packages, false, guard.dry_run),
                format!("Remove packages: {}", packages.join(", ")),
            )
            .detail("packages", packages);
            run_tool(ctx, "pkg_remove", guarded(req, guard)).await
        }
        PkgCommand::Purge { packages, guard } => {
            let req = ToolRequest::new(
                cmds.package_remove(&packages, true, guard.dry_run),
                format!("Purge packages and configuration: {}", packages.join(", ")),
            )
            .detail("packages", packages);
            run_tool(ctx, "pkg_purge", guarded(req, guard)).await
        }
        PkgCommand::Update { packages, guard } => {
            let description = if packages.is_empty() {
                "Upgrade all packages".to_string()
            } else {
                format!("Upgrade packages: {}", packages.join(", "))
            };
            let req = ToolRequest::new(cmds.package_update(&packages, guard.dry_run), description)
                .detail("packages", packages);
            run_tool(ctx, "pkg_update", guarded(req, guard)).await
        }
        PkgCommand::Search { query } => {
            let req = ToolRequest::new(cmds.package_search(&query), format!("Search packages: {}", query));
            run_tool(ctx, "pkg_search", req).await
        }
        PkgCommand::Info { package } => {
            let req = ToolRequest::new(cmds.package_info(&package), format!("Package info: {}", package))
                .detail("package", package);
            run_tool(ctx, "pkg_info", req).await
        }
        PkgCommand::List { filter } => {
            let req = ToolRequest::new(
                cmds.package_list_installed(filter.as_deref()),
                "List installed packages",
            );
            run_tool(ctx, "pkg_list_installed", req).await
        }
        PkgCommand::CheckUpdates => {
            let req = ToolRequest::new(cmds.package_check_updates(), "Check for available updates");
            run_tool(ctx, "pkg_check_updates", req).await
        }
        PkgCommand::History => {
            let req = ToolRequest::new(cmds.package_history(), "Package transaction history");
            run_tool(ctx, "pkg_history", req).await
        }
    }
}

// =============================================================================
// Services
// =============================================================================

pub async fn svc(ctx: &SysadminContext, args: SvcArgs) -> ToolResponse {
    let SvcArgs { action, unit, guard } = args;
    let cmds = ctx.commands.as_ref();

    let Some(control) = action.control() else {
        return svc_status(ctx, &unit).await;
    };

    let tool = format!("svc_{}", control.as_str());
    let req = ToolRequest::new(
        cmds.service_control(&unit, control),
        format!("{} service {}", capitalize(control.as_str()), unit),
    )
    .service(unit.clone())
    .detail("unit", unit);
    run_tool(ctx, &tool, guarded(req, guard)).await
}

async fn svc_status(ctx: &SysadminContext, unit: &str) -> ToolResponse {
    let req = ToolRequest::new(
        ctx.commands.service_status(unit),
        format!("Status of service {}", unit),
    )
    .service(unit)
    .detail("unit", unit);
    let mut response = run_tool(ctx, "svc_status", req).await;

    if let Some(profile) = profile_for_unit(ctx, unit) {
        let checks = ctx.runner.health_checks(profile).await;
        debug!("{} health checks for {}", checks.len(), profile.id);
        if let ToolResponse::Success(success) = &mut response {
            if let Value::Object(data) = &mut success.data {
                data.insert("profile".to_string(), json!(profile.id));
                data.insert("health_checks".to_string(), json!(checks));
            }
        }
    }
    response
}

fn profile_for_unit<'a>(ctx: &'a SysadminContext, unit: &str) -> Option<&'a KnowledgeProfile> {
    ctx.knowledge
        .resolved()
        .iter()
        .map(|r| &r.profile)
        .find(|p| p.matches_units([unit]))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Firewall
// =============================================================================

fn rule_from(args: RuleArgs) -> FirewallRule {
    FirewallRule {
        action: args.action.into(),
        direction: args.direction.into(),
        port: args.port,
        protocol: args.protocol.into(),
        source: args.source,
        destination: args.destination,
        comment: args.comment,
    }
}

fn describe_rule(rule: &FirewallRule) -> String {
    format!(
        "{} {} port {}/{}",
        rule.action.as_str(),
        rule.direction.as_str(),
        rule.port,
        rule.protocol.as_str()
    )
}

pub async fn fw(ctx: &SysadminContext, command: FwCommand) -> ToolResponse {
    let cmds = ctx.commands.as_ref();
    match command {
        FwCommand::Status => {
            run_tool(ctx, "fw_status", ToolRequest::new(cmds.firewall_status(), "Firewall status")).await
        }
        FwCommand::List => {
            run_tool(ctx, "fw_list", ToolRequest::new(cmds.firewall_list_rules(), "List firewall rules")).await
        }
        FwCommand::Add { rule, guard } => {
            let rule = rule_from(rule);
            let req = ToolRequest::new(
                cmds.firewall_add_rule(&rule, guard.dry_run),
                format!("Add firewall rule: {}", describe_rule(&rule)),
            )
            .detail("rule", json!(rule));
            run_tool(ctx, "fw_add", guarded(req, guard)).await
        }
        FwCommand::Remove { rule, guard } => {
            let rule = rule_from(rule);
            let req = ToolRequest::new(
                cmds.firewall_remove_rule(&rule),
                format!("Remove firewall rule: {}", describe_rule(&rule)),
            )
            .detail("rule", json!(rule));
            run_tool(ctx, "fw_remove", guarded(req, guard)).await
        }
        FwCommand::Enable { guard } => {
            let req = ToolRequest::new(cmds.firewall_enable(), "Enable the firewall");
            run_tool(ctx, "fw_enable", guarded(req, guard)).await
        }
        FwCommand::Disable { guard } => {
            let req = ToolRequest::new(cmds.firewall_disable(), "Disable the firewall");
            run_tool(ctx, "fw_disable", guarded(req, guard)).await
        }
    }
}

// =============================================================================
// Users
// =============================================================================

pub async fn user(ctx: &SysadminContext, command: UserCommand) -> ToolResponse {
    let cmds = ctx.commands.as_ref();
    match command {
        UserCommand::Create {
            username,
            shell,
            home,
            groups,
            system,
            comment,
            guard,
        } => {
            let params = UserCreateParams {
                username,
                shell,
                home,
                groups,
                system,
                comment,
            };
            let req = ToolRequest::new(
                cmds.user_create(&params),
                format!("Create user {}", params.username),
            )
            .detail("username", params.username.clone());
            run_tool(ctx, "user_create", guarded(req, guard)).await
        }
        UserCommand::Delete {
            username,
            remove_home,
            guard,
        } => {
            let description = if remove_home {
                format!("Delete user {} and their home directory", username)
            } else {
                format!("Delete user {}", username)
            };
            let req = ToolRequest::new(cmds.user_delete(&username, remove_home), description)
                .detail("username", username);
            run_tool(ctx, "user_delete", guarded(req, guard)).await
        }
        UserCommand::Modify {
            username,
            shell,
            groups,
            replace_groups,
            lock,
            unlock,
            comment,
            guard,
        } => {
            let params = UserModifyParams {
                shell,
                groups,
                append_groups: !replace_groups,
                lock,
                unlock,
                comment,
            };
            let req = ToolRequest::new(
                cmds.user_modify(&username, &params),
                format!("Modify user {}", username),
            )
            .detail("username", username);
            run_tool(ctx, "user_modify", guarded(req, guard)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("restart"), "Restart");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_every_service_action_has_a_tool() {
        for action in [
            SvcAction::Start,
            SvcAction::Stop,
            SvcAction::Restart,
            SvcAction::Reload,
            SvcAction::Enable,
            SvcAction::Disable,
        ] {
            let control = action.control().unwrap();
            let tool = format!("svc_{}", control.as_str());
            assert!(ToolSpec::find(&tool).is_some(), "{}", tool);
        }
        assert!(SvcAction::Status.control().is_none());
    }
}
