//! sysadminctl - command-line front end for sysadmin_common
//!
//! Every subcommand prints one JSON document on stdout. Logs go to stderr.

pub mod cli;
pub mod ops;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use serde::Serialize;
use sysadmin_common::{detect, ResolvedProfile, SysadminConfig, SysadminContext, ToolResponse};

/// What a subcommand produced
#[derive(Debug)]
pub enum Output {
    /// Gated tool call
    Tool(ToolResponse),
    /// Informational document (detect, session, knowledge)
    Info(serde_json::Value),
}

impl Output {
    pub fn to_json_pretty(&self) -> Result<String> {
        match self {
            Output::Tool(response) => Ok(response.to_json_pretty()),
            Output::Info(value) => {
                serde_json::to_string_pretty(value).context("Failed to serialize output")
            }
        }
    }

    /// Tool calls that did not succeed exit non-zero
    pub fn exit_code(&self) -> i32 {
        match self {
            Output::Tool(response) if !response.is_success() => 1,
            _ => 0,
        }
    }
}

fn info<T: Serialize>(value: &T) -> Result<Output> {
    Ok(Output::Info(
        serde_json::to_value(value).context("Failed to serialize output")?,
    ))
}

/// Run one parsed invocation
pub async fn run(cli: Cli) -> Result<Output> {
    // detect needs neither sudo nor the knowledge base
    if let Commands::Detect = cli.command {
        let path = cli.config.clone();
        let distro = tokio::task::spawn_blocking(move || -> Result<_> {
            let loaded = SysadminConfig::load(path.as_deref())?;
            Ok(detect(&loaded.config.distro))
        })
        .await
        .context("Detection task failed")??;
        return info(&distro);
    }

    let ctx = SysadminContext::bootstrap(cli.config.as_deref())
        .await
        .context("Startup failed")?;
    dispatch(&ctx, cli.command).await
}

/// Run a subcommand against an already-built context
pub async fn dispatch(ctx: &SysadminContext, command: Commands) -> Result<Output> {
    match command {
        Commands::Detect => info(ctx.distro.as_ref()),
        Commands::Session => info(&ctx.session_info()),
        Commands::Knowledge { all, id } => knowledge(ctx, all, id),
        Commands::Pkg(cmd) => Ok(Output::Tool(ops::pkg(ctx, cmd).await)),
        Commands::Svc(args) => Ok(Output::Tool(ops::svc(ctx, args).await)),
        Commands::Fw(cmd) => Ok(Output::Tool(ops::fw(ctx, cmd).await)),
        Commands::User(cmd) => Ok(Output::Tool(ops::user(ctx, cmd).await)),
    }
}

fn knowledge(ctx: &SysadminContext, all: bool, id: Option<String>) -> Result<Output> {
    if let Some(id) = id {
        let profile = ctx
            .knowledge
            .resolved()
            .iter()
            .find(|r| r.profile.id == id)
            .with_context(|| format!("No knowledge profile with id '{}'", id))?;
        return info(profile);
    }

    let profiles: Vec<&ResolvedProfile> = if all {
        ctx.knowledge.resolved().iter().collect()
    } else {
        ctx.knowledge.active_profiles()
    };
    info(&serde_json::json!({
        "profiles": profiles,
        "escalations": ctx.knowledge.escalations(),
        "load_errors": ctx.knowledge.load_errors(),
    }))
}
