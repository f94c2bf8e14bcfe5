//! sysadminctl - guarded administration of the local Linux host

use anyhow::Result;
use clap::Parser;
use sysadmin_common::logging::init_tracing;
use sysadminctl::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");

    let cli = Cli::parse();
    let output = sysadminctl::run(cli).await?;
    println!("{}", output.to_json_pretty()?);

    let code = output.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
