//! Running systemd unit inventory, used to decide which profiles are active

use crate::command::Command;
use crate::executor::Executor;
use std::time::Duration;
use tracing::{debug, warn};

const LIST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn list_units_command() -> Command {
    Command::new([
        "systemctl",
        "list-units",
        "--type=service",
        "--state=running",
        "--no-pager",
        "--no-legend",
        "--plain",
    ])
}

/// First column of each line, `.service` suffix removed
pub fn parse_unit_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        // Some systemd versions prefix odd units with a bullet column
        .filter_map(|line| line.split_whitespace().find(|t| *t != "●" && *t != "*"))
        .map(|name| name.strip_suffix(".service").unwrap_or(name).to_string())
        .collect()
}

/// Running service names; any failure yields an empty inventory
pub async fn list_active_units(executor: &dyn Executor) -> Vec<String> {
    match executor.execute(&list_units_command(), LIST_TIMEOUT).await {
        Ok(result) if result.success() => {
            let units = parse_unit_list(&result.stdout);
            debug!("{} running services", units.len());
            units
        }
        Ok(result) => {
            warn!(
                "systemctl list-units exited {}: {}",
                result.exit_code,
                result.stderr.trim()
            );
            Vec::new()
        }
        Err(e) => {
            warn!("Could not list running units: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_list() {
        let out = "\
cron.service            loaded active running Regular background program processing daemon
ssh.service             loaded active running OpenBSD Secure Shell server
systemd-journald.service loaded active running Journal Service
";
        assert_eq!(parse_unit_list(out), vec!["cron", "ssh", "systemd-journald"]);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_unit_list("").is_empty());
        assert!(parse_unit_list("\n\n").is_empty());
        assert_eq!(parse_unit_list("● nginx.service loaded active running nginx"), vec!["nginx"]);
    }
}
