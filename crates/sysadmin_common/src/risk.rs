//! Risk levels and duration categories
//!
//! Every tool declares a static base risk level. The safety gate may raise it
//! (never lower it) when an active knowledge profile's interaction matches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Risk Level
// =============================================================================

/// Ordered risk classification: read-only < moderate < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "read-only")]
    ReadOnly,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "critical")]
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::ReadOnly => "read-only",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, RiskLevel::ReadOnly)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read-only" => Ok(RiskLevel::ReadOnly),
            "moderate" => Ok(RiskLevel::Moderate),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

// =============================================================================
// Duration Category
// =============================================================================

/// How long a tool's command is expected to run; maps to a timeout ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationCategory {
    Instant,
    Quick,
    Normal,
    Slow,
    LongRunning,
}

impl DurationCategory {
    /// Absolute timeout for this category before any configured ceiling
    pub fn timeout(&self) -> Duration {
        match self {
            DurationCategory::Instant => Duration::from_millis(5_000),
            DurationCategory::Quick => Duration::from_millis(15_000),
            DurationCategory::Normal => Duration::from_millis(30_000),
            DurationCategory::Slow => Duration::from_millis(60_000),
            DurationCategory::LongRunning => Duration::from_millis(300_000),
        }
    }

    /// Timeout clamped by a deployment ceiling in seconds (0 = no ceiling)
    pub fn timeout_with_ceiling(&self, ceiling_secs: u64) -> Duration {
        let base = self.timeout();
        if ceiling_secs == 0 {
            return base;
        }
        base.min(Duration::from_secs(ceiling_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::ReadOnly < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::Moderate.max(RiskLevel::High), RiskLevel::High);
    }

    #[test]
    fn test_risk_serde_names() {
        let json = serde_json::to_string(&RiskLevel::ReadOnly).unwrap();
        assert_eq!(json, "\"read-only\"");
        let parsed: RiskLevel = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, RiskLevel::Critical);
        assert!("low".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_timeout_ceiling() {
        assert_eq!(DurationCategory::Slow.timeout_with_ceiling(0), Duration::from_secs(60));
        assert_eq!(DurationCategory::Slow.timeout_with_ceiling(10), Duration::from_secs(10));
        assert_eq!(DurationCategory::Instant.timeout_with_ceiling(600), Duration::from_secs(5));
    }
}
