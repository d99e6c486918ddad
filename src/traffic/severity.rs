use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Packets strictly larger than this many bytes are `High`.
pub const HIGH_LENGTH_THRESHOLD: u64 = 120;
/// Packets strictly larger than this many bytes (and not `High`) are `Medium`.
pub const MEDIUM_LENGTH_THRESHOLD: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Classify a packet by its byte length. Total: every length maps to a label.
    pub fn classify_length(length: u64) -> Self {
        if length > HIGH_LENGTH_THRESHOLD {
            Severity::High
        } else if length > MEDIUM_LENGTH_THRESHOLD {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Map a CVSS base score onto the dashboard's three levels.
    pub fn from_cvss(score: f64) -> Self {
        if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_thresholds() {
        assert_eq!(Severity::classify_length(0), Severity::Low);
        assert_eq!(Severity::classify_length(60), Severity::Low);
        assert_eq!(Severity::classify_length(61), Severity::Medium);
        assert_eq!(Severity::classify_length(120), Severity::Medium);
        assert_eq!(Severity::classify_length(121), Severity::High);
        assert_eq!(Severity::classify_length(u64::MAX), Severity::High);
    }

    #[test]
    fn test_cvss_mapping() {
        assert_eq!(Severity::from_cvss(9.8), Severity::High);
        assert_eq!(Severity::from_cvss(7.0), Severity::High);
        assert_eq!(Severity::from_cvss(6.9), Severity::Medium);
        assert_eq!(Severity::from_cvss(4.0), Severity::Medium);
        assert_eq!(Severity::from_cvss(0.0), Severity::Low);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
        assert_eq!(" medium ".parse::<Severity>(), Ok(Severity::Medium));
        assert!("critical".parse::<Severity>().is_err());
        assert_eq!(Severity::Low.to_string(), "Low");
    }
}
