use chrono::{DateTime, FixedOffset};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use crate::capture::records::{required_string, scalar_to_string, DecodeError, Decoded};
use crate::traffic::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnomalyStatus {
    Active,
    Resolved,
}

impl AnomalyStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(AnomalyStatus::Active),
            "resolved" => Some(AnomalyStatus::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnomalyStatus::Active => write!(f, "Active"),
            AnomalyStatus::Resolved => write!(f, "Resolved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub id: String,
    pub timestamp: String,
    pub kind: String,
    pub source: String,
    pub severity: Severity,
    pub status: AnomalyStatus,
    pub impact: u32,
}

impl Anomaly {
    pub fn from_value(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
            path: path.to_string(),
            expected: "an anomaly object",
        })?;

        let id = required_string(object, "id", path)?;
        let kind = required_string(object, "type", path)?;
        let timestamp = object.get("timestamp").map(scalar_to_string).unwrap_or_default();
        let source = object
            .get("source")
            .map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        // Unrecognised severities are shown as High rather than hidden.
        let raw_severity = object.get("severity").map(scalar_to_string).unwrap_or_default();
        let severity = raw_severity.parse::<Severity>().unwrap_or_else(|_| {
            warn!("Anomaly at {} has severity '{}', treating as High", path, raw_severity);
            Severity::High
        });

        let raw_status = required_string(object, "status", path)?;
        let status = AnomalyStatus::parse(&raw_status).ok_or_else(|| DecodeError::InvalidField {
            path: path.to_string(),
            field: "status",
            reason: format!("unknown status '{}'", raw_status),
        })?;

        let impact = object
            .get("impact")
            .and_then(Value::as_f64)
            .filter(|i| i.is_finite() && *i >= 0.0)
            .map(|i| i.round().min(u32::MAX as f64) as u32)
            .unwrap_or(0);

        Ok(Self {
            id,
            timestamp,
            kind,
            source,
            severity,
            status,
            impact,
        })
    }

    pub fn occurred_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.timestamp.trim()).ok()
    }

    pub fn is_active(&self) -> bool {
        self.status == AnomalyStatus::Active
    }
}

/// Decode the array returned by `GET /anomalies`.
pub fn decode_anomalies(body: &str) -> Result<Decoded<Anomaly>, DecodeError> {
    let root: Value = serde_json::from_str(body).map_err(|e| DecodeError::Json(e.to_string()))?;
    let entries = root.as_array().ok_or_else(|| DecodeError::UnexpectedShape {
        path: "$".to_string(),
        expected: "an array of anomalies",
    })?;
    Ok(Decoded::from_array(entries, "$", |value, path, _| Anomaly::from_value(value, path)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Resolved,
}

impl StatusFilter {
    pub fn matches(&self, anomaly: &Anomaly) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => anomaly.status == AnomalyStatus::Active,
            StatusFilter::Resolved => anomaly.status == AnomalyStatus::Resolved,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::Resolved,
            StatusFilter::Resolved => StatusFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All Status",
            StatusFilter::Active => "Active",
            StatusFilter::Resolved => "Resolved",
        }
    }

    pub fn apply<'a>(&self, anomalies: &'a [Anomaly]) -> Vec<&'a Anomaly> {
        anomalies.iter().filter(|a| self.matches(a)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalySummary {
    pub total: usize,
    pub active: usize,
    pub resolved: usize,
    pub high_severity: usize,
    pub resolution_rate: f64, // percentage
}

impl AnomalySummary {
    pub fn from_anomalies(anomalies: &[Anomaly]) -> Self {
        let total = anomalies.len();
        let active = anomalies.iter().filter(|a| a.is_active()).count();
        let high_severity = anomalies.iter().filter(|a| a.severity == Severity::High).count();
        let resolved = total - active;
        let resolution_rate = if total > 0 {
            (resolved as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self {
            total,
            active,
            resolved,
            high_severity,
            resolution_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeShare {
    pub kind: String,
    pub count: usize,
    pub percentage: f64,
}

/// Anomaly counts per type, largest first, ties broken by name.
pub fn type_distribution(anomalies: &[Anomaly]) -> Vec<TypeShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for anomaly in anomalies {
        *counts.entry(anomaly.kind.as_str()).or_insert(0) += 1;
    }

    let total = anomalies.len();
    let mut shares: Vec<TypeShare> = counts
        .into_iter()
        .map(|(kind, count)| TypeShare {
            kind: kind.to_string(),
            count,
            percentage: (count as f64 / total as f64) * 100.0,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));
    shares
}
