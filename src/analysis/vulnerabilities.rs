//! Vulnerability feed mapping.
//!
//! The feed returns raw CVE items; each one is mapped onto the same card
//! shape the anomaly log uses, with severity derived from the CVSS score.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use crate::analysis::AnomalyStatus;
use crate::capture::records::{scalar_to_string, DecodeError, Decoded};
use crate::traffic::Severity;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vulnerability {
    pub id: String,
    pub timestamp: String,
    pub kind: String,
    pub source: String,
    pub severity: Severity,
    pub status: AnomalyStatus,
    pub impact: f64,
    pub title: String,
    pub description: String,
    pub references: Vec<String>,
}

impl Vulnerability {
    pub fn from_value(value: &Value, path: &str, index: usize) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
            path: path.to_string(),
            expected: "a CVE object",
        })?;

        let id = object
            .get("id")
            .map(scalar_to_string)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("cve-{}", index));
        let timestamp = object
            .get("Published")
            .map(scalar_to_string)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let description = object.get("summary").map(scalar_to_string).unwrap_or_default();
        let kind = description
            .split_whitespace()
            .next()
            .unwrap_or("Vulnerability")
            .to_string();
        let raw_cvss = object.get("cvss");
        let cvss = raw_cvss.and_then(cvss_score);
        // The score is shown as the feed wrote it; zero reads as unscored.
        let source = match (cvss, raw_cvss) {
            (Some(score), Some(raw)) if score != 0.0 => format!("CVSS: {}", scalar_to_string(raw).trim()),
            _ => "Unknown".to_string(),
        };
        let references = object
            .get("references")
            .and_then(Value::as_array)
            .map(|refs| refs.iter().filter_map(reference_url).collect())
            .unwrap_or_default();

        Ok(Self {
            title: id.clone(),
            id,
            timestamp,
            kind,
            source,
            severity: Severity::from_cvss(cvss.unwrap_or(0.0)),
            status: AnomalyStatus::Active,
            impact: cvss.unwrap_or(0.0),
            description,
            references,
        })
    }
}

/// Decode the CVE feed. Anything but a top-level array is an error.
pub fn decode_feed(body: &str) -> Result<Decoded<Vulnerability>, DecodeError> {
    let root: Value = serde_json::from_str(body).map_err(|e| DecodeError::Json(e.to_string()))?;
    let entries = root.as_array().ok_or_else(|| DecodeError::UnexpectedShape {
        path: "$".to_string(),
        expected: "an array of CVE items",
    })?;
    Ok(Decoded::from_array(entries, "$", Vulnerability::from_value))
}

fn cvss_score(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.filter(|s| s.is_finite())
}

fn reference_url(reference: &Value) -> Option<String> {
    let url = match reference {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str)?,
        _ => return None,
    };
    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_mapping() {
        let body = r#"[
            {"id": "CVE-2024-0001", "Published": "2024-04-30T12:00:00", "summary": "Buffer overflow in parser",
             "cvss": 9.8, "references": ["https://a.example", {"url": "https://b.example"}, {"name": "x"}, ""]},
            {"summary": "", "cvss": "5.0"},
            {},
            {"id": "CVE-2024-0004", "cvss": 0}
        ]"#;

        let decoded = decode_feed(body).unwrap();
        assert!(decoded.rejected.is_empty());
        let items = decoded.items;

        assert_eq!(items[0].kind, "Buffer");
        assert_eq!(items[0].severity, Severity::High);
        assert_eq!(items[0].source, "CVSS: 9.8");
        assert_eq!(items[0].title, "CVE-2024-0001");
        assert_eq!(items[0].references, vec!["https://a.example", "https://b.example"]);

        assert_eq!(items[1].id, "cve-1");
        assert_eq!(items[1].kind, "Vulnerability");
        assert_eq!(items[1].severity, Severity::Medium);
        assert_eq!(items[1].source, "CVSS: 5.0");
        assert_eq!(items[1].impact, 5.0);

        assert_eq!(items[3].source, "Unknown");
        assert_eq!(items[3].severity, Severity::Low);

        assert_eq!(items[2].source, "Unknown");
        assert_eq!(items[2].severity, Severity::Low);
        assert_eq!(items[2].impact, 0.0);
        assert!(!items[2].timestamp.is_empty());
    }

    #[test]
    fn test_feed_must_be_array() {
        assert!(matches!(
            decode_feed(r#"{"cves": []}"#),
            Err(DecodeError::UnexpectedShape { .. })
        ));
        let decoded = decode_feed("[1]").unwrap();
        assert_eq!(decoded.rejected.len(), 1);
    }
}
