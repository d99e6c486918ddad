use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("malformed JSON payload: {0}")]
    Json(String),

    #[error("expected {expected} at `{path}`")]
    UnexpectedShape { path: String, expected: &'static str },

    #[error("missing field `{field}` at `{path}`")]
    MissingField { path: String, field: &'static str },

    #[error("invalid `{field}` at `{path}`: {reason}")]
    InvalidField {
        path: String,
        field: &'static str,
        reason: String,
    },
}

/// A decoded batch. Entries that could not be decoded are kept as errors
/// so one bad entry does not blank a whole view.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub rejected: Vec<DecodeError>,
}

impl<T> Decoded<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Decode each element of a JSON array with `decode`, collecting failures.
    pub fn from_array<F>(items: &[Value], path: &str, mut decode: F) -> Self
    where
        F: FnMut(&Value, &str, usize) -> Result<T, DecodeError>,
    {
        let mut decoded = Self::empty();
        for (index, value) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", path, index);
            match decode(value, &item_path, index) {
                Ok(item) => decoded.items.push(item),
                Err(e) => decoded.rejected.push(e),
            }
        }
        decoded
    }
}

/// A captured packet as reported by `GET /api/results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    pub time: String,
    pub protocol: String,
    pub source: String,
    pub length: u64,
    pub is_anomalous: bool,
}

impl PacketRecord {
    pub fn new(time: &str, protocol: &str, source: &str, length: u64, is_anomalous: bool) -> Self {
        Self {
            time: time.to_string(),
            protocol: protocol.to_string(),
            source: source.to_string(),
            length,
            is_anomalous,
        }
    }

    /// Lenient on field values, strict on shape: only a non-object entry is
    /// rejected. A bad length becomes 0, a missing protocol becomes "Unknown".
    pub fn from_value(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
            path: path.to_string(),
            expected: "a packet object",
        })?;

        let time = object.get("time").map(scalar_to_string).unwrap_or_default();
        let protocol = object
            .get("protocol")
            .map(scalar_to_string)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let source = object
            .get("source")
            .map(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let length = parse_length(object.get("length"));
        let is_anomalous = parse_flag(object.get("isAnomalous").or_else(|| object.get("is_anomalous")));

        Ok(Self {
            time,
            protocol,
            source,
            length,
            is_anomalous,
        })
    }
}

/// Decode the `{ recent: [...] }` envelope of `GET /api/results`.
pub fn decode_results(body: &str) -> Result<Decoded<PacketRecord>, DecodeError> {
    let root: Value = serde_json::from_str(body).map_err(|e| DecodeError::Json(e.to_string()))?;
    let object = root.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
        path: "$".to_string(),
        expected: "an object",
    })?;
    let recent = object.get("recent").ok_or_else(|| DecodeError::MissingField {
        path: "$".to_string(),
        field: "recent",
    })?;
    let entries = recent.as_array().ok_or_else(|| DecodeError::UnexpectedShape {
        path: "$.recent".to_string(),
        expected: "an array",
    })?;

    Ok(Decoded::from_array(entries, "$.recent", |value, path, _| {
        PacketRecord::from_value(value, path)
    }))
}

/// Byte length from a numeric string or number. Anything else, including
/// negatives and fractions that do not survive truncation, is 0.
pub fn parse_length(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Boolean-like flag: `true`, `"true"`, `"yes"`, `1`, `"1"` are set.
pub fn parse_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        _ => false,
    }
}

/// Render a JSON scalar as text; `null` and containers become empty.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub(crate) fn required_string(
    object: &serde_json::Map<String, Value>,
    field: &'static str,
    path: &str,
) -> Result<String, DecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField {
            path: path.to_string(),
            field,
        }),
        Some(value @ (Value::String(_) | Value::Number(_))) => Ok(scalar_to_string(value)),
        Some(_) => Err(DecodeError::InvalidField {
            path: path.to_string(),
            field,
            reason: "expected a string or number".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_length_defaults_to_zero() {
        assert_eq!(parse_length(Some(&json!("1500"))), 1500);
        assert_eq!(parse_length(Some(&json!(" 64 "))), 64);
        assert_eq!(parse_length(Some(&json!(98))), 98);
        assert_eq!(parse_length(Some(&json!("12.7"))), 12);
        assert_eq!(parse_length(Some(&json!("abc"))), 0);
        assert_eq!(parse_length(Some(&json!("-5"))), 0);
        assert_eq!(parse_length(Some(&json!(-5))), 0);
        assert_eq!(parse_length(Some(&json!(null))), 0);
        assert_eq!(parse_length(None), 0);
    }

    #[test]
    fn test_flag_is_boolean_like() {
        assert!(parse_flag(Some(&json!(true))));
        assert!(parse_flag(Some(&json!("True"))));
        assert!(parse_flag(Some(&json!(1))));
        assert!(!parse_flag(Some(&json!(0))));
        assert!(!parse_flag(Some(&json!("false"))));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_decode_results_keeps_bad_lengths() {
        let body = r#"{"recent": [
            {"time": "2024-05-01T10:15:02Z", "protocol": "TCP", "source": "10.0.0.24", "length": "80", "isAnomalous": true},
            {"time": "10:16", "source": "fe80::1", "length": "oops", "isAnomalous": false},
            42
        ]}"#;

        let decoded = decode_results(body).unwrap();
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.rejected.len(), 1);

        let first = &decoded.items[0];
        assert_eq!(first.length, 80);
        assert!(first.is_anomalous);

        let second = &decoded.items[1];
        assert_eq!(second.protocol, "Unknown");
        assert_eq!(second.length, 0);
        assert!(matches!(
            &decoded.rejected[0],
            DecodeError::UnexpectedShape { path, .. } if path == "$.recent[2]"
        ));
    }

    #[test]
    fn test_decode_results_envelope_errors() {
        assert!(matches!(decode_results("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode_results(r#"{"packets": []}"#),
            Err(DecodeError::MissingField { field: "recent", .. })
        ));
        assert!(matches!(
            decode_results(r#"{"recent": {}}"#),
            Err(DecodeError::UnexpectedShape { .. })
        ));
        assert_eq!(decode_results(r#"{"recent": []}"#).unwrap().items.len(), 0);
    }
}
