use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use crate::analysis::anomalies::decode_anomalies;
use crate::analysis::vulnerabilities::decode_feed;
use crate::analysis::{Anomaly, Vulnerability};
use crate::capture::records::{decode_results, DecodeError, Decoded};
use crate::capture::PacketRecord;
use crate::config::ApiConfig;
use crate::session::{Credentials, SignupForm, User};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },

    #[error("HTTP client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default)]
    pub findings: Vec<Finding>,
}

/// Client for the local capture/anomaly API.
///
/// No retries and, unless configured, no timeout: a failed call is handed
/// straight back to the caller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    feed_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs.filter(|s| *s > 0) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(ApiError::Setup)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            feed_url: config.vulnerability_feed_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /api/results`: the latest batch of captured packets.
    pub async fn fetch_recent(&self) -> Result<Decoded<PacketRecord>, ApiError> {
        let url = self.endpoint("/api/results");
        let body = self.read_body(&url, self.http.get(&url)).await?;
        let decoded = decode_results(&body).map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;
        log_rejected(&url, &decoded);
        debug!("Fetched {} packet record(s)", decoded.items.len());
        Ok(decoded)
    }

    pub async fn start_capture(&self) -> Result<(), ApiError> {
        let url = self.endpoint("/api/start");
        self.read_body(&url, self.http.post(&url)).await?;
        info!("Upstream capture started");
        Ok(())
    }

    pub async fn stop_capture(&self) -> Result<(), ApiError> {
        let url = self.endpoint("/api/stop");
        self.read_body(&url, self.http.post(&url)).await?;
        info!("Upstream capture stopped");
        Ok(())
    }

    /// `GET /anomalies?email=...`
    pub async fn fetch_anomalies(&self, email: &str) -> Result<Decoded<Anomaly>, ApiError> {
        let url = self.endpoint("/anomalies");
        let request = self.http.get(&url).query(&[("email", email)]);
        let body = self.read_body(&url, request).await?;
        let decoded = decode_anomalies(&body).map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;
        log_rejected(&url, &decoded);
        Ok(decoded)
    }

    pub async fn fetch_vulnerabilities(&self) -> Result<Decoded<Vulnerability>, ApiError> {
        let url = self.feed_url.clone();
        let body = self.read_body(&url, self.http.get(&url)).await?;
        let decoded = decode_feed(&body).map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;
        log_rejected(&url, &decoded);
        Ok(decoded)
    }

    /// `POST /scan` with `{domain, email}`.
    pub async fn scan(&self, domain: &str, email: &str) -> Result<ScanReport, ApiError> {
        let url = self.endpoint("/scan");
        let request = self.http.post(&url).json(&json!({ "domain": domain, "email": email }));
        let body = self.read_body(&url, request).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            url,
            source: DecodeError::Json(e.to_string()),
        })
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let url = self.endpoint("/login");
        let request = self.http.post(&url).json(credentials);
        self.read_user(&url, request, None).await
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<User, ApiError> {
        let url = self.endpoint("/signup");
        let request = self.http.post(&url).json(form);
        self.read_user(&url, request, Some(&form.name)).await
    }

    async fn read_user(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
        known_name: Option<&str>,
    ) -> Result<User, ApiError> {
        let body = self.read_body(url, request).await?;
        let value: Value = serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            source: DecodeError::Json(e.to_string()),
        })?;

        // Some backends answer 200 with an error payload instead of a user.
        if let Some(message) = error_message(&value) {
            return Err(ApiError::Rejected {
                url: url.to_string(),
                status: 200,
                message,
            });
        }

        User::from_value(&value, known_name).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn read_body(&self, url: &str, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status.is_success() {
            Ok(body)
        } else {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            Err(ApiError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// `{"error": "..."}` or `{"message": "..."}` without user fields.
fn error_message(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if object.contains_key("id") || object.contains_key("user") {
        return None;
    }
    object
        .get("error")
        .or_else(|| object.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn log_rejected<T>(url: &str, decoded: &Decoded<T>) {
    for error in &decoded.rejected {
        warn!("Skipping entry from {}: {}", url, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response and hand back the request head and body.
    async fn serve_once(status: u16, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if received.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&received).to_string());
        });

        (format!("http://{}", addr), rx)
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            vulnerability_feed_url: format!("{}/cve", base_url),
            request_timeout_secs: Some(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joining() {
        let client = client("http://localhost:5000/");
        assert_eq!(client.endpoint("/api/results"), "http://localhost:5000/api/results");
        assert_eq!(client.endpoint("scan"), "http://localhost:5000/scan");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(&json!({"error": "bad password"})), Some("bad password".to_string()));
        assert_eq!(error_message(&json!({"message": "exists"})), Some("exists".to_string()));
        assert_eq!(error_message(&json!({"id": 1, "message": "welcome"})), None);
        assert_eq!(error_message(&json!([])), None);
    }

    #[tokio::test]
    async fn test_fetch_recent() {
        let (base, request) = serve_once(
            200,
            r#"{"recent": [{"time": "10:15", "protocol": "TCP", "source": "10.0.0.24", "length": "80", "isAnomalous": true}]}"#,
        )
        .await;

        let decoded = client(&base).fetch_recent().await.unwrap();
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].length, 80);
        assert!(request.await.unwrap().starts_with("GET /api/results "));
    }

    #[tokio::test]
    async fn test_fetch_anomalies_sends_email() {
        let (base, request) = serve_once(
            200,
            r#"[{"id": "a1", "timestamp": "2024-05-01T10:15:00Z", "type": "DDoS", "source": "10.0.0.24", "severity": "High", "status": "Active", "impact": 90}]"#,
        )
        .await;

        let decoded = client(&base).fetch_anomalies("analyst@example.com").await.unwrap();
        assert_eq!(decoded.items[0].kind, "DDoS");
        assert!(request.await.unwrap().starts_with("GET /anomalies?email=analyst%40example.com "));
    }

    #[tokio::test]
    async fn test_non_success_is_rejected() {
        let (base, _request) = serve_once(500, r#"{"error": "capture backend offline"}"#).await;

        match client(&base).start_capture().await {
            Err(ApiError::Rejected { status, message, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "capture backend offline");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let (base, request) = serve_once(200, r#"{"id": 3, "email": "analyst@example.com", "name": "Analyst"}"#).await;

        let user = client(&base)
            .login(&Credentials::new("analyst@example.com", "hunter22"))
            .await
            .unwrap();
        assert_eq!(user.id, "3");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /login "));
        assert!(request.contains(r#""password":"hunter22""#));
    }

    #[tokio::test]
    async fn test_signup_keeps_submitted_name() {
        let (base, request) = serve_once(201, r#"{"id": "u-42", "email": "gh@navy.mil"}"#).await;

        let user = client(&base)
            .signup(&SignupForm::new("Grace Hopper", "gh@navy.mil", "cobol59"))
            .await
            .unwrap();
        assert_eq!(user.id, "u-42");
        assert_eq!(user.name, "Grace Hopper");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /signup "));
        assert!(request.contains(r#""name":"Grace Hopper""#));
    }

    #[tokio::test]
    async fn test_login_error_payload() {
        let (base, _request) = serve_once(200, r#"{"error": "Invalid credentials"}"#).await;

        let result = client(&base)
            .login(&Credentials::new("analyst@example.com", "hunter22"))
            .await;
        assert!(matches!(result, Err(ApiError::Rejected { message, .. }) if message == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_scan_findings() {
        let (base, request) = serve_once(
            200,
            r#"{"findings": [{"type": "TLS", "message": "Certificate expires in 5 days"}]}"#,
        )
        .await;

        let report = client(&base).scan("example.com", "analyst@example.com").await.unwrap();
        assert_eq!(report.findings[0].kind, "TLS");
        assert!(request.await.unwrap().contains(r#""domain":"example.com""#));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        assert!(matches!(
            client(&base).fetch_recent().await,
            Err(ApiError::Transport { .. })
        ));
    }
}
