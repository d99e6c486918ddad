pub mod anomalies;
pub mod statistics;
pub mod vulnerabilities;

pub use anomalies::{Anomaly, AnomalyStatus, AnomalySummary, StatusFilter, TypeShare};
pub use statistics::{ProtocolShare, TrafficSummary};
pub use vulnerabilities::Vulnerability;
