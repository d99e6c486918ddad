// Library exports for anomaly-dashboard
pub mod analysis;
pub mod capture;
pub mod config;
pub mod session;
pub mod traffic;
pub mod ui;
pub mod utils;
pub mod visualization;

pub use analysis::{anomalies, statistics, vulnerabilities};
pub use capture::{client, mock, records};
pub use config::settings;
pub use session::{context, store, validation};
pub use traffic::{buckets, severity};
pub use ui::app;
pub use utils::formatting;
pub use visualization::{charts, widgets};

// Error types
pub use anyhow::{Error, Result};
