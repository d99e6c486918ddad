pub mod settings;

pub use settings::{ApiConfig, Config, SessionConfig, UiConfig};
