pub mod app;
pub mod refresh;

pub use app::{App, DataSource, View};
pub use refresh::{RefreshTracker, Ticket};
