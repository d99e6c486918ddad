pub mod charts;
pub mod widgets;

pub use charts::{DistributionChart, HourlyChart, TrafficChart};
pub use widgets::{AnomalyTable, CardVariant, StatCard, VulnerabilityList};
