pub mod buckets;
pub mod severity;

pub use buckets::{HourlyTraffic, MinuteOfDay, TimeBucket, TrafficTimeline, BUCKETS_PER_DAY};
pub use severity::Severity;
