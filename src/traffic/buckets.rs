use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use log::{debug, warn};
use serde::Serialize;
use crate::capture::PacketRecord;

pub const MINUTES_PER_HOUR: usize = 60;
pub const BUCKETS_PER_DAY: usize = 24 * MINUTES_PER_HOUR;

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

// Epoch values below this are not timestamps (2001-09-09 in seconds).
const MIN_EPOCH_SECONDS: f64 = 1e9;
// Values at or above this are epoch milliseconds.
const MIN_EPOCH_MILLIS: f64 = 1e11;
const MAX_EPOCH_MILLIS: f64 = 1e14;

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// A minute of the day, `0..1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        (index < BUCKETS_PER_DAY).then(|| Self(index as u16))
    }

    pub fn hour(&self) -> u32 {
        self.0 as u32 / 60
    }

    pub fn minute(&self) -> u32 {
        self.0 as u32 % 60
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Zero-padded `HH:MM`.
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }

    /// Extract the minute of day from a packet timestamp.
    ///
    /// Zoned timestamps keep the wall clock of their own offset; naive ones
    /// are taken as written. Bare numbers are Unix epoch seconds or
    /// milliseconds in UTC; numbers too small or too large to be either
    /// are rejected.
    pub fn parse(timestamp: &str) -> Option<Self> {
        let trimmed = timestamp.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(zoned) = DateTime::parse_from_rfc3339(trimmed) {
            return Self::new(zoned.hour(), zoned.minute());
        }

        for format in ZONED_FORMATS {
            if let Ok(zoned) = DateTime::parse_from_str(trimmed, format) {
                return Self::new(zoned.hour(), zoned.minute());
            }
        }

        for format in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Self::new(naive.hour(), naive.minute());
            }
        }

        for format in TIME_FORMATS {
            if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
                return Self::new(time.hour(), time.minute());
            }
        }

        Self::from_epoch(trimmed.parse::<f64>().ok()?)
    }

    fn from_epoch(value: f64) -> Option<Self> {
        if !value.is_finite() || value < MIN_EPOCH_SECONDS || value >= MAX_EPOCH_MILLIS {
            return None;
        }
        let epoch = if value >= MIN_EPOCH_MILLIS { value / 1000.0 } else { value };
        let seconds = epoch.trunc() as i64;
        let nanos = ((epoch.fract() * 1e9) as u32).min(999_999_999);
        DateTime::from_timestamp(seconds, nanos).and_then(|utc| Self::new(utc.hour(), utc.minute()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub label: String,
    pub total_bytes: u64,
    pub anomalous_bytes: u64,
}

impl TimeBucket {
    fn empty(minute: MinuteOfDay) -> Self {
        Self {
            label: minute.label(),
            total_bytes: 0,
            anomalous_bytes: 0,
        }
    }

    pub fn normal_bytes(&self) -> u64 {
        self.total_bytes - self.anomalous_bytes
    }

    pub fn has_anomaly(&self) -> bool {
        self.anomalous_bytes > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyTraffic {
    pub hour: u32,
    pub total_bytes: u64,
    pub anomalous_bytes: u64,
}

impl HourlyTraffic {
    pub fn label(&self) -> String {
        format!("{:02}:00", self.hour)
    }
}

/// One full day of per-minute traffic, built in a single pass and never
/// mutated afterwards. A refresh builds a new timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficTimeline {
    buckets: Vec<TimeBucket>,
    unplaced: usize,
}

impl TrafficTimeline {
    pub fn empty() -> Self {
        Self::aggregate(std::iter::empty())
    }

    /// Sum packet lengths into the 1440 minute buckets of a day.
    ///
    /// Packets whose timestamp cannot be read are counted in `unplaced`
    /// and otherwise ignored.
    pub fn aggregate<'a, I>(packets: I) -> Self
    where
        I: IntoIterator<Item = &'a PacketRecord>,
    {
        let mut buckets: Vec<TimeBucket> = (0..BUCKETS_PER_DAY)
            .filter_map(MinuteOfDay::from_index)
            .map(TimeBucket::empty)
            .collect();
        let mut unplaced = 0;

        for packet in packets {
            let Some(minute) = MinuteOfDay::parse(&packet.time) else {
                debug!("No minute for packet timestamp {:?} from {}", packet.time, packet.source);
                unplaced += 1;
                continue;
            };

            let bucket = &mut buckets[minute.index()];
            bucket.total_bytes = bucket.total_bytes.saturating_add(packet.length);
            if packet.is_anomalous {
                bucket.anomalous_bytes = bucket.anomalous_bytes.saturating_add(packet.length);
            }
        }

        if unplaced > 0 {
            warn!("{} packet(s) had unreadable timestamps and were left out of the timeline", unplaced);
        }

        Self { buckets, unplaced }
    }

    pub fn buckets(&self) -> &[TimeBucket] {
        &self.buckets
    }

    /// Look a bucket up by its exact `HH:MM` label.
    pub fn bucket(&self, label: &str) -> Option<&TimeBucket> {
        let (hour, minute) = label.split_once(':')?;
        if hour.len() != 2 || minute.len() != 2 {
            return None;
        }
        let minute = MinuteOfDay::new(hour.parse().ok()?, minute.parse().ok()?)?;
        self.buckets.get(minute.index()).filter(|bucket| bucket.label == label)
    }

    pub fn unplaced(&self) -> usize {
        self.unplaced
    }

    pub fn total_bytes(&self) -> u64 {
        self.buckets.iter().map(|b| b.total_bytes).sum()
    }

    pub fn anomalous_bytes(&self) -> u64 {
        self.buckets.iter().map(|b| b.anomalous_bytes).sum()
    }

    pub fn active_minutes(&self) -> usize {
        self.buckets.iter().filter(|b| b.total_bytes > 0).count()
    }

    /// Busiest minute; the earliest one wins a tie. `None` when the day is idle.
    pub fn peak(&self) -> Option<&TimeBucket> {
        self.buckets
            .iter()
            .filter(|b| b.total_bytes > 0)
            .fold(None, |best: Option<&TimeBucket>, bucket| match best {
                Some(current) if current.total_bytes >= bucket.total_bytes => Some(current),
                _ => Some(bucket),
            })
    }

    /// Roll the minute buckets up into 24 hourly totals.
    pub fn hourly(&self) -> Vec<HourlyTraffic> {
        self.buckets
            .chunks(MINUTES_PER_HOUR)
            .enumerate()
            .map(|(hour, minutes)| HourlyTraffic {
                hour: hour as u32,
                total_bytes: minutes.iter().map(|b| b.total_bytes).sum(),
                anomalous_bytes: minutes.iter().map(|b| b.anomalous_bytes).sum(),
            })
            .collect()
    }
}

impl Default for TrafficTimeline {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(time: &str, length: u64, is_anomalous: bool) -> PacketRecord {
        PacketRecord::new(time, "TCP", "192.168.1.105", length, is_anomalous)
    }

    #[test]
    fn test_empty_input_has_full_zero_day() {
        let timeline = TrafficTimeline::aggregate(&[]);
        assert_eq!(timeline.buckets().len(), BUCKETS_PER_DAY);
        assert!(timeline.buckets().iter().all(|b| b.total_bytes == 0 && b.anomalous_bytes == 0));
        assert_eq!(timeline.unplaced(), 0);
        assert!(timeline.peak().is_none());
    }

    #[test]
    fn test_labels_are_ordered_without_gaps() {
        let timeline = TrafficTimeline::empty();
        let labels: Vec<&str> = timeline.buckets().iter().map(|b| b.label.as_str()).collect();

        assert_eq!(labels.first(), Some(&"00:00"));
        assert_eq!(labels[1], "00:01");
        assert_eq!(labels[60], "01:00");
        assert_eq!(labels.last(), Some(&"23:59"));
        assert!(labels.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_same_minute_packets_share_a_bucket() {
        let packets = vec![packet("10:15", 50, false), packet("10:15", 80, true)];
        let timeline = TrafficTimeline::aggregate(&packets);

        let bucket = timeline.bucket("10:15").unwrap();
        assert_eq!(bucket.total_bytes, 130);
        assert_eq!(bucket.anomalous_bytes, 80);
        assert_eq!(bucket.normal_bytes(), 50);
    }

    #[test]
    fn test_totals_match_placed_packets() {
        let packets = vec![
            packet("2024-05-01T00:00:59Z", 10, false),
            packet("2024-05-01 23:59:00", 20, true),
            packet("2024-05-01T12:30:00.250+05:30", 30, false),
            packet("not a time", 1000, true),
            packet("", 7, false),
        ];
        let timeline = TrafficTimeline::aggregate(&packets);

        assert_eq!(timeline.total_bytes(), 60);
        assert_eq!(timeline.anomalous_bytes(), 20);
        assert_eq!(timeline.unplaced(), 2);
        assert_eq!(timeline.bucket("12:30").unwrap().total_bytes, 30);
        assert!(timeline.buckets().iter().all(|b| b.anomalous_bytes <= b.total_bytes));
    }

    #[test]
    fn test_aggregation_is_idempotent_and_order_free() {
        let mut packets = vec![
            packet("08:01", 100, true),
            packet("08:01:30", 40, false),
            packet("17:45", 64, false),
        ];
        let first = TrafficTimeline::aggregate(&packets);
        let second = TrafficTimeline::aggregate(&packets);
        assert_eq!(first, second);

        packets.reverse();
        assert_eq!(first, TrafficTimeline::aggregate(&packets));
    }

    #[test]
    fn test_minute_parsing() {
        assert_eq!(MinuteOfDay::parse("9:05").map(|m| m.label()), Some("09:05".to_string()));
        assert_eq!(MinuteOfDay::parse("1714558500").map(|m| m.label()), Some("10:15".to_string()));
        assert_eq!(MinuteOfDay::parse("1714558500.75").map(|m| m.label()), Some("10:15".to_string()));
        assert!(MinuteOfDay::parse("24:00").is_none());
        assert!(MinuteOfDay::parse("-1").is_none());
    }

    #[test]
    fn test_epoch_milliseconds_and_implausible_numbers() {
        assert_eq!(MinuteOfDay::parse("1714558500000").map(|m| m.label()), Some("10:15".to_string()));
        assert!(MinuteOfDay::parse("2024").is_none());
        assert!(MinuteOfDay::parse("42.5").is_none());
        assert!(MinuteOfDay::parse("1e20").is_none());

        let timeline = TrafficTimeline::aggregate(&[packet("2024", 500, false), packet("1714558500000", 70, false)]);
        assert_eq!(timeline.unplaced(), 1);
        assert_eq!(timeline.bucket("10:15").map(|b| b.total_bytes), Some(70));
        assert_eq!(timeline.total_bytes(), 70);
    }

    #[test]
    fn test_basic_offset_and_minute_precision_datetimes() {
        assert_eq!(
            MinuteOfDay::parse("2024-05-01T10:15:00+0000").map(|m| m.label()),
            Some("10:15".to_string())
        );
        assert_eq!(
            MinuteOfDay::parse("2024-05-01T23:59:59.5+0530").map(|m| m.label()),
            Some("23:59".to_string())
        );
        assert_eq!(MinuteOfDay::parse("2024-05-01T10:15").map(|m| m.label()), Some("10:15".to_string()));
    }

    #[test]
    fn test_bucket_lookup_requires_exact_label() {
        let timeline = TrafficTimeline::empty();
        assert!(timeline.bucket("07:05").is_some());
        assert!(timeline.bucket("7:05").is_none());
        assert!(timeline.bucket("24:00").is_none());
    }

    #[test]
    fn test_hourly_rollup_and_peak() {
        let packets = vec![
            packet("01:10", 100, false),
            packet("01:50", 300, true),
            packet("13:00", 300, false),
        ];
        let timeline = TrafficTimeline::aggregate(&packets);
        let hourly = timeline.hourly();

        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[1].total_bytes, 400);
        assert_eq!(hourly[1].anomalous_bytes, 300);
        assert_eq!(hourly[13].label(), "13:00");
        assert_eq!(timeline.peak().unwrap().label, "01:50");
        assert_eq!(timeline.active_minutes(), 3);
    }
}
