use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::analysis::{Anomaly, AnomalyStatus, Vulnerability};
use crate::capture::PacketRecord;
use crate::traffic::Severity;

const ANOMALY_TYPES: &[&str] = &[
    "DDoS",
    "Port Scan",
    "Data Exfiltration",
    "Unusual Login",
    "Malware Communication",
];

const SOURCES: &[&str] = &[
    "192.168.1.105",
    "10.0.0.24",
    "172.16.254.1",
    "fe80::1ff:fe23:4567:890a",
    "2001:db8:3333:4444:5555:6666:7777:8888",
];

const PROTOCOLS: &[&str] = &["TCP", "UDP", "ICMP", "DNS", "TLS", "HTTP"];

const SECONDS_PER_DAY: i64 = 86_400;

/// Synthetic dashboard data for demo runs and as the vulnerability fallback.
pub struct MockGenerator<R: Rng> {
    rng: R,
}

impl MockGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> MockGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Packets spread between UTC midnight and `now`, about one in ten flagged.
    pub fn packets(&mut self, count: usize, now: DateTime<Utc>) -> Vec<PacketRecord> {
        let seconds_today = now.timestamp().rem_euclid(SECONDS_PER_DAY).max(1);
        (0..count)
            .map(|_| {
                let at = now - Duration::seconds(self.rng.gen_range(0..seconds_today));
                PacketRecord {
                    time: at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    protocol: self.pick(PROTOCOLS).to_string(),
                    source: self.pick(SOURCES).to_string(),
                    length: self.rng.gen_range(40..=1500),
                    is_anomalous: self.rng.gen_bool(0.1),
                }
            })
            .collect()
    }

    /// Anomalies from the last 24 hours, roughly 70% still active.
    pub fn anomalies(&mut self, count: usize, now: DateTime<Utc>) -> Vec<Anomaly> {
        (0..count)
            .map(|i| Anomaly {
                id: format!("anomaly-{}", i),
                timestamp: self.recent_timestamp(now),
                kind: self.pick(ANOMALY_TYPES).to_string(),
                source: self.pick(SOURCES).to_string(),
                severity: Severity::ALL[self.rng.gen_range(0..Severity::ALL.len())],
                status: if self.rng.gen_bool(0.7) {
                    AnomalyStatus::Active
                } else {
                    AnomalyStatus::Resolved
                },
                impact: self.rng.gen_range(0..100),
            })
            .collect()
    }

    pub fn vulnerabilities(&mut self, count: usize, now: DateTime<Utc>) -> Vec<Vulnerability> {
        (0..count)
            .map(|i| Vulnerability {
                id: format!("mock-cve-{}", i),
                timestamp: self.recent_timestamp(now),
                kind: "MockVuln".to_string(),
                source: "Simulated".to_string(),
                severity: Severity::ALL[self.rng.gen_range(0..Severity::ALL.len())],
                status: AnomalyStatus::Active,
                impact: self.rng.gen_range(0..10) as f64,
                title: format!("Mock Vulnerability {}", i + 1),
                description: "Simulated vulnerability for demo purposes.".to_string(),
                references: Vec::new(),
            })
            .collect()
    }

    fn recent_timestamp(&mut self, now: DateTime<Utc>) -> String {
        let at = now - Duration::seconds(self.rng.gen_range(0..SECONDS_PER_DAY));
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn pick(&mut self, pool: &[&'static str]) -> &'static str {
        pool[self.rng.gen_range(0..pool.len())]
    }
}
