use std::collections::HashMap;
use crate::capture::PacketRecord;
use crate::traffic::{Severity, TrafficTimeline};

const TOP_ENTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtocolShare {
    pub protocol: String,
    pub packets: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSummary {
    pub packet_count: usize,
    pub anomalous_packet_count: usize,
    pub total_bytes: u64,
    pub anomalous_bytes: u64,
    pub average_bytes_per_minute: f64, // over minutes that saw traffic
    pub peak_minute: Option<(String, u64)>,
    pub unplaced_packets: usize,
    pub captured_bytes: u64, // includes packets without a readable time
    pub top_protocols: Vec<ProtocolShare>,
    pub top_sources: Vec<(String, u64)>, // (source, bytes)
    pub severity_counts: HashMap<Severity, usize>,
}

impl TrafficSummary {
    /// Summarise one refresh worth of packets and the timeline built from them.
    pub fn build(packets: &[PacketRecord], timeline: &TrafficTimeline) -> Self {
        let mut protocols: HashMap<&str, ProtocolShare> = HashMap::new();
        let mut sources: HashMap<&str, u64> = HashMap::new();
        let mut severity_counts: HashMap<Severity, usize> = HashMap::new();

        for packet in packets {
            let share = protocols.entry(packet.protocol.as_str()).or_insert_with(|| ProtocolShare {
                protocol: packet.protocol.clone(),
                ..Default::default()
            });
            share.packets += 1;
            share.bytes = share.bytes.saturating_add(packet.length);

            let source_bytes = sources.entry(packet.source.as_str()).or_insert(0);
            *source_bytes = source_bytes.saturating_add(packet.length);

            *severity_counts.entry(Severity::classify_length(packet.length)).or_insert(0) += 1;
        }

        let mut top_protocols: Vec<ProtocolShare> = protocols.into_values().collect();
        top_protocols.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.protocol.cmp(&b.protocol)));
        top_protocols.truncate(TOP_ENTRIES);

        let mut top_sources: Vec<(String, u64)> = sources
            .into_iter()
            .map(|(source, bytes)| (source.to_string(), bytes))
            .collect();
        top_sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_sources.truncate(TOP_ENTRIES);

        let active_minutes = timeline.active_minutes();
        let total_bytes = timeline.total_bytes();
        let average_bytes_per_minute = if active_minutes > 0 {
            total_bytes as f64 / active_minutes as f64
        } else {
            0.0
        };

        Self {
            packet_count: packets.len(),
            anomalous_packet_count: packets.iter().filter(|p| p.is_anomalous).count(),
            total_bytes,
            anomalous_bytes: timeline.anomalous_bytes(),
            average_bytes_per_minute,
            peak_minute: timeline.peak().map(|b| (b.label.clone(), b.total_bytes)),
            unplaced_packets: timeline.unplaced(),
            captured_bytes: packets.iter().fold(0u64, |sum, p| sum.saturating_add(p.length)),
            top_protocols,
            top_sources,
            severity_counts,
        }
    }

    pub fn empty() -> Self {
        Self::build(&[], &TrafficTimeline::empty())
    }

    pub fn anomalous_share(&self) -> f64 {
        if self.total_bytes > 0 {
            (self.anomalous_bytes as f64 / self.total_bytes as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Share of captured bytes, matching the byte ranking of `top_protocols`.
    pub fn protocol_percentage(&self, protocol: &str) -> f64 {
        match self.top_protocols.iter().find(|p| p.protocol == protocol) {
            Some(share) if self.captured_bytes > 0 => {
                (share.bytes as f64 / self.captured_bytes as f64) * 100.0
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packets() -> Vec<PacketRecord> {
        vec![
            PacketRecord::new("10:15", "TCP", "10.0.0.24", 50, false),
            PacketRecord::new("10:15", "TCP", "10.0.0.24", 80, true),
            PacketRecord::new("11:00", "UDP", "192.168.1.105", 200, false),
            PacketRecord::new("garbage", "ICMP", "172.16.254.1", 40, true),
        ]
    }

    #[test]
    fn test_summary_totals() {
        let packets = packets();
        let timeline = TrafficTimeline::aggregate(&packets);
        let summary = TrafficSummary::build(&packets, &timeline);

        assert_eq!(summary.packet_count, 4);
        assert_eq!(summary.anomalous_packet_count, 2);
        assert_eq!(summary.total_bytes, 330);
        assert_eq!(summary.anomalous_bytes, 80);
        assert_eq!(summary.unplaced_packets, 1);
        assert_eq!(summary.average_bytes_per_minute, 165.0);
        assert_eq!(summary.peak_minute, Some(("11:00".to_string(), 200)));
    }

    #[test]
    fn test_top_lists_and_severity() {
        let packets = packets();
        let summary = TrafficSummary::build(&packets, &TrafficTimeline::aggregate(&packets));

        assert_eq!(summary.top_protocols[0].protocol, "UDP");
        assert_eq!(summary.top_protocols[1].protocol, "TCP");
        assert_eq!(summary.top_protocols[1].packets, 2);
        assert_eq!(summary.top_sources[0], ("192.168.1.105".to_string(), 200));
        assert_eq!(summary.captured_bytes, 370);
        assert!((summary.protocol_percentage("TCP") - 35.14).abs() < 0.01);
        assert!(summary.protocol_percentage("UDP") > summary.protocol_percentage("TCP"));
        let all: f64 = summary.top_protocols.iter().map(|p| summary.protocol_percentage(&p.protocol)).sum();
        assert!((all - 100.0).abs() < 1e-9);
        assert_eq!(summary.protocol_percentage("SCTP"), 0.0);

        assert_eq!(summary.severity_count(Severity::Low), 2);
        assert_eq!(summary.severity_count(Severity::Medium), 1);
        assert_eq!(summary.severity_count(Severity::High), 1);
    }

    #[test]
    fn test_empty_summary() {
        let summary = TrafficSummary::empty();
        assert_eq!(summary.total_bytes, 0);
        assert_eq!(summary.anomalous_share(), 0.0);
        assert!(summary.peak_minute.is_none());
        assert!(summary.top_protocols.is_empty());
    }
}
