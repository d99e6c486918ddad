use ratatui::{
    prelude::*,
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, GraphType},
    symbols,
    style::{Color, Style},
};
use crate::analysis::TypeShare;
use crate::traffic::{HourlyTraffic, TrafficTimeline, BUCKETS_PER_DAY};
use crate::utils::formatting::format_bytes;

/// Day-long per-minute traffic with the anomalous share overlaid.
pub struct TrafficChart {
    total: Vec<(f64, f64)>,     // (minute of day, bytes)
    anomalous: Vec<(f64, f64)>, // only minutes with anomalous bytes
    max_bytes: u64,
}

impl TrafficChart {
    pub fn from_timeline(timeline: &TrafficTimeline) -> Self {
        let total = timeline
            .buckets()
            .iter()
            .enumerate()
            .map(|(minute, bucket)| (minute as f64, bucket.total_bytes as f64))
            .collect();
        let anomalous = timeline
            .buckets()
            .iter()
            .enumerate()
            .filter(|(_, bucket)| bucket.has_anomaly())
            .map(|(minute, bucket)| (minute as f64, bucket.anomalous_bytes as f64))
            .collect();
        let max_bytes = timeline.buckets().iter().map(|b| b.total_bytes).max().unwrap_or(0);

        Self {
            total,
            anomalous,
            max_bytes,
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let datasets = vec![
            Dataset::default()
                .name("Traffic")
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(Color::Cyan))
                .graph_type(GraphType::Line)
                .data(&self.total),
            Dataset::default()
                .name("Anomalous")
                .marker(symbols::Marker::Dot)
                .style(Style::default().fg(Color::Red))
                .graph_type(GraphType::Scatter)
                .data(&self.anomalous),
        ];

        let y_max = (self.max_bytes as f64).max(1.0);

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .title("Traffic Overview (24h, per minute)")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::White)),
            )
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, (BUCKETS_PER_DAY - 1) as f64])
                    .labels(vec![
                        "00:00".into(),
                        "06:00".into(),
                        "12:00".into(),
                        "18:00".into(),
                        "23:59".into(),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, y_max])
                    .labels(vec![
                        "0".into(),
                        format_bytes(self.max_bytes / 2).into(),
                        format_bytes(self.max_bytes).into(),
                    ]),
            );

        frame.render_widget(chart, area);
    }
}

/// Hourly roll-up, one bar per hour, values in KB.
pub struct HourlyChart {
    bars: Vec<(String, u64)>,
}

impl HourlyChart {
    pub fn new(hourly: &[HourlyTraffic]) -> Self {
        Self {
            bars: hourly
                .iter()
                .map(|h| (format!("{:02}", h.hour), h.total_bytes / 1024))
                .collect(),
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let data: Vec<(&str, u64)> = self.bars.iter().map(|(label, kb)| (label.as_str(), *kb)).collect();

        let chart = BarChart::default()
            .block(Block::default().title("Hourly Traffic (KB)").borders(Borders::ALL))
            .data(&data)
            .bar_width(3)
            .bar_gap(1)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

        frame.render_widget(chart, area);
    }
}

/// Anomaly type breakdown as whole percentages.
pub struct DistributionChart {
    shares: Vec<(String, u64)>,
}

impl DistributionChart {
    pub fn new(shares: &[TypeShare]) -> Self {
        Self {
            shares: shares
                .iter()
                .map(|s| (s.kind.clone(), s.percentage.round() as u64))
                .collect(),
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        if self.shares.is_empty() {
            let block = Block::default()
                .title("Anomaly Distribution")
                .borders(Borders::ALL);
            frame.render_widget(block, area);
            return;
        }

        let data: Vec<(&str, u64)> = self.shares.iter().map(|(kind, pct)| (kind.as_str(), *pct)).collect();

        let chart = BarChart::default()
            .block(Block::default().title("Anomaly Distribution (%)").borders(Borders::ALL))
            .data(&data)
            .bar_width(9)
            .bar_gap(2)
            .max(100)
            .bar_style(Style::default().fg(Color::Yellow))
            .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));

        frame.render_widget(chart, area);
    }
}
