use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Wrap},
    style::{Color, Modifier, Style},
};
use crate::analysis::{Anomaly, AnomalyStatus, Vulnerability};
use crate::traffic::Severity;
use crate::utils::formatting::{format_clock, format_source, truncate_string};

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Low => Color::Green,
        Severity::Medium => Color::Yellow,
        Severity::High => Color::Red,
    }
}

pub fn status_color(status: AnomalyStatus) -> Color {
    match status {
        AnomalyStatus::Active => Color::Red,
        AnomalyStatus::Resolved => Color::Green,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVariant {
    Plain,
    Success,
    Warning,
    Danger,
}

impl CardVariant {
    fn border_color(&self) -> Color {
        match self {
            CardVariant::Plain => Color::White,
            CardVariant::Success => Color::Green,
            CardVariant::Warning => Color::Yellow,
            CardVariant::Danger => Color::Red,
        }
    }
}

/// Titled figure with a one-line description, bordered by variant.
#[derive(Debug, Clone)]
pub struct StatCard {
    pub title: String,
    pub value: String,
    pub description: String,
    pub variant: CardVariant,
}

impl StatCard {
    pub fn new(title: &str, value: impl ToString, description: &str) -> Self {
        Self {
            title: title.to_string(),
            value: value.to_string(),
            description: description.to_string(),
            variant: CardVariant::Plain,
        }
    }

    pub fn variant(mut self, variant: CardVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Danger when `count` is non-zero, plain otherwise.
    pub fn alarm_on(self, count: usize) -> Self {
        let variant = if count > 0 { CardVariant::Danger } else { CardVariant::Plain };
        self.variant(variant)
    }

    /// Warning when `count` is non-zero; never downgrades a stronger variant.
    pub fn caution_on(self, count: usize) -> Self {
        if count > 0 && self.variant == CardVariant::Plain {
            self.variant(CardVariant::Warning)
        } else {
            self
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let lines = vec![
            Line::from(Span::styled(
                self.value.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(self.description.clone(), Style::default().fg(Color::Gray))),
        ];

        let card = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(self.title.clone())
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.variant.border_color())),
            )
            .wrap(Wrap { trim: true });

        frame.render_widget(card, area);
    }
}

/// Render cards side by side in equal columns.
pub fn render_card_row(cards: &[StatCard], area: Rect, frame: &mut Frame) {
    if cards.is_empty() {
        return;
    }
    let constraints: Vec<Constraint> = cards
        .iter()
        .map(|_| Constraint::Ratio(1, cards.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (card, column) in cards.iter().zip(columns.iter()) {
        card.render(*column, frame);
    }
}

pub struct AnomalyTable<'a> {
    anomalies: Vec<&'a Anomaly>,
    title: String,
}

impl<'a> AnomalyTable<'a> {
    pub fn new(anomalies: Vec<&'a Anomaly>, filter_label: &str) -> Self {
        Self {
            title: format!("Anomaly Log [{}] ({})", filter_label, anomalies.len()),
            anomalies,
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let rows: Vec<Row> = self
            .anomalies
            .iter()
            .take(area.height.saturating_sub(3) as usize)
            .map(|anomaly| {
                Row::new(vec![
                    Cell::from(anomaly.kind.clone()),
                    Cell::from(format_source(&anomaly.source, 24)),
                    Cell::from(anomaly.severity.to_string())
                        .style(Style::default().fg(severity_color(anomaly.severity))),
                    Cell::from(format_clock(&anomaly.timestamp)),
                    Cell::from(anomaly.status.to_string())
                        .style(Style::default().fg(status_color(anomaly.status))),
                    Cell::from(format!("{}", anomaly.impact)),
                ])
            })
            .collect();

        let table = Table::new(rows)
            .widths(&[
                Constraint::Percentage(24),
                Constraint::Percentage(26),
                Constraint::Percentage(12),
                Constraint::Percentage(14),
                Constraint::Percentage(14),
                Constraint::Percentage(10),
            ])
            .header(
                Row::new(vec!["Type", "Source", "Severity", "Time", "Status", "Impact"])
                    .style(Style::default().fg(Color::Yellow)),
            )
            .block(Block::default().borders(Borders::ALL).title(self.title.clone()));

        frame.render_widget(table, area);
    }
}

pub struct VulnerabilityList<'a> {
    vulnerabilities: &'a [Vulnerability],
    from_fallback: bool,
}

impl<'a> VulnerabilityList<'a> {
    pub fn new(vulnerabilities: &'a [Vulnerability], from_fallback: bool) -> Self {
        Self {
            vulnerabilities,
            from_fallback,
        }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = self
            .vulnerabilities
            .iter()
            .map(|vuln| {
                let header = Line::from(vec![
                    Span::styled(
                        format!("{:<7}", vuln.severity.to_string()),
                        Style::default().fg(severity_color(vuln.severity)),
                    ),
                    Span::styled(vuln.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!("  {}  {}", vuln.source, format_clock(&vuln.timestamp))),
                ]);
                let detail = Line::from(Span::styled(
                    truncate_string(&vuln.description, width.max(8)),
                    Style::default().fg(Color::Gray),
                ));
                ListItem::new(vec![header, detail])
            })
            .collect();

        let title = if self.from_fallback {
            format!("Vulnerabilities ({}, simulated)", self.vulnerabilities.len())
        } else {
            format!("Vulnerabilities ({})", self.vulnerabilities.len())
        };

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(list, area);
    }
}
