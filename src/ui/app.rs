use ratatui::{
    backend::CrosstermBackend,
    widgets::{Block, Borders, List, ListItem, Paragraph},
    layout::{Layout, Constraint, Direction, Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Terminal, Frame,
};
use crossterm::{
    terminal::{enable_raw_mode, disable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    event::{self, Event, KeyCode, KeyEventKind},
    ExecutableCommand,
};
use chrono::Utc;
use log::{debug, info, warn};
use std::io;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use crate::analysis::anomalies::type_distribution;
use crate::analysis::{Anomaly, AnomalySummary, StatusFilter, TrafficSummary, TypeShare, Vulnerability};
use crate::capture::{ApiClient, Decoded, MockGenerator, PacketRecord};
use crate::config::UiConfig;
use crate::session::Session;
use crate::traffic::{Severity, TrafficTimeline};
use crate::ui::refresh::{RefreshTracker, Ticket};
use crate::utils::formatting::{format_bytes, format_percentage, format_source};
use crate::visualization::widgets::render_card_row;
use crate::visualization::{
    AnomalyTable, CardVariant, DistributionChart, HourlyChart, StatCard, TrafficChart, VulnerabilityList,
};

const MOCK_ANOMALY_COUNT: usize = 8;
const MOCK_VULNERABILITY_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Traffic,
    Anomalies,
    Vulnerabilities,
    History,
}

impl View {
    pub const ALL: [View; 4] = [View::Traffic, View::Anomalies, View::Vulnerabilities, View::History];

    pub fn title(&self) -> &'static str {
        match self {
            View::Traffic => "Traffic Monitor",
            View::Anomalies => "Anomalies",
            View::Vulnerabilities => "Vulnerabilities",
            View::History => "History",
        }
    }

    /// Unknown names fall back to the traffic view.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "anomalies" => View::Anomalies,
            "vulnerabilities" => View::Vulnerabilities,
            "history" => View::History,
            _ => View::Traffic,
        }
    }

    fn index(&self) -> usize {
        View::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }

    fn previous(&self) -> Self {
        View::ALL[(self.index() + View::ALL.len() - 1) % View::ALL.len()]
    }
}

/// Where refreshes get their data.
pub enum DataSource {
    Api(ApiClient),
    Demo { packet_count: usize },
}

#[derive(Debug)]
pub struct RefreshOutcome {
    ticket: Ticket,
    packets: Result<Decoded<PacketRecord>, String>,
    anomalies: Result<Decoded<Anomaly>, String>,
    vulnerabilities: Result<Decoded<Vulnerability>, String>,
    simulated: bool,
}

#[derive(Debug)]
pub enum AppEvent {
    Refreshed(RefreshOutcome),
    CaptureChanged { running: bool, result: Result<(), String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    fn info(message: String) -> Self {
        Self { message, is_error: false }
    }

    fn error(message: String) -> Self {
        Self { message, is_error: true }
    }
}

/// Everything the views draw from. Each setter rebuilds its derived data
/// from scratch.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub packets: Vec<PacketRecord>,
    pub timeline: TrafficTimeline,
    pub traffic: TrafficSummary,
    pub anomalies: Vec<Anomaly>,
    pub anomaly_summary: AnomalySummary,
    pub type_shares: Vec<TypeShare>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub vulnerabilities_simulated: bool,
}

impl DashboardData {
    pub fn new() -> Self {
        Self {
            packets: Vec::new(),
            timeline: TrafficTimeline::empty(),
            traffic: TrafficSummary::empty(),
            anomalies: Vec::new(),
            anomaly_summary: AnomalySummary::from_anomalies(&[]),
            type_shares: Vec::new(),
            vulnerabilities: Vec::new(),
            vulnerabilities_simulated: false,
        }
    }

    pub fn set_packets(&mut self, packets: Vec<PacketRecord>) {
        self.timeline = TrafficTimeline::aggregate(&packets);
        self.traffic = TrafficSummary::build(&packets, &self.timeline);
        self.packets = packets;
    }

    pub fn set_anomalies(&mut self, anomalies: Vec<Anomaly>) {
        self.anomaly_summary = AnomalySummary::from_anomalies(&anomalies);
        self.type_shares = type_distribution(&anomalies);
        self.anomalies = anomalies;
    }

    pub fn set_vulnerabilities(&mut self, vulnerabilities: Vec<Vulnerability>, simulated: bool) {
        self.vulnerabilities = vulnerabilities;
        self.vulnerabilities_simulated = simulated;
    }
}

impl Default for DashboardData {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App<'a> {
    pub should_quit: bool,
    pub selected_view: View,
    pub status_filter: StatusFilter,
    pub data: DashboardData,
    pub notice: Option<Notice>,
    pub capture_running: Option<bool>,
    session: &'a Session,
    source: DataSource,
    runtime: Handle,
    tracker: RefreshTracker,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    tick_rate: Duration,
    auto_refresh: Option<Duration>,
    last_refresh: Instant,
}

impl<'a> App<'a> {
    pub fn new(config: &UiConfig, session: &'a Session, source: DataSource, runtime: Handle) -> App<'a> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        App {
            should_quit: false,
            selected_view: View::from_name(&config.default_view),
            status_filter: StatusFilter::All,
            data: DashboardData::new(),
            notice: None,
            capture_running: None,
            session,
            source,
            runtime,
            tracker: RefreshTracker::new(),
            events_tx,
            events_rx,
            tick_rate: Duration::from_millis(config.tick_rate_ms.max(10)),
            auto_refresh: (config.auto_refresh_secs > 0).then(|| Duration::from_secs(config.auto_refresh_secs)),
            last_refresh: Instant::now(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.tracker.is_refreshing()
    }

    /// False until the first refresh result has been applied.
    pub fn has_data(&self) -> bool {
        self.tracker.has_applied()
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.source, DataSource::Demo { .. })
    }

    /// Kick off a background refresh. Ignored while one is outstanding
    /// unless `supersede` is set.
    pub fn request_refresh(&mut self, supersede: bool) {
        let ticket = if supersede {
            Some(self.tracker.supersede())
        } else {
            self.tracker.begin()
        };
        let Some(ticket) = ticket else {
            debug!("Refresh already in flight, ignoring trigger");
            return;
        };
        self.last_refresh = Instant::now();

        let tx = self.events_tx.clone();
        match &self.source {
            DataSource::Api(client) => {
                let client = client.clone();
                let email = self.session.email().map(str::to_string);
                self.runtime.spawn(async move {
                    let anomalies = async {
                        match email.as_deref() {
                            Some(email) => client.fetch_anomalies(email).await,
                            None => Ok(Decoded::empty()),
                        }
                    };
                    let (packets, anomalies, vulnerabilities) =
                        tokio::join!(client.fetch_recent(), anomalies, client.fetch_vulnerabilities());

                    let outcome = RefreshOutcome {
                        ticket,
                        packets: packets.map_err(|e| e.to_string()),
                        anomalies: anomalies.map_err(|e| e.to_string()),
                        vulnerabilities: vulnerabilities.map_err(|e| e.to_string()),
                        simulated: false,
                    };
                    if tx.send(AppEvent::Refreshed(outcome)).is_err() {
                        debug!("Dashboard closed before refresh completed");
                    }
                });
            }
            DataSource::Demo { packet_count } => {
                let packet_count = *packet_count;
                self.runtime.spawn(async move {
                    let mut generator = MockGenerator::from_entropy();
                    let now = Utc::now();
                    let outcome = RefreshOutcome {
                        ticket,
                        packets: Ok(decoded(generator.packets(packet_count, now))),
                        anomalies: Ok(decoded(generator.anomalies(MOCK_ANOMALY_COUNT, now))),
                        vulnerabilities: Ok(decoded(generator.vulnerabilities(MOCK_VULNERABILITY_COUNT, now))),
                        simulated: true,
                    };
                    let _ = tx.send(AppEvent::Refreshed(outcome));
                });
            }
        }
    }

    pub fn request_capture(&mut self, start: bool) {
        let client = match &self.source {
            DataSource::Api(client) => client.clone(),
            DataSource::Demo { .. } => {
                self.notice = Some(Notice::info("Capture control is unavailable in demo mode".to_string()));
                return;
            }
        };

        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = if start {
                client.start_capture().await
            } else {
                client.stop_capture().await
            };
            let _ = tx.send(AppEvent::CaptureChanged {
                running: start,
                result: result.map_err(|e| e.to_string()),
            });
        });
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Refreshed(outcome) => self.apply_refresh(outcome),
            AppEvent::CaptureChanged { running, result } => match result {
                Ok(()) => {
                    self.capture_running = Some(running);
                    let state = if running { "started" } else { "stopped" };
                    self.notice = Some(Notice::info(format!("Capture {}", state)));
                    self.request_refresh(true);
                }
                Err(e) => {
                    warn!("Capture control failed: {}", e);
                    self.notice = Some(Notice::error(format!("Capture control failed: {}", e)));
                }
            },
        }
    }

    fn apply_refresh(&mut self, outcome: RefreshOutcome) {
        if !self.tracker.complete(outcome.ticket) {
            debug!("Discarding refresh {:?}: newer data already applied", outcome.ticket);
            return;
        }

        let mut problems = Vec::new();
        let mut skipped = 0;

        match outcome.packets {
            Ok(batch) => {
                skipped += batch.rejected.len();
                self.data.set_packets(batch.items);
            }
            Err(e) => {
                warn!("Traffic refresh failed, keeping previous data: {}", e);
                problems.push("traffic");
            }
        }

        match outcome.anomalies {
            Ok(batch) => {
                skipped += batch.rejected.len();
                self.data.set_anomalies(batch.items);
            }
            Err(e) => {
                warn!("Anomaly refresh failed, keeping previous data: {}", e);
                problems.push("anomalies");
            }
        }

        match outcome.vulnerabilities {
            Ok(batch) => {
                skipped += batch.rejected.len();
                self.data.set_vulnerabilities(batch.items, outcome.simulated);
            }
            Err(e) => {
                warn!("Vulnerability feed unavailable, showing simulated entries: {}", e);
                let fallback = MockGenerator::from_entropy().vulnerabilities(MOCK_VULNERABILITY_COUNT, Utc::now());
                self.data.set_vulnerabilities(fallback, true);
            }
        }

        self.notice = if !problems.is_empty() {
            Some(Notice::error(format!(
                "Could not refresh {}; showing last known data",
                problems.join(", ")
            )))
        } else if skipped > 0 {
            Some(Notice::info(format!("Updated; {} malformed entries skipped", skipped)))
        } else {
            Some(Notice::info(format!("Updated {}", Utc::now().format("%H:%M:%S UTC"))))
        };
        info!(
            "Dashboard refreshed: {} packets, {} anomalies, {} vulnerabilities",
            self.data.packets.len(),
            self.data.anomalies.len(),
            self.data.vulnerabilities.len()
        );
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.selected_view = self.selected_view.next(),
            KeyCode::BackTab => self.selected_view = self.selected_view.previous(),
            KeyCode::Char('1') => self.selected_view = View::Traffic,
            KeyCode::Char('2') => self.selected_view = View::Anomalies,
            KeyCode::Char('3') => self.selected_view = View::Vulnerabilities,
            KeyCode::Char('4') => self.selected_view = View::History,
            KeyCode::Char('r') => self.request_refresh(false),
            KeyCode::Char('f') => self.status_filter = self.status_filter.next(),
            KeyCode::Char('s') => self.request_capture(true),
            KeyCode::Char('x') => self.request_capture(false),
            _ => {}
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        io::stdout().execute(LeaveAlternateScreen)?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.request_refresh(false);

        loop {
            self.drain_events();

            if let Some(interval) = self.auto_refresh {
                if self.last_refresh.elapsed() >= interval {
                    self.request_refresh(false);
                }
            }

            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),  // Header
                Constraint::Min(0),     // Main content
                Constraint::Length(3),  // Footer
            ])
            .split(f.size());

        self.draw_header(f, chunks[0]);

        match self.selected_view {
            View::Traffic => self.draw_traffic(f, chunks[1]),
            View::Anomalies => self.draw_anomalies(f, chunks[1]),
            View::Vulnerabilities => self.draw_vulnerabilities(f, chunks[1]),
            View::History => self.draw_history(f, chunks[1]),
        }

        self.draw_footer(f, chunks[2]);
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let selected_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let normal_style = Style::default().fg(Color::White);

        let mut spans: Vec<Span> = View::ALL
            .iter()
            .enumerate()
            .map(|(i, view)| {
                let style = if *view == self.selected_view { selected_style } else { normal_style };
                Span::styled(format!(" {} {} ", i + 1, view.title()), style)
            })
            .collect();
        if self.is_refreshing() {
            let label = if self.has_data() { " ⟳ refreshing" } else { " ⟳ loading" };
            spans.push(Span::styled(label, Style::default().fg(Color::Cyan)));
        }

        let mut title = match self.session.user() {
            Some(user) => format!("Network Anomaly Dashboard - {}", user.name),
            None => "Network Anomaly Dashboard".to_string(),
        };
        if self.is_demo() {
            title.push_str(" [demo]");
        }

        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title(title))
            .alignment(Alignment::Center);

        f.render_widget(header, area);
    }

    fn draw_traffic(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),       // Cards
                Constraint::Percentage(60),  // Chart
                Constraint::Min(0),          // Breakdown
            ])
            .split(area);

        let traffic = &self.data.traffic;
        let peak = match &traffic.peak_minute {
            Some((label, bytes)) => format!("{} @ {}", format_bytes(*bytes), label),
            None => "-".to_string(),
        };
        let cards = [
            StatCard::new("Total Traffic Today", format_bytes(traffic.total_bytes), "Cumulative for current day"),
            StatCard::new(
                "Anomalous Traffic",
                format!("{} ({})", format_bytes(traffic.anomalous_bytes), format_percentage(traffic.anomalous_share())),
                "Flagged by upstream capture",
            )
            .alarm_on(traffic.anomalous_packet_count),
            StatCard::new("Peak Minute", peak, "Highest recorded this period"),
            StatCard::new("Packets", traffic.packet_count, &packets_caption(traffic))
                .caution_on(traffic.unplaced_packets),
        ];
        render_card_row(&cards, chunks[0], f);

        TrafficChart::from_timeline(&self.data.timeline).render(chunks[1], f);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(35),
                Constraint::Percentage(35),
            ])
            .split(chunks[2]);

        let mut severity_items: Vec<ListItem> = Severity::ALL
            .iter()
            .rev()
            .map(|severity| {
                ListItem::new(format!("{:<7} {}", severity.to_string(), traffic.severity_count(*severity)))
                    .style(Style::default().fg(crate::visualization::widgets::severity_color(*severity)))
            })
            .collect();
        if traffic.unplaced_packets > 0 {
            severity_items.push(
                ListItem::new(format!("{} without readable time", traffic.unplaced_packets))
                    .style(Style::default().fg(Color::DarkGray)),
            );
        }
        let severity_list = List::new(severity_items)
            .block(Block::default().borders(Borders::ALL).title("Packet Severity"));
        f.render_widget(severity_list, bottom[0]);

        let protocol_items: Vec<ListItem> = traffic
            .top_protocols
            .iter()
            .map(|p| {
                ListItem::new(format!(
                    "{:<8} {:>10} {:>5.1}%",
                    p.protocol,
                    format_bytes(p.bytes),
                    traffic.protocol_percentage(&p.protocol)
                ))
            })
            .collect();
        let protocol_list = List::new(protocol_items)
            .block(Block::default().borders(Borders::ALL).title("Top Protocols"));
        f.render_widget(protocol_list, bottom[1]);

        let source_items: Vec<ListItem> = traffic
            .top_sources
            .iter()
            .map(|(source, bytes)| ListItem::new(format!("{:<24} {}", format_source(source, 24), format_bytes(*bytes))))
            .collect();
        let source_list = List::new(source_items)
            .block(Block::default().borders(Borders::ALL).title("Top Sources"));
        f.render_widget(source_list, bottom[2]);
    }

    fn draw_anomalies(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let summary = &self.data.anomaly_summary;
        let cards = [
            StatCard::new("Active Anomalies", summary.active, "Requiring attention").alarm_on(summary.active),
            StatCard::new("Detected Today", summary.total, "Total anomalies found"),
            StatCard::new("High Severity", summary.high_severity, "Critical security issues")
                .alarm_on(summary.high_severity),
            StatCard::new("Resolution Rate", format_percentage(summary.resolution_rate), "Anomalies resolved")
                .variant(CardVariant::Success),
        ];
        render_card_row(&cards, chunks[0], f);

        let visible = self.status_filter.apply(&self.data.anomalies);
        AnomalyTable::new(visible, self.status_filter.label()).render(chunks[1], f);
    }

    fn draw_vulnerabilities(&self, f: &mut Frame, area: Rect) {
        VulnerabilityList::new(&self.data.vulnerabilities, self.data.vulnerabilities_simulated).render(area, f);
    }

    fn draw_history(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);

        HourlyChart::new(&self.data.timeline.hourly()).render(chunks[0], f);
        DistributionChart::new(&self.data.type_shares).render(chunks[1], f);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let help = "q quit | Tab/1-4 views | r refresh | f filter | s/x start/stop capture";
        let (text, style) = match &self.notice {
            Some(notice) if notice.is_error => (
                format!("{} | {}", notice.message, help),
                Style::default().fg(Color::Red),
            ),
            Some(notice) => (format!("{} | {}", notice.message, help), Style::default()),
            None => (help.to_string(), Style::default()),
        };

        let footer = Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);

        f.render_widget(footer, area);
    }
}

fn packets_caption(traffic: &TrafficSummary) -> String {
    if traffic.unplaced_packets > 0 {
        format!("{} without readable time", traffic.unplaced_packets)
    } else {
        format!("avg {} per active minute", format_bytes(traffic.average_bytes_per_minute as u64))
    }
}

fn decoded<T>(items: Vec<T>) -> Decoded<T> {
    Decoded {
        items,
        rejected: Vec::new(),
    }
}
