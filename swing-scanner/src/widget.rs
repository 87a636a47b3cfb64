//! Ratatui rendering of the latest [`CycleReport`].

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use crate::{
    config::{RefreshPolicy, ScannerConfig, ScoringMode},
    evaluator::{Evaluation, EvaluationStats},
    opportunity::{Opportunity, TradeDecision},
    worker::{CycleOutcome, CycleReport},
};

const C_HEADER: Color = Color::Cyan;
const C_BUY: Color = Color::Rgb(100, 220, 100);
const C_SELL: Color = Color::Rgb(220, 100, 100);
const C_WARN: Color = Color::Yellow;
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);

const SWING_COLUMNS: [(&str, u16); 8] = [
    ("Coin", 12),
    ("Current Price", 15),
    ("Best Buy Price", 15),
    ("Target Price", 15),
    ("Stop Loss", 15),
    ("Trend", 9),
    ("Hold Period", 11),
    ("Signal Strength", 20),
];

const EXPLOSION_COLUMNS: [(&str, u16); 3] = [("Win %", 7), ("Decision", 11), ("AI", 4)];

/// Everything the UI draws.
#[derive(Debug, Clone)]
pub struct ScannerView {
    pub title: String,
    pub mode: ScoringMode,
    pub refresh: RefreshPolicy,
    /// Latest report, `None` until the first cycle completes.
    pub latest: Option<CycleReport>,
}

impl ScannerView {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            title: config.title.clone(),
            mode: config.signal.mode,
            refresh: config.refresh,
            latest: None,
        }
    }

    pub fn apply(&mut self, report: CycleReport) {
        self.latest = Some(report);
    }
}

/// Prices are shown rounded to 4 decimals.
pub fn format_price(price: f64) -> String {
    format!("{:.4}", price)
}

pub fn render_scanner(f: &mut Frame, view: &ScannerView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0], view);

    match view.latest.as_ref().map(|report| &report.outcome) {
        None => render_message(f, chunks[1], "Fetching ticker data...", C_DIM),
        Some(CycleOutcome::Opportunities(evaluation)) => {
            render_opportunities(f, chunks[1], view.mode, evaluation)
        }
        Some(CycleOutcome::NoOpportunities(_)) => {
            render_message(f, chunks[1], empty_message(view.mode), C_WARN)
        }
        Some(CycleOutcome::FetchFailed(error)) => render_message(
            f,
            chunks[1],
            &format!("Failed to fetch ticker data: {error}"),
            C_SELL,
        ),
    }

    render_footer(f, chunks[2], view);
}

fn empty_message(mode: ScoringMode) -> &'static str {
    match mode {
        ScoringMode::Swing => "No swing trade opportunities found",
        ScoringMode::Explosion => "No explosion candidates found",
    }
}

fn render_header(f: &mut Frame, area: Rect, view: &ScannerView) {
    let mut lines = vec![Line::from(Span::styled(
        view.title.as_str(),
        Style::default().fg(C_HEADER).add_modifier(Modifier::BOLD),
    ))];

    let status = match &view.latest {
        Some(report) => {
            let source = if report.from_cache { "cached" } else { "live" };
            Line::from(vec![
                Span::styled("Updated ", Style::default().fg(C_DIM)),
                Span::styled(
                    report.finished_at.format("%H:%M:%S UTC").to_string(),
                    Style::default().fg(C_BRIGHT),
                ),
                Span::styled(
                    format!("  cycle {}  {}  {}", report.cycle, source, view.refresh),
                    Style::default().fg(C_DIM),
                ),
            ])
        }
        None => Line::from(Span::styled(
            format!("Waiting for first snapshot  {}", view.refresh),
            Style::default().fg(C_DIM),
        )),
    };
    lines.push(status);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_HEADER));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_message(f: &mut Frame, area: Rect, message: &str, color: Color) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let paragraph = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(block)
    .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn render_opportunities(f: &mut Frame, area: Rect, mode: ScoringMode, evaluation: &Evaluation) {
    let columns: Vec<(&str, u16)> = match mode {
        ScoringMode::Swing => SWING_COLUMNS.to_vec(),
        ScoringMode::Explosion => SWING_COLUMNS
            .iter()
            .chain(EXPLOSION_COLUMNS.iter())
            .copied()
            .collect(),
    };

    let header = Row::new(columns.iter().map(|(name, _)| {
        Cell::from(*name).style(Style::default().fg(C_HEADER).add_modifier(Modifier::BOLD))
    }))
    .height(1);

    let rows = evaluation
        .opportunities
        .iter()
        .map(|opportunity| Row::new(opportunity_cells(opportunity)).height(1));

    let widths: Vec<Constraint> = columns
        .iter()
        .map(|(_, width)| Constraint::Length(*width))
        .collect();

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} CANDIDATES ", evaluation.opportunities.len()))
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(table, area);
}

fn opportunity_cells(opportunity: &Opportunity) -> Vec<Cell<'static>> {
    let mut cells = vec![
        Cell::from(opportunity.coin())
            .style(Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD)),
        Cell::from(format_price(opportunity.current_price)),
        Cell::from(format_price(opportunity.best_buy_price)).style(Style::default().fg(C_BUY)),
        Cell::from(format_price(opportunity.target_price)).style(Style::default().fg(C_BUY)),
        Cell::from(format_price(opportunity.stop_loss_price)).style(Style::default().fg(C_SELL)),
        Cell::from(opportunity.trend.to_string()).style(Style::default().fg(C_BUY)),
        Cell::from(opportunity.hold_period.to_string()),
        Cell::from(opportunity.signal_strength_label()).style(Style::default().fg(C_WARN)),
    ];

    if let Some(signal) = &opportunity.explosion {
        let decision_style = match signal.trade_decision {
            TradeDecision::StrongBuy => Style::default().fg(C_BUY).add_modifier(Modifier::BOLD),
            TradeDecision::Buy => Style::default().fg(C_BUY),
            TradeDecision::Hold => Style::default().fg(C_WARN),
            TradeDecision::Avoid => Style::default().fg(C_SELL),
        };
        cells.push(Cell::from(format!("{:.1}", signal.win_probability)));
        cells.push(Cell::from(signal.trade_decision.to_string()).style(decision_style));
        cells.push(Cell::from(if signal.ai_prediction { "YES" } else { "NO" }));
    }

    cells
}

fn stats_line(stats: &EvaluationStats, rejected: usize) -> String {
    let skipped = &stats.skipped;
    format!(
        "evaluated {}  qualified {}  skipped {} (symbol {}, price {}, volume {}, history {})  rejected {}",
        stats.evaluated,
        stats.qualified,
        skipped.total(),
        skipped.malformed_symbol,
        skipped.invalid_price,
        skipped.invalid_volume,
        skipped.missing_history,
        rejected,
    )
}

fn render_footer(f: &mut Frame, area: Rect, view: &ScannerView) {
    let stats = view.latest.as_ref().and_then(|report| {
        report
            .outcome
            .evaluation()
            .map(|evaluation| stats_line(&evaluation.stats, report.rejected))
    });

    let mut spans = Vec::new();
    if let Some(stats) = stats {
        spans.push(Span::styled(format!(" {stats}  │"), Style::default().fg(C_DIM)));
    }
    spans.push(Span::raw("  [r] Refresh  [R] Force refresh  [q] Quit"));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        evaluator::SkipCounts,
        opportunity::{ExplosionSignal, HoldPeriod, Trend, VolumeSentiment},
    };
    use chrono::Utc;
    use ratatui::{Terminal, backend::TestBackend};
    use smol_str::SmolStr;
    use swing_data::FetchError;

    fn opportunity(explosion: Option<ExplosionSignal>) -> Opportunity {
        Opportunity {
            base_asset: SmolStr::new("BTC"),
            quote_asset: SmolStr::new("INR"),
            current_price: 100000.0,
            best_buy_price: 98000.0,
            target_price: 108000.0,
            stop_loss_price: 96000.0,
            trend: Trend::Uptrend,
            hold_period: HoldPeriod::TwoToFourDays,
            volume_ratio: 2.0,
            change_24h: 6.0,
            change_7d: 6.0,
            explosion,
        }
    }

    fn report(outcome: CycleOutcome) -> CycleReport {
        CycleReport {
            cycle: 1,
            finished_at: Utc::now(),
            from_cache: false,
            rejected: 0,
            outcome,
        }
    }

    fn render(view: &ScannerView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(180, 16)).unwrap();
        terminal.draw(|f| render_scanner(f, view)).unwrap();

        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn view(config: &ScannerConfig, outcome: Option<CycleOutcome>) -> ScannerView {
        let mut view = ScannerView::new(config);
        if let Some(outcome) = outcome {
            view.apply(report(outcome));
        }
        view
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(98000.0), "98000.0000");
        assert_eq!(format_price(0.123456), "0.1235");
    }

    #[test]
    fn test_render_loading_state() {
        let screen = render(&view(&ScannerConfig::swing(), None));
        assert!(screen.contains("Crypto Swing Trade Predictor"));
        assert!(screen.contains("Fetching ticker data..."));
        assert!(screen.contains("[q] Quit"));
    }

    #[test]
    fn test_render_swing_table() {
        let evaluation = Evaluation {
            opportunities: vec![opportunity(None)],
            stats: EvaluationStats {
                evaluated: 3,
                qualified: 1,
                skipped: SkipCounts {
                    malformed_symbol: 2,
                    ..SkipCounts::default()
                },
            },
        };
        let screen = render(&view(
            &ScannerConfig::swing(),
            Some(CycleOutcome::Opportunities(evaluation)),
        ));

        for expected in [
            "Coin",
            "Best Buy Price",
            "Signal Strength",
            "BTC/INR",
            "100000.0000",
            "98000.0000",
            "108000.0000",
            "96000.0000",
            "Uptrend",
            "2-4 days",
            "2.00x Volume Spike",
            "skipped 2 (symbol 2",
        ] {
            assert!(screen.contains(expected), "missing {expected:?}:\n{screen}");
        }
        assert!(!screen.contains("Decision"));
    }

    #[test]
    fn test_render_explosion_columns() {
        let signal = ExplosionSignal {
            win_probability: 88.0,
            trade_decision: TradeDecision::StrongBuy,
            ai_prediction: true,
            volatility: 1.0,
            volume_sentiment: VolumeSentiment::Bullish,
        };
        let evaluation = Evaluation {
            opportunities: vec![opportunity(Some(signal))],
            stats: EvaluationStats::default(),
        };
        let screen = render(&view(
            &ScannerConfig::explosion(),
            Some(CycleOutcome::Opportunities(evaluation)),
        ));

        for expected in ["Crypto Explosion Predictor", "Win %", "Decision", "88.0", "STRONG BUY", "YES"] {
            assert!(screen.contains(expected), "missing {expected:?}:\n{screen}");
        }
    }

    #[test]
    fn test_render_empty_and_error_states() {
        struct TestCase {
            config: ScannerConfig,
            outcome: CycleOutcome,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: swing, nothing qualified
                config: ScannerConfig::swing(),
                outcome: CycleOutcome::NoOpportunities(Evaluation::default()),
                expected: "No swing trade opportunities found",
            },
            TestCase {
                // TC1: explosion, nothing qualified
                config: ScannerConfig::explosion(),
                outcome: CycleOutcome::NoOpportunities(Evaluation::default()),
                expected: "No explosion candidates found",
            },
            TestCase {
                // TC2: fetch failed
                config: ScannerConfig::swing(),
                outcome: CycleOutcome::FetchFailed(FetchError::Status { status: 503 }),
                expected: "Failed to fetch ticker data",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let screen = render(&view(&test.config, Some(test.outcome)));
            assert!(screen.contains(test.expected), "TC{} failed", index);
        }
    }
}
