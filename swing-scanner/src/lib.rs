/// Swing Scanner - Shared Library
///
/// Everything behind the two binaries:
/// - swing-predictor: fixed-offset swing trade candidates, refreshed on demand
/// - explosion-predictor: INR markets scored for breakout potential, polled continuously
///
/// The library includes:
/// - Layered configuration and the two presets
/// - The signal evaluator and its pluggable history source
/// - The refresh loop worker and the ratatui view
pub mod app;
pub mod config;
pub mod evaluator;
pub mod history;
pub mod opportunity;
pub mod widget;
pub mod worker;

pub use config::{
    ConfigError, HistoryConfig, RefreshPolicy, ScannerConfig, ScoringMode, SignalConfig,
};
pub use evaluator::{Evaluation, EvaluationStats, Evaluator, SkipCounts};
pub use history::{MarketHistory, MarketHistoryProvider, ReportedHistory, SimulatedHistory};
pub use opportunity::{
    ExplosionSignal, HoldPeriod, Opportunity, TradeDecision, Trend, VolumeSentiment,
};
pub use worker::{
    CycleOutcome, CycleReport, RefreshRequest, Scanner, ScannerHandle, spawn_scanner,
};
