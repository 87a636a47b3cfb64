//! Scanner configuration.
//!
//! Layering: preset (`swing` / `explosion`) → optional JSON file named by
//! `SCANNER_CONFIG` → individual environment overrides.

use std::{path::Path, str::FromStr, time::Duration};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use swing_data::{TickerClientConfig, client::DEFAULT_TICKER_URL};
use thiserror::Error;
use url::Url;

/// Errors raised while assembling a [`ScannerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which scoring formula the evaluator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Fixed-percentage buy / target / stop levels.
    #[display("swing")]
    Swing,
    /// Golden-ratio target, tiered stop and win probability.
    #[display("explosion")]
    Explosion,
}

/// How often the fetch → evaluate → display pipeline reruns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Rerun on user request, reusing a fetched snapshot younger than the TTL.
    CacheTtl { ttl_secs: u64 },
    /// Rerun every interval until stopped.
    ContinuousPoll { interval_ms: u64 },
}

impl RefreshPolicy {
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self {
            RefreshPolicy::CacheTtl { ttl_secs } => Some(Duration::from_secs(*ttl_secs)),
            RefreshPolicy::ContinuousPoll { .. } => None,
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        match self {
            RefreshPolicy::CacheTtl { .. } => None,
            RefreshPolicy::ContinuousPoll { interval_ms } => {
                Some(Duration::from_millis(*interval_ms))
            }
        }
    }
}

impl std::fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshPolicy::CacheTtl { ttl_secs } => write!(f, "cache {}s", ttl_secs),
            RefreshPolicy::ContinuousPoll { interval_ms } => write!(f, "poll {}ms", interval_ms),
        }
    }
}

/// Gate thresholds (T1, T2, T3).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// T1: minimum 24h change (%)
    pub change_24h: f64,
    /// T2: minimum 7d change (%)
    pub change_7d: f64,
    /// T3: minimum volume ratio
    pub volume_ratio: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            change_24h: 1.5,
            change_7d: 3.0,
            volume_ratio: 1.2,
        }
    }
}

/// Lower bounds (exclusive) for one hold-period tier.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct HoldTier {
    pub change_7d: f64,
    pub volume_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HoldTiers {
    /// Qualifies for "1-2 days".
    pub fast: HoldTier,
    /// Qualifies for "2-4 days".
    pub medium: HoldTier,
}

impl Default for HoldTiers {
    fn default() -> Self {
        Self {
            fast: HoldTier {
                change_7d: 8.0,
                volume_ratio: 2.5,
            },
            medium: HoldTier {
                change_7d: 5.0,
                volume_ratio: 1.8,
            },
        }
    }
}

/// Price level multipliers applied to the current price.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceOffsets {
    pub buy: f64,
    pub target: f64,
    pub stop_loss: f64,
}

impl Default for PriceOffsets {
    fn default() -> Self {
        Self {
            buy: 0.98,
            target: 1.08,
            stop_loss: 0.96,
        }
    }
}

/// Win probability score and the bands derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WinProbabilityModel {
    pub base: f64,
    /// Points per % of 24h change.
    pub momentum_weight: f64,
    pub momentum_cap: f64,
    /// Points per unit of volume ratio above 1.0.
    pub volume_weight: f64,
    pub volume_cap: f64,
    pub ceiling: f64,
    pub strong_buy: f64,
    pub buy: f64,
    pub hold: f64,
    /// Win probability a prediction must exceed.
    pub prediction_floor: f64,
}

impl Default for WinProbabilityModel {
    fn default() -> Self {
        Self {
            base: 50.0,
            momentum_weight: 2.0,
            momentum_cap: 20.0,
            volume_weight: 20.0,
            volume_cap: 30.0,
            ceiling: 95.0,
            strong_buy: 80.0,
            buy: 65.0,
            hold: 50.0,
            prediction_floor: 70.0,
        }
    }
}

/// Parameters only used in [`ScoringMode::Explosion`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplosionParams {
    /// Base target move (fraction) before golden-ratio and volatility scaling.
    pub target_base: f64,
    /// Volatility (%) per unit of traded volume.
    pub volatility_per_volume: f64,
    pub volatility_ceiling: f64,
    /// Predictions require volatility strictly below this.
    pub volatility_cap: f64,
    /// 24h change (%) above which the wide stop applies.
    pub stop_tier_change: f64,
    pub stop_wide: f64,
    pub stop_tight: f64,
    pub win: WinProbabilityModel,
}

impl Default for ExplosionParams {
    fn default() -> Self {
        Self {
            target_base: 0.05,
            volatility_per_volume: 1e-7,
            volatility_ceiling: 20.0,
            volatility_cap: 5.0,
            stop_tier_change: 3.0,
            stop_wide: 0.95,
            stop_tight: 0.97,
            win: WinProbabilityModel::default(),
        }
    }
}

/// Everything the evaluator needs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalConfig {
    pub mode: ScoringMode,
    pub thresholds: SignalThresholds,
    pub hold_tiers: HoldTiers,
    pub offsets: PriceOffsets,
    pub explosion: ExplosionParams,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Swing,
            thresholds: SignalThresholds::default(),
            hold_tiers: HoldTiers::default(),
            offsets: PriceOffsets::default(),
            explosion: ExplosionParams::default(),
        }
    }
}

/// Half-open `[low, high)` range for uniform draws.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

impl UniformRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

/// Placeholder 24h change (%) range.
pub const SIMULATED_CHANGE_24H: UniformRange = UniformRange::new(1.5, 6.0);
/// Placeholder 7d / 24h change ratio range.
pub const SIMULATED_SEVEN_DAY_FACTOR: UniformRange = UniformRange::new(1.3, 2.0);
/// Placeholder volume / average-volume range.
pub const SIMULATED_VOLUME_DIVISOR: UniformRange = UniformRange::new(1.2, 2.0);

/// Source of 24h / 7d change and average volume.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryConfig {
    /// Deterministic, from the exchange-reported 24h change.
    Reported {
        volume_divisor: f64,
        seven_day_multiplier: f64,
    },
    /// Random placeholder figures.
    Simulated {
        change_24h: UniformRange,
        seven_day_factor: UniformRange,
        volume_divisor: UniformRange,
        /// Use the exchange-reported 24h change when present.
        prefer_reported: bool,
        seed: Option<u64>,
    },
}

impl HistoryConfig {
    pub const fn reported() -> Self {
        HistoryConfig::Reported {
            volume_divisor: 2.0,
            seven_day_multiplier: 1.0,
        }
    }

    pub const fn simulated() -> Self {
        HistoryConfig::Simulated {
            change_24h: SIMULATED_CHANGE_24H,
            seven_day_factor: SIMULATED_SEVEN_DAY_FACTOR,
            volume_divisor: SIMULATED_VOLUME_DIVISOR,
            prefer_reported: false,
            seed: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::simulated()
    }
}

/// Complete scanner configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Title shown above the table
    pub title: String,
    /// Ticker endpoint
    pub ticker_url: Url,
    /// Bound on each ticker request
    pub fetch_timeout_secs: u64,
    pub refresh: RefreshPolicy,
    /// Separator between base and quote in market symbols
    pub symbol_delimiter: char,
    /// Keep only markets quoted in this currency
    pub quote_filter: Option<String>,
    pub signal: SignalConfig,
    pub history: HistoryConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::swing()
    }
}

impl ScannerConfig {
    /// Swing trade predictor: fixed offsets, 60s cache, refresh on demand.
    pub fn swing() -> Self {
        Self {
            title: "Crypto Swing Trade Predictor".to_string(),
            ticker_url: default_ticker_url(),
            fetch_timeout_secs: 10,
            refresh: RefreshPolicy::CacheTtl { ttl_secs: 60 },
            symbol_delimiter: '_',
            quote_filter: None,
            signal: SignalConfig::default(),
            history: HistoryConfig::simulated(),
        }
    }

    /// Explosion predictor: INR markets, richer scoring, 1s continuous poll.
    pub fn explosion() -> Self {
        Self {
            title: "Crypto Explosion Predictor".to_string(),
            ticker_url: default_ticker_url(),
            fetch_timeout_secs: 5,
            refresh: RefreshPolicy::ContinuousPoll { interval_ms: 1000 },
            symbol_delimiter: '_',
            quote_filter: Some("INR".to_string()),
            signal: SignalConfig {
                mode: ScoringMode::Explosion,
                thresholds: SignalThresholds {
                    change_24h: 2.0,
                    change_7d: 5.0,
                    volume_ratio: 1.8,
                },
                ..SignalConfig::default()
            },
            history: HistoryConfig::simulated(),
        }
    }

    /// Set ticker endpoint
    pub fn with_ticker_url(mut self, url: Url) -> Self {
        self.ticker_url = url;
        self
    }

    /// Set refresh policy
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// Set quote currency filter
    pub fn with_quote_filter(mut self, quote: Option<String>) -> Self {
        self.quote_filter = quote;
        self
    }

    /// Set history source
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn client_config(&self) -> TickerClientConfig {
        TickerClientConfig::new(self.ticker_url.clone()).with_timeout(self.fetch_timeout())
    }

    /// Resolve the effective configuration from `preset`, `SCANNER_CONFIG` and
    /// environment overrides.
    pub fn load(preset: Self) -> Result<Self, ConfigError> {
        let base = match std::env::var("SCANNER_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => preset,
        };

        let config = base.with_env_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take the swing preset's values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|error| ConfigError::Parse {
            path: path.display().to_string(),
            message: error.to_string(),
        })
    }

    /// Apply overrides from `lookup` (normally `std::env::var`).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TICKER_URL") {
            self.ticker_url = parse_var("TICKER_URL", &url)?;
        }
        if let Some(quote) = lookup("QUOTE_FILTER") {
            let quote = quote.trim().to_uppercase();
            self.quote_filter = (!quote.is_empty()).then_some(quote);
        }
        if let Some(secs) = lookup("FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_var("FETCH_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("CACHE_TTL_SECS") {
            self.refresh = RefreshPolicy::CacheTtl {
                ttl_secs: parse_var("CACHE_TTL_SECS", &secs)?,
            };
        }
        if let Some(ms) = lookup("POLL_INTERVAL_MS") {
            self.refresh = RefreshPolicy::ContinuousPoll {
                interval_ms: parse_var("POLL_INTERVAL_MS", &ms)?,
            };
        }
        if let Some(t1) = lookup("SIGNAL_T1") {
            self.signal.thresholds.change_24h = parse_var("SIGNAL_T1", &t1)?;
        }
        if let Some(t2) = lookup("SIGNAL_T2") {
            self.signal.thresholds.change_7d = parse_var("SIGNAL_T2", &t2)?;
        }
        if let Some(t3) = lookup("SIGNAL_T3") {
            self.signal.thresholds.volume_ratio = parse_var("SIGNAL_T3", &t3)?;
        }
        if let Some(mode) = lookup("HISTORY_MODE") {
            self.history = match mode.trim().to_lowercase().as_str() {
                "reported" => HistoryConfig::reported(),
                "simulated" => HistoryConfig::simulated(),
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "HISTORY_MODE",
                        value: mode,
                    });
                }
            };
        }
        if let Some(raw) = lookup("HISTORY_SEED") {
            let value: u64 = parse_var("HISTORY_SEED", &raw)?;
            match &mut self.history {
                HistoryConfig::Simulated { seed, .. } => *seed = Some(value),
                HistoryConfig::Reported { .. } => {
                    return Err(ConfigError::InvalidEnv {
                        var: "HISTORY_SEED",
                        value: raw,
                    });
                }
            }
        }

        Ok(self)
    }

    /// Reject values the evaluator or refresh loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch timeout must be positive".into()));
        }

        match self.refresh {
            RefreshPolicy::CacheTtl { ttl_secs: 0 } => {
                return Err(ConfigError::Invalid("cache TTL must be positive".into()));
            }
            RefreshPolicy::ContinuousPoll { interval_ms: 0 } => {
                return Err(ConfigError::Invalid("poll interval must be positive".into()));
            }
            _ => {}
        }

        let thresholds = &self.signal.thresholds;
        let finite = [
            thresholds.change_24h,
            thresholds.change_7d,
            thresholds.volume_ratio,
            self.signal.offsets.buy,
            self.signal.offsets.target,
            self.signal.offsets.stop_loss,
        ];
        if finite.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::Invalid("thresholds and offsets must be finite".into()));
        }

        let win = &self.signal.explosion.win;
        if win.momentum_cap < 0.0 || win.volume_cap < 0.0 || win.ceiling < 0.0 {
            return Err(ConfigError::Invalid(
                "win probability caps must be non-negative".into(),
            ));
        }

        match self.history {
            HistoryConfig::Reported { volume_divisor, .. } if volume_divisor <= 0.0 => {
                Err(ConfigError::Invalid("volume divisor must be positive".into()))
            }
            HistoryConfig::Simulated {
                change_24h,
                seven_day_factor,
                volume_divisor,
                ..
            } if !(change_24h.is_valid()
                && seven_day_factor.is_valid()
                && volume_divisor.is_valid()) =>
            {
                Err(ConfigError::Invalid(
                    "simulated history ranges must be finite with low <= high".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn default_ticker_url() -> Url {
    Url::parse(DEFAULT_TICKER_URL).expect("DEFAULT_TICKER_URL is a valid URL")
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}
