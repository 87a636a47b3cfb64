//! Signal Evaluator: turns a ticker snapshot into ranked-by-input-order
//! [`Opportunity`] records.

use serde::Serialize;
use swing_data::{MarketSymbol, RecordParseError, TickerRecord};
use tracing::trace;

use crate::{
    config::{
        ExplosionParams, HoldTiers, PriceOffsets, ScoringMode, SignalConfig, SignalThresholds,
        WinProbabilityModel,
    },
    history::MarketHistoryProvider,
    opportunity::{
        ExplosionSignal, HoldPeriod, Opportunity, TradeDecision, Trend, VolumeSentiment,
    },
};

/// Golden ratio used to stretch explosion targets.
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Why a record produced no opportunity without failing any threshold.
#[derive(Debug, Clone, PartialEq)]
enum Skip {
    Parse(RecordParseError),
    MissingHistory,
}

impl From<RecordParseError> for Skip {
    fn from(error: RecordParseError) -> Self {
        Skip::Parse(error)
    }
}

/// Per-reason counts of records skipped in one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub malformed_symbol: usize,
    pub invalid_price: usize,
    pub invalid_volume: usize,
    pub missing_history: usize,
}

impl SkipCounts {
    fn record(&mut self, skip: &Skip) {
        match skip {
            Skip::Parse(RecordParseError::MalformedSymbol { .. }) => self.malformed_symbol += 1,
            Skip::Parse(error) if error.field() == Some("volume") => self.invalid_volume += 1,
            Skip::Parse(_) => self.invalid_price += 1,
            Skip::MissingHistory => self.missing_history += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.malformed_symbol + self.invalid_price + self.invalid_volume + self.missing_history
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationStats {
    /// Records looked at.
    pub evaluated: usize,
    /// Records that produced an opportunity.
    pub qualified: usize,
    pub skipped: SkipCounts,
}

/// Output of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    /// In snapshot order.
    pub opportunities: Vec<Opportunity>,
    pub stats: EvaluationStats,
}

/// Applies the threshold rules of a [`SignalConfig`] to ticker records.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: SignalConfig,
    delimiter: char,
}

impl Evaluator {
    pub fn new(config: SignalConfig, delimiter: char) -> Self {
        Self { config, delimiter }
    }

    pub fn mode(&self) -> ScoringMode {
        self.config.mode
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Evaluate every record, preserving input order.
    ///
    /// Records that cannot be parsed are skipped and counted, never returned as errors.
    pub fn evaluate<H>(&self, records: &[TickerRecord], history: &mut H) -> Evaluation
    where
        H: MarketHistoryProvider + ?Sized,
    {
        let mut evaluation = Evaluation::default();

        for record in records {
            evaluation.stats.evaluated += 1;
            match self.evaluate_record(record, history) {
                Ok(Some(opportunity)) => evaluation.opportunities.push(opportunity),
                Ok(None) => {}
                Err(skip) => {
                    trace!(market = %record.market, ?skip, "skipping ticker record");
                    evaluation.stats.skipped.record(&skip);
                }
            }
        }

        evaluation.stats.qualified = evaluation.opportunities.len();
        evaluation
    }

    fn evaluate_record<H>(
        &self,
        record: &TickerRecord,
        history: &mut H,
    ) -> Result<Option<Opportunity>, Skip>
    where
        H: MarketHistoryProvider + ?Sized,
    {
        let symbol = record.symbol(self.delimiter)?;
        let price = record.last_price()?;
        if price <= 0.0 {
            return Err(invalid_number("last_price", price).into());
        }
        let volume = record.volume()?;
        if volume < 0.0 {
            return Err(invalid_number("volume", volume).into());
        }

        let market = history
            .history(record, volume)
            .ok_or(Skip::MissingHistory)?;
        let volume_ratio = volume_ratio(volume, market.avg_volume);

        if !passes_gates(
            &self.config.thresholds,
            market.change_24h,
            market.change_7d,
            volume_ratio,
        ) {
            return Ok(None);
        }

        let hold_period = hold_period(&self.config.hold_tiers, market.change_7d, volume_ratio);
        let metrics = Metrics {
            symbol,
            price,
            volume,
            volume_ratio,
            change_24h: market.change_24h,
            change_7d: market.change_7d,
            hold_period,
        };

        let opportunity = match self.config.mode {
            ScoringMode::Swing => Some(swing_opportunity(&self.config.offsets, metrics)),
            ScoringMode::Explosion => explosion_opportunity(&self.config, metrics),
        };

        Ok(opportunity)
    }
}

/// Intermediate per-record figures shared by both scoring modes.
struct Metrics {
    symbol: MarketSymbol,
    price: f64,
    volume: f64,
    volume_ratio: f64,
    change_24h: f64,
    change_7d: f64,
    hold_period: HoldPeriod,
}

fn invalid_number(field: &'static str, value: f64) -> RecordParseError {
    RecordParseError::InvalidNumber {
        field,
        value: value.to_string(),
    }
}

/// `volume / avg_volume`, or `1.0` when the average is zero or not finite.
pub fn volume_ratio(volume: f64, avg_volume: f64) -> f64 {
    if avg_volume > 0.0 && avg_volume.is_finite() {
        volume / avg_volume
    } else {
        1.0
    }
}

/// Momentum, volume strength and trend gates.
pub fn passes_gates(
    thresholds: &SignalThresholds,
    change_24h: f64,
    change_7d: f64,
    volume_ratio: f64,
) -> bool {
    let is_momentum = change_24h > thresholds.change_24h && change_7d > thresholds.change_7d;
    let is_volume_strong = volume_ratio > thresholds.volume_ratio;
    let is_trending = change_7d >= change_24h;

    is_momentum && is_volume_strong && is_trending
}

pub fn hold_period(tiers: &HoldTiers, change_7d: f64, volume_ratio: f64) -> HoldPeriod {
    if change_7d > tiers.fast.change_7d && volume_ratio > tiers.fast.volume_ratio {
        HoldPeriod::OneToTwoDays
    } else if change_7d > tiers.medium.change_7d && volume_ratio > tiers.medium.volume_ratio {
        HoldPeriod::TwoToFourDays
    } else {
        HoldPeriod::ThreeToSevenDays
    }
}

/// Base + capped momentum bonus + capped volume bonus, clamped to `[0, ceiling]`.
pub fn win_probability(model: &WinProbabilityModel, change_24h: f64, volume_ratio: f64) -> f64 {
    let momentum_bonus = (change_24h * model.momentum_weight)
        .max(0.0)
        .min(model.momentum_cap);
    let volume_bonus = ((volume_ratio - 1.0) * model.volume_weight)
        .max(0.0)
        .min(model.volume_cap);

    (model.base + momentum_bonus + volume_bonus)
        .max(0.0)
        .min(model.ceiling)
}

pub fn trade_decision(model: &WinProbabilityModel, win_probability: f64) -> TradeDecision {
    if win_probability >= model.strong_buy {
        TradeDecision::StrongBuy
    } else if win_probability >= model.buy {
        TradeDecision::Buy
    } else if win_probability >= model.hold {
        TradeDecision::Hold
    } else {
        TradeDecision::Avoid
    }
}

/// Volume-derived volatility (%), capped at the configured ceiling.
pub fn volatility(params: &ExplosionParams, volume: f64) -> f64 {
    (volume * params.volatility_per_volume)
        .max(0.0)
        .min(params.volatility_ceiling)
}

fn swing_opportunity(offsets: &PriceOffsets, metrics: Metrics) -> Opportunity {
    let price = metrics.price;
    Opportunity {
        base_asset: metrics.symbol.base,
        quote_asset: metrics.symbol.quote,
        current_price: price,
        best_buy_price: price * offsets.buy,
        target_price: price * offsets.target,
        stop_loss_price: price * offsets.stop_loss,
        trend: Trend::Uptrend,
        hold_period: metrics.hold_period,
        volume_ratio: metrics.volume_ratio,
        change_24h: metrics.change_24h,
        change_7d: metrics.change_7d,
        explosion: None,
    }
}

/// Explosion scoring; `None` unless the prediction flag is raised.
fn explosion_opportunity(config: &SignalConfig, metrics: Metrics) -> Option<Opportunity> {
    let params = &config.explosion;
    let price = metrics.price;

    let volatility = volatility(params, metrics.volume);
    let win_probability = win_probability(&params.win, metrics.change_24h, metrics.volume_ratio);
    let volume_sentiment = if metrics.volume_ratio > config.thresholds.volume_ratio {
        VolumeSentiment::Bullish
    } else {
        VolumeSentiment::Neutral
    };
    let ai_prediction = win_probability > params.win.prediction_floor
        && volume_sentiment == VolumeSentiment::Bullish
        && volatility < params.volatility_cap;

    if !ai_prediction {
        return None;
    }

    let target_multiplier = 1.0 + params.target_base * GOLDEN_RATIO * (1.0 + volatility / 100.0);
    let stop_multiplier = if metrics.change_24h > params.stop_tier_change {
        params.stop_wide
    } else {
        params.stop_tight
    };

    Some(Opportunity {
        base_asset: metrics.symbol.base,
        quote_asset: metrics.symbol.quote,
        current_price: price,
        best_buy_price: price * config.offsets.buy,
        target_price: price * target_multiplier,
        stop_loss_price: price * stop_multiplier,
        trend: Trend::Uptrend,
        hold_period: metrics.hold_period,
        volume_ratio: metrics.volume_ratio,
        change_24h: metrics.change_24h,
        change_7d: metrics.change_7d,
        explosion: Some(ExplosionSignal {
            win_probability,
            trade_decision: trade_decision(&params.win, win_probability),
            ai_prediction,
            volatility,
            volume_sentiment,
        }),
    })
}
