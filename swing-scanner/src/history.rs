//! Sources of 24h / 7d change and average volume for the evaluator.
//!
//! The ticker snapshot carries no historical series, so these figures come
//! either from the exchange-reported 24h change or from a random placeholder.

use rand::{Rng, SeedableRng, rngs::StdRng};
use swing_data::TickerRecord;

use crate::config::{
    HistoryConfig, SIMULATED_CHANGE_24H, SIMULATED_SEVEN_DAY_FACTOR, SIMULATED_VOLUME_DIVISOR,
    UniformRange,
};

/// Historical context for one market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketHistory {
    pub change_24h: f64,
    pub change_7d: f64,
    pub avg_volume: f64,
}

/// Provides [`MarketHistory`] per ticker record.
///
/// Returning `None` skips the record.
pub trait MarketHistoryProvider: Send {
    fn history(&mut self, record: &TickerRecord, volume: f64) -> Option<MarketHistory>;
}

impl<P> MarketHistoryProvider for Box<P>
where
    P: MarketHistoryProvider + ?Sized,
{
    fn history(&mut self, record: &TickerRecord, volume: f64) -> Option<MarketHistory> {
        (**self).history(record, volume)
    }
}

/// Deterministic history from the exchange-reported 24h change.
///
/// Declines records without a parseable 24h change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportedHistory {
    pub volume_divisor: f64,
    pub seven_day_multiplier: f64,
}

impl Default for ReportedHistory {
    fn default() -> Self {
        Self {
            volume_divisor: 2.0,
            seven_day_multiplier: 1.0,
        }
    }
}

impl MarketHistoryProvider for ReportedHistory {
    fn history(&mut self, record: &TickerRecord, volume: f64) -> Option<MarketHistory> {
        let change_24h = record.change_24h()?.ok()?;
        Some(MarketHistory {
            change_24h,
            change_7d: change_24h * self.seven_day_multiplier,
            avg_volume: volume / self.volume_divisor,
        })
    }
}

/// Placeholder history drawn from an injected RNG.
#[derive(Debug, Clone)]
pub struct SimulatedHistory<R> {
    rng: R,
    change_24h: UniformRange,
    seven_day_factor: UniformRange,
    volume_divisor: UniformRange,
    prefer_reported: bool,
}

impl<R> SimulatedHistory<R>
where
    R: Rng,
{
    pub fn new(
        rng: R,
        change_24h: UniformRange,
        seven_day_factor: UniformRange,
        volume_divisor: UniformRange,
    ) -> Self {
        Self {
            rng,
            change_24h,
            seven_day_factor,
            volume_divisor,
            prefer_reported: false,
        }
    }

    /// Use the reported 24h change when the record carries one.
    pub fn with_prefer_reported(mut self, prefer_reported: bool) -> Self {
        self.prefer_reported = prefer_reported;
        self
    }

    fn draw(&mut self, range: UniformRange) -> f64 {
        if range.high > range.low {
            self.rng.random_range(range.low..range.high)
        } else {
            range.low
        }
    }
}

impl SimulatedHistory<StdRng> {
    /// Default placeholder ranges with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(
            StdRng::seed_from_u64(seed),
            SIMULATED_CHANGE_24H,
            SIMULATED_SEVEN_DAY_FACTOR,
            SIMULATED_VOLUME_DIVISOR,
        )
    }
}

impl<R> MarketHistoryProvider for SimulatedHistory<R>
where
    R: Rng + Send,
{
    fn history(&mut self, record: &TickerRecord, volume: f64) -> Option<MarketHistory> {
        let reported = self
            .prefer_reported
            .then(|| record.change_24h().and_then(Result::ok))
            .flatten();

        let change_24h = match reported {
            Some(change) => change,
            None => self.draw(self.change_24h),
        };
        let change_7d = change_24h * self.draw(self.seven_day_factor);
        let avg_volume = volume / self.draw(self.volume_divisor);

        Some(MarketHistory {
            change_24h,
            change_7d,
            avg_volume,
        })
    }
}

/// Build the provider described by `config`.
pub fn from_config(config: &HistoryConfig) -> Box<dyn MarketHistoryProvider> {
    match *config {
        HistoryConfig::Reported {
            volume_divisor,
            seven_day_multiplier,
        } => Box::new(ReportedHistory {
            volume_divisor,
            seven_day_multiplier,
        }),
        HistoryConfig::Simulated {
            change_24h,
            seven_day_factor,
            volume_divisor,
            prefer_reported,
            seed,
        } => {
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            Box::new(
                SimulatedHistory::new(rng, change_24h, seven_day_factor, volume_divisor)
                    .with_prefer_reported(prefer_reported),
            )
        }
    }
}
