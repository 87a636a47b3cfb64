use derive_more::Display;
use serde::Serialize;
use smol_str::SmolStr;

/// Direction of the move a candidate is expected to make.
///
/// Only uptrends are ever produced: every gate requires positive momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Trend {
    #[display("Uptrend")]
    Uptrend,
}

/// Coarse estimate of how long a position should be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum HoldPeriod {
    #[display("1-2 days")]
    OneToTwoDays,
    #[display("2-4 days")]
    TwoToFourDays,
    #[display("3-7 days")]
    ThreeToSevenDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum TradeDecision {
    #[display("STRONG BUY")]
    StrongBuy,
    #[display("BUY")]
    Buy,
    #[display("HOLD")]
    Hold,
    #[display("AVOID")]
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum VolumeSentiment {
    #[display("Bullish")]
    Bullish,
    #[display("Neutral")]
    Neutral,
}

/// Extra scoring attached to candidates in explosion mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExplosionSignal {
    /// Clamped to `[0, ceiling]`.
    pub win_probability: f64,
    pub trade_decision: TradeDecision,
    pub ai_prediction: bool,
    /// Volume-derived volatility estimate (%)
    pub volatility: f64,
    pub volume_sentiment: VolumeSentiment,
}

/// One qualifying market from a single refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub base_asset: SmolStr,
    pub quote_asset: SmolStr,
    pub current_price: f64,
    pub best_buy_price: f64,
    pub target_price: f64,
    pub stop_loss_price: f64,
    pub trend: Trend,
    pub hold_period: HoldPeriod,
    pub volume_ratio: f64,
    pub change_24h: f64,
    pub change_7d: f64,
    pub explosion: Option<ExplosionSignal>,
}

impl Opportunity {
    /// `BASE/QUOTE`
    pub fn coin(&self) -> String {
        format!("{}/{}", self.base_asset, self.quote_asset)
    }

    pub fn signal_strength_label(&self) -> String {
        format!("{:.2}x Volume Spike", self.volume_ratio)
    }

    /// Upside to target as a percentage of the current price.
    pub fn upside_pct(&self) -> f64 {
        if self.current_price > 0.0 {
            (self.target_price - self.current_price) / self.current_price * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity() -> Opportunity {
        Opportunity {
            base_asset: SmolStr::new("BTC"),
            quote_asset: SmolStr::new("INR"),
            current_price: 100.0,
            best_buy_price: 98.0,
            target_price: 108.0,
            stop_loss_price: 96.0,
            trend: Trend::Uptrend,
            hold_period: HoldPeriod::TwoToFourDays,
            volume_ratio: 1.8456,
            change_24h: 3.0,
            change_7d: 6.0,
            explosion: None,
        }
    }

    #[test]
    fn test_labels() {
        let opportunity = opportunity();
        assert_eq!(opportunity.coin(), "BTC/INR");
        assert_eq!(opportunity.signal_strength_label(), "1.85x Volume Spike");
        assert_eq!(opportunity.trend.to_string(), "Uptrend");
        assert_eq!(opportunity.hold_period.to_string(), "2-4 days");
        assert!((opportunity.upside_pct() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(HoldPeriod::OneToTwoDays.to_string(), "1-2 days");
        assert_eq!(HoldPeriod::ThreeToSevenDays.to_string(), "3-7 days");
        assert_eq!(TradeDecision::StrongBuy.to_string(), "STRONG BUY");
        assert_eq!(VolumeSentiment::Bullish.to_string(), "Bullish");
    }

    #[test]
    fn test_opportunity_serializes() {
        let value = serde_json::to_value(opportunity()).unwrap();

        assert_eq!(value["base_asset"], "BTC");
        assert_eq!(value["quote_asset"], "INR");
        assert_eq!(value["hold_period"], "TwoToFourDays");
        assert!(value["explosion"].is_null());
    }
}
