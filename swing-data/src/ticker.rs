//! CoinDCX ticker snapshot model.
//!
//! The public ticker endpoint returns a JSON array with one object per market.
//! Numeric fields arrive either as JSON numbers or as numeric strings, so they
//! are kept raw here and parsed on demand by the evaluator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{FetchError, RecordParseError};

/// Numeric ticker field as sent by the exchange.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Parse into a finite `f64`.
    pub fn parse(&self, field: &'static str) -> Result<f64, RecordParseError> {
        let value = match self {
            RawNumber::Number(value) => *value,
            RawNumber::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| RecordParseError::InvalidNumber {
                        field,
                        value: text.clone(),
                    })?
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(RecordParseError::InvalidNumber {
                field,
                value: value.to_string(),
            })
        }
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

/// One market entry from the ticker snapshot.
///
/// See docs: <https://docs.coindcx.com/#ticker>
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TickerRecord {
    pub market: String,
    #[serde(default)]
    pub last_price: Option<RawNumber>,
    #[serde(default)]
    pub volume: Option<RawNumber>,
    #[serde(default)]
    pub change_24_hour: Option<RawNumber>,
    #[serde(default)]
    pub price_change_percent_24h: Option<RawNumber>,
}

impl TickerRecord {
    pub fn new(market: impl Into<String>, last_price: RawNumber, volume: RawNumber) -> Self {
        Self {
            market: market.into(),
            last_price: Some(last_price),
            volume: Some(volume),
            change_24_hour: None,
            price_change_percent_24h: None,
        }
    }

    pub fn with_change_24h(mut self, change: RawNumber) -> Self {
        self.change_24_hour = Some(change);
        self
    }

    pub fn symbol(&self, delimiter: char) -> Result<MarketSymbol, RecordParseError> {
        MarketSymbol::parse(&self.market, delimiter)
    }

    pub fn last_price(&self) -> Result<f64, RecordParseError> {
        parse_required(self.last_price.as_ref(), "last_price")
    }

    pub fn volume(&self) -> Result<f64, RecordParseError> {
        parse_required(self.volume.as_ref(), "volume")
    }

    /// Reported 24h percentage change, if the exchange included one.
    ///
    /// `change_24_hour` wins over `price_change_percent_24h` when both are present.
    pub fn change_24h(&self) -> Option<Result<f64, RecordParseError>> {
        if let Some(change) = &self.change_24_hour {
            return Some(change.parse("change_24_hour"));
        }
        self.price_change_percent_24h
            .as_ref()
            .map(|change| change.parse("price_change_percent_24h"))
    }
}

fn parse_required(raw: Option<&RawNumber>, field: &'static str) -> Result<f64, RecordParseError> {
    raw.ok_or(RecordParseError::MissingField { field })?
        .parse(field)
}

/// Base / quote pair parsed from a market symbol such as `BTC_INR`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct MarketSymbol {
    pub base: SmolStr,
    pub quote: SmolStr,
}

impl MarketSymbol {
    /// Split `symbol` on `delimiter` into exactly two non-empty parts.
    pub fn parse(symbol: &str, delimiter: char) -> Result<Self, RecordParseError> {
        let malformed = || RecordParseError::MalformedSymbol {
            symbol: symbol.to_string(),
            delimiter,
        };

        let mut parts = symbol.split(delimiter);
        let (Some(base), Some(quote), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };

        if base.is_empty() || quote.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            base: SmolStr::new(base),
            quote: SmolStr::new(quote),
        })
    }

    /// Rebuild the exchange market symbol.
    pub fn to_market(&self, delimiter: char) -> String {
        format!("{}{}{}", self.base, delimiter, self.quote)
    }

    pub fn is_quoted_in(&self, quote: &str) -> bool {
        self.quote.eq_ignore_ascii_case(quote)
    }
}

impl fmt::Display for MarketSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Point-in-time ticker readings for every market on the exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub records: Vec<TickerRecord>,
    /// Array elements that were not ticker objects at all.
    pub rejected: usize,
    /// Records dropped by [`Snapshot::retain_quote`] because their symbol did not parse.
    pub filtered_malformed: usize,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(records: Vec<TickerRecord>) -> Self {
        Self {
            records,
            rejected: 0,
            filtered_malformed: 0,
            fetched_at: Utc::now(),
        }
    }

    /// Decode a raw ticker response body.
    ///
    /// The body must be a JSON array. Individual elements that do not decode as a
    /// [`TickerRecord`] are counted in `rejected` rather than failing the snapshot.
    pub fn decode(body: &[u8]) -> Result<Self, FetchError> {
        let elements: Vec<serde_json::Value> =
            serde_json::from_slice(body).map_err(|error| FetchError::Decode(error.to_string()))?;

        let total = elements.len();
        let records: Vec<TickerRecord> = elements
            .into_iter()
            .filter_map(|element| match serde_json::from_value(element) {
                Ok(record) => Some(record),
                Err(error) => {
                    debug!(%error, "dropping undecodable ticker element");
                    None
                }
            })
            .collect();

        Ok(Self {
            rejected: total - records.len(),
            filtered_malformed: 0,
            records,
            fetched_at: Utc::now(),
        })
    }

    /// Retain only markets quoted in `quote` (case-insensitive).
    ///
    /// Records whose symbol cannot be split are dropped as well, since their quote
    /// is unknown, and counted in `filtered_malformed`.
    pub fn retain_quote(&mut self, quote: &str, delimiter: char) {
        let mut malformed = 0;
        self.records.retain(|record| match record.symbol(delimiter) {
            Ok(symbol) => symbol.is_quoted_in(quote),
            Err(_) => {
                malformed += 1;
                false
            }
        });
        self.filtered_malformed += malformed;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
