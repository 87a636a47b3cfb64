#![forbid(unsafe_code)]

//! # Swing-Data
//! Ticker snapshot ingestion for the swing scanner.
//!
//! * [`TickerClient`](client::TickerClient): bounded-timeout HTTP `GET` of the public
//!   CoinDCX ticker endpoint.
//! * [`Snapshot`](ticker::Snapshot) / [`TickerRecord`](ticker::TickerRecord): lenient
//!   decoding of the ticker array, numeric fields parsed on demand.
//! * [`TickerFeed`](feed::TickerFeed): quote-currency filter plus a single-slot
//!   [`SnapshotCache`](cache::SnapshotCache) with a TTL.

/// All [`Error`](std::error::Error)s generated in Swing-Data.
pub mod error;

/// Ticker wire model, market symbol parsing and snapshot decoding.
pub mod ticker;

/// [`TickerSource`](client::TickerSource) abstraction and its HTTP implementation.
pub mod client;

/// Single-slot TTL cache.
pub mod cache;

/// Data Fetcher combining a source, quote filter and cache.
pub mod feed;

pub use client::{TickerClient, TickerClientConfig, TickerSource};
pub use error::{FetchError, RecordParseError};
pub use feed::{FeedSnapshot, TickerFeed};
pub use ticker::{MarketSymbol, RawNumber, Snapshot, TickerRecord};
