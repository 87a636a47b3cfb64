//! Data Fetcher: source + quote filter + optional TTL cache.

use std::{sync::Arc, time::Duration};

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::{
    cache::SnapshotCache,
    client::TickerSource,
    error::FetchError,
    ticker::Snapshot,
};

/// Snapshot handed to the evaluator for one cycle.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub snapshot: Arc<Snapshot>,
    /// True if served from the cache rather than a fresh request.
    pub cached: bool,
}

/// Fetches ticker snapshots, keeps only the markets of interest and memoizes
/// the result when a cache TTL is configured.
pub struct TickerFeed<Source> {
    source: Source,
    cache: Option<SnapshotCache>,
    quote_filter: Option<SmolStr>,
    delimiter: char,
}

impl<Source> TickerFeed<Source>
where
    Source: TickerSource,
{
    pub fn new(source: Source, delimiter: char) -> Self {
        Self {
            source,
            cache: None,
            quote_filter: None,
            delimiter,
        }
    }

    /// Memoize snapshots for `ttl`.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Some(SnapshotCache::new(ttl));
        self
    }

    /// Keep only markets quoted in `quote`.
    pub fn with_quote_filter(mut self, quote: impl Into<SmolStr>) -> Self {
        self.quote_filter = Some(quote.into());
        self
    }

    pub fn quote_filter(&self) -> Option<&str> {
        self.quote_filter.as_deref()
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.as_ref().map(SnapshotCache::ttl)
    }

    /// Latest snapshot, served from cache when fresh.
    pub async fn snapshot(&mut self) -> Result<FeedSnapshot, FetchError> {
        if let Some(snapshot) = self.cache.as_ref().and_then(SnapshotCache::get) {
            debug!(records = snapshot.len(), "serving cached ticker snapshot");
            return Ok(FeedSnapshot {
                snapshot,
                cached: true,
            });
        }

        self.fetch().await
    }

    /// Fetch a fresh snapshot, bypassing (and then refilling) the cache.
    pub async fn fetch(&mut self) -> Result<FeedSnapshot, FetchError> {
        let mut snapshot = match self.source.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%error, "ticker fetch failed");
                return Err(error);
            }
        };

        if let Some(quote) = &self.quote_filter {
            let before = snapshot.len();
            snapshot.retain_quote(quote, self.delimiter);
            debug!(
                %quote,
                kept = snapshot.len(),
                dropped = before - snapshot.len(),
                malformed = snapshot.filtered_malformed,
                "applied quote filter"
            );
        }

        let snapshot = match self.cache.as_mut() {
            Some(cache) => cache.store(snapshot),
            None => Arc::new(snapshot),
        };

        Ok(FeedSnapshot {
            snapshot,
            cached: false,
        })
    }
}
