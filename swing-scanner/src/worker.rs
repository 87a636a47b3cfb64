//! Refresh loop: one background task that fetches, evaluates and publishes a
//! [`CycleReport`] per cycle.

use chrono::{DateTime, Utc};
use swing_data::{FetchError, TickerFeed, TickerSource};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    config::{RefreshPolicy, ScannerConfig},
    evaluator::{Evaluation, Evaluator},
    history::{self, MarketHistoryProvider},
};

/// Buffered reports before the worker waits on the UI.
const REPORT_BUFFER: usize = 16;
const REFRESH_BUFFER: usize = 4;

/// User-initiated refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Rerun a cycle, reusing a fresh cached snapshot.
    Refresh,
    /// Rerun a cycle with a fresh fetch.
    ForceRefresh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Opportunities(Evaluation),
    /// Snapshot fetched and evaluated, nothing qualified.
    NoOpportunities(Evaluation),
    FetchFailed(FetchError),
}

impl CycleOutcome {
    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            CycleOutcome::Opportunities(evaluation) | CycleOutcome::NoOpportunities(evaluation) => {
                Some(evaluation)
            }
            CycleOutcome::FetchFailed(_) => None,
        }
    }
}

/// Result of one fetch → evaluate cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Monotonic cycle counter, starting at 1.
    pub cycle: u64,
    pub finished_at: DateTime<Utc>,
    /// True if the snapshot came from the cache.
    pub from_cache: bool,
    /// Snapshot elements that failed to decode.
    pub rejected: usize,
    pub outcome: CycleOutcome,
}

/// Owns everything one cycle needs: feed (with its cache), evaluator, history
/// and the refresh policy the feed's cache was built for.
pub struct Scanner<Source> {
    feed: TickerFeed<Source>,
    evaluator: Evaluator,
    history: Box<dyn MarketHistoryProvider>,
    policy: RefreshPolicy,
    cycles: u64,
}

impl<Source> Scanner<Source>
where
    Source: TickerSource,
{
    /// Wire a [`Scanner`] over `source` as described by `config`.
    ///
    /// The snapshot cache exists only under [`RefreshPolicy::CacheTtl`].
    pub fn from_config(source: Source, config: &ScannerConfig) -> Self {
        let mut feed = TickerFeed::new(source, config.symbol_delimiter);
        if let Some(ttl) = config.refresh.cache_ttl() {
            feed = feed.with_cache_ttl(ttl);
        }
        if let Some(quote) = &config.quote_filter {
            feed = feed.with_quote_filter(quote.as_str());
        }

        Self {
            feed,
            evaluator: Evaluator::new(config.signal, config.symbol_delimiter),
            history: history::from_config(&config.history),
            policy: config.refresh,
            cycles: 0,
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Run one cycle. `force` bypasses the snapshot cache.
    pub async fn run_cycle(&mut self, force: bool) -> CycleReport {
        self.cycles += 1;

        let fetched = if force {
            self.feed.fetch().await
        } else {
            self.feed.snapshot().await
        };

        let (from_cache, rejected, outcome) = match fetched {
            Ok(fetched) => {
                let mut evaluation = self
                    .evaluator
                    .evaluate(&fetched.snapshot.records, &mut self.history);

                // Malformed symbols the quote filter dropped never reach the evaluator
                let filtered = fetched.snapshot.filtered_malformed;
                evaluation.stats.evaluated += filtered;
                evaluation.stats.skipped.malformed_symbol += filtered;

                debug!(
                    cycle = self.cycles,
                    cached = fetched.cached,
                    evaluated = evaluation.stats.evaluated,
                    qualified = evaluation.stats.qualified,
                    skipped = ?evaluation.stats.skipped,
                    "evaluated ticker snapshot"
                );

                let outcome = if evaluation.opportunities.is_empty() {
                    CycleOutcome::NoOpportunities(evaluation)
                } else {
                    CycleOutcome::Opportunities(evaluation)
                };
                (fetched.cached, fetched.snapshot.rejected, outcome)
            }
            Err(error) => (false, 0, CycleOutcome::FetchFailed(error)),
        };

        CycleReport {
            cycle: self.cycles,
            finished_at: Utc::now(),
            from_cache,
            rejected,
            outcome,
        }
    }
}

/// Handle to a running scanner task.
#[derive(Debug)]
pub struct ScannerHandle {
    pub reports: mpsc::Receiver<CycleReport>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScannerHandle {
    /// Queue a refresh. Returns false if the request could not be queued.
    pub fn request(&self, request: RefreshRequest) -> bool {
        self.refresh_tx.try_send(request).is_ok()
    }

    /// Signal the worker to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(error) = self.task.await {
            warn!(%error, "scanner task did not exit cleanly");
        }
    }
}

/// Spawn the refresh loop for `scanner` under its own [`RefreshPolicy`].
///
/// [`RefreshPolicy::CacheTtl`] runs one cycle at start and then only on request.
/// [`RefreshPolicy::ContinuousPoll`] runs a cycle every interval until shut down.
pub fn spawn_scanner<Source>(scanner: Scanner<Source>) -> ScannerHandle
where
    Source: TickerSource + 'static,
{
    let (reports_tx, reports) = mpsc::channel(REPORT_BUFFER);
    let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_BUFFER);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run_scanner_loop(scanner, reports_tx, refresh_rx, shutdown_rx));

    ScannerHandle {
        reports,
        refresh_tx,
        shutdown_tx,
        task,
    }
}

async fn run_scanner_loop<Source>(
    mut scanner: Scanner<Source>,
    reports_tx: mpsc::Sender<CycleReport>,
    mut refresh_rx: mpsc::Receiver<RefreshRequest>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    Source: TickerSource,
{
    let policy = scanner.policy();
    info!(%policy, mode = %scanner.evaluator().mode(), "starting scanner");

    let mut poll = policy.poll_interval().map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    // Polling gets its first cycle from the interval's immediate first tick
    let mut pending = poll.is_none().then_some(false);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let force = match pending.take() {
            Some(force) => force,
            None => tokio::select! {
                _ = shutdown_rx.changed() => break,
                request = refresh_rx.recv() => match request {
                    Some(RefreshRequest::Refresh) => false,
                    Some(RefreshRequest::ForceRefresh) => true,
                    None => break,
                },
                _ = next_tick(&mut poll) => false,
            },
        };

        let report = tokio::select! {
            _ = shutdown_rx.changed() => break,
            report = scanner.run_cycle(force) => report,
        };

        // A full report buffer must not block shutdown
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            sent = reports_tx.send(report) => {
                if sent.is_err() {
                    debug!("report receiver dropped");
                    break;
                }
            }
        }
    }

    info!("scanner stopped");
}

/// Next poll tick, or never when not polling.
async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ReportedHistory;
    use async_trait::async_trait;
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use swing_data::{RawNumber, Snapshot, TickerRecord};

    /// Replays scripted results, repeating the last one once exhausted.
    struct StubSource {
        results: Mutex<Vec<Result<Snapshot, FetchError>>>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(results: Vec<Result<Snapshot, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TickerSource for StubSource {
        async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let results = self.results.lock().unwrap();
            results[call.min(results.len() - 1)].clone()
        }
    }

    fn btc_snapshot() -> Snapshot {
        Snapshot::new(vec![
            TickerRecord::new("BTC_INR", RawNumber::from("100000"), RawNumber::from("1000000"))
                .with_change_24h(RawNumber::from("6")),
            TickerRecord::new("ETH_INR", RawNumber::from("1000"), RawNumber::from("50"))
                .with_change_24h(RawNumber::from("0.5")),
        ])
    }

    fn scanner(source: Arc<StubSource>, policy: RefreshPolicy) -> Scanner<Arc<StubSource>> {
        let config = ScannerConfig::swing().with_refresh(policy);
        Scanner::from_config(source, &config).with_history(ReportedHistory::default())
    }

    impl<Source> Scanner<Source> {
        fn with_history(mut self, history: impl MarketHistoryProvider + 'static) -> Self {
            self.history = Box::new(history);
            self
        }
    }

    #[tokio::test]
    async fn test_run_cycle_outcomes() {
        let source = StubSource::new(vec![
            Ok(btc_snapshot()),
            Ok(Snapshot::new(vec![])),
            Err(FetchError::Timeout { timeout_ms: 10_000 }),
        ]);
        let mut scanner = scanner(source.clone(), RefreshPolicy::CacheTtl { ttl_secs: 0 });

        let report = scanner.run_cycle(true).await;
        assert_eq!(report.cycle, 1);
        assert!(!report.from_cache);
        match &report.outcome {
            CycleOutcome::Opportunities(evaluation) => {
                assert_eq!(evaluation.opportunities.len(), 1);
                assert_eq!(evaluation.opportunities[0].coin(), "BTC/INR");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let report = scanner.run_cycle(true).await;
        assert!(matches!(report.outcome, CycleOutcome::NoOpportunities(_)));

        let report = scanner.run_cycle(true).await;
        assert_eq!(report.cycle, 3);
        assert_eq!(
            report.outcome,
            CycleOutcome::FetchFailed(FetchError::Timeout { timeout_ms: 10_000 })
        );
        assert!(report.outcome.evaluation().is_none());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ttl_reuses_snapshot_until_forced() {
        let source = StubSource::new(vec![Ok(btc_snapshot())]);
        let mut scanner = scanner(source.clone(), RefreshPolicy::CacheTtl { ttl_secs: 60 });

        assert!(!scanner.run_cycle(false).await.from_cache);
        let report = scanner.run_cycle(false).await;
        assert!(report.from_cache);
        assert!(matches!(report.outcome, CycleOutcome::Opportunities(_)));
        assert_eq!(source.calls(), 1);

        assert!(!scanner.run_cycle(true).await.from_cache);
        assert_eq!(source.calls(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!scanner.run_cycle(false).await.from_cache);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_mode_runs_initial_cycle_then_waits_for_requests() {
        let source = StubSource::new(vec![Ok(btc_snapshot())]);
        let mut handle = spawn_scanner(scanner(
            source.clone(),
            RefreshPolicy::CacheTtl { ttl_secs: 60 },
        ));

        let first = handle.reports.recv().await.unwrap();
        assert_eq!(first.cycle, 1);
        assert!(!first.from_cache);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(handle.reports.try_recv().is_err());

        assert!(handle.request(RefreshRequest::Refresh));
        let second = handle.reports.recv().await.unwrap();
        assert!(second.from_cache);

        assert!(handle.request(RefreshRequest::ForceRefresh));
        let third = handle.reports.recv().await.unwrap();
        assert!(!third.from_cache);
        assert_eq!(source.calls(), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_poll_survives_fetch_failure() {
        let source = StubSource::new(vec![
            Err(FetchError::Timeout { timeout_ms: 5_000 }),
            Ok(btc_snapshot()),
        ]);
        let policy = RefreshPolicy::ContinuousPoll { interval_ms: 1000 };
        let mut handle = spawn_scanner(scanner(source.clone(), policy));

        let first = handle.reports.recv().await.unwrap();
        assert!(matches!(first.outcome, CycleOutcome::FetchFailed(ref e) if e.is_timeout()));

        let second = handle.reports.recv().await.unwrap();
        assert_eq!(second.cycle, 2);
        assert!(matches!(second.outcome, CycleOutcome::Opportunities(_)));

        let third = handle.reports.recv().await.unwrap();
        assert_eq!(third.cycle, 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let source = StubSource::new(vec![Ok(btc_snapshot())]);
        let policy = RefreshPolicy::ContinuousPoll { interval_ms: 1000 };
        let mut handle = spawn_scanner(scanner(source.clone(), policy));

        handle.reports.recv().await.unwrap();
        let _ = handle.shutdown_tx.send(true);
        (&mut handle.task).await.unwrap();

        let calls = source.calls();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_with_full_report_buffer() {
        let source = StubSource::new(vec![Ok(btc_snapshot())]);
        let policy = RefreshPolicy::ContinuousPoll { interval_ms: 1 };
        let handle = spawn_scanner(scanner(source.clone(), policy));

        // Nobody drains reports, so the worker ends up parked on a full buffer
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(source.calls() > REPORT_BUFFER);

        let stopped = tokio::time::timeout(Duration::from_secs(30), handle.shutdown()).await;
        assert!(stopped.is_ok(), "shutdown blocked on a full report buffer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scanner_carries_refresh_policy() {
        struct TestCase {
            policy: RefreshPolicy,
            second_cycle_cached: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: cache policy builds a snapshot cache
                policy: RefreshPolicy::CacheTtl { ttl_secs: 60 },
                second_cycle_cached: true,
            },
            TestCase {
                // TC1: polling never serves a cached snapshot
                policy: RefreshPolicy::ContinuousPoll { interval_ms: 1000 },
                second_cycle_cached: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let source = StubSource::new(vec![Ok(btc_snapshot())]);
            let mut scanner = scanner(source, test.policy);
            assert_eq!(scanner.policy(), test.policy, "TC{} failed", index);

            scanner.run_cycle(false).await;
            let second = scanner.run_cycle(false).await;
            assert_eq!(second.from_cache, test.second_cycle_cached, "TC{} failed", index);
        }
    }

    #[tokio::test]
    async fn test_quote_filter_malformed_symbols_are_counted() {
        let mut snapshot = btc_snapshot();
        snapshot.records.push(TickerRecord::new(
            "DOGEINR",
            RawNumber::from("10"),
            RawNumber::from("100"),
        ));
        let source = StubSource::new(vec![Ok(snapshot)]);
        let config = ScannerConfig::swing().with_quote_filter(Some("INR".to_string()));
        let mut scanner =
            Scanner::from_config(source, &config).with_history(ReportedHistory::default());

        let report = scanner.run_cycle(false).await;
        let evaluation = report.outcome.evaluation().expect("evaluation");

        assert_eq!(evaluation.stats.evaluated, 3);
        assert_eq!(evaluation.stats.skipped.malformed_symbol, 1);
        assert_eq!(evaluation.opportunities.len(), 1);
    }
}
