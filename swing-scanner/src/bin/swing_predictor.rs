/// Crypto Swing Trade Predictor
///
/// Scans every CoinDCX market for momentum backed by a volume spike and lists
/// buy / target / stop levels. Snapshots are cached for 60s; `r` reruns the
/// scan, `R` forces a fresh fetch.
use std::error::Error;

use swing_scanner::{ScannerConfig, app};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ScannerConfig::load(ScannerConfig::swing())?;
    app::init_logging()?;
    app::run(config).await
}
