/// Crypto Explosion Predictor
///
/// Polls INR markets every second and shows only the candidates whose win
/// probability, volume sentiment and volatility all line up.
use std::error::Error;

use swing_scanner::{ScannerConfig, app};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ScannerConfig::load(ScannerConfig::explosion())?;
    app::init_logging()?;
    app::run(config).await
}
