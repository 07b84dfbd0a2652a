use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval, sleep};

use goruntime_collector::{
    collector::GoRuntime,
    config::{SAMPLE_CONFIG, load_config},
    metrics::METRICS,
    sink::{Accumulator, StdoutSink},
};

const DEFAULT_CONFIG_PATH: &str = "config.json";

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Initialize logging
// - Load configuration
// - Run one poll cycle per interval, forever
//
// Usage:
//     goruntime-collector [config.json]
//     goruntime-collector --sample-config
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arg = std::env::args().nth(1);
    if arg.as_deref() == Some("--sample-config") {
        println!("{SAMPLE_CONFIG}");
        return Ok(());
    }

    let path = arg.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&path)?;

    log::info!(
        "polling {} endpoint(s) every {:?}",
        config.goruntime.urls.len(),
        config.interval
    );

    let input = Arc::new(GoRuntime::new(config.goruntime.clone())?);
    let sink: Arc<dyn Accumulator> = Arc::new(StdoutSink::new(config.output, config.debug));

    // --------------------------------------------------------
    // Self-metrics reporter (periodic, low-noise)
    // --------------------------------------------------------
    tokio::spawn(async {
        loop {
            sleep(Duration::from_secs(60)).await;
            log::info!("[METRICS] {}", METRICS.summary());
        }
    });

    // --------------------------------------------------------
    // Poll loop
    //
    // A slow cycle delays the next tick instead of overlapping it.
    // --------------------------------------------------------
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match input.gather(Arc::clone(&sink)).await {
            Ok(report) if !report.errors.is_empty() => {
                log::debug!(
                    "{} of {} endpoint(s) failed",
                    report.errors.len(),
                    report.polled
                );
            }
            Ok(_) => {}
            Err(e) => log::error!("gather failed: {e:#}"),
        }
    }
}
