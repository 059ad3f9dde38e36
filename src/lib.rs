//! Shift Register
//!
//! A point-of-sale register that records bills into a local per-day ledger
//! and replicates each day to a remote shift store in the background. Local
//! days are pruned only once the remote copy is proven to match.

use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod clock;
pub mod config;
pub mod console;
pub mod credentials;
pub mod cursor;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod money;
pub mod receipt;
pub mod register;
pub mod remote;
pub mod report;
pub mod store;
pub mod sync;

use clock::{Clock, SystemClock};
use config::Config;
use console::Console;
use cursor::CursorFile;
use ledger::Ledger;
use register::Register;
use remote::HttpShiftStore;
use sync::{start_sync_loops, Synchronizer};

/// `0.4.2 (abc1234, built 2024-01-01T00:00:00Z)`
pub fn version() -> String {
    format!(
        "{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_SHA"),
        env!("BUILD_TIMESTAMP")
    )
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Remote store built from config, or `None` with a warning when no URL is set.
pub fn remote_store(config: &Config) -> anyhow::Result<Option<Arc<HttpShiftStore>>> {
    let Some(url) = config.remote_url.as_deref() else {
        warn!("REGISTER_REMOTE_URL is not set; shift sync is disabled");
        return Ok(None);
    };
    if config.remote_api_key.is_none() {
        warn!("No remote API key configured; requests will be unauthenticated");
    }
    let store = HttpShiftStore::new(url, config.remote_api_key.clone())?;
    Ok(Some(Arc::new(store)))
}

pub fn system_clock(config: &Config) -> Arc<dyn Clock> {
    Arc::new(SystemClock::new(config.utc_offset))
}

/// Run the interactive register on stdin/stdout until quit, end of input
/// or Ctrl-C. Background sync loops run for the whole session when a remote
/// store is configured.
pub async fn run(config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.data_dir).await?;
    let clock = system_clock(&config);
    let ledger = Arc::new(Ledger::open(config.ledger_path()).await?);
    info!(
        path = %ledger.path().display(),
        days = ledger.day_ids().await.len(),
        "Ledger opened"
    );

    let cancel = CancellationToken::new();
    let mut handles = Vec::new();
    let sync = match remote_store(&config)? {
        Some(remote) => {
            let sync = Arc::new(Synchronizer::new(
                remote,
                ledger.clone(),
                CursorFile::new(config.cursor_path()),
                clock.clone(),
            ));
            handles = start_sync_loops(
                sync.clone(),
                config.sync_interval,
                config.clean_interval,
                cancel.clone(),
            );
            Some(sync)
        }
        None => None,
    };

    let register = Register::new(ledger, clock);
    let mut console = Console::new(register, sync, config.large_amount);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    tokio::select! {
        res = console.run(stdin, &mut stdout) => res?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background loop ended abnormally");
        }
    }
    info!("Register stopped");
    Ok(())
}

/// One sync pass followed by one cleanup pass, then exit.
pub async fn sync_once(config: Config) -> anyhow::Result<()> {
    config.require_remote_url()?;
    let Some(remote) = remote_store(&config)? else {
        return Ok(());
    };
    let ledger = Arc::new(Ledger::open(config.ledger_path()).await?);
    let sync = Synchronizer::new(
        remote,
        ledger,
        CursorFile::new(config.cursor_path()),
        system_clock(&config),
    );

    let report = sync.sync_pass().await?;
    println!(
        "Synced {} day(s), {} failed",
        report.synced.len(),
        report.failed.len()
    );
    let pruned = sync.cleanup_pass().await?;
    println!(
        "Kept {} day(s), removed {}",
        pruned.kept.len(),
        pruned.removed.len()
    );
    Ok(())
}
