//! Background shift synchronizer.
//!
//! Replicates locally recorded daily shifts to the remote store and prunes
//! the local ledger once a day is proven durable remotely. Two passes run on
//! independent timers:
//!
//! - **sync**: find unsynced days, write each one remotely in chronological
//!   order, tolerate per-day failures, then advance the sync cursor to the
//!   last bill of the last day that succeeded in the pass.
//! - **cleanup**: keep today plus every day still unsynced, drop the rest.
//!
//! Any doubt about a day (remote read error, mismatched bill count or last
//! bill id) classifies it as unsynced, which both retries it and protects it
//! from pruning.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::cursor::CursorFile;
use crate::error::SyncError;
use crate::ledger::{Ledger, PruneOutcome, ShiftMap};
use crate::model::{DailyShift, DayId};
use crate::store::ShiftStore;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Days written remotely in this pass, in the order attempted.
    pub synced: Vec<DayId>,
    /// Days whose remote write failed in this pass.
    pub failed: Vec<DayId>,
    /// Cursor value persisted at the end of the pass, if it moved.
    pub cursor: Option<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.synced.is_empty() && self.failed.is_empty()
    }
}

pub struct Synchronizer<R: ShiftStore> {
    remote: Arc<R>,
    ledger: Arc<Ledger>,
    cursor: CursorFile,
    clock: Arc<dyn Clock>,
}

impl<R: ShiftStore> Synchronizer<R> {
    pub fn new(
        remote: Arc<R>,
        ledger: Arc<Ledger>,
        cursor: CursorFile,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            remote,
            ledger,
            cursor,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Unsynced-day detection
    // -----------------------------------------------------------------------

    /// Day ids in `shifts` not known to be durably replicated.
    ///
    /// Days without bills are ignored. Today is judged by comparing its last
    /// bill against the sync cursor; past days are compared against the
    /// remote copy.
    pub async fn unsynced_days(&self, shifts: &ShiftMap) -> Result<BTreeSet<DayId>, SyncError> {
        let mut unsynced = BTreeSet::new();
        if !shifts.values().any(DailyShift::has_bills) {
            return Ok(unsynced);
        }

        let last_synced_bill = self.cursor.load().await.map_err(SyncError::Cursor)?;
        let today = self.clock.today();

        for (&day, shift) in shifts {
            let Some(last_bill) = shift.last_bill_id() else {
                continue;
            };

            if day == today {
                if last_bill != last_synced_bill {
                    unsynced.insert(day);
                }
            } else if !self.is_day_synced(day, shift).await {
                unsynced.insert(day);
            }
        }

        Ok(unsynced)
    }

    async fn is_day_synced(&self, day: DayId, local: &DailyShift) -> bool {
        match self.remote.get(day).await {
            Ok(Some(remote)) => local.matches_remote(&remote),
            Ok(None) => false,
            Err(e) => {
                error!(day_id = day, error = %e, "Error verifying sync status for day");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Sync pass
    // -----------------------------------------------------------------------

    /// Replicate every unsynced day to the remote store.
    ///
    /// Days are written oldest first. A failed day is logged and skipped; the
    /// pass only fails as a whole when not a single day could be written.
    pub async fn sync_pass(&self) -> Result<SyncReport, SyncError> {
        let shifts = self.ledger.snapshot().await;
        let mut report = SyncReport::default();
        if shifts.is_empty() {
            return Ok(report);
        }

        let unsynced = self.unsynced_days(&shifts).await?;
        if unsynced.is_empty() {
            info!("All days are already synced");
            return Ok(report);
        }
        info!(days = unsynced.len(), "Found unsynced days");

        let mut cursor_candidate: Option<String> = None;

        // BTreeSet iterates in ascending day order.
        for day in unsynced {
            let Some(shift) = shifts.get(&day).filter(|s| s.has_bills()) else {
                continue;
            };

            match self.remote.save(shift).await {
                Ok(()) => {
                    cursor_candidate = shift.last_bill_id().map(str::to_string);
                    report.synced.push(day);
                    info!(
                        day_id = day,
                        bills = shift.bill_count(),
                        "Day synced successfully"
                    );
                }
                Err(e) => {
                    report.failed.push(day);
                    error!(day_id = day, error = %e, "Failed to sync day");
                }
            }
        }

        let Some(last_id) = cursor_candidate else {
            error!(failed = report.failed.len(), "No days could be synced");
            return Err(SyncError::AllDaysFailed {
                attempted: report.failed,
            });
        };

        self.cursor
            .store(&last_id)
            .await
            .map_err(SyncError::Cursor)?;
        info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            cursor = %last_id,
            "Sync completed"
        );
        report.cursor = Some(last_id);
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Cleanup pass
    // -----------------------------------------------------------------------

    /// Shrink the ledger to today plus every unsynced day.
    pub async fn cleanup_pass(&self) -> Result<PruneOutcome, SyncError> {
        let today = self.clock.today();
        let shifts = self.ledger.snapshot().await;
        if shifts.is_empty() {
            return Ok(PruneOutcome::default());
        }

        let mut keep = self.unsynced_days(&shifts).await?;
        keep.insert(today);

        let outcome = self
            .ledger
            .retain(&keep, &shifts)
            .await
            .map_err(SyncError::Ledger)?;

        if outcome.removed.is_empty() {
            info!("No cleanup required");
        } else {
            info!(
                days_kept = outcome.kept.len(),
                days_removed = outcome.removed.len(),
                "Conservative cleanup completed"
            );
        }
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Background loops
// ---------------------------------------------------------------------------

/// Run `pass` every `period` until `cancel` fires.
///
/// The first run happens one full period after start. A pass that is already
/// running is never interrupted; cancellation is observed between passes.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut pass: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!(task = name, interval_secs = period.as_secs(), "Background loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            pass().await;
        }
        info!(task = name, "Background loop stopped");
    })
}

/// Start the sync and cleanup loops for `sync`.
pub fn start_sync_loops<R: ShiftStore + 'static>(
    sync: Arc<Synchronizer<R>>,
    sync_interval: Duration,
    clean_interval: Duration,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let for_sync = sync.clone();
    let sync_handle = spawn_periodic("sync", sync_interval, cancel.clone(), move || {
        let sync = for_sync.clone();
        async move {
            match sync.sync_pass().await {
                Ok(report) if report.is_noop() => debug!("Sync pass found nothing to do"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Sync pass failed"),
            }
        }
    });

    let for_clean = sync;
    let clean_handle = spawn_periodic("cleanup", clean_interval, cancel, move || {
        let sync = for_clean.clone();
        async move {
            if let Err(e) = sync.cleanup_pass().await {
                warn!(error = %e, "Cleanup pass failed");
            }
        }
    });

    vec![sync_handle, clean_handle]
}
