//! Local ledger: the file-backed map of day id to `DailyShift`.
//!
//! The ledger keeps an in-memory mirror of `daily_shifts.json` behind a
//! single async mutex. Every mutation is a read-modify-write under that
//! guard and ends with a whole-file rewrite, so the register's save path and
//! the synchronizer's prune path never interleave. If the file write fails
//! the in-memory mirror is left exactly as it was before the attempt.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{Bill, DailyShift, DayId};
use crate::store::ShiftStore;

pub const LEDGER_FILE: &str = "daily_shifts.json";

pub type ShiftMap = BTreeMap<DayId, DailyShift>;

/// Result of a prune applied to the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub kept: Vec<DayId>,
    pub removed: Vec<DayId>,
}

pub struct Ledger {
    path: PathBuf,
    shifts: Mutex<ShiftMap>,
}

impl Ledger {
    /// Open the ledger at `path`, loading whatever is on disk.
    ///
    /// A missing or empty file yields an empty ledger. A file that exists but
    /// cannot be parsed is an error: overwriting it would lose sales.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let shifts = load_shifts(&path).await?;
        info!(
            path = %path.display(),
            days = shifts.len(),
            "Ledger loaded"
        );
        Ok(Self {
            path,
            shifts: Mutex::new(shifts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consistent copy of every shift currently held.
    pub async fn snapshot(&self) -> ShiftMap {
        self.shifts.lock().await.clone()
    }

    pub async fn day_ids(&self) -> Vec<DayId> {
        self.shifts.lock().await.keys().copied().collect()
    }

    /// Append `bill` to the shift for `day`, creating the shift if this is
    /// the day's first sale, and persist. Returns the updated shift.
    pub async fn append_bill(&self, day: DayId, bill: Bill) -> Result<DailyShift, StoreError> {
        let mut shifts = self.shifts.lock().await;
        let previous = shifts.get(&day).cloned();

        let mut shift = previous.clone().unwrap_or_else(|| DailyShift::new(day));
        shift.add_bill(bill);
        shifts.insert(day, shift.clone());

        if let Err(e) = write_shifts(&self.path, &shifts).await {
            match previous {
                Some(prev) => shifts.insert(day, prev),
                None => shifts.remove(&day),
            };
            return Err(e);
        }

        debug!(day_id = day, bills = shift.bill_count(), "Bill appended to ledger");
        Ok(shift)
    }

    /// Drop every day that is not in `keep`.
    ///
    /// `snapshot` is the copy the keep set was computed from. A day that was
    /// added or modified after that snapshot is kept regardless, since the
    /// decision to drop it was made on stale data. When nothing would be
    /// dropped, the file is not rewritten.
    pub async fn retain(
        &self,
        keep: &BTreeSet<DayId>,
        snapshot: &ShiftMap,
    ) -> Result<PruneOutcome, StoreError> {
        let mut shifts = self.shifts.lock().await;

        let removed: Vec<DayId> = shifts
            .iter()
            .filter(|(day, shift)| !keep.contains(*day) && snapshot.get(*day) == Some(*shift))
            .map(|(day, _)| *day)
            .collect();

        if removed.is_empty() {
            return Ok(PruneOutcome {
                kept: shifts.keys().copied().collect(),
                removed,
            });
        }

        let mut pruned = shifts.clone();
        for day in &removed {
            pruned.remove(day);
        }
        write_shifts(&self.path, &pruned).await?;
        *shifts = pruned;

        Ok(PruneOutcome {
            kept: shifts.keys().copied().collect(),
            removed,
        })
    }
}

#[async_trait]
impl ShiftStore for Ledger {
    async fn get(&self, day: DayId) -> Result<Option<DailyShift>, StoreError> {
        Ok(self.shifts.lock().await.get(&day).cloned())
    }

    async fn save(&self, shift: &DailyShift) -> Result<(), StoreError> {
        let mut shifts = self.shifts.lock().await;
        let mut updated = shifts.clone();
        updated.insert(shift.id, shift.clone());
        write_shifts(&self.path, &updated).await?;
        *shifts = updated;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

async fn load_shifts(path: &Path) -> Result<ShiftMap, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ShiftMap::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    if raw.trim().is_empty() {
        return Ok(ShiftMap::new());
    }
    let parsed: Option<ShiftMap> = serde_json::from_str(&raw)?;
    Ok(parsed.unwrap_or_default())
}

async fn write_shifts(path: &Path, shifts: &ShiftMap) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(shifts)?;
    tokio::fs::write(path, body)
        .await
        .map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;
    use tempfile::TempDir;

    fn bill(id: &str, price: f64) -> Bill {
        let mut b = Bill::with_id(id, 1);
        b.add_item(Item::priced(price));
        b
    }

    async fn open_in(dir: &TempDir) -> Ledger {
        Ledger::open(dir.path().join(LEDGER_FILE))
            .await
            .expect("open ledger")
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = open_in(&dir).await;
        assert!(ledger.snapshot().await.is_empty());
        assert!(!ledger.path().exists());
    }

    #[tokio::test]
    async fn empty_and_null_files_open_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);

        std::fs::write(&path, "").unwrap();
        assert!(Ledger::open(&path).await.unwrap().snapshot().await.is_empty());

        std::fs::write(&path, "null").unwrap();
        assert!(Ledger::open(&path).await.unwrap().snapshot().await.is_empty());

        std::fs::write(&path, "{}").unwrap();
        assert!(Ledger::open(&path).await.unwrap().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        std::fs::write(&path, "{\"1704067200\": [").unwrap();

        assert!(matches!(Ledger::open(&path).await, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn append_creates_day_and_persists() {
        let dir = TempDir::new().unwrap();
        let ledger = open_in(&dir).await;

        ledger.append_bill(100, bill("a", 10.0)).await.unwrap();
        let shift = ledger.append_bill(100, bill("b", 5.0)).await.unwrap();
        assert_eq!(shift.bill_count(), 2);
        assert_eq!(shift.total(), 15.0);

        let reopened = open_in(&dir).await;
        let snap = reopened.snapshot().await;
        assert_eq!(snap[&100].last_bill_id(), Some("b"));
        assert_eq!(snap[&100].total(), 15.0);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(ledger.path()).unwrap()).unwrap();
        assert_eq!(raw["100"]["id"], 100);
    }

    #[tokio::test]
    async fn failed_write_leaves_mirror_unchanged() {
        let dir = TempDir::new().unwrap();
        // The ledger path is a directory, so every write fails.
        let path = dir.path().join("as_dir");
        std::fs::create_dir(&path).unwrap();
        let ledger = Ledger {
            path,
            shifts: Mutex::new(ShiftMap::new()),
        };

        assert!(ledger.append_bill(100, bill("a", 1.0)).await.is_err());
        assert!(ledger.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn failed_prune_write_leaves_mirror_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("as_dir");
        std::fs::create_dir(&path).unwrap();
        let mut seeded = ShiftMap::new();
        for (day, id) in [(1, "a"), (2, "b")] {
            let mut shift = DailyShift::new(day);
            shift.add_bill(bill(id, 1.0));
            seeded.insert(day, shift);
        }
        let ledger = Ledger {
            path,
            shifts: Mutex::new(seeded),
        };

        let snapshot = ledger.snapshot().await;
        let keep: BTreeSet<DayId> = [2].into_iter().collect();

        assert!(ledger.retain(&keep, &snapshot).await.is_err());
        assert_eq!(ledger.day_ids().await, vec![1, 2]);
        assert_eq!(ledger.snapshot().await, snapshot);
    }

    #[tokio::test]
    async fn retain_drops_only_unkept_unchanged_days() {
        let dir = TempDir::new().unwrap();
        let ledger = open_in(&dir).await;
        ledger.append_bill(1, bill("a", 1.0)).await.unwrap();
        ledger.append_bill(2, bill("b", 1.0)).await.unwrap();
        ledger.append_bill(3, bill("c", 1.0)).await.unwrap();

        let snapshot = ledger.snapshot().await;
        // Day 2 changes after the snapshot was taken.
        ledger.append_bill(2, bill("b2", 1.0)).await.unwrap();

        let keep: BTreeSet<DayId> = [3].into_iter().collect();
        let outcome = ledger.retain(&keep, &snapshot).await.unwrap();

        assert_eq!(outcome.removed, vec![1]);
        assert_eq!(outcome.kept, vec![2, 3]);
        assert_eq!(open_in(&dir).await.day_ids().await, vec![2, 3]);
    }

    #[tokio::test]
    async fn retain_without_removals_skips_write() {
        let dir = TempDir::new().unwrap();
        let ledger = open_in(&dir).await;
        ledger.append_bill(1, bill("a", 1.0)).await.unwrap();
        let before = std::fs::metadata(ledger.path()).unwrap().modified().unwrap();

        let snapshot = ledger.snapshot().await;
        let keep: BTreeSet<DayId> = [1].into_iter().collect();
        let outcome = ledger.retain(&keep, &snapshot).await.unwrap();

        assert!(outcome.removed.is_empty());
        let after = std::fs::metadata(ledger.path()).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn save_through_store_trait_overwrites_day() {
        let dir = TempDir::new().unwrap();
        let ledger = open_in(&dir).await;
        let mut shift = DailyShift::new(5);
        shift.add_bill(bill("x", 3.0));

        ShiftStore::save(&ledger, &shift).await.unwrap();
        let got = ShiftStore::get(&ledger, 5).await.unwrap().unwrap();
        assert_eq!(got, shift);
    }
}
