//! Sales data model: items, bills and the daily shift aggregate.
//!
//! A `DailyShift` is keyed by its day id (POSIX timestamp of local midnight
//! in the business time zone) and is the unit of replication. Totals on both
//! `Bill` and `DailyShift` are maintained incrementally as items and bills
//! are added; readers never recompute them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// POSIX timestamp of local midnight for a business day.
pub type DayId = i64;

/// Seconds in one business day. The business zone is a fixed UTC offset, so
/// consecutive day ids are always exactly this far apart.
pub const SECONDS_PER_DAY: i64 = 86_400;

fn default_item_id() -> String {
    "1".to_string()
}

fn default_quantity() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A single line on a bill. Negative prices represent credit notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default = "default_item_id")]
    pub id: String,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

impl Item {
    pub fn new(id: impl Into<String>, price: f64, quantity: f64) -> Self {
        Self {
            id: id.into(),
            price,
            quantity,
        }
    }

    /// An item with the default id and a quantity of one.
    pub fn priced(price: f64) -> Self {
        Self::new(default_item_id(), price, default_quantity())
    }
}

// ---------------------------------------------------------------------------
// Bill
// ---------------------------------------------------------------------------

/// One completed sale (or credit note).
///
/// Items follow a stack discipline: they can only be pushed or popped from
/// the end, and `total` is adjusted on each operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    /// Nanoseconds since the UNIX epoch.
    pub created_at: i64,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    total: f64,
}

impl Bill {
    /// Open an empty bill with a freshly generated id.
    pub fn open(created_at: i64) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), created_at)
    }

    pub fn with_id(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
            items: Vec::new(),
            total: 0.0,
        }
    }

    pub fn add_item(&mut self, item: Item) {
        self.total += item.price;
        self.items.push(item);
    }

    /// Pop the most recent item, if any.
    pub fn remove_last_item(&mut self) -> Option<Item> {
        let item = self.items.pop()?;
        self.total -= item.price;
        Some(item)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Local wall-clock time of creation formatted as `HH:MM:SS`.
    pub fn time_of_day(&self, offset: chrono::FixedOffset) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_nanos(self.created_at)
            .with_timezone(&offset)
            .format("%H:%M:%S")
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// DailyShift
// ---------------------------------------------------------------------------

/// All bills recorded in one business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyShift {
    pub id: DayId,
    #[serde(default)]
    bills: Vec<Bill>,
    #[serde(default)]
    total: f64,
}

impl DailyShift {
    pub fn new(id: DayId) -> Self {
        Self {
            id,
            bills: Vec::new(),
            total: 0.0,
        }
    }

    pub fn add_bill(&mut self, bill: Bill) {
        self.total += bill.total();
        self.bills.push(bill);
    }

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn last_bill(&self) -> Option<&Bill> {
        self.bills.last()
    }

    pub fn last_bill_id(&self) -> Option<&str> {
        self.bills.last().map(|b| b.id.as_str())
    }

    pub fn bill_count(&self) -> usize {
        self.bills.len()
    }

    pub fn has_bills(&self) -> bool {
        !self.bills.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Whether `other` holds the same replicated content as far as sync is
    /// concerned: equal bill count and, when non-empty, equal last bill id.
    pub fn matches_remote(&self, other: &DailyShift) -> bool {
        if self.bills.len() != other.bills.len() {
            return false;
        }
        match (self.last_bill_id(), other.last_bill_id()) {
            (Some(local), Some(remote)) => local == remote,
            _ => true,
        }
    }
}
