//! Cash register: one bill in flight at a time.
//!
//! The register is either idle or building a bill. Adding an item while idle
//! opens a new bill; saving appends the bill to today's shift in the ledger
//! and returns to idle.

use std::sync::Arc;
use tracing::info;

use crate::clock::Clock;
use crate::error::RegisterError;
use crate::ledger::Ledger;
use crate::model::{Bill, DailyShift, Item};
use crate::store::ShiftStore;

pub struct Register {
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
    /// `None` while idle, `Some` while a bill is being built.
    open_bill: Option<Bill>,
}

impl Register {
    pub fn new(ledger: Arc<Ledger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            open_bill: None,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn is_bill_open(&self) -> bool {
        self.open_bill.is_some()
    }

    pub fn current_bill(&self) -> Option<&Bill> {
        self.open_bill.as_ref()
    }

    /// Add an item priced `price`, opening a bill if none is open.
    pub fn add_item(&mut self, price: f64) -> &Bill {
        self.push_item(Item::priced(price))
    }

    pub fn push_item(&mut self, item: Item) -> &Bill {
        let clock = &self.clock;
        let bill = self
            .open_bill
            .get_or_insert_with(|| Bill::open(clock.now_nanos()));
        bill.add_item(item);
        bill
    }

    /// Pop the most recent item of the open bill. No-op when idle.
    pub fn remove_last_item(&mut self) -> Option<Item> {
        self.open_bill.as_mut()?.remove_last_item()
    }

    /// Append the open bill to today's shift and persist it.
    ///
    /// Returns `None` without touching the ledger when no bill is open. If the
    /// ledger write fails the bill stays open so it can be saved again.
    pub async fn save_bill(&mut self) -> Result<Option<DailyShift>, RegisterError> {
        let Some(bill) = &self.open_bill else {
            return Ok(None);
        };

        let today = self.clock.today();
        let shift = self.ledger.append_bill(today, bill.clone()).await?;
        info!(
            day_id = today,
            bill_id = %bill.id,
            total = bill.total(),
            "Bill saved"
        );
        self.open_bill = None;
        Ok(Some(shift))
    }

    /// Record a credit note of `value` (entered as a positive amount) on the
    /// open bill, opening one if needed, and save it.
    pub async fn credit_note(&mut self, value: f64) -> Result<DailyShift, RegisterError> {
        if !value.is_finite() || value < 0.0 {
            return Err(RegisterError::InvalidAmount(value));
        }
        self.add_item(-value);
        let shift = self.save_bill().await?;
        // A bill was opened by add_item, so save always yields a shift.
        Ok(shift.unwrap_or_else(|| DailyShift::new(self.clock.today())))
    }

    /// Today's shift, or an empty one when nothing has been sold yet.
    pub async fn daily_shift(&self) -> Result<DailyShift, RegisterError> {
        let today = self.clock.today();
        Ok(self
            .ledger
            .get(today)
            .await?
            .unwrap_or_else(|| DailyShift::new(today)))
    }

    /// Most recently saved bill of today, if any.
    pub async fn last_saved_bill(&self) -> Result<Option<Bill>, RegisterError> {
        Ok(self.daily_shift().await?.last_bill().cloned())
    }
}
