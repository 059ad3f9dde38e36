//! Sales reports aggregated from stored daily shifts.
//!
//! Reports read one day at a time through `ShiftStore::get`, walking day ids
//! in 24h steps between the requested bounds (inclusive).

use chrono::FixedOffset;
use serde::Serialize;
use tracing::warn;

use crate::clock::{self, Clock};
use crate::error::ReportError;
use crate::model::{DailyShift, DayId, SECONDS_PER_DAY};
use crate::money::pesos;
use crate::store::ShiftStore;

/// Aggregate over the shifts found in a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub total: f64,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub days: usize,
}

impl SalesReport {
    /// Aggregate `shifts`. Returns `None` for an empty slice.
    pub fn from_shifts(shifts: &[DailyShift]) -> Option<Self> {
        if shifts.is_empty() {
            return None;
        }
        let totals: Vec<f64> = shifts.iter().map(DailyShift::total).collect();
        let total: f64 = totals.iter().sum();
        let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self {
            total,
            max: Some(max),
            min: Some(min),
            avg: Some(total / totals.len() as f64),
            days: totals.len(),
        })
    }

    /// Human-readable lines with amounts in display currency.
    pub fn render(&self) -> String {
        let opt = |v: Option<f64>| v.map(pesos).unwrap_or_else(|| "-".to_string());
        format!(
            "Total: {}\nMax: {}\nMin: {}\nAvg: {}\nDays: {}",
            pesos(self.total),
            opt(self.max),
            opt(self.min),
            opt(self.avg),
            self.days
        )
    }
}

pub struct Reporter<'a, S: ShiftStore + ?Sized> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S: ShiftStore + ?Sized> Reporter<'a, S> {
    pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    fn offset(&self) -> FixedOffset {
        self.clock.offset()
    }

    /// Today's total only, or an aggregate between two `dd-mm-YYYY` dates.
    pub async fn daily_report(
        &self,
        range: Option<(&str, &str)>,
    ) -> Result<SalesReport, ReportError> {
        match range {
            None => {
                let shift = self
                    .store
                    .get(self.clock.today())
                    .await?
                    .ok_or(ReportError::NoData)?;
                Ok(SalesReport {
                    total: shift.total(),
                    max: None,
                    min: None,
                    avg: None,
                    days: 1,
                })
            }
            Some((start, end)) => {
                let start = clock::parse_day(start, self.offset())?;
                let end = clock::parse_day(end, self.offset())?;
                self.range_report(start, end).await
            }
        }
    }

    /// Aggregate over the current calendar month.
    pub async fn monthly_report(&self) -> Result<SalesReport, ReportError> {
        let (first, last) = clock::month_bounds(self.clock.today(), self.offset());
        self.range_report(first, last).await
    }

    pub async fn range_report(&self, start: DayId, end: DayId) -> Result<SalesReport, ReportError> {
        let shifts = self.collect(start, end).await?;
        SalesReport::from_shifts(&shifts).ok_or(ReportError::NoData)
    }

    async fn collect(&self, start: DayId, end: DayId) -> Result<Vec<DailyShift>, ReportError> {
        if end < start {
            warn!(start, end, "Report range is inverted");
            return Ok(Vec::new());
        }
        let mut shifts = Vec::new();
        let mut day = start;
        while day <= end {
            if let Some(shift) = self.store.get(day).await? {
                shifts.push(shift);
            }
            day += SECONDS_PER_DAY;
        }
        Ok(shifts)
    }
}
