//! The contiguous date window a run synchronizes.

use anyhow::Result;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// How far back from the window end a run looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookback {
    Days(u32),
    Months(u32),
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::Months(3)
    }
}

impl Lookback {
    /// `date` moved back by this offset, clamping to month ends.
    pub fn before(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Lookback::Days(n) => date.checked_sub_days(Days::new(u64::from(*n))),
            Lookback::Months(n) => date.checked_sub_months(Months::new(*n)),
        }
    }
}

/// Inclusive, gap-free range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SyncWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            anyhow::bail!("Sync window start {start} is after its end {end}");
        }
        Ok(Self { start, end })
    }

    /// The window ending `delay_days` after `today` and reaching back by
    /// `lookback` from that end.
    pub fn ending_at(today: NaiveDate, lookback: Lookback, delay_days: u32) -> Result<Self> {
        let end = today
            .checked_add_days(Days::new(u64::from(delay_days)))
            .ok_or_else(|| anyhow::anyhow!("Sync window end overflows the calendar"))?;
        let start = lookback
            .before(end)
            .ok_or_else(|| anyhow::anyhow!("Sync window start overflows the calendar"))?;
        Self::new(start, end)
    }

    /// Every date in the window, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        sync_core::date_range(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
