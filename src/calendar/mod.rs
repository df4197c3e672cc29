//! Calendar month helpers used to scope recording listings.

use chrono::NaiveDate;

use crate::error::{Result, SyncError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// First and last calendar day of a single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl MonthSpan {
    /// Compute the span for `month` (1-12) of `year`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SyncError::validation(format!(
                "month should be between 1 and 12, got {month}"
            )));
        }

        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| SyncError::validation(format!("year {year} is out of range")))?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let last = next_month
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| SyncError::validation(format!("year {year} is out of range")))?;

        Ok(Self { first, last })
    }

    /// `from` / `to` bounds formatted as the API expects (`YYYY-MM-DD`).
    pub fn query_bounds(&self) -> (String, String) {
        (
            self.first.format(DATE_FORMAT).to_string(),
            self.last.format(DATE_FORMAT).to_string(),
        )
    }
}

/// Format a date the way downloaded filenames embed it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
