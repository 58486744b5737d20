use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// Calendar month key in `YYYY-MM` form.
///
/// Zero-padding makes lexicographic order equal chronological order,
/// so `Ord` is derived straight from the string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthKey(String);

impl MonthKey {
    /// Build the key for the calendar month `dt` falls in, in `dt`'s own time zone.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        MonthKey(format!("{:04}-{:02}", dt.year(), dt.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MonthKey {
    type Err = CoreError;

    /// Accepts exactly `YYYY-MM` with a month between 01 and 12.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidInvoice(format!("invalid month key: {s:?}"));
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        let well_formed = year.len() == 4
            && month.len() == 2
            && year.bytes().all(|b| b.is_ascii_digit())
            && month.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(invalid());
        }
        match month.parse::<u32>() {
            Ok(1..=12) => Ok(MonthKey(s.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monthly totals, oldest month first. `months[i]` and `totals[i]` describe the same month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub months: Vec<MonthKey>,

    /// Totals in major currency units
    pub totals: Vec<f64>,

    /// Currency of the last paid invoice seen, "usd" when none
    pub currency: String,
}

impl MonthlySeries {
    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// The newest `n` (month, total) pairs, newest first.
    pub fn latest_first(&self, n: usize) -> Vec<(&MonthKey, f64)> {
        self.months
            .iter()
            .zip(self.totals.iter().copied())
            .rev()
            .take(n)
            .collect()
    }
}

/// Mean of the newest 3, 6 and 12 monthly totals.
///
/// Windows truncate: with only two months of history every average is the
/// mean of those two. With no history all three are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingAverages {
    pub avg3: f64,
    pub avg6: f64,
    pub avg12: f64,
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSummary {
    pub series: MonthlySeries,
    pub averages: RollingAverages,
}
