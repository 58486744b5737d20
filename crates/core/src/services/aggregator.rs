use chrono::{Local, TimeZone};
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::invoice::InvoiceRecord;
use crate::models::summary::{BillingSummary, MonthKey, MonthlySeries, RollingAverages};

/// Currency reported when no paid invoice carries one.
pub const DEFAULT_CURRENCY: &str = "usd";

/// Averaging windows, in months.
const WINDOWS: [usize; 3] = [3, 6, 12];

/// Turns a raw invoice list into monthly totals and rolling averages.
///
/// Pure: no I/O, no state. The same input always yields the same summary
/// (for a fixed time zone).
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate using the machine's local time zone for month boundaries.
    pub fn aggregate(&self, invoices: &[InvoiceRecord]) -> Result<BillingSummary, CoreError> {
        self.aggregate_in(invoices, &Local)
    }

    /// Aggregate with month boundaries taken in `tz`.
    ///
    /// 1. Keep only invoices whose status is "paid" (any case); nothing else
    ///    about a non-paid record is looked at
    /// 2. Bucket each by the calendar month of its timestamp in `tz`
    /// 3. Sum `amount_cents / 100` per month
    /// 4. Order months oldest first and derive the rolling averages
    ///
    /// The reported currency is whatever the last paid invoice in input order
    /// says. Mixed currencies are summed as-is; nothing converts or rejects them.
    pub fn aggregate_in<Tz: TimeZone>(
        &self,
        invoices: &[InvoiceRecord],
        tz: &Tz,
    ) -> Result<BillingSummary, CoreError> {
        let mut by_month: BTreeMap<MonthKey, f64> = BTreeMap::new();
        let mut currency = DEFAULT_CURRENCY.to_string();

        for invoice in invoices.iter().filter(|inv| inv.is_paid()) {
            if let Some(c) = invoice.currency.as_deref().filter(|c| !c.is_empty()) {
                currency = c.to_string();
            }

            let key = month_key_in(invoice, tz)?;
            let cents = invoice
                .amount_cents
                .ok_or_else(|| CoreError::InvalidInvoice("paid invoice without amountCents".into()))?;
            *by_month.entry(key).or_insert(0.0) += money_from_cents(cents);
        }

        let (months, totals): (Vec<MonthKey>, Vec<f64>) = by_month.into_iter().unzip();

        let latest_first: Vec<f64> = totals.iter().rev().copied().collect();
        let averages = Self::compute_averages(&latest_first);

        Ok(BillingSummary {
            series: MonthlySeries {
                months,
                totals,
                currency,
            },
            averages,
        })
    }

    /// Rolling averages over totals given newest first.
    pub fn compute_averages(latest_first: &[f64]) -> RollingAverages {
        let [avg3, avg6, avg12] = WINDOWS.map(|n| mean_of_first(latest_first, n));
        RollingAverages { avg3, avg6, avg12 }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Month bucket for an invoice, or an error if its timestamp is unusable.
pub fn month_key_in<Tz: TimeZone>(invoice: &InvoiceRecord, tz: &Tz) -> Result<MonthKey, CoreError> {
    let raw = invoice
        .date
        .as_ref()
        .ok_or_else(|| CoreError::InvalidInvoice("invoice without date".into()))?;
    let millis = raw
        .epoch_millis()
        .ok_or_else(|| CoreError::InvalidInvoice(format!("unparseable date {raw:?}")))?;

    let dt = tz
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CoreError::InvalidInvoice(format!("date out of range: {millis}")))?;

    Ok(MonthKey::from_datetime(&dt))
}

pub fn money_from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn mean_of_first(values: &[f64], n: usize) -> f64 {
    let window = &values[..values.len().min(n)];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}
