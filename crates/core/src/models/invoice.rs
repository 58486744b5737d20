use serde::{Deserialize, Serialize};

/// A single invoice as returned by the billing dashboard API.
///
/// The core only reads these; they are owned by the host system and live
/// for exactly one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// Invoice status (e.g. "paid", "open", "void"). Compared case-insensitively.
    #[serde(default)]
    pub status: Option<String>,

    /// Issue timestamp in epoch milliseconds, sent either as a string or a
    /// number. Drafts and voided invoices may omit it or send `null`.
    #[serde(default)]
    pub date: Option<RawTimestamp>,

    /// Amount in minor currency units (cents). Absent on some non-paid records.
    #[serde(default)]
    pub amount_cents: Option<i64>,

    /// Lowercase ISO currency code (e.g. "usd")
    #[serde(default)]
    pub currency: Option<String>,
}

impl InvoiceRecord {
    pub fn new(
        status: impl Into<String>,
        date: impl Into<RawTimestamp>,
        amount_cents: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            status: Some(status.into()),
            date: Some(date.into()),
            amount_cents: Some(amount_cents),
            currency: Some(currency.into()),
        }
    }

    /// True when the status equals "paid", ignoring case. A missing status is never paid.
    pub fn is_paid(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("paid"))
    }
}

/// Epoch-millisecond timestamp exactly as it came over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Number(f64),
    Text(String),
}

impl RawTimestamp {
    /// Interpret the value as whole epoch milliseconds.
    ///
    /// Returns `None` for anything that is not a finite number: empty or
    /// non-numeric strings, NaN, infinities.
    pub fn epoch_millis(&self) -> Option<i64> {
        let value = match self {
            RawTimestamp::Number(n) => *n,
            RawTimestamp::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
        };
        if !value.is_finite() {
            return None;
        }
        Some(value.trunc() as i64)
    }
}

impl From<i64> for RawTimestamp {
    fn from(millis: i64) -> Self {
        RawTimestamp::Number(millis as f64)
    }
}

impl From<&str> for RawTimestamp {
    fn from(s: &str) -> Self {
        RawTimestamp::Text(s.to_string())
    }
}

impl From<String> for RawTimestamp {
    fn from(s: String) -> Self {
        RawTimestamp::Text(s)
    }
}

/// Response body of the list-invoices endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceListResponse {
    /// Missing in some responses; treated as no invoices.
    #[serde(default)]
    pub invoices: Vec<InvoiceRecord>,
}
