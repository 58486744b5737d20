use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::invoice::InvoiceRecord;

/// Where invoices come from.
///
/// The production implementation calls the dashboard API; tests plug in
/// canned or failing sources. The coordinator only ever sees this trait.
#[async_trait]
pub trait InvoiceSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the current invoice snapshot. One call per mount cycle.
    async fn fetch_invoices(&self) -> Result<Vec<InvoiceRecord>, CoreError>;
}
