use thiserror::Error;

/// Unified error type for the entire billing-summary-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── API / Network ───────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response. Display shows only the status, which is what the
    /// error panel prints; `message` holds the HTTP reason phrase and shows
    /// up in the Debug form used for logging.
    #[error("list-invoices failed: {status}")]
    Api { status: u16, message: String },

    // ── Invoice data ────────────────────────────────────────────────
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),

    // ── Host page ───────────────────────────────────────────────────
    #[error("Invoices card not found on page")]
    AnchorNotFound,

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full URL; keep query strings out of the
        // message since it ends up visible in the error panel.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
