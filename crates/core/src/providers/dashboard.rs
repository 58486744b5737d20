use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::Client;
use std::time::Duration;

use super::traits::InvoiceSource;
use crate::errors::CoreError;
use crate::models::invoice::{InvoiceListResponse, InvoiceRecord};
use crate::models::settings::{CoordinatorSettings, DEFAULT_ENDPOINT};

/// Billing dashboard list-invoices endpoint.
///
/// - **Method**: POST with an empty JSON object as body
/// - **Auth**: the dashboard session cookie; same-origin in the browser,
///   passed explicitly here via [`DashboardInvoiceSource::with_session_cookie`]
/// - **Response**: `{ "invoices": [...] }`, no pagination
pub struct DashboardInvoiceSource {
    client: Client,
    endpoint: String,
    session_cookie: Option<String>,
}

impl DashboardInvoiceSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::build(endpoint.into(), CoordinatorSettings::default().request_timeout)
    }

    /// Source configured from coordinator settings (endpoint and timeout).
    pub fn from_settings(settings: &CoordinatorSettings) -> Self {
        Self::build(settings.endpoint.clone(), settings.request_timeout)
    }

    /// Attach the `Cookie` header value to send with every request.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[cfg_attr(target_arch = "wasm32", allow(unused_variables))]
    fn build(endpoint: String, timeout: Duration) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(timeout);
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            endpoint,
            session_cookie: None,
        }
    }
}

impl Default for DashboardInvoiceSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl InvoiceSource for DashboardInvoiceSource {
    fn name(&self) -> &str {
        "list-invoices"
    }

    async fn fetch_invoices(&self) -> Result<Vec<InvoiceRecord>, CoreError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body("{}");
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = resp.text().await?;
        parse_invoice_list(&body)
    }
}

/// Parse a list-invoices response body.
pub fn parse_invoice_list(body: &str) -> Result<Vec<InvoiceRecord>, CoreError> {
    let parsed: InvoiceListResponse = serde_json::from_str(body)?;
    Ok(parsed.invoices)
}
