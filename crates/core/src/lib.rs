//! Billing summary panel for the billing dashboard.
//!
//! Two pieces do the real work:
//! - [`Aggregator`]: raw invoices → monthly totals and 3/6/12-month averages
//! - [`PresenceCoordinator`]: keeps exactly one summary panel next to the
//!   Invoices card while the host page re-renders around it
//!
//! The host page and the invoice API are reached through the [`HostPage`]
//! and [`InvoiceSource`] traits.

pub mod dom;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

pub use dom::host::DocumentHost;
pub use dom::traits::{HostPage, PanelPlacement};
pub use errors::CoreError;
pub use models::invoice::InvoiceRecord;
pub use models::settings::CoordinatorSettings;
pub use models::summary::{BillingSummary, MonthKey, MonthlySeries, RollingAverages};
pub use providers::dashboard::DashboardInvoiceSource;
pub use providers::traits::InvoiceSource;
pub use services::aggregator::Aggregator;
pub use services::coordinator::{MountOutcome, PresenceCoordinator};
pub use services::renderer::PanelRenderer;
