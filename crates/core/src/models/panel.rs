use serde::{Deserialize, Serialize};

use super::summary::BillingSummary;

/// Result of one aggregate pass as seen by the renderer: either numbers to
/// display or the message of whatever went wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelContent {
    Summary(BillingSummary),
    Failed { message: String },
}

/// Everything needed to build the panel element, already formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelView {
    /// Element id; one panel per id may exist on the page
    pub id: String,

    pub title: String,

    pub body: PanelBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PanelBody {
    Summary {
        /// e.g. "Totals by month (USD)"
        subtitle: String,
        averages: Vec<AverageItem>,
        /// Newest month first, at most 12
        bars: Vec<ChartBar>,
        /// Newest month first, at most 12
        rows: Vec<TableRow>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageItem {
    pub label: String,
    pub value: String,
}

/// One bar of the monthly chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub month: String,
    pub total: f64,

    /// Bar height relative to the tallest bar, 0..=100
    pub height_pct: f64,

    /// Hover text, "2024-01: $12.00"
    pub tooltip: String,

    /// Label above the bar, "$12.00"
    pub amount_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub month: String,
    pub total: String,
}
