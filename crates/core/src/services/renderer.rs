use crate::models::panel::{AverageItem, ChartBar, PanelBody, PanelContent, PanelView, TableRow};
use crate::models::summary::BillingSummary;

pub const PANEL_TITLE: &str = "Billing Summary";

/// Months shown in the chart and the table.
const VISIBLE_MONTHS: usize = 12;

/// Turns aggregate results into a display-ready `PanelView`.
///
/// Stateless; the coordinator hands it either a summary or a failure and
/// inserts whatever comes back.
pub struct PanelRenderer {
    panel_id: String,
}

impl PanelRenderer {
    pub fn new(panel_id: impl Into<String>) -> Self {
        Self {
            panel_id: panel_id.into(),
        }
    }

    pub fn render(&self, content: &PanelContent) -> PanelView {
        let body = match content {
            PanelContent::Summary(summary) => summary_body(summary),
            PanelContent::Failed { message } => PanelBody::Error {
                message: message.clone(),
            },
        };

        PanelView {
            id: self.panel_id.clone(),
            title: PANEL_TITLE.to_string(),
            body,
        }
    }
}

fn summary_body(summary: &BillingSummary) -> PanelBody {
    let series = &summary.series;
    let avgs = &summary.averages;

    let averages = vec![
        AverageItem {
            label: "Avg (3 mo)".into(),
            value: format_money(avgs.avg3),
        },
        AverageItem {
            label: "Avg (6 mo)".into(),
            value: format_money(avgs.avg6),
        },
        AverageItem {
            label: "Avg (12 mo)".into(),
            value: format_money(avgs.avg12),
        },
    ];

    let recent = series.latest_first(VISIBLE_MONTHS);

    let max = recent.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let bars = recent
        .iter()
        .map(|(month, total)| ChartBar {
            month: month.to_string(),
            total: *total,
            height_pct: if max > 0.0 { total / max * 100.0 } else { 0.0 },
            tooltip: format!("{month}: {}", format_money(*total)),
            amount_label: format_money(*total),
        })
        .collect();

    let rows = recent
        .iter()
        .map(|(month, total)| TableRow {
            month: month.to_string(),
            total: format_money(*total),
        })
        .collect();

    PanelBody::Summary {
        subtitle: format!("Totals by month ({})", series.currency.to_uppercase()),
        averages,
        bars,
        rows,
    }
}

/// "$12.50"; always two decimals, dollar sign regardless of currency.
pub fn format_money(amount: f64) -> String {
    format!("${amount:.2}")
}
