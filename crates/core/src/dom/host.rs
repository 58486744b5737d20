use parking_lot::Mutex;
use std::sync::Arc;

use super::document::{Document, NodeId};
use super::traits::{HostPage, PanelPlacement};
use crate::errors::CoreError;
use crate::models::panel::{PanelBody, PanelView};
use crate::models::settings::{CoordinatorSettings, DEFAULT_ANCHOR_TITLE};

// ── Host page markers ───────────────────────────────────────────────

const CARD_CLASS: &str = "bg-brand-dashboard-card";
const CARD_TITLE_TAG: &str = "p";
const CARD_TITLE_CLASSES: [&str; 2] = ["text-md", "font-medium"];
const CONTAINER_CLASSES: [&str; 3] = ["flex", "flex-col", "gap-4"];

const PANEL_CARD_CLASSES: &str =
    "rounded-lg flex flex-col gap-4 border-0 bg-brand-dashboard-card p-6 dark:bg-brand-dashboard-card";
const ERROR_CARD_CLASSES: &str =
    "rounded-lg flex flex-col gap-2 border-0 bg-brand-dashboard-card p-6 dark:bg-brand-dashboard-card";
const PANEL_STYLE: &str =
    "background: var(--color-theme-bg-card); border: 1px solid var(--color-theme-border-quaternary)";

/// Where the panel attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// The card whose title matched
    pub card: NodeId,
    /// Nearest `flex flex-col gap-4` ancestor of the card
    pub container: NodeId,
    /// Ancestor-or-self of the card that is a direct child of `container`;
    /// the panel goes right after it
    pub slot: NodeId,
}

/// [`HostPage`] over a shared in-memory [`Document`].
///
/// Clones share the same document, so a test (or an embedding that mirrors
/// the real page) can keep mutating it while the coordinator holds a clone.
#[derive(Debug, Clone)]
pub struct DocumentHost {
    document: Arc<Mutex<Document>>,
    anchor_title: String,
}

impl DocumentHost {
    pub fn new(document: Document) -> Self {
        Self::with_anchor_title(document, DEFAULT_ANCHOR_TITLE)
    }

    /// Host that looks for the card titled `settings.anchor_title`.
    pub fn from_settings(document: Document, settings: &CoordinatorSettings) -> Self {
        Self::with_anchor_title(document, settings.anchor_title.clone())
    }

    pub fn with_anchor_title(document: Document, anchor_title: impl Into<String>) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            anchor_title: anchor_title.into(),
        }
    }

    /// Run `f` with exclusive access to the document.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut doc = self.document.lock();
        f(&mut *doc)
    }

    /// Number of attached elements with `panel_id`.
    pub fn panel_count(&self, panel_id: &str) -> usize {
        self.document.lock().elements_by_id(panel_id).len()
    }

    pub fn find_anchor(&self) -> Option<Anchor> {
        locate_anchor(&self.document.lock(), &self.anchor_title)
    }
}

impl HostPage for DocumentHost {
    fn anchor_present(&self) -> bool {
        self.find_anchor().is_some()
    }

    fn placement(&self, panel_id: &str) -> PanelPlacement {
        let doc = self.document.lock();
        let Some(anchor) = locate_anchor(&doc, &self.anchor_title) else {
            return PanelPlacement::NoAnchor;
        };
        let Some(panel) = doc.get_element_by_id(panel_id) else {
            return PanelPlacement::Missing;
        };
        if doc.parent(panel) == Some(anchor.container) && doc.next_sibling(anchor.slot) == Some(panel) {
            PanelPlacement::Adjacent
        } else {
            PanelPlacement::Displaced
        }
    }

    fn remove_panel(&self, panel_id: &str) -> usize {
        let mut doc = self.document.lock();
        let existing = doc.elements_by_id(panel_id);
        let removed = existing.len();
        for node in existing {
            // An earlier copy may sit inside a later one
            doc.discard(node);
        }
        removed
    }

    fn insert_panel(&self, panel: &PanelView) -> Result<(), CoreError> {
        let mut doc = self.document.lock();
        let anchor = locate_anchor(&doc, &self.anchor_title).ok_or(CoreError::AnchorNotFound)?;
        let reference = doc.next_sibling(anchor.slot);
        let node = build_panel(&mut doc, panel)?;
        let inserted = doc.insert_before(anchor.container, node, reference);
        if inserted.is_err() {
            doc.discard(node);
        }
        inserted
    }

    fn reposition_panel(&self, panel_id: &str) -> Result<bool, CoreError> {
        let mut doc = self.document.lock();
        let anchor = locate_anchor(&doc, &self.anchor_title).ok_or(CoreError::AnchorNotFound)?;
        let Some(panel) = doc.get_element_by_id(panel_id) else {
            return Ok(false);
        };
        if panel == anchor.slot || doc.is_ancestor(panel, anchor.slot) {
            return Err(CoreError::Dom("panel contains the anchor card".into()));
        }
        let reference = doc.next_sibling(anchor.slot);
        doc.insert_before(anchor.container, panel, reference)?;
        Ok(true)
    }
}

// ── Anchor discovery ────────────────────────────────────────────────

/// Find the first card titled `title` and the container it sits in.
///
/// Only the first matching card is considered; if it has no container the
/// anchor counts as absent.
pub fn locate_anchor(doc: &Document, title: &str) -> Option<Anchor> {
    let card = doc.descendants_iter(doc.root()).find(|&n| {
        doc.element(n).has_class(CARD_CLASS)
            && card_title(doc, n).is_some_and(|t| t.trim() == title)
    })?;

    let container = doc
        .ancestors_iter(card)
        .find(|&a| doc.element(a).has_classes(&CONTAINER_CLASSES))?;

    let slot = std::iter::once(card)
        .chain(doc.ancestors_iter(card))
        .find(|&a| doc.parent(a) == Some(container))?;

    Some(Anchor {
        card,
        container,
        slot,
    })
}

/// Text of the card's first title element, if it has one.
fn card_title(doc: &Document, card: NodeId) -> Option<String> {
    doc.descendants_iter(card)
        .find(|&n| {
            let el = doc.element(n);
            el.tag == CARD_TITLE_TAG && el.has_classes(&CARD_TITLE_CLASSES)
        })
        .map(|n| doc.text_content(n))
}

// ── Panel construction ──────────────────────────────────────────────

fn build_panel(doc: &mut Document, view: &PanelView) -> Result<NodeId, CoreError> {
    match &view.body {
        PanelBody::Summary {
            subtitle,
            averages,
            bars,
            rows,
        } => {
            let card = doc.create_element_with("div", PANEL_CARD_CLASSES);
            doc.set_id(card, view.id.clone());
            doc.set_attribute(card, "style", PANEL_STYLE);

            // Header
            let header = doc.create_element_with("div", "flex flex-col gap-2");
            let header_row = doc.create_element_with("div", "flex flex-row items-center justify-between gap-1");
            let title = doc.create_element_with("p", "text-md font-medium");
            doc.set_text(title, view.title.clone());
            let sub = doc.create_element_with("p", "tracking-tight text-base text-theme-text-secondary");
            doc.set_text(sub, subtitle.clone());
            doc.append_child(header_row, title)?;
            doc.append_child(header, header_row)?;
            doc.append_child(header, sub)?;

            // Averages
            let avg_row = doc.create_element_with("div", "cis-avgRow");
            for item in averages {
                let cell = doc.create_element_with("div", "cis-avgItem");
                let label = doc.create_element_with("div", "cis-avgLabel");
                doc.set_text(label, item.label.clone());
                let value = doc.create_element_with("div", "cis-avgValue");
                doc.set_text(value, item.value.clone());
                doc.append_child(cell, label)?;
                doc.append_child(cell, value)?;
                doc.append_child(avg_row, cell)?;
            }

            // Chart
            let chart_wrap = doc.create_element_with("div", "cis-chartWrap");
            let chart = doc.create_element_with("div", "cis-chart");
            for bar in bars {
                let wrap = doc.create_element_with("div", "cis-barWrap");
                let amount = doc.create_element_with("div", "cis-amountLabel");
                doc.set_text(amount, bar.amount_label.clone());
                let column = doc.create_element_with("div", "cis-bar");
                doc.set_attribute(column, "style", format!("height: {}%", bar.height_pct));
                doc.set_attribute(column, "title", bar.tooltip.clone());
                let x_label = doc.create_element_with("div", "cis-xLabel");
                doc.set_text(x_label, bar.month.clone());
                doc.append_child(wrap, amount)?;
                doc.append_child(wrap, column)?;
                doc.append_child(wrap, x_label)?;
                doc.append_child(chart, wrap)?;
            }
            doc.append_child(chart_wrap, chart)?;

            // Table
            let table_wrap = doc.create_element_with("div", "overflow-x-auto");
            let table = doc.create_element_with("table", "w-full border-collapse text-base");
            let thead = doc.create_element("thead");
            let head_row = doc.create_element("tr");
            for (heading, class_list) in [("Month", "px-3 py-2 font-semibold"), ("Total", "px-3 py-2 text-right font-semibold")] {
                let th = doc.create_element_with("th", class_list);
                doc.set_text(th, heading);
                doc.append_child(head_row, th)?;
            }
            doc.append_child(thead, head_row)?;
            let tbody = doc.create_element("tbody");
            for row in rows {
                let tr = doc.create_element("tr");
                let month = doc.create_element_with("td", "p-2");
                doc.set_text(month, row.month.clone());
                let total = doc.create_element_with("td", "p-2 text-right");
                doc.set_text(total, row.total.clone());
                doc.append_child(tr, month)?;
                doc.append_child(tr, total)?;
                doc.append_child(tbody, tr)?;
            }
            doc.append_child(table, thead)?;
            doc.append_child(table, tbody)?;
            doc.append_child(table_wrap, table)?;

            for part in [header, avg_row, chart_wrap, table_wrap] {
                doc.append_child(card, part)?;
            }
            Ok(card)
        }
        PanelBody::Error { message } => {
            let card = doc.create_element_with("div", ERROR_CARD_CLASSES);
            doc.set_id(card, view.id.clone());
            doc.set_attribute(card, "style", PANEL_STYLE);
            let title = doc.create_element_with("p", "text-md font-medium");
            doc.set_text(title, view.title.clone());
            let body = doc.create_element_with("p", "text-base text-theme-text-secondary");
            doc.set_text(body, message.clone());
            doc.append_child(card, title)?;
            doc.append_child(card, body)?;
            Ok(card)
        }
    }
}
