// ═══════════════════════════════════════════════════════════════════
// Coordinator Tests — debounce, single instance, busy guard,
// reposition, anchor polling, error panel
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use billing_summary_core::dom::document::{Document, NodeId};
use billing_summary_core::dom::host::DocumentHost;
use billing_summary_core::dom::traits::{HostPage, PanelPlacement};
use billing_summary_core::errors::CoreError;
use billing_summary_core::models::invoice::InvoiceRecord;
use billing_summary_core::models::settings::CoordinatorSettings;
use billing_summary_core::providers::traits::InvoiceSource;
use billing_summary_core::services::coordinator::{MountOutcome, PresenceCoordinator};

const PANEL_ID: &str = "cis-invoice-summary-panel";

// ═══════════════════════════════════════════════════════════════════
// Mock Sources
// ═══════════════════════════════════════════════════════════════════

/// Returns the same invoices on every call, optionally after a delay.
struct MockSource {
    invoices: Vec<InvoiceRecord>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    fn new() -> Self {
        Self {
            invoices: vec![
                // mid-month noon UTC, same month in any time zone
                InvoiceRecord::new("paid", "1700049600000", 1999, "usd"),
                InvoiceRecord::new("paid", "1702641600000", 500, "usd"),
                InvoiceRecord::new("open", "1702641600000", 999_999, "usd"),
            ],
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    fn with_invoices(invoices: Vec<InvoiceRecord>) -> Self {
        Self {
            invoices,
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvoiceSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_invoices(&self) -> Result<Vec<InvoiceRecord>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.invoices.clone())
    }
}

/// Always answers with an HTTP 500.
struct FailingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl InvoiceSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch_invoices(&self) -> Result<Vec<InvoiceRecord>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Api {
            status: 500,
            message: "Internal Server Error".into(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

struct Page {
    host: DocumentHost,
    list: NodeId,
}

/// A billing page with the card list; `with_invoices` adds the Invoices card.
fn billing_page(with_invoices: bool) -> Page {
    let mut doc = Document::new();
    let body = doc.create_element("body");
    doc.append_child(doc.root(), body).unwrap();
    let list = doc.create_element_with("div", "flex flex-col gap-4");
    doc.append_child(body, list).unwrap();

    let host = DocumentHost::new(doc);
    add_card(&host, list, "Usage");
    if with_invoices {
        add_card(&host, list, "Invoices");
    }
    add_card(&host, list, "Payment Method");
    Page { host, list }
}

fn add_card(host: &DocumentHost, list: NodeId, title: &str) -> NodeId {
    host.with_document(|doc| {
        let card = doc.create_element_with("div", "rounded-lg bg-brand-dashboard-card p-6");
        let p = doc.create_element_with("p", "text-md font-medium");
        doc.set_text(p, title);
        doc.append_child(card, p).unwrap();
        doc.append_child(list, card).unwrap();
        card
    })
}

fn coordinator(host: &DocumentHost, source: Arc<dyn InvoiceSource>) -> PresenceCoordinator {
    PresenceCoordinator::new(Arc::new(host.clone()), source, CoordinatorSettings::default())
}

fn panel_text(host: &DocumentHost) -> String {
    host.with_document(|doc| {
        let panel = doc.get_element_by_id(PANEL_ID).expect("panel present");
        doc.text_content(panel)
    })
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

// ═══════════════════════════════════════════════════════════════════
// Mounting
// ═══════════════════════════════════════════════════════════════════

mod mounting {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn start_mounts_one_panel_next_to_invoices() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        coord.start();
        settle().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Adjacent);
        assert!(panel_text(&page.host).contains("Totals by month (USD)"));
        assert!(!coord.is_mounting());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_happens_before_debounce_elapses() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        coord.start();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(source.calls(), 0);
        assert_eq!(coord.cycles_started(), 0);

        settle().await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mount_now_reports_outcome() {
        let page = billing_page(true);
        let coord = coordinator(&page.host, Arc::new(MockSource::new()));

        assert_eq!(coord.mount_now().await, MountOutcome::Mounted);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn host_and_coordinator_share_configured_anchor() {
        let settings = CoordinatorSettings::from_json(
            r#"{"anchor_title": "Payment Method", "panel_id": "billing-panel"}"#,
        )
        .unwrap();
        let page = billing_page(false);
        let host = page.host.with_document(|doc| {
            DocumentHost::from_settings(std::mem::take(doc), &settings)
        });
        let coord = PresenceCoordinator::new(
            Arc::new(host.clone()),
            Arc::new(MockSource::new()),
            settings,
        );

        assert_eq!(coord.mount_now().await, MountOutcome::Mounted);
        assert_eq!(host.panel_count("billing-panel"), 1);
        assert_eq!(host.placement("billing-panel"), PanelPlacement::Adjacent);
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_that_never_appears_is_absorbed_silently() {
        let page = billing_page(false);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        assert_eq!(coord.mount_now().await, MountOutcome::AnchorMissing);

        assert_eq!(source.calls(), 0);
        assert_eq!(page.host.panel_count(PANEL_ID), 0);
        assert!(!coord.is_mounting());
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_poll_gives_up_after_budget() {
        let page = billing_page(false);
        let coord = coordinator(&page.host, Arc::new(MockSource::new()));
        let started = tokio::time::Instant::now();

        coord.mount_now().await;

        // 40 misses × 200ms
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(8000));
        assert!(waited < Duration::from_millis(8200));
    }

    #[tokio::test(start_paused = true)]
    async fn late_anchor_is_picked_up_by_poll() {
        let page = billing_page(false);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        coord.start();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(coord.is_mounting());

        add_card(&page.host, page.list, "Invoices");
        settle().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Adjacent);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Debounce & single instance
// ═══════════════════════════════════════════════════════════════════

mod debounce {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_of_mutations_collapses_to_one_cycle() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        coord.start();
        for _ in 0..10 {
            coord.on_host_mutation();
        }
        settle().await;

        assert_eq!(coord.cycles_started(), 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn triggers_inside_window_keep_pushing_it_back() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        for _ in 0..5 {
            coord.on_host_mutation();
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        assert_eq!(source.calls(), 0);

        settle().await;
        assert_eq!(coord.cycles_started(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_cycles_never_duplicate_panel() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());

        coord.schedule_mount();
        settle().await;
        coord.schedule_mount();
        settle().await;

        assert_eq!(source.calls(), 2);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Adjacent);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_mount_now_keeps_one_panel() {
        let page = billing_page(true);
        let coord = coordinator(&page.host, Arc::new(MockSource::new()));

        coord.mount_now().await;
        coord.mount_now().await;

        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_with_panel_in_place_schedules_nothing() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());
        coord.mount_now().await;

        coord.on_host_mutation();
        settle().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(coord.cycles_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_without_anchor_schedules_nothing() {
        let page = billing_page(false);
        let coord = coordinator(&page.host, Arc::new(MockSource::new()));

        coord.on_host_mutation();
        settle().await;

        assert_eq!(coord.cycles_started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panel_removed_by_host_is_remounted() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());
        coord.mount_now().await;

        page.host.remove_panel(PANEL_ID);
        coord.on_host_mutation();
        settle().await;

        assert_eq!(source.calls(), 2);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Busy guard
// ═══════════════════════════════════════════════════════════════════

mod busy {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_firing_during_mount_is_a_noop() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::slow(Duration::from_secs(5)));
        let coord = coordinator(&page.host, source.clone());

        coord.start();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(coord.is_mounting());

        // Panel is absent while fetching, so this schedules another cycle
        coord.on_host_mutation();
        tokio::time::sleep(Duration::from_millis(300)).await;

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(coord.cycles_started(), 1);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
        assert!(!coord.is_mounting());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_mount_now_is_rejected() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::slow(Duration::from_secs(1)));
        let coord = coordinator(&page.host, source.clone());

        let (first, second) = tokio::join!(coord.mount_now(), coord.mount_now());

        assert_eq!(first, MountOutcome::Mounted);
        assert_eq!(second, MountOutcome::Busy);
        assert_eq!(source.calls(), 1);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_mount_is_not_cancelled_by_new_trigger() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::slow(Duration::from_secs(2)));
        let coord = coordinator(&page.host, source.clone());

        coord.schedule_mount();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(coord.is_mounting());

        // Re-arming the debounce must not abort the running cycle
        coord.schedule_mount();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(page.host.panel_count(PANEL_ID), 1);
        assert_eq!(source.calls(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Reposition
// ═══════════════════════════════════════════════════════════════════

mod reposition {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn displaced_panel_is_moved_back_without_refetch() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::new());
        let coord = coordinator(&page.host, source.clone());
        coord.mount_now().await;

        let panel = page.host.with_document(|doc| {
            let panel = doc.get_element_by_id(PANEL_ID).unwrap();
            doc.append_child(doc.root(), panel).unwrap();
            panel
        });
        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Displaced);

        coord.on_host_mutation();

        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Adjacent);
        settle().await;
        assert_eq!(source.calls(), 1);
        assert_eq!(coord.cycles_started(), 1);
        page.host.with_document(|doc| {
            assert_eq!(doc.get_element_by_id(PANEL_ID), Some(panel));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn reordered_container_is_fixed() {
        let page = billing_page(true);
        let list = page.list;
        let coord = coordinator(&page.host, Arc::new(MockSource::new()));
        coord.mount_now().await;

        page.host.with_document(|doc| {
            let panel = doc.get_element_by_id(PANEL_ID).unwrap();
            let first = doc.children(list)[0];
            doc.insert_before(list, panel, Some(first)).unwrap();
        });

        coord.on_host_mutation();

        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Adjacent);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Failures
// ═══════════════════════════════════════════════════════════════════

mod failures {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_renders_error_panel() {
        let page = billing_page(true);
        let source = Arc::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let coord = coordinator(&page.host, source.clone());

        coord.start();
        settle().await;

        assert_eq!(page.host.panel_count(PANEL_ID), 1);
        assert_eq!(page.host.placement(PANEL_ID), PanelPlacement::Adjacent);
        assert!(panel_text(&page.host)
            .contains("Failed to load invoices: list-invoices failed: 500"));
        assert!(!coord.is_mounting());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_reports_message_and_releases_guard() {
        let page = billing_page(true);
        let source = Arc::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let coord = coordinator(&page.host, source.clone());

        let first = coord.mount_now().await;
        let second = coord.mount_now().await;

        assert_eq!(
            first,
            MountOutcome::Failed("Failed to load invoices: list-invoices failed: 500".into())
        );
        assert!(matches!(second, MountOutcome::Failed(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(page.host.panel_count(PANEL_ID), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_invoice_renders_error_panel() {
        let page = billing_page(true);
        let source = Arc::new(MockSource::with_invoices(vec![InvoiceRecord::new(
            "paid", "garbage", 100, "usd",
        )]));
        let coord = coordinator(&page.host, source);

        let outcome = coord.mount_now().await;

        assert!(matches!(outcome, MountOutcome::Failed(ref m) if m.contains("Invalid invoice")));
        assert!(panel_text(&page.host).contains("Failed to load invoices"));
    }

    #[tokio::test(start_paused = true)]
    async fn error_panel_is_replaced_by_summary_on_next_success() {
        let page = billing_page(true);
        let failing = coordinator(
            &page.host,
            Arc::new(FailingSource {
                calls: AtomicUsize::new(0),
            }),
        );
        failing.mount_now().await;
        assert!(panel_text(&page.host).contains("Failed to load invoices"));

        let working = coordinator(&page.host, Arc::new(MockSource::new()));
        assert_eq!(working.mount_now().await, MountOutcome::Mounted);

        assert_eq!(page.host.panel_count(PANEL_ID), 1);
        assert!(!panel_text(&page.host).contains("Failed"));
    }
}
