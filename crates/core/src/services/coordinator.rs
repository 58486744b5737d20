use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dom::traits::{HostPage, PanelPlacement};
use crate::errors::CoreError;
use crate::models::panel::PanelContent;
use crate::models::settings::CoordinatorSettings;
use crate::models::summary::BillingSummary;
use crate::providers::traits::InvoiceSource;
use crate::services::aggregator::Aggregator;
use crate::services::renderer::PanelRenderer;

/// How a mount cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MountOutcome {
    /// Summary panel inserted next to the anchor.
    Mounted,
    /// Fetch or aggregation failed; the error panel carries this message.
    Failed(String),
    /// Anchor never showed up within the poll budget. Nothing was touched.
    AnchorMissing,
    /// Anchor disappeared between fetch and insert; no panel was inserted.
    AnchorLost,
    /// Another cycle was already in flight; this one did nothing.
    Busy,
}

/// Keeps exactly one up-to-date summary panel next to the Invoices card.
///
/// Host mutations arrive through [`on_host_mutation`](Self::on_host_mutation).
/// A missing panel schedules a debounced mount cycle; a misplaced one is
/// moved back without refetching. Mount cycles never overlap: a cycle that
/// fires while another is running is dropped.
///
/// Cloning is cheap and every clone drives the same state. Scheduling needs
/// a tokio runtime.
#[derive(Clone)]
pub struct PresenceCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    page: Arc<dyn HostPage>,
    source: Arc<dyn InvoiceSource>,
    aggregator: Aggregator,
    renderer: PanelRenderer,
    settings: CoordinatorSettings,
    /// Debounce timer; at most one pending.
    pending: Mutex<PendingMount>,
    /// Held while a mount cycle is running.
    busy: AtomicBool,
    cycles_started: AtomicU64,
}

impl std::fmt::Debug for PresenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceCoordinator")
            .field("source", &self.inner.source.name())
            .field("panel_id", &self.inner.settings.panel_id)
            .field("mounting", &self.is_mounting())
            .field("cycles_started", &self.cycles_started())
            .finish()
    }
}

impl PresenceCoordinator {
    pub fn new(
        page: Arc<dyn HostPage>,
        source: Arc<dyn InvoiceSource>,
        settings: CoordinatorSettings,
    ) -> Self {
        let renderer = PanelRenderer::new(settings.panel_id.clone());
        Self {
            inner: Arc::new(Inner {
                page,
                source,
                aggregator: Aggregator::new(),
                renderer,
                settings,
                pending: Mutex::new(PendingMount::default()),
                busy: AtomicBool::new(false),
                cycles_started: AtomicU64::new(0),
            }),
        }
    }

    /// Initial mount on page load.
    pub fn start(&self) {
        info!(
            source = self.inner.source.name(),
            panel_id = %self.inner.settings.panel_id,
            "Billing summary coordinator started"
        );
        self.schedule_mount();
    }

    /// React to one host-page mutation notification.
    pub fn on_host_mutation(&self) {
        let panel_id = &self.inner.settings.panel_id;
        match self.inner.page.placement(panel_id) {
            PanelPlacement::NoAnchor | PanelPlacement::Adjacent => {}
            PanelPlacement::Missing => self.schedule_mount(),
            PanelPlacement::Displaced => match self.inner.page.reposition_panel(panel_id) {
                Ok(true) => debug!(%panel_id, "Panel moved back next to anchor"),
                Ok(false) => {}
                Err(e) => warn!(%panel_id, "Could not reposition panel: {e}"),
            },
        }
    }

    /// (Re)arm the debounce timer. Only the last call within the debounce
    /// window leads to a mount cycle.
    pub fn schedule_mount(&self) {
        let mut pending = self.inner.pending.lock();
        let (generation, superseded) = pending.arm();
        if let Some(timer) = superseded {
            // Aborting only cancels the wait; a cycle it already launched
            // runs in its own task.
            timer.abort();
            debug!(generation, "Mount trigger collapsed into pending one");
        }

        let inner = Arc::clone(&self.inner);
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.settings.debounce).await;
            // A timer that woke up just as it was superseded may miss the
            // abort; the generation check catches it.
            if !inner.pending.lock().fire(generation) {
                debug!(generation, "Stale mount timer dropped");
                return;
            }
            tokio::spawn(async move {
                inner.run_cycle().await;
            });
        }));
    }

    /// Run one mount cycle right away, skipping the debounce.
    pub async fn mount_now(&self) -> MountOutcome {
        self.inner.run_cycle().await
    }

    pub fn is_mounting(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Number of mount cycles that got past the busy check.
    pub fn cycles_started(&self) -> u64 {
        self.inner.cycles_started.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.inner.settings
    }
}

impl Inner {
    async fn run_cycle(&self) -> MountOutcome {
        let Some(_token) = BusyToken::acquire(&self.busy) else {
            debug!("Mount already in flight, skipping");
            return MountOutcome::Busy;
        };
        let cycle = self.cycles_started.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(cycle, "Mount cycle started");

        if !self.wait_for_anchor().await {
            debug!(cycle, "Invoices card never appeared, giving up");
            return MountOutcome::AnchorMissing;
        }

        let panel_id = &self.settings.panel_id;
        let removed = self.page.remove_panel(panel_id);
        if removed > 0 {
            debug!(cycle, removed, "Removed previous panel");
        }

        let content = match self.load_summary().await {
            Ok(summary) => PanelContent::Summary(summary),
            Err(e) => {
                warn!(cycle, source = self.source.name(), error = ?e, "Failed to load invoices");
                PanelContent::Failed {
                    message: format!("Failed to load invoices: {e}"),
                }
            }
        };

        let view = self.renderer.render(&content);
        if let Err(e) = self.page.insert_panel(&view) {
            warn!(cycle, "Could not insert panel: {e}");
            return MountOutcome::AnchorLost;
        }

        match content {
            PanelContent::Summary(summary) => {
                info!(cycle, months = summary.series.len(), "Billing summary mounted");
                MountOutcome::Mounted
            }
            PanelContent::Failed { message } => MountOutcome::Failed(message),
        }
    }

    /// Poll for the anchor up to `anchor_poll_attempts` times, sleeping
    /// `anchor_poll_interval` after each miss, then look one last time.
    async fn wait_for_anchor(&self) -> bool {
        for _ in 0..self.settings.anchor_poll_attempts {
            if self.page.anchor_present() {
                return true;
            }
            tokio::time::sleep(self.settings.anchor_poll_interval).await;
        }
        self.page.anchor_present()
    }

    async fn load_summary(&self) -> Result<BillingSummary, CoreError> {
        let invoices = self.source.fetch_invoices().await?;
        debug!(count = invoices.len(), "Fetched invoices");
        self.aggregator.aggregate(&invoices)
    }
}

/// The debounce timer and the generation it was armed for.
#[derive(Debug, Default)]
struct PendingMount {
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl PendingMount {
    /// Start a new generation. Returns it along with the timer it supersedes.
    fn arm(&mut self) -> (u64, Option<JoinHandle<()>>) {
        self.generation += 1;
        (self.generation, self.timer.take())
    }

    /// Claim the pending slot for a timer of `generation`. False if a newer
    /// arm has happened since.
    fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.timer = None;
        true
    }
}

/// Exclusive right to run a mount cycle; released on drop, whatever way the
/// cycle ends.
struct BusyToken<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyToken<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyToken<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
