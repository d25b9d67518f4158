// 🧭 Selection Session - composition root
//
// Owns the selection store and the configuration, and is the only place the
// outside world calls into: readiness, the refresh control, and clicks.
// Nothing here returns an error to the caller. A broken assumption about the
// host page degrades to a partial render plus a log line, never a failure
// that could take the host page down with it.

use crate::aggregator::{resolve_rows, Aggregator, Summary};
use crate::config::{Config, SelectionAuthority};
use crate::dom::{HostDocument, Listener, NodeId};
use crate::error::EngineResult;
use crate::panel::{PanelOutcome, PanelRenderer};
use crate::readiness::{Readiness, SettleDetector};
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::selection::{Selection, SelectionStore, ToggleOutcome};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// What a dispatched click ended up doing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickOutcome {
    /// Row id resolved by the toggle handler, with what the store did
    pub toggled: Option<(String, ToggleOutcome)>,
    pub propagation_stopped: bool,
    /// Host page handlers the click reached
    pub host_handlers_run: usize,
    pub refreshed: bool,
}

pub struct SelectionSession<S: SelectionStore = Selection> {
    config: Config,
    store: S,
    detector: SettleDetector,
    started: bool,
    last_summary: Summary,
}

impl SelectionSession<Selection> {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Selection::new())
    }
}

impl<S: SelectionStore> SelectionSession<S> {
    pub fn with_store(config: Config, store: S) -> Self {
        let detector = SettleDetector::from_config(&config.readiness);
        SelectionSession {
            config,
            store,
            detector,
            started: false,
            last_summary: Summary::empty(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Summary from the most recent render
    pub fn summary(&self) -> &Summary {
        &self.last_summary
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    // ========================================================================
    // TRIGGERS
    // ========================================================================

    /// Feed the readiness detector; starts the session the first time the
    /// page counts as ready.
    pub fn poll_ready<D: HostDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        now: DateTime<Utc>,
    ) -> Readiness {
        let readiness = self.detector.observe(doc.mutation_count(), now);
        match readiness {
            Readiness::Pending => {}
            Readiness::Settled => {
                self.start(doc);
            }
            Readiness::TimedOut => {
                if !self.started {
                    warn!("host page still changing after max wait, starting anyway");
                }
                self.start(doc);
            }
        }
        readiness
    }

    /// External "host is ready" signal
    pub fn mark_ready<D: HostDocument + ?Sized>(&mut self, doc: &mut D) {
        self.start(doc);
    }

    /// Reconcile, render the initial panel and inject the refresh control.
    /// Runs once; later calls return `false`.
    pub fn start<D: HostDocument + ?Sized>(&mut self, doc: &mut D) -> bool {
        if self.started {
            return false;
        }
        self.started = true;

        if let Err(err) = self.try_start(doc) {
            warn!(error = %err, "session start incomplete");
        }
        info!(selected = self.store.len(), "joint transfers session started");
        true
    }

    /// Manual refresh: re-run reconciliation against the current rows
    pub fn refresh<D: HostDocument + ?Sized>(&mut self, doc: &mut D) -> Option<ReconcileReport> {
        let reconciler = Reconciler::new(&self.config.schema);
        match reconciler.reconcile(doc, &self.store) {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(error = %err, "reconciliation failed");
                None
            }
        }
    }

    /// Selection toggle path for a row id
    pub fn select_row<D: HostDocument + ?Sized>(&mut self, doc: &mut D, row_id: &str) -> ToggleOutcome {
        let outcome = self.store.toggle(row_id);
        debug!(row_id, ?outcome, "selection toggle");

        if let Err(err) = self.render_selection(doc) {
            warn!(error = %err, "summary render failed");
        }
        outcome
    }

    /// Explicit reset requested by the user
    pub fn clear_selection<D: HostDocument + ?Sized>(&mut self, doc: &mut D) {
        self.store.clear();
        self.refresh(doc);
        if let Err(err) = self.render_selection(doc) {
            warn!(error = %err, "summary render failed");
        }
    }

    /// Deliver a click to `target`, bubbling through its ancestors
    pub fn dispatch_click<D: HostDocument + ?Sized>(&mut self, doc: &mut D, target: NodeId) -> ClickOutcome {
        let mut outcome = ClickOutcome::default();
        if !doc.is_attached(target) {
            debug!(target = %target, "click on detached node ignored");
            return outcome;
        }

        // Native default action runs before handlers see the click
        let is_checkbox = doc.tag(target).as_deref() == Some("input")
            && doc.attr(target, "type").as_deref() == Some("checkbox");
        if is_checkbox {
            let flipped = !doc.checked(target);
            if let Err(err) = doc.set_checked(target, flipped) {
                warn!(error = %err, "checkbox default action failed");
            }
        }

        let mut current = Some(target);
        while let Some(node) = current {
            for listener in doc.listeners(node) {
                match listener {
                    Listener::StopPropagation => outcome.propagation_stopped = true,
                    Listener::ToggleSelection => {
                        outcome.propagation_stopped = true;
                        let row_id = doc
                            .closest(node, &self.config.schema.row)
                            .and_then(|row| doc.attr(row, "id"))
                            .unwrap_or_default();
                        let result = self.select_row(doc, &row_id);
                        outcome.toggled = Some((row_id, result));
                    }
                    Listener::Refresh => {
                        self.refresh(doc);
                        outcome.refreshed = true;
                    }
                    Listener::HostRowClick => outcome.host_handlers_run += 1,
                }
            }
            if outcome.propagation_stopped {
                break;
            }
            current = doc.parent(node);
        }

        outcome
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn try_start<D: HostDocument + ?Sized>(&mut self, doc: &mut D) -> EngineResult<()> {
        Reconciler::new(&self.config.schema).reconcile(doc, &self.store)?;
        self.render_selection(doc)?;
        self.install_refresh_control(doc)?;
        Ok(())
    }

    fn render_selection<D: HostDocument + ?Sized>(&mut self, doc: &mut D) -> EngineResult<PanelOutcome> {
        let schema = &self.config.schema;
        let rows = resolve_rows(doc, schema, &self.store.selected_ids());

        // Store is authoritative: the boxes of selected rows just mirror it
        if self.config.summary.authority == SelectionAuthority::Store {
            for row in &rows {
                for control in doc.select_all(*row, &schema.control) {
                    doc.set_checked(control, true)?;
                }
            }
        }

        let summary = Aggregator::new(schema, self.config.summary.authority).aggregate(doc, &rows);
        let outcome = PanelRenderer::new(schema, &self.config.summary).render(doc, &summary)?;
        self.last_summary = summary;
        Ok(outcome)
    }

    fn install_refresh_control<D: HostDocument + ?Sized>(&mut self, doc: &mut D) -> EngineResult<()> {
        let class = &self.config.schema.refresh;
        if doc.select_first(doc.root(), class).is_some() {
            return Ok(());
        }
        let Some(body) = doc.body() else {
            warn!("document has no body, refresh control not installed");
            return Ok(());
        };

        let button = doc.create_element("button", class);
        doc.set_text(button, "Refresh")?;
        doc.add_listener(button, Listener::Refresh)?;
        doc.append_child(body, button)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
