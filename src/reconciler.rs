// 🔁 Reconciler - puts the selection back onto whatever rows exist right now
//
// Two halves:
//   snapshot + plan : read the document, decide what has to change (pure)
//   apply           : carry the plan out against the document
//
// Running it any number of times leaves exactly one control per row, each with
// exactly one toggle binding, checked iff its row id is in the selection.

use crate::config::HostSchema;
use crate::dom::{HostDocument, Listener, NodeId};
use crate::error::EngineResult;
use crate::rows::RowExtractor;
use crate::selection::SelectionStore;
use serde::Serialize;
use tracing::{debug, info};

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub node: NodeId,
    pub checked: bool,
    /// Carries the binding marker, i.e. its toggle handler is already attached
    pub bound: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowSlot {
    pub row: NodeId,
    pub anchor: NodeId,
    pub row_id: String,
    /// Controls found inside the row, in document order
    pub controls: Vec<ControlState>,
}

/// What the reconciler needs to know about the document, nothing more
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomSnapshot {
    pub slots: Vec<RowSlot>,
    pub skipped: usize,
}

// ============================================================================
// PLAN
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileAction {
    /// Create a control under `anchor`, bind it, set its checked state
    AttachControl {
        row: NodeId,
        anchor: NodeId,
        row_id: String,
        checked: bool,
    },
    /// Existing control shows the wrong state; update the property only
    SyncChecked { control: NodeId, checked: bool },
    /// Existing control has no toggle handler yet
    BindToggle { control: NodeId },
    /// Second (or later) control in the same row
    DetachDuplicate { control: NodeId },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub actions: Vec<ReconcileAction>,
    pub rows_seen: usize,
    pub rows_skipped: usize,
}

/// Decide what has to change. Reads nothing but its arguments.
pub fn plan<S: SelectionStore + ?Sized>(snapshot: &DomSnapshot, store: &S) -> ReconcilePlan {
    let mut actions = Vec::new();

    for slot in &snapshot.slots {
        let selected = store.is_selected(&slot.row_id);

        let Some((keep, extras)) = slot.controls.split_first() else {
            actions.push(ReconcileAction::AttachControl {
                row: slot.row,
                anchor: slot.anchor,
                row_id: slot.row_id.clone(),
                checked: selected,
            });
            continue;
        };

        for extra in extras {
            actions.push(ReconcileAction::DetachDuplicate {
                control: extra.node,
            });
        }
        if keep.checked != selected {
            actions.push(ReconcileAction::SyncChecked {
                control: keep.node,
                checked: selected,
            });
        }
        if !keep.bound {
            actions.push(ReconcileAction::BindToggle { control: keep.node });
        }
    }

    ReconcilePlan {
        actions,
        rows_seen: snapshot.slots.len(),
        rows_skipped: snapshot.skipped,
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub rows_seen: usize,
    pub rows_skipped: usize,
    pub controls_attached: usize,
    pub controls_synced: usize,
    pub controls_bound: usize,
    pub duplicates_removed: usize,
}

impl ReconcileReport {
    /// Nothing in the document had to change
    pub fn is_noop(&self) -> bool {
        self.controls_attached == 0
            && self.controls_synced == 0
            && self.controls_bound == 0
            && self.duplicates_removed == 0
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler<'a> {
    schema: &'a HostSchema,
}

impl<'a> Reconciler<'a> {
    pub fn new(schema: &'a HostSchema) -> Self {
        Reconciler { schema }
    }

    pub fn snapshot<D: HostDocument + ?Sized>(&self, doc: &D) -> DomSnapshot {
        let extraction = RowExtractor::new(self.schema).extract(doc);

        let slots = extraction
            .rows
            .into_iter()
            .map(|extracted| {
                let controls = doc
                    .select_all(extracted.node, &self.schema.control)
                    .into_iter()
                    .map(|node| ControlState {
                        node,
                        checked: doc.checked(node),
                        bound: doc.attr(node, &self.schema.bound_marker).is_some(),
                    })
                    .collect();

                RowSlot {
                    row: extracted.node,
                    anchor: extracted.anchor,
                    row_id: extracted.row.id,
                    controls,
                }
            })
            .collect();

        DomSnapshot {
            slots,
            skipped: extraction.skipped.len(),
        }
    }

    pub fn apply<D: HostDocument + ?Sized>(
        &self,
        doc: &mut D,
        plan: &ReconcilePlan,
    ) -> EngineResult<ReconcileReport> {
        let mut report = ReconcileReport {
            rows_seen: plan.rows_seen,
            rows_skipped: plan.rows_skipped,
            ..Default::default()
        };

        for action in &plan.actions {
            match action {
                ReconcileAction::AttachControl {
                    anchor,
                    row_id,
                    checked,
                    ..
                } => {
                    let control = self.create_control(doc, *checked)?;
                    doc.append_child(*anchor, control)?;
                    self.bind_toggle(doc, control)?;
                    debug!(row_id = %row_id, control = %control, checked, "attached selection control");
                    report.controls_attached += 1;
                    report.controls_bound += 1;
                }
                ReconcileAction::SyncChecked { control, checked } => {
                    doc.set_checked(*control, *checked)?;
                    report.controls_synced += 1;
                }
                ReconcileAction::BindToggle { control } => {
                    self.bind_toggle(doc, *control)?;
                    report.controls_bound += 1;
                }
                ReconcileAction::DetachDuplicate { control } => {
                    doc.remove(*control)?;
                    report.duplicates_removed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Snapshot, plan, apply
    pub fn reconcile<D, S>(&self, doc: &mut D, store: &S) -> EngineResult<ReconcileReport>
    where
        D: HostDocument + ?Sized,
        S: SelectionStore + ?Sized,
    {
        let snapshot = self.snapshot(doc);
        let plan = plan(&snapshot, store);
        let report = self.apply(doc, &plan)?;

        info!(
            rows = report.rows_seen,
            skipped = report.rows_skipped,
            attached = report.controls_attached,
            synced = report.controls_synced,
            bound = report.controls_bound,
            duplicates = report.duplicates_removed,
            "reconciled selection controls"
        );
        Ok(report)
    }

    fn create_control<D: HostDocument + ?Sized>(
        &self,
        doc: &mut D,
        checked: bool,
    ) -> EngineResult<NodeId> {
        let control = doc.create_element("input", &self.schema.control);
        doc.set_attr(control, "type", "checkbox")?;
        doc.set_checked(control, checked)?;
        // Clicks on the box must never open the host's row behaviour
        doc.add_listener(control, Listener::StopPropagation)?;
        Ok(control)
    }

    /// Attach the toggle handler once; the marker attribute is the guard
    fn bind_toggle<D: HostDocument + ?Sized>(&self, doc: &mut D, control: NodeId) -> EngineResult<()> {
        if doc.attr(control, &self.schema.bound_marker).is_some() {
            return Ok(());
        }
        doc.set_attr(control, &self.schema.bound_marker, "true")?;
        doc.add_listener(control, Listener::ToggleSelection)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
