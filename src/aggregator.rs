// ➕ Aggregator - totals the selected rows that are on the page right now

use crate::config::{HostSchema, SelectionAuthority};
use crate::dom::{HostDocument, NodeId};
use crate::rows::RowExtractor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One selected row as listed in the summary panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub row_id: String,
    pub date: String,
    pub category: String,
    pub description: String,
    /// Display string as the host shows it
    pub amount: String,
    pub amount_value: f64,
}

impl Snapshot {
    /// `date - category - description - amount`
    pub fn line(&self) -> String {
        format!(
            "{} - {} - {} - {}",
            self.date, self.category, self.description, self.amount
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: f64,
    pub items: Vec<Snapshot>,
}

impl Summary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

/// Map selected ids to the row elements currently in the document.
///
/// Ids whose row is missing (mid-rebuild, filtered away by the host) are
/// dropped; order follows `ids`.
pub fn resolve_rows<D: HostDocument + ?Sized>(
    doc: &D,
    schema: &HostSchema,
    ids: &[String],
) -> Vec<NodeId> {
    ids.iter()
        .filter_map(|id| doc.element_by_id(id))
        .filter(|node| doc.has_class(*node, &schema.row))
        .collect()
}

pub struct Aggregator<'a> {
    schema: &'a HostSchema,
    authority: SelectionAuthority,
}

impl<'a> Aggregator<'a> {
    pub fn new(schema: &'a HostSchema, authority: SelectionAuthority) -> Self {
        Aggregator { schema, authority }
    }

    /// Sum and list `rows` in the order given
    pub fn aggregate<D: HostDocument + ?Sized>(&self, doc: &D, rows: &[NodeId]) -> Summary {
        let extractor = RowExtractor::new(self.schema);
        let mut summary = Summary::empty();

        for node in rows {
            let extracted = match extractor.read_row(doc, *node) {
                Ok(extracted) => extracted,
                Err(reason) => {
                    debug!(row = %node, ?reason, "selected row unreadable, left out of summary");
                    continue;
                }
            };

            if !self.contributes(doc, *node) {
                continue;
            }

            let row = extracted.row;
            summary.total += row.amount_value;
            summary.items.push(Snapshot {
                row_id: row.id,
                date: row.date,
                category: row.category,
                description: row.description,
                amount: row.amount,
                amount_value: row.amount_value,
            });
        }

        summary
    }

    /// A row without a control never counts; the host has re-rendered it and
    /// it waits for the next reconciliation.
    fn contributes<D: HostDocument + ?Sized>(&self, doc: &D, row: NodeId) -> bool {
        let Some(control) = doc.select_first(row, &self.schema.control) else {
            return false;
        };
        match self.authority {
            SelectionAuthority::Store => true,
            SelectionAuthority::CheckedState => doc.checked(control),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageDocument;
    use crate::host::{render_host_page, RowSpec};
    use crate::reconciler::Reconciler;
    use crate::selection::{Selection, SelectionStore};

    fn setup(selected: &[&str]) -> (PageDocument, HostSchema, Selection) {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();
        render_host_page(
            &mut doc,
            &schema,
            &[
                RowSpec::new("a", "01/02/2025", "Rent", "Housing", "$10.00"),
                RowSpec::new("b", "01/03/2025", "Groceries", "Food", "$5.50"),
                RowSpec::new("c", "01/04/2025", "Fuel", "Auto", "$1,000.25"),
            ],
        )
        .unwrap();
        let mut store = Selection::new();
        for id in selected {
            store.toggle(id);
        }
        Reconciler::new(&schema).reconcile(&mut doc, &store).unwrap();
        (doc, schema, store)
    }

    #[test]
    fn test_resolve_rows_skips_absent_ids() {
        let (doc, schema, _) = setup(&[]);
        let ids = vec!["c".to_string(), "zzz".to_string(), "a".to_string()];

        let rows = resolve_rows(&doc, &schema, &ids);

        assert_eq!(
            rows,
            vec![doc.element_by_id("c").unwrap(), doc.element_by_id("a").unwrap()]
        );
    }

    #[test]
    fn test_store_authority_sums_in_input_order() {
        let (doc, schema, store) = setup(&["c", "a"]);
        let rows = resolve_rows(&doc, &schema, &store.selected_ids());

        let summary = Aggregator::new(&schema, SelectionAuthority::Store).aggregate(&doc, &rows);

        assert!((summary.total - 1010.25).abs() < 1e-9);
        let ids: Vec<_> = summary.items.iter().map(|s| s.row_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(summary.items[1].line(), "01/02/2025 - Housing - Rent - $10.00");
    }

    #[test]
    fn test_checked_state_authority_ignores_unchecked_rows() {
        let (mut doc, schema, store) = setup(&["a", "b"]);
        let b_row = doc.element_by_id("b").unwrap();
        let b_box = doc.select_first(b_row, &schema.control).unwrap();
        doc.set_checked(b_box, false).unwrap();
        let rows = resolve_rows(&doc, &schema, &store.selected_ids());

        let legacy = Aggregator::new(&schema, SelectionAuthority::CheckedState).aggregate(&doc, &rows);
        let store_view = Aggregator::new(&schema, SelectionAuthority::Store).aggregate(&doc, &rows);

        assert_eq!(legacy.total, 10.0);
        assert_eq!(legacy.count(), 1);
        assert_eq!(store_view.total, 15.5);
        assert_eq!(store_view.count(), 2);
    }

    #[test]
    fn test_rows_without_control_never_count() {
        let (mut doc, schema, store) = setup(&["a", "b"]);
        let a_row = doc.element_by_id("a").unwrap();
        let a_box = doc.select_first(a_row, &schema.control).unwrap();
        doc.remove(a_box).unwrap();
        let rows = resolve_rows(&doc, &schema, &store.selected_ids());

        for authority in [SelectionAuthority::Store, SelectionAuthority::CheckedState] {
            let summary = Aggregator::new(&schema, authority).aggregate(&doc, &rows);

            assert_eq!(summary.total, 5.5);
            assert_eq!(summary.items[0].row_id, "b");
            assert_eq!(summary.count(), 1);
        }
    }

    #[test]
    fn test_empty_selection_is_zero() {
        let (doc, schema, _) = setup(&[]);

        let summary = Aggregator::new(&schema, SelectionAuthority::Store).aggregate(&doc, &[]);

        assert_eq!(summary, Summary::empty());
    }
}
