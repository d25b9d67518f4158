// 🏠 Host Page Fixtures - a stand-in for the page we augment
//
// Builds the minimal markup the engine expects and rebuilds it on demand, the
// way the real host page throws away its row subtree after internal state
// changes. Rows come from code or from a CSV file.

use crate::config::HostSchema;
use crate::dom::{HostDocument, Listener, NodeId};
use crate::error::{DomError, EngineError, EngineResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Class of the host's own list wrapper (not part of the engine schema)
pub const LIST_CLASS: &str = "transactions-list";

/// One row as the host page would render it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSpec {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Category")]
    pub category: String,

    /// `None` renders the row without an amount cell
    #[serde(rename = "Amount", default)]
    pub amount: Option<String>,
}

impl RowSpec {
    pub fn new(id: &str, date: &str, description: &str, category: &str, amount: &str) -> Self {
        RowSpec {
            id: id.to_string(),
            date: date.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            amount: Some(amount.to_string()),
        }
    }
}

/// Handles to the freshly rendered host markup
#[derive(Debug, Clone, PartialEq)]
pub struct HostView {
    pub container: NodeId,
    pub list: NodeId,
    pub rows: Vec<NodeId>,
}

/// Load row fixtures from a CSV file with `Id,Date,Description,Category,Amount` headers
pub fn load_csv(csv_path: &Path) -> Result<Vec<RowSpec>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {}", csv_path.display()))?;

    let mut rows = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let row: RowSpec = result
            .with_context(|| format!("Failed to deserialize row on line {}", line + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Render the container and the row list into the document body
pub fn render_host_page<D: HostDocument + ?Sized>(
    doc: &mut D,
    schema: &HostSchema,
    rows: &[RowSpec],
) -> EngineResult<HostView> {
    let body = doc.body().ok_or_else(|| EngineError::MissingElement {
        class: "body".to_string(),
    })?;

    let container = doc.create_element("div", &schema.container);
    doc.append_child(body, container)?;

    let list = render_list(doc, schema, container, rows)?;
    Ok(HostView {
        container,
        rows: doc.select_all(list, &schema.row),
        list,
    })
}

/// Throw the row list away and render it again with brand-new nodes.
///
/// Anything the engine attached to the old rows is gone afterwards; the
/// summary panel, which sits beside the list, survives.
pub fn rebuild_rows<D: HostDocument + ?Sized>(
    doc: &mut D,
    schema: &HostSchema,
    rows: &[RowSpec],
) -> EngineResult<HostView> {
    let container = doc
        .select_first(doc.root(), &schema.container)
        .ok_or_else(|| EngineError::MissingElement {
            class: schema.container.clone(),
        })?;

    for old in doc.select_all(container, LIST_CLASS) {
        doc.remove(old)?;
    }

    let list = render_list(doc, schema, container, rows)?;
    Ok(HostView {
        container,
        rows: doc.select_all(list, &schema.row),
        list,
    })
}

fn render_list<D: HostDocument + ?Sized>(
    doc: &mut D,
    schema: &HostSchema,
    container: NodeId,
    rows: &[RowSpec],
) -> Result<NodeId, DomError> {
    let list = doc.create_element("div", LIST_CLASS);

    for spec in rows {
        let row = doc.create_element("div", &schema.row);
        doc.set_attr(row, "id", &spec.id)?;
        doc.add_listener(row, Listener::HostRowClick)?;
        doc.append_child(list, row)?;

        let data_row = doc.create_element("div", &schema.data_row);
        doc.append_child(row, data_row)?;

        let mut cells = vec![
            (&schema.date, spec.date.as_str()),
            (&schema.description, spec.description.as_str()),
            (&schema.category, spec.category.as_str()),
        ];
        if let Some(amount) = &spec.amount {
            cells.push((&schema.amount, amount.as_str()));
        }

        for (class, text) in cells {
            let cell = doc.create_element("span", class);
            doc.set_text(cell, text)?;
            doc.append_child(data_row, cell)?;
        }
    }

    // Attach the finished list in one go, like a framework re-render
    doc.append_child(container, list)?;
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageDocument;
    use std::io::Write;

    fn specs() -> Vec<RowSpec> {
        vec![
            RowSpec::new("a", "01/02/2025", "Rent", "Housing", "$10.00"),
            RowSpec::new("b", "01/03/2025", "Groceries", "Food", "$5.50"),
        ]
    }

    #[test]
    fn test_render_host_page_builds_rows() {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();

        let view = render_host_page(&mut doc, &schema, &specs()).unwrap();

        assert_eq!(view.rows.len(), 2);
        assert_eq!(doc.attr(view.rows[0], "id").as_deref(), Some("a"));
        assert_eq!(doc.listeners(view.rows[0]), vec![Listener::HostRowClick]);
        assert_eq!(doc.element_by_id("b"), Some(view.rows[1]));
    }

    #[test]
    fn test_rebuild_replaces_row_nodes() {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();
        let first = render_host_page(&mut doc, &schema, &specs()).unwrap();

        let second = rebuild_rows(&mut doc, &schema, &specs()).unwrap();

        assert_eq!(first.container, second.container);
        assert_ne!(first.rows, second.rows);
        assert!(!doc.is_attached(first.rows[0]));
        assert_eq!(doc.element_by_id("a"), Some(second.rows[0]));
        assert_eq!(doc.select_all(doc.root(), &schema.row).len(), 2);
    }

    #[test]
    fn test_rebuild_without_container_fails() {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();

        let err = rebuild_rows(&mut doc, &schema, &specs()).unwrap_err();
        assert!(matches!(err, EngineError::MissingElement { .. }));
    }

    #[test]
    fn test_load_csv_with_missing_amount() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Id,Date,Description,Category,Amount").unwrap();
        writeln!(file, "a,01/02/2025,Rent,Housing,$10.00").unwrap();
        writeln!(file, "b,01/03/2025,Pending charge,Misc,").unwrap();

        let rows = load_csv(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount.as_deref(), Some("$10.00"));
        assert_eq!(rows[1].amount, None);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_csv(&dir.path().join("nope.csv")).is_err());
    }
}
