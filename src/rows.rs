// 🧾 Row Extractor - reads transaction rows off the host page
//
// Partial rows are normal on a page that is being re-rendered under us, so
// extraction never fails: rows that cannot be read are skipped and counted.

use crate::config::HostSchema;
use crate::dom::{HostDocument, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// CORE TYPES
// ============================================================================

/// One transaction line item as shown by the host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub category: String,
    /// Display string, currency symbol included ("$10.00")
    pub amount: String,
    /// Parsed amount, 0.0 when the display string is missing or unreadable
    pub amount_value: f64,
}

/// A row together with where it lives in the document
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub node: NodeId,
    /// Element that receives the selection control
    pub anchor: NodeId,
    pub row: TransactionRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingId,
    MissingAnchor,
    MissingField(RowField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Date,
    Description,
    Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub node: NodeId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub rows: Vec<ExtractedRow>,
    pub skipped: Vec<SkippedRow>,
}

impl Extraction {
    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.row.id.as_str()).collect()
    }
}

// ============================================================================
// EXTRACTOR
// ============================================================================

pub struct RowExtractor<'a> {
    schema: &'a HostSchema,
}

impl<'a> RowExtractor<'a> {
    pub fn new(schema: &'a HostSchema) -> Self {
        RowExtractor { schema }
    }

    /// Scan the whole document for rows, in document order
    pub fn extract<D: HostDocument + ?Sized>(&self, doc: &D) -> Extraction {
        let mut extraction = Extraction::default();

        for node in doc.select_all(doc.root(), &self.schema.row) {
            match self.read_row(doc, node) {
                Ok(row) => extraction.rows.push(row),
                Err(reason) => {
                    debug!(row = %node, ?reason, "skipping unreadable transaction row");
                    extraction.skipped.push(SkippedRow { node, reason });
                }
            }
        }

        extraction
    }

    /// Read a single row element
    pub fn read_row<D: HostDocument + ?Sized>(
        &self,
        doc: &D,
        node: NodeId,
    ) -> Result<ExtractedRow, SkipReason> {
        let id = doc
            .attr(node, "id")
            .filter(|id| !id.trim().is_empty())
            .ok_or(SkipReason::MissingId)?;

        let anchor = doc
            .select_first(node, &self.schema.data_row)
            .ok_or(SkipReason::MissingAnchor)?;

        let date = self.field(doc, node, &self.schema.date, RowField::Date)?;
        let description = self.field(doc, node, &self.schema.description, RowField::Description)?;
        let category = self.field(doc, node, &self.schema.category, RowField::Category)?;

        // Amount is lenient: a missing field counts as zero
        let amount = doc
            .select_first(node, &self.schema.amount)
            .and_then(|n| doc.text(n))
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        let amount_value = parse_amount(&amount);

        Ok(ExtractedRow {
            node,
            anchor,
            row: TransactionRow {
                id,
                date,
                description,
                category,
                amount,
                amount_value,
            },
        })
    }

    fn field<D: HostDocument + ?Sized>(
        &self,
        doc: &D,
        row: NodeId,
        class: &str,
        field: RowField,
    ) -> Result<String, SkipReason> {
        doc.select_first(row, class)
            .and_then(|n| doc.text(n))
            .map(|t| t.trim().to_string())
            .ok_or(SkipReason::MissingField(field))
    }
}

// ============================================================================
// AMOUNT PARSING
// ============================================================================

/// Parse a display amount such as "$1,234.50" or "-$5.00".
///
/// Currency symbols, thousands separators and whitespace are dropped. Anything
/// that still does not parse is 0.0.
pub fn parse_amount(display: &str) -> f64 {
    let cleaned: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageDocument;
    use crate::host::{render_host_page, RowSpec};

    #[test]
    fn test_parse_amount_strips_decoration() {
        assert_eq!(parse_amount("$10.00"), 10.0);
        assert_eq!(parse_amount("$1,234.50"), 1234.5);
        assert_eq!(parse_amount("-$5.25"), -5.25);
        assert_eq!(parse_amount(" € 7 "), 7.0);
    }

    #[test]
    fn test_parse_amount_failures_are_zero() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("pending"), 0.0);
        assert_eq!(parse_amount("$1.2.3"), 0.0);
        assert_eq!(parse_amount("--4"), 0.0);
    }

    #[test]
    fn test_extract_reads_rows_in_order() {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();
        render_host_page(
            &mut doc,
            &schema,
            &[
                RowSpec::new("a", "01/02/2025", "Rent", "Housing", "$10.00"),
                RowSpec::new("b", "01/03/2025", "Groceries", "Food", "$5.50"),
            ],
        )
        .unwrap();

        let extraction = RowExtractor::new(&schema).extract(&doc);

        assert_eq!(extraction.ids(), vec!["a", "b"]);
        assert!(extraction.skipped.is_empty());
        let b = &extraction.rows[1].row;
        assert_eq!(b.description, "Groceries");
        assert_eq!(b.category, "Food");
        assert_eq!(b.amount, "$5.50");
        assert_eq!(b.amount_value, 5.5);
    }

    #[test]
    fn test_missing_amount_counts_as_zero_and_scan_continues() {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();
        let mut broken = RowSpec::new("a", "01/02/2025", "Rent", "Housing", "");
        broken.amount = None;
        render_host_page(
            &mut doc,
            &schema,
            &[broken, RowSpec::new("b", "01/03/2025", "Fuel", "Auto", "$3.00")],
        )
        .unwrap();

        let extraction = RowExtractor::new(&schema).extract(&doc);

        assert_eq!(extraction.ids(), vec!["a", "b"]);
        assert_eq!(extraction.rows[0].row.amount, "");
        assert_eq!(extraction.rows[0].row.amount_value, 0.0);
        assert_eq!(extraction.rows[1].row.amount_value, 3.0);
    }

    #[test]
    fn test_rows_without_required_parts_are_skipped() {
        let schema = HostSchema::default();
        let mut doc = PageDocument::new();
        let view = render_host_page(
            &mut doc,
            &schema,
            &[RowSpec::new("ok", "01/02/2025", "Rent", "Housing", "$1.00")],
        )
        .unwrap();

        let list = doc.select_first(view.container, "transactions-list").unwrap();
        let no_id = doc.element(list, "div", &schema.row).unwrap();
        doc.element(no_id, "div", &schema.data_row).unwrap();
        let no_date = doc.element(list, "div", &schema.row).unwrap();
        doc.set_attr(no_date, "id", "no-date").unwrap();
        doc.element(no_date, "div", &schema.data_row).unwrap();

        let extraction = RowExtractor::new(&schema).extract(&doc);

        assert_eq!(extraction.ids(), vec!["ok"]);
        assert_eq!(
            extraction.skipped,
            vec![
                SkippedRow { node: no_id, reason: SkipReason::MissingId },
                SkippedRow {
                    node: no_date,
                    reason: SkipReason::MissingField(RowField::Date)
                },
            ]
        );
    }
}
