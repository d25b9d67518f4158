// 🪧 Panel Renderer - the "Joint Transfers" summary box
//
// Always a full replace: every existing panel goes, a new one is built from
// the summary and inserted as the first child of the container.

use crate::aggregator::Summary;
use crate::config::{HostSchema, SummaryConfig};
use crate::dom::{HostDocument, NodeId};
use crate::error::EngineResult;
use tracing::{debug, warn};

const ITEMS_CLASS: &str = "itemsList";
const ITEM_CLASS: &str = "itemsList-item";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOutcome {
    Rendered { panel: NodeId, removed: usize },
    /// No container on the page; nothing was touched
    ContainerMissing,
}

impl PanelOutcome {
    pub fn panel(&self) -> Option<NodeId> {
        match self {
            PanelOutcome::Rendered { panel, .. } => Some(*panel),
            PanelOutcome::ContainerMissing => None,
        }
    }
}

/// `$15.50`
pub fn format_total(total: f64, currency_symbol: &str) -> String {
    // Sign is decided on the rounded cents, so float dust never shows as -$0.00
    let cents = (total * 100.0).round();
    if cents < 0.0 {
        format!("-{}{:.2}", currency_symbol, -cents / 100.0)
    } else {
        format!("{}{:.2}", currency_symbol, cents.abs() / 100.0)
    }
}

pub struct PanelRenderer<'a> {
    schema: &'a HostSchema,
    config: &'a SummaryConfig,
}

impl<'a> PanelRenderer<'a> {
    pub fn new(schema: &'a HostSchema, config: &'a SummaryConfig) -> Self {
        PanelRenderer { schema, config }
    }

    pub fn render<D: HostDocument + ?Sized>(
        &self,
        doc: &mut D,
        summary: &Summary,
    ) -> EngineResult<PanelOutcome> {
        let Some(container) = doc.select_first(doc.root(), &self.schema.container) else {
            warn!(container = %self.schema.container, "summary container not found, panel not rendered");
            return Ok(PanelOutcome::ContainerMissing);
        };

        let existing = doc.select_all(doc.root(), &self.schema.panel);
        for old in &existing {
            doc.remove(*old)?;
        }

        let panel = self.build(doc, summary)?;
        doc.prepend_child(container, panel)?;

        debug!(
            items = summary.count(),
            total = summary.total,
            removed = existing.len(),
            "rendered summary panel"
        );
        Ok(PanelOutcome::Rendered {
            panel,
            removed: existing.len(),
        })
    }

    /// Builds the detached panel subtree
    fn build<D: HostDocument + ?Sized>(&self, doc: &mut D, summary: &Summary) -> EngineResult<NodeId> {
        let panel_class = &self.schema.panel;
        let panel = doc.create_element("div", panel_class);

        let header = doc.create_element("div", &format!("{}-hd", panel_class));
        doc.append_child(panel, header)?;
        let title = doc.create_element("span", "title");
        doc.set_text(title, &self.config.title)?;
        doc.append_child(header, title)?;
        let subhead = doc.create_element("span", "subhead");
        doc.set_text(
            subhead,
            &format!("({})", format_total(summary.total, &self.config.currency_symbol)),
        )?;
        doc.append_child(header, subhead)?;

        let body = doc.create_element("div", &format!("{}-bd", panel_class));
        doc.append_child(panel, body)?;
        let items_title = doc.create_element("div", "title_2");
        doc.set_text(items_title, "Items:")?;
        doc.append_child(body, items_title)?;
        let list = doc.create_element("ul", ITEMS_CLASS);
        doc.append_child(body, list)?;

        for item in &summary.items {
            let li = doc.create_element("li", ITEM_CLASS);
            doc.set_text(li, &item.line())?;
            doc.append_child(list, li)?;
        }

        Ok(panel)
    }
}

/// Read a rendered panel back: heading text, total text and item lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub title: String,
    pub total: String,
    pub items: Vec<String>,
}

impl PanelView {
    /// The single panel in the document, if any
    pub fn read<D: HostDocument + ?Sized>(doc: &D, schema: &HostSchema) -> Option<Self> {
        let panel = doc.select_first(doc.root(), &schema.panel)?;
        let text_of = |class: &str| {
            doc.select_first(panel, class)
                .and_then(|n| doc.text(n))
                .unwrap_or_default()
        };

        let items = doc
            .select_all(panel, ITEM_CLASS)
            .into_iter()
            .map(|li| doc.text(li).unwrap_or_default())
            .collect();

        Some(PanelView {
            title: text_of("title"),
            total: text_of("subhead"),
            items,
        })
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("{} {}\nItems:\n", self.title, self.total);
        for item in &self.items {
            out.push_str("  • ");
            out.push_str(item);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Snapshot;
    use crate::dom::PageDocument;
    use crate::host::{render_host_page, RowSpec};

    fn snapshot(id: &str, amount: &str, value: f64) -> Snapshot {
        Snapshot {
            row_id: id.to_string(),
            date: "01/02/2025".to_string(),
            category: "Housing".to_string(),
            description: format!("Item {}", id),
            amount: amount.to_string(),
            amount_value: value,
        }
    }

    fn page(schema: &HostSchema) -> PageDocument {
        let mut doc = PageDocument::new();
        render_host_page(
            &mut doc,
            schema,
            &[RowSpec::new("a", "01/02/2025", "Rent", "Housing", "$10.00")],
        )
        .unwrap();
        doc
    }

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(15.5, "$"), "$15.50");
        assert_eq!(format_total(0.0, "$"), "$0.00");
        assert_eq!(format_total(-3.456, "€"), "-€3.46");
    }

    #[test]
    fn test_format_total_rounds_before_sign() {
        assert_eq!(format_total(-1e-17, "$"), "$0.00");
        assert_eq!(format_total(-0.004, "$"), "$0.00");
        assert_eq!(format_total(-0.005, "$"), "-$0.01");
        assert_eq!(format_total(0.1 + 0.2 - 0.3, "$"), "$0.00");
    }

    #[test]
    fn test_render_inserts_panel_first_in_container() {
        let schema = HostSchema::default();
        let config = SummaryConfig::default();
        let mut doc = page(&schema);
        let summary = Summary {
            total: 15.5,
            items: vec![snapshot("a", "$10.00", 10.0), snapshot("b", "$5.50", 5.5)],
        };

        let outcome = PanelRenderer::new(&schema, &config)
            .render(&mut doc, &summary)
            .unwrap();

        let container = doc.select_first(doc.root(), &schema.container).unwrap();
        assert_eq!(outcome.panel(), Some(doc.children(container)[0]));

        let view = PanelView::read(&doc, &schema).unwrap();
        assert_eq!(view.title, "Joint Transfers");
        assert_eq!(view.total, "($15.50)");
        assert_eq!(
            view.items,
            vec![
                "01/02/2025 - Housing - Item a - $10.00",
                "01/02/2025 - Housing - Item b - $5.50"
            ]
        );
    }

    #[test]
    fn test_rerender_leaves_single_panel() {
        let schema = HostSchema::default();
        let config = SummaryConfig::default();
        let mut doc = page(&schema);
        let renderer = PanelRenderer::new(&schema, &config);

        for n in 0..4 {
            let summary = Summary {
                total: n as f64,
                items: vec![snapshot("a", "$1.00", 1.0)],
            };
            renderer.render(&mut doc, &summary).unwrap();
        }

        assert_eq!(doc.select_all(doc.root(), &schema.panel).len(), 1);
        assert_eq!(PanelView::read(&doc, &schema).unwrap().total, "($3.00)");
    }

    #[test]
    fn test_missing_container_is_noop() {
        let schema = HostSchema::default();
        let config = SummaryConfig::default();
        let mut doc = PageDocument::new();
        let before = doc.mutation_count();

        let outcome = PanelRenderer::new(&schema, &config)
            .render(&mut doc, &Summary::empty())
            .unwrap();

        assert_eq!(outcome, PanelOutcome::ContainerMissing);
        assert_eq!(doc.mutation_count(), before);
        assert!(PanelView::read(&doc, &schema).is_none());
    }

    #[test]
    fn test_render_text() {
        let view = PanelView {
            title: "Joint Transfers".to_string(),
            total: "($10.00)".to_string(),
            items: vec!["01/02/2025 - Housing - Rent - $10.00".to_string()],
        };

        assert_eq!(
            view.render_text(),
            "Joint Transfers ($10.00)\nItems:\n  • 01/02/2025 - Housing - Rent - $10.00\n"
        );
    }
}
