// Joint Transfers - Core Library
// Selection reconciliation for a transaction list we don't own.
// Exposes all modules for use in the CLI, the terminal demo, and tests.

pub mod config;
pub mod error;
pub mod dom;         // Document seam + in-memory page
pub mod host;        // Host page fixtures (render / rebuild)
pub mod rows;        // Row Extractor
pub mod selection;   // Selection Store
pub mod reconciler;  // Plan + apply selection controls
pub mod aggregator;  // Totals over selected rows
pub mod panel;       // Summary panel renderer
pub mod readiness;   // Stable-DOM detector
pub mod session;     // Composition root

// Re-export commonly used types
pub use config::{
    Config, HostSchema, SummaryConfig, ReadinessConfig, LoggingConfig,
    SelectionAuthority, DEFAULT_CONFIG_FILE,
};
pub use error::{DomError, EngineError, EngineResult};
pub use dom::{HostDocument, PageDocument, NodeId, Listener};
pub use host::{RowSpec, HostView, load_csv, render_host_page, rebuild_rows};
pub use rows::{
    TransactionRow, ExtractedRow, Extraction, RowExtractor, SkippedRow, SkipReason, RowField,
    parse_amount,
};
pub use selection::{Selection, SelectionStore, ToggleOutcome};
pub use reconciler::{
    Reconciler, ReconcilePlan, ReconcileAction, ReconcileReport, DomSnapshot, RowSlot,
    ControlState, plan,
};
pub use aggregator::{Aggregator, Summary, Snapshot, resolve_rows};
pub use panel::{PanelRenderer, PanelOutcome, PanelView, format_total};
pub use readiness::{Readiness, SettleDetector};
pub use session::{SelectionSession, ClickOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
