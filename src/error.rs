// 🚧 Engine Errors
// Failures inside the engine never escape the session entry points; they are
// logged and swallowed there. These types exist so internal steps can use `?`.

use crate::dom::NodeId;

// ============================================================================
// DOCUMENT ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Node id does not belong to this document
    UnknownNode(NodeId),
    /// Operation needs an element but got the document node
    NotAnElement(NodeId),
    /// Inserting would make a node its own ancestor
    CycleRejected { parent: NodeId, child: NodeId },
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomError::UnknownNode(node) => write!(f, "unknown node {}", node),
            DomError::NotAnElement(node) => write!(f, "node {} is not an element", node),
            DomError::CycleRejected { parent, child } => {
                write!(f, "cannot insert {} under its descendant {}", child, parent)
            }
        }
    }
}

impl std::error::Error for DomError {}

// ============================================================================
// ENGINE ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A structural document operation failed
    Dom(DomError),
    /// A required host element could not be found
    MissingElement { class: String },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Dom(err) => write!(f, "document error: {}", err),
            EngineError::MissingElement { class } => {
                write!(f, "no element with class '{}' in document", class)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Dom(err) => Some(err),
            EngineError::MissingElement { .. } => None,
        }
    }
}

impl From<DomError> for EngineError {
    fn from(err: DomError) -> Self {
        EngineError::Dom(err)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
