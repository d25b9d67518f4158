// ✅ Selection Store - durable record of selected rows
//
// Lives outside the document, so it survives every host re-render. Ids stay
// selected even while their row is missing from the page.

use indexmap::IndexSet;

/// Result of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    AlreadySelected,
    /// Empty ids are never stored
    Ignored,
}

pub trait SelectionStore {
    fn is_selected(&self, id: &str) -> bool;

    /// Adds `id` if absent. Never removes.
    fn toggle(&mut self, id: &str) -> ToggleOutcome;

    /// Selected ids in insertion order
    fn selected_ids(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit user reset; nothing in the engine calls this on its own
    fn clear(&mut self);
}

/// Insertion-ordered set of row ids
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: IndexSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for Selection {
    fn is_selected(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn toggle(&mut self, id: &str) -> ToggleOutcome {
        if id.is_empty() {
            return ToggleOutcome::Ignored;
        }
        if self.ids.insert(id.to_string()) {
            ToggleOutcome::Added
        } else {
            ToggleOutcome::AlreadySelected
        }
    }

    fn selected_ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn clear(&mut self) {
        self.ids.clear();
    }
}

impl<S: SelectionStore + ?Sized> SelectionStore for Box<S> {
    fn is_selected(&self, id: &str) -> bool {
        (**self).is_selected(id)
    }

    fn toggle(&mut self, id: &str) -> ToggleOutcome {
        (**self).toggle(id)
    }

    fn selected_ids(&self) -> Vec<String> {
        (**self).selected_ids()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_once() {
        let mut selection = Selection::new();

        assert_eq!(selection.toggle("a"), ToggleOutcome::Added);
        assert_eq!(selection.toggle("a"), ToggleOutcome::AlreadySelected);

        assert!(selection.is_selected("a"));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_toggle_never_removes() {
        let mut selection = Selection::new();
        selection.toggle("a");
        selection.toggle("a");
        selection.toggle("a");

        assert_eq!(selection.selected_ids(), vec!["a".to_string()]);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut selection = Selection::new();
        for id in ["c", "a", "b", "a"] {
            selection.toggle(id);
        }

        assert_eq!(selection.selected_ids(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_empty_id_ignored() {
        let mut selection = Selection::new();

        assert_eq!(selection.toggle(""), ToggleOutcome::Ignored);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_clear_is_explicit() {
        let mut selection: Box<dyn SelectionStore> = Box::new(Selection::new());
        selection.toggle("a");
        selection.clear();

        assert!(!selection.is_selected("a"));
        assert!(selection.is_empty());
    }
}
