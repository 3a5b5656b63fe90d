use std::collections::BTreeSet;

use crate::candidates::reachable_from;
use crate::lockfile::Lockfile;
use crate::model::{PackageEntry, PackageKind};

/// Cursor position and selected gem names over an ordered candidate list.
/// Mutated only by the selection engine; all transitions are pure state
/// changes with no I/O.
#[derive(Clone, Debug, Default)]
pub struct SelectionState {
    cursor: usize,
    selected: BTreeSet<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    /// Moves the cursor by `delta`, clamped to `[0, len-1]`. No wrapping.
    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    /// Flips membership of the entry under the cursor.
    pub fn toggle_current(&mut self, entries: &[PackageEntry]) {
        let Some(entry) = entries.get(self.cursor) else {
            return;
        };
        if !self.selected.remove(&entry.name) {
            self.selected.insert(entry.name.clone());
        }
    }

    /// Freezes the selected set, or `None` when nothing is selected (the
    /// engine re-prompts rather than resolving an empty set).
    pub fn confirm(&self) -> Option<BTreeSet<String>> {
        if self.selected.is_empty() {
            None
        } else {
            Some(self.selected.clone())
        }
    }

    /// Transitive gems pulled in by the currently selected direct gems.
    /// Purely visual: rows in this set render with the filled marker, but
    /// selection stays per-row.
    pub fn implied_closure(
        &self,
        entries: &[PackageEntry],
        lock: &Lockfile,
    ) -> BTreeSet<String> {
        let mut implied = BTreeSet::new();
        for entry in entries {
            if entry.kind == PackageKind::Direct && self.selected.contains(&entry.name) {
                implied.extend(reachable_from(lock, &entry.name));
            }
        }
        implied
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
