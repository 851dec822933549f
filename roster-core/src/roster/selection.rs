use std::collections::BTreeSet;

use tracing::debug;

use super::models::StudentId;

/// Identifiers marked for bulk action.
///
/// The owner keeps this a subset of the roster and of the visible set by
/// calling [`SelectionTracker::purge`] or [`SelectionTracker::retain_visible`]
/// after deletions and filter changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: BTreeSet<StudentId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_all<I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = StudentId>,
    {
        self.selected = visible.into_iter().collect();
        debug!(target: "roster.selection", count = self.selected.len(), "selected all visible");
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn toggle(&mut self, id: StudentId, included: bool) {
        if included {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    pub fn purge<'a, I>(&mut self, removed: I)
    where
        I: IntoIterator<Item = &'a StudentId>,
    {
        for id in removed {
            self.selected.remove(id);
        }
    }

    pub fn retain_visible<I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = StudentId>,
    {
        let visible: BTreeSet<StudentId> = visible.into_iter().collect();
        self.selected.retain(|id| visible.contains(id));
    }

    pub fn is_selected(&self, id: StudentId) -> bool {
        self.selected.contains(&id)
    }

    pub fn all_selected<I>(&self, visible: I) -> bool
    where
        I: IntoIterator<Item = StudentId>,
    {
        let mut any = false;
        for id in visible {
            if !self.selected.contains(&id) {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn ids(&self) -> impl Iterator<Item = StudentId> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
