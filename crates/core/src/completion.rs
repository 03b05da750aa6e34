//! Per-group completion flags.
//!
//! A group is complete for a responder when every one of its items has a
//! valid answer in that responder's store. Groups without items count as
//! complete. Incompleteness never blocks navigation, it only drives the
//! warning shown on the group tab.

use std::collections::BTreeMap;

use crate::store::ResponseStore;
use crate::types::{CriteriaItem, GroupId};
use crate::validate::is_answered;

/// Whether every item in `items` is validly answered in `store`.
pub fn group_complete(items: &[CriteriaItem], store: &ResponseStore) -> bool {
    items
        .iter()
        .all(|item| is_answered(store.get(item.id), item.item_type))
}

/// Items of the group that still lack a valid answer.
pub fn missing_items<'a>(
    items: &'a [CriteriaItem],
    store: &ResponseStore,
) -> Vec<&'a CriteriaItem> {
    items
        .iter()
        .filter(|item| !is_answered(store.get(item.id), item.item_type))
        .collect()
}

/// Cached completion flag per group.
///
/// Groups whose items were never loaded have no entry and are reported as
/// unknown (`None`).
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    flags: BTreeMap<GroupId, bool>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute and cache the flag for `group_id`. Returns the new flag.
    pub fn refresh(
        &mut self,
        group_id: GroupId,
        items: &[CriteriaItem],
        store: &ResponseStore,
    ) -> bool {
        let complete = group_complete(items, store);
        self.flags.insert(group_id, complete);
        complete
    }

    pub fn is_complete(&self, group_id: GroupId) -> Option<bool> {
        self.flags.get(&group_id).copied()
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }
}
