//! Paginated navigation over criteria groups.

use crate::error::NavigationError;
use crate::types::{CriteriaGroup, GroupId};

/// Tracks the group currently displayed.
///
/// Movement is always allowed regardless of how complete a group is.
#[derive(Debug, Clone)]
pub struct CriteriaNavigator {
    groups: Vec<CriteriaGroup>,
    index: usize,
}

impl CriteriaNavigator {
    /// Start on the first group.
    pub fn new(groups: Vec<CriteriaGroup>) -> Self {
        CriteriaNavigator { groups, index: 0 }
    }

    pub fn groups(&self) -> &[CriteriaGroup] {
        &self.groups
    }

    pub fn current(&self) -> Option<&CriteriaGroup> {
        self.groups.get(self.index)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.groups.len()
    }

    /// Completion percentage of the walk through the groups, in `0..=100`.
    ///
    /// `round(100 * (index + 1) / total)`, or 0 when there are no groups.
    pub fn progress(&self) -> u8 {
        if self.groups.is_empty() {
            return 0;
        }
        let ratio = (self.index + 1) as f64 / self.groups.len() as f64;
        (ratio * 100.0).round() as u8
    }

    /// Move back one group. Returns `false` at the first group.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Move forward one group. Returns `false` at the last group.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Jump straight to the group with id `group_id`.
    pub fn go_to(&mut self, group_id: GroupId) -> Result<&CriteriaGroup, NavigationError> {
        let index = self
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or(NavigationError::UnknownGroup { group_id })?;
        self.index = index;
        Ok(&self.groups[index])
    }
}
