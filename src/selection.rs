//! Ordered set of indicators chosen for comparison.

use crate::models::IndicatorId;
use serde::{Deserialize, Serialize};

/// Minimum number of indicators a comparative analysis needs.
pub const MIN_INDICATORS_FOR_ANALYSIS: usize = 2;

/// Caller-owned, insertion-ordered set of indicator ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: Vec<IndicatorId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `id` if present, otherwise appends it.
    pub fn toggle(&mut self, id: IndicatorId) {
        match self.position(&id) {
            Some(index) => {
                self.ids.remove(index);
            }
            None => self.ids.push(id),
        }
    }

    /// Adds every id in `visible` that is not selected yet, in `visible` order.
    pub fn select_all_visible<I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = IndicatorId>,
    {
        for id in visible {
            if !self.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// A comparison needs at least two indicators.
    pub fn can_analyze(&self) -> bool {
        self.ids.len() >= MIN_INDICATORS_FOR_ANALYSIS
    }

    pub fn contains(&self, id: &IndicatorId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[IndicatorId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorId> {
        self.ids.iter()
    }

    fn position(&self, id: &IndicatorId) -> Option<usize> {
        self.ids.iter().position(|member| member == id)
    }
}

impl FromIterator<IndicatorId> for SelectionSet {
    /// Builds a selection by toggling each id in turn.
    fn from_iter<I: IntoIterator<Item = IndicatorId>>(iter: I) -> Self {
        let mut selection = SelectionSet::new();
        for id in iter {
            selection.toggle(id);
        }
        selection
    }
}
