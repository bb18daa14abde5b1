//! Snap index: a sorted multiset of boundary positions.
//!
//! The index is a cache. Item starts/ends and guide positions are added
//! and removed as the store mutates, and the whole thing can be rebuilt
//! from the entities at any time with the same result.

use std::collections::BTreeMap;

/// Sorted multiset of snap positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapIndex {
    /// Position → number of boundaries sitting on it.
    points: BTreeMap<i64, usize>,
}

impl SnapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `positions`.
    pub fn rebuild(&mut self, positions: impl IntoIterator<Item = i64>) {
        self.points.clear();
        for position in positions {
            self.add(position);
        }
    }

    pub fn add(&mut self, position: i64) {
        *self.points.entry(position).or_insert(0) += 1;
    }

    /// Remove one occurrence of `position`. Returns false if it was absent.
    pub fn remove(&mut self, position: i64) -> bool {
        match self.points.get_mut(&position) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.points.remove(&position);
                true
            }
            None => false,
        }
    }

    /// Number of boundaries at `position`.
    pub fn count(&self, position: i64) -> usize {
        self.points.get(&position).copied().unwrap_or(0)
    }

    /// Total number of boundaries, duplicates included.
    pub fn len(&self) -> usize {
        self.points.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nearest indexed position within `max_distance` of `position`.
    pub fn nearest(&self, position: i64, max_distance: i64) -> Option<i64> {
        self.nearest_excluding(position, max_distance, &[])
    }

    /// Like [`nearest`](Self::nearest), but each entry of `excluded` hides
    /// one occurrence of that position. A point survives only if it has
    /// more occurrences than it has exclusions. Ties prefer the lower position.
    pub fn nearest_excluding(
        &self,
        position: i64,
        max_distance: i64,
        excluded: &[i64],
    ) -> Option<i64> {
        if max_distance < 0 {
            return None;
        }
        let visible = |p: i64, count: usize| {
            count > excluded.iter().filter(|&&e| e == p).count()
        };
        let below = self
            .points
            .range(position.saturating_sub(max_distance)..=position)
            .rev()
            .find(|(&p, &c)| visible(p, c))
            .map(|(&p, _)| p);
        let above = self
            .points
            .range(position..=position.saturating_add(max_distance))
            .find(|(&p, &c)| visible(p, c))
            .map(|(&p, _)| p);

        match (below, above) {
            (Some(b), Some(a)) => Some(if a - position < position - b { a } else { b }),
            (b, a) => b.or(a),
        }
    }
}
