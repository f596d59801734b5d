use crate::position_key::PositionKey;

use regex::Regex;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

/// Everything observed from one position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionAggregate {
    pub videos: BTreeSet<String>,
    pub moves_by_subject: BTreeSet<String>,
    pub moves_by_other: BTreeSet<String>,
}

impl PositionAggregate {
    /// Set union with `other`. Commutative, associative and idempotent.
    pub fn union_with(&mut self, other: PositionAggregate) {
        self.videos.extend(other.videos);
        self.moves_by_subject.extend(other.moves_by_subject);
        self.moves_by_other.extend(other.moves_by_other);
    }
}

/// Observations from a single game, before they reach the shared index.
#[derive(Debug, Default)]
pub struct GamePositions {
    entries: BTreeMap<PositionKey, PositionAggregate>,
}

impl GamePositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `san` was played from `key`, by the subject when
    /// `subject_to_move` is set, while the game was visible at `video`.
    pub fn record(&mut self, key: PositionKey, san: String, subject_to_move: bool, video: String) {
        let entry = self.entries.entry(key).or_default();
        entry.videos.insert(video);
        if subject_to_move {
            entry.moves_by_subject.insert(san);
        } else {
            entry.moves_by_other.insert(san);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&PositionAggregate> {
        self.entries.get(key)
    }
}

impl IntoIterator for GamePositions {
    type Item = (PositionKey, PositionAggregate);
    type IntoIter = btree_map::IntoIter<PositionKey, PositionAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Storage boundary for aggregated positions. Implementations only need a
/// keyed read and a merging write.
pub trait PositionStore {
    fn get(&self, key: &PositionKey) -> Option<PositionAggregate>;

    /// Union `aggregate` into whatever is stored under `key`.
    fn merge_write(&mut self, key: PositionKey, aggregate: PositionAggregate);

    /// Merge a finished game. Only complete games may be merged.
    fn merge_game(&mut self, game: GamePositions) {
        for (key, aggregate) in game {
            self.merge_write(key, aggregate);
        }
    }
}

/// In-memory index from canonical position to aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    entries: BTreeMap<PositionKey, PositionAggregate>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume `game` and return the updated index.
    pub fn merge(mut self, game: GamePositions) -> Self {
        self.merge_game(game);
        self
    }

    /// Drop video references matching `pattern`; returns how many were removed.
    pub fn purge_videos(&mut self, pattern: &Regex) -> usize {
        let mut removed = 0;
        for aggregate in self.entries.values_mut() {
            let before = aggregate.videos.len();
            aggregate.videos.retain(|url| !pattern.is_match(url));
            removed += before - aggregate.videos.len();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PositionKey, PositionAggregate> {
        self.entries.iter()
    }
}

impl PositionStore for PositionIndex {
    fn get(&self, key: &PositionKey) -> Option<PositionAggregate> {
        self.entries.get(key).cloned()
    }

    fn merge_write(&mut self, key: PositionKey, aggregate: PositionAggregate) {
        match self.entries.entry(key) {
            btree_map::Entry::Occupied(mut slot) => slot.get_mut().union_with(aggregate),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(aggregate);
            }
        }
    }
}

impl IntoIterator for PositionIndex {
    type Item = (PositionKey, PositionAggregate);
    type IntoIter = btree_map::IntoIter<PositionKey, PositionAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a PositionIndex {
    type Item = (&'a PositionKey, &'a PositionAggregate);
    type IntoIter = btree_map::Iter<'a, PositionKey, PositionAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
