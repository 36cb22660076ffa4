use crate::layer::LayerId;

/// Edge layers currently on the map, in the order they were added.
///
/// Ids come from a counter that only resets once every registered layer has
/// been handed back for removal, so an id is never live twice.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LayerRegistry {
    active: Vec<LayerId>,
    next_index: u64,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and registers the next edge layer id.
    pub fn allocate_edge(&mut self) -> LayerId {
        let id = LayerId::Edge(self.next_index);
        self.next_index += 1;
        self.active.push(id);
        id
    }

    pub fn active(&self) -> &[LayerId] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Empties the registry, returning ids newest first, and restarts
    /// numbering.
    pub fn drain_reverse(&mut self) -> Vec<LayerId> {
        let mut ids = std::mem::take(&mut self.active);
        ids.reverse();
        self.next_index = 0;
        ids
    }
}
