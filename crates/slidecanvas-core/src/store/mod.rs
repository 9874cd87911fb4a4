//! Shared document and room abstraction.
//!
//! A [`Room`] is one connection to a collaborative canvas. It owns the local
//! participant's presence, exposes the shared layer collection, and keeps an
//! undo history scoped to this connection. All document writes go through
//! [`Room::mutate`], which hands the callback a [`Mutation`] and applies every
//! write it makes as one atomic, history-recorded batch.

pub mod crdt;
pub mod memory;

pub use self::crdt::LoroRoom;
pub use self::memory::{MemoryRoom, MemoryServer};

use crate::layers::{Layer, LayerId};
use crate::presence::{ConnectionId, Other, Presence, PresenceUpdate};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),
    #[error("Index {index} out of bounds for layer order of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Read/write access to the layer collection inside a mutation.
///
/// The collection is two structures kept in bijection: a map from id to
/// layer, and an ordered id list (index 0 is painted first).
pub trait LayerStorage {
    /// Current paint order.
    fn layer_ids(&self) -> Vec<LayerId>;

    /// Append an id to the top of the paint order.
    fn push_layer_id(&mut self, id: LayerId) -> StoreResult<()>;

    /// Move the id at `from` so it ends up at `to`.
    fn move_layer_id(&mut self, from: usize, to: usize) -> StoreResult<()>;

    /// Remove the id at `index` from the paint order.
    fn delete_layer_id(&mut self, index: usize) -> StoreResult<()>;

    fn layer(&self, id: &LayerId) -> Option<Layer>;

    /// Insert or replace a layer.
    fn set_layer(&mut self, id: LayerId, layer: Layer) -> StoreResult<()>;

    /// Remove a layer from the map. Returns whether it existed.
    fn delete_layer(&mut self, id: &LayerId) -> StoreResult<bool>;

    fn layer_count(&self) -> usize;

    fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layer_ids().iter().position(|x| x == id)
    }
}

/// What a mutation callback did besides storage writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MutationOutcome {
    pub presence_changed: bool,
    pub selection_recorded: bool,
}

/// Handle given to [`Room::mutate`] callbacks.
pub struct Mutation<'a> {
    storage: &'a mut dyn LayerStorage,
    me: &'a mut Presence,
    outcome: MutationOutcome,
}

impl<'a> Mutation<'a> {
    pub(crate) fn new(storage: &'a mut dyn LayerStorage, me: &'a mut Presence) -> Self {
        Self {
            storage,
            me,
            outcome: MutationOutcome::default(),
        }
    }

    /// The layer collection.
    pub fn storage(&mut self) -> &mut (dyn LayerStorage + 'a) {
        &mut *self.storage
    }

    /// Local presence as seen inside this mutation.
    pub fn me(&self) -> &Presence {
        self.me
    }

    /// Update local presence as part of this mutation.
    ///
    /// With `add_to_history`, a selection change is undone and redone
    /// together with the mutation's storage writes.
    pub fn update_presence(&mut self, update: PresenceUpdate, add_to_history: bool) {
        if add_to_history && update.touches_selection() {
            self.outcome.selection_recorded = true;
        }
        update.apply_to(self.me);
        self.outcome.presence_changed = true;
    }

    pub(crate) fn outcome(&self) -> MutationOutcome {
        self.outcome
    }
}

/// Notifications a room queues for its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The layer collection changed because of someone else.
    StorageUpdated,
    /// Another participant's presence changed.
    PresenceUpdated(ConnectionId),
    OtherEntered(ConnectionId),
    OtherLeft(ConnectionId),
}

/// Point-in-time copy of the layer collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSnapshot {
    pub layers: HashMap<LayerId, Layer>,
    pub order: Vec<LayerId>,
}

impl LayerSnapshot {
    /// Copy everything readable through `storage`.
    pub fn from_storage(storage: &dyn LayerStorage) -> Self {
        let order = storage.layer_ids();
        let layers = order
            .iter()
            .filter_map(|id| storage.layer(id).map(|layer| (*id, layer)))
            .collect();
        Self { layers, order }
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in paint order, bottom first.
    pub fn ordered(&self) -> impl DoubleEndedIterator<Item = (LayerId, &Layer)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.layers.get(id).map(|layer| (*id, layer)))
    }

    /// Whether the order and the map contain exactly the same ids, each once.
    pub fn is_consistent(&self) -> bool {
        let unique: HashSet<&LayerId> = self.order.iter().collect();
        unique.len() == self.order.len()
            && self.order.len() == self.layers.len()
            && self.order.iter().all(|id| self.layers.contains_key(id))
    }
}

/// Restore the order/map bijection: drop dangling or duplicate ids from
/// `order` and append layers it is missing, sorted by id.
pub(crate) fn reconcile_order(order: &mut Vec<LayerId>, layers: &HashMap<LayerId, Layer>) {
    let mut seen = HashSet::new();
    order.retain(|id| layers.contains_key(id) && seen.insert(*id));

    let mut missing: Vec<LayerId> = layers
        .keys()
        .filter(|id| !seen.contains(*id))
        .copied()
        .collect();
    if !missing.is_empty() {
        log::debug!("reconciling {} layers missing from the order", missing.len());
        missing.sort();
        order.extend(missing);
    }
}

/// One connection to a collaborative canvas.
pub trait Room {
    /// Id the room assigned to this connection.
    fn connection_id(&self) -> ConnectionId;

    /// Run `f` as one atomic document mutation.
    ///
    /// Every write `f` makes is broadcast together and forms a single undo
    /// step, unless history is paused, in which case it joins the open batch.
    fn mutate<R, F>(&mut self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Mutation<'_>) -> StoreResult<R>;

    /// Current layer collection.
    fn snapshot(&self) -> StoreResult<LayerSnapshot>;

    /// Local presence.
    fn presence(&self) -> &Presence;

    /// Update local presence outside of a document mutation.
    fn update_presence(&mut self, update: PresenceUpdate, add_to_history: bool) -> StoreResult<()>;

    /// Every other connected participant.
    fn others(&self) -> StoreResult<Vec<Other>>;

    /// Drain queued notifications.
    fn poll_events(&mut self) -> Vec<RoomEvent>;

    /// Start batching history: writes until [`Room::resume_history`] form one undo step.
    fn pause_history(&mut self);

    /// Close the current batch.
    fn resume_history(&mut self);

    fn undo(&mut self) -> StoreResult<bool>;

    fn redo(&mut self) -> StoreResult<bool>;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerKind, Rgb};
    use crate::geometry::Bounds;
    use uuid::Uuid;

    fn layer() -> Layer {
        Layer::new(LayerKind::Ellipse, Bounds::new(0.0, 0.0, 1.0, 1.0), Rgb::default())
    }

    #[test]
    fn test_snapshot_consistency() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut snapshot = LayerSnapshot::default();
        assert!(snapshot.is_consistent());

        snapshot.layers.insert(a, layer());
        snapshot.order.push(a);
        assert!(snapshot.is_consistent());

        snapshot.order.push(a);
        assert!(!snapshot.is_consistent());

        snapshot.order = vec![b];
        assert!(!snapshot.is_consistent());
    }

    #[test]
    fn test_ordered_follows_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut snapshot = LayerSnapshot::default();
        snapshot.layers.insert(a, layer());
        snapshot.layers.insert(b, layer());
        snapshot.order = vec![b, a];
        let ids: Vec<LayerId> = snapshot.ordered().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::IndexOutOfBounds { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "Index 4 out of bounds for layer order of length 2"
        );
    }
}
