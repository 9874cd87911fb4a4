//! In-process room backend.
//!
//! A [`MemoryServer`] plays the relay: every [`MemoryRoom`] connected to it
//! sees the same layer collection and the presence of every other room.
//! Used for tests and single-process embedding.

use super::{
    reconcile_order, LayerSnapshot, LayerStorage, Mutation, Room, RoomEvent, StoreError,
    StoreResult,
};
use crate::layers::{Layer, LayerId};
use crate::presence::{ConnectionId, Other, Presence, PresenceUpdate};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maximum number of undo steps kept per connection.
const MAX_UNDO_HISTORY: usize = 100;

fn lock_error<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Lock(e.to_string())
}

#[derive(Default)]
struct Hub {
    layers: HashMap<LayerId, Layer>,
    order: Vec<LayerId>,
    presences: HashMap<ConnectionId, Presence>,
    queues: HashMap<ConnectionId, Vec<RoomEvent>>,
    next_connection: ConnectionId,
}

impl Hub {
    fn broadcast(&mut self, from: ConnectionId, event: RoomEvent) {
        for (id, queue) in self.queues.iter_mut() {
            if *id != from {
                queue.push(event.clone());
            }
        }
    }

    fn reconcile_order(&mut self) {
        reconcile_order(&mut self.order, &self.layers);
    }
}

/// Shared in-memory document that rooms connect to.
#[derive(Clone, Default)]
pub struct MemoryServer {
    hub: Arc<RwLock<Hub>>,
}

impl MemoryServer {
    /// Create a new empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the room with an initial presence.
    pub fn connect(&self, initial: Presence) -> StoreResult<MemoryRoom> {
        let mut hub = self.hub.write().map_err(lock_error)?;
        let connection_id = hub.next_connection;
        hub.next_connection += 1;
        hub.presences.insert(connection_id, initial.clone());
        hub.queues.insert(connection_id, Vec::new());
        hub.broadcast(connection_id, RoomEvent::OtherEntered(connection_id));
        log::info!("connection {connection_id} joined the room");

        Ok(MemoryRoom {
            hub: Arc::clone(&self.hub),
            connection_id,
            me: initial,
            history: History::default(),
        })
    }

    /// Current layer collection.
    pub fn snapshot(&self) -> StoreResult<LayerSnapshot> {
        let hub = self.hub.read().map_err(lock_error)?;
        Ok(LayerSnapshot {
            layers: hub.layers.clone(),
            order: hub.order.clone(),
        })
    }

    /// Number of connected rooms.
    pub fn connection_count(&self) -> usize {
        self.hub.read().map(|hub| hub.presences.len()).unwrap_or(0)
    }
}

/// Before/after values of everything one history step touched.
#[derive(Debug, Clone, Default, PartialEq)]
struct Delta {
    layers: HashMap<LayerId, (Option<Layer>, Option<Layer>)>,
    order: Option<(Vec<LayerId>, Vec<LayerId>)>,
    selection: Option<(Vec<LayerId>, Vec<LayerId>)>,
}

impl Delta {
    fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.order.is_none() && self.selection.is_none()
    }

    fn touches_storage(&self) -> bool {
        !self.layers.is_empty() || self.order.is_some()
    }

    /// Fold a later delta into this one, keeping the earliest before and the latest after.
    fn merge(&mut self, later: Delta) {
        for (id, (before, after)) in later.layers {
            match self.layers.get_mut(&id) {
                Some(entry) => entry.1 = after,
                None => {
                    self.layers.insert(id, (before, after));
                }
            }
        }
        merge_pair(&mut self.order, later.order);
        merge_pair(&mut self.selection, later.selection);
    }
}

fn merge_pair<T>(current: &mut Option<(T, T)>, later: Option<(T, T)>) {
    let Some((before, after)) = later else {
        return;
    };
    match current {
        Some((_, current_after)) => *current_after = after,
        None => *current = Some((before, after)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// Per-connection undo/redo stacks with pause batching.
#[derive(Debug, Default)]
struct History {
    undo: Vec<Delta>,
    redo: Vec<Delta>,
    paused: Option<Delta>,
}

impl History {
    fn record(&mut self, delta: Delta) {
        if delta.is_empty() {
            return;
        }
        self.redo.clear();
        match &mut self.paused {
            Some(pending) => pending.merge(delta),
            None => self.push(delta),
        }
    }

    fn push(&mut self, delta: Delta) {
        self.undo.push(delta);
        if self.undo.len() > MAX_UNDO_HISTORY {
            self.undo.remove(0);
        }
    }

    fn pause(&mut self) {
        if self.paused.is_none() {
            self.paused = Some(Delta::default());
        }
    }

    fn resume(&mut self) {
        if let Some(pending) = self.paused.take() {
            if !pending.is_empty() {
                self.push(pending);
            }
        }
    }
}

/// Transaction buffer: writes land here and reach the hub only on success.
struct MemoryTxn {
    layers: HashMap<LayerId, Layer>,
    order: Vec<LayerId>,
    touched: HashMap<LayerId, Option<Layer>>,
    order_before: Option<Vec<LayerId>>,
}

impl MemoryTxn {
    fn new(hub: &Hub) -> Self {
        Self {
            layers: hub.layers.clone(),
            order: hub.order.clone(),
            touched: HashMap::new(),
            order_before: None,
        }
    }

    fn touch_layer(&mut self, id: LayerId) {
        if !self.touched.contains_key(&id) {
            self.touched.insert(id, self.layers.get(&id).cloned());
        }
    }

    fn touch_order(&mut self) {
        if self.order_before.is_none() {
            self.order_before = Some(self.order.clone());
        }
    }

    fn check_index(&self, index: usize) -> StoreResult<()> {
        if index >= self.order.len() {
            return Err(StoreError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            });
        }
        Ok(())
    }

    /// Write the buffered state into the hub and return what changed.
    fn commit(self, hub: &mut Hub) -> Delta {
        let mut delta = Delta::default();
        for (id, before) in self.touched {
            let after = self.layers.get(&id).cloned();
            if before != after {
                delta.layers.insert(id, (before, after));
            }
        }
        if let Some(before) = self.order_before {
            if before != self.order {
                delta.order = Some((before, self.order.clone()));
            }
        }
        if delta.touches_storage() {
            hub.layers = self.layers;
            hub.order = self.order;
        }
        delta
    }
}

impl LayerStorage for MemoryTxn {
    fn layer_ids(&self) -> Vec<LayerId> {
        self.order.clone()
    }

    fn push_layer_id(&mut self, id: LayerId) -> StoreResult<()> {
        self.touch_order();
        self.order.push(id);
        Ok(())
    }

    fn move_layer_id(&mut self, from: usize, to: usize) -> StoreResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        self.touch_order();
        let id = self.order.remove(from);
        self.order.insert(to, id);
        Ok(())
    }

    fn delete_layer_id(&mut self, index: usize) -> StoreResult<()> {
        self.check_index(index)?;
        self.touch_order();
        self.order.remove(index);
        Ok(())
    }

    fn layer(&self, id: &LayerId) -> Option<Layer> {
        self.layers.get(id).cloned()
    }

    fn set_layer(&mut self, id: LayerId, layer: Layer) -> StoreResult<()> {
        self.touch_layer(id);
        self.layers.insert(id, layer);
        Ok(())
    }

    fn delete_layer(&mut self, id: &LayerId) -> StoreResult<bool> {
        self.touch_layer(*id);
        Ok(self.layers.remove(id).is_some())
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// One connection to a [`MemoryServer`].
pub struct MemoryRoom {
    hub: Arc<RwLock<Hub>>,
    connection_id: ConnectionId,
    me: Presence,
    history: History,
}

impl MemoryRoom {
    /// Number of steps currently on the undo stack, not counting an open batch.
    pub fn undo_depth(&self) -> usize {
        self.history.undo.len()
    }

    fn publish_presence(&self, hub: &mut Hub) {
        hub.presences.insert(self.connection_id, self.me.clone());
        hub.broadcast(
            self.connection_id,
            RoomEvent::PresenceUpdated(self.connection_id),
        );
    }

    fn apply(&mut self, delta: &Delta, direction: Direction) -> StoreResult<()> {
        let pick = |pair: &(Vec<LayerId>, Vec<LayerId>)| match direction {
            Direction::Undo => pair.0.clone(),
            Direction::Redo => pair.1.clone(),
        };

        let mut hub = self.hub.write().map_err(lock_error)?;
        for (id, (before, after)) in &delta.layers {
            let target = match direction {
                Direction::Undo => before,
                Direction::Redo => after,
            };
            match target {
                Some(layer) => {
                    hub.layers.insert(*id, layer.clone());
                }
                None => {
                    hub.layers.remove(id);
                }
            }
        }
        if let Some(order) = &delta.order {
            hub.order = pick(order);
        }
        if delta.touches_storage() {
            // Other connections may have edited since this step was recorded.
            hub.reconcile_order();
            hub.broadcast(self.connection_id, RoomEvent::StorageUpdated);
        }
        if let Some(selection) = &delta.selection {
            self.me.selection = pick(selection);
            hub.presences.insert(self.connection_id, self.me.clone());
            hub.broadcast(
                self.connection_id,
                RoomEvent::PresenceUpdated(self.connection_id),
            );
        }
        Ok(())
    }
}

impl Room for MemoryRoom {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn mutate<R, F>(&mut self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Mutation<'_>) -> StoreResult<R>,
    {
        let mut hub = self.hub.write().map_err(lock_error)?;
        let mut txn = MemoryTxn::new(&hub);
        let mut me = self.me.clone();

        let (result, outcome) = {
            let mut mutation = Mutation::new(&mut txn, &mut me);
            let result = f(&mut mutation);
            (result, mutation.outcome())
        };
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                log::debug!("mutation aborted, nothing applied: {e}");
                return Err(e);
            }
        };

        let mut delta = txn.commit(&mut hub);
        if delta.touches_storage() {
            hub.broadcast(self.connection_id, RoomEvent::StorageUpdated);
        }
        if outcome.selection_recorded && me.selection != self.me.selection {
            delta.selection = Some((self.me.selection.clone(), me.selection.clone()));
        }
        if outcome.presence_changed {
            self.me = me;
            self.publish_presence(&mut hub);
        }
        drop(hub);

        self.history.record(delta);
        Ok(value)
    }

    fn snapshot(&self) -> StoreResult<LayerSnapshot> {
        let hub = self.hub.read().map_err(lock_error)?;
        Ok(LayerSnapshot {
            layers: hub.layers.clone(),
            order: hub.order.clone(),
        })
    }

    fn presence(&self) -> &Presence {
        &self.me
    }

    fn update_presence(&mut self, update: PresenceUpdate, add_to_history: bool) -> StoreResult<()> {
        let records = add_to_history && update.touches_selection();
        let selection_before = self.me.selection.clone();
        update.apply_to(&mut self.me);

        let mut hub = self.hub.write().map_err(lock_error)?;
        self.publish_presence(&mut hub);
        drop(hub);

        if records && selection_before != self.me.selection {
            self.history.record(Delta {
                selection: Some((selection_before, self.me.selection.clone())),
                ..Delta::default()
            });
        }
        Ok(())
    }

    fn others(&self) -> StoreResult<Vec<Other>> {
        let hub = self.hub.read().map_err(lock_error)?;
        let mut others: Vec<Other> = hub
            .presences
            .iter()
            .filter(|(id, _)| **id != self.connection_id)
            .map(|(id, presence)| Other {
                connection_id: *id,
                presence: presence.clone(),
            })
            .collect();
        others.sort_by_key(|other| other.connection_id);
        Ok(others)
    }

    fn poll_events(&mut self) -> Vec<RoomEvent> {
        match self.hub.write() {
            Ok(mut hub) => hub
                .queues
                .get_mut(&self.connection_id)
                .map(std::mem::take)
                .unwrap_or_default(),
            Err(e) => {
                log::warn!("failed to poll room events: {e}");
                Vec::new()
            }
        }
    }

    fn pause_history(&mut self) {
        self.history.pause();
    }

    fn resume_history(&mut self) {
        self.history.resume();
    }

    fn undo(&mut self) -> StoreResult<bool> {
        self.history.resume();
        let Some(delta) = self.history.undo.pop() else {
            return Ok(false);
        };
        self.apply(&delta, Direction::Undo)?;
        self.history.redo.push(delta);
        Ok(true)
    }

    fn redo(&mut self) -> StoreResult<bool> {
        self.history.resume();
        let Some(delta) = self.history.redo.pop() else {
            return Ok(false);
        };
        self.apply(&delta, Direction::Redo)?;
        self.history.push(delta);
        Ok(true)
    }

    fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
            || self.history.paused.as_ref().is_some_and(|p| !p.is_empty())
    }

    fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }
}

impl Drop for MemoryRoom {
    fn drop(&mut self) {
        match self.hub.write() {
            Ok(mut hub) => {
                hub.presences.remove(&self.connection_id);
                hub.queues.remove(&self.connection_id);
                hub.broadcast(self.connection_id, RoomEvent::OtherLeft(self.connection_id));
                log::info!("connection {} left the room", self.connection_id);
            }
            Err(e) => log::warn!("connection {} left with a poisoned hub: {e}", self.connection_id),
        }
    }
}
