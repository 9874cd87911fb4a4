//! Loro-backed room for networked collaboration.
//!
//! The layer collection lives in a `LoroDoc`: a map of layer maps keyed by
//! id, plus a list holding the paint order. Document sync is byte-level
//! (`export_*` / [`LoroRoom::import`]) and presence travels as JSON
//! [`PresenceMessage`]s, so any relay that forwards opaque payloads works.
//!
//! Undo history is Loro's `UndoManager`, which only tracks local document
//! operations. Selection changes are therefore not restored by undo here.

use super::{
    reconcile_order, LayerSnapshot, LayerStorage, Mutation, Room, RoomEvent, StoreError,
    StoreResult,
};
use crate::layers::{Layer, LayerId, LayerKind, PenPoint, Rgb};
use crate::presence::{ConnectionId, Other, Presence, PresenceMessage, PresenceUpdate};
use loro::{
    Container, ExportMode, LoroDoc, LoroError, LoroList, LoroMap, LoroMapValue, LoroResult, LoroValue,
    UndoManager, ValueOrContainer, VersionVector,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Key for the layers map in the document.
pub const LAYERS_KEY: &str = "layers";
/// Key for the paint-order list in the document.
pub const LAYER_IDS_KEY: &str = "layer_ids";

const MAX_UNDO_STEPS: usize = 100;

// Layer type identifiers
const TYPE_RECTANGLE: &str = "rectangle";
const TYPE_ELLIPSE: &str = "ellipse";
const TYPE_PATH: &str = "path";
const TYPE_TEXT: &str = "text";

const KEY_TYPE: &str = "type";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";
const KEY_FILL_R: &str = "fill_r";
const KEY_FILL_G: &str = "fill_g";
const KEY_FILL_B: &str = "fill_b";
const KEY_POINTS: &str = "points";
const KEY_VALUE: &str = "value";
const KEY_FONT_SIZE: &str = "font_size";
const KEY_FONT_FAMILY: &str = "font_family";

impl From<LoroError> for StoreError {
    fn from(e: LoroError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    match map.get(key)? {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_u8(map: &LoroMapValue, key: &str) -> Option<u8> {
    match map.get(key)? {
        LoroValue::I64(i) => u8::try_from(*i).ok(),
        LoroValue::Double(d) => Some(d.clamp(0.0, 255.0) as u8),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn as_double(value: &LoroValue) -> Option<f64> {
    match value {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

/// Write a layer into an empty Loro map.
fn layer_to_loro(layer: &Layer, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_X, layer.x)?;
    map.insert(KEY_Y, layer.y)?;
    map.insert(KEY_WIDTH, layer.width)?;
    map.insert(KEY_HEIGHT, layer.height)?;
    map.insert(KEY_FILL_R, layer.fill.r as i64)?;
    map.insert(KEY_FILL_G, layer.fill.g as i64)?;
    map.insert(KEY_FILL_B, layer.fill.b as i64)?;

    match &layer.kind {
        LayerKind::Rectangle => {
            map.insert(KEY_TYPE, TYPE_RECTANGLE)?;
        }
        LayerKind::Ellipse => {
            map.insert(KEY_TYPE, TYPE_ELLIPSE)?;
        }
        LayerKind::Path { points } => {
            map.insert(KEY_TYPE, TYPE_PATH)?;
            write_points(map, points)?;
        }
        LayerKind::Text {
            value,
            font_size,
            font_family,
        } => {
            map.insert(KEY_TYPE, TYPE_TEXT)?;
            map.insert(KEY_VALUE, value.clone())?;
            map.insert(KEY_FONT_SIZE, *font_size)?;
            map.insert(KEY_FONT_FAMILY, font_family.clone())?;
        }
    }
    Ok(())
}

/// Replace the point list of a path layer map.
fn write_points(map: &LoroMap, points: &[PenPoint]) -> LoroResult<()> {
    // Stored as a list of [x, y, pressure] lists
    let points_list = map.insert_container(KEY_POINTS, LoroList::new())?;
    for point in points {
        let point_list = points_list.insert_container(points_list.len(), LoroList::new())?;
        point_list.push(point.x)?;
        point_list.push(point.y)?;
        point_list.push(point.pressure)?;
    }
    Ok(())
}

/// Write only the fields where `new` differs from `old`, so concurrent edits
/// to other fields of the same layer survive the merge. Both layers must have
/// the same type.
fn write_changed_fields(old: &Layer, new: &Layer, map: &LoroMap) -> LoroResult<()> {
    let geometry = [
        (KEY_X, old.x, new.x),
        (KEY_Y, old.y, new.y),
        (KEY_WIDTH, old.width, new.width),
        (KEY_HEIGHT, old.height, new.height),
    ];
    for (key, before, after) in geometry {
        if before != after {
            map.insert(key, after)?;
        }
    }

    let fill = [
        (KEY_FILL_R, old.fill.r, new.fill.r),
        (KEY_FILL_G, old.fill.g, new.fill.g),
        (KEY_FILL_B, old.fill.b, new.fill.b),
    ];
    for (key, before, after) in fill {
        if before != after {
            map.insert(key, after as i64)?;
        }
    }

    match (&old.kind, &new.kind) {
        (LayerKind::Path { points: before }, LayerKind::Path { points: after }) => {
            if before != after {
                write_points(map, after)?;
            }
        }
        (
            LayerKind::Text {
                value: old_value,
                font_size: old_size,
                font_family: old_family,
            },
            LayerKind::Text {
                value,
                font_size,
                font_family,
            },
        ) => {
            if old_value != value {
                map.insert(KEY_VALUE, value.clone())?;
            }
            if old_size != font_size {
                map.insert(KEY_FONT_SIZE, *font_size)?;
            }
            if old_family != font_family {
                map.insert(KEY_FONT_FAMILY, font_family.clone())?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Read a layer back from its deep map value.
fn layer_from_loro(map: &LoroMapValue) -> Option<Layer> {
    let kind = match get_string(map, KEY_TYPE)?.as_str() {
        TYPE_RECTANGLE => LayerKind::Rectangle,
        TYPE_ELLIPSE => LayerKind::Ellipse,
        TYPE_PATH => {
            let points = match map.get(KEY_POINTS) {
                Some(LoroValue::List(points_list)) => points_list
                    .iter()
                    .filter_map(|p| match p {
                        LoroValue::List(coords) if coords.len() >= 3 => Some(PenPoint::new(
                            as_double(coords.first()?)?,
                            as_double(coords.get(1)?)?,
                            as_double(coords.get(2)?)?,
                        )),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            LayerKind::Path { points }
        }
        TYPE_TEXT => LayerKind::Text {
            value: get_string(map, KEY_VALUE).unwrap_or_default(),
            font_size: get_double(map, KEY_FONT_SIZE)?,
            font_family: get_string(map, KEY_FONT_FAMILY)?,
        },
        other => {
            log::warn!("unknown layer type in document: {other}");
            return None;
        }
    };

    Some(Layer {
        kind,
        x: get_double(map, KEY_X)?,
        y: get_double(map, KEY_Y)?,
        width: get_double(map, KEY_WIDTH)?,
        height: get_double(map, KEY_HEIGHT)?,
        fill: Rgb::new(
            get_u8(map, KEY_FILL_R)?,
            get_u8(map, KEY_FILL_G)?,
            get_u8(map, KEY_FILL_B)?,
        ),
    })
}

/// Handles to the document containers, used as the mutation storage.
struct LoroTxn {
    layers: LoroMap,
    order: LoroList,
}

impl LoroTxn {
    fn open(doc: &LoroDoc) -> Self {
        Self {
            layers: doc.get_map(LAYERS_KEY),
            order: doc.get_list(LAYER_IDS_KEY),
        }
    }

    fn check_index(&self, index: usize) -> StoreResult<()> {
        let len = self.order.len();
        if index >= len {
            return Err(StoreError::IndexOutOfBounds { index, len });
        }
        Ok(())
    }

    /// Every decodable layer in the map, regardless of the order list.
    fn all_layers(&self) -> HashMap<LayerId, Layer> {
        let LoroValue::Map(map) = self.layers.get_deep_value() else {
            return HashMap::new();
        };
        map.iter()
            .filter_map(|(key, value)| {
                let id = Uuid::parse_str(key).ok()?;
                match value {
                    LoroValue::Map(layer_map) => layer_from_loro(layer_map).map(|l| (id, l)),
                    _ => None,
                }
            })
            .collect()
    }
}

impl LayerStorage for LoroTxn {
    fn layer_ids(&self) -> Vec<LayerId> {
        let mut result = Vec::with_capacity(self.order.len());
        for i in 0..self.order.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(id))) = self.order.get(i) {
                match Uuid::parse_str(&id.to_string()) {
                    Ok(id) => result.push(id),
                    Err(e) => log::warn!("skipping malformed layer id at {i}: {e}"),
                }
            }
        }
        result
    }

    fn push_layer_id(&mut self, id: LayerId) -> StoreResult<()> {
        self.order.push(id.to_string())?;
        Ok(())
    }

    fn move_layer_id(&mut self, from: usize, to: usize) -> StoreResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let Some(ValueOrContainer::Value(value)) = self.order.get(from) else {
            return Err(StoreError::Backend(format!(
                "layer order entry {from} is not a plain value"
            )));
        };
        self.order.delete(from, 1)?;
        self.order.insert(to, value)?;
        Ok(())
    }

    fn delete_layer_id(&mut self, index: usize) -> StoreResult<()> {
        self.check_index(index)?;
        self.order.delete(index, 1)?;
        Ok(())
    }

    fn layer(&self, id: &LayerId) -> Option<Layer> {
        let LoroValue::Map(map) = self.layers.get_deep_value() else {
            return None;
        };
        match map.get(id.to_string().as_str()) {
            Some(LoroValue::Map(layer_map)) => layer_from_loro(layer_map),
            _ => None,
        }
    }

    fn set_layer(&mut self, id: LayerId, layer: Layer) -> StoreResult<()> {
        let key = id.to_string();
        if let Some(ValueOrContainer::Container(Container::Map(layer_map))) = self.layers.get(&key) {
            let current = match layer_map.get_deep_value() {
                LoroValue::Map(value) => layer_from_loro(&value),
                _ => None,
            };
            if let Some(current) = current.filter(|c| c.layer_type() == layer.layer_type()) {
                write_changed_fields(&current, &layer, &layer_map)?;
                return Ok(());
            }
        }

        // New layer, or one whose type changed: write a fresh map
        if self.layers.get(&key).is_some() {
            self.layers.delete(&key)?;
        }
        let layer_map = self.layers.insert_container(&key, LoroMap::new())?;
        layer_to_loro(&layer, &layer_map)?;
        Ok(())
    }

    fn delete_layer(&mut self, id: &LayerId) -> StoreResult<bool> {
        let key = id.to_string();
        if self.layers.get(&key).is_none() {
            return Ok(false);
        }
        self.layers.delete(&key)?;
        Ok(true)
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// A connection whose document is a `LoroDoc` synced through a relay.
pub struct LoroRoom {
    doc: LoroDoc,
    undo_manager: UndoManager,
    connection_id: ConnectionId,
    me: Presence,
    others: BTreeMap<ConnectionId, Presence>,
    events: Vec<RoomEvent>,
    /// Pending outgoing presence messages (JSON strings).
    outgoing: Vec<String>,
}

impl LoroRoom {
    /// Create a room with an empty document.
    pub fn new(connection_id: ConnectionId, initial: Presence) -> Self {
        Self::with_doc(LoroDoc::new(), connection_id, initial)
    }

    /// Create a room from a document snapshot received on join.
    pub fn from_snapshot(
        connection_id: ConnectionId,
        initial: Presence,
        bytes: &[u8],
    ) -> StoreResult<Self> {
        let doc = LoroDoc::new();
        doc.import(bytes)?;
        Ok(Self::with_doc(doc, connection_id, initial))
    }

    fn with_doc(doc: LoroDoc, connection_id: ConnectionId, initial: Presence) -> Self {
        let mut undo_manager = UndoManager::new(&doc);
        undo_manager.set_max_undo_steps(MAX_UNDO_STEPS);
        // Every commit is its own step unless grouped by pause_history
        undo_manager.set_merge_interval(0);

        let mut room = Self {
            doc,
            undo_manager,
            connection_id,
            me: initial,
            others: BTreeMap::new(),
            events: Vec::new(),
            outgoing: Vec::new(),
        };
        room.queue_presence();
        log::info!("connection {connection_id} opened a Loro room");
        room
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    /// Export the document as a snapshot (full state).
    pub fn export_snapshot(&self) -> Vec<u8> {
        self.doc.export(ExportMode::Snapshot).unwrap_or_default()
    }

    /// Export incremental updates since a version.
    pub fn export_updates(&self, since: &VersionVector) -> Vec<u8> {
        self.doc.export(ExportMode::updates(since)).unwrap_or_default()
    }

    /// Get the current version vector.
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    /// Import document bytes from another participant.
    pub fn import(&mut self, bytes: &[u8]) -> StoreResult<()> {
        self.doc.import(bytes)?;
        self.events.push(RoomEvent::StorageUpdated);
        Ok(())
    }

    /// Apply a presence message received from the relay.
    pub fn apply_presence_message(&mut self, json: &str) -> StoreResult<()> {
        match serde_json::from_str::<PresenceMessage>(json)? {
            PresenceMessage::Update {
                connection_id,
                presence,
            } => {
                if connection_id == self.connection_id {
                    return Ok(());
                }
                let event = if self.others.insert(connection_id, presence).is_some() {
                    RoomEvent::PresenceUpdated(connection_id)
                } else {
                    log::info!("connection {connection_id} joined the room");
                    RoomEvent::OtherEntered(connection_id)
                };
                self.events.push(event);
            }
            PresenceMessage::Leave { connection_id } => {
                if self.others.remove(&connection_id).is_some() {
                    log::info!("connection {connection_id} left the room");
                    self.events.push(RoomEvent::OtherLeft(connection_id));
                }
            }
        }
        Ok(())
    }

    /// Take all pending outgoing presence messages.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Queue the message announcing that this connection leaves.
    pub fn leave(&mut self) {
        self.push_message(&PresenceMessage::Leave {
            connection_id: self.connection_id,
        });
    }

    fn queue_presence(&mut self) {
        let message = PresenceMessage::Update {
            connection_id: self.connection_id,
            presence: self.me.clone(),
        };
        self.push_message(&message);
    }

    fn push_message(&mut self, message: &PresenceMessage) {
        match serde_json::to_string(message) {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::warn!("failed to encode presence message: {e}"),
        }
    }
}

impl Room for LoroRoom {
    fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    fn mutate<R, F>(&mut self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Mutation<'_>) -> StoreResult<R>,
    {
        let mut txn = LoroTxn::open(&self.doc);
        let mut me = self.me.clone();
        let (result, outcome) = {
            let mut mutation = Mutation::new(&mut txn, &mut me);
            let result = f(&mut mutation);
            (result, mutation.outcome())
        };
        self.doc.commit();

        match result {
            Ok(value) => {
                if outcome.presence_changed {
                    self.me = me;
                    self.queue_presence();
                }
                Ok(value)
            }
            Err(e) => {
                log::warn!("mutation failed, writes made before the error were kept: {e}");
                Err(e)
            }
        }
    }

    fn snapshot(&self) -> StoreResult<LayerSnapshot> {
        let txn = LoroTxn::open(&self.doc);
        let layers = txn.all_layers();
        let mut order = txn.layer_ids();
        // Concurrent edits and undo can leave the two containers out of step
        reconcile_order(&mut order, &layers);
        Ok(LayerSnapshot { layers, order })
    }

    fn presence(&self) -> &Presence {
        &self.me
    }

    fn update_presence(&mut self, update: PresenceUpdate, _add_to_history: bool) -> StoreResult<()> {
        update.apply_to(&mut self.me);
        self.queue_presence();
        Ok(())
    }

    fn others(&self) -> StoreResult<Vec<Other>> {
        Ok(self
            .others
            .iter()
            .map(|(id, presence)| Other {
                connection_id: *id,
                presence: presence.clone(),
            })
            .collect())
    }

    fn poll_events(&mut self) -> Vec<RoomEvent> {
        std::mem::take(&mut self.events)
    }

    fn pause_history(&mut self) {
        if let Err(e) = self.undo_manager.group_start() {
            log::warn!("failed to start undo group: {e}");
        }
    }

    fn resume_history(&mut self) {
        self.undo_manager.group_end();
    }

    fn undo(&mut self) -> StoreResult<bool> {
        Ok(self.undo_manager.undo()?)
    }

    fn redo(&mut self) -> StoreResult<bool> {
        Ok(self.undo_manager.redo()?)
    }

    fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::layers::{insert_layer, set_fill, update_text};
    use crate::presence::UserProfile;
    use crate::transform::translate_layers;
    use kurbo::Vec2;

    fn path_layer() -> Layer {
        Layer::new(
            LayerKind::Path {
                points: vec![PenPoint::new(0.0, 0.0, 0.5), PenPoint::new(10.0, 4.0, 0.8)],
            },
            Bounds::new(5.0, 6.0, 10.0, 4.0),
            Rgb::new(1, 2, 3),
        )
    }

    fn text_layer() -> Layer {
        Layer::new(
            LayerKind::Text {
                value: "Ring form".to_string(),
                font_size: 16.0,
                font_family: "Inter".to_string(),
            },
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            Rgb::default(),
        )
    }

    #[test]
    fn test_layer_roundtrip_through_document() {
        let mut room = LoroRoom::new(1, Presence::default());
        let path = room.mutate(|m| insert_layer(m.storage(), path_layer(), 100)).unwrap().unwrap();
        let text = room.mutate(|m| insert_layer(m.storage(), text_layer(), 100)).unwrap().unwrap();

        let snapshot = room.snapshot().unwrap();
        assert_eq!(snapshot.order, vec![path, text]);
        assert_eq!(snapshot.get(&path), Some(&path_layer()));
        assert_eq!(snapshot.get(&text), Some(&text_layer()));
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_sync_between_rooms() {
        let mut a = LoroRoom::new(1, Presence::default());
        let id = a.mutate(|m| insert_layer(m.storage(), text_layer(), 100)).unwrap().unwrap();

        let mut b = LoroRoom::from_snapshot(2, Presence::default(), &a.export_snapshot()).unwrap();
        assert_eq!(b.snapshot().unwrap().order, vec![id]);

        let version = b.version();
        a.mutate(|m| set_fill(m.storage(), &[id], Rgb::new(9, 9, 9))).unwrap();
        b.import(&a.export_updates(&version)).unwrap();
        assert_eq!(b.poll_events(), vec![RoomEvent::StorageUpdated]);
        assert_eq!(b.snapshot().unwrap().get(&id).unwrap().fill, Rgb::new(9, 9, 9));
    }

    fn forked_rooms(layer: Layer) -> (LoroRoom, LoroRoom, LayerId) {
        let mut a = LoroRoom::new(1, Presence::default());
        let id = a.mutate(|m| insert_layer(m.storage(), layer, 100)).unwrap().unwrap();
        let b = LoroRoom::from_snapshot(2, Presence::default(), &a.export_snapshot()).unwrap();
        (a, b, id)
    }

    fn exchange(a: &mut LoroRoom, b: &mut LoroRoom, a_since: &VersionVector, b_since: &VersionVector) {
        let from_a = a.export_updates(a_since);
        let from_b = b.export_updates(b_since);
        a.import(&from_b).unwrap();
        b.import(&from_a).unwrap();
    }

    #[test]
    fn test_concurrent_translate_and_fill_both_survive() {
        let (mut a, mut b, id) = forked_rooms(text_layer());
        let (a_since, b_since) = (a.version(), b.version());

        a.mutate(|m| translate_layers(m.storage(), &[id], Vec2::new(5.0, 5.0))).unwrap();
        b.mutate(|m| set_fill(m.storage(), &[id], Rgb::new(9, 9, 9))).unwrap();
        exchange(&mut a, &mut b, &a_since, &b_since);

        for room in [&a, &b] {
            let snapshot = room.snapshot().unwrap();
            let layer = snapshot.get(&id).unwrap();
            assert_eq!((layer.x, layer.y), (5.0, 5.0));
            assert_eq!(layer.fill, Rgb::new(9, 9, 9));
        }
    }

    #[test]
    fn test_concurrent_path_move_keeps_points_and_text_edit() {
        let (mut a, mut b, path) = forked_rooms(path_layer());
        let text = a.mutate(|m| insert_layer(m.storage(), text_layer(), 100)).unwrap().unwrap();
        let catch_up = a.export_updates(&b.version());
        b.import(&catch_up).unwrap();
        let (a_since, b_since) = (a.version(), b.version());

        a.mutate(|m| translate_layers(m.storage(), &[path, text], Vec2::new(1.0, 2.0))).unwrap();
        b.mutate(|m| {
            set_fill(m.storage(), &[path], Rgb::new(4, 5, 6))?;
            update_text(m.storage(), &text, "Schizont")
        })
        .unwrap();
        exchange(&mut a, &mut b, &a_since, &b_since);

        let expected_points = match path_layer().kind {
            LayerKind::Path { points } => points,
            _ => unreachable!(),
        };
        for room in [&a, &b] {
            let snapshot = room.snapshot().unwrap();
            let moved = snapshot.get(&path).unwrap();
            assert_eq!((moved.x, moved.y), (6.0, 8.0));
            assert_eq!(moved.fill, Rgb::new(4, 5, 6));
            assert_eq!(moved.kind, LayerKind::Path { points: expected_points.clone() });
            match &snapshot.get(&text).unwrap().kind {
                LayerKind::Text { value, .. } => assert_eq!(value, "Schizont"),
                other => panic!("expected text, got {other:?}"),
            }
            assert_eq!(snapshot.get(&text).unwrap().x, 1.0);
        }
    }

    #[test]
    fn test_move_layer_id() {
        let mut room = LoroRoom::new(1, Presence::default());
        let a = room.mutate(|m| insert_layer(m.storage(), text_layer(), 100)).unwrap().unwrap();
        let b = room.mutate(|m| insert_layer(m.storage(), path_layer(), 100)).unwrap().unwrap();
        room.mutate(|m| m.storage().move_layer_id(1, 0)).unwrap();
        assert_eq!(room.snapshot().unwrap().order, vec![b, a]);

        let err = room.mutate(|m| m.storage().move_layer_id(2, 0)).unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { index: 2, len: 2 }));
    }

    #[test]
    fn test_undo_and_redo_insert() {
        let mut room = LoroRoom::new(1, Presence::default());
        assert!(!room.can_undo());
        room.mutate(|m| insert_layer(m.storage(), text_layer(), 100)).unwrap();
        assert!(room.can_undo());

        assert!(room.undo().unwrap());
        assert!(room.snapshot().unwrap().is_empty());
        assert!(room.redo().unwrap());
        assert_eq!(room.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_presence_messages() {
        let mut a = LoroRoom::new(1, Presence::for_profile(UserProfile::new("u1", "Ada")));
        let mut b = LoroRoom::new(2, Presence::default());

        for message in a.take_outgoing() {
            b.apply_presence_message(&message).unwrap();
        }
        assert_eq!(b.poll_events(), vec![RoomEvent::OtherEntered(1)]);
        let others = b.others().unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].presence.profile.name, "Ada");

        a.leave();
        for message in a.take_outgoing() {
            b.apply_presence_message(&message).unwrap();
        }
        assert_eq!(b.poll_events(), vec![RoomEvent::OtherLeft(1)]);
        assert!(b.others().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_presence_message() {
        let mut room = LoroRoom::new(1, Presence::default());
        let err = room.apply_presence_message("{not json").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
