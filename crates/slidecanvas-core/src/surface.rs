//! The canvas surface: one participant's view of a shared slide.
//!
//! [`CanvasSurface`] owns the local-only pieces (camera, interaction state,
//! gesture batching, last used color) and a [`Room`] that holds everything
//! shared. Host input goes in through the `pointer_*`, `wheel` and `key_down`
//! handlers; the host renders from the query methods after every call and
//! after [`CanvasSurface::poll_events`] reports remote changes. Layers are
//! never cached here, every query reads the room.

use crate::camera::Camera;
use crate::config::{ConfigError, SurfaceConfig};
use crate::detection::{DetectionError, DetectionModel, DetectionResult, ImageDetector};
use crate::geometry::{pointer_to_canvas, resize_bounds, Bounds};
use crate::history::HistoryController;
use crate::input::{KeyEvent, MouseButton, PointerEvent, Shortcut};
use crate::layers::{self, insert_layer, insert_path, Layer, LayerId, PenPoint, Rgb};
use crate::presence::{self, PresenceUpdate, RemoteCursor, RemoteDraft};
use crate::selection::{
    find_intersecting_layers, handle_tolerance_for, hit_test, hit_test_handles, selection_bounds,
};
use crate::state::{CanvasMachine, CanvasMode, CanvasState, Intent, PointerTarget, Tool};
use crate::store::{LayerSnapshot, Room, RoomEvent, StoreError, StoreResult};
use crate::transform::{self, resize_layer, translate_layers};
use kurbo::{Point, Size, Vec2};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while mounting a surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Invalid surface config: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A mounted canvas bound to one room.
pub struct CanvasSurface<R: Room> {
    config: SurfaceConfig,
    room: R,
    camera: Camera,
    machine: CanvasMachine,
    history: HistoryController,
    last_used_color: Rgb,
    /// Image currently shown behind the layers.
    image_url: String,
    /// Last client position of a middle-button drag.
    pan_anchor: Option<Point>,
}

impl<R: Room> CanvasSurface<R> {
    /// Validate `config`, then mount a canvas on a connected room and publish
    /// the initial presence.
    pub fn mount(mut room: R, config: SurfaceConfig) -> Result<Self, SurfaceError> {
        config.validate()?;
        room.update_presence(
            PresenceUpdate::new()
                .profile(config.profile.clone())
                .selection(Vec::new())
                .cursor(None)
                .pencil_draft(None)
                .pen_color(None),
            false,
        )?;
        log::info!(
            "mounted canvas for room {} as connection {}",
            config.room_id,
            room.connection_id()
        );

        let machine = CanvasMachine::new(config.tool_lock, config.drag_threshold);
        let last_used_color = config.initial_color;
        let image_url = config.image_url.clone();
        Ok(Self {
            config,
            room,
            camera: Camera::new(),
            machine,
            history: HistoryController::new(),
            last_used_color,
            image_url,
            pan_anchor: None,
        })
    }

    // --- input ---

    /// Dispatch a pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> StoreResult<()> {
        match event {
            PointerEvent::Down {
                position,
                button,
                pressure,
            } => self.pointer_down(position, button, pressure),
            PointerEvent::Up { position, button } => self.pointer_up(position, button),
            PointerEvent::Move {
                position,
                pressure,
                primary_down,
            } => self.pointer_move(position, pressure, primary_down),
            PointerEvent::Leave => self.pointer_leave(),
            PointerEvent::Scroll { delta } => {
                self.wheel(delta);
                Ok(())
            }
        }
    }

    /// A button went down at client position `client`.
    pub fn pointer_down(&mut self, client: Point, button: MouseButton, pressure: f64) -> StoreResult<()> {
        match button {
            MouseButton::Middle => {
                self.pan_anchor = Some(client);
                let intents = self.machine.cancel();
                self.apply_intents(intents)
            }
            MouseButton::Right => Ok(()),
            MouseButton::Left => {
                if self.config.disabled {
                    log::debug!("pointer down ignored on a view-only canvas");
                    return Ok(());
                }
                let point = pointer_to_canvas(client, &self.camera);
                let target = self.target_at(point)?;
                let intents = self.machine.pointer_down(point, pressure, target);
                self.apply_intents(intents)
            }
        }
    }

    /// The pointer moved to client position `client`.
    pub fn pointer_move(&mut self, client: Point, pressure: f64, primary_down: bool) -> StoreResult<()> {
        if let Some(anchor) = self.pan_anchor {
            self.camera.pan(client - anchor);
            self.pan_anchor = Some(client);
        }
        let point = pointer_to_canvas(client, &self.camera);

        if !self.config.disabled {
            let intents = self.machine.pointer_move(point, pressure, primary_down);
            self.apply_intents(intents)?;
        }

        log::trace!("cursor at ({}, {})", point.x, point.y);
        self.room
            .update_presence(PresenceUpdate::new().cursor(Some(point)), false)
    }

    /// A button was released at client position `client`.
    pub fn pointer_up(&mut self, client: Point, button: MouseButton) -> StoreResult<()> {
        match button {
            MouseButton::Middle => {
                self.pan_anchor = None;
                Ok(())
            }
            MouseButton::Right => Ok(()),
            MouseButton::Left => {
                if self.config.disabled {
                    return Ok(());
                }
                let point = pointer_to_canvas(client, &self.camera);
                let intents = self.machine.pointer_up(point);
                self.apply_intents(intents)
            }
        }
    }

    /// The pointer left the canvas.
    pub fn pointer_leave(&mut self) -> StoreResult<()> {
        self.room
            .update_presence(PresenceUpdate::new().cursor(None), false)
    }

    /// Wheel scroll pans the camera.
    pub fn wheel(&mut self, delta: Vec2) {
        self.camera.scroll(delta);
    }

    /// Handle a key press. Returns whether it matched a shortcut.
    pub fn key_down(&mut self, event: &KeyEvent) -> StoreResult<bool> {
        if self.config.disabled {
            return Ok(false);
        }
        let Some(shortcut) = Shortcut::from_key(event) else {
            return Ok(false);
        };
        match shortcut {
            Shortcut::DeleteSelection => {
                self.delete_selected()?;
            }
            Shortcut::Undo => {
                self.undo()?;
            }
            Shortcut::Redo => {
                self.redo()?;
            }
        }
        Ok(true)
    }

    // --- actions ---

    /// Pick a toolbar tool. Returns whether the tool changed.
    pub fn select_tool(&mut self, tool: Tool) -> bool {
        if self.config.disabled {
            return false;
        }
        self.machine.select_tool(tool)
    }

    /// Abandon the current gesture, keeping writes it already made.
    pub fn cancel_gesture(&mut self) -> StoreResult<()> {
        let intents = self.machine.cancel();
        self.apply_intents(intents)
    }

    /// Recolor the selection and remember the color for new layers and strokes.
    pub fn set_fill(&mut self, color: Rgb) -> StoreResult<()> {
        if self.config.disabled {
            return Ok(());
        }
        self.last_used_color = color;
        if self.room.presence().selection.is_empty() {
            return Ok(());
        }
        self.room.mutate(|m| {
            let ids = m.me().selection.clone();
            layers::set_fill(m.storage(), &ids, color)
        })
    }

    pub fn move_to_front(&mut self) -> StoreResult<()> {
        if self.config.disabled || self.room.presence().selection.is_empty() {
            return Ok(());
        }
        self.room.mutate(|m| {
            let ids = m.me().selection.clone();
            transform::move_to_front(m.storage(), &ids)
        })
    }

    pub fn move_to_back(&mut self) -> StoreResult<()> {
        if self.config.disabled || self.room.presence().selection.is_empty() {
            return Ok(());
        }
        self.room.mutate(|m| {
            let ids = m.me().selection.clone();
            transform::move_to_back(m.storage(), &ids)
        })
    }

    /// Delete every selected layer and clear the selection. Returns how many were removed.
    pub fn delete_selected(&mut self) -> StoreResult<usize> {
        if self.config.disabled || self.room.presence().selection.is_empty() {
            return Ok(0);
        }
        self.room.mutate(|m| {
            let ids = m.me().selection.clone();
            let removed = layers::delete_layers(m.storage(), &ids)?;
            m.update_presence(PresenceUpdate::new().selection(Vec::new()), true);
            Ok(removed)
        })
    }

    /// Replace the text of a text layer.
    pub fn update_text(&mut self, id: LayerId, value: &str) -> StoreResult<bool> {
        if self.config.disabled {
            return Ok(false);
        }
        self.room.mutate(|m| layers::update_text(m.storage(), &id, value))
    }

    pub fn undo(&mut self) -> StoreResult<bool> {
        if self.config.disabled {
            return Ok(false);
        }
        self.history.undo(&mut self.room)
    }

    pub fn redo(&mut self) -> StoreResult<bool> {
        if self.config.disabled {
            return Ok(false);
        }
        self.history.redo(&mut self.room)
    }

    /// Put the canvas origin at the center of the viewport.
    pub fn center_camera(&mut self, viewport: Size) {
        self.camera.center_on(viewport);
    }

    /// Run a detection model on the slide image and show the result.
    pub fn run_detection(
        &mut self,
        detector: &dyn ImageDetector,
        model: DetectionModel,
    ) -> DetectionResult<()> {
        if self.config.disabled {
            return Err(DetectionError::Disabled);
        }
        log::info!("running {} on {}", model.wire_name(), self.config.image_url);
        let processed = detector.detect(&self.config.image_url, model)?;
        log::info!("detection finished, showing {processed}");
        self.image_url = processed;
        Ok(())
    }

    /// Drain notifications about remote changes.
    pub fn poll_events(&mut self) -> Vec<RoomEvent> {
        self.room.poll_events()
    }

    // --- queries ---

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn room(&self) -> &R {
        &self.room
    }

    pub fn room_mut(&mut self) -> &mut R {
        &mut self.room
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> CanvasState {
        self.machine.state()
    }

    pub fn mode(&self) -> CanvasMode {
        self.machine.mode()
    }

    pub fn is_disabled(&self) -> bool {
        self.config.disabled
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn last_used_color(&self) -> Rgb {
        self.last_used_color
    }

    /// Current layers, read fresh from the room.
    pub fn layers(&self) -> StoreResult<LayerSnapshot> {
        self.room.snapshot()
    }

    pub fn selection(&self) -> &[LayerId] {
        &self.room.presence().selection
    }

    /// Bounds of the local selection, used to draw the selection box.
    pub fn selection_bounds(&self) -> StoreResult<Option<Bounds>> {
        let snapshot = self.room.snapshot()?;
        Ok(selection_bounds(&snapshot, self.selection()))
    }

    /// Whether resize handles are shown: exactly one layer selected.
    pub fn shows_resize_handles(&self) -> bool {
        self.selection().len() == 1
    }

    /// Outline color for every layer another participant has selected.
    pub fn selection_colors(&self) -> StoreResult<HashMap<LayerId, &'static str>> {
        Ok(presence::selection_colors(&self.room.others()?))
    }

    pub fn remote_cursors(&self) -> StoreResult<Vec<RemoteCursor>> {
        Ok(presence::remote_cursors(&self.room.others()?))
    }

    pub fn remote_drafts(&self) -> StoreResult<Vec<RemoteDraft>> {
        Ok(presence::remote_drafts(&self.room.others()?))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo(&self.room)
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo(&self.room)
    }

    // --- internals ---

    /// Resolve what the primary button landed on.
    fn target_at(&self, point: Point) -> StoreResult<PointerTarget> {
        let snapshot = self.room.snapshot()?;
        if let [id] = self.selection() {
            if let Some(layer) = snapshot.get(id) {
                let bounds = layer.bounds();
                let tolerance = handle_tolerance_for(&bounds, self.config.handle_tolerance);
                if let Some(side) = hit_test_handles(&bounds, point, tolerance) {
                    return Ok(PointerTarget::ResizeHandle { side, bounds });
                }
            }
        }
        Ok(hit_test(&snapshot, point).map_or(PointerTarget::Canvas, PointerTarget::Layer))
    }

    fn apply_intents(&mut self, intents: Vec<Intent>) -> StoreResult<()> {
        for intent in intents {
            self.apply_intent(intent)?;
        }
        Ok(())
    }

    fn apply_intent(&mut self, intent: Intent) -> StoreResult<()> {
        match intent {
            Intent::BeginGesture => self.history.begin_gesture(&mut self.room),
            Intent::EndGesture => self.history.end_gesture(&mut self.room),
            Intent::SelectLayer(id) => {
                if !self.selection().contains(&id) {
                    self.room
                        .update_presence(PresenceUpdate::new().selection(vec![id]), true)?;
                }
            }
            Intent::ClearSelection => {
                if !self.selection().is_empty() {
                    self.room
                        .update_presence(PresenceUpdate::new().selection(Vec::new()), true)?;
                }
            }
            Intent::SelectWithin { origin, current } => {
                let snapshot = self.room.snapshot()?;
                let ids = find_intersecting_layers(&snapshot, origin, current);
                if ids != self.selection() {
                    self.room
                        .update_presence(PresenceUpdate::new().selection(ids), false)?;
                }
            }
            Intent::Translate { from, to } => {
                let offset = to - from;
                self.room.mutate(|m| {
                    let ids = m.me().selection.clone();
                    translate_layers(m.storage(), &ids, offset)
                })?;
            }
            Intent::Resize {
                initial_bounds,
                corner,
                point,
            } => {
                let bounds = resize_bounds(initial_bounds, corner, point);
                self.room.mutate(|m| match m.me().selection.clone().as_slice() {
                    [id] => resize_layer(m.storage(), id, bounds).map(|_| ()),
                    _ => {
                        log::debug!("resize needs exactly one selected layer");
                        Ok(())
                    }
                })?;
            }
            Intent::Insert {
                layer_type,
                position,
            } => {
                let Some(layer) = Layer::with_default_size(
                    layer_type,
                    position,
                    self.config.default_layer_size,
                    self.last_used_color,
                ) else {
                    return Ok(());
                };
                let max_layers = self.config.max_layers;
                self.room.mutate(|m| {
                    let id = insert_layer(m.storage(), layer, max_layers)?;
                    if let Some(id) = id {
                        m.update_presence(PresenceUpdate::new().selection(vec![id]), true);
                    }
                    Ok(id)
                })?;
            }
            Intent::StartStroke { point, pressure } => {
                self.room.update_presence(
                    PresenceUpdate::new()
                        .pencil_draft(Some(vec![PenPoint::new(point.x, point.y, pressure)]))
                        .pen_color(Some(self.last_used_color)),
                    false,
                )?;
            }
            Intent::ContinueStroke { point, pressure } => {
                let Some(draft) = &self.room.presence().pencil_draft else {
                    return Ok(());
                };
                if let [only] = draft.as_slice() {
                    if only.x == point.x && only.y == point.y {
                        return Ok(());
                    }
                }
                let mut draft = draft.clone();
                draft.push(PenPoint::new(point.x, point.y, pressure));
                log::trace!("pencil draft now {} samples", draft.len());
                self.room
                    .update_presence(PresenceUpdate::new().pencil_draft(Some(draft)), false)?;
            }
            Intent::CommitStroke => {
                let fill = self.last_used_color;
                let max_layers = self.config.max_layers;
                self.room.mutate(|m| insert_path(m, fill, max_layers))?;
            }
            Intent::DiscardStroke => {
                self.room
                    .update_presence(PresenceUpdate::new().pencil_draft(None), false)?;
            }
        }
        Ok(())
    }
}
