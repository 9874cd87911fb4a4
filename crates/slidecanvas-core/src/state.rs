//! Canvas interaction state machine.
//!
//! [`CanvasMachine`] turns pointer input into [`Intent`]s. It never touches
//! the store itself: the surface executes the intents against the room, so
//! the transition table can be exercised without any backend.

use crate::config::ToolLock;
use crate::geometry::{Bounds, Side};
use crate::layers::{LayerId, LayerType};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Interaction state of the local participant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CanvasState {
    #[default]
    None,
    /// Primary button down on empty canvas, not yet dragged.
    Pressing { origin: Point },
    SelectionNet { origin: Point, current: Point },
    Translating { current: Point },
    Resizing { initial_bounds: Bounds, corner: Side },
    /// Waiting for a click to place a layer.
    Inserting { layer_type: LayerType },
    Pencil,
}

/// Mode tag of a [`CanvasState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasMode {
    None,
    Pressing,
    SelectionNet,
    Translating,
    Resizing,
    Inserting,
    Pencil,
}

impl CanvasState {
    pub fn mode(&self) -> CanvasMode {
        match self {
            CanvasState::None => CanvasMode::None,
            CanvasState::Pressing { .. } => CanvasMode::Pressing,
            CanvasState::SelectionNet { .. } => CanvasMode::SelectionNet,
            CanvasState::Translating { .. } => CanvasMode::Translating,
            CanvasState::Resizing { .. } => CanvasMode::Resizing,
            CanvasState::Inserting { .. } => CanvasMode::Inserting,
            CanvasState::Pencil => CanvasMode::Pencil,
        }
    }
}

/// Toolbar choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Select,
    Pencil,
    Insert(LayerType),
}

/// What the primary button went down on, resolved by the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    Canvas,
    Layer(LayerId),
    /// A resize handle of the single selected layer.
    ResizeHandle { side: Side, bounds: Bounds },
}

/// Store-facing effect of a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Open a history batch.
    BeginGesture,
    /// Close the history batch, if any.
    EndGesture,
    /// Select exactly this layer, unless it is already selected.
    SelectLayer(LayerId),
    ClearSelection,
    /// Replace the selection with every layer overlapping the net.
    SelectWithin { origin: Point, current: Point },
    /// Move the selection by `to - from`.
    Translate { from: Point, to: Point },
    Resize {
        initial_bounds: Bounds,
        corner: Side,
        point: Point,
    },
    Insert { layer_type: LayerType, position: Point },
    StartStroke { point: Point, pressure: f64 },
    ContinueStroke { point: Point, pressure: f64 },
    CommitStroke,
    DiscardStroke,
}

/// The pointer-driven state machine.
#[derive(Debug, Clone)]
pub struct CanvasMachine {
    state: CanvasState,
    tool_lock: ToolLock,
    drag_threshold: f64,
    /// A pencil stroke is in progress.
    stroking: bool,
}

impl CanvasMachine {
    pub fn new(tool_lock: ToolLock, drag_threshold: f64) -> Self {
        Self {
            state: CanvasState::None,
            tool_lock,
            drag_threshold,
            stroking: false,
        }
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn mode(&self) -> CanvasMode {
        self.state.mode()
    }

    /// Whether a pointer gesture is underway.
    pub fn in_gesture(&self) -> bool {
        self.stroking
            || matches!(
                self.state,
                CanvasState::Pressing { .. }
                    | CanvasState::SelectionNet { .. }
                    | CanvasState::Translating { .. }
                    | CanvasState::Resizing { .. }
            )
    }

    fn transition(&mut self, next: CanvasState) {
        if self.state.mode() != next.mode() {
            log::debug!("canvas mode {:?} -> {:?}", self.state.mode(), next.mode());
        }
        self.state = next;
    }

    /// Pick a tool. Ignored while a gesture is underway.
    pub fn select_tool(&mut self, tool: Tool) -> bool {
        if self.in_gesture() {
            log::debug!("tool change to {tool:?} ignored during a gesture");
            return false;
        }
        let next = match tool {
            Tool::Select => CanvasState::None,
            Tool::Pencil => CanvasState::Pencil,
            Tool::Insert(layer_type) if layer_type.is_insertable() => {
                CanvasState::Inserting { layer_type }
            }
            Tool::Insert(layer_type) => {
                log::debug!("{layer_type:?} layers cannot be click-inserted");
                return false;
            }
        };
        self.transition(next);
        true
    }

    /// Primary button pressed at canvas point `point`.
    pub fn pointer_down(&mut self, point: Point, pressure: f64, target: PointerTarget) -> Vec<Intent> {
        match (self.state, target) {
            (CanvasState::Inserting { .. }, _) => Vec::new(),
            (CanvasState::Pencil, _) => {
                self.stroking = true;
                vec![Intent::StartStroke { point, pressure }]
            }
            (_, PointerTarget::ResizeHandle { side, bounds }) => {
                self.transition(CanvasState::Resizing {
                    initial_bounds: bounds,
                    corner: side,
                });
                vec![Intent::BeginGesture]
            }
            (_, PointerTarget::Layer(id)) => {
                self.transition(CanvasState::Translating { current: point });
                vec![Intent::BeginGesture, Intent::SelectLayer(id)]
            }
            (_, PointerTarget::Canvas) => {
                self.transition(CanvasState::Pressing { origin: point });
                Vec::new()
            }
        }
    }

    /// Pointer moved to canvas point `point`.
    pub fn pointer_move(&mut self, point: Point, pressure: f64, primary_down: bool) -> Vec<Intent> {
        match self.state {
            CanvasState::Pressing { origin } => {
                let distance = (point.x - origin.x).abs() + (point.y - origin.y).abs();
                if distance > self.drag_threshold {
                    self.transition(CanvasState::SelectionNet {
                        origin,
                        current: point,
                    });
                    vec![Intent::SelectWithin {
                        origin,
                        current: point,
                    }]
                } else {
                    Vec::new()
                }
            }
            CanvasState::SelectionNet { origin, .. } => {
                self.state = CanvasState::SelectionNet {
                    origin,
                    current: point,
                };
                vec![Intent::SelectWithin {
                    origin,
                    current: point,
                }]
            }
            CanvasState::Translating { current } => {
                self.state = CanvasState::Translating { current: point };
                vec![Intent::Translate {
                    from: current,
                    to: point,
                }]
            }
            CanvasState::Resizing {
                initial_bounds,
                corner,
            } => vec![Intent::Resize {
                initial_bounds,
                corner,
                point,
            }],
            CanvasState::Pencil if self.stroking && primary_down => {
                vec![Intent::ContinueStroke { point, pressure }]
            }
            _ => Vec::new(),
        }
    }

    /// Primary button released at canvas point `point`.
    pub fn pointer_up(&mut self, point: Point) -> Vec<Intent> {
        let mut intents = match self.state {
            CanvasState::None | CanvasState::Pressing { .. } => {
                self.transition(CanvasState::None);
                vec![Intent::ClearSelection]
            }
            CanvasState::Pencil => {
                let committed = std::mem::take(&mut self.stroking);
                if self.tool_lock == ToolLock::Single && committed {
                    self.transition(CanvasState::None);
                }
                if committed {
                    vec![Intent::CommitStroke]
                } else {
                    Vec::new()
                }
            }
            CanvasState::Inserting { layer_type } => {
                self.transition(CanvasState::None);
                vec![Intent::Insert {
                    layer_type,
                    position: point,
                }]
            }
            CanvasState::SelectionNet { .. }
            | CanvasState::Translating { .. }
            | CanvasState::Resizing { .. } => {
                self.transition(CanvasState::None);
                Vec::new()
            }
        };
        intents.push(Intent::EndGesture);
        intents
    }

    /// Abandon the current gesture. Writes already applied are kept.
    pub fn cancel(&mut self) -> Vec<Intent> {
        let mut intents = Vec::new();
        if std::mem::take(&mut self.stroking) {
            intents.push(Intent::DiscardStroke);
        }
        self.transition(CanvasState::None);
        intents.push(Intent::EndGesture);
        intents
    }
}
