//! SlideCanvas Core Library
//!
//! Collaborative vector annotation layer for microscopy slides: shared layer
//! storage with per-participant undo, live presence, and the pointer state
//! machine that drives both.

pub mod camera;
pub mod config;
pub mod detection;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layers;
pub mod presence;
pub mod selection;
pub mod state;
pub mod store;
pub mod surface;
pub mod transform;

pub use camera::Camera;
pub use config::{ConfigError, SurfaceConfig, ToolLock, MAX_LAYERS};
pub use detection::{DetectionError, DetectionModel, ImageDetector};
pub use geometry::{Bounds, Side};
pub use history::HistoryController;
pub use input::{KeyEvent, Modifiers, MouseButton, PointerEvent, Shortcut};
pub use layers::{Layer, LayerId, LayerKind, LayerType, PenPoint, Rgb};
pub use presence::{ConnectionId, Other, Presence, PresenceMessage, PresenceUpdate, UserProfile};
pub use state::{CanvasMachine, CanvasMode, CanvasState, Intent, PointerTarget, Tool};
pub use store::{
    LayerSnapshot, LayerStorage, LoroRoom, MemoryRoom, MemoryServer, Room, RoomEvent, StoreError,
    StoreResult,
};
pub use surface::{CanvasSurface, SurfaceError};
