//! Layer model for the annotation canvas.
//!
//! A [`Layer`] is a single drawable shape. Layers live exclusively in the
//! shared document: the map holds the content keyed by [`LayerId`], and the
//! ordered id list decides paint order. The functions at the bottom of this
//! module are the collection-level operations (insert, delete, recolor, edit
//! text) expressed against the [`LayerStorage`] contract so they run inside a
//! single store mutation.

use crate::config::MAX_LAYERS;
use crate::geometry::{pen_points_to_path_layer, Bounds};
use crate::presence::PresenceUpdate;
use crate::store::{LayerStorage, Mutation, StoreResult};
use kurbo::Vec2;
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for layers.
pub type LayerId = Uuid;

/// Fill color used when the host does not seed one.
pub const DEFAULT_FILL: Rgb = Rgb::new(252, 142, 42);

/// Default text for freshly inserted text layers.
pub const DEFAULT_TEXT: &str = "Text";
/// Default font size for freshly inserted text layers.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;
/// Default font family for freshly inserted text layers.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        DEFAULT_FILL
    }
}

impl From<Color> for Rgb {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
        }
    }
}

impl From<Rgb> for Color {
    fn from(color: Rgb) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, 255)
    }
}

/// One freehand sample: canvas position plus stylus pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenPoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl PenPoint {
    pub const fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }
}

/// Variant tag of a layer, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Rectangle,
    Ellipse,
    Path,
    Text,
}

impl LayerType {
    /// Whether this type can be placed with a click in `Inserting` mode.
    /// Paths only come from freehand strokes.
    pub fn is_insertable(self) -> bool {
        !matches!(self, LayerType::Path)
    }
}

/// Variant-specific layer content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Rectangle,
    Ellipse,
    /// Freehand stroke. Points are relative to the layer's top-left corner.
    Path { points: Vec<PenPoint> },
    Text {
        value: String,
        font_size: f64,
        font_family: String,
    },
}

/// A drawable shape stored in the shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(flatten)]
    pub kind: LayerKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Rgb,
}

impl Layer {
    /// Create a layer with the given content and bounds.
    pub fn new(kind: LayerKind, bounds: Bounds, fill: Rgb) -> Self {
        Self {
            kind,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            fill,
        }
    }

    /// Create a click-inserted layer of `size` x `size` with its top-left at `position`.
    /// Returns `None` for types that cannot be click-inserted.
    pub fn with_default_size(
        layer_type: LayerType,
        position: kurbo::Point,
        size: f64,
        fill: Rgb,
    ) -> Option<Self> {
        let kind = match layer_type {
            LayerType::Rectangle => LayerKind::Rectangle,
            LayerType::Ellipse => LayerKind::Ellipse,
            LayerType::Text => LayerKind::Text {
                value: DEFAULT_TEXT.to_string(),
                font_size: DEFAULT_FONT_SIZE,
                font_family: DEFAULT_FONT_FAMILY.to_string(),
            },
            LayerType::Path => return None,
        };
        Some(Self::new(
            kind,
            Bounds::new(position.x, position.y, size, size),
            fill,
        ))
    }

    /// The variant tag of this layer.
    pub fn layer_type(&self) -> LayerType {
        match self.kind {
            LayerKind::Rectangle => LayerType::Rectangle,
            LayerKind::Ellipse => LayerType::Ellipse,
            LayerKind::Path { .. } => LayerType::Path,
            LayerKind::Text { .. } => LayerType::Text,
        }
    }

    /// Axis-aligned bounding box in canvas units.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Replace position and size, keeping content and fill.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.x = bounds.x;
        self.y = bounds.y;
        self.width = bounds.width;
        self.height = bounds.height;
    }

    /// Move the layer by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        self.x += offset.x;
        self.y += offset.y;
    }
}

/// Insert `layer` under a fresh id, appending it to the top of the paint order.
///
/// Returns `Ok(None)` without touching the store when the collection already
/// holds `max_layers` layers. The cap never exceeds [`MAX_LAYERS`].
pub fn insert_layer(
    storage: &mut dyn LayerStorage,
    layer: Layer,
    max_layers: usize,
) -> StoreResult<Option<LayerId>> {
    let max_layers = max_layers.min(MAX_LAYERS);
    if storage.layer_count() >= max_layers {
        log::debug!("layer cap of {max_layers} reached, insert ignored");
        return Ok(None);
    }
    let id = Uuid::new_v4();
    storage.set_layer(id, layer)?;
    storage.push_layer_id(id)?;
    Ok(Some(id))
}

/// Turn the local pencil draft into a path layer.
///
/// The draft is always cleared. A draft with fewer than two samples, or a
/// full collection, inserts nothing and yields `Ok(None)`.
pub fn insert_path(
    mutation: &mut Mutation<'_>,
    fill: Rgb,
    max_layers: usize,
) -> StoreResult<Option<LayerId>> {
    let draft = mutation.me().pencil_draft.clone();
    mutation.update_presence(PresenceUpdate::new().pencil_draft(None), false);

    let Some(layer) = draft.and_then(|points| pen_points_to_path_layer(&points, fill)) else {
        log::debug!("pencil draft too short, no path inserted");
        return Ok(None);
    };
    insert_layer(mutation.storage(), layer, max_layers)
}

/// Remove every listed layer from both the map and the order.
/// Returns how many layers were actually removed.
pub fn delete_layers(storage: &mut dyn LayerStorage, ids: &[LayerId]) -> StoreResult<usize> {
    let mut removed = 0;
    for id in ids {
        if storage.delete_layer(id)? {
            removed += 1;
        }
        if let Some(index) = storage.index_of(id) {
            storage.delete_layer_id(index)?;
        }
    }
    Ok(removed)
}

/// Recolor every listed layer. Missing ids are skipped.
pub fn set_fill(storage: &mut dyn LayerStorage, ids: &[LayerId], fill: Rgb) -> StoreResult<()> {
    for id in ids {
        if let Some(mut layer) = storage.layer(id) {
            layer.fill = fill;
            storage.set_layer(*id, layer)?;
        }
    }
    Ok(())
}

/// Replace the text of a text layer. Returns `false` if `id` is not a text layer.
pub fn update_text(storage: &mut dyn LayerStorage, id: &LayerId, new_value: &str) -> StoreResult<bool> {
    let Some(mut layer) = storage.layer(id) else {
        return Ok(false);
    };
    match &mut layer.kind {
        LayerKind::Text { value, .. } => {
            *value = new_value.to_string();
        }
        _ => return Ok(false),
    }
    storage.set_layer(*id, layer)?;
    Ok(true)
}
