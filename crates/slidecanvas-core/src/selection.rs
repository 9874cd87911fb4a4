//! Hit testing, selection-net queries, and resize handles.

use crate::geometry::{union_bounds, Bounds, Side};
use crate::layers::{Layer, LayerId};
use crate::store::LayerSnapshot;
use kurbo::Point;

/// A resize handle with its position and the side it drags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub side: Side,
}

impl Handle {
    pub fn new(position: Point, side: Side) -> Self {
        Self { position, side }
    }

    /// Check if a point (in canvas coordinates) hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// The eight resize handles around `bounds`, corners and edge midpoints.
pub fn resize_handles(bounds: &Bounds) -> Vec<Handle> {
    Side::ALL
        .iter()
        .map(|side| Handle::new(side.handle_position(bounds), *side))
        .collect()
}

/// Pick radius for the handles of `bounds`.
///
/// Shrinks below `tolerance` on small layers so the center of the layer stays
/// farther than the radius from every handle.
pub fn handle_tolerance_for(bounds: &Bounds, tolerance: f64) -> f64 {
    let shortest = bounds.width.abs().min(bounds.height.abs());
    tolerance.min(shortest / 4.0)
}

/// The handle under `point`, if any. Corners win over edges when both are in range.
pub fn hit_test_handles(bounds: &Bounds, point: Point, tolerance: f64) -> Option<Side> {
    let handles = resize_handles(bounds);
    handles
        .iter()
        .filter(|h| h.side.is_corner())
        .chain(handles.iter().filter(|h| !h.side.is_corner()))
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.side)
}

/// Whether `point` falls inside the layer's bounding box. Every kind, ellipses
/// and paths included, is picked by its box.
pub fn layer_contains(layer: &Layer, point: Point) -> bool {
    layer.bounds().contains(point)
}

/// Topmost layer under `point`.
pub fn hit_test(snapshot: &LayerSnapshot, point: Point) -> Option<LayerId> {
    snapshot
        .ordered()
        .rev()
        .find(|(_, layer)| layer_contains(layer, point))
        .map(|(id, _)| id)
}

/// Layers whose bounds overlap the rectangle spanned by two corners, in paint order.
pub fn find_intersecting_layers(snapshot: &LayerSnapshot, a: Point, b: Point) -> Vec<LayerId> {
    let net = Bounds::from_corners(a, b);
    snapshot
        .ordered()
        .filter(|(_, layer)| net.intersects(&layer.bounds()))
        .map(|(id, _)| id)
        .collect()
}

/// Union of the bounds of every selected layer still present.
pub fn selection_bounds(snapshot: &LayerSnapshot, selection: &[LayerId]) -> Option<Bounds> {
    union_bounds(
        selection
            .iter()
            .filter_map(|id| snapshot.get(id))
            .map(Layer::bounds),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerKind, Rgb};
    use uuid::Uuid;

    fn snapshot_with(layers: Vec<Layer>) -> (LayerSnapshot, Vec<LayerId>) {
        let mut snapshot = LayerSnapshot::default();
        let mut ids = Vec::new();
        for layer in layers {
            let id = Uuid::new_v4();
            snapshot.layers.insert(id, layer);
            snapshot.order.push(id);
            ids.push(id);
        }
        (snapshot, ids)
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Layer {
        Layer::new(LayerKind::Rectangle, Bounds::new(x, y, w, h), Rgb::default())
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let (snapshot, ids) = snapshot_with(vec![rect(0.0, 0.0, 100.0, 100.0), rect(50.0, 50.0, 100.0, 100.0)]);
        assert_eq!(hit_test(&snapshot, Point::new(75.0, 75.0)), Some(ids[1]));
        assert_eq!(hit_test(&snapshot, Point::new(10.0, 10.0)), Some(ids[0]));
        assert_eq!(hit_test(&snapshot, Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_ellipse_picked_by_box() {
        let ellipse = Layer::new(LayerKind::Ellipse, Bounds::new(0.0, 0.0, 100.0, 100.0), Rgb::default());
        assert!(layer_contains(&ellipse, Point::new(50.0, 50.0)));
        assert!(layer_contains(&ellipse, Point::new(2.0, 2.0)));
        assert!(!layer_contains(&ellipse, Point::new(101.0, 2.0)));
    }

    #[test]
    fn test_selection_net_membership() {
        let (snapshot, ids) = snapshot_with(vec![
            rect(10.0, 10.0, 20.0, 20.0),
            rect(500.0, 500.0, 20.0, 20.0),
            rect(90.0, 90.0, 50.0, 50.0),
        ]);
        // Dragged from bottom-right to top-left
        let hits = find_intersecting_layers(&snapshot, Point::new(100.0, 100.0), Point::new(0.0, 0.0));
        assert_eq!(hits, vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_selection_bounds_skips_missing() {
        let (snapshot, ids) = snapshot_with(vec![rect(0.0, 0.0, 10.0, 10.0), rect(20.0, 20.0, 10.0, 10.0)]);
        let missing = Uuid::new_v4();
        assert_eq!(
            selection_bounds(&snapshot, &[ids[0], missing, ids[1]]),
            Some(Bounds::new(0.0, 0.0, 30.0, 30.0))
        );
        assert_eq!(selection_bounds(&snapshot, &[missing]), None);
        assert_eq!(selection_bounds(&snapshot, &[]), None);
    }

    #[test]
    fn test_resize_handles() {
        let bounds = Bounds::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(resize_handles(&bounds).len(), 8);
        assert_eq!(hit_test_handles(&bounds, Point::new(102.0, 99.0), 8.0), Some(Side::BottomRight));
        assert_eq!(hit_test_handles(&bounds, Point::new(50.0, -3.0), 8.0), Some(Side::Top));
        assert_eq!(hit_test_handles(&bounds, Point::new(50.0, 50.0), 8.0), None);
    }

    #[test]
    fn test_small_bounds_prefer_corners() {
        let bounds = Bounds::new(0.0, 0.0, 4.0, 4.0);
        assert_eq!(hit_test_handles(&bounds, Point::new(0.0, 0.0), 8.0), Some(Side::TopLeft));
    }

    #[test]
    fn test_small_layer_center_is_not_a_handle() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let tolerance = handle_tolerance_for(&bounds, 8.0);
        assert_eq!(tolerance, 2.5);
        assert_eq!(hit_test_handles(&bounds, Point::new(5.0, 5.0), tolerance), None);
        assert_eq!(hit_test_handles(&bounds, Point::new(10.0, 10.0), tolerance), Some(Side::BottomRight));

        let large = Bounds::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(handle_tolerance_for(&large, 8.0), 8.0);
    }
}
