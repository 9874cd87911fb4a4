//! Geometry helpers: bounds, resize math, coordinate mapping, and colors.

use crate::camera::Camera;
use crate::layers::{Layer, LayerKind, PenPoint, Rgb};
use crate::presence::ConnectionId;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized bounds spanning two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Point containment, edges included.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Strict overlap test. Rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.right() > other.x
            && self.x < other.right()
            && self.bottom() > other.y
            && self.y < other.bottom()
    }

    /// Smallest bounds covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bounds::new(left, top, right - left, bottom - top)
    }

    pub fn translate(&self, offset: Vec2) -> Bounds {
        Bounds::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.right(), self.bottom())
    }

    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }
}

/// Smallest bounds covering every item, or `None` for an empty iterator.
pub fn union_bounds(bounds: impl IntoIterator<Item = Bounds>) -> Option<Bounds> {
    bounds.into_iter().reduce(|acc, b| acc.union(&b))
}

/// The side or corner a resize handle is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Side {
    pub const ALL: [Side; 8] = [
        Side::TopLeft,
        Side::Top,
        Side::TopRight,
        Side::Right,
        Side::BottomRight,
        Side::Bottom,
        Side::BottomLeft,
        Side::Left,
    ];

    pub fn has_top(self) -> bool {
        matches!(self, Side::Top | Side::TopLeft | Side::TopRight)
    }

    pub fn has_bottom(self) -> bool {
        matches!(self, Side::Bottom | Side::BottomLeft | Side::BottomRight)
    }

    pub fn has_left(self) -> bool {
        matches!(self, Side::Left | Side::TopLeft | Side::BottomLeft)
    }

    pub fn has_right(self) -> bool {
        matches!(self, Side::Right | Side::TopRight | Side::BottomRight)
    }

    pub fn is_corner(self) -> bool {
        (self.has_top() || self.has_bottom()) && (self.has_left() || self.has_right())
    }

    /// Where this side's handle sits on `bounds`.
    pub fn handle_position(self, bounds: &Bounds) -> Point {
        let x = if self.has_left() {
            bounds.x
        } else if self.has_right() {
            bounds.right()
        } else {
            bounds.x + bounds.width / 2.0
        };
        let y = if self.has_top() {
            bounds.y
        } else if self.has_bottom() {
            bounds.bottom()
        } else {
            bounds.y + bounds.height / 2.0
        };
        Point::new(x, y)
    }
}

/// Resize `initial` by dragging `side` to `point`.
///
/// The edge opposite the dragged one stays at its initial coordinate. Dragging
/// past it flips the rectangle instead of producing a negative size.
pub fn resize_bounds(initial: Bounds, side: Side, point: Point) -> Bounds {
    let mut result = initial;

    if side.has_left() {
        result.x = point.x.min(initial.right());
        result.width = (initial.right() - point.x).abs();
    }
    if side.has_right() {
        result.x = point.x.min(initial.x);
        result.width = (point.x - initial.x).abs();
    }
    if side.has_top() {
        result.y = point.y.min(initial.bottom());
        result.height = (initial.bottom() - point.y).abs();
    }
    if side.has_bottom() {
        result.y = point.y.min(initial.y);
        result.height = (point.y - initial.y).abs();
    }

    result
}

/// Map a client-space pointer position to canvas space.
/// Client coordinates are rounded first.
pub fn pointer_to_canvas(client: Point, camera: &Camera) -> Point {
    let offset = camera.offset;
    Point::new(client.x.round() - offset.x, client.y.round() - offset.y)
}

/// Build a path layer from absolute pen samples.
///
/// The layer bounds are the samples' bounding box and the stored points are
/// made relative to its top-left corner. Fewer than two samples yield `None`.
pub fn pen_points_to_path_layer(points: &[PenPoint], fill: Rgb) -> Option<Layer> {
    if points.len() < 2 {
        return None;
    }

    let mut left = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut right = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    for p in points {
        left = left.min(p.x);
        top = top.min(p.y);
        right = right.max(p.x);
        bottom = bottom.max(p.y);
    }

    let relative = points
        .iter()
        .map(|p| PenPoint::new(p.x - left, p.y - top, p.pressure))
        .collect();

    Some(Layer::new(
        LayerKind::Path { points: relative },
        Bounds::new(left, top, right - left, bottom - top),
        fill,
    ))
}

/// CSS hex notation for a color, e.g. `#fc8e2a`.
pub fn color_to_css(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Palette used for remote selections and cursors.
pub const PARTICIPANT_COLORS: [&str; 8] = [
    "#DC2626", "#D97706", "#059669", "#7C3AED", "#DB2777", "#2563EB", "#0891B2", "#65A30D",
];

/// Stable color for a connection.
pub fn connection_id_to_color(connection_id: ConnectionId) -> &'static str {
    PARTICIPANT_COLORS[connection_id as usize % PARTICIPANT_COLORS.len()]
}

/// Stable color for a user id, independent of which connection they use.
pub fn user_id_to_color(user_id: &str) -> &'static str {
    let hash = user_id
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    PARTICIPANT_COLORS[hash as usize % PARTICIPANT_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bounds_from_corners_normalizes() {
        let b = Bounds::from_corners(Point::new(10.0, 40.0), Point::new(0.0, 20.0));
        assert_eq!(b, Bounds::new(0.0, 20.0, 10.0, 20.0));
    }

    #[test]
    fn test_intersects_is_strict() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Bounds::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Bounds::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.intersects(&Bounds::new(20.0, 20.0, 5.0, 5.0)));
    }

    #[test]
    fn test_contains_includes_edges() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.contains(Point::new(10.0, 10.0)));
        assert!(!a.contains(Point::new(10.1, 5.0)));
    }

    #[test]
    fn test_union_bounds() {
        assert!(union_bounds(Vec::new()).is_none());
        let u = union_bounds([
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            Bounds::new(20.0, -5.0, 5.0, 5.0),
        ])
        .unwrap();
        assert_eq!(u, Bounds::new(0.0, -5.0, 25.0, 15.0));
    }

    #[test]
    fn test_resize_keeps_opposite_corner() {
        let initial = Bounds::new(50.0, 50.0, 100.0, 100.0);
        let first = resize_bounds(initial, Side::BottomRight, Point::new(180.0, 170.0));
        let second = resize_bounds(initial, Side::BottomRight, Point::new(220.0, 160.0));
        assert_eq!((first.x, first.y), (50.0, 50.0));
        assert_eq!((second.x, second.y), (50.0, 50.0));
        assert_eq!(second.width, 170.0);
        assert_eq!(second.height, 110.0);

        let top_left = resize_bounds(initial, Side::TopLeft, Point::new(70.0, 60.0));
        assert_eq!(top_left.right(), 150.0);
        assert_eq!(top_left.bottom(), 150.0);
        assert_eq!(top_left, Bounds::new(70.0, 60.0, 80.0, 90.0));
    }

    #[test]
    fn test_resize_edge_only_changes_one_axis() {
        let initial = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let r = resize_bounds(initial, Side::Right, Point::new(140.0, 999.0));
        assert_eq!(r, Bounds::new(0.0, 0.0, 140.0, 50.0));
        let t = resize_bounds(initial, Side::Top, Point::new(999.0, 20.0));
        assert_eq!(t, Bounds::new(0.0, 20.0, 100.0, 30.0));
    }

    #[test]
    fn test_resize_flips_past_anchor() {
        let initial = Bounds::new(50.0, 50.0, 100.0, 100.0);
        let flipped = resize_bounds(initial, Side::Right, Point::new(20.0, 0.0));
        assert_eq!(flipped.x, 20.0);
        assert_eq!(flipped.width, 30.0);
        assert_eq!(flipped.right(), 50.0);
    }

    #[test]
    fn test_side_handle_positions() {
        let b = Bounds::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(Side::TopLeft.handle_position(&b), Point::new(0.0, 0.0));
        assert_eq!(Side::Bottom.handle_position(&b), Point::new(50.0, 50.0));
        assert_eq!(Side::Right.handle_position(&b), Point::new(100.0, 25.0));
        assert!(Side::BottomLeft.is_corner());
        assert!(!Side::Left.is_corner());
    }

    #[test]
    fn test_pointer_to_canvas() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(10.0, 20.0));
        let p = pointer_to_canvas(Point::new(100.4, 50.6), &camera);
        assert_eq!(p, Point::new(90.0, 31.0));
    }

    #[test]
    fn test_pen_points_to_path_layer() {
        let points = [
            PenPoint::new(10.0, 20.0, 0.5),
            PenPoint::new(30.0, 5.0, 0.5),
            PenPoint::new(15.0, 40.0, 0.7),
        ];
        let layer = pen_points_to_path_layer(&points, Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(layer.bounds(), Bounds::new(10.0, 5.0, 20.0, 35.0));
        match layer.kind {
            LayerKind::Path { points } => {
                assert_eq!(points[0], PenPoint::new(0.0, 15.0, 0.5));
                assert_eq!(points[1], PenPoint::new(20.0, 0.0, 0.5));
                assert_eq!(points[2], PenPoint::new(5.0, 35.0, 0.7));
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn test_pen_points_needs_two_samples() {
        assert!(pen_points_to_path_layer(&[], Rgb::default()).is_none());
        assert!(pen_points_to_path_layer(&[PenPoint::new(1.0, 1.0, 0.5)], Rgb::default()).is_none());
    }

    #[test]
    fn test_color_to_css() {
        assert_eq!(color_to_css(Rgb::new(252, 142, 42)), "#fc8e2a");
        assert_eq!(color_to_css(Rgb::new(0, 0, 0)), "#000000");
    }

    #[test]
    fn test_participant_colors_are_deterministic() {
        assert_eq!(connection_id_to_color(3), connection_id_to_color(3));
        assert_eq!(connection_id_to_color(1), connection_id_to_color(9));
        assert_eq!(connection_id_to_color(0), "#DC2626");
        assert_eq!(user_id_to_color("user-42"), user_id_to_color("user-42"));
        assert!(PARTICIPANT_COLORS.contains(&user_id_to_color("someone")));
    }

    #[test]
    fn test_first_eight_connections_get_distinct_colors() {
        let colors: HashSet<&str> = (0..8).map(connection_id_to_color).collect();
        assert_eq!(colors.len(), 8);
        for id in 0..8 {
            assert_eq!(connection_id_to_color(id), PARTICIPANT_COLORS[id as usize]);
        }
    }

    fn opposite(side: Side) -> Side {
        match side {
            Side::TopLeft => Side::BottomRight,
            Side::Top => Side::Bottom,
            Side::TopRight => Side::BottomLeft,
            Side::Right => Side::Left,
            Side::BottomRight => Side::TopLeft,
            Side::Bottom => Side::Top,
            Side::BottomLeft => Side::TopRight,
            Side::Left => Side::Right,
        }
    }

    #[test]
    fn test_resize_keeps_anchor_for_every_side() {
        let initial = Bounds::new(100.0, 100.0, 100.0, 100.0);
        for side in Side::ALL {
            let handle = side.handle_position(&initial);
            for point in [handle + Vec2::new(7.0, -4.0), handle + Vec2::new(-9.0, 11.0)] {
                let r = resize_bounds(initial, side, point);
                if side.has_left() {
                    assert_eq!(r.right(), 200.0, "{side:?}");
                    assert_eq!(r.x, point.x, "{side:?}");
                } else if side.has_right() {
                    assert_eq!(r.x, 100.0, "{side:?}");
                    assert_eq!(r.right(), point.x, "{side:?}");
                } else {
                    assert_eq!((r.x, r.width), (100.0, 100.0), "{side:?}");
                }
                if side.has_top() {
                    assert_eq!(r.bottom(), 200.0, "{side:?}");
                    assert_eq!(r.y, point.y, "{side:?}");
                } else if side.has_bottom() {
                    assert_eq!(r.y, 100.0, "{side:?}");
                    assert_eq!(r.bottom(), point.y, "{side:?}");
                } else {
                    assert_eq!((r.y, r.height), (100.0, 100.0), "{side:?}");
                }
            }
        }
    }

    #[test]
    fn test_every_corner_flips_past_anchor() {
        let initial = Bounds::new(100.0, 100.0, 100.0, 100.0);
        for side in Side::ALL.into_iter().filter(|s| s.is_corner()) {
            let anchor = opposite(side).handle_position(&initial);
            let past = Vec2::new(
                if side.has_left() { 30.0 } else { -30.0 },
                if side.has_top() { 30.0 } else { -30.0 },
            );
            let point = anchor + past;
            let r = resize_bounds(initial, side, point);
            assert_eq!(r, Bounds::from_corners(anchor, point), "{side:?}");
            assert_eq!((r.width, r.height), (30.0, 30.0), "{side:?}");
        }
    }
}
