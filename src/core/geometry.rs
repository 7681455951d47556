use geo::{Coord, Intersects, LineString};
use serde::{Deserialize, Serialize};

use crate::core::alpha_shape;
use crate::core::error::GeometryError;

/// Integer pixel coordinate, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl From<Point> for Coord<i64> {
    fn from(p: Point) -> Self {
        Coord {
            x: p.x as i64,
            y: p.y as i64,
        }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Quadrilateral extent of a word or symbol, vertices in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox {
    pub vertices: Vec<Point>,
}

impl BoundingBox {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Axis-aligned bound, serialized as `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Rect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Tight per-axis extrema of `points`.
    pub fn enclosing(points: &[Point]) -> Result<Self, GeometryError> {
        let first = points.first().ok_or(GeometryError::Empty)?;
        let init = Rect::new(first.x, first.y, first.x, first.y);
        Ok(points.iter().fold(init, |rect, p| Rect {
            min_x: rect.min_x.min(p.x),
            min_y: rect.min_y.min(p.y),
            max_x: rect.max_x.max(p.x),
            max_y: rect.max_y.max(p.y),
        }))
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y).max(0) as u32
    }

    pub fn origin(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn contains(&self, p: Point) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }

    /// Closed corner ring, clockwise in image coordinates.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::closed(vec![
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ])
    }
}

impl From<[i32; 4]> for Rect {
    fn from([min_x, min_y, max_x, max_y]: [i32; 4]) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        [r.min_x, r.min_y, r.max_x, r.max_y]
    }
}

/// Closed ring: the first point is repeated as the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    /// Builds a ring from open or closed vertices.
    pub fn closed(mut points: Vec<Point>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if first != last {
                points.push(first);
            }
        }
        Self { points }
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 1 && self.points.first() == self.points.last()
    }

    /// Ring vertices with repeats collapsed: no two consecutive points are
    /// equal and the last differs from the first.
    pub fn vertices(&self) -> Vec<Point> {
        let mut verts: Vec<Point> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if verts.last() != Some(&p) {
                verts.push(p);
            }
        }
        while verts.len() > 1 && verts.first() == verts.last() {
            verts.pop();
        }
        verts
    }

    pub fn bounds(&self) -> Result<Rect, GeometryError> {
        Rect::enclosing(&self.points)
    }

    pub fn to_geo(&self) -> geo::Polygon<i64> {
        let ring: Vec<Coord<i64>> = self.points.iter().copied().map(Coord::from).collect();
        geo::Polygon::new(LineString::from(ring), vec![])
    }

    /// Boundary-inclusive point-in-polygon test.
    pub fn contains(&self, p: Point) -> bool {
        !self.points.is_empty() && self.to_geo().intersects(&Coord::<i64>::from(p))
    }
}

/// Boundary of a reconstructed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Shape {
    Polygon(Polygon),
    Rect(Rect),
}

impl Shape {
    /// The shape as a closed ring, suitable for masking and outlining.
    pub fn outline(&self) -> Polygon {
        match self {
            Shape::Polygon(polygon) => polygon.clone(),
            Shape::Rect(rect) => rect.to_polygon(),
        }
    }

    pub fn bounds(&self) -> Result<Rect, GeometryError> {
        match self {
            Shape::Polygon(polygon) => polygon.bounds(),
            Shape::Rect(rect) => Ok(*rect),
        }
    }
}

pub fn flatten_boxes(boxes: &[BoundingBox]) -> Vec<Point> {
    boxes
        .iter()
        .flat_map(|b| b.vertices.iter().copied())
        .collect()
}

/// Turns the points of a line's word boxes into its boundary.
pub trait ShapeStrategy {
    fn build_shape(&self, points: &[Point]) -> Result<Shape, GeometryError>;

    fn build_from_boxes(&self, boxes: &[BoundingBox]) -> Result<Shape, GeometryError> {
        self.build_shape(&flatten_boxes(boxes))
    }
}

/// Alpha-shape (concave hull) boundary. `alpha: None` picks the tightest
/// alpha that still yields one polygon enclosing every point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HullStrategy {
    pub alpha: Option<f64>,
}

impl HullStrategy {
    pub fn new(alpha: Option<f64>) -> Self {
        Self { alpha }
    }
}

impl ShapeStrategy for HullStrategy {
    fn build_shape(&self, points: &[Point]) -> Result<Shape, GeometryError> {
        alpha_shape::alpha_shape(points, self.alpha).map(Shape::Polygon)
    }
}

/// Min/max merge of every point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectStrategy;

impl ShapeStrategy for RectStrategy {
    fn build_shape(&self, points: &[Point]) -> Result<Shape, GeometryError> {
        Rect::enclosing(points).map(Shape::Rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pts(raw: &[(i32, i32)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn rect_is_true_extrema() {
        let points = pts(&[(5, 9), (-2, 4), (7, 1), (3, 12)]);
        let rect = Rect::enclosing(&points).unwrap();
        assert_eq!(rect, Rect::new(-2, 1, 7, 12));
        assert!(points.iter().all(|p| rect.contains(*p)));
    }

    #[test]
    fn single_point_gives_zero_area_rect() {
        let rect = Rect::enclosing(&pts(&[(4, 6)])).unwrap();
        assert_eq!(rect, Rect::new(4, 6, 4, 6));
        assert_eq!(rect.width(), 0);
        assert_eq!(rect.height(), 0);
    }

    #[test]
    fn empty_rect_fails() {
        assert_eq!(Rect::enclosing(&[]), Err(GeometryError::Empty));
    }

    #[test]
    fn rect_strategy_merges_boxes() {
        let boxes = vec![
            BoundingBox::new(pts(&[(0, 0), (10, 0), (10, 5), (0, 5)])),
            BoundingBox::new(pts(&[(12, 1), (20, 1), (20, 7), (12, 7)])),
        ];
        let shape = RectStrategy.build_from_boxes(&boxes).unwrap();
        assert_eq!(shape, Shape::Rect(Rect::new(0, 0, 20, 7)));
    }

    #[test]
    fn polygon_contains_boundary_and_interior() {
        let square = Rect::new(0, 0, 10, 10).to_polygon();
        assert!(square.is_closed());
        assert!(square.contains(Point::new(5, 5)));
        assert!(square.contains(Point::new(0, 7)));
        assert!(square.contains(Point::new(10, 10)));
        assert!(!square.contains(Point::new(11, 5)));
    }

    #[test]
    fn vertices_collapse_repeated_points() {
        let point = Polygon::closed(pts(&[(4, 6), (4, 6), (4, 6), (4, 6)]));
        assert_eq!(point.vertices(), pts(&[(4, 6)]));

        let sliver = Polygon::closed(pts(&[(1, 1), (5, 1), (1, 1), (1, 1)]));
        assert_eq!(sliver.vertices(), pts(&[(1, 1), (5, 1)]));

        let square = Rect::new(0, 0, 2, 2).to_polygon();
        assert_eq!(square.vertices().len(), 4);
    }

    #[test]
    fn translation_saturates() {
        let p = Point::new(i32::MIN + 1, i32::MAX - 1);
        assert_eq!(p.translated(-5, 5), Point::new(i32::MIN, i32::MAX));
    }

    #[test]
    fn shapes_serialize_like_vertex_lists() {
        let rect = Shape::Rect(Rect::new(1, 2, 3, 4));
        assert_eq!(serde_json::to_string(&rect).unwrap(), "[1,2,3,4]");

        let poly = Shape::Polygon(Polygon::closed(pts(&[(0, 0), (4, 0), (0, 3)])));
        assert_eq!(
            serde_json::to_string(&poly).unwrap(),
            "[[0,0],[4,0],[0,3],[0,0]]"
        );
    }
}
