//! Alpha shapes over integer point sets.
//!
//! The point set is Delaunay-triangulated, triangles whose circumradius is
//! below `1 / alpha` are kept, and the outer boundary of the kept triangles
//! is traced into a ring. `alpha <= 0` degenerates to the convex hull.

use std::collections::HashMap;

use geo::algorithm::kernels::{Kernel, Orientation};
use geo::{Area, ConvexHull, Coord, GeoNum, LineString, MultiPoint, Triangle, TriangulateSpade};
use tracing::debug;

use crate::core::error::GeometryError;
use crate::core::geometry::{Point, Polygon};

type Tri = [usize; 3];

/// Concave hull of `points`. With `alpha: None` the tightest alpha that keeps
/// every point inside one polygon is chosen.
pub fn alpha_shape(points: &[Point], alpha: Option<f64>) -> Result<Polygon, GeometryError> {
    let pts = distinct_points(points)?;

    match alpha {
        Some(a) if a <= 0.0 => Ok(convex_hull(&pts)),
        Some(a) => {
            let tris = delaunay(&pts);
            let max_radius = 1.0 / a;
            let kept: Vec<Tri> = tris
                .into_iter()
                .filter(|t| circumradius(&pts, t) < max_radius)
                .collect();
            exterior_ring(&pts, &kept)
                .map(|ring| ring_to_polygon(&pts, &ring))
                .ok_or(GeometryError::AlphaTooLarge { alpha: a })
        }
        None => Ok(optimize_alpha(&pts)),
    }
}

/// Scans circumradius thresholds from tightest to loosest and returns the
/// first shape that is a single polygon covering every point.
fn optimize_alpha(pts: &[Point]) -> Polygon {
    let tris = delaunay(pts);
    let mut ranked: Vec<(f64, Tri)> = tris.iter().map(|t| (circumradius(pts, t), *t)).collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut start = 0;
    while start < ranked.len() {
        let threshold = ranked[start].0;
        let mut end = start;
        while end < ranked.len() && ranked[end].0 <= threshold {
            end += 1;
        }
        let kept: Vec<Tri> = ranked[..end].iter().map(|(_, t)| *t).collect();
        if let Some(ring) = exterior_ring(pts, &kept) {
            debug!(
                radius = threshold,
                alpha = 1.0 / threshold,
                triangles = kept.len(),
                "selected alpha"
            );
            return ring_to_polygon(pts, &ring);
        }
        start = end;
    }

    debug!(points = pts.len(), "no concave alpha is valid, using convex hull");
    convex_hull(pts)
}

fn distinct_points(points: &[Point]) -> Result<Vec<Point>, GeometryError> {
    if points.is_empty() {
        return Err(GeometryError::Empty);
    }

    let mut pts = points.to_vec();
    pts.sort_unstable();
    pts.dedup();

    let collinear = pts
        .iter()
        .skip(2)
        .all(|p| orientation(pts[0], pts[1], *p) == Orientation::Collinear);
    if pts.len() < 3 || collinear {
        return Err(GeometryError::Degenerate {
            distinct: pts.len(),
            collinear,
        });
    }
    Ok(pts)
}

fn ring_to_polygon(pts: &[Point], ring: &[usize]) -> Polygon {
    Polygon::closed(ring.iter().map(|&i| pts[i]).collect())
}

fn orientation(a: Point, b: Point, c: Point) -> Orientation {
    let (a, b, c): (Coord<i64>, Coord<i64>, Coord<i64>) = (a.into(), b.into(), c.into());
    <i64 as GeoNum>::Ker::orient2d(a, b, c)
}

fn coord(p: Point) -> Coord<f64> {
    Coord {
        x: p.x as f64,
        y: p.y as f64,
    }
}

fn triangle(pts: &[Point], t: &Tri) -> Triangle<f64> {
    let [a, b, c] = t.map(|i| coord(pts[i]));
    Triangle::new(a, b, c)
}

/// Delaunay triangles over `pts` as point indices, each counter-clockwise.
fn delaunay(pts: &[Point]) -> Vec<Tri> {
    let index: HashMap<Point, usize> = pts.iter().enumerate().map(|(i, p)| (*p, i)).collect();
    let cloud: LineString<f64> = pts.iter().copied().map(coord).collect();

    let triangles = match cloud.unconstrained_triangulation() {
        Ok(triangles) => triangles,
        Err(err) => {
            debug!(points = pts.len(), "triangulation failed: {err:?}");
            return Vec::new();
        }
    };

    triangles
        .into_iter()
        .filter_map(|tri| {
            let [a, b, c] = tri
                .to_array()
                .map(|v| index.get(&Point::new(v.x as i32, v.y as i32)).copied());
            let (a, b, c) = (a?, b?, c?);
            match orientation(pts[a], pts[b], pts[c]) {
                Orientation::CounterClockwise => Some([a, b, c]),
                Orientation::Clockwise => Some([a, c, b]),
                Orientation::Collinear => None,
            }
        })
        .collect()
}

fn tri_edges(t: &Tri) -> [(usize, usize); 3] {
    [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
}

fn undirected(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn circumradius(pts: &[Point], t: &Tri) -> f64 {
    let tri = triangle(pts, t);
    let area = tri.unsigned_area();
    if area == 0.0 {
        return f64::INFINITY;
    }
    let [a, b, c] = tri.to_array();
    let dist = |p: Coord<f64>, q: Coord<f64>| (p.x - q.x).hypot(p.y - q.y);
    dist(a, b) * dist(b, c) * dist(c, a) / (4.0 * area)
}

/// Outer boundary of the union of `tris`, as point indices. `None` unless
/// the triangles are edge-connected, touch every point, and their boundary
/// splits into simple rings.
fn exterior_ring(pts: &[Point], tris: &[Tri]) -> Option<Vec<usize>> {
    if tris.is_empty() {
        return None;
    }

    let mut covered = vec![false; pts.len()];
    for t in tris {
        for &v in t {
            covered[v] = true;
        }
    }
    if covered.iter().any(|c| !c) {
        return None;
    }

    let mut edge_owner: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (ti, t) in tris.iter().enumerate() {
        for (a, b) in tri_edges(t) {
            edge_owner.entry(undirected(a, b)).or_default().push(ti);
        }
    }

    let mut components = DisjointSet::new(tris.len());
    for owners in edge_owner.values() {
        if let [first, second] = owners.as_slice() {
            components.union(*first, *second);
        }
    }
    let root = components.find(0);
    if (1..tris.len()).any(|ti| components.find(ti) != root) {
        return None;
    }

    let mut next: HashMap<usize, usize> = HashMap::new();
    for t in tris {
        for (a, b) in tri_edges(t) {
            if edge_owner[&undirected(a, b)].len() == 1 && next.insert(a, b).is_some() {
                // two boundary rings pinch at `a`
                return None;
            }
        }
    }

    let mut visited = vec![false; pts.len()];
    let mut best: Option<(f64, Vec<usize>)> = None;
    let mut outer_rings = 0;
    let mut starts: Vec<usize> = next.keys().copied().collect();
    starts.sort_unstable();

    for start in starts {
        if visited[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = start;
        loop {
            if visited[current] {
                return None;
            }
            visited[current] = true;
            ring.push(current);
            current = *next.get(&current)?;
            if current == start {
                break;
            }
        }

        let area = ring_area(pts, &ring);
        if area > 0.0 {
            outer_rings += 1;
        }
        if best.as_ref().map_or(true, |(a, _)| area > *a) {
            best = Some((area, ring));
        }
    }

    if outer_rings != 1 {
        return None;
    }
    best.map(|(_, ring)| ring)
}

/// Signed area, positive for counter-clockwise rings.
fn ring_area(pts: &[Point], ring: &[usize]) -> f64 {
    let exterior: LineString<f64> = ring.iter().map(|&i| coord(pts[i])).collect();
    geo::Polygon::new(exterior, vec![]).signed_area()
}

fn convex_hull(pts: &[Point]) -> Polygon {
    let cloud: MultiPoint<i64> = pts.iter().copied().map(Coord::<i64>::from).collect();
    let hull = cloud.convex_hull();
    Polygon::closed(
        hull.exterior()
            .coords()
            .map(|c| Point::new(c.x as i32, c.y as i32))
            .collect(),
    )
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let up = self.parent[cur];
            self.parent[cur] = root;
            cur = up;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}
