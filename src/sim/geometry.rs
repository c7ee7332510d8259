//! Geometry primitives for hulls and collision queries
//!
//! Everything here is pure and works on plain `Vec2` slices: bounding boxes,
//! quadratic Bezier sampling, point-in-polygon, axis projection, the
//! separating-axis test and convex hulls (built by parry).

use glam::Vec2;
use rapier2d::math::{Point, Real};
use rapier2d::parry::transformation;
use serde::{Deserialize, Serialize};

use crate::rotate_vec;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set (None when empty)
    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .skip(1)
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let r = Vec2::splat(radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Grow the box by `buffer` on every side
    pub fn expand(&self, buffer: f32) -> Self {
        let b = Vec2::splat(buffer);
        Self {
            min: self.min - b,
            max: self.max + b,
        }
    }

    /// True if the boxes overlap (touching counts)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// Position + rotation of a body, used to move points between frames
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
}

impl Pose {
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self { position, angle }
    }

    #[inline]
    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.position + rotate_vec(local, self.angle)
    }

    #[inline]
    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        rotate_vec(world - self.position, -self.angle)
    }

    /// Rotate a direction (no translation) into world space
    #[inline]
    pub fn dir_to_world(&self, local_dir: Vec2) -> Vec2 {
        rotate_vec(local_dir, self.angle)
    }

    #[inline]
    pub fn dir_to_local(&self, world_dir: Vec2) -> Vec2 {
        rotate_vec(world_dir, -self.angle)
    }
}

/// Evaluate a quadratic Bezier curve at `t` in [0, 1]
#[inline]
pub fn quadratic_bezier(p0: Vec2, control: Vec2, p1: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + control * (2.0 * u * t) + p1 * (t * t)
}

/// Sample a quadratic Bezier into `segments + 1` evenly parameterised points
/// (both endpoints included)
pub fn sample_quadratic_bezier(p0: Vec2, control: Vec2, p1: Vec2, segments: usize) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            quadratic_bezier(p0, control, p1, t)
        })
        .collect()
}

/// Split the straight line `a -> b` into `segments + 1` points
pub fn sample_line(a: Vec2, b: Vec2, segments: usize) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| a.lerp(b, i as f32 / segments as f32))
        .collect()
}

/// Even-odd crossing test. Polygons with fewer than 3 vertices contain nothing.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Project vertices onto an axis, returning (min, max)
pub fn project_onto_axis(vertices: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for v in vertices {
        let d = v.dot(axis);
        lo = lo.min(d);
        hi = hi.max(d);
    }
    (lo, hi)
}

/// Signed area (positive for counter-clockwise winding)
pub fn signed_area(polygon: &[Vec2]) -> f32 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}

/// Average of the vertices (falls back to zero when empty)
pub fn vertex_mean(vertices: &[Vec2]) -> Vec2 {
    if vertices.is_empty() {
        return Vec2::ZERO;
    }
    vertices.iter().copied().sum::<Vec2>() / vertices.len() as f32
}

/// True if every turn has the same sign (collinear runs allowed)
pub fn is_convex(polygon: &[Vec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let n = polygon.len();
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let c = polygon[(i + 2) % n];
        let cross = (b - a).perp_dot(c - b);
        if cross.abs() < 1e-5 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Convex hull of the finite input points, counter-clockwise
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Point<Real>> = points
        .iter()
        .filter(|p| p.is_finite())
        .map(|p| Point::new(p.x, p.y))
        .collect();
    pts.dedup();
    if pts.len() < 3 {
        return pts.iter().map(|p| Vec2::new(p.x, p.y)).collect();
    }
    let hull: Vec<Vec2> = transformation::convex_hull(&pts)
        .iter()
        .map(|p| Vec2::new(p.x, p.y))
        .collect();
    if signed_area(&hull) < 0.0 {
        hull.into_iter().rev().collect()
    } else {
        hull
    }
}

/// Regular polygon approximating a circle
pub fn circle_polygon(center: Vec2, radius: f32, sides: usize) -> Vec<Vec2> {
    let sides = sides.max(3);
    (0..sides)
        .map(|i| {
            let theta = i as f32 / sides as f32 * std::f32::consts::TAU;
            center + Vec2::new(theta.cos(), theta.sin()) * radius
        })
        .collect()
}

/// Rectangle vertices centred on the origin, counter-clockwise
pub fn rectangle(width: f32, height: f32) -> Vec<Vec2> {
    let hw = width * 0.5;
    let hh = height * 0.5;
    vec![
        Vec2::new(-hw, -hh),
        Vec2::new(hw, -hh),
        Vec2::new(hw, hh),
        Vec2::new(-hw, hh),
    ]
}

/// Vertex of `vertices` furthest along `dir`, with its projection relative to `origin`
pub fn support_point(vertices: &[Vec2], origin: Vec2, dir: Vec2) -> Option<(Vec2, f32)> {
    vertices
        .iter()
        .map(|&v| (v, (v - origin).dot(dir)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Outcome of a separating-axis test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SatResult {
    /// A separating axis was found; `axes_tested` counts axes up to and including it
    Separated { axes_tested: usize },
    /// No separating axis: `depth` is the smallest overlap, `normal` points from A toward B
    Overlap { depth: f32, normal: Vec2 },
}

impl SatResult {
    pub fn is_overlap(&self) -> bool {
        matches!(self, SatResult::Overlap { .. })
    }
}

/// Separating-axis test for two convex polygons.
///
/// Tests every edge normal of A then B and returns on the first axis whose
/// projections do not overlap. Returns `None` if either polygon has fewer than
/// three vertices. Degenerate (zero-length) edges are skipped.
pub fn separating_axis_test(a: &[Vec2], b: &[Vec2]) -> Option<SatResult> {
    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    let mut min_overlap = f32::INFINITY;
    let mut min_axis = Vec2::X;
    let mut axes_tested = 0;

    for poly in [a, b] {
        let n = poly.len();
        for i in 0..n {
            let edge = poly[(i + 1) % n] - poly[i];
            let len = edge.length();
            if len < 1e-6 {
                continue;
            }
            let axis = edge.perp() / len;
            axes_tested += 1;

            let (min_a, max_a) = project_onto_axis(a, axis);
            let (min_b, max_b) = project_onto_axis(b, axis);
            let overlap = max_a.min(max_b) - min_a.max(min_b);
            if overlap <= 0.0 {
                return Some(SatResult::Separated { axes_tested });
            }
            if overlap < min_overlap {
                min_overlap = overlap;
                min_axis = axis;
            }
        }
    }

    if axes_tested == 0 {
        return None;
    }

    // Point the normal from A toward B
    let center_delta = vertex_mean(b) - vertex_mean(a);
    let normal = if center_delta.dot(min_axis) < 0.0 {
        -min_axis
    } else {
        min_axis
    };

    Some(SatResult::Overlap {
        depth: min_overlap.max(0.0),
        normal,
    })
}
