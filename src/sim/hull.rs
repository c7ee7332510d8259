//! Ship hull geometry
//!
//! A hull outline is defined by six points in the hull's local frame (bow
//! pointing along +x, origin at the hull centre):
//! - bow -> bow_bottom, a quadratic Bezier with `bow_tip` as control point
//! - bow_bottom -> stern_bottom, the starboard side (straight)
//! - stern_bottom -> stern, a quadratic Bezier with `stern_tip` as control point
//! - stern -> bow, the port side (straight)
//!
//! World-space vertices are always derived from the owning body's current
//! pose; only local-space data is cached here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Aabb, point_in_polygon, sample_line, sample_quadratic_bezier};

/// Curve samples used for the deck/boundary path
pub const PATH_CURVE_SAMPLES: usize = 16;

/// Which part of the hull outline a plank belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HullSection {
    Bow,
    Starboard,
    Stern,
    Port,
}

/// The six boundary points of a hull, in local space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HullDefinition {
    pub bow: Vec2,
    pub bow_tip: Vec2,
    pub bow_bottom: Vec2,
    pub stern_bottom: Vec2,
    pub stern_tip: Vec2,
    pub stern: Vec2,
}

impl HullDefinition {
    /// The two-masted brigantine
    pub fn brigantine() -> Self {
        Self {
            bow: Vec2::new(60.0, -40.0),
            bow_tip: Vec2::new(140.0, 0.0),
            bow_bottom: Vec2::new(60.0, 40.0),
            stern_bottom: Vec2::new(-100.0, 40.0),
            stern_tip: Vec2::new(-130.0, 0.0),
            stern: Vec2::new(-100.0, -40.0),
        }
    }

    /// A plain rectangle (curves degenerate to straight lines)
    pub fn rectangle(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self {
            bow: Vec2::new(hw, -hh),
            bow_tip: Vec2::new(hw, 0.0),
            bow_bottom: Vec2::new(hw, hh),
            stern_bottom: Vec2::new(-hw, hh),
            stern_tip: Vec2::new(-hw, 0.0),
            stern: Vec2::new(-hw, -hh),
        }
    }

    /// Bow curve from `bow` to `bow_bottom`
    pub fn bow_curve(&self, segments: usize) -> Vec<Vec2> {
        sample_quadratic_bezier(self.bow, self.bow_tip, self.bow_bottom, segments)
    }

    /// Stern curve from `stern_bottom` to `stern`
    pub fn stern_curve(&self, segments: usize) -> Vec<Vec2> {
        sample_quadratic_bezier(self.stern_bottom, self.stern_tip, self.stern, segments)
    }

    /// Closed boundary polygon (no repeated closing vertex). The straight
    /// sides are the edges between the two curves.
    pub fn boundary_path(&self, curve_samples: usize) -> Vec<Vec2> {
        let mut path = self.bow_curve(curve_samples);
        path.extend(self.stern_curve(curve_samples));
        path
    }

    /// Decompose the outline into plank segments, in order bow, starboard,
    /// stern, port
    pub fn plank_segments(&self, layout: &PlankLayout) -> Vec<PlankSegment> {
        let sections: [(HullSection, Vec<Vec2>); 4] = [
            (HullSection::Bow, self.bow_curve(layout.curve_segments)),
            (
                HullSection::Starboard,
                sample_line(self.bow_bottom, self.stern_bottom, layout.side_segments),
            ),
            (HullSection::Stern, self.stern_curve(layout.curve_segments)),
            (
                HullSection::Port,
                sample_line(self.stern, self.bow, layout.side_segments),
            ),
        ];

        let mut segments = Vec::new();
        for (section, points) in sections {
            for pair in points.windows(2) {
                let index = segments.len();
                segments.push(PlankSegment {
                    start: pair[0],
                    end: pair[1],
                    thickness: layout.thickness,
                    section,
                    index,
                });
            }
        }
        segments
    }

    pub fn extents(&self) -> Option<Aabb> {
        Aabb::from_points(&self.boundary_path(PATH_CURVE_SAMPLES))
    }
}

/// How finely the outline is cut into planks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlankLayout {
    /// Segments per curved section (bow, stern)
    pub curve_segments: usize,
    /// Segments per straight side
    pub side_segments: usize,
    pub thickness: f32,
}

impl Default for PlankLayout {
    fn default() -> Self {
        Self {
            curve_segments: 8,
            side_segments: 6,
            thickness: crate::consts::PLANK_THICKNESS,
        }
    }
}

impl PlankLayout {
    pub fn total_segments(&self) -> usize {
        2 * self.curve_segments.max(1) + 2 * self.side_segments.max(1)
    }
}

/// One straight piece of the hull outline, in local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlankSegment {
    pub start: Vec2,
    pub end: Vec2,
    pub thickness: f32,
    pub section: HullSection,
    pub index: usize,
}

impl PlankSegment {
    pub fn midpoint(&self) -> Vec2 {
        (self.start + self.end) * 0.5
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Direction angle of the segment in the hull's local frame
    pub fn angle(&self) -> f32 {
        let d = self.end - self.start;
        d.y.atan2(d.x)
    }
}

/// Something on deck the actor cannot walk through
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeckObstacle {
    Mast { center: Vec2, radius: f32 },
    Wheel { center: Vec2, half_extents: Vec2 },
}

impl DeckObstacle {
    pub fn center(&self) -> Vec2 {
        match *self {
            DeckObstacle::Mast { center, .. } | DeckObstacle::Wheel { center, .. } => center,
        }
    }

    /// True if `local` lies inside the exclusion zone grown by `padding`
    pub fn excludes(&self, local: Vec2, padding: f32) -> bool {
        match *self {
            DeckObstacle::Mast { center, radius } => local.distance(center) < radius + padding,
            DeckObstacle::Wheel {
                center,
                half_extents,
            } => {
                let d = (local - center).abs();
                d.x < half_extents.x + padding && d.y < half_extents.y + padding
            }
        }
    }

    /// Rough size of the exclusion zone, used to scale repulsion
    pub fn reach(&self, padding: f32) -> f32 {
        match *self {
            DeckObstacle::Mast { radius, .. } => radius + padding,
            DeckObstacle::Wheel { half_extents, .. } => half_extents.length() + padding,
        }
    }
}

/// Rope ladder on the outside of the hull
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardingLadder {
    /// Centre of the clickable ladder rectangle (local)
    pub center: Vec2,
    pub half_extents: Vec2,
    /// Where a boarding actor is placed on deck (local)
    pub deck_entry: Vec2,
    /// Where an unboarding actor is placed in the water (local)
    pub water_exit: Vec2,
}

impl BoardingLadder {
    /// Precise hover test against the ladder rectangle (local point)
    pub fn contains(&self, local: Vec2) -> bool {
        let d = (local - self.center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y
    }
}

/// A hull outline plus its deck furniture and cached local-space derivatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HullModel {
    pub name: String,
    pub definition: HullDefinition,
    pub obstacles: Vec<DeckObstacle>,
    pub ladder: BoardingLadder,
    pub layout: PlankLayout,
    /// Closed local-space boundary used for walkability
    pub path: Vec<Vec2>,
    /// Plank decomposition, fixed for the lifetime of the hull
    pub planks: Vec<PlankSegment>,
}

impl HullModel {
    pub fn new(
        name: impl Into<String>,
        definition: HullDefinition,
        obstacles: Vec<DeckObstacle>,
        ladder: BoardingLadder,
        layout: PlankLayout,
    ) -> Self {
        let path = definition.boundary_path(PATH_CURVE_SAMPLES);
        let planks = definition.plank_segments(&layout);
        Self {
            name: name.into(),
            definition,
            obstacles,
            ladder,
            layout,
            path,
            planks,
        }
    }

    /// Brigantine with two masts and a stern wheel, ladder on the starboard side
    pub fn brigantine() -> Self {
        Self::new(
            "brigantine",
            HullDefinition::brigantine(),
            vec![
                DeckObstacle::Mast {
                    center: Vec2::new(40.0, 0.0),
                    radius: 8.0,
                },
                DeckObstacle::Mast {
                    center: Vec2::new(-40.0, 0.0),
                    radius: 8.0,
                },
                DeckObstacle::Wheel {
                    center: Vec2::new(-85.0, 0.0),
                    half_extents: Vec2::new(6.0, 10.0),
                },
            ],
            BoardingLadder {
                center: Vec2::new(0.0, 46.0),
                half_extents: Vec2::new(10.0, 8.0),
                deck_entry: Vec2::new(0.0, 26.0),
                water_exit: Vec2::new(0.0, 64.0),
            },
            PlankLayout::default(),
        )
    }

    /// Rectangular raft with an empty deck, ladder on the +y side
    pub fn raft(width: f32, height: f32) -> Self {
        let hh = height * 0.5;
        Self::new(
            "raft",
            HullDefinition::rectangle(width, height),
            Vec::new(),
            BoardingLadder {
                center: Vec2::new(0.0, hh + 6.0),
                half_extents: Vec2::new(8.0, 6.0),
                deck_entry: Vec2::new(0.0, hh * 0.4),
                water_exit: Vec2::new(0.0, hh + 24.0),
            },
            PlankLayout {
                curve_segments: 2,
                side_segments: 4,
                thickness: crate::consts::PLANK_THICKNESS,
            },
        )
    }

    /// Inside the hull outline (ignores obstacles)
    pub fn contains_local(&self, local: Vec2) -> bool {
        point_in_polygon(local, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::is_convex;

    #[test]
    fn test_brigantine_path_is_closed_convex() {
        let model = HullModel::brigantine();
        assert_eq!(model.path.len(), 2 * (PATH_CURVE_SAMPLES + 1));
        assert!(is_convex(&model.path));
        assert!(model.contains_local(Vec2::ZERO));
        assert!(!model.contains_local(Vec2::new(0.0, 45.0)));
    }

    #[test]
    fn test_plank_count_matches_layout() {
        let model = HullModel::brigantine();
        assert_eq!(model.planks.len(), model.layout.total_segments());
        for (i, plank) in model.planks.iter().enumerate() {
            assert_eq!(plank.index, i);
        }
    }

    #[test]
    fn test_planks_form_a_closed_loop() {
        let model = HullModel::brigantine();
        let n = model.planks.len();
        for i in 0..n {
            let end = model.planks[i].end;
            let next_start = model.planks[(i + 1) % n].start;
            assert!(end.distance(next_start) < 1e-4, "gap after plank {i}");
        }
    }

    #[test]
    fn test_plank_sections_in_order() {
        let model = HullModel::brigantine();
        let bow = model.layout.curve_segments;
        let side = model.layout.side_segments;
        assert_eq!(model.planks[0].section, HullSection::Bow);
        assert_eq!(model.planks[bow].section, HullSection::Starboard);
        assert_eq!(model.planks[bow + side].section, HullSection::Stern);
        assert_eq!(model.planks[2 * bow + side].section, HullSection::Port);
    }

    #[test]
    fn test_bow_curve_reaches_past_bow_points() {
        let def = HullDefinition::brigantine();
        let curve = def.bow_curve(8);
        let tip = curve[4];
        assert!((tip - Vec2::new(100.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_rectangle_extents() {
        let ext = HullDefinition::rectangle(80.0, 30.0).extents().unwrap();
        assert!((ext.width() - 80.0).abs() < 1e-4);
        assert!((ext.height() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_obstacle_exclusion() {
        let mast = DeckObstacle::Mast {
            center: Vec2::ZERO,
            radius: 8.0,
        };
        assert!(mast.excludes(Vec2::new(10.0, 0.0), 4.0));
        assert!(!mast.excludes(Vec2::new(13.0, 0.0), 4.0));

        let wheel = DeckObstacle::Wheel {
            center: Vec2::ZERO,
            half_extents: Vec2::new(6.0, 10.0),
        };
        assert!(wheel.excludes(Vec2::new(9.0, 12.0), 4.0));
        assert!(!wheel.excludes(Vec2::new(11.0, 0.0), 4.0));
    }
}
