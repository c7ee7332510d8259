//! Composite hulls: one primary body plus welded plank bodies
//!
//! The primary body carries mass, movement and the top-level collision shape.
//! Each `PlankSegment` of the hull model becomes one thin rectangle welded to
//! the primary body with a fixed joint. A hull and its planks form one
//! collision assembly: planks never touch each other or their own hull, but
//! they do collide with players, other ships and scenery.

use std::fmt;

use glam::Vec2;

use super::body::{BodyId, BodyRole, CollisionFilter, RigidBody, category};
use super::geometry::{Aabb, Pose, convex_hull, is_convex, rectangle};
use super::hull::{HullModel, PlankSegment};
use super::world::PhysicsWorld;
use crate::tuning::BodyTuning;

/// Which construction tier produced the hull's collision polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullBuild {
    /// The boundary path as-is
    Exact,
    /// Convex hull of the boundary path
    ConvexHull,
    /// Bounding rectangle of the outline
    Rectangle,
}

/// Plank resync could not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlankSyncError {
    MissingHull(BodyId),
    CountMismatch { bodies: usize, segments: usize },
    MissingPlank(BodyId),
}

impl fmt::Display for PlankSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlankSyncError::MissingHull(id) => write!(f, "hull body {id:?} not found"),
            PlankSyncError::CountMismatch { bodies, segments } => {
                write!(f, "{bodies} plank bodies for {segments} plank segments")
            }
            PlankSyncError::MissingPlank(id) => write!(f, "plank body {id:?} not found"),
        }
    }
}

impl std::error::Error for PlankSyncError {}

/// Collision filter for a ship hull
pub fn hull_filter(hull: BodyId) -> CollisionFilter {
    CollisionFilter::new(
        category::SHIP,
        category::PLAYER | category::SHIP | category::PLANK | category::SCENERY,
    )
    .in_assembly(hull)
}

/// Collision filter for a plank of `hull`
pub fn plank_filter(hull: BodyId) -> CollisionFilter {
    CollisionFilter::new(
        category::PLANK,
        category::PLAYER | category::SHIP | category::SCENERY,
    )
    .in_assembly(hull)
}

fn vertices_usable(vertices: &[Vec2]) -> bool {
    vertices.len() >= 3 && vertices.iter().all(|v| v.is_finite())
}

/// Pick the collision polygon for a hull outline, degrading from the exact
/// path to its convex hull to a plain rectangle
pub fn hull_collision_polygon(model: &HullModel) -> (Vec<Vec2>, HullBuild) {
    if vertices_usable(&model.path) && is_convex(&model.path) {
        return (model.path.clone(), HullBuild::Exact);
    }

    let finite: Vec<Vec2> = model.path.iter().copied().filter(|v| v.is_finite()).collect();
    let hull = convex_hull(&finite);
    if vertices_usable(&hull) {
        log::warn!(
            "Hull '{}' outline is not convex, using its convex hull ({} vertices)",
            model.name,
            hull.len()
        );
        return (hull, HullBuild::ConvexHull);
    }

    let size = Aabb::from_points(&finite)
        .map(|b| Vec2::new(b.width(), b.height()))
        .filter(|s| s.x > 0.0 && s.y > 0.0)
        .unwrap_or(Vec2::ONE);
    log::warn!(
        "Hull '{}' outline is degenerate, using a {}x{} rectangle",
        model.name,
        size.x,
        size.y
    );
    (rectangle(size.x, size.y), HullBuild::Rectangle)
}

/// Create the primary hull body
pub fn create_hull_body(
    world: &mut PhysicsWorld,
    label: &str,
    model: &HullModel,
    pos: Vec2,
    angle: f32,
    tuning: &BodyTuning,
) -> (BodyId, HullBuild) {
    let (vertices, build) = hull_collision_polygon(model);
    let body = RigidBody::polygon(label, BodyRole::Ship, pos, vertices, tuning.ship_mass)
        .with_angle(angle)
        .with_drag(tuning.ship_drag, tuning.ship_angular_drag);
    let id = world.add_body(body);
    if let Some(body) = world.get_mut(id) {
        body.filter = hull_filter(id);
    }
    log::info!("Created hull '{label}' ({build:?}) at ({:.0}, {:.0})", pos.x, pos.y);
    (id, build)
}

/// World pose of a plank given its parent's pose
pub fn plank_pose(hull: Pose, segment: &PlankSegment) -> (Vec2, f32) {
    (
        hull.local_to_world(segment.midpoint()),
        crate::normalize_angle(hull.angle + segment.angle()),
    )
}

/// Create one welded plank body per segment of `model`
pub fn create_plank_bodies(
    world: &mut PhysicsWorld,
    hull_id: BodyId,
    model: &HullModel,
    tuning: &BodyTuning,
) -> Vec<BodyId> {
    let Some(hull) = world.get(hull_id) else {
        log::warn!("Cannot create planks: hull {hull_id:?} not found");
        return Vec::new();
    };
    let hull_pose = hull.pose();
    let hull_label = hull.label.clone();
    let pending: Vec<RigidBody> = model
        .planks
        .iter()
        .map(|segment| {
            let (pos, angle) = plank_pose(hull_pose, segment);
            let mut plank = RigidBody::polygon(
                format!("{hull_label}_plank_{}", segment.index),
                BodyRole::Plank {
                    ship: hull_id,
                    index: segment.index,
                },
                pos,
                rectangle(segment.length().max(1e-3), segment.thickness),
                tuning.plank_mass,
            )
            .with_angle(angle)
            .with_filter(plank_filter(hull_id));
            plank.vel = hull.point_velocity(pos);
            plank.angular_vel = hull.angular_vel;
            plank
        })
        .collect();

    let mut ids = Vec::with_capacity(pending.len());
    for (plank, segment) in pending.into_iter().zip(&model.planks) {
        let id = world.add_body(plank);
        world.weld(id, hull_id, segment.midpoint(), segment.angle());
        ids.push(id);
    }
    log::debug!("Created {} planks for '{hull_label}'", ids.len());
    ids
}

/// Snap every plank to the pose derived from its segment and the hull's
/// current transform. Returns the number of planks synced.
pub fn resync_planks(
    world: &mut PhysicsWorld,
    hull_id: BodyId,
    planks: &[BodyId],
    segments: &[PlankSegment],
) -> Result<usize, PlankSyncError> {
    if planks.len() != segments.len() {
        return Err(PlankSyncError::CountMismatch {
            bodies: planks.len(),
            segments: segments.len(),
        });
    }
    let hull = world.get(hull_id).ok_or(PlankSyncError::MissingHull(hull_id))?;
    let hull_pose = hull.pose();
    let hull_spin = hull.angular_vel;
    let targets: Vec<(Vec2, f32, Vec2)> = segments
        .iter()
        .map(|segment| {
            let (pos, angle) = plank_pose(hull_pose, segment);
            (pos, angle, hull.point_velocity(pos))
        })
        .collect();

    if let Some(&missing) = planks.iter().find(|&&id| !world.contains(id)) {
        return Err(PlankSyncError::MissingPlank(missing));
    }

    for (&id, (pos, angle, vel)) in planks.iter().zip(targets) {
        if let Some(plank) = world.get_mut(id) {
            plank.pos = pos;
            plank.angle = angle;
            plank.vel = vel;
            plank.angular_vel = hull_spin;
        }
    }
    Ok(planks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::Shape;
    use crate::sim::hull::{BoardingLadder, HullDefinition, PlankLayout};

    fn setup() -> (PhysicsWorld, BodyId, Vec<BodyId>, HullModel) {
        let mut world = PhysicsWorld::default();
        let model = HullModel::brigantine();
        let tuning = BodyTuning::default();
        let (hull, build) = create_hull_body(&mut world, "brigantine", &model, Vec2::new(300.0, 200.0), 0.7, &tuning);
        assert_eq!(build, HullBuild::Exact);
        let planks = create_plank_bodies(&mut world, hull, &model, &tuning);
        (world, hull, planks, model)
    }

    #[test]
    fn test_one_plank_body_per_segment() {
        let (world, hull, planks, model) = setup();
        assert_eq!(planks.len(), model.planks.len());
        assert_eq!(world.weld_count(), planks.len());
        let first = world.get(planks[0]).unwrap();
        assert_eq!(first.label, "brigantine_plank_0");
        assert_eq!(first.role, BodyRole::Plank { ship: hull, index: 0 });
    }

    #[test]
    fn test_planks_never_collide_with_hull_or_each_other() {
        let (world, hull, planks, _) = setup();
        let hull_filter = world.get(hull).unwrap().filter;
        let a = world.get(planks[0]).unwrap().filter;
        let b = world.get(planks[1]).unwrap().filter;
        assert!(!a.can_collide(&b));
        assert!(!a.can_collide(&hull_filter));
    }

    #[test]
    fn test_planks_collide_with_players_and_other_ships() {
        let (mut world, _, planks, model) = setup();
        let player = CollisionFilter::new(category::PLAYER, category::SHIP | category::PLANK | category::SCENERY);
        let plank = world.get(planks[0]).unwrap().filter;
        assert!(plank.can_collide(&player));
        assert!(player.can_collide(&plank));

        let tuning = BodyTuning::default();
        let (other, _) = create_hull_body(&mut world, "sloop", &model, Vec2::new(900.0, 200.0), 0.0, &tuning);
        let other_filter = world.get(other).unwrap().filter;
        assert!(plank.can_collide(&other_filter));
        let other_planks = create_plank_bodies(&mut world, other, &model, &tuning);
        // Planks of different ships share a category but not a mask bit
        assert!(!plank.can_collide(&world.get(other_planks[0]).unwrap().filter));
    }

    #[test]
    fn test_resync_is_idempotent() {
        let (mut world, hull, planks, model) = setup();
        world.get_mut(hull).unwrap().angle = 1.3;
        resync_planks(&mut world, hull, &planks, &model.planks).unwrap();
        let first: Vec<(Vec2, f32)> = planks.iter().map(|&id| {
            let p = world.get(id).unwrap();
            (p.pos, p.angle)
        }).collect();

        resync_planks(&mut world, hull, &planks, &model.planks).unwrap();
        for (&id, (pos, angle)) in planks.iter().zip(first) {
            let p = world.get(id).unwrap();
            assert_eq!(p.pos.x.to_bits(), pos.x.to_bits());
            assert_eq!(p.pos.y.to_bits(), pos.y.to_bits());
            assert_eq!(p.angle.to_bits(), angle.to_bits());
        }
    }

    #[test]
    fn test_planks_follow_moving_hull() {
        let (mut world, hull, planks, model) = setup();
        {
            let h = world.get_mut(hull).unwrap();
            h.vel = Vec2::new(120.0, -40.0);
            h.angular_vel = 0.8;
        }
        for _ in 0..30 {
            world.step(crate::consts::SIM_DT);
            resync_planks(&mut world, hull, &planks, &model.planks).unwrap();
        }
        let pose = world.get(hull).unwrap().pose();
        for (&id, segment) in planks.iter().zip(&model.planks) {
            let expected = pose.local_to_world(segment.midpoint());
            assert!(world.get(id).unwrap().pos.distance(expected) < 1e-3);
        }
    }

    #[test]
    fn test_resync_count_mismatch_is_reported() {
        let (mut world, hull, planks, model) = setup();
        let before = world.get(planks[0]).unwrap().pos;
        world.get_mut(hull).unwrap().pos += Vec2::new(50.0, 0.0);
        let err = resync_planks(&mut world, hull, &planks[1..], &model.planks).unwrap_err();
        assert_eq!(
            err,
            PlankSyncError::CountMismatch {
                bodies: planks.len() - 1,
                segments: planks.len()
            }
        );
        // Nothing moved
        assert_eq!(world.get(planks[0]).unwrap().pos, before);
    }

    #[test]
    fn test_resync_missing_bodies() {
        let (mut world, hull, planks, model) = setup();
        world.remove_body(planks[3]);
        assert_eq!(
            resync_planks(&mut world, hull, &planks, &model.planks),
            Err(PlankSyncError::MissingPlank(planks[3]))
        );
        world.remove_body(hull);
        assert_eq!(
            resync_planks(&mut world, hull, &planks, &model.planks),
            Err(PlankSyncError::MissingHull(hull))
        );
    }

    #[test]
    fn test_concave_outline_falls_back_to_convex_hull() {
        let mut def = HullDefinition::rectangle(80.0, 30.0);
        // Pull the bow control point inward to make a notch
        def.bow_tip = Vec2::new(0.0, 0.0);
        let model = HullModel::new(
            "notched",
            def,
            Vec::new(),
            BoardingLadder {
                center: Vec2::new(0.0, 21.0),
                half_extents: Vec2::new(8.0, 6.0),
                deck_entry: Vec2::ZERO,
                water_exit: Vec2::new(0.0, 40.0),
            },
            PlankLayout::default(),
        );
        let (vertices, build) = hull_collision_polygon(&model);
        assert_eq!(build, HullBuild::ConvexHull);
        assert!(is_convex(&vertices));
    }

    #[test]
    fn test_degenerate_outline_falls_back_to_rectangle() {
        let mut model = HullModel::brigantine();
        model.path = vec![Vec2::ZERO, Vec2::new(f32::NAN, 1.0)];
        let mut world = PhysicsWorld::default();
        let (id, build) = create_hull_body(&mut world, "wreck", &model, Vec2::ZERO, 0.0, &BodyTuning::default());
        assert_eq!(build, HullBuild::Rectangle);
        match &world.get(id).unwrap().shape {
            Shape::Polygon { vertices } => assert_eq!(vertices.len(), 4),
            Shape::Circle { .. } => panic!("hull must be a polygon"),
        }
    }
}
