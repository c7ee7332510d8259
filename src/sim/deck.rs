//! Deck walkability and the deck constraint force
//!
//! All tests happen in the hull's local frame: the world point is mapped
//! through the hull body's current pose, checked against the boundary path,
//! then against the padded exclusion zone of every deck obstacle.

use glam::Vec2;

use super::body::RigidBody;
use super::geometry::vertex_mean;
use super::hull::HullModel;
use crate::normalize_or_fallback;
use crate::tuning::DeckTuning;

/// Boundary crossing found by the nearest-edge search (hull-local)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    pub point: Vec2,
    pub distance: f32,
}

/// Is a hull-local point inside the outline and clear of every obstacle?
pub fn is_local_point_walkable(model: &HullModel, local: Vec2, padding: f32) -> bool {
    model.contains_local(local) && !model.obstacles.iter().any(|o| o.excludes(local, padding))
}

/// Is a world point on the walkable deck of `hull`?
pub fn is_position_on_deck(
    model: &HullModel,
    hull: Option<&RigidBody>,
    world_point: Vec2,
    tuning: &DeckTuning,
) -> bool {
    let Some(hull) = hull else {
        log::warn!("Deck query on '{}' without a hull body", model.name);
        return false;
    };
    if model.path.len() < 3 {
        log::warn!("Deck query on '{}' with an empty boundary path", model.name);
        return false;
    }
    let local = hull.pose().world_to_local(world_point);
    is_local_point_walkable(model, local, tuning.obstacle_padding)
}

/// Binary search for the boundary crossing between a point inside the
/// outline and one outside it
fn bisect_boundary(model: &HullModel, mut inside: Vec2, mut outside: Vec2, iterations: u32) -> Vec2 {
    for _ in 0..iterations {
        let mid = (inside + outside) * 0.5;
        if model.contains_local(mid) {
            inside = mid;
        } else {
            outside = mid;
        }
    }
    (inside + outside) * 0.5
}

/// Closest point on the hull outline to a hull-local point.
///
/// Inside points cast `edge_directions` evenly spaced rays. Points outside
/// (or rays that never leave the hull) fall back to the ray from the outline
/// centre through the point.
pub fn nearest_hull_edge(model: &HullModel, local: Vec2, tuning: &DeckTuning) -> Option<EdgeHit> {
    if model.path.len() < 3 {
        return None;
    }

    let mut best: Option<EdgeHit> = None;
    if model.contains_local(local) {
        let n = tuning.edge_directions.max(1);
        for k in 0..n {
            let theta = k as f32 / n as f32 * std::f32::consts::TAU;
            let far = local + Vec2::new(theta.cos(), theta.sin()) * tuning.edge_ray_length;
            if model.contains_local(far) {
                continue;
            }
            let point = bisect_boundary(model, local, far, tuning.edge_iterations);
            let distance = point.distance(local);
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(EdgeHit { point, distance });
            }
        }
        if best.is_some() {
            return best;
        }
    }

    let centre = vertex_mean(&model.path);
    if !model.contains_local(centre) {
        log::warn!("Hull '{}' centre lies outside its outline", model.name);
        return None;
    }
    let outward = normalize_or_fallback(local - centre, Vec2::X);
    let outside = if model.contains_local(local) {
        centre + outward * tuning.edge_ray_length
    } else {
        local
    };
    let point = bisect_boundary(model, centre, outside, tuning.edge_iterations);
    Some(EdgeHit {
        point,
        distance: point.distance(local),
    })
}

/// Redirect a proposed movement force so the actor stays on the deck.
///
/// The force is projected forward by the lookahead distance; if that point
/// leaves the walkable area, repulsion from the nearest edge and from any
/// obstacle in the way is blended in. The result keeps the magnitude of
/// `proposed`.
pub fn compute_deck_constraint_force(
    model: &HullModel,
    hull: &RigidBody,
    actor_world: Vec2,
    proposed: Vec2,
    tuning: &DeckTuning,
) -> Vec2 {
    let magnitude = proposed.length();
    if !magnitude.is_finite() || magnitude < 1e-6 {
        return Vec2::ZERO;
    }

    let pose = hull.pose();
    let local = pose.world_to_local(actor_world);
    let dir = pose.dir_to_local(proposed / magnitude);
    let projected = local + dir * tuning.lookahead;
    if is_local_point_walkable(model, projected, tuning.obstacle_padding) {
        return proposed;
    }

    let proximity = |distance: f32| {
        tuning.repulsion_strength * (1.0 - distance / (tuning.lookahead * 2.0)).clamp(0.25, 1.0)
    };

    let mut corrected = dir;
    if !model.contains_local(projected) {
        if let Some(edge) = nearest_hull_edge(model, local, tuning) {
            let away = if model.contains_local(local) {
                normalize_or_fallback(local - edge.point, -dir)
            } else {
                normalize_or_fallback(vertex_mean(&model.path) - local, -dir)
            };
            corrected += away * proximity(edge.distance);
        }
    }
    for obstacle in &model.obstacles {
        if !obstacle.excludes(projected, tuning.obstacle_padding) {
            continue;
        }
        let away = normalize_or_fallback(local - obstacle.center(), -dir);
        let distance = (local.distance(obstacle.center()) - obstacle.reach(tuning.obstacle_padding)).max(0.0);
        corrected += away * proximity(distance);
    }

    let corrected = normalize_or_fallback(corrected, -dir);
    pose.dir_to_world(corrected) * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::BodyRole;
    use crate::sim::geometry::Pose;

    fn rotated_hull() -> (HullModel, RigidBody) {
        let model = HullModel::brigantine();
        let body = RigidBody::polygon("brigantine", BodyRole::Ship, Vec2::new(300.0, 200.0), model.path.clone(), 20.0)
            .with_angle(0.7);
        (model, body)
    }

    #[test]
    fn test_walkability_round_trip_per_section() {
        let (model, hull) = rotated_hull();
        let tuning = DeckTuning::default();
        let pose = hull.pose();
        for (name, local) in [
            ("bow", Vec2::new(80.0, 0.0)),
            ("stern", Vec2::new(-105.0, 0.0)),
            ("port", Vec2::new(0.0, -30.0)),
            ("starboard", Vec2::new(0.0, 30.0)),
        ] {
            let world = pose.local_to_world(local);
            assert!(is_position_on_deck(&model, Some(&hull), world, &tuning), "{name} should be walkable");
        }
    }

    #[test]
    fn test_obstacle_zones_not_walkable() {
        let (model, hull) = rotated_hull();
        let tuning = DeckTuning::default();
        let pose = hull.pose();
        for local in [Vec2::new(40.0, 0.0), Vec2::new(-40.0, 0.0), Vec2::new(-85.0, 0.0)] {
            assert!(!is_position_on_deck(&model, Some(&hull), pose.local_to_world(local), &tuning));
        }
        // Off the hull entirely
        assert!(!is_position_on_deck(&model, Some(&hull), pose.local_to_world(Vec2::new(0.0, 60.0)), &tuning));
    }

    #[test]
    fn test_missing_hull_or_path_is_not_walkable() {
        let (mut model, hull) = rotated_hull();
        let tuning = DeckTuning::default();
        assert!(!is_position_on_deck(&model, None, hull.pos, &tuning));
        model.path.clear();
        assert!(!is_position_on_deck(&model, Some(&hull), hull.pos, &tuning));
    }

    #[test]
    fn test_nearest_edge_inside() {
        let model = HullModel::brigantine();
        let hit = nearest_hull_edge(&model, Vec2::new(0.0, -30.0), &DeckTuning::default()).unwrap();
        assert!((hit.distance - 10.0).abs() < 0.5);
        assert!((hit.point.y + 40.0).abs() < 0.5);
    }

    #[test]
    fn test_nearest_edge_outside_uses_centre_ray() {
        let model = HullModel::brigantine();
        let hit = nearest_hull_edge(&model, Vec2::new(0.0, -70.0), &DeckTuning::default()).unwrap();
        assert!((hit.point.y + 40.0).abs() < 0.5);
        assert!((hit.distance - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_free_movement_unchanged() {
        let (model, hull) = rotated_hull();
        let actor = hull.pose().local_to_world(Vec2::new(0.0, 0.0));
        let proposed = hull.pose().dir_to_world(Vec2::new(0.0, 500.0));
        let out = compute_deck_constraint_force(&model, &hull, actor, proposed, &DeckTuning::default());
        assert_eq!(out, proposed);
    }

    #[test]
    fn test_edge_force_redirected_inward_same_magnitude() {
        let (model, hull) = rotated_hull();
        let pose: Pose = hull.pose();
        let actor = pose.local_to_world(Vec2::new(0.0, -30.0));
        // Walk straight out over the port rail
        let proposed = pose.dir_to_world(Vec2::new(0.0, -900.0));
        let out = compute_deck_constraint_force(&model, &hull, actor, proposed, &DeckTuning::default());
        assert!((out.length() - 900.0).abs() < 1e-2);
        assert!(pose.dir_to_local(out).y > 0.0);
    }

    #[test]
    fn test_mast_force_redirected() {
        let (model, hull) = rotated_hull();
        let pose = hull.pose();
        let actor = pose.local_to_world(Vec2::new(25.0, 0.0));
        let proposed = pose.dir_to_world(Vec2::new(600.0, 0.0));
        let out = compute_deck_constraint_force(&model, &hull, actor, proposed, &DeckTuning::default());
        assert!((out.length() - 600.0).abs() < 1e-2);
        assert!(pose.dir_to_local(out).x < 0.0);
    }

    #[test]
    fn test_zero_force_stays_zero() {
        let (model, hull) = rotated_hull();
        let out = compute_deck_constraint_force(&model, &hull, hull.pos, Vec2::ZERO, &DeckTuning::default());
        assert_eq!(out, Vec2::ZERO);
    }
}
