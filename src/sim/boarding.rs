//! Boarding state machine and the boarded-actor carry
//!
//! An actor is either in the water or standing on exactly one hull. Both
//! transitions need the actor near the hull's ladder and the pointer over the
//! ladder itself.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, RigidBody};
use super::geometry::Pose;
use super::hull::BoardingLadder;
use crate::tuning::BoardingTuning;

/// Hull an actor is standing on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardedOn {
    pub hull: BodyId,
    /// Actor position in the hull's local frame
    pub local_offset: Vec2,
    /// Hull pose when `local_offset` was last written
    pub hull_pose: Pose,
    /// Actor's own (controlled) velocity, without the hull contribution
    pub own_velocity: Vec2,
}

/// Per-actor boarding state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardingState {
    boarded: Option<BoardedOn>,
}

impl BoardingState {
    pub fn is_boarded(&self) -> bool {
        self.boarded.is_some()
    }

    pub fn boarded(&self) -> Option<&BoardedOn> {
        self.boarded.as_ref()
    }

    pub fn boarded_mut(&mut self) -> Option<&mut BoardedOn> {
        self.boarded.as_mut()
    }

    pub fn hull(&self) -> Option<BodyId> {
        self.boarded.map(|b| b.hull)
    }

    /// Stand `actor` on `hull` at a local deck position
    pub fn board(&mut self, actor: &mut RigidBody, hull: &RigidBody, local_offset: Vec2) {
        let pose = hull.pose();
        actor.pos = pose.local_to_world(local_offset);
        actor.vel = hull.point_velocity(actor.pos);
        self.boarded = Some(BoardedOn {
            hull: hull.id,
            local_offset,
            hull_pose: pose,
            own_velocity: Vec2::ZERO,
        });
    }

    /// Leave the hull; returns where the actor was standing
    pub fn unboard(&mut self) -> Option<BoardedOn> {
        self.boarded.take()
    }
}

/// Result of the two boarding proximity tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardingGate {
    /// Actor is within the interaction radius of the ladder
    pub within_radius: bool,
    /// Pointer is over the ladder rectangle
    pub hovering_ladder: bool,
}

impl BoardingGate {
    pub fn passes(&self) -> bool {
        self.within_radius && self.hovering_ladder
    }
}

/// Evaluate both boarding conditions for a ladder on a hull at `hull_pose`
pub fn evaluate_boarding_gate(
    ladder: &BoardingLadder,
    hull_pose: Pose,
    actor_pos: Vec2,
    pointer_world: Option<Vec2>,
    tuning: &BoardingTuning,
) -> BoardingGate {
    let ladder_world = hull_pose.local_to_world(ladder.center);
    BoardingGate {
        within_radius: actor_pos.distance(ladder_world) <= tuning.interaction_radius,
        hovering_ladder: pointer_world.is_some_and(|p| ladder.contains(hull_pose.world_to_local(p))),
    }
}

/// Carry a boarded actor with its hull after a physics step.
///
/// The actor's own displacement this step is taken in the hull frame it was
/// last placed in, then re-placed through the hull's current pose, so the
/// actor follows the hull's translation and rotation. A step that would end
/// off the walkable deck is discarded along with the actor's own velocity.
/// The reported velocity blends the actor's own velocity with the hull's
/// velocity at its position.
pub fn carry_boarded_actor(
    boarded: &mut BoardedOn,
    actor: &mut RigidBody,
    hull: &RigidBody,
    tuning: &BoardingTuning,
    walkable: impl Fn(Vec2) -> bool,
) {
    let previous = boarded.hull_pose;
    let own_delta = actor.pos - previous.local_to_world(boarded.local_offset);
    let mut local = boarded.local_offset + previous.dir_to_local(own_delta);
    let mut own_velocity = actor.vel;
    if !walkable(local) {
        local = boarded.local_offset;
        own_velocity = Vec2::ZERO;
    }
    let pose = hull.pose();

    actor.pos = pose.local_to_world(local);
    boarded.local_offset = local;
    boarded.hull_pose = pose;
    boarded.own_velocity = own_velocity;

    let share = tuning.control_share.clamp(0.0, 1.0);
    actor.vel = boarded.own_velocity * share + hull.point_velocity(actor.pos) * (1.0 - share);
}

/// Put the actor's own velocity back before the next step integrates it
pub fn restore_own_velocity(boarded: &BoardedOn, actor: &mut RigidBody) {
    actor.vel = boarded.own_velocity;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::BodyRole;
    use crate::sim::geometry::rectangle;
    use crate::sim::hull::HullModel;

    fn ship_at(pos: Vec2, angle: f32) -> RigidBody {
        let mut hull = RigidBody::polygon("brigantine", BodyRole::Ship, pos, rectangle(240.0, 80.0), 20.0)
            .with_angle(angle);
        hull.id = BodyId(7);
        hull
    }

    fn player(pos: Vec2) -> RigidBody {
        RigidBody::circle("player", BodyRole::Player, pos, 10.0, 1.0)
    }

    #[test]
    fn test_gate_fails_with_radius_only() {
        let model = HullModel::brigantine();
        let pose = Pose::new(Vec2::new(500.0, 500.0), 0.4);
        let near = pose.local_to_world(model.ladder.center + Vec2::new(0.0, 20.0));
        let gate = evaluate_boarding_gate(&model.ladder, pose, near, Some(pose.local_to_world(Vec2::ZERO)), &BoardingTuning::default());
        assert!(gate.within_radius);
        assert!(!gate.hovering_ladder);
        assert!(!gate.passes());
    }

    #[test]
    fn test_gate_fails_with_hover_only() {
        let model = HullModel::brigantine();
        let pose = Pose::new(Vec2::new(500.0, 500.0), 0.4);
        let far = pose.local_to_world(model.ladder.center + Vec2::new(0.0, 200.0));
        let pointer = pose.local_to_world(model.ladder.center);
        let gate = evaluate_boarding_gate(&model.ladder, pose, far, Some(pointer), &BoardingTuning::default());
        assert!(!gate.within_radius);
        assert!(gate.hovering_ladder);
        assert!(!gate.passes());
    }

    #[test]
    fn test_gate_passes_with_both() {
        let model = HullModel::brigantine();
        let pose = Pose::new(Vec2::new(500.0, 500.0), 0.4);
        let near = pose.local_to_world(model.ladder.water_exit);
        let pointer = pose.local_to_world(model.ladder.center + Vec2::new(3.0, -2.0));
        let gate = evaluate_boarding_gate(&model.ladder, pose, near, Some(pointer), &BoardingTuning::default());
        assert!(gate.passes());
        // No pointer: never hovering
        let gate = evaluate_boarding_gate(&model.ladder, pose, near, None, &BoardingTuning::default());
        assert!(!gate.passes());
    }

    #[test]
    fn test_board_and_unboard_are_symmetric() {
        let hull = ship_at(Vec2::new(100.0, 0.0), 0.0);
        let mut actor = player(Vec2::ZERO);
        let mut state = BoardingState::default();
        state.board(&mut actor, &hull, Vec2::new(0.0, 10.0));
        assert!(state.is_boarded());
        assert_eq!(state.hull(), Some(BodyId(7)));
        assert!((actor.pos - Vec2::new(100.0, 10.0)).length() < 1e-5);
        let left = state.unboard().unwrap();
        assert_eq!(left.hull, BodyId(7));
        assert!(!state.is_boarded());
        assert!(state.unboard().is_none());
    }

    #[test]
    fn test_carry_follows_translation_and_rotation() {
        let mut hull = ship_at(Vec2::ZERO, 0.0);
        let mut actor = player(Vec2::ZERO);
        let mut state = BoardingState::default();
        state.board(&mut actor, &hull, Vec2::new(50.0, 0.0));

        // Hull moves and turns a quarter; actor did not move on its own
        hull.pos = Vec2::new(10.0, 5.0);
        hull.angle = std::f32::consts::FRAC_PI_2;
        let boarded = state.boarded_mut().unwrap();
        carry_boarded_actor(boarded, &mut actor, &hull, &BoardingTuning::default(), |_| true);
        assert!((actor.pos - Vec2::new(10.0, 55.0)).length() < 1e-4);
        assert!((boarded.local_offset - Vec2::new(50.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_carry_keeps_own_motion_in_hull_frame() {
        let hull = ship_at(Vec2::ZERO, 0.0);
        let mut actor = player(Vec2::ZERO);
        let mut state = BoardingState::default();
        state.board(&mut actor, &hull, Vec2::ZERO);

        // Actor walked 3 units this step
        actor.pos += Vec2::new(3.0, 0.0);
        actor.vel = Vec2::new(180.0, 0.0);
        let boarded = state.boarded_mut().unwrap();
        carry_boarded_actor(boarded, &mut actor, &hull, &BoardingTuning::default(), |_| true);
        assert!((boarded.local_offset.x - 3.0).abs() < 1e-5);
        assert_eq!(boarded.own_velocity, Vec2::new(180.0, 0.0));
    }

    #[test]
    fn test_carry_rejects_step_off_deck() {
        let hull = ship_at(Vec2::ZERO, 0.0);
        let mut actor = player(Vec2::ZERO);
        let mut state = BoardingState::default();
        state.board(&mut actor, &hull, Vec2::new(0.0, 35.0));

        actor.pos += Vec2::new(0.0, 10.0);
        actor.vel = Vec2::new(0.0, 200.0);
        let boarded = state.boarded_mut().unwrap();
        carry_boarded_actor(boarded, &mut actor, &hull, &BoardingTuning::default(), |local| local.y < 40.0);
        assert!((actor.pos - Vec2::new(0.0, 35.0)).length() < 1e-5);
        assert_eq!(boarded.own_velocity, Vec2::ZERO);
    }

    #[test]
    fn test_velocity_blend_keeps_majority_control() {
        let mut hull = ship_at(Vec2::ZERO, 0.0);
        hull.vel = Vec2::new(0.0, 100.0);
        let mut actor = player(Vec2::ZERO);
        let mut state = BoardingState::default();
        state.board(&mut actor, &hull, Vec2::ZERO);
        actor.vel = Vec2::new(200.0, 0.0);
        let boarded = state.boarded_mut().unwrap();
        carry_boarded_actor(boarded, &mut actor, &hull, &BoardingTuning::default(), |_| true);
        assert!((actor.vel - Vec2::new(140.0, 30.0)).length() < 1e-3);

        restore_own_velocity(boarded, &mut actor);
        assert_eq!(actor.vel, Vec2::new(200.0, 0.0));
    }
}
