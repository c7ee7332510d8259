//! Game-side body records
//!
//! `PhysicsWorld` mirrors each record into a rapier rigid body and collider,
//! pushing the record before a step and pulling the result back after it.
//! Bodies carry an explicit `BodyRole`; the `label` string is only used for
//! diagnostics and as the key of collision records.

use glam::Vec2;
use rapier2d::geometry::{Group, InteractionGroups};
use serde::{Deserialize, Serialize};

use super::geometry::{Aabb, Pose, circle_polygon, convex_hull};

/// Stable handle into the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Logical role of a body, used for all control-flow decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyRole {
    Player,
    Ship,
    Plank { ship: BodyId, index: usize },
    Scenery,
}

impl BodyRole {
    pub fn is_plank(&self) -> bool {
        matches!(self, BodyRole::Plank { .. })
    }
}

/// Collision layers
pub mod category {
    use rapier2d::geometry::Group;

    pub const PLAYER: Group = Group::GROUP_1;
    pub const SHIP: Group = Group::GROUP_2;
    pub const PLANK: Group = Group::GROUP_3;
    pub const SCENERY: Group = Group::GROUP_4;
    pub const ALL: Group = Group::ALL;
}

/// Which bodies may be tested against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub groups: InteractionGroups,
    /// Bodies of one assembly (a hull and its planks) never collide with
    /// each other, whatever their groups say
    pub assembly: Option<BodyId>,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            groups: InteractionGroups::all(),
            assembly: None,
        }
    }
}

impl CollisionFilter {
    pub fn new(memberships: Group, filter: Group) -> Self {
        Self {
            groups: InteractionGroups::new(memberships, filter),
            assembly: None,
        }
    }

    pub fn in_assembly(mut self, root: BodyId) -> Self {
        self.assembly = Some(root);
        self
    }

    pub fn can_collide(&self, other: &CollisionFilter) -> bool {
        if self.assembly.is_some() && self.assembly == other.assembly {
            return false;
        }
        self.groups.test(other.groups)
    }
}

/// Collision shape in the body's local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Polygon { vertices: Vec<Vec2> },
}

/// A simulated body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub id: BodyId,
    /// Diagnostic name ("player", "brigantine", "brigantine_plank_3")
    pub label: String,
    pub role: BodyRole,
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    pub angular_vel: f32,
    pub shape: Shape,
    /// Fixed when the body is registered
    pub mass: f32,
    /// Fixed when the body is registered
    pub inertia: f32,
    /// Linear damping coefficient (1/s)
    pub drag: f32,
    /// Angular damping coefficient (1/s)
    pub angular_drag: f32,
    pub filter: CollisionFilter,
    pub is_static: bool,
    /// Force accumulated for the next step
    #[serde(skip)]
    pub force: Vec2,
    #[serde(skip)]
    pub torque: f32,
}

impl RigidBody {
    pub fn circle(label: impl Into<String>, role: BodyRole, pos: Vec2, radius: f32, mass: f32) -> Self {
        let mass = mass.max(1e-3);
        Self {
            id: BodyId(0),
            label: label.into(),
            role,
            pos,
            vel: Vec2::ZERO,
            angle: 0.0,
            angular_vel: 0.0,
            shape: Shape::Circle { radius },
            mass,
            inertia: 0.5 * mass * radius * radius,
            drag: 0.0,
            angular_drag: 0.0,
            filter: CollisionFilter::default(),
            is_static: false,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    pub fn polygon(
        label: impl Into<String>,
        role: BodyRole,
        pos: Vec2,
        vertices: Vec<Vec2>,
        mass: f32,
    ) -> Self {
        let mass = mass.max(1e-3);
        let inertia = match Aabb::from_points(&vertices) {
            Some(b) => mass * (b.width() * b.width() + b.height() * b.height()) / 12.0,
            None => mass,
        };
        Self {
            id: BodyId(0),
            label: label.into(),
            role,
            pos,
            vel: Vec2::ZERO,
            angle: 0.0,
            angular_vel: 0.0,
            shape: Shape::Polygon { vertices },
            mass,
            inertia: inertia.max(1e-3),
            drag: 0.0,
            angular_drag: 0.0,
            filter: CollisionFilter::default(),
            is_static: false,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_drag(mut self, drag: f32, angular_drag: f32) -> Self {
        self.drag = drag;
        self.angular_drag = angular_drag;
        self
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.pos, self.angle)
    }

    /// Radius for circles, None for polygons
    pub fn circle_radius(&self) -> Option<f32> {
        match self.shape {
            Shape::Circle { radius } => Some(radius),
            Shape::Polygon { .. } => None,
        }
    }

    /// Polygon vertices in world space (empty for circles)
    pub fn world_vertices(&self) -> Vec<Vec2> {
        match &self.shape {
            Shape::Circle { .. } => Vec::new(),
            Shape::Polygon { vertices } => {
                let pose = self.pose();
                vertices.iter().map(|&v| pose.local_to_world(v)).collect()
            }
        }
    }

    /// Convex polygon approximation in world space
    pub fn convex_approximation(&self, circle_sides: usize) -> Vec<Vec2> {
        match &self.shape {
            Shape::Circle { radius } => circle_polygon(self.pos, *radius, circle_sides),
            Shape::Polygon { .. } => convex_hull(&self.world_vertices()),
        }
    }

    /// World-space bounds
    pub fn bounds(&self) -> Aabb {
        match &self.shape {
            Shape::Circle { radius } => Aabb::from_circle(self.pos, *radius),
            Shape::Polygon { .. } => Aabb::from_points(&self.world_vertices())
                .unwrap_or_else(|| Aabb::from_circle(self.pos, 0.0)),
        }
    }

    /// Half extents of the shape in its own (unrotated) frame
    pub fn local_half_extents(&self) -> Vec2 {
        match &self.shape {
            Shape::Circle { radius } => Vec2::splat(*radius),
            Shape::Polygon { vertices } => Aabb::from_points(vertices)
                .map(|b| b.half_extents())
                .unwrap_or(Vec2::ZERO),
        }
    }

    /// Velocity of a world-space point rigidly attached to this body
    pub fn point_velocity(&self, world_point: Vec2) -> Vec2 {
        let r = world_point - self.pos;
        self.vel + r.perp() * self.angular_vel
    }

    pub fn apply_force(&mut self, force: Vec2) {
        if force.is_finite() {
            self.force += force;
        }
    }

    pub fn apply_torque(&mut self, torque: f32) {
        if torque.is_finite() {
            self.torque += torque;
        }
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}
