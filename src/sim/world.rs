//! Physics world: a body registry over rapier
//!
//! Game code reads and writes `RigidBody` records. Each record is mirrored
//! into a rapier rigid body plus collider: `step` pushes the records in, runs
//! the pipeline and pulls positions and velocities back out. Rapier solves
//! ship, plank and scenery contacts itself. Pairs involving a player are
//! detected but left unsolved; the game resolves those through the contact
//! events reported here.

use std::collections::HashSet;
use std::fmt;

use crossbeam_channel::Receiver;
use glam::Vec2;
use rapier2d::parry::mass_properties::MassProperties;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, BodyRole, RigidBody, Shape};
use super::geometry::{Aabb, is_convex, signed_area};

/// Contact between two bodies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Penetration depth (>= 0)
    pub depth: f32,
    /// Unit normal pointing from the first body toward the second
    pub normal: Vec2,
    /// World-space contact point
    pub point: Vec2,
}

impl Contact {
    /// Same contact seen from the other body
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Native contact reported by `PhysicsWorld::step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub a: BodyId,
    pub b: BodyId,
    pub contact: Contact,
    /// True on the first step the pair overlaps
    pub started: bool,
}

/// Narrow-phase overlap query
pub trait OverlapQuery {
    fn query_overlap(&self, a: &RigidBody, b: &RigidBody) -> Option<Contact>;
}

/// World units (pixels) per rapier length unit; scales solver tolerances
const PIXELS_PER_METER: f32 = 50.0;

const BODY_ID_MASK: u128 = 0xFFFF_FFFF;
const ASSEMBLY_SHIFT: u32 = 32;
const GAME_RESOLVED: u128 = 1 << 64;

/// Collider user data: body id, assembly root + 1, game-resolved flag
fn pack_user_data(body: &RigidBody) -> u128 {
    let assembly = body.filter.assembly.map_or(0, |root| u128::from(root.0) + 1);
    let resolved = if body.role == BodyRole::Player { GAME_RESOLVED } else { 0 };
    u128::from(body.id.0) | (assembly << ASSEMBLY_SHIFT) | resolved
}

fn body_id_of(user_data: u128) -> BodyId {
    BodyId((user_data & BODY_ID_MASK) as u32)
}

fn assembly_of(user_data: u128) -> u128 {
    (user_data >> ASSEMBLY_SHIFT) & BODY_ID_MASK
}

/// Drops pairs inside one assembly and keeps the solver off player pairs
struct AssemblyHooks;

impl AssemblyHooks {
    fn same_assembly(context: &PairFilterContext) -> Option<bool> {
        let a = assembly_of(context.colliders.get(context.collider1)?.user_data);
        let b = assembly_of(context.colliders.get(context.collider2)?.user_data);
        Some(a != 0 && a == b)
    }
}

impl PhysicsHooks for AssemblyHooks {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if Self::same_assembly(context).unwrap_or(true) {
            return None;
        }
        let a = context.colliders.get(context.collider1)?.user_data;
        let b = context.colliders.get(context.collider2)?.user_data;
        if (a | b) & GAME_RESOLVED != 0 {
            Some(SolverFlags::empty())
        } else {
            Some(SolverFlags::COMPUTE_IMPULSES)
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        !Self::same_assembly(context).unwrap_or(true)
    }
}

/// Rapier handles backing one record
#[derive(Debug, Clone, Copy)]
struct BodyLink {
    body: RigidBodyHandle,
    collider: ColliderHandle,
}

/// Body registry over a rapier pipeline
pub struct PhysicsWorld {
    /// Bodies sorted by id for deterministic iteration
    bodies: Vec<RigidBody>,
    /// Parallel to `bodies`
    links: Vec<BodyLink>,
    bounds: Option<Aabb>,
    next_id: u32,
    events: Vec<ContactEvent>,
    /// Pairs that were penetrating after the previous step
    active_pairs: HashSet<(BodyId, BodyId)>,

    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    hooks: AssemblyHooks,
    collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    force_events: Receiver<ContactForceEvent>,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("bodies", &self.bodies.len())
            .field("welds", &self.impulse_joints.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PhysicsWorld {
    pub fn new(bounds: Option<Aabb>) -> Self {
        let (collision_send, collision_events) = crossbeam_channel::unbounded();
        let (force_send, force_events) = crossbeam_channel::unbounded();
        Self {
            bodies: Vec::new(),
            links: Vec::new(),
            bounds,
            next_id: 1,
            events: Vec::new(),
            active_pairs: HashSet::new(),
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters {
                length_unit: PIXELS_PER_METER,
                ..IntegrationParameters::default()
            },
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            hooks: AssemblyHooks,
            collector: ChannelEventCollector::new(collision_send, force_send),
            collision_events,
            force_events,
        }
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Register a body, assigning it a fresh id
    pub fn add_body(&mut self, mut body: RigidBody) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        body.id = id;

        let builder = if body.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let handle = self.rigid_bodies.insert(
            builder
                .translation(vector![body.pos.x, body.pos.y])
                .rotation(body.angle)
                .linvel(vector![body.vel.x, body.vel.y])
                .angvel(body.angular_vel)
                .linear_damping(body.drag)
                .angular_damping(body.angular_drag)
                .can_sleep(false),
        );
        let collider = ColliderBuilder::new(collider_shape(&body))
            .mass_properties(MassProperties::new(Point::origin(), body.mass, body.inertia))
            .collision_groups(body.filter.groups)
            .active_hooks(ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(pack_user_data(&body));
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.rigid_bodies);

        log::debug!("Added body {:?} '{}'", id, body.label);
        self.bodies.push(body);
        self.links.push(BodyLink {
            body: handle,
            collider,
        });
        id
    }

    /// Remove a body with its collider and any weld that references it
    pub fn remove_body(&mut self, id: BodyId) -> Option<RigidBody> {
        let idx = self.index_of(id)?;
        let body = self.bodies.remove(idx);
        let link = self.links.remove(idx);
        self.rigid_bodies.remove(
            link.body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.active_pairs.retain(|&(a, b)| a != id && b != id);
        log::debug!("Removed body {:?} '{}'", id, body.label);
        Some(body)
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id).ok()
    }

    fn link(&self, id: BodyId) -> Option<BodyLink> {
        self.index_of(id).map(|i| self.links[i])
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.index_of(id).map(move |i| &mut self.bodies[i])
    }

    /// Mutable access to two distinct bodies at once
    pub fn get_pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut RigidBody, &mut RigidBody)> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (lo, hi) = self.bodies.split_at_mut(ib);
            Some((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.bodies.split_at_mut(ia);
            Some((&mut hi[0], &mut lo[ib]))
        }
    }

    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Weld `body` to `parent` at `local_anchor` / `local_angle` in the
    /// parent's frame. Welded bodies never touch each other.
    pub fn weld(&mut self, body: BodyId, parent: BodyId, local_anchor: Vec2, local_angle: f32) -> bool {
        let (Some(child), Some(parent_link)) = (self.link(body), self.link(parent)) else {
            log::warn!("Weld {body:?} -> {parent:?} skipped: body missing");
            return false;
        };
        let joint = FixedJointBuilder::new()
            .local_frame1(Isometry::new(vector![local_anchor.x, local_anchor.y], local_angle))
            .local_frame2(Isometry::identity())
            .contacts_enabled(false);
        self.impulse_joints
            .insert(parent_link.body, child.body, joint, true);
        true
    }

    pub fn weld_count(&self) -> usize {
        self.impulse_joints.len()
    }

    pub fn take_events(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if dt.is_nan() || dt <= 0.0 {
            log::warn!("Physics step skipped: dt {dt}");
            return;
        }
        self.params.dt = dt;
        self.push_state();
        self.pipeline.step(
            &vector![0.0, 0.0],
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &self.hooks,
            &self.collector,
        );
        self.pull_state();
        self.clamp_to_bounds();
        self.collect_contacts();
    }

    /// Copy game-side edits into rapier and hand over accumulated forces
    fn push_state(&mut self) {
        for (body, link) in self.bodies.iter_mut().zip(&self.links) {
            if let Some(rb) = self.rigid_bodies.get_mut(link.body) {
                rb.set_translation(vector![body.pos.x, body.pos.y], true);
                rb.set_rotation(Rotation::new(body.angle), true);
                rb.set_linvel(vector![body.vel.x, body.vel.y], true);
                rb.set_angvel(body.angular_vel, true);
                rb.set_linear_damping(body.drag);
                rb.set_angular_damping(body.angular_drag);
                rb.reset_forces(true);
                rb.reset_torques(true);
                rb.add_force(vector![body.force.x, body.force.y], true);
                rb.add_torque(body.torque, true);
            }
            if let Some(co) = self.colliders.get_mut(link.collider) {
                if co.collision_groups() != body.filter.groups {
                    co.set_collision_groups(body.filter.groups);
                }
                let data = pack_user_data(body);
                if co.user_data != data {
                    co.user_data = data;
                }
            }
            body.clear_forces();
        }
    }

    fn pull_state(&mut self) {
        for (body, link) in self.bodies.iter_mut().zip(&self.links) {
            let Some(rb) = self.rigid_bodies.get(link.body) else {
                continue;
            };
            let t = rb.translation();
            let v = rb.linvel();
            body.pos = Vec2::new(t.x, t.y);
            body.angle = crate::normalize_angle(rb.rotation().angle());
            body.vel = Vec2::new(v.x, v.y);
            body.angular_vel = rb.angvel();
        }
    }

    /// Keep bodies inside the world rectangle
    fn clamp_to_bounds(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        for body in &mut self.bodies {
            if body.is_static || body.role.is_plank() {
                continue;
            }
            let half = body.bounds().half_extents();
            let min = bounds.min + half;
            let max = bounds.max - half;
            if min.x > max.x || min.y > max.y {
                continue;
            }
            if body.pos.x < min.x || body.pos.x > max.x {
                body.pos.x = body.pos.x.clamp(min.x, max.x);
                body.vel.x = 0.0;
            }
            if body.pos.y < min.y || body.pos.y > max.y {
                body.pos.y = body.pos.y.clamp(min.y, max.y);
                body.vel.y = 0.0;
            }
        }
    }

    /// Turn this step's penetrating narrow-phase pairs into contact events
    fn collect_contacts(&mut self) {
        let mut fresh = HashSet::new();
        while let Ok(event) = self.collision_events.try_recv() {
            if event.started() {
                let a = self.colliders.get(event.collider1()).map(|c| c.user_data);
                let b = self.colliders.get(event.collider2()).map(|c| c.user_data);
                if let (Some(a), Some(b)) = (a, b) {
                    fresh.insert(ordered(body_id_of(a), body_id_of(b)));
                }
            }
        }
        while self.force_events.try_recv().is_ok() {}

        self.events.clear();
        let mut active = HashSet::with_capacity(self.active_pairs.len());
        for pair in self.narrow_phase.contact_pairs() {
            let Some(contact) = self.pair_contact(pair) else {
                continue;
            };
            let (Some(co1), Some(co2)) = (self.colliders.get(pair.collider1), self.colliders.get(pair.collider2))
            else {
                continue;
            };
            let (id1, id2) = (body_id_of(co1.user_data), body_id_of(co2.user_data));
            let key = ordered(id1, id2);
            let (a, b, contact) = if id1 <= id2 {
                (id1, id2, contact)
            } else {
                (id2, id1, contact.flipped())
            };
            self.events.push(ContactEvent {
                a,
                b,
                contact,
                started: fresh.contains(&key) || !self.active_pairs.contains(&key),
            });
            active.insert(key);
        }
        self.events.sort_by_key(|e| (e.a, e.b));
        self.active_pairs = active;
    }

    /// Deepest penetrating point of a pair, normal from collider1 to collider2
    fn pair_contact(&self, pair: &ContactPair) -> Option<Contact> {
        let co1 = self.colliders.get(pair.collider1)?;
        let mut best: Option<Contact> = None;
        for manifold in &pair.manifolds {
            let pos1 = match manifold.subshape_pos1 {
                Some(sub) => co1.position() * sub,
                None => *co1.position(),
            };
            let n = pos1 * manifold.local_n1;
            for point in &manifold.points {
                if point.dist >= 0.0 {
                    continue;
                }
                let depth = -point.dist;
                if best.is_some_and(|b| b.depth >= depth) {
                    continue;
                }
                let p = pos1 * point.local_p1;
                best = Some(Contact {
                    depth,
                    normal: Vec2::new(n.x, n.y).normalize_or_zero(),
                    point: Vec2::new(p.x, p.y),
                });
            }
        }
        best.filter(|c| c.normal != Vec2::ZERO)
    }
}

impl OverlapQuery for PhysicsWorld {
    /// Reads the narrow phase of the last step
    fn query_overlap(&self, a: &RigidBody, b: &RigidBody) -> Option<Contact> {
        let ca = self.link(a.id)?.collider;
        let cb = self.link(b.id)?.collider;
        let pair = self.narrow_phase.contact_pair(ca, cb)?;
        let contact = self.pair_contact(pair)?;
        Some(if pair.collider1 == ca { contact } else { contact.flipped() })
    }
}

fn ordered(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Rapier shape for a record; concave polygons are decomposed
fn collider_shape(body: &RigidBody) -> SharedShape {
    match &body.shape {
        Shape::Circle { radius } => SharedShape::ball(radius.max(1e-3)),
        Shape::Polygon { vertices } => {
            let usable = vertices.len() >= 3 && vertices.iter().all(|v| v.is_finite());
            if usable {
                let mut ccw = vertices.clone();
                if signed_area(&ccw) < 0.0 {
                    ccw.reverse();
                }
                let points: Vec<Point<Real>> = ccw.iter().map(|v| point![v.x, v.y]).collect();
                if is_convex(&ccw) {
                    if let Some(shape) = SharedShape::convex_polyline(points) {
                        return shape;
                    }
                } else {
                    let n = points.len() as u32;
                    let indices: Vec<[u32; 2]> = (0..n).map(|i| [i, (i + 1) % n]).collect();
                    return SharedShape::convex_decomposition(&points, &indices);
                }
            }
            let half = body.local_half_extents().max(Vec2::splat(0.5));
            log::warn!(
                "Body '{}' has a degenerate polygon, colliding as a {:.0}x{:.0} box",
                body.label,
                half.x * 2.0,
                half.y * 2.0
            );
            SharedShape::cuboid(half.x, half.y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::body::{CollisionFilter, category};
    use crate::sim::geometry::rectangle;

    fn swimmer(x: f32, y: f32) -> RigidBody {
        RigidBody::circle("swimmer", BodyRole::Player, Vec2::new(x, y), 10.0, 1.0)
    }

    fn crate_box(x: f32, y: f32) -> RigidBody {
        RigidBody::polygon("box", BodyRole::Ship, Vec2::new(x, y), rectangle(80.0, 30.0), 10.0)
    }

    #[test]
    fn test_add_remove_keeps_order() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(swimmer(0.0, 0.0));
        let b = world.add_body(swimmer(50.0, 0.0));
        let c = world.add_body(swimmer(100.0, 0.0));
        assert_eq!(world.len(), 3);
        assert!(world.remove_body(b).is_some());
        assert!(world.remove_body(b).is_none());
        assert!(world.get(a).is_some());
        assert_eq!(world.get(c).map(|body| body.pos.x), Some(100.0));
        world.step(SIM_DT);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_step_integrates_force_and_drag() {
        let mut world = PhysicsWorld::default();
        let id = world.add_body(swimmer(0.0, 0.0));
        world.get_mut(id).unwrap().apply_force(Vec2::new(60.0, 0.0));
        world.step(SIM_DT);
        let body = world.get(id).unwrap();
        assert!((body.vel.x - 1.0).abs() < 1e-3, "vel {:?}", body.vel);
        assert!(body.pos.x > 0.0);
        assert_eq!(body.force, Vec2::ZERO);

        let damped = world.add_body(swimmer(300.0, 0.0).with_drag(3.0, 0.0));
        world.get_mut(damped).unwrap().vel = Vec2::new(60.0, 0.0);
        world.step(SIM_DT);
        let vx = world.get(damped).unwrap().vel.x;
        assert!(vx < 60.0 && vx > 55.0, "vx {vx}");
    }

    #[test]
    fn test_zero_dt_is_ignored() {
        let mut world = PhysicsWorld::default();
        let id = world.add_body(swimmer(0.0, 0.0));
        world.get_mut(id).unwrap().vel = Vec2::new(60.0, 0.0);
        world.step(0.0);
        world.step(f32::NAN);
        assert_eq!(world.get(id).unwrap().pos, Vec2::ZERO);
    }

    #[test]
    fn test_circle_polygon_contact() {
        let mut world = PhysicsWorld::default();
        let p = world.add_body(swimmer(0.0, -20.0));
        let h = world.add_body(crate_box(0.0, 0.0));
        world.step(SIM_DT);
        let events = world.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].a, events[0].b), (p, h));
        assert!(events[0].started);
        let contact = events[0].contact;
        assert!((contact.depth - 5.0).abs() < 0.05, "depth {}", contact.depth);
        // From the swimmer (first) toward the box
        assert!(contact.normal.y > 0.9, "normal {:?}", contact.normal);

        world.step(SIM_DT);
        let events = world.take_events();
        assert_eq!(events.len(), 1);
        assert!(!events[0].started);
    }

    #[test]
    fn test_player_contacts_are_left_to_the_game() {
        let mut world = PhysicsWorld::default();
        let p = world.add_body(swimmer(0.0, -20.0));
        let h = world.add_body(crate_box(0.0, 0.0));
        for _ in 0..5 {
            world.step(SIM_DT);
        }
        assert_eq!(world.get(p).unwrap().vel, Vec2::ZERO);
        assert_eq!(world.get(h).unwrap().vel, Vec2::ZERO);
    }

    #[test]
    fn test_ship_contacts_are_solved() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(crate_box(0.0, 0.0));
        let b = world.add_body(crate_box(0.0, 25.0));
        for _ in 0..60 {
            world.step(SIM_DT);
        }
        let gap = world.get(b).unwrap().pos.y - world.get(a).unwrap().pos.y;
        assert!(gap > 28.0, "gap {gap}");
    }

    #[test]
    fn test_filtered_pairs_are_skipped() {
        let mut world = PhysicsWorld::default();
        world.add_body(swimmer(0.0, -20.0).with_filter(CollisionFilter::new(category::PLAYER, category::SCENERY)));
        world.add_body(crate_box(0.0, 0.0).with_filter(CollisionFilter::new(category::SHIP, category::ALL)));
        world.step(SIM_DT);
        assert!(world.take_events().is_empty());
    }

    #[test]
    fn test_same_assembly_pairs_are_skipped() {
        let mut world = PhysicsWorld::default();
        let root = world.add_body(crate_box(0.0, 0.0));
        let filter = CollisionFilter::default().in_assembly(root);
        world.get_mut(root).unwrap().filter = filter;
        let part = world.add_body(crate_box(0.0, 10.0).with_filter(filter));
        world.step(SIM_DT);
        assert!(world.take_events().is_empty());
        let (a, b) = (world.get(root).unwrap().clone(), world.get(part).unwrap().clone());
        assert!(world.query_overlap(&a, &b).is_none());
    }

    #[test]
    fn test_weld_follows_parent() {
        let mut world = PhysicsWorld::default();
        let parent = world.add_body(crate_box(0.0, 0.0));
        let rivet = RigidBody::circle("rivet", BodyRole::Scenery, Vec2::new(20.0, 0.0), 2.0, 1.0);
        let child = world.add_body(rivet);
        assert!(world.weld(child, parent, Vec2::new(20.0, 0.0), 0.0));
        assert!(!world.weld(child, BodyId(99), Vec2::ZERO, 0.0));
        assert_eq!(world.weld_count(), 1);

        world.get_mut(parent).unwrap().vel = Vec2::new(60.0, 0.0);
        for _ in 0..30 {
            world.step(SIM_DT);
        }
        let parent_pos = world.get(parent).unwrap().pos;
        let child_pos = world.get(child).unwrap().pos;
        assert!(parent_pos.x > 10.0);
        assert!((child_pos - (parent_pos + Vec2::new(20.0, 0.0))).length() < 1.0);

        world.remove_body(parent);
        assert_eq!(world.weld_count(), 0);
    }

    #[test]
    fn test_bounds_clamp() {
        let mut world = PhysicsWorld::new(Some(Aabb::new(Vec2::ZERO, Vec2::splat(100.0))));
        let id = world.add_body(swimmer(95.0, 50.0));
        world.get_mut(id).unwrap().vel = Vec2::new(120.0, 0.0);
        world.step(SIM_DT);
        let body = world.get(id).unwrap();
        assert!((body.pos.x - 90.0).abs() < 1e-4);
        assert_eq!(body.vel.x, 0.0);
    }

    #[test]
    fn test_query_overlap_reads_last_step() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(swimmer(0.0, -24.0));
        let b = world.add_body(crate_box(0.0, 0.0));
        let (ra, rb) = (world.get(a).unwrap().clone(), world.get(b).unwrap().clone());
        assert!(world.query_overlap(&ra, &rb).is_none());

        world.step(SIM_DT);
        let forward = world.query_overlap(&ra, &rb).expect("overlap after step");
        assert!((forward.depth - 1.0).abs() < 0.05);
        assert!(forward.normal.y > 0.9);
        let backward = world.query_overlap(&rb, &ra).expect("overlap after step");
        assert!(backward.normal.y < -0.9);

        let stranger = swimmer(0.0, -24.0);
        assert!(world.query_overlap(&stranger, &rb).is_none());
    }
}
