//! Tiered collision detection between an actor and a hull
//!
//! The physics world's own narrow phase occasionally misses contacts between a
//! small fast actor and a large hull. Detection therefore falls back through
//! progressively looser tests, each only running if the previous one found
//! nothing:
//! 1. native overlap query
//! 2. separating-axis test on convex approximations
//! 3. buffered bounding-box gate (no overlap here ends the search)
//! 4. direction-dependent radius heuristic
//!
//! Every tier produces the same `CollisionOutcome`, so consumers never need to
//! know which one fired.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, RigidBody};
use super::geometry::{Aabb, SatResult, separating_axis_test, support_point};
use super::world::{Contact, OverlapQuery, PhysicsWorld};
use crate::tuning::DetectorTuning;
use crate::{DebugContext, normalize_or_fallback};

/// Which detection tier produced a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionTier {
    Native,
    SeparatingAxis,
    DirectionalRadius,
}

/// A detected contact between two bodies. The normal points from `body_a`
/// toward `body_b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOutcome {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub contact: Contact,
    pub tier: DetectionTier,
}

/// Orderless key built from two body labels
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey(String, String);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_owned(), b.to_owned())
        } else {
            Self(b.to_owned(), a.to_owned())
        }
    }
}

/// Last collision seen between a label pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionRecord {
    pub key: PairKey,
    pub depth: f32,
    pub point: Vec2,
    pub normal: Vec2,
    pub timestamp_ms: f64,
    pub tier: DetectionTier,
}

/// Contact point kept for the debug overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionPoint {
    pub point: Vec2,
    pub timestamp_ms: f64,
}

/// Per-tier counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorStats {
    pub native_queries: u64,
    pub native_hits: u64,
    pub sat_runs: u64,
    pub aabb_runs: u64,
    pub radius_runs: u64,
    pub sweeps: u64,
}

/// Fallback detector and owner of the collision history
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    tuning: DetectorTuning,
    records: HashMap<PairKey, CollisionRecord>,
    points: Vec<CollisionPoint>,
    last_sweep_ms: Option<f64>,
    stats: DetectorStats,
}

impl CollisionDetector {
    pub fn new(tuning: DetectorTuning) -> Self {
        Self {
            tuning,
            records: HashMap::new(),
            points: Vec::new(),
            last_sweep_ms: None,
            stats: DetectorStats::default(),
        }
    }

    pub fn tuning(&self) -> &DetectorTuning {
        &self.tuning
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    /// Full tiered detection between an actor and a hull
    pub fn detect(
        &mut self,
        native: &impl OverlapQuery,
        actor: Option<&RigidBody>,
        hull: Option<&RigidBody>,
        debug: &DebugContext,
    ) -> Option<CollisionOutcome> {
        let (Some(actor), Some(hull)) = (actor, hull) else {
            log::warn!("Collision check skipped: missing body reference");
            return None;
        };
        if !actor.filter.can_collide(&hull.filter) {
            return None;
        }

        self.stats.native_queries += 1;
        if let Some(contact) = native.query_overlap(actor, hull) {
            self.stats.native_hits += 1;
            if debug.log_contacts {
                log::debug!(
                    "Native contact '{}' / '{}' depth {:.2}",
                    actor.label,
                    hull.label,
                    contact.depth
                );
            }
            return Some(CollisionOutcome {
                body_a: actor.id,
                body_b: hull.id,
                contact,
                tier: DetectionTier::Native,
            });
        }

        self.detect_fallback(actor, hull, debug)
    }

    /// Tiers 2-4 only, for pairs the native step already reported as clear
    pub fn detect_fallback(
        &mut self,
        actor: &RigidBody,
        hull: &RigidBody,
        debug: &DebugContext,
    ) -> Option<CollisionOutcome> {
        if let Some(contact) = self.separating_axis_tier(actor, hull) {
            if debug.log_contacts {
                log::debug!(
                    "SAT fallback contact '{}' / '{}' depth {:.2}",
                    actor.label,
                    hull.label,
                    contact.depth
                );
            }
            return Some(CollisionOutcome {
                body_a: actor.id,
                body_b: hull.id,
                contact,
                tier: DetectionTier::SeparatingAxis,
            });
        }

        if !self.buffered_bounds_tier(actor, hull) {
            return None;
        }

        let contact = self.directional_radius_tier(actor, hull)?;
        if debug.log_contacts {
            log::debug!(
                "Radius fallback contact '{}' / '{}' depth {:.2}",
                actor.label,
                hull.label,
                contact.depth
            );
        }
        Some(CollisionOutcome {
            body_a: actor.id,
            body_b: hull.id,
            contact,
            tier: DetectionTier::DirectionalRadius,
        })
    }

    /// Tier 2: SAT on convex approximations. `None` when separated or when
    /// either shape has fewer than three vertices.
    fn separating_axis_tier(&mut self, actor: &RigidBody, hull: &RigidBody) -> Option<Contact> {
        let va = actor.convex_approximation(self.tuning.circle_sides);
        let vb = hull.convex_approximation(self.tuning.circle_sides);
        if va.len() < 3 || vb.len() < 3 {
            return None;
        }
        self.stats.sat_runs += 1;

        match separating_axis_test(&va, &vb)? {
            SatResult::Separated { .. } => None,
            SatResult::Overlap { depth, normal } => {
                let point = contact_point(actor, hull, normal, 0.0);
                Some(Contact {
                    depth,
                    normal,
                    point,
                })
            }
        }
    }

    /// Tier 3: does the actor's buffered box touch the hull's box at all?
    fn buffered_bounds_tier(&mut self, actor: &RigidBody, hull: &RigidBody) -> bool {
        self.stats.aabb_runs += 1;
        let actor_box: Aabb = actor.bounds().expand(self.tuning.aabb_buffer);
        actor_box.overlaps(&hull.bounds())
    }

    /// Tier 4: centre distance against a direction-dependent contact radius
    fn directional_radius_tier(&mut self, actor: &RigidBody, hull: &RigidBody) -> Option<Contact> {
        self.stats.radius_runs += 1;

        let delta = actor.pos - hull.pos;
        let distance = delta.length();
        // Unit vector from hull to actor
        let dir = normalize_or_fallback(delta, Vec2::X);

        let hull_radius = directional_radius(hull, dir);
        let actor_radius = actor
            .circle_radius()
            .unwrap_or_else(|| actor.local_half_extents().max_element());

        let threshold = (actor_radius + hull_radius) * self.tuning.radius_buffer;
        if distance >= threshold {
            return None;
        }

        let depth = (threshold - distance).min(threshold * self.tuning.heuristic_depth_cap);
        // From actor toward hull
        let normal = -dir;
        let point = contact_point(actor, hull, normal, hull_radius);
        Some(Contact {
            depth,
            normal,
            point,
        })
    }

    /// Store (overwrite) the record for a label pair
    pub fn record(
        &mut self,
        label_a: &str,
        label_b: &str,
        outcome: &CollisionOutcome,
        now_ms: f64,
        debug: &DebugContext,
    ) {
        let key = PairKey::new(label_a, label_b);
        self.records.insert(
            key.clone(),
            CollisionRecord {
                key,
                depth: outcome.contact.depth,
                point: outcome.contact.point,
                normal: outcome.contact.normal,
                timestamp_ms: now_ms,
                tier: outcome.tier,
            },
        );
        if debug.record_points {
            self.points.push(CollisionPoint {
                point: outcome.contact.point,
                timestamp_ms: now_ms,
            });
        }
    }

    /// A record for the pair exists and is younger than the freshness window
    pub fn has_recent_collision(&self, label_a: &str, label_b: &str, now_ms: f64) -> bool {
        self.records
            .get(&PairKey::new(label_a, label_b))
            .is_some_and(|r| now_ms - r.timestamp_ms < self.tuning.freshness_window_ms)
    }

    /// Most recent record for the pair, regardless of age
    pub fn last_collision(&self, label_a: &str, label_b: &str) -> Option<&CollisionRecord> {
        self.records.get(&PairKey::new(label_a, label_b))
    }

    pub fn records(&self) -> impl Iterator<Item = &CollisionRecord> {
        self.records.values()
    }

    /// Debug contact points younger than the point lifetime
    pub fn collision_points(&self) -> &[CollisionPoint] {
        &self.points
    }

    /// Drop debug points older than their lifetime
    pub fn prune_points(&mut self, now_ms: f64) {
        let lifetime = self.tuning.point_lifetime_ms;
        self.points.retain(|p| now_ms - p.timestamp_ms <= lifetime);
    }

    pub fn sweep_due(&self, now_ms: f64) -> bool {
        match self.last_sweep_ms {
            None => true,
            Some(last) => now_ms - last >= self.tuning.sweep_interval_ms,
        }
    }

    /// Time-gated fallback sweep over tracked (actor, hull) pairs.
    ///
    /// Pairs in `skip` (natively reported this step) and pairs with a recent
    /// record are not re-tested.
    pub fn sweep(
        &mut self,
        world: &PhysicsWorld,
        pairs: &[(BodyId, BodyId)],
        skip: &[(BodyId, BodyId)],
        now_ms: f64,
        debug: &DebugContext,
    ) -> Vec<CollisionOutcome> {
        if !self.sweep_due(now_ms) {
            return Vec::new();
        }
        self.last_sweep_ms = Some(now_ms);
        self.stats.sweeps += 1;

        let mut found = Vec::new();
        for &(actor_id, hull_id) in pairs {
            if skip
                .iter()
                .any(|&(a, b)| (a == actor_id && b == hull_id) || (a == hull_id && b == actor_id))
            {
                continue;
            }
            let (Some(actor), Some(hull)) = (world.get(actor_id), world.get(hull_id)) else {
                log::warn!("Sweep skipped pair {actor_id:?}/{hull_id:?}: body missing");
                continue;
            };
            if !actor.filter.can_collide(&hull.filter) {
                continue;
            }
            if self.has_recent_collision(&actor.label, &hull.label, now_ms) {
                continue;
            }
            if let Some(outcome) = self.detect_fallback(actor, hull, debug) {
                found.push(outcome);
            }
        }
        found
    }
}

/// Weighted blend of the hull's half-width and half-height along `dir`
/// (a world-space unit vector from the hull toward the actor)
fn directional_radius(hull: &RigidBody, dir: Vec2) -> f32 {
    let half = hull.local_half_extents();
    let local = hull.pose().dir_to_local(dir).abs();
    let total = local.x + local.y;
    if total < 1e-6 {
        return half.x.max(half.y);
    }
    (half.x * local.x + half.y * local.y) / total
}

/// Vertex (of either body) reaching furthest along the normal from its own
/// centre: the actor's toward the hull, the hull's toward the actor. Falls
/// back to a point offset from the hull centre toward the actor.
fn contact_point(actor: &RigidBody, hull: &RigidBody, normal: Vec2, fallback_offset: f32) -> Vec2 {
    let from_actor = support_point(&actor.world_vertices(), actor.pos, normal);
    let from_hull = support_point(&hull.world_vertices(), hull.pos, -normal);
    match (from_actor, from_hull) {
        (Some(a), Some(h)) => {
            if a.1 >= h.1 {
                a.0
            } else {
                h.0
            }
        }
        (Some(a), None) => a.0,
        (None, Some(h)) => h.0,
        (None, None) => hull.pos - normal * fallback_offset,
    }
}
