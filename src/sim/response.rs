//! Actor-vs-hull collision response
//!
//! Not a general contact solver: the lighter body is corrected hard and the
//! heavier one barely moves, so a big hull feels immovable to the player.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::RigidBody;
use super::world::Contact;
use crate::normalize_or_fallback;
use crate::tuning::ResponseTuning;

/// Fire-and-forget requests for the renderer and audio host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    ImpactEffect { point: Vec2, size: f32 },
    ScreenFlash { color: [f32; 3], duration_ms: f32 },
    Sound { effect: SoundEffect, volume: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundEffect {
    HullImpact,
    Board,
    Unboard,
}

/// Flash colour for heavy impacts (warm white)
const IMPACT_FLASH_COLOR: [f32; 3] = [1.0, 0.95, 0.85];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseBranch {
    Approaching,
    Separating,
}

/// What a response did, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseReport {
    pub branch: ResponseBranch,
    /// Relative normal velocity before the response (negative = approaching)
    pub relative_normal_velocity: f32,
    /// Velocity correction given to the lighter body
    pub impulse: f32,
    /// Force magnitude split between the bodies
    pub force: f32,
    /// Angular velocity nudge given to the hull
    pub spin: f32,
}

/// Sub-linear, clamped force magnitude for a penetration depth
pub fn separation_force_magnitude(depth: f32, heavy_mass: f32, tuning: &ResponseTuning) -> f32 {
    if !depth.is_finite() || depth <= 0.0 {
        return 0.0;
    }
    let factor = depth.powf(tuning.depth_exponent).min(tuning.depth_factor_cap);
    (tuning.force_scale * factor * heavy_mass).min(tuning.max_force)
}

/// Resolve one actor-vs-hull contact.
///
/// `contact.normal` points from the actor toward the hull, as produced by the
/// detector. Velocity corrections are applied immediately, forces are
/// accumulated for the next physics step.
pub fn apply_collision_response(
    actor: &mut RigidBody,
    hull: &mut RigidBody,
    contact: &Contact,
    tuning: &ResponseTuning,
    events: &mut Vec<GameEvent>,
) -> ResponseReport {
    // Work with the normal pointing from the hull toward the actor
    let n = -normalize_or_fallback(contact.normal, normalize_or_fallback(hull.pos - actor.pos, Vec2::X));
    let rel_vel = actor.vel - hull.vel;
    let rel = rel_vel.dot(n);

    let heavy_mass = actor.mass.max(hull.mass);
    let light_mass = actor.mass.min(hull.mass);
    let actor_is_light = actor.mass <= hull.mass;

    let (branch, impulse, force) = if rel < 0.0 {
        let impulse = (-rel * (1.0 + tuning.restitution)).min(tuning.max_impulse);
        let counter = impulse * (light_mass / heavy_mass) * tuning.counter_share;
        let (actor_dv, hull_dv) = if actor_is_light {
            (impulse, counter)
        } else {
            (counter, impulse)
        };
        if !actor.is_static {
            actor.vel += n * actor_dv;
        }
        if !hull.is_static {
            hull.vel -= n * hull_dv;
        }
        (
            ResponseBranch::Approaching,
            impulse,
            separation_force_magnitude(contact.depth, heavy_mass, tuning),
        )
    } else {
        (
            ResponseBranch::Separating,
            0.0,
            separation_force_magnitude(contact.depth, heavy_mass, tuning) * tuning.stabilize_factor,
        )
    };

    split_force(actor, hull, n, force, actor_is_light, tuning.light_share);

    let mut spin = 0.0;
    if force >= tuning.torque_threshold && !hull.is_static {
        let offset = contact.point - hull.pos;
        let ratio = light_mass / heavy_mass;
        spin = (offset.perp_dot(rel_vel) * tuning.torque_factor * ratio)
            .clamp(-tuning.max_spin, tuning.max_spin);
        if spin.is_finite() {
            hull.angular_vel += spin;
        } else {
            spin = 0.0;
        }
    }

    if branch == ResponseBranch::Approaching {
        emit_impact_events(-rel, impulse * light_mass, contact.point, tuning, events);
    }

    ResponseReport {
        branch,
        relative_normal_velocity: rel,
        impulse,
        force,
        spin,
    }
}

/// Push an actor out of a hull by penetration depth alone (no velocity change)
pub fn apply_separation_force(actor: &mut RigidBody, hull: &mut RigidBody, depth: f32, tuning: &ResponseTuning) -> f32 {
    let n = normalize_or_fallback(actor.pos - hull.pos, Vec2::X);
    let force = separation_force_magnitude(depth, actor.mass.max(hull.mass), tuning);
    split_force(actor, hull, n, force, actor.mass <= hull.mass, tuning.light_share);
    force
}

/// Split `force` between the bodies along `n` (hull toward actor), the
/// lighter body taking `light_share`
fn split_force(actor: &mut RigidBody, hull: &mut RigidBody, n: Vec2, force: f32, actor_is_light: bool, light_share: f32) {
    if force <= 0.0 {
        return;
    }
    let light = force * light_share;
    let heavy = force - light;
    let (actor_f, hull_f) = if actor_is_light { (light, heavy) } else { (heavy, light) };
    if !actor.is_static {
        actor.apply_force(n * actor_f);
    }
    if !hull.is_static {
        hull.apply_force(-n * hull_f);
    }
}

/// Effects are gated on approach speed and scaled by impact momentum
fn emit_impact_events(
    approach_speed: f32,
    momentum: f32,
    point: Vec2,
    tuning: &ResponseTuning,
    events: &mut Vec<GameEvent>,
) {
    if approach_speed < tuning.effect_threshold || !momentum.is_finite() {
        return;
    }
    events.push(GameEvent::ImpactEffect {
        point,
        size: momentum * tuning.effect_size_scale,
    });
    events.push(GameEvent::Sound {
        effect: SoundEffect::HullImpact,
        volume: (momentum / tuning.full_volume_momentum.max(1e-3)).clamp(0.0, 1.0),
    });
    if approach_speed >= tuning.flash_threshold {
        events.push(GameEvent::ScreenFlash {
            color: IMPACT_FLASH_COLOR,
            duration_ms: tuning.flash_duration_ms,
        });
    }
}
