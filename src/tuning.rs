//! Data-driven tuning
//!
//! Every collision, response and deck constant lives here so it can be
//! re-tuned from JSON without touching the simulation code. The defaults are
//! starting values, hand-tuned against the simulation tests.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Complete tuning set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub detector: DetectorTuning,
    pub response: ResponseTuning,
    pub deck: DeckTuning,
    pub boarding: BoardingTuning,
    pub bodies: BodyTuning,
}

impl Tuning {
    /// Parse tuning from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse tuning from JSON, logging and falling back to defaults on error
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("Invalid tuning JSON ({e}), using defaults");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Fallback collision detector constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorTuning {
    /// How long a collision record counts as recent (ms)
    pub freshness_window_ms: f64,
    /// Minimum time between fallback sweeps (ms)
    pub sweep_interval_ms: f64,
    /// Expansion of the actor's bounds for the buffered box test
    pub aabb_buffer: f32,
    /// Multiplier on the directional contact radius
    pub radius_buffer: f32,
    /// Heuristic depth is capped at this fraction of the threshold
    pub heuristic_depth_cap: f32,
    /// Sides used when approximating a circle as a polygon for SAT
    pub circle_sides: usize,
    /// Debug contact points older than this are pruned (ms)
    pub point_lifetime_ms: f64,
}

impl Default for DetectorTuning {
    fn default() -> Self {
        Self {
            freshness_window_ms: 2000.0,
            sweep_interval_ms: 2000.0,
            aabb_buffer: 8.0,
            radius_buffer: 1.1,
            heuristic_depth_cap: 0.3,
            circle_sides: 16,
            point_lifetime_ms: 2000.0,
        }
    }
}

/// Actor-vs-hull collision response constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseTuning {
    /// Bounciness of the velocity correction
    pub restitution: f32,
    /// Upper bound on the lighter body's velocity correction (px/s)
    pub max_impulse: f32,
    /// Fraction of the (mass-scaled) impulse returned to the heavier body
    pub counter_share: f32,
    /// Force per unit of depth factor per unit of heavy mass
    pub force_scale: f32,
    /// Exponent applied to depth; must stay below 1
    pub depth_exponent: f32,
    /// Cap on `depth.powf(depth_exponent)`
    pub depth_factor_cap: f32,
    /// Upper bound on the separation force magnitude
    pub max_force: f32,
    /// Share of the force given to the lighter body
    pub light_share: f32,
    /// Force multiplier while bodies are already separating
    pub stabilize_factor: f32,
    /// Torque nudges only fire above this force magnitude
    pub torque_threshold: f32,
    /// Scale from contact cross product to angular velocity
    pub torque_factor: f32,
    /// Largest angular velocity change from one nudge (rad/s)
    pub max_spin: f32,
    /// Approach speed needed for an impact effect and sound (px/s)
    pub effect_threshold: f32,
    /// Approach speed needed for a screen flash (px/s)
    pub flash_threshold: f32,
    /// Impact momentum (impulse times the lighter mass) at which the
    /// impact sound reaches full volume
    pub full_volume_momentum: f32,
    /// Impact effect size per unit of impact momentum
    pub effect_size_scale: f32,
    pub flash_duration_ms: f32,
}

impl Default for ResponseTuning {
    fn default() -> Self {
        Self {
            restitution: 0.2,
            max_impulse: 240.0,
            counter_share: 0.5,
            force_scale: 45.0,
            depth_exponent: 0.6,
            depth_factor_cap: 4.0,
            max_force: 5000.0,
            light_share: 0.85,
            stabilize_factor: 0.2,
            torque_threshold: 400.0,
            torque_factor: 0.002,
            max_spin: 0.5,
            effect_threshold: 40.0,
            flash_threshold: 260.0,
            full_volume_momentum: 240.0,
            effect_size_scale: 0.1,
            flash_duration_ms: 120.0,
        }
    }
}

/// Deck walkability and constraint constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckTuning {
    /// Directions sampled by the nearest-edge search
    pub edge_directions: usize,
    /// Ray length used to find a point known to be off the hull
    pub edge_ray_length: f32,
    /// Binary search iterations per direction
    pub edge_iterations: u32,
    /// How far ahead the proposed movement is projected
    pub lookahead: f32,
    /// Extra clearance added around masts and the wheel
    pub obstacle_padding: f32,
    /// Weight of the repulsive component at zero distance
    pub repulsion_strength: f32,
}

impl Default for DeckTuning {
    fn default() -> Self {
        Self {
            edge_directions: 16,
            edge_ray_length: 300.0,
            edge_iterations: 10,
            lookahead: 20.0,
            obstacle_padding: 4.0,
            repulsion_strength: 2.0,
        }
    }
}

/// Boarding constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardingTuning {
    /// Coarse pre-filter: actor distance to the ladder centre
    pub interaction_radius: f32,
    /// Share of the actor's world velocity taken from its own control (0-1)
    pub control_share: f32,
}

impl Default for BoardingTuning {
    fn default() -> Self {
        Self {
            interaction_radius: 60.0,
            control_share: 0.7,
        }
    }
}

/// Body construction and movement constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyTuning {
    pub player_radius: f32,
    pub player_mass: f32,
    /// Linear damping coefficient (1/s)
    pub player_drag: f32,
    pub player_move_force: f32,
    pub player_max_speed: f32,
    pub ship_mass: f32,
    /// Linear damping coefficient (1/s)
    pub ship_drag: f32,
    /// Angular damping coefficient (1/s)
    pub ship_angular_drag: f32,
    pub sail_force: f32,
    pub helm_torque: f32,
    pub plank_mass: f32,
    pub plank_thickness: f32,
}

impl Default for BodyTuning {
    fn default() -> Self {
        Self {
            player_radius: PLAYER_RADIUS,
            player_mass: PLAYER_MASS,
            player_drag: 3.0,
            player_move_force: 900.0,
            player_max_speed: 220.0,
            ship_mass: SHIP_MASS,
            ship_drag: 1.2,
            ship_angular_drag: 3.0,
            sail_force: 1800.0,
            helm_torque: 60_000.0,
            plank_mass: PLANK_MASS,
            plank_thickness: PLANK_THICKNESS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "detector": { "aabb_buffer": 12.0 } }"#).unwrap();
        assert_eq!(tuning.detector.aabb_buffer, 12.0);
        assert_eq!(tuning.detector.freshness_window_ms, 2000.0);
        assert_eq!(tuning.response, ResponseTuning::default());
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let tuning = Tuning::from_json_or_default("{ not json");
        assert_eq!(tuning, Tuning::default());
    }

    #[test]
    fn test_depth_exponent_is_sublinear() {
        assert!(ResponseTuning::default().depth_exponent < 1.0);
    }

    #[test]
    fn test_json_roundtrip_preserves_values() {
        let mut tuning = Tuning::default();
        tuning.deck.lookahead = 33.0;
        let parsed = Tuning::from_json(&tuning.to_json()).unwrap();
        assert_eq!(parsed.deck.lookahead, 33.0);
    }
}
