//! Brigantine - A top-down pirate sailing game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (rigid bodies, collisions, ship hulls, boarding)
//! - `tuning`: Data-driven collision and deck tuning
//! - `settings`: Player preferences persisted to LocalStorage

pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches browser animation frames)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World dimensions (open sea)
    pub const WORLD_WIDTH: f32 = 4000.0;
    pub const WORLD_HEIGHT: f32 = 4000.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 10.0;
    pub const PLAYER_MASS: f32 = 1.0;

    /// Ship defaults
    pub const SHIP_MASS: f32 = 20.0;
    pub const PLANK_MASS: f32 = 0.2;
    pub const PLANK_THICKNESS: f32 = 4.0;
}

/// Debug switches threaded through the simulation by reference.
///
/// Each `GameState` owns its own context, so tests can run side by side with
/// different debug settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugContext {
    /// Log every detected contact (tier, depth, labels)
    pub log_contacts: bool,
    /// Keep recent contact points for the debug overlay
    pub record_points: bool,
}

impl DebugContext {
    pub fn off() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self {
            log_contacts: true,
            record_points: true,
        }
    }
}

/// Normalized angle to [-π, π]; non-finite input maps to 0
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + PI).rem_euclid(TAU) - PI
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate_vec(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Unit vector for an angle
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(cos, sin)
}

/// Normalize `v`, substituting `fallback` for zero-length or non-finite input
#[inline]
pub fn normalize_or_fallback(v: Vec2, fallback: Vec2) -> Vec2 {
    let len = v.length();
    if len > 1e-6 && len.is_finite() {
        v / len
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle_wraps() {
        // 3π lands on the ±π seam; either side is the same heading
        let seam = normalize_angle(3.0 * PI);
        assert!((seam.abs() - PI).abs() < 1e-5, "seam {seam}");
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
        assert!((normalize_angle(2.5 * PI) - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_angle_large_and_non_finite() {
        let big = normalize_angle(1.0e9);
        assert!(big.is_finite() && (-PI..=PI).contains(&big), "big {big}");
        assert_eq!(normalize_angle(f32::INFINITY), 0.0);
        assert_eq!(normalize_angle(f32::NEG_INFINITY), 0.0);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_rotate_vec_quarter_turn() {
        let r = rotate_vec(Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert!(r.x.abs() < 1e-6);
        assert!((r.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_or_fallback_zero() {
        assert_eq!(normalize_or_fallback(Vec2::ZERO, Vec2::X), Vec2::X);
        let n = normalize_or_fallback(Vec2::new(0.0, 5.0), Vec2::X);
        assert!((n.y - 1.0).abs() < 1e-6);
    }
}
