//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (bodies and entities sorted by id)
//! - No rendering or platform dependencies

pub mod boarding;
pub mod body;
pub mod collision;
pub mod deck;
pub mod entity;
pub mod geometry;
pub mod hull;
pub mod planks;
pub mod response;
pub mod state;
pub mod tick;
pub mod world;

pub use boarding::{BoardedOn, BoardingGate, BoardingState, evaluate_boarding_gate};
pub use body::{BodyId, BodyRole, CollisionFilter, RigidBody, Shape};
pub use collision::{
    CollisionDetector, CollisionOutcome, CollisionPoint, CollisionRecord, DetectionTier, PairKey,
};
pub use deck::{compute_deck_constraint_force, is_position_on_deck, nearest_hull_edge};
pub use entity::{Entity, EntityId, EntityKind};
pub use geometry::{Aabb, Pose, SatResult, separating_axis_test};
pub use hull::{BoardingLadder, DeckObstacle, HullDefinition, HullModel, HullSection, PlankSegment};
pub use planks::{HullBuild, PlankSyncError, create_hull_body, create_plank_bodies, resync_planks};
pub use response::{GameEvent, SoundEffect, apply_collision_response, apply_separation_force};
pub use state::{GameState, Snapshot};
pub use tick::{TickInput, tick};
pub use world::{Contact, OverlapQuery, PhysicsWorld};
