//! Game entities as plain records plus capability components
//!
//! An entity only carries the components its kind needs: the player is
//! movable, collidable, renderable and can board; a ship is movable,
//! collidable, renderable and boardable.

use serde::{Deserialize, Serialize};

use super::body::BodyId;
use super::boarding::BoardingState;
use super::hull::HullModel;

/// Stable entity handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Ship,
}

/// Self-propelled movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movable {
    /// Force at full input (walking force or sail thrust)
    pub thrust: f32,
    /// Torque at full helm (zero for walkers)
    pub torque: f32,
    /// Own speed cap (walkers only; zero = uncapped)
    pub max_speed: f32,
}

/// Link to the primary physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collidable {
    pub body: BodyId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sprite {
    Sailor,
    Hull,
}

/// How the external renderer should draw the entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    pub sprite: Sprite,
    pub tint: [f32; 3],
    /// Draw order, higher on top
    pub layer: i32,
}

/// A hull that actors can board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boardable {
    pub model: HullModel,
    pub planks: Vec<BodyId>,
    pub passengers: Vec<EntityId>,
}

impl Boardable {
    pub fn has_passenger(&self) -> bool {
        !self.passengers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub movable: Option<Movable>,
    pub collidable: Option<Collidable>,
    pub renderable: Option<Renderable>,
    pub boardable: Option<Boardable>,
    /// Present on entities that can stand on a boardable hull
    pub boarding: Option<BoardingState>,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            movable: None,
            collidable: None,
            renderable: None,
            boardable: None,
            boarding: None,
        }
    }

    pub fn with_movable(mut self, movable: Movable) -> Self {
        self.movable = Some(movable);
        self
    }

    pub fn with_collidable(mut self, body: BodyId) -> Self {
        self.collidable = Some(Collidable { body });
        self
    }

    pub fn with_renderable(mut self, renderable: Renderable) -> Self {
        self.renderable = Some(renderable);
        self
    }

    pub fn with_boardable(mut self, model: HullModel, planks: Vec<BodyId>) -> Self {
        self.boardable = Some(Boardable {
            model,
            planks,
            passengers: Vec::new(),
        });
        self
    }

    pub fn with_boarding(mut self) -> Self {
        self.boarding = Some(BoardingState::default());
        self
    }

    pub fn body(&self) -> Option<BodyId> {
        self.collidable.map(|c| c.body)
    }
}
