//! Game state and the public collision / deck / boarding surface
//!
//! `GameState` owns the physics world, the fallback detector and every
//! entity. All mutation goes through the single simulation thread.

use glam::Vec2;
use serde::Serialize;

use super::body::{BodyId, BodyRole, CollisionFilter, RigidBody, Shape, category};
use super::boarding::evaluate_boarding_gate;
use super::collision::{CollisionDetector, CollisionPoint, CollisionRecord};
use super::deck;
use super::entity::{Entity, EntityId, EntityKind, Movable, Renderable, Sprite};
use super::geometry::Aabb;
use super::hull::HullModel;
use super::planks::{create_hull_body, create_plank_bodies};
use super::response::{self, GameEvent, SoundEffect};
use super::world::PhysicsWorld;
use crate::consts::*;
use crate::{DebugContext, Settings, Tuning};

/// Body pose and shape for the external renderer
#[derive(Debug, Clone, Serialize)]
pub struct BodySnapshot {
    pub label: String,
    pub role: BodyRole,
    pub pos: Vec2,
    pub angle: f32,
    pub shape: Shape,
}

/// Entity summary for the external renderer
#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub renderable: Option<Renderable>,
    pub pos: Option<Vec2>,
    pub angle: Option<f32>,
    pub boarded_on: Option<EntityId>,
    pub has_passenger: bool,
}

/// Everything the host needs to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time_ms: f64,
    pub tick: u64,
    pub entities: Vec<EntitySnapshot>,
    pub bodies: Vec<BodySnapshot>,
    /// Only filled when the collision debug overlay is on
    pub collision_points: Vec<CollisionPoint>,
}

/// Complete simulation state
#[derive(Debug)]
pub struct GameState {
    pub world: PhysicsWorld,
    pub detector: CollisionDetector,
    /// Sorted by id for deterministic iteration
    pub entities: Vec<Entity>,
    pub player: Option<EntityId>,
    pub debug: DebugContext,
    pub tuning: Tuning,
    pub settings: Settings,
    /// Pending effect/audio requests, drained by the host
    pub events: Vec<GameEvent>,
    /// Simulation clock (ms)
    pub time_ms: f64,
    pub tick_count: u64,
    next_entity: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(Tuning::default(), Settings::default(), DebugContext::off())
    }
}

impl GameState {
    pub fn new(tuning: Tuning, settings: Settings, debug: DebugContext) -> Self {
        let bounds = Aabb::new(Vec2::ZERO, Vec2::new(WORLD_WIDTH, WORLD_HEIGHT));
        Self {
            world: PhysicsWorld::new(Some(bounds)),
            detector: CollisionDetector::new(tuning.detector.clone()),
            entities: Vec::new(),
            player: None,
            debug,
            tuning,
            settings,
            events: Vec::new(),
            time_ms: 0.0,
            tick_count: 0,
            next_entity: 1,
        }
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Spawn the player in the water
    pub fn spawn_player(&mut self, pos: Vec2) -> EntityId {
        let b = &self.tuning.bodies;
        let body = RigidBody::circle("player", BodyRole::Player, pos, b.player_radius, b.player_mass)
            .with_drag(b.player_drag, 0.0)
            .with_filter(CollisionFilter::new(
                category::PLAYER,
                category::SHIP | category::PLANK | category::SCENERY,
            ));
        let movable = Movable {
            thrust: b.player_move_force,
            torque: 0.0,
            max_speed: b.player_max_speed,
        };
        let body_id = self.world.add_body(body);
        let id = self.next_entity_id();
        self.entities.push(
            Entity::new(id, "player", EntityKind::Player)
                .with_movable(movable)
                .with_collidable(body_id)
                .with_renderable(Renderable {
                    sprite: Sprite::Sailor,
                    tint: [0.9, 0.75, 0.55],
                    layer: 2,
                })
                .with_boarding(),
        );
        self.player = Some(id);
        log::info!("Spawned player at ({:.0}, {:.0})", pos.x, pos.y);
        id
    }

    /// Spawn a ship: primary hull body, welded planks and the entity record
    pub fn spawn_ship(&mut self, name: &str, model: HullModel, pos: Vec2, angle: f32) -> EntityId {
        let (hull, _build) = create_hull_body(&mut self.world, name, &model, pos, angle, &self.tuning.bodies);
        let planks = create_plank_bodies(&mut self.world, hull, &model, &self.tuning.bodies);
        let movable = Movable {
            thrust: self.tuning.bodies.sail_force,
            torque: self.tuning.bodies.helm_torque,
            max_speed: 0.0,
        };
        let id = self.next_entity_id();
        self.entities.push(
            Entity::new(id, name, EntityKind::Ship)
                .with_movable(movable)
                .with_collidable(hull)
                .with_renderable(Renderable {
                    sprite: Sprite::Hull,
                    tint: [0.55, 0.36, 0.2],
                    layer: 1,
                })
                .with_boardable(model, planks),
        );
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &self.entities[i])
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(move |i| &mut self.entities[i])
    }

    /// Primary physics body of an entity
    pub fn body_of(&self, id: EntityId) -> Option<&RigidBody> {
        self.entity(id)?.body().and_then(|b| self.world.get(b))
    }

    /// Entity owning a primary body
    pub fn entity_for_body(&self, body: BodyId) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|e| e.body() == Some(body))
            .map(|e| e.id)
    }

    pub fn ships(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.boardable.is_some())
    }

    /// Hull body the actor is standing on, if any
    pub fn boarded_hull(&self, actor: EntityId) -> Option<BodyId> {
        self.entity(actor)?.boarding?.hull()
    }

    /// (actor body, hull body) pairs the fallback detector watches. A
    /// boarded actor is not paired with its own hull.
    pub fn tracked_pairs(&self) -> Vec<(BodyId, BodyId)> {
        let mut pairs = Vec::new();
        for actor in self.entities.iter().filter(|e| e.boarding.is_some()) {
            let Some(actor_body) = actor.body() else {
                continue;
            };
            let own_hull = actor.boarding.and_then(|b| b.hull());
            for hull in self.ships().filter_map(|s| s.body()) {
                if Some(hull) != own_hull {
                    pairs.push((actor_body, hull));
                }
            }
        }
        pairs
    }

    pub fn is_boarded(&self, actor: EntityId) -> bool {
        self.boarded_hull(actor).is_some()
    }

    /// Ship entity whose ladder gate passes for `actor`
    pub fn boardable_ship_for(&self, actor: EntityId, pointer_world: Option<Vec2>) -> Option<EntityId> {
        let actor_pos = self.body_of(actor)?.pos;
        self.ships().find_map(|ship| {
            let hull = ship.body().and_then(|b| self.world.get(b))?;
            let model = &ship.boardable.as_ref()?.model;
            evaluate_boarding_gate(&model.ladder, hull.pose(), actor_pos, pointer_world, &self.tuning.boarding)
                .passes()
                .then_some(ship.id)
        })
    }

    /// Stand `actor` on `ship` at the ladder's deck entry. Sets both the
    /// actor's boarding state and the ship's passenger list.
    pub fn board(&mut self, actor: EntityId, ship: EntityId) -> bool {
        if self.is_boarded(actor) {
            log::warn!("Board ignored: {actor:?} is already boarded");
            return false;
        }
        let (Some(actor_body), Some((hull_body, deck_entry))) = (
            self.entity(actor)
                .filter(|e| e.boarding.is_some())
                .and_then(|e| e.body()),
            self.entity(ship).and_then(|e| {
                let board = e.boardable.as_ref()?;
                Some((e.body()?, board.model.ladder.deck_entry))
            }),
        ) else {
            log::warn!("Board ignored: {actor:?} or {ship:?} cannot board");
            return false;
        };
        let mut state = self
            .entity(actor)
            .and_then(|e| e.boarding)
            .unwrap_or_default();
        let Some((actor_rb, hull_rb)) = self.world.get_pair_mut(actor_body, hull_body) else {
            log::warn!("Board ignored: missing body for {actor:?} or {ship:?}");
            return false;
        };
        state.board(actor_rb, hull_rb, deck_entry);

        if let Some(e) = self.entity_mut(actor) {
            e.boarding = Some(state);
        }
        if let Some(board) = self.entity_mut(ship).and_then(|e| e.boardable.as_mut()) {
            board.passengers.push(actor);
        }
        self.emit(GameEvent::Sound {
            effect: SoundEffect::Board,
            volume: 1.0,
        });
        log::info!("{actor:?} boarded {ship:?}");
        true
    }

    /// Leave the current hull at the ladder's water exit. Clears both the
    /// actor's boarding state and the ship's passenger entry.
    pub fn unboard(&mut self, actor: EntityId) -> bool {
        let Some(left) = self
            .entity_mut(actor)
            .and_then(|e| e.boarding.as_mut())
            .and_then(|b| b.unboard())
        else {
            return false;
        };

        let ship = self.entity_for_body(left.hull);
        let water_exit = ship
            .and_then(|s| self.entity(s))
            .and_then(|e| e.boardable.as_ref())
            .map(|b| b.model.ladder.water_exit);
        if let Some(board) = ship
            .and_then(|s| self.entity_mut(s))
            .and_then(|e| e.boardable.as_mut())
        {
            board.passengers.retain(|&p| p != actor);
        }

        let exit = match (water_exit, self.world.get(left.hull)) {
            (Some(local), Some(hull)) => Some(hull.pose().local_to_world(local)),
            _ => {
                log::warn!("Unboard: hull {:?} missing, actor left in place", left.hull);
                None
            }
        };
        let actor_body = self.entity(actor).and_then(|e| e.body());
        if let (Some(exit), Some(body)) = (exit, actor_body.and_then(|b| self.world.get_mut(b))) {
            body.pos = exit;
        }

        self.emit(GameEvent::Sound {
            effect: SoundEffect::Unboard,
            volume: 1.0,
        });
        log::info!("{actor:?} left {:?}", left.hull);
        true
    }

    pub fn has_recent_collision(&self, label_a: &str, label_b: &str) -> bool {
        self.detector.has_recent_collision(label_a, label_b, self.time_ms)
    }

    pub fn last_collision(&self, label_a: &str, label_b: &str) -> Option<&CollisionRecord> {
        self.detector.last_collision(label_a, label_b)
    }

    /// Is `world_point` on the deck of `ship`?
    pub fn is_position_on_deck(&self, ship: EntityId, world_point: Vec2) -> bool {
        let Some(entity) = self.entity(ship) else {
            log::warn!("Deck query on unknown ship {ship:?}");
            return false;
        };
        let Some(board) = entity.boardable.as_ref() else {
            log::warn!("Deck query on '{}', which has no deck", entity.name);
            return false;
        };
        let hull = entity.body().and_then(|b| self.world.get(b));
        deck::is_position_on_deck(&board.model, hull, world_point, &self.tuning.deck)
    }

    /// Deck-constrained version of a proposed movement force
    pub fn compute_deck_constraint_force(&self, ship: EntityId, actor_world: Vec2, proposed: Vec2) -> Vec2 {
        let Some(entity) = self.entity(ship) else {
            log::warn!("Deck constraint on unknown ship {ship:?}");
            return proposed;
        };
        match (
            entity.boardable.as_ref(),
            entity.body().and_then(|b| self.world.get(b)),
        ) {
            (Some(board), Some(hull)) => deck::compute_deck_constraint_force(
                &board.model,
                hull,
                actor_world,
                proposed,
                &self.tuning.deck,
            ),
            _ => {
                log::warn!("Deck constraint on '{}' without hull data", entity.name);
                proposed
            }
        }
    }

    /// Push an actor body out of a hull body by depth alone
    pub fn apply_separation_force(&mut self, actor: BodyId, hull: BodyId, depth: f32) -> bool {
        let Some((a, h)) = self.world.get_pair_mut(actor, hull) else {
            log::warn!("Separation force skipped: missing body {actor:?} or {hull:?}");
            return false;
        };
        response::apply_separation_force(a, h, depth, &self.tuning.response) > 0.0
    }

    /// Queue an effect/audio request, honouring the player's settings
    pub fn emit(&mut self, event: GameEvent) {
        match event {
            GameEvent::ImpactEffect { .. } => {
                let queued = self
                    .events
                    .iter()
                    .filter(|e| matches!(e, GameEvent::ImpactEffect { .. }))
                    .count();
                if !self.settings.impact_effects || queued >= self.settings.max_impact_effects() {
                    return;
                }
                self.events.push(event);
            }
            GameEvent::ScreenFlash { .. } => {
                if self.settings.effective_screen_flash() {
                    self.events.push(event);
                }
            }
            GameEvent::Sound { effect, volume } => {
                let volume = volume * self.settings.effective_sfx_volume();
                if volume > 0.0 {
                    self.events.push(GameEvent::Sound { effect, volume });
                }
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let entities = self
            .entities
            .iter()
            .map(|e| {
                let body = e.body().and_then(|b| self.world.get(b));
                EntitySnapshot {
                    id: e.id,
                    name: e.name.clone(),
                    kind: e.kind,
                    renderable: e.renderable,
                    pos: body.map(|b| b.pos),
                    angle: body.map(|b| b.angle),
                    boarded_on: e
                        .boarding
                        .and_then(|s| s.hull())
                        .and_then(|h| self.entity_for_body(h)),
                    has_passenger: e.boardable.as_ref().is_some_and(|b| b.has_passenger()),
                }
            })
            .collect();
        let bodies = self
            .world
            .bodies()
            .iter()
            .map(|b| BodySnapshot {
                label: b.label.clone(),
                role: b.role,
                pos: b.pos,
                angle: b.angle,
                shape: b.shape.clone(),
            })
            .collect();
        let collision_points = if self.settings.collision_debug {
            self.detector.collision_points().to_vec()
        } else {
            Vec::new()
        };
        Snapshot {
            time_ms: self.time_ms,
            tick: self.tick_count,
            entities,
            bodies,
            collision_points,
        }
    }

    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|e| {
            log::warn!("Snapshot serialization failed: {e}");
            String::from("{}")
        })
    }
}
