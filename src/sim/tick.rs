//! Fixed timestep simulation tick
//!
//! Order within a tick:
//! 1. input forces (deck-constrained while boarded, sail and helm)
//! 2. physics step
//! 3. native contacts, then the time-gated fallback sweep, through one dispatcher
//! 4. boarded-actor carry and boarding transitions
//! 5. plank resync against the final hull transforms
//! 6. debug point pruning

use glam::Vec2;

use super::body::{BodyId, BodyRole};
use super::boarding::{carry_boarded_actor, evaluate_boarding_gate, restore_own_velocity};
use super::collision::{CollisionOutcome, DetectionTier};
use super::deck::is_local_point_walkable;
use super::entity::EntityId;
use super::planks::resync_planks;
use super::response::apply_collision_response;
use super::state::GameState;
use super::world::Contact;
use crate::heading;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired walking/swimming direction (any length, normalized here)
    pub move_dir: Vec2,
    /// Pointer position in world space
    pub pointer_world: Option<Vec2>,
    /// Primary key held (raises sail while boarded)
    pub primary_held: bool,
    /// Interact key pressed this tick (board / unboard)
    pub interact_pressed: bool,
    /// Helm input, -1 (port) to 1 (starboard)
    pub helm: f32,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if let Some(player) = state.player {
        apply_actor_input(state, player, input);
    }

    state.world.step(dt);

    dispatch_contacts(state);

    if let Some(player) = state.player {
        carry_actor(state, player);
        if input.interact_pressed {
            handle_interact(state, player, input.pointer_world);
        }
    }

    resync_all_planks(state);

    state.time_ms += f64::from(dt) * 1000.0;
    state.tick_count += 1;
    state.detector.prune_points(state.time_ms);
}

/// Movement force for the actor, plus sail and helm for its ship
fn apply_actor_input(state: &mut GameState, actor: EntityId, input: &TickInput) {
    let Some(entity) = state.entity(actor) else {
        return;
    };
    let (Some(body_id), Some(movable)) = (entity.body(), entity.movable) else {
        return;
    };
    let boarded = entity.boarding.and_then(|b| b.boarded().copied());
    let ship = boarded.and_then(|b| state.entity_for_body(b.hull));

    let Some(body) = state.world.get_mut(body_id) else {
        log::warn!("Actor {actor:?} has no body");
        return;
    };
    if let Some(b) = &boarded {
        restore_own_velocity(b, body);
    }
    if movable.max_speed > 0.0 {
        body.vel = body.vel.clamp_length_max(movable.max_speed);
    }
    let actor_pos = body.pos;

    let proposed = input.move_dir.normalize_or_zero() * movable.thrust;
    let force = match ship {
        Some(ship) => state.compute_deck_constraint_force(ship, actor_pos, proposed),
        None => proposed,
    };
    if let Some(body) = state.world.get_mut(body_id) {
        body.apply_force(force);
    }

    let Some((ship, hull_id)) = ship.zip(boarded.map(|b| b.hull)) else {
        return;
    };
    let Some(sail) = state.entity(ship).and_then(|e| e.movable) else {
        return;
    };
    if let Some(hull) = state.world.get_mut(hull_id) {
        if input.primary_held {
            hull.apply_force(heading(hull.angle) * sail.thrust);
        }
        let helm = input.helm.clamp(-1.0, 1.0);
        if helm != 0.0 {
            hull.apply_torque(helm * sail.torque);
        }
    }
}

/// Native contacts and fallback sweep results go through the same path
fn dispatch_contacts(state: &mut GameState) {
    let mut native: Vec<CollisionOutcome> = Vec::new();
    for event in state.world.take_events() {
        if let Some(outcome) = actor_hull_outcome(state, event.a, event.b, event.contact) {
            native.push(outcome);
        }
    }
    // A hull and its planks can all touch the actor in one step
    native.sort_by(|x, y| {
        (x.body_a, x.body_b)
            .cmp(&(y.body_a, y.body_b))
            .then(y.contact.depth.total_cmp(&x.contact.depth))
    });
    native.dedup_by_key(|o| (o.body_a, o.body_b));
    let reported: Vec<(BodyId, BodyId)> = native.iter().map(|o| (o.body_a, o.body_b)).collect();

    for outcome in &native {
        resolve_outcome(state, outcome);
    }

    let pairs = state.tracked_pairs();
    let fallback = state
        .detector
        .sweep(&state.world, &pairs, &reported, state.time_ms, &state.debug);
    for outcome in &fallback {
        resolve_outcome(state, outcome);
    }
}

/// Hull a ship or plank body belongs to
fn owning_hull(id: BodyId, role: BodyRole) -> Option<BodyId> {
    match role {
        BodyRole::Ship => Some(id),
        BodyRole::Plank { ship, .. } => Some(ship),
        BodyRole::Player | BodyRole::Scenery => None,
    }
}

/// Turn a native contact event into an actor-vs-hull outcome with the
/// normal pointing from the actor toward the hull. Plank contacts count
/// against the plank's hull. Contacts between a boarded actor and its own
/// hull, and pairs that are not actor-vs-hull, are dropped.
fn actor_hull_outcome(state: &GameState, a: BodyId, b: BodyId, contact: Contact) -> Option<CollisionOutcome> {
    let role_a = state.world.get(a)?.role;
    let role_b = state.world.get(b)?.role;
    let (actor, hull, contact) = match (role_a, role_b) {
        (BodyRole::Player, other) => (a, owning_hull(b, other)?, contact),
        (other, BodyRole::Player) => (b, owning_hull(a, other)?, contact.flipped()),
        _ => return None,
    };
    if !state.world.contains(hull) {
        return None;
    }
    let passenger = state
        .entity_for_body(actor)
        .and_then(|e| state.boarded_hull(e))
        == Some(hull);
    if passenger {
        return None;
    }
    Some(CollisionOutcome {
        body_a: actor,
        body_b: hull,
        contact,
        tier: DetectionTier::Native,
    })
}

/// Record an outcome and apply the collision response
fn resolve_outcome(state: &mut GameState, outcome: &CollisionOutcome) {
    let Some((actor, hull)) = state.world.get_pair_mut(outcome.body_a, outcome.body_b) else {
        log::warn!(
            "Collision between {:?} and {:?} skipped: body missing",
            outcome.body_a,
            outcome.body_b
        );
        return;
    };
    let mut events = Vec::new();
    let report = apply_collision_response(actor, hull, &outcome.contact, &state.tuning.response, &mut events);
    let (label_a, label_b) = (actor.label.clone(), hull.label.clone());

    if state.debug.log_contacts {
        log::debug!(
            "{:?} contact '{label_a}' / '{label_b}': depth {:.2}, {:?}, impulse {:.1}, force {:.0}",
            outcome.tier,
            outcome.contact.depth,
            report.branch,
            report.impulse,
            report.force
        );
    }
    state
        .detector
        .record(&label_a, &label_b, outcome, state.time_ms, &state.debug);
    for event in events {
        state.emit(event);
    }
}

/// Carry a boarded actor with its hull, keeping it on the walkable deck
fn carry_actor(state: &mut GameState, actor: EntityId) {
    let Some(entity) = state.entity(actor) else {
        return;
    };
    let Some(body_id) = entity.body() else {
        return;
    };
    let Some(mut boarded) = entity.boarding.and_then(|b| b.boarded().copied()) else {
        return;
    };
    let padding = state.tuning.deck.obstacle_padding;
    let model = state
        .entities
        .iter()
        .find(|e| e.body() == Some(boarded.hull))
        .and_then(|e| e.boardable.as_ref())
        .map(|b| &b.model);
    let Some((actor_rb, hull_rb)) = state.world.get_pair_mut(body_id, boarded.hull) else {
        log::warn!("Boarded hull {:?} is gone, unboarding {actor:?}", boarded.hull);
        state.unboard(actor);
        return;
    };
    carry_boarded_actor(&mut boarded, actor_rb, hull_rb, &state.tuning.boarding, |local| {
        model.is_none_or(|m| is_local_point_walkable(m, local, padding))
    });
    if let Some(b) = state
        .entity_mut(actor)
        .and_then(|e| e.boarding.as_mut())
        .and_then(|s| s.boarded_mut())
    {
        *b = boarded;
    }
}

/// Board or unboard when the ladder gate passes
fn handle_interact(state: &mut GameState, actor: EntityId, pointer_world: Option<Vec2>) {
    let Some(hull_id) = state.boarded_hull(actor) else {
        if let Some(ship) = state.boardable_ship_for(actor, pointer_world) {
            state.board(actor, ship);
        }
        return;
    };

    let Some(ship) = state.entity_for_body(hull_id) else {
        return;
    };
    let gate = match (
        state.body_of(actor),
        state.world.get(hull_id),
        state.entity(ship).and_then(|e| e.boardable.as_ref()),
    ) {
        (Some(body), Some(hull), Some(board)) => evaluate_boarding_gate(
            &board.model.ladder,
            hull.pose(),
            body.pos,
            pointer_world,
            &state.tuning.boarding,
        ),
        _ => return,
    };
    if gate.passes() {
        state.unboard(actor);
    }
}

fn resync_all_planks(state: &mut GameState) {
    for entity in &state.entities {
        let (Some(hull), Some(board)) = (entity.body(), entity.boardable.as_ref()) else {
            continue;
        };
        if let Err(e) = resync_planks(&mut state.world, hull, &board.planks, &board.model.planks) {
            log::warn!("Plank resync skipped for '{}': {e}", entity.name);
        }
    }
}

impl GameState {
    /// Full tiered detection for one actor/hull pair; applies the response
    /// on a hit
    pub fn detect_and_resolve_collision(&mut self, actor: BodyId, hull: BodyId) -> bool {
        let outcome = self.detector.detect(
            &self.world,
            self.world.get(actor),
            self.world.get(hull),
            &self.debug,
        );
        match outcome {
            Some(outcome) => {
                resolve_outcome(self, &outcome);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::hull::HullModel;

    /// Actor 50 units from a raft, swimming straight at it
    fn approach_scenario() -> (GameState, EntityId, EntityId) {
        let mut state = GameState::default();
        let raft = state.spawn_ship("raft", HullModel::raft(80.0, 30.0), Vec2::new(500.0, 500.0), 0.0);
        let player = state.spawn_player(Vec2::new(500.0, 450.0));
        let body = state.entity(player).and_then(|e| e.body()).unwrap();
        let b = state.world.get_mut(body).unwrap();
        b.vel = Vec2::new(0.0, 150.0);
        b.drag = 0.0;
        (state, player, raft)
    }

    #[test]
    fn test_approach_collides_and_separates() {
        let (mut state, player, raft) = approach_scenario();
        let input = TickInput::default();
        for _ in 0..120 {
            tick(&mut state, &input, SIM_DT);
        }

        let record = state.last_collision("player", "raft").expect("collision recorded");
        assert!(record.depth > 0.0);

        let actor = state.body_of(player).unwrap();
        let hull = state.body_of(raft).unwrap();
        assert!(!actor.bounds().overlaps(&hull.bounds()));
        // Pushed back the way it came
        assert!(actor.pos.y < hull.pos.y);
    }

    #[test]
    fn test_plank_contact_counts_against_its_hull() {
        let mut state = GameState::default();
        let ship = state.spawn_ship("brigantine", HullModel::brigantine(), Vec2::new(1500.0, 1500.0), 0.0);
        let player = state.spawn_player(Vec2::new(1000.0, 1000.0));
        let actor = state.entity(player).and_then(|e| e.body()).unwrap();
        let hull = state.entity(ship).and_then(|e| e.body()).unwrap();
        let plank = state.entity(ship).and_then(|e| e.boardable.as_ref()).unwrap().planks[0];
        let contact = Contact {
            depth: 2.0,
            normal: Vec2::Y,
            point: Vec2::new(1500.0, 1480.0),
        };

        let outcome = actor_hull_outcome(&state, actor, plank, contact).expect("plank contact");
        assert_eq!((outcome.body_a, outcome.body_b), (actor, hull));
        assert_eq!(outcome.contact.normal, Vec2::Y);
        // Reported the other way round, the normal is turned to face the hull
        let outcome = actor_hull_outcome(&state, plank, actor, contact).expect("plank contact");
        assert_eq!(outcome.body_b, hull);
        assert_eq!(outcome.contact.normal, -Vec2::Y);

        // Passengers never collide with their own planks
        assert!(state.board(player, ship));
        assert!(actor_hull_outcome(&state, actor, plank, contact).is_none());
        // Plank against hull is not an actor pair
        assert!(actor_hull_outcome(&state, plank, hull, contact).is_none());
    }

    #[test]
    fn test_detect_and_resolve_on_overlap() {
        let (mut state, player, raft) = approach_scenario();
        let actor = state.entity(player).and_then(|e| e.body()).unwrap();
        let hull = state.entity(raft).and_then(|e| e.body()).unwrap();
        assert!(!state.detect_and_resolve_collision(actor, hull));

        state.world.get_mut(actor).unwrap().pos = Vec2::new(500.0, 478.0);
        assert!(state.detect_and_resolve_collision(actor, hull));
        assert!(state.has_recent_collision("raft", "player"));
        assert!(state.world.get(actor).unwrap().vel.y < 0.0);
        assert!(!state.detect_and_resolve_collision(actor, BodyId(999)));
    }

    #[test]
    fn test_planks_stay_on_moving_hull() {
        let mut state = GameState::default();
        let ship = state.spawn_ship("brigantine", HullModel::brigantine(), Vec2::new(1500.0, 1500.0), 0.0);
        let hull = state.entity(ship).and_then(|e| e.body()).unwrap();
        {
            let h = state.world.get_mut(hull).unwrap();
            h.vel = Vec2::new(80.0, 20.0);
            h.angular_vel = 0.4;
        }
        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        let pose = state.world.get(hull).unwrap().pose();
        let board = state.entity(ship).unwrap().boardable.clone().unwrap();
        for (id, segment) in board.planks.iter().zip(&board.model.planks) {
            let expected = pose.local_to_world(segment.midpoint());
            assert!(state.world.get(*id).unwrap().pos.distance(expected) < 1e-3);
        }
    }

    #[test]
    fn test_board_sail_and_unboard() {
        let mut state = GameState::default();
        let ship = state.spawn_ship("brigantine", HullModel::brigantine(), Vec2::new(1500.0, 1500.0), 0.0);
        let model = HullModel::brigantine();
        let ladder = Vec2::new(1500.0, 1500.0) + model.ladder.center;
        let player = state.spawn_player(Vec2::new(1500.0, 1500.0) + model.ladder.water_exit);

        // Interact without hovering the ladder does nothing
        let miss = TickInput {
            interact_pressed: true,
            pointer_world: Some(Vec2::new(1500.0, 1500.0)),
            ..Default::default()
        };
        tick(&mut state, &miss, SIM_DT);
        assert!(!state.is_boarded(player));

        let hit = TickInput {
            interact_pressed: true,
            pointer_world: Some(ladder),
            ..Default::default()
        };
        tick(&mut state, &hit, SIM_DT);
        assert!(state.is_boarded(player));

        // Raise sail: ship and passenger move forward together
        let hull = state.entity(ship).and_then(|e| e.body()).unwrap();
        let start = state.world.get(hull).unwrap().pos;
        let sail = TickInput {
            primary_held: true,
            ..Default::default()
        };
        for _ in 0..90 {
            tick(&mut state, &sail, SIM_DT);
        }
        let hull_body = state.world.get(hull).unwrap();
        assert!(hull_body.pos.x > start.x + 1.0);
        let on_deck = state.body_of(player).unwrap().pos;
        assert!(state.is_position_on_deck(ship, on_deck));
        // Standing on deck never registers as a hull collision
        assert!(state.last_collision("player", "brigantine").is_none());

        // Unboard via the (moved) ladder
        let ladder_now = hull_body.pose().local_to_world(model.ladder.center);
        let leave = TickInput {
            interact_pressed: true,
            pointer_world: Some(ladder_now),
            ..Default::default()
        };
        tick(&mut state, &leave, SIM_DT);
        assert!(!state.is_boarded(player));
        assert!(!state.is_position_on_deck(ship, state.body_of(player).unwrap().pos));
    }

    #[test]
    fn test_walking_on_deck_stays_on_deck() {
        let mut state = GameState::default();
        let ship = state.spawn_ship("brigantine", HullModel::brigantine(), Vec2::new(1500.0, 1500.0), 0.5);
        let player = state.spawn_player(Vec2::new(1500.0, 1500.0));
        assert!(state.board(player, ship));

        // Walk toward the port rail for a while
        let walk = TickInput {
            move_dir: Vec2::new(0.0, -1.0),
            ..Default::default()
        };
        for _ in 0..180 {
            tick(&mut state, &walk, SIM_DT);
        }
        assert!(state.is_boarded(player));
        let pos = state.body_of(player).unwrap().pos;
        assert!(state.is_position_on_deck(ship, pos));
    }
}
