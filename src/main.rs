//! Brigantine entry point
//!
//! On the web the JS host owns the canvas, input devices and audio; it drives
//! the simulation through the `Game` handle once per animation frame and reads
//! back a JSON snapshot plus queued effect/sound events. Natively a scripted
//! headless voyage runs and logs what happens.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use glam::Vec2;
    use wasm_bindgen::prelude::*;

    use brigantine::consts::*;
    use brigantine::sim::{GameState, HullModel, TickInput, tick};
    use brigantine::{DebugContext, Settings, Tuning};

    /// Game instance holding all state
    #[wasm_bindgen]
    pub struct Game {
        state: GameState,
        accumulator: f32,
        last_time: Option<f64>,
        input: TickInput,
    }

    #[wasm_bindgen]
    impl Game {
        /// Create a game with optional tuning JSON (invalid JSON falls back to defaults)
        #[wasm_bindgen(constructor)]
        pub fn new(tuning_json: Option<String>) -> Game {
            let tuning = tuning_json
                .as_deref()
                .map(Tuning::from_json_or_default)
                .unwrap_or_default();
            let settings = Settings::load();
            let debug = if settings.collision_debug {
                DebugContext::verbose()
            } else {
                DebugContext::off()
            };

            let mut state = GameState::new(tuning, settings, debug);
            let harbour = Vec2::new(WORLD_WIDTH, WORLD_HEIGHT) * 0.5;
            let ship = state.spawn_ship("brigantine", HullModel::brigantine(), harbour, 0.0);
            let ladder = HullModel::brigantine().ladder;
            state.spawn_player(harbour + ladder.water_exit + Vec2::new(0.0, 40.0));
            log::info!("Game created, ship {ship:?} in harbour");

            Game {
                state,
                accumulator: 0.0,
                last_time: None,
                input: TickInput::default(),
            }
        }

        /// Advance by the time since the last frame (ms timestamp from rAF)
        pub fn frame(&mut self, time_ms: f64) {
            let dt = match self.last_time {
                Some(last) => ((time_ms - last) / 1000.0) as f32,
                None => 0.0,
            };
            self.last_time = Some(time_ms);
            self.accumulator += dt.clamp(0.0, 0.1);

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.clone();
                tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.interact_pressed = false;
            }
        }

        pub fn set_move(&mut self, x: f32, y: f32) {
            self.input.move_dir = Vec2::new(x, y);
        }

        pub fn set_pointer(&mut self, x: f32, y: f32) {
            self.input.pointer_world = Some(Vec2::new(x, y));
        }

        pub fn clear_pointer(&mut self) {
            self.input.pointer_world = None;
        }

        pub fn set_primary(&mut self, held: bool) {
            self.input.primary_held = held;
        }

        pub fn set_helm(&mut self, helm: f32) {
            self.input.helm = helm;
        }

        pub fn press_interact(&mut self) {
            self.input.interact_pressed = true;
        }

        pub fn is_boarded(&self) -> bool {
            self.state.player.is_some_and(|p| self.state.is_boarded(p))
        }

        /// Bodies, entities and debug points for the renderer
        pub fn snapshot_json(&self) -> String {
            self.state.snapshot_json()
        }

        /// Queued effect and sound requests since the last call
        pub fn drain_events_json(&mut self) -> String {
            let events = self.state.drain_events();
            serde_json::to_string(&events).unwrap_or_else(|_| String::from("[]"))
        }

        pub fn settings_json(&self) -> String {
            serde_json::to_string(&self.state.settings).unwrap_or_else(|_| String::from("{}"))
        }

        /// Replace settings from the options menu and persist them
        pub fn set_settings_json(&mut self, json: &str) -> Result<(), JsValue> {
            let settings: Settings =
                serde_json::from_str(json).map_err(|e| js_sys::Error::new(&e.to_string()))?;
            settings.save();
            self.state.debug = if settings.collision_debug {
                DebugContext::verbose()
            } else {
                DebugContext::off()
            };
            self.state.settings = settings;
            Ok(())
        }

        pub fn tuning_json(&self) -> String {
            self.state.tuning.to_json()
        }
    }

    pub fn init() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&JsValue::from_str("Logger already initialised"));
        }
        log::info!("Brigantine starting...");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::init();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Brigantine (native) starting...");
    log::info!("Native mode runs a headless voyage - run with `trunk serve` for the web version");

    let tuning = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => brigantine::Tuning::from_json_or_default(&json),
            Err(e) => {
                log::warn!("Could not read tuning file {path}: {e}");
                brigantine::Tuning::default()
            }
        },
        None => brigantine::Tuning::default(),
    };
    headless_voyage(tuning);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Swim into the hull, climb the ladder, sail a while, then jump off
#[cfg(not(target_arch = "wasm32"))]
fn headless_voyage(tuning: brigantine::Tuning) {
    use brigantine::consts::*;
    use brigantine::sim::{GameState, HullModel, TickInput, tick};
    use brigantine::{DebugContext, Settings};
    use glam::Vec2;

    let mut state = GameState::new(tuning, Settings::default(), DebugContext::verbose());
    let harbour = Vec2::new(WORLD_WIDTH, WORLD_HEIGHT) * 0.5;
    let model = HullModel::brigantine();
    let ship = state.spawn_ship("brigantine", model.clone(), harbour, 0.0);
    let Some(hull) = state.entity(ship).and_then(|e| e.body()) else {
        log::warn!("Ship spawned without a hull body");
        return;
    };
    let player = state.spawn_player(harbour + Vec2::new(0.0, 120.0));

    let swim = TickInput {
        move_dir: Vec2::new(0.0, -1.0),
        ..Default::default()
    };
    for _ in 0..120 {
        tick(&mut state, &swim, SIM_DT);
    }
    match state.last_collision("player", "brigantine") {
        Some(record) => log::info!(
            "Bumped the hull: depth {:.2} via {:?} at t={:.0}ms",
            record.depth,
            record.tier,
            record.timestamp_ms
        ),
        None => log::info!("Never touched the hull"),
    }

    let ladder_world = |state: &GameState| {
        state
            .world
            .get(hull)
            .map(|h| h.pose().local_to_world(model.ladder.center))
    };
    let climb = TickInput {
        interact_pressed: true,
        pointer_world: ladder_world(&state),
        ..Default::default()
    };
    tick(&mut state, &climb, SIM_DT);
    log::info!("Boarded: {}", state.is_boarded(player));

    let sail = TickInput {
        primary_held: true,
        helm: 0.3,
        ..Default::default()
    };
    for _ in 0..300 {
        tick(&mut state, &sail, SIM_DT);
    }
    if let Some(h) = state.world.get(hull) {
        log::info!("Ship at ({:.0}, {:.0}) heading {:.2} rad", h.pos.x, h.pos.y, h.angle);
    }

    let jump = TickInput {
        interact_pressed: true,
        pointer_world: ladder_world(&state),
        ..Default::default()
    };
    tick(&mut state, &jump, SIM_DT);
    log::info!("Boarded after jump: {}", state.is_boarded(player));

    let stats = state.detector.stats();
    log::info!(
        "Detector: {} native queries, {} sweeps, {} SAT, {} AABB, {} radius",
        stats.native_queries,
        stats.sweeps,
        stats.sat_runs,
        stats.aabb_runs,
        stats.radius_runs
    );
    log::info!("{} events queued", state.drain_events().len());
}
