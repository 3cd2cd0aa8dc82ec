//! Headless demo of the event engine.
//!
//! Builds a small map (a player walking east, a chest, a pushable crate, a
//! wall, a wandering villager and a fence keeping the villager off the
//! road), runs it for a number of fixed-step frames and prints where
//! everything ended up.
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --frames 240 --snapshot events.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use glam::Vec2;
use log::info;

use rpg_event_core::components::blocking::BlockingBehavior;
use rpg_event_core::components::direction::Direction;
use rpg_event_core::components::eventhandler::{EventContext, EventHandler, HandlerResult};
use rpg_event_core::components::eventobject::{EventId, EventKind};
use rpg_event_core::components::movehandler::{DirectionalMovement, RandomMovement};
use rpg_event_core::components::polygon::PolygonObject;
use rpg_event_core::components::rect::Rect;
use rpg_event_core::components::speed::Speed;
use rpg_event_core::error::{EngineError, HandlerError};
use rpg_event_core::events::frame::EventView;
use rpg_event_core::game::EventTrigger;
use rpg_event_core::resources::activeevents::EventSpawn;
use rpg_event_core::resources::engineconfig::EngineConfig;
use rpg_event_core::resources::globalstate::GlobalState;
use rpg_event_core::snapshot;

const FRAME_TIME: f32 = 1.0 / 60.0;

const PLAYER: EventId = EventId(1);
const CHEST: EventId = EventId(2);
const CRATE: EventId = EventId(3);
const WALL: EventId = EventId(4);
const VILLAGER: EventId = EventId(5);
const FENCE: EventId = EventId(6);

/// RPG event engine demo
#[derive(Parser)]
#[command(version, about = "Runs a headless demo map through the event engine.")]
struct Cli {
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 180)]
    frames: u32,

    /// INI configuration file; defaults are used if it is missing.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the final event state as JSON to this path.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Log per-frame details.
    #[arg(long, short)]
    verbose: bool,
}

struct Chest;

impl EventHandler for Chest {
    fn on_touch(&self, ctx: &EventContext, this: &EventView, trigger: &EventView) -> HandlerResult {
        let state = ctx.global_state();
        if state.has_flag("chest_opened") {
            return Ok(false);
        }
        info!("{:?} opened the chest {}", trigger.name, this.id);
        state.set_flag("chest_opened");
        state.set_integer("gold", state.get_integer("gold").unwrap_or(0) + 50);
        Ok(true)
    }
}

struct Crate;

impl EventHandler for Crate {
    fn on_push(&self, ctx: &EventContext, this: &EventView, trigger: &EventView) -> HandlerResult {
        let away = this.touch_bound.center() - trigger.touch_bound.center();
        let step = Direction::from_movement(away.x, away.y).scaled(8.0);
        ctx.offer_move(this.id, step.x, step.y);
        info!("Crate pushed by {}", trigger.id);
        Ok(true)
    }
}

struct Villager;

impl EventHandler for Villager {
    fn on_state_change(
        &self,
        _ctx: &EventContext,
        this: &EventView,
        state: &GlobalState,
    ) -> Result<(), HandlerError> {
        if state.has_flag("chest_opened") {
            info!("Villager {}: \"You found the treasure!\"", this.id);
        }
        Ok(())
    }
}

fn build_scene(engine: &mut EventTrigger) -> Result<(), EngineError> {
    let player = engine
        .new_event(PLAYER, Rect::new(0.0, 0.0, 16.0, 16.0))
        .with_name("hero")
        .with_kind(EventKind::Player)
        .with_speed(Speed::Normal)
        .with_blocking(BlockingBehavior::PassesNoBarrier)
        .consuming_input(true);
    engine.spawn(EventSpawn::new(player).with_movement(DirectionalMovement::new(Direction::E)))?;

    let chest = engine
        .new_event(CHEST, Rect::new(60.0, 0.0, 16.0, 16.0))
        .with_name("chest")
        .with_blocking(BlockingBehavior::FlyingHigh)
        .touchable(true);
    engine.spawn(EventSpawn::new(chest).with_handler(Chest))?;

    let crate_box = engine
        .new_event(CRATE, Rect::new(140.0, 0.0, 16.0, 16.0))
        .with_name("crate")
        .with_blocking(BlockingBehavior::BuildingLow)
        .pushable(true);
    engine.spawn(EventSpawn::new(crate_box).with_handler(Crate))?;

    let wall = engine
        .new_event(WALL, Rect::new(220.0, -32.0, 16.0, 96.0))
        .with_blocking(BlockingBehavior::All);
    engine.spawn(wall)?;

    let villager = engine
        .new_event(VILLAGER, Rect::new(100.0, 60.0, 16.0, 16.0))
        .with_name("villager")
        .with_speed(Speed::Stroll);
    engine.spawn(
        EventSpawn::new(villager)
            .with_movement(RandomMovement::new(64).with_seed(42))
            .with_handler(Villager),
    )?;

    let fence = PolygonObject::new(
        FENCE,
        vec![Vec2::new(40.0, 40.0), Vec2::new(200.0, 40.0), Vec2::new(200.0, 120.0)],
    )?
    .with_name("fence");
    engine.spawn_polygon(fence)?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let mut engine = match &cli.config {
        Some(path) => EventTrigger::from_config_file(path)?,
        None => EventTrigger::new(EngineConfig::new())?,
    };
    build_scene(&mut engine)?;

    for frame in 0..cli.frames {
        let action = frame % 30 == 29;
        engine.compute(FRAME_TIME, action);
    }
    if !engine.wait_dispatch_idle(Duration::from_secs(2)) {
        info!("Dispatcher still busy after the last frame");
    }

    for id in engine.event_ids() {
        if let Some(event) = engine.event(id) {
            let pos = event.position();
            println!("{:<24} at ({:>7.2}, {:>7.2})", event.to_string(), pos.x, pos.y);
        }
    }
    let state = engine.global_state();
    println!(
        "chest opened: {}, gold: {}",
        state.has_flag("chest_opened"),
        state.get_integer("gold").unwrap_or(0)
    );

    if let Some(path) = &cli.snapshot {
        snapshot::save_to_path(path, &engine.snapshot())?;
        println!("Snapshot written to {}", path.display());
    }
    if !engine.shutdown(Duration::from_secs(2)) {
        info!("Worker threads still busy at exit, detached");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
