//! Dispatcher integration tests.
//!
//! These tests drive the whole engine through the `EventTrigger` facade:
//! frames are computed on the test thread while handlers run on the real
//! dispatch thread. Handlers report back over crossbeam channels or shared
//! counters; blocking handlers use a channel as a gate so the tests can hold
//! a batch open deterministically.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use glam::Vec2;

use rpg_event_core::components::blocking::BlockingBehavior;
use rpg_event_core::components::eventhandler::{EventContext, EventHandler, HandlerResult};
use rpg_event_core::components::eventobject::{EventId, EventObject};
use rpg_event_core::components::movehandler::VectorMovement;
use rpg_event_core::components::polygon::PolygonObject;
use rpg_event_core::components::rect::Rect;
use rpg_event_core::error::{EngineError, HandlerError};
use rpg_event_core::events::command::EventCommand;
use rpg_event_core::events::frame::EventView;
use rpg_event_core::game::EventTrigger;
use rpg_event_core::resources::activeevents::{EventSpawn, PolygonSpawn};
use rpg_event_core::resources::dispatcher::{BatchOutcome, DispatchState, EventDispatcher};
use rpg_event_core::resources::engineconfig::EngineConfig;
use rpg_event_core::resources::globalstate::GlobalState;

const EPSILON: f32 = 1e-6;
const WAIT: Duration = Duration::from_secs(5);

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn make_engine() -> EventTrigger {
    let config = EngineConfig {
        max_delta: 1.0,
        ..EngineConfig::new()
    };
    EventTrigger::new(config).unwrap()
}

fn square(id: u32, x: f32, y: f32) -> EventObject {
    EventObject::new(EventId(id), Rect::new(x, y, 10.0, 10.0))
        .with_blocking(BlockingBehavior::FlyingHigh)
}

fn frame(engine: &mut EventTrigger, delta_time: f32, action_key_down: bool) {
    engine.compute(delta_time, action_key_down);
    assert!(engine.wait_dispatch_idle(WAIT));
}

/// Records every callback as a line of text.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    consume_push: bool,
}

impl Recorder {
    fn consuming_push() -> Self {
        Self {
            consume_push: true,
            ..Self::default()
        }
    }

    fn log(&self, line: String) {
        self.calls.lock().unwrap().push(line);
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl EventHandler for Recorder {
    fn on_touch(&self, _ctx: &EventContext, this: &EventView, trigger: &EventView) -> HandlerResult {
        self.log(format!("touch {} by {}", this.id, trigger.id));
        Ok(false)
    }

    fn on_push(&self, _ctx: &EventContext, this: &EventView, trigger: &EventView) -> HandlerResult {
        self.log(format!("push {} by {}", this.id, trigger.id));
        Ok(self.consume_push)
    }

    fn on_state_change(
        &self,
        _ctx: &EventContext,
        this: &EventView,
        _state: &GlobalState,
    ) -> Result<(), HandlerError> {
        self.log(format!("state {}", this.id));
        Ok(())
    }
}

/// Blocks in its first `on_timer` call until released, then records the
/// delta time of every call.
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
    first: AtomicBool,
    deltas: Mutex<Vec<f32>>,
}

impl Gate {
    fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        (
            Self {
                entered: entered_tx,
                release: release_rx,
                first: AtomicBool::new(true),
                deltas: Mutex::new(Vec::new()),
            },
            entered_rx,
            release_tx,
        )
    }
}

impl EventHandler for Gate {
    fn on_timer(&self, _ctx: &EventContext, _this: &EventView, delta_time: f32) -> HandlerResult {
        self.deltas.lock().unwrap().push(delta_time);
        if self.first.swap(false, Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(WAIT);
        }
        Ok(false)
    }
}

// ==================== HANDOFF ====================

#[test]
fn frames_computed_while_busy_merge_into_one_batch() {
    let mut engine = make_engine();
    let (gate, entered, release) = Gate::new();
    let gate = Arc::new(gate);
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_shared_handler(gate.clone()))
        .unwrap();

    engine.compute(0.1, false);
    entered.recv_timeout(WAIT).unwrap();
    assert_eq!(engine.dispatch_state(), DispatchState::Dispatching);

    engine.compute(0.2, true);
    engine.compute(0.3, false);
    release.send(()).unwrap();
    assert!(engine.wait_dispatch_idle(WAIT));

    assert_eq!(engine.dispatch_batches(), 2);
    let report = engine.last_batch().unwrap();
    assert!(approx_eq(report.delta_time, 0.5));
    assert!(report.action_key_down);
    assert_eq!(report.frame, 3);
    let deltas = gate.deltas.lock().unwrap().clone();
    assert_eq!(deltas.len(), 2);
    assert!(approx_eq(deltas[0], 0.1));
    assert!(approx_eq(deltas[1], 0.5));
}

#[test]
fn handlers_see_committed_positions() {
    struct Watcher(Sender<f32>);
    impl EventHandler for Watcher {
        fn on_timer(&self, _ctx: &EventContext, this: &EventView, _dt: f32) -> HandlerResult {
            let _ = self.0.send(this.touch_bound.x);
            Ok(false)
        }
    }

    let mut engine = make_engine();
    let (tx, rx) = unbounded();
    engine
        .spawn(
            EventSpawn::new(square(1, 0.0, 0.0))
                .with_movement(VectorMovement::new(5.0, 0.0))
                .with_handler(Watcher(tx)),
        )
        .unwrap();

    for _ in 0..4 {
        frame(&mut engine, 0.016, false);
        let seen_x = rx.recv_timeout(WAIT).unwrap();
        let committed_x = engine.event(EventId(1)).unwrap().position().x;
        assert!(approx_eq(seen_x, committed_x));
    }
    assert!(approx_eq(engine.event(EventId(1)).unwrap().position().x, 20.0));
}

// ==================== TOUCH / PUSH ====================

#[test]
fn push_fires_for_reachable_pushable_partner() {
    let mut engine = make_engine();
    let crate_handler = Arc::new(Recorder::consuming_push());
    // Q consumes input, P is pushable 5px away.
    engine
        .spawn(square(1, 0.0, 0.0).consuming_input(true))
        .unwrap();
    engine
        .spawn(
            EventSpawn::new(square(2, 15.0, 0.0).pushable(true))
                .with_shared_handler(crate_handler.clone()),
        )
        .unwrap();

    frame(&mut engine, 0.016, true);
    assert_eq!(crate_handler.count("push 2 by 1"), 1);
    assert_eq!(
        engine.last_batch().unwrap().outcome,
        BatchOutcome::Consumed(EventId(2))
    );
    assert!(engine.interaction(EventId(1)).unwrap().reachable.contains(&EventId(2)));

    frame(&mut engine, 0.016, false);
    assert_eq!(crate_handler.count("push"), 1);

    engine.event_mut(EventId(2)).unwrap().force_move_to(35.0, 0.0);
    frame(&mut engine, 0.016, false);
    assert!(engine.interaction(EventId(1)).unwrap().reachable.is_empty());

    frame(&mut engine, 0.016, true);
    assert_eq!(crate_handler.count("push"), 1);
}

#[test]
fn touch_fires_once_per_contact_episode() {
    let mut engine = make_engine();
    let chest = Arc::new(Recorder::default());
    engine
        .spawn(square(1, 0.0, 0.0).consuming_input(true))
        .unwrap();
    engine
        .spawn(EventSpawn::new(square(2, 5.0, 0.0).touchable(true)).with_shared_handler(chest.clone()))
        .unwrap();

    for _ in 0..3 {
        frame(&mut engine, 0.016, false);
    }
    assert_eq!(chest.count("touch 2 by 1"), 1);

    engine.event_mut(EventId(1)).unwrap().force_move_to(-50.0, 0.0);
    frame(&mut engine, 0.016, false);
    assert!(engine.interaction(EventId(1)).unwrap().just_touching.is_empty());

    engine.event_mut(EventId(1)).unwrap().force_move_to(0.0, 0.0);
    frame(&mut engine, 0.016, false);
    frame(&mut engine, 0.016, false);
    assert_eq!(chest.count("touch"), 2);

    let interaction = engine.interaction(EventId(1)).unwrap();
    for id in interaction.just_touching.ids() {
        assert!(interaction.collision.contains(&id));
    }
}

// ==================== ERRORS / STATE ====================

#[test]
fn failing_handlers_do_not_stop_the_batch() {
    struct Broken;
    impl EventHandler for Broken {
        fn on_timer(&self, _ctx: &EventContext, _this: &EventView, _dt: f32) -> HandlerResult {
            panic!("script bug");
        }
    }
    struct Failing;
    impl EventHandler for Failing {
        fn on_timer(&self, _ctx: &EventContext, _this: &EventView, _dt: f32) -> HandlerResult {
            Err(HandlerError::new("bad script"))
        }
    }
    struct Counter(Arc<AtomicU32>);
    impl EventHandler for Counter {
        fn on_timer(&self, _ctx: &EventContext, _this: &EventView, _dt: f32) -> HandlerResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    let mut engine = make_engine();
    let calls = Arc::new(AtomicU32::new(0));
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_handler(Broken))
        .unwrap();
    engine
        .spawn(EventSpawn::new(square(2, 50.0, 0.0)).with_handler(Failing))
        .unwrap();
    engine
        .spawn(EventSpawn::new(square(3, 100.0, 0.0)).with_handler(Counter(calls.clone())))
        .unwrap();

    frame(&mut engine, 0.016, false);
    frame(&mut engine, 0.016, false);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.last_batch().unwrap().outcome, BatchOutcome::Completed);
}

#[test]
fn state_change_is_reported_once_per_change() {
    let mut engine = make_engine();
    let sign = Arc::new(Recorder::default());
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_shared_handler(sign.clone()))
        .unwrap();

    // The first batch reports the state the handlers start from.
    frame(&mut engine, 0.016, false);
    assert_eq!(sign.count("state 1"), 1);
    frame(&mut engine, 0.016, false);
    assert_eq!(sign.count("state 1"), 1);

    engine.global_state().set_flag("bridge_repaired");
    frame(&mut engine, 0.016, false);
    frame(&mut engine, 0.016, false);
    assert_eq!(sign.count("state 1"), 2);
}

#[test]
fn state_set_before_the_first_frame_is_reported() {
    let mut engine = make_engine();
    let sign = Arc::new(Recorder::default());
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_shared_handler(sign.clone()))
        .unwrap();
    engine.global_state().set_integer("gold", 10);
    frame(&mut engine, 0.016, false);
    assert_eq!(sign.count("state 1"), 1);
}

// ==================== POLYGONS ====================

#[test]
fn walking_onto_a_touchable_polygon_fires_on_touch_once() {
    let mut engine = make_engine();
    let sign = Arc::new(Recorder::default());
    engine
        .spawn(
            EventSpawn::new(square(1, 0.0, 0.0).consuming_input(true))
                .with_movement(VectorMovement::new(4.0, 0.0)),
        )
        .unwrap();
    let post = PolygonObject::new(
        EventId(50),
        vec![Vec2::new(20.0, -20.0), Vec2::new(20.0, 30.0)],
    )
    .unwrap()
    .with_blocking(BlockingBehavior::None)
    .touchable(true);
    engine
        .spawn_polygon(PolygonSpawn::new(post).with_shared_handler(sign.clone()))
        .unwrap();

    for _ in 0..6 {
        frame(&mut engine, 0.016, false);
    }
    assert_eq!(sign.count("touch 50 by 1"), 1);
    assert_eq!(engine.polygon_ids(), vec![EventId(50)]);
    let last = engine.last_frame().unwrap();
    assert_eq!(last.polygons().len(), 1);
    assert_eq!(last.len(), 1);
}

#[test]
fn polygon_handlers_get_timer_and_state_callbacks() {
    struct Ticks(Arc<AtomicU32>, Arc<AtomicU32>);
    impl EventHandler for Ticks {
        fn on_timer(&self, _ctx: &EventContext, _this: &EventView, _dt: f32) -> HandlerResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
        fn on_state_change(
            &self,
            _ctx: &EventContext,
            _this: &EventView,
            _state: &GlobalState,
        ) -> Result<(), HandlerError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let mut engine = make_engine();
    let ticks = Arc::new(AtomicU32::new(0));
    let states = Arc::new(AtomicU32::new(0));
    let river = PolygonObject::new(
        EventId(60),
        vec![Vec2::new(0.0, 0.0), Vec2::new(50.0, 0.0), Vec2::new(50.0, 50.0)],
    )
    .unwrap()
    .closed(true);
    engine
        .spawn_polygon(PolygonSpawn::new(river).with_handler(Ticks(ticks.clone(), states.clone())))
        .unwrap();

    frame(&mut engine, 0.016, false);
    frame(&mut engine, 0.016, false);
    engine.global_state().set_flag("flooded");
    frame(&mut engine, 0.016, false);
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
    assert_eq!(states.load(Ordering::SeqCst), 2);

    engine.dispose();
    assert!(engine.polygon_ids().is_empty());
}

// ==================== COMMANDS ====================

#[test]
fn handler_commands_apply_on_the_next_frame() {
    struct Teleporter;
    impl EventHandler for Teleporter {
        fn on_touch(&self, ctx: &EventContext, this: &EventView, _trigger: &EventView) -> HandlerResult {
            ctx.move_to(this.id, 100.0, 100.0);
            ctx.send(EventCommand::SetTouchable {
                id: this.id,
                value: false,
            });
            Ok(true)
        }
    }

    let mut engine = make_engine();
    engine
        .spawn(square(1, 0.0, 0.0).consuming_input(true))
        .unwrap();
    engine
        .spawn(EventSpawn::new(square(2, 5.0, 0.0).touchable(true)).with_handler(Teleporter))
        .unwrap();

    frame(&mut engine, 0.016, false);
    assert!(approx_eq(engine.event(EventId(2)).unwrap().position().x, 5.0));

    frame(&mut engine, 0.016, false);
    let teleported = engine.event(EventId(2)).unwrap();
    assert!(approx_eq(teleported.position().x, 100.0));
    assert!(!teleported.touchable);
    assert!(engine.interaction(EventId(1)).unwrap().collision.is_empty());
}

#[test]
fn custom_triggers_reach_the_handler() {
    struct Lever(Sender<i32>);
    impl EventHandler for Lever {
        fn on_custom_trigger(&self, _ctx: &EventContext, _this: &EventView, trigger_id: i32) -> HandlerResult {
            let _ = self.0.send(trigger_id);
            Ok(false)
        }
    }

    let mut engine = make_engine();
    let (tx, rx) = bounded(4);
    engine
        .spawn(EventSpawn::new(square(7, 0.0, 0.0)).with_handler(Lever(tx)))
        .unwrap();
    engine.send_command(EventCommand::CustomTrigger {
        id: EventId(7),
        trigger_id: 12,
    });
    frame(&mut engine, 0.016, false);
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 12);
}

// ==================== LIFECYCLE ====================

#[test]
fn duplicate_ids_are_rejected() {
    let mut engine = make_engine();
    engine.spawn(square(1, 0.0, 0.0)).unwrap();
    assert!(matches!(
        engine.spawn(square(1, 20.0, 0.0)),
        Err(EngineError::DuplicateId(EventId(1)))
    ));
    assert_eq!(engine.len(), 1);
}

#[test]
fn dispose_is_idempotent() {
    let mut engine = make_engine();
    engine.spawn(square(1, 0.0, 0.0)).unwrap();
    frame(&mut engine, 0.016, false);

    engine.dispose();
    engine.dispose();
    assert!(engine.is_disposed());
    assert_eq!(engine.dispatch_state(), DispatchState::Disposed);
    assert!(engine.is_empty());
    engine.compute(0.016, false);
}

#[test]
fn dispose_during_a_batch_skips_remaining_callbacks() {
    let mut engine = make_engine();
    let (gate, entered, release) = Gate::new();
    let later = Arc::new(Recorder::default());
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_handler(gate))
        .unwrap();
    engine
        .spawn(EventSpawn::new(square(2, 50.0, 0.0)).with_shared_handler(later.clone()))
        .unwrap();
    engine.global_state().set_flag("changed");

    engine.compute(0.016, false);
    entered.recv_timeout(WAIT).unwrap();
    engine.world().resource::<EventDispatcher>().dispose();
    release.send(()).unwrap();

    assert!(engine.shutdown(WAIT));
    assert_eq!(later.count("state"), 0);
}

#[test]
fn dispose_returns_while_a_handler_is_blocked() {
    let mut engine = make_engine();
    let (gate, entered, release) = Gate::new();
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_handler(gate))
        .unwrap();
    engine.compute(0.016, false);
    entered.recv_timeout(WAIT).unwrap();

    let started = Instant::now();
    engine.dispose();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(engine.is_disposed());
    assert!(engine.is_empty());

    release.send(()).unwrap();
    assert!(engine.shutdown(WAIT));
    assert_eq!(engine.dispatch_state(), DispatchState::Disposed);
}

#[test]
fn shutdown_gives_up_on_a_stuck_handler() {
    let mut engine = make_engine();
    let (gate, entered, release) = Gate::new();
    engine
        .spawn(EventSpawn::new(square(1, 0.0, 0.0)).with_handler(gate))
        .unwrap();
    engine.compute(0.016, false);
    entered.recv_timeout(WAIT).unwrap();

    let started = Instant::now();
    assert!(!engine.shutdown(Duration::from_millis(100)));
    assert!(started.elapsed() < Duration::from_secs(2));
    release.send(()).unwrap();
}

#[test]
fn dispose_drops_jobs_still_queued() {
    let mut engine = make_engine();
    let (entered_tx, entered_rx) = unbounded::<()>();
    let (release_tx, release_rx) = unbounded::<()>();
    let ran = Arc::new(AtomicU32::new(0));
    engine
        .post_job("dialog", move || {
            let _ = entered_tx.send(());
            let _ = release_rx.recv_timeout(WAIT);
            Ok(())
        })
        .unwrap();
    for i in 0..3 {
        let ran = Arc::clone(&ran);
        engine
            .post_job(format!("after {}", i), move || {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    }
    entered_rx.recv_timeout(WAIT).unwrap();

    engine.dispose();
    release_tx.send(()).unwrap();
    assert!(engine.shutdown(WAIT));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn jobs_run_in_order() {
    let engine = make_engine();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..4 {
        let order = Arc::clone(&order);
        engine
            .post_job(format!("step {}", i), move || {
                order.lock().unwrap().push(i);
                Ok(())
            })
            .unwrap();
    }
    let mut waited = 0;
    while !engine.is_job_queue_empty() && waited < 500 {
        std::thread::sleep(Duration::from_millis(5));
        waited += 1;
    }
    assert!(engine.is_job_queue_empty());
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn snapshot_restores_positions_and_flags() {
    let mut engine = make_engine();
    engine
        .spawn(
            EventSpawn::new(square(1, 0.0, 0.0).pushable(true))
                .with_movement(VectorMovement::new(3.0, 0.0).for_frames(2)),
        )
        .unwrap();
    let saved = engine.snapshot();

    frame(&mut engine, 0.016, false);
    frame(&mut engine, 0.016, false);
    engine.event_mut(EventId(1)).unwrap().pushable = false;
    assert!(approx_eq(engine.event(EventId(1)).unwrap().position().x, 6.0));

    assert!(engine.restore(&saved).is_empty());
    let restored = engine.event(EventId(1)).unwrap();
    assert!(approx_eq(restored.position().x, 0.0));
    assert!(restored.pushable);
}
