//! The event engine facade.
//!
//! [`EventTrigger`] owns the ECS world holding the active events, the frame
//! schedule and the worker threads. A host drives it with one
//! [`EventTrigger::compute`] call per rendered frame:
//!
//! 1. the raw delta is clamped and scaled into [`WorldTime`]
//! 2. [`apply_event_commands`] applies what handlers queued last batch
//! 3. [`propose_moves`] asks every movement policy for a move
//! 4. [`interaction_scan`] updates collisions and commits or rolls back moves
//! 5. [`publish_frame`] hands the committed frame to the dispatch thread
//!
//! Handlers then run on the dispatch thread while the host renders.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use log::{info, warn};

use crate::components::eventhandler::EventContext;
use crate::components::eventobject::{EventId, EventObject};
use crate::components::interaction::Interaction;
use crate::components::polygon::PolygonObject;
use crate::components::rect::Rect;
use crate::error::{EngineError, HandlerError};
use crate::events::command::EventCommand;
use crate::events::frame::FrameSnapshot;
use crate::resources::activeevents::{
    ActiveEvents, EventSpawn, PolygonSpawn, clear_collision, despawn_event, spawn_event,
    spawn_polygon,
};
use crate::resources::blockingrules::BlockingRules;
use crate::resources::commandqueue::EventCommands;
use crate::resources::dispatcher::{
    BatchReport, DispatchState, EventDispatcher, setup_event_dispatch, shutdown_event_dispatch,
};
use crate::resources::engineconfig::EngineConfig;
use crate::resources::frameinput::{FrameInput, LastFrame};
use crate::resources::globalstate::GlobalState;
use crate::resources::jobqueue::{JobQueue, setup_job_queue, shutdown_job_queue};
use crate::resources::worldtime::WorldTime;
use crate::snapshot::{self, EventSnapshot};
use crate::systems::collision::interaction_scan;
use crate::systems::commands::apply_event_commands;
use crate::systems::dispatch::publish_frame;
use crate::systems::movement::propose_moves;
use crate::systems::time::update_world_time;

pub struct EventTrigger {
    world: World,
    schedule: Schedule,
    disposed: bool,
}

impl EventTrigger {
    /// Build the world, the frame schedule and the worker threads enabled
    /// in `config`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut world = World::new();
        world.insert_resource(WorldTime::with_time_scale(config.time_scale));
        world.insert_resource(ActiveEvents::default());
        world.insert_resource(BlockingRules::default());
        world.insert_resource(GlobalState::default());
        world.insert_resource(EventCommands::default());
        world.insert_resource(FrameInput::default());
        world.insert_resource(LastFrame::default());

        if config.dispatch_enabled {
            setup_event_dispatch(&mut world)?;
        }
        if config.job_queue_enabled {
            setup_job_queue(&mut world)?;
        }
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                apply_event_commands,
                propose_moves,
                interaction_scan,
                publish_frame,
            )
                .chain(),
        );
        schedule
            .initialize(&mut world)
            .map_err(|e| EngineError::Schedule(format!("{e:?}")))?;

        info!("Event engine ready");
        Ok(Self {
            world,
            schedule,
            disposed: false,
        })
    }

    /// Load the config at `path` and build the engine. A missing or
    /// unreadable file falls back to defaults.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let mut config = EngineConfig::with_path(path.as_ref());
        if let Err(e) = config.load_from_file() {
            warn!("{}; using default configuration", e);
        }
        Self::new(config)
    }

    /// Advance one frame.
    ///
    /// Returns immediately after publishing the frame; handlers run on the
    /// dispatch thread. Does nothing once disposed.
    pub fn compute(&mut self, delta_time: f32, action_key_down: bool) {
        if self.disposed {
            return;
        }
        update_world_time(&mut self.world, delta_time);
        self.world.resource_mut::<FrameInput>().action_key_down = action_key_down;
        self.schedule.run(&mut self.world);
        self.world.clear_trackers();
    }

    /// A new event with the configured default outreach.
    pub fn new_event(&self, id: EventId, touch_bound: Rect) -> EventObject {
        EventObject::new(id, touch_bound).with_outreach(self.config().default_outreach)
    }

    pub fn spawn(&mut self, spawn: impl Into<EventSpawn>) -> Result<Entity, EngineError> {
        spawn_event(&mut self.world, spawn.into())
    }

    /// Register a map polygon. Its id must not be used by any event.
    pub fn spawn_polygon(&mut self, spawn: impl Into<PolygonSpawn>) -> Result<Entity, EngineError> {
        spawn_polygon(&mut self.world, spawn.into())
    }

    /// Remove an event or polygon.
    pub fn despawn(&mut self, id: EventId) -> Result<(), EngineError> {
        despawn_event(&mut self.world, id)
    }

    pub fn clear_collision(&mut self, id: EventId) -> Result<(), EngineError> {
        clear_collision(&mut self.world, id)
    }

    pub fn event(&self, id: EventId) -> Option<&EventObject> {
        let entity = self.world.resource::<ActiveEvents>().get(id)?;
        self.world.get::<EventObject>(entity)
    }

    /// Mutable access for host-side edits between frames.
    pub fn event_mut(&mut self, id: EventId) -> Option<Mut<'_, EventObject>> {
        let entity = self.world.resource::<ActiveEvents>().get(id)?;
        self.world.get_mut::<EventObject>(entity)
    }

    pub fn polygon(&self, id: EventId) -> Option<&PolygonObject> {
        let entity = self.world.resource::<ActiveEvents>().get(id)?;
        self.world.get::<PolygonObject>(entity)
    }

    pub fn polygon_mut(&mut self, id: EventId) -> Option<Mut<'_, PolygonObject>> {
        let entity = self.world.resource::<ActiveEvents>().get(id)?;
        self.world.get_mut::<PolygonObject>(entity)
    }

    pub fn polygon_ids(&self) -> Vec<EventId> {
        self.world
            .resource::<ActiveEvents>()
            .polygons()
            .iter()
            .filter_map(|e| self.world.get::<PolygonObject>(*e).map(|p| p.id))
            .collect()
    }

    pub fn interaction(&self, id: EventId) -> Option<&Interaction> {
        let entity = self.world.resource::<ActiveEvents>().get(id)?;
        self.world.get::<Interaction>(entity)
    }

    /// Active event ids in list order.
    pub fn event_ids(&self) -> Vec<EventId> {
        self.world
            .resource::<ActiveEvents>()
            .entities()
            .iter()
            .filter_map(|e| self.world.get::<EventObject>(*e).map(|ev| ev.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.world.resource::<ActiveEvents>().len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.resource::<ActiveEvents>().is_empty()
    }

    pub fn global_state(&self) -> GlobalState {
        self.world.resource::<GlobalState>().clone()
    }

    pub fn blocking_rules_mut(&mut self) -> Mut<'_, BlockingRules> {
        self.world.resource_mut::<BlockingRules>()
    }

    pub fn set_blocking_rules(&mut self, rules: BlockingRules) {
        self.world.insert_resource(rules);
    }

    pub fn config(&self) -> &EngineConfig {
        self.world.resource::<EngineConfig>()
    }

    pub fn time(&self) -> WorldTime {
        *self.world.resource::<WorldTime>()
    }

    /// Queue a command as if a handler had sent it.
    pub fn send_command(&self, command: EventCommand) {
        // Both channel ends live in the world, the send cannot fail.
        let _ = self.world.resource::<EventCommands>().tx.send(command);
    }

    /// Handler context, `None` when dispatch is disabled.
    pub fn context(&self) -> Option<EventContext> {
        self.world
            .get_resource::<EventDispatcher>()
            .map(|d| d.context().clone())
    }

    /// The most recent post-commit frame.
    pub fn last_frame(&self) -> Option<Arc<FrameSnapshot>> {
        self.world.resource::<LastFrame>().0.clone()
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.world
            .get_resource::<EventDispatcher>()
            .map_or(DispatchState::Disposed, EventDispatcher::state)
    }

    pub fn dispatch_batches(&self) -> u64 {
        self.world
            .get_resource::<EventDispatcher>()
            .map_or(0, EventDispatcher::batches)
    }

    pub fn last_batch(&self) -> Option<BatchReport> {
        self.world
            .get_resource::<EventDispatcher>()
            .and_then(EventDispatcher::last_batch)
    }

    /// Block until the dispatcher has no pending frame and no running batch.
    /// Returns `false` on timeout or when dispatch is disabled.
    pub fn wait_dispatch_idle(&self, timeout: Duration) -> bool {
        self.world
            .get_resource::<EventDispatcher>()
            .is_some_and(|d| d.wait_idle(timeout))
    }

    pub fn post_job(
        &self,
        description: impl Into<String>,
        job: impl FnOnce() -> Result<(), HandlerError> + Send + 'static,
    ) -> Result<(), EngineError> {
        self.world
            .get_resource::<JobQueue>()
            .ok_or_else(|| EngineError::Worker("job queue disabled".into()))?
            .post(description, job)
    }

    pub fn is_job_queue_empty(&self) -> bool {
        self.world
            .get_resource::<JobQueue>()
            .is_none_or(JobQueue::is_empty)
    }

    pub fn snapshot(&self) -> Vec<EventSnapshot> {
        snapshot::snapshot_events(&self.world)
    }

    /// Returns the ids of snapshots without an active event.
    pub fn restore(&mut self, snapshots: &[EventSnapshot]) -> Vec<EventId> {
        snapshot::restore_events(&mut self.world, snapshots)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Signal the worker threads to stop and dispose every handler.
    ///
    /// Never waits for a running handler or job: the dispatch thread exits
    /// once its current callback returns, queued jobs are dropped. Use
    /// [`shutdown`](Self::shutdown) to also join the threads. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(dispatcher) = self.world.get_resource::<EventDispatcher>() {
            dispatcher.dispose();
        }
        if let Some(queue) = self.world.get_resource::<JobQueue>() {
            queue.dispose();
        }
        for id in self.event_ids().into_iter().chain(self.polygon_ids()) {
            if let Err(e) = despawn_event(&mut self.world, id) {
                warn!("Dispose of event {} failed: {}", id, e);
            }
        }
        info!("Event engine disposed");
    }

    /// Dispose, then join the worker threads within `timeout` overall.
    ///
    /// Returns `false` if a thread was still busy at the deadline; it is
    /// detached and exits on its own once its callback returns.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.dispose();
        let dispatch_joined = shutdown_event_dispatch(&mut self.world, timeout);
        let remaining = deadline.saturating_duration_since(Instant::now());
        let jobs_joined = shutdown_job_queue(&mut self.world, remaining);
        dispatch_joined && jobs_joined
    }
}
