//! ECS resource bridging the simulation with the event dispatch thread.
//!
//! Use [`setup_event_dispatch`] once during initialization to spawn the
//! dispatch thread and insert the [`EventDispatcher`] resource.
//! [`EventDispatcher::dispose`] only signals the thread and never waits for
//! a handler; [`shutdown_event_dispatch`] additionally joins it within a
//! deadline.
//!
//! The two threads share a single-slot [`Mailbox`] guarded by a mutex and a
//! condition variable. The simulation publishes each post-commit frame into
//! the slot; if the dispatch thread is still busy with an earlier batch the
//! new frame replaces the pending one while its delta time is summed and its
//! action key flag is OR-ed, so no input is lost and at most one batch is in
//! flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use crossbeam_channel::Sender;
use log::info;

use crate::components::eventhandler::EventContext;
use crate::components::eventobject::EventId;
use crate::error::EngineError;
use crate::events::command::EventCommand;
use crate::events::frame::FrameSnapshot;
use crate::resources::commandqueue::EventCommands;
use crate::resources::globalstate::GlobalState;
use crate::resources::worker::join_within;
use crate::systems::dispatch::dispatch_thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// Waiting for a frame.
    #[default]
    Idle,
    /// Running handler callbacks for the last handed-off frame.
    Dispatching,
    /// Terminal; the thread exited or is about to.
    Disposed,
}

/// How a dispatch batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every event was visited.
    Completed,
    /// A handler of `id` consumed the input and ended the batch.
    Consumed(EventId),
    /// The dispatcher was disposed in the middle of the batch.
    Interrupted,
}

/// Summary of the last finished batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchReport {
    pub frame: u64,
    pub delta_time: f32,
    pub action_key_down: bool,
    pub outcome: BatchOutcome,
}

/// Work taken out of the mailbox by the dispatch thread.
#[derive(Debug)]
pub struct DispatchBatch {
    pub frame: Arc<FrameSnapshot>,
    pub delta_time: f32,
    pub action_key_down: bool,
    pub custom_triggers: Vec<(EventId, i32)>,
}

/// The single handoff slot.
#[derive(Debug, Default)]
pub struct Mailbox {
    frame: Option<Arc<FrameSnapshot>>,
    delta_time: f32,
    action_key_down: bool,
    custom_triggers: Vec<(EventId, i32)>,
    state: DispatchState,
    batches: u64,
    last_batch: Option<BatchReport>,
}

impl Mailbox {
    fn is_ready(&self) -> bool {
        self.frame.is_some()
    }

    /// Move the pending handoff out and reset the accumulators.
    pub(crate) fn take_batch(&mut self) -> Option<DispatchBatch> {
        let frame = self.frame.take()?;
        self.state = DispatchState::Dispatching;
        Some(DispatchBatch {
            frame,
            delta_time: std::mem::take(&mut self.delta_time),
            action_key_down: std::mem::take(&mut self.action_key_down),
            custom_triggers: std::mem::take(&mut self.custom_triggers),
        })
    }

    pub(crate) fn finish_batch(&mut self, report: BatchReport, disposed: bool) {
        self.batches += 1;
        self.last_batch = Some(report);
        self.state = if disposed {
            DispatchState::Disposed
        } else {
            DispatchState::Idle
        };
    }
}

/// State shared between the simulation and the dispatch thread.
#[derive(Debug, Default)]
pub struct Handoff {
    mailbox: Mutex<Mailbox>,
    signal: Condvar,
    disposed: Arc<AtomicBool>,
}

impl Handoff {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Block until a frame is pending or the dispatcher is disposed.
    /// Returns `None` on disposal.
    pub(crate) fn wait_for_batch(&self) -> Option<DispatchBatch> {
        let mut mailbox = self.lock();
        loop {
            if self.is_disposed() {
                mailbox.state = DispatchState::Disposed;
                self.signal.notify_all();
                return None;
            }
            if mailbox.is_ready() {
                return mailbox.take_batch();
            }
            mailbox = self
                .signal
                .wait(mailbox)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn finish_batch(&self, report: BatchReport) {
        let mut mailbox = self.lock();
        mailbox.finish_batch(report, self.is_disposed());
        self.signal.notify_all();
    }

    fn publish(
        &self,
        frame: Arc<FrameSnapshot>,
        delta_time: f32,
        action_key_down: bool,
        triggers: Vec<(EventId, i32)>,
    ) {
        let mut mailbox = self.lock();
        if mailbox.state == DispatchState::Disposed || self.is_disposed() {
            return;
        }
        mailbox.frame = Some(frame);
        mailbox.delta_time += delta_time;
        mailbox.action_key_down |= action_key_down;
        mailbox.custom_triggers.extend(triggers);
        self.signal.notify_all();
    }

    /// Returns `true` if this call performed the disposal.
    fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut mailbox = self.lock();
        if mailbox.state == DispatchState::Idle {
            mailbox.state = DispatchState::Disposed;
        }
        mailbox.frame = None;
        self.signal.notify_all();
        true
    }
}

/// Bridge between the ECS world and the dispatch thread.
#[derive(Resource)]
pub struct EventDispatcher {
    handoff: Arc<Handoff>,
    context: EventContext,
    handle: Option<JoinHandle<()>>,
}

impl EventDispatcher {
    /// Spawn the dispatch thread. Handlers get a context that queues
    /// commands on `commands` and reads `global`.
    pub fn spawn(commands: Sender<EventCommand>, global: GlobalState) -> Result<Self, EngineError> {
        let handoff = Arc::new(Handoff::default());
        let context = EventContext::new(commands, global, Arc::clone(&handoff.disposed));

        let thread_handoff = Arc::clone(&handoff);
        let thread_context = context.clone();
        let handle = std::thread::Builder::new()
            .name("event-dispatch".into())
            .spawn(move || dispatch_thread(thread_handoff, thread_context))
            .map_err(|e| EngineError::Worker(format!("failed to spawn dispatch thread: {}", e)))?;

        Ok(Self {
            handoff,
            context,
            handle: Some(handle),
        })
    }

    /// Hand off a post-commit frame. Never blocks on handler execution.
    pub fn publish(
        &self,
        frame: Arc<FrameSnapshot>,
        delta_time: f32,
        action_key_down: bool,
        custom_triggers: Vec<(EventId, i32)>,
    ) {
        self.handoff
            .publish(frame, delta_time, action_key_down, custom_triggers);
    }

    pub fn state(&self) -> DispatchState {
        self.handoff.lock().state
    }

    /// Number of finished batches.
    pub fn batches(&self) -> u64 {
        self.handoff.lock().batches
    }

    pub fn last_batch(&self) -> Option<BatchReport> {
        self.handoff.lock().last_batch
    }

    /// Context handed to handlers; also usable by the host.
    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// Wait until no frame is pending and no batch is running.
    /// Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut mailbox = self.handoff.lock();
        loop {
            let busy = mailbox.is_ready() || mailbox.state == DispatchState::Dispatching;
            if !busy {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            mailbox = self
                .handoff
                .signal
                .wait_timeout(mailbox, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.handoff.is_disposed()
    }

    /// Ask the thread to stop. Wakes a blocked wait; a running handler is
    /// not interrupted but no further callbacks start. Idempotent.
    pub fn dispose(&self) {
        if self.handoff.dispose() {
            info!("Event dispatcher disposed");
        }
    }

    /// Dispose and join the thread if it exits within `timeout`. A thread
    /// stuck in a handler is detached and `false` returned. Idempotent.
    pub fn shutdown_timeout(&mut self, timeout: Duration) -> bool {
        self.dispose();
        self.handle
            .take()
            .is_none_or(|handle| join_within(handle, timeout, "Event dispatch"))
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        // A handler may still be blocked; do not join here.
        self.dispose();
    }
}

/// Spawn the dispatch thread and register the [`EventDispatcher`] resource.
///
/// Requires the [`EventCommands`] and [`GlobalState`] resources.
pub fn setup_event_dispatch(world: &mut World) -> Result<(), EngineError> {
    let commands = world
        .get_resource::<EventCommands>()
        .map(EventCommands::sender)
        .ok_or_else(|| EngineError::Worker("EventCommands resource missing".into()))?;
    let global = world
        .get_resource::<GlobalState>()
        .cloned()
        .ok_or_else(|| EngineError::Worker("GlobalState resource missing".into()))?;
    world.insert_resource(EventDispatcher::spawn(commands, global)?);
    Ok(())
}

/// Dispose the dispatcher, join its thread within `timeout` and remove the
/// resource. Returns `false` if the thread had to be detached.
pub fn shutdown_event_dispatch(world: &mut World, timeout: Duration) -> bool {
    world
        .remove_resource::<EventDispatcher>()
        .is_none_or(|mut dispatcher| dispatcher.shutdown_timeout(timeout))
}
