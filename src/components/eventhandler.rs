//! Scripted event handlers.
//!
//! An [`EventHandler`] is the behavior attached to an event: what happens
//! when something touches it, when the player pushes it with the action key,
//! on every timer tick, and when the global game state changes. Handlers run
//! on the dispatch thread and may block (e.g. waiting for a dialog answer),
//! so they only ever see immutable [`EventView`]s of the published frame and
//! talk back to the simulation through the [`EventContext`].
//!
//! The boolean returned by the trigger callbacks means "consumed": the
//! dispatcher stops processing the current batch as soon as one handler
//! consumes it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy_ecs::prelude::Component;
use crossbeam_channel::Sender;
use log::debug;

use crate::components::eventobject::EventId;
use crate::error::HandlerError;
use crate::events::command::EventCommand;
use crate::events::frame::EventView;
use crate::resources::globalstate::GlobalState;

/// `Ok(true)` when the handler consumed the trigger.
pub type HandlerResult = Result<bool, HandlerError>;

pub trait EventHandler: Send + Sync {
    /// Called once per dispatch batch with the accumulated delta time.
    fn on_timer(&self, _ctx: &EventContext, _this: &EventView, _delta_time: f32) -> HandlerResult {
        Ok(false)
    }

    /// `trigger` (an event consuming input) started touching `this`.
    fn on_touch(&self, _ctx: &EventContext, _this: &EventView, _trigger: &EventView) -> HandlerResult {
        Ok(false)
    }

    /// `trigger` pushed `this` with the action key.
    fn on_push(&self, _ctx: &EventContext, _this: &EventView, _trigger: &EventView) -> HandlerResult {
        Ok(false)
    }

    /// A custom trigger was posted for `this`.
    fn on_custom_trigger(
        &self,
        _ctx: &EventContext,
        _this: &EventView,
        _trigger_id: i32,
    ) -> HandlerResult {
        Ok(false)
    }

    /// The global state changed since the last dispatch batch.
    fn on_state_change(
        &self,
        _ctx: &EventContext,
        _this: &EventView,
        _state: &GlobalState,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// The event was registered and initialized.
    fn on_load(&self) {}

    fn init(&self) {}

    /// The event left the active set; release resources.
    fn dispose(&self) {}
}

/// Handler attached to an event.
#[derive(Component, Clone)]
pub struct EventHandlerRef(pub Arc<dyn EventHandler>);

impl EventHandlerRef {
    pub fn new(handler: impl EventHandler + 'static) -> Self {
        Self(Arc::new(handler))
    }
}

impl fmt::Debug for EventHandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandlerRef(..)")
    }
}

/// Everything a handler may use besides the frame data: a command queue
/// into the simulation, the global state and the dispatcher's disposed flag.
#[derive(Clone)]
pub struct EventContext {
    commands: Sender<EventCommand>,
    global: GlobalState,
    disposed: Arc<AtomicBool>,
}

impl EventContext {
    pub fn new(commands: Sender<EventCommand>, global: GlobalState, disposed: Arc<AtomicBool>) -> Self {
        Self {
            commands,
            global,
            disposed,
        }
    }

    /// Queue a command; it is applied at the start of the next frame.
    pub fn send(&self, command: EventCommand) {
        // Ignore send errors once the simulation is gone.
        if self.commands.send(command).is_err() {
            debug!("Event command dropped, simulation already shut down");
        }
    }

    pub fn offer_move(&self, id: EventId, dx: f32, dy: f32) {
        self.send(EventCommand::OfferMove { id, dx, dy });
    }

    pub fn move_to(&self, id: EventId, x: f32, y: f32) {
        self.send(EventCommand::MoveTo { id, x, y });
    }

    pub fn custom_trigger(&self, id: EventId, trigger_id: i32) {
        self.send(EventCommand::CustomTrigger { id, trigger_id });
    }

    pub fn global_state(&self) -> &GlobalState {
        &self.global
    }

    /// Long-running handlers should poll this and return early once set.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
