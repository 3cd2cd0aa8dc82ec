//! Commands handlers queue for the simulation thread.
//!
//! Handlers run on the dispatch thread and must not touch the ECS world.
//! Instead they send [`EventCommand`]s through their
//! [`EventContext`](crate::components::eventhandler::EventContext); the
//! simulation drains the queue at the start of the next frame, so every
//! change takes effect on the next interaction scan.

use crate::components::blocking::BlockingBehavior;
use crate::components::eventobject::EventId;
use crate::components::speed::Speed;

#[derive(Debug, Clone, PartialEq)]
pub enum EventCommand {
    /// Offer a raw move; it goes through collision checks like any other.
    OfferMove { id: EventId, dx: f32, dy: f32 },
    /// Teleport the touch bound's corner, bypassing collision checks.
    MoveTo { id: EventId, x: f32, y: f32 },
    SetPushable { id: EventId, value: bool },
    SetTouchable { id: EventId, value: bool },
    SetConsumeInput { id: EventId, value: bool },
    SetBlocking { id: EventId, blocking: BlockingBehavior },
    SetSpeed { id: EventId, speed: Speed },
    /// Deliver `on_custom_trigger(trigger_id)` to the event's handler in the
    /// next dispatch batch.
    CustomTrigger { id: EventId, trigger_id: i32 },
}

impl EventCommand {
    /// The event this command applies to.
    pub fn target(&self) -> EventId {
        match self {
            EventCommand::OfferMove { id, .. }
            | EventCommand::MoveTo { id, .. }
            | EventCommand::SetPushable { id, .. }
            | EventCommand::SetTouchable { id, .. }
            | EventCommand::SetConsumeInput { id, .. }
            | EventCommand::SetBlocking { id, .. }
            | EventCommand::SetSpeed { id, .. }
            | EventCommand::CustomTrigger { id, .. } => *id,
        }
    }
}
