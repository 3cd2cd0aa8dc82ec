//! Channel carrying [`EventCommand`]s from handlers back to the simulation.
//!
//! Handlers hold clones of the sender (inside their
//! [`EventContext`](crate::components::eventhandler::EventContext)); the
//! [`apply_event_commands`](crate::systems::commands::apply_event_commands)
//! system drains the receiver at the start of every frame.

use bevy_ecs::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::events::command::EventCommand;

#[derive(Resource, Debug, Clone)]
pub struct EventCommands {
    /// Sender for [`EventCommand`] messages (handlers/host -> simulation).
    pub tx: Sender<EventCommand>,
    /// Receiver drained by the simulation thread.
    pub rx: Receiver<EventCommand>,
}

impl Default for EventCommands {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl EventCommands {
    pub fn sender(&self) -> Sender<EventCommand> {
        self.tx.clone()
    }
}
