//! Application of handler commands.
//!
//! [`apply_event_commands`] runs first in the frame schedule and drains the
//! [`EventCommands`] channel, so everything a handler requested during the
//! previous dispatch batch is visible to this frame's interaction scan.
//!
//! # Functions
//!
//! - [`apply_event_commands`] – system draining the command channel
//! - [`process_event_command`] – apply one [`EventCommand`] to its event

use bevy_ecs::prelude::*;
use log::{debug, warn};

use crate::components::eventobject::{EventId, EventObject};
use crate::events::command::EventCommand;
use crate::resources::activeevents::ActiveEvents;
use crate::resources::commandqueue::EventCommands;
use crate::resources::frameinput::FrameInput;

/// Drain the command channel and apply every command in arrival order.
///
/// Commands for ids that are not in the active set are logged and dropped.
pub fn apply_event_commands(
    commands: Res<EventCommands>,
    active: Res<ActiveEvents>,
    mut input: ResMut<FrameInput>,
    mut query: Query<&mut EventObject>,
) {
    for cmd in commands.rx.try_iter() {
        let id = cmd.target();
        let Some(entity) = active.get(id) else {
            warn!("Dropping {:?}: no active event with id {}", cmd, id);
            continue;
        };
        let Ok(mut event) = query.get_mut(entity) else {
            warn!("Dropping {:?}: event {} has no entity data", cmd, id);
            continue;
        };
        if let Some(trigger) = process_event_command(&mut event, cmd) {
            input.custom_triggers.push(trigger);
        }
    }
}

/// Apply one command to `event`.
///
/// Custom triggers do not change the event; they are returned as
/// `(id, trigger_id)` for the next dispatch batch.
pub fn process_event_command(
    event: &mut EventObject,
    cmd: EventCommand,
) -> Option<(EventId, i32)> {
    debug!("Applying {:?} to {}", cmd, event);
    match cmd {
        EventCommand::OfferMove { dx, dy, .. } => event.offer_move(dx, dy),
        EventCommand::MoveTo { x, y, .. } => event.force_move_to(x, y),
        EventCommand::SetPushable { value, .. } => event.pushable = value,
        EventCommand::SetTouchable { value, .. } => event.touchable = value,
        EventCommand::SetConsumeInput { value, .. } => event.consume_input = value,
        EventCommand::SetBlocking { blocking, .. } => event.blocking = blocking,
        EventCommand::SetSpeed { speed, .. } => event.speed = speed,
        EventCommand::CustomTrigger { id, trigger_id } => return Some((id, trigger_id)),
    }
    None
}
