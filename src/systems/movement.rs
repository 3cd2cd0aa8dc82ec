//! Move proposal.
//!
//! First half of the per-frame event update: every active event, in list
//! order, forgets last frame's collisions and asks its movement policy for
//! a move. Nothing is committed here; see
//! [`interaction_scan`](crate::systems::collision::interaction_scan).

use bevy_ecs::prelude::*;

use crate::components::eventobject::EventObject;
use crate::components::interaction::Interaction;
use crate::components::movehandler::MoveHandler;
use crate::resources::activeevents::ActiveEvents;
use crate::resources::worldtime::WorldTime;

pub fn propose_moves(
    active: Res<ActiveEvents>,
    time: Res<WorldTime>,
    mut query: Query<(&mut EventObject, &mut Interaction, &mut MoveHandler)>,
) {
    for entity in active.entities() {
        let Ok((mut event, mut interaction, mut mover)) = query.get_mut(*entity) else {
            continue;
        };
        interaction.collision.clear();
        mover.try_move(&mut event, time.delta);
    }
}
