//! Per-frame input of the simulation and the last published frame.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;

use crate::components::eventobject::EventId;
use crate::events::frame::FrameSnapshot;

/// Host input for the frame being computed.
#[derive(Resource, Debug, Default, Clone)]
pub struct FrameInput {
    pub action_key_down: bool,
    /// Custom triggers collected from commands, handed to the dispatcher
    /// together with this frame.
    pub custom_triggers: Vec<(EventId, i32)>,
}

/// Most recent post-commit frame, kept for the host.
#[derive(Resource, Debug, Default, Clone)]
pub struct LastFrame(pub Option<Arc<FrameSnapshot>>);
