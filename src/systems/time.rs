//! Time update system.
//!
//! Updates the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per frame, clamping the raw delta to the configured maximum
//! and applying `time_scale`.
use bevy_ecs::prelude::*;

use crate::resources::engineconfig::EngineConfig;
use crate::resources::worldtime::WorldTime;

/// Update elapsed and delta seconds on the `WorldTime` resource.
///
/// `dt` is expected to be the unscaled frame delta in seconds. It is clamped
/// to [`EngineConfig::max_delta`] when a config resource exists. Returns the
/// scaled delta that systems will see this frame.
pub fn update_world_time(world: &mut World, dt: f32) -> f32 {
    let dt = match world.get_resource::<EngineConfig>() {
        Some(config) => config.clamp_delta(dt),
        None => dt.max(0.0),
    };
    let mut wt = world.resource_mut::<WorldTime>();
    let scaled_dt = dt * wt.time_scale;
    wt.elapsed += scaled_dt;
    wt.delta = scaled_dt;
    wt.frame_count += 1;
    scaled_dt
}
