//! Save and restore of event state.
//!
//! Only the persistent fields of an [`EventObject`] are captured. Transient
//! per-frame state (soft move, collision, touch and reach lists) is never
//! written; it is rebuilt by the next interaction scan.
//!
//! The format is a JSON array of [`EventSnapshot`]s in active list order.

use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::components::blocking::BlockingBehavior;
use crate::components::eventobject::{EventId, EventKind, EventObject};
use crate::components::interaction::Interaction;
use crate::components::rect::Rect;
use crate::components::speed::Speed;
use crate::error::EngineError;
use crate::resources::activeevents::ActiveEvents;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: EventKind,
    pub touch_bound: Rect,
    pub draw_bound: Rect,
    #[serde(default)]
    pub speed: Speed,
    #[serde(default)]
    pub blocking: BlockingBehavior,
    #[serde(default)]
    pub pushable: bool,
    #[serde(default)]
    pub touchable: bool,
    #[serde(default)]
    pub consume_input: bool,
    pub outreach: i32,
    #[serde(default)]
    pub z: f32,
}

impl EventSnapshot {
    pub fn capture(event: &EventObject) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            kind: event.kind,
            touch_bound: event.touch_bound(),
            draw_bound: event.draw_bound,
            speed: event.speed,
            blocking: event.blocking,
            pushable: event.pushable,
            touchable: event.touchable,
            consume_input: event.consume_input,
            outreach: event.outreach,
            z: event.z,
        }
    }

    /// Overwrite the persistent fields of `event`. A pending move is dropped.
    pub fn apply_to(&self, event: &mut EventObject) {
        event.name = self.name.clone();
        event.kind = self.kind;
        event.set_touch_bound(self.touch_bound);
        event.draw_bound = self.draw_bound;
        event.speed = self.speed;
        event.blocking = self.blocking;
        event.pushable = self.pushable;
        event.touchable = self.touchable;
        event.consume_input = self.consume_input;
        event.outreach = self.outreach;
        event.z = self.z;
        event.moves = false;
    }

    /// A fresh event built from this snapshot.
    pub fn to_event(&self) -> EventObject {
        let mut event = EventObject::new(self.id, self.touch_bound);
        self.apply_to(&mut event);
        event
    }
}

/// Capture every active event in list order.
pub fn snapshot_events(world: &World) -> Vec<EventSnapshot> {
    let Some(active) = world.get_resource::<ActiveEvents>() else {
        return Vec::new();
    };
    active
        .entities()
        .iter()
        .filter_map(|entity| world.get::<EventObject>(*entity))
        .map(EventSnapshot::capture)
        .collect()
}

/// Apply snapshots to the active events with matching ids.
///
/// Returns the ids that have no active event; those snapshots are skipped.
/// Restored events start with empty interaction lists.
pub fn restore_events(world: &mut World, snapshots: &[EventSnapshot]) -> Vec<EventId> {
    let mut missing = Vec::new();
    for snapshot in snapshots {
        let Some(entity) = world.resource::<ActiveEvents>().get(snapshot.id) else {
            warn!("No active event {} to restore", snapshot.id);
            missing.push(snapshot.id);
            continue;
        };
        if let Some(mut event) = world.get_mut::<EventObject>(entity) {
            snapshot.apply_to(&mut event);
        }
        if let Some(mut interaction) = world.get_mut::<Interaction>(entity) {
            interaction.clear();
        }
    }
    info!(
        "Restored {} event(s), {} missing",
        snapshots.len() - missing.len(),
        missing.len()
    );
    missing
}

pub fn to_json(snapshots: &[EventSnapshot]) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(snapshots)?)
}

pub fn from_json(json: &str) -> Result<Vec<EventSnapshot>, EngineError> {
    Ok(serde_json::from_str(json)?)
}

pub fn save_to_path(path: impl AsRef<Path>, snapshots: &[EventSnapshot]) -> Result<(), EngineError> {
    fs::write(path.as_ref(), to_json(snapshots)?)?;
    info!("Saved {} event(s) to {:?}", snapshots.len(), path.as_ref());
    Ok(())
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<EventSnapshot>, EngineError> {
    let json = fs::read_to_string(path.as_ref())?;
    from_json(&json)
}
