//! Immutable per-frame data handed to the dispatch thread.
//!
//! After the interaction scan commits all moves, the simulation builds a
//! [`FrameSnapshot`] of every active event and polygon in list order and
//! publishes it.
//! The dispatch thread only ever reads this snapshot, so it always observes
//! the complete post-commit state of one frame and never a frame that is
//! still being computed.

use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::Entity;
use rustc_hash::FxHashMap;

use crate::components::eventhandler::EventHandler;
use crate::components::eventobject::{EventId, EventKind, EventObject};
use crate::components::interaction::{EventList, Interaction, TouchLedger};
use crate::components::polygon::PolygonObject;
use crate::components::rect::Rect;

/// Read-only view of one event in a published frame.
#[derive(Clone)]
pub struct EventView {
    pub entity: Entity,
    pub id: EventId,
    pub name: Option<String>,
    pub kind: EventKind,
    pub touch_bound: Rect,
    pub draw_bound: Rect,
    pub pushable: bool,
    pub touchable: bool,
    pub consume_input: bool,
    pub collision: EventList,
    pub reachable: EventList,
    /// Shared with the simulation; the dispatcher records fired touches here.
    pub just_touching: TouchLedger,
    pub handler: Option<Arc<dyn EventHandler>>,
}

impl EventView {
    pub fn capture(
        entity: Entity,
        event: &EventObject,
        interaction: &Interaction,
        handler: Option<Arc<dyn EventHandler>>,
    ) -> Self {
        Self {
            entity,
            id: event.id,
            name: event.name.clone(),
            kind: event.kind,
            touch_bound: event.touch_bound(),
            draw_bound: event.draw_bound,
            pushable: event.pushable,
            touchable: event.touchable,
            consume_input: event.consume_input,
            collision: interaction.collision.clone(),
            reachable: interaction.reachable.clone(),
            just_touching: interaction.just_touching.clone(),
            handler,
        }
    }
}

impl EventView {
    /// View of a polygon. Its touch and draw bounds are the polygon's
    /// bounding box; polygons never consume input, push or get pushed.
    pub fn from_polygon(
        entity: Entity,
        polygon: &PolygonObject,
        handler: Option<Arc<dyn EventHandler>>,
    ) -> Self {
        Self {
            entity,
            id: polygon.id,
            name: polygon.name.clone(),
            kind: EventKind::Local,
            touch_bound: polygon.bounds(),
            draw_bound: polygon.bounds(),
            pushable: false,
            touchable: polygon.touchable,
            consume_input: false,
            collision: EventList::new(),
            reachable: EventList::new(),
            just_touching: TouchLedger::default(),
            handler,
        }
    }
}

impl fmt::Debug for EventView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventView")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("touch_bound", &self.touch_bound)
            .field("collision", &self.collision)
            .field("reachable", &self.reachable)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

/// All active events and polygons of one frame, in list order.
#[derive(Debug, Default)]
pub struct FrameSnapshot {
    pub frame: u64,
    /// Events first, then polygons.
    views: Vec<EventView>,
    event_count: usize,
    index: FxHashMap<EventId, usize>,
}

impl FrameSnapshot {
    pub fn new(frame: u64, events: Vec<EventView>) -> Self {
        Self::with_polygons(frame, events, Vec::new())
    }

    pub fn with_polygons(frame: u64, events: Vec<EventView>, polygons: Vec<EventView>) -> Self {
        let event_count = events.len();
        let mut views = events;
        views.extend(polygons);
        let index = views
            .iter()
            .enumerate()
            .map(|(i, view)| (view.id, i))
            .collect();
        Self {
            frame,
            views,
            event_count,
            index,
        }
    }

    /// Event or polygon with `id`.
    pub fn get(&self, id: EventId) -> Option<&EventView> {
        self.index.get(&id).and_then(|i| self.views.get(*i))
    }

    pub fn events(&self) -> &[EventView] {
        &self.views[..self.event_count]
    }

    pub fn polygons(&self) -> &[EventView] {
        &self.views[self.event_count..]
    }

    /// Number of events, polygons not included.
    pub fn len(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}
