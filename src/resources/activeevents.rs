//! Registry of the active events and polygons.
//!
//! [`ActiveEvents`] keeps the ordered list of event entities the scan and
//! the dispatcher iterate over, a second ordered list of polygon entities,
//! and one id index covering both. List order is the tie-break order of the
//! interaction scan, so it is insertion order and never re-sorted.
//!
//! Use [`spawn_event`], [`spawn_polygon`] and [`despawn_event`] rather than
//! spawning entities directly: they enforce unique ids, keep the other
//! events' interaction lists free of dangling ids, and run the handler
//! lifecycle.

use std::sync::Arc;

use bevy_ecs::prelude::*;
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::components::eventhandler::{EventHandler, EventHandlerRef};
use crate::components::eventobject::{EventId, EventObject};
use crate::components::interaction::Interaction;
use crate::components::movehandler::{MoveHandler, MovementHandler};
use crate::components::polygon::PolygonObject;
use crate::error::EngineError;

#[derive(Resource, Debug, Default)]
pub struct ActiveEvents {
    order: Vec<Entity>,
    polygons: Vec<Entity>,
    index: FxHashMap<EventId, Entity>,
}

impl ActiveEvents {
    /// Event entities in list order.
    pub fn entities(&self) -> &[Entity] {
        &self.order
    }

    /// Polygon entities in list order.
    pub fn polygons(&self) -> &[Entity] {
        &self.polygons
    }

    pub fn get(&self, id: EventId) -> Option<Entity> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Append `entity` at the end of the event list.
    pub fn insert(&mut self, id: EventId, entity: Entity) -> Result<(), EngineError> {
        if self.index.contains_key(&id) {
            return Err(EngineError::DuplicateId(id));
        }
        self.index.insert(id, entity);
        self.order.push(entity);
        Ok(())
    }

    /// Append `entity` at the end of the polygon list.
    pub fn insert_polygon(&mut self, id: EventId, entity: Entity) -> Result<(), EngineError> {
        if self.index.contains_key(&id) {
            return Err(EngineError::DuplicateId(id));
        }
        self.index.insert(id, entity);
        self.polygons.push(entity);
        Ok(())
    }

    /// Remove `id` (event or polygon), keeping the relative order of the
    /// others.
    pub fn remove(&mut self, id: EventId) -> Option<Entity> {
        let entity = self.index.remove(&id)?;
        self.order.retain(|e| *e != entity);
        self.polygons.retain(|e| *e != entity);
        Some(entity)
    }
}

/// Everything needed to register one event.
pub struct EventSpawn {
    pub event: EventObject,
    pub movement: MoveHandler,
    pub handler: Option<Arc<dyn EventHandler>>,
}

impl EventSpawn {
    pub fn new(event: EventObject) -> Self {
        Self {
            event,
            movement: MoveHandler::default(),
            handler: None,
        }
    }

    pub fn with_movement(mut self, movement: impl MovementHandler + 'static) -> Self {
        self.movement = MoveHandler::new(movement);
        self
    }

    pub fn with_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_shared_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl From<EventObject> for EventSpawn {
    fn from(event: EventObject) -> Self {
        Self::new(event)
    }
}

/// Everything needed to register one polygon.
pub struct PolygonSpawn {
    pub polygon: PolygonObject,
    pub handler: Option<Arc<dyn EventHandler>>,
}

impl PolygonSpawn {
    pub fn new(polygon: PolygonObject) -> Self {
        Self {
            polygon,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_shared_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

impl From<PolygonObject> for PolygonSpawn {
    fn from(polygon: PolygonObject) -> Self {
        Self::new(polygon)
    }
}

/// Register an event at the end of the active list.
///
/// Rejects ids already in use with [`EngineError::DuplicateId`]. On success
/// the handler (if any) gets `init()` followed by `on_load()`.
pub fn spawn_event(world: &mut World, spawn: EventSpawn) -> Result<Entity, EngineError> {
    let id = spawn.event.id;
    if world.resource::<ActiveEvents>().contains(id) {
        return Err(EngineError::DuplicateId(id));
    }
    let label = spawn.event.to_string();

    let mut entity = world.spawn((spawn.event, Interaction::default(), spawn.movement));
    if let Some(handler) = &spawn.handler {
        entity.insert(EventHandlerRef(Arc::clone(handler)));
    }
    let entity = entity.id();
    world.resource_mut::<ActiveEvents>().insert(id, entity)?;

    if let Some(handler) = spawn.handler {
        handler.init();
        handler.on_load();
    }
    info!("Registered {} as {:?}", label, entity);
    Ok(entity)
}

/// Register a polygon at the end of the polygon list. Ids are shared with
/// the events, so an id already used by either is rejected.
pub fn spawn_polygon(world: &mut World, spawn: PolygonSpawn) -> Result<Entity, EngineError> {
    let id = spawn.polygon.id;
    if world.resource::<ActiveEvents>().contains(id) {
        return Err(EngineError::DuplicateId(id));
    }
    let label = spawn.polygon.to_string();

    let mut entity = world.spawn(spawn.polygon);
    if let Some(handler) = &spawn.handler {
        entity.insert(EventHandlerRef(Arc::clone(handler)));
    }
    let entity = entity.id();
    world
        .resource_mut::<ActiveEvents>()
        .insert_polygon(id, entity)?;

    if let Some(handler) = spawn.handler {
        handler.init();
        handler.on_load();
    }
    info!("Registered {} as {:?}", label, entity);
    Ok(entity)
}

/// Remove an event or polygon from the active set and the world.
///
/// The id is purged from every remaining event's interaction lists and the
/// handler (if any) gets `dispose()`.
pub fn despawn_event(world: &mut World, id: EventId) -> Result<(), EngineError> {
    let entity = world
        .resource_mut::<ActiveEvents>()
        .remove(id)
        .ok_or(EngineError::UnknownEvent(id))?;

    let handler = world.get::<EventHandlerRef>(entity).map(|h| Arc::clone(&h.0));
    world.despawn(entity);

    let mut interactions = world.query::<&mut Interaction>();
    for mut interaction in interactions.iter_mut(world) {
        interaction.forget(id);
    }

    if let Some(handler) = handler {
        handler.dispose();
    }
    debug!("Removed event {} ({:?})", id, entity);
    Ok(())
}

/// Reset the collision, touch and reach lists of one event.
pub fn clear_collision(world: &mut World, id: EventId) -> Result<(), EngineError> {
    let entity = world
        .resource::<ActiveEvents>()
        .get(id)
        .ok_or(EngineError::UnknownEvent(id))?;
    let mut interaction = world
        .get_mut::<Interaction>(entity)
        .ok_or(EngineError::UnknownEvent(id))?;
    interaction.clear();
    Ok(())
}
