//! Polygon map objects.
//!
//! A [`PolygonObject`] is a chain of line segments placed on the map: a
//! fence, a river bank, a trigger line across a road. Events collide with
//! its edges only, never with the enclosed area. Polygons do not move by
//! themselves and take no part in the pair scan; every event is tested
//! against them once its own pairs are resolved.

use std::fmt;

use bevy_ecs::prelude::Component;
use glam::Vec2;

use crate::components::blocking::BlockingBehavior;
use crate::components::eventobject::EventId;
use crate::components::rect::Rect;
use crate::error::EngineError;

#[derive(Component, Debug, Clone)]
pub struct PolygonObject {
    /// Shares the id space of the events.
    pub id: EventId,
    pub name: Option<String>,
    pub blocking: BlockingBehavior,
    /// Events consuming input that cross an edge trigger the touch handler.
    pub touchable: bool,
    /// Connect the last vertex back to the first.
    pub closed: bool,
    vertices: Vec<Vec2>,
    bounds: Rect,
}

impl PolygonObject {
    pub fn new(id: EventId, vertices: Vec<Vec2>) -> Result<Self, EngineError> {
        if vertices.len() < 2 {
            return Err(EngineError::InvalidPolygon {
                id,
                vertices: vertices.len(),
            });
        }
        let bounds = bounds_of(&vertices);
        Ok(Self {
            id,
            name: None,
            blocking: BlockingBehavior::BuildingLow,
            touchable: false,
            closed: false,
            vertices,
            bounds,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_blocking(mut self, blocking: BlockingBehavior) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn touchable(mut self, touchable: bool) -> Self {
        self.touchable = touchable;
        self
    }

    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Smallest rectangle holding every vertex. May be zero-sized along one
    /// axis for a straight line.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Edges as `(start, end)` pairs, in vertex order.
    pub fn segments(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let closing = match (self.closed, self.vertices.first(), self.vertices.last()) {
            (true, Some(first), Some(last)) if self.vertices.len() > 2 => Some((*last, *first)),
            _ => None,
        };
        self.vertices
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing)
    }

    /// Whether any edge crosses or touches `rect`.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let b = self.bounds;
        let outside = rect.x > b.x + b.width
            || rect.x + rect.width < b.x
            || rect.y > b.y + b.height
            || rect.y + rect.height < b.y;
        if outside {
            return false;
        }
        self.segments()
            .any(|(start, end)| rect.intersects_segment(start, end))
    }

    pub fn translate(&mut self, delta: Vec2) {
        for vertex in &mut self.vertices {
            *vertex += delta;
        }
        self.bounds.translate(delta);
    }
}

fn bounds_of(vertices: &[Vec2]) -> Rect {
    let (min, max) = vertices.iter().fold(
        (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
        |(min, max), v| (min.min(*v), max.max(*v)),
    );
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

impl fmt::Display for PolygonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "polygon '{}' #nodes={}", name, self.vertices.len()),
            None => write!(f, "polygon 'id={}' #nodes={}", self.id, self.vertices.len()),
        }
    }
}
