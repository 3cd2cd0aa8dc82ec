//! The map event: geometry, soft move and interaction flags.
//!
//! An [`EventObject`] is every mobile or static thing on a map that takes
//! part in collisions: the player, NPCs, chests, signs, doors, barriers.
//!
//! Moves are two-phase. Movement policies *offer* a move, which is stored as
//! a soft move and flagged with [`EventObject::moves`]. Collision checks run
//! against the proposed position; the interaction scan then either rolls the
//! move back (`moves = false`) or commits it with
//! [`EventObject::commit_move`]. The touch bound size never includes the soft
//! move, the offset is only applied while querying.

use std::fmt;

use bevy_ecs::prelude::Component;
use glam::Vec2;
use log::info;
use serde::{Deserialize, Serialize};

use crate::components::blocking::BlockingBehavior;
use crate::components::direction::Direction;
use crate::components::polygon::PolygonObject;
use crate::components::rect::Rect;
use crate::components::speed::Speed;

/// Default push outreach in pixels.
pub const DEFAULT_OUTREACH: i32 = 10;

/// Identifier of an event, unique within the active set it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scope/category of an event.
///
/// `Player` and `Global` events with a name survive map changes; the
/// category is also what [`BlockingRules`](crate::resources::blockingrules::BlockingRules)
/// exemptions are keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventKind {
    #[default]
    Local,
    Global,
    Player,
}

impl EventKind {
    /// Parses a map property. Unknown or empty values fall back to `Local`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "" | "LOCAL" => EventKind::Local,
            "GLOBAL" => EventKind::Global,
            "PLAYER" => EventKind::Player,
            other => {
                info!("Unknown event type '{}' - fallback to LOCAL", other);
                EventKind::Local
            }
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct EventObject {
    pub id: EventId,
    pub name: Option<String>,
    pub kind: EventKind,
    /// Rendering placement; follows the touch bound when a move commits.
    pub draw_bound: Rect,
    /// Set by every offer, cleared by a commit or a rollback.
    pub moves: bool,
    pub speed: Speed,
    pub blocking: BlockingBehavior,
    pub pushable: bool,
    pub touchable: bool,
    /// An event consuming input triggers touch and push handlers of the
    /// events it collides with or reaches.
    pub consume_input: bool,
    /// Extra reach in pixels for pushing other events.
    pub outreach: i32,
    /// Render z-order.
    pub z: f32,
    touch_bound: Rect,
    soft_move: Vec2,
}

impl EventObject {
    /// Create an event whose draw bound equals its touch bound.
    pub fn new(id: EventId, touch_bound: Rect) -> Self {
        Self {
            id,
            name: None,
            kind: EventKind::Local,
            draw_bound: touch_bound,
            moves: false,
            speed: Speed::Zero,
            blocking: BlockingBehavior::default(),
            pushable: false,
            touchable: false,
            consume_input: false,
            outreach: DEFAULT_OUTREACH,
            z: 0.0,
            touch_bound,
            soft_move: Vec2::ZERO,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_draw_bound(mut self, draw_bound: Rect) -> Self {
        self.draw_bound = draw_bound;
        self
    }

    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_blocking(mut self, blocking: BlockingBehavior) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_outreach(mut self, outreach: i32) -> Self {
        self.outreach = outreach;
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    pub fn pushable(mut self, pushable: bool) -> Self {
        self.pushable = pushable;
        self
    }

    pub fn touchable(mut self, touchable: bool) -> Self {
        self.touchable = touchable;
        self
    }

    pub fn consuming_input(mut self, consume_input: bool) -> Self {
        self.consume_input = consume_input;
        self
    }

    /// Committed collision rectangle.
    pub fn touch_bound(&self) -> Rect {
        self.touch_bound
    }

    /// Replace the committed collision rectangle. The draw bound is not
    /// adjusted, use [`EventObject::center_draw_bound`] if needed.
    pub fn set_touch_bound(&mut self, touch_bound: Rect) {
        self.touch_bound = touch_bound;
    }

    /// Bottom-left corner of the committed touch bound.
    pub fn position(&self) -> Vec2 {
        self.touch_bound.origin()
    }

    pub fn center(&self) -> Vec2 {
        self.touch_bound.center()
    }

    /// Pending displacement of the last offer (meaningful while `moves`).
    pub fn soft_move(&self) -> Vec2 {
        self.soft_move
    }

    /// Touch bound at the position this event would have after a commit.
    pub fn proposed_bound(&self) -> Rect {
        if self.moves {
            self.touch_bound.translated(self.soft_move)
        } else {
            self.touch_bound
        }
    }

    /// Offer a move of `speed × delta_time` pixels in `direction`.
    /// Returns the travelled distance; the committed position is untouched.
    pub fn propose_move(&mut self, direction: Direction, delta_time: f32) -> f32 {
        let distance = self.speed.stretch(delta_time);
        self.offer_move_vec(direction.scaled(distance));
        distance
    }

    /// Offer a raw displacement.
    pub fn offer_move(&mut self, dx: f32, dy: f32) {
        self.offer_move_vec(Vec2::new(dx, dy));
    }

    pub fn offer_move_vec(&mut self, delta: Vec2) {
        self.soft_move = delta;
        self.moves = true;
    }

    /// Offer a move placing the touch bound's corner at `(x, y)`.
    pub fn offer_move_to(&mut self, x: f32, y: f32) {
        let origin = self.touch_bound.origin();
        self.offer_move(x - origin.x, y - origin.y);
    }

    /// Place the touch bound's corner at `(x, y)` immediately, bypassing
    /// collision checks.
    pub fn force_move_to(&mut self, x: f32, y: f32) {
        self.offer_move_to(x, y);
        self.commit_move();
    }

    /// Apply the pending soft move to the touch and draw bounds.
    /// Returns `false` (and does nothing) if no move is pending.
    pub fn commit_move(&mut self) -> bool {
        if !self.moves {
            return false;
        }
        self.translate(self.soft_move);
        self.moves = false;
        true
    }

    /// Shift both bounds by `delta` without going through the soft move.
    pub fn translate(&mut self, delta: Vec2) {
        self.touch_bound.translate(delta);
        self.draw_bound.translate(delta);
    }

    /// Whether the proposed touch bounds of both events overlap.
    pub fn overlaps(&self, other: &EventObject) -> bool {
        self.proposed_bound().overlaps(&other.proposed_bound())
    }

    /// Whether the proposed touch bound crosses an edge of `polygon`.
    pub fn intersects_polygon(&self, polygon: &PolygonObject) -> bool {
        polygon.intersects_rect(&self.proposed_bound())
    }

    /// Whether `other` lies within this event's outreach, using the proposed
    /// positions of both events.
    pub fn reaches(&self, other: &EventObject) -> bool {
        self.proposed_bound()
            .overlaps_with_margin(&other.proposed_bound(), self.outreach as f32)
    }

    /// Center the touch bound inside the draw bound.
    pub fn center_touch_bound(&mut self) {
        self.touch_bound.x = self.draw_bound.x + (self.draw_bound.width - self.touch_bound.width) * 0.5;
        self.touch_bound.y =
            self.draw_bound.y + (self.draw_bound.height - self.touch_bound.height) * 0.5;
    }

    /// Center the draw bound around the touch bound.
    pub fn center_draw_bound(&mut self) {
        self.draw_bound.x = self.touch_bound.x + (self.touch_bound.width - self.draw_bound.width) * 0.5;
        self.draw_bound.y =
            self.touch_bound.y + (self.touch_bound.height - self.draw_bound.height) * 0.5;
    }

    /// Derive a touch bound from the draw bound: the feet of a character
    /// sprite (middle two thirds of the width, lower half of the smaller
    /// side).
    pub fn estimate_touch_bound(&mut self) {
        let draw = self.draw_bound;
        self.touch_bound = Rect::new(
            draw.x + draw.width * 0.167,
            draw.y,
            draw.width * 0.67,
            draw.width.min(draw.height) * 0.5,
        );
    }

    pub fn is_player(&self) -> bool {
        self.kind == EventKind::Player
    }

    /// Named player or global events are kept across map changes.
    pub fn is_global(&self) -> bool {
        self.name.is_some() && matches!(self.kind, EventKind::Player | EventKind::Global)
    }
}

impl fmt::Display for EventObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "event '{}' ({:?})", name, self.kind),
            None => write!(f, "event 'id={}' ({:?})", self.id, self.kind),
        }
    }
}
