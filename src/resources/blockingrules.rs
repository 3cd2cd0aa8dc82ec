//! Category exemptions on top of the rank-based blocking rule.
//!
//! The rank rule of [`BlockingBehavior`](crate::components::blocking::BlockingBehavior)
//! cannot express "two players never block each other". [`BlockingRules`]
//! adds unordered pairs of [`EventKind`]s that are allowed to overlap freely
//! whatever their ranks say. Exempt pairs still collide (touch handlers fire)
//! but no move is rolled back.

use bevy_ecs::prelude::Resource;

use crate::components::eventobject::{EventKind, EventObject};

#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct BlockingRules {
    exemptions: Vec<(EventKind, EventKind)>,
}

impl Default for BlockingRules {
    /// Player events never block each other.
    fn default() -> Self {
        Self {
            exemptions: vec![(EventKind::Player, EventKind::Player)],
        }
    }
}

impl BlockingRules {
    /// Pure rank rule, no exemptions.
    pub fn none() -> Self {
        Self {
            exemptions: Vec::new(),
        }
    }

    pub fn with_exemption(mut self, a: EventKind, b: EventKind) -> Self {
        self.add_exemption(a, b);
        self
    }

    pub fn add_exemption(&mut self, a: EventKind, b: EventKind) {
        if !self.is_exempt(a, b) {
            self.exemptions.push((a, b));
        }
    }

    /// Order of `a` and `b` does not matter.
    pub fn is_exempt(&self, a: EventKind, b: EventKind) -> bool {
        self.exemptions
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Whether a move of one of the two events must be rolled back when they
    /// overlap.
    pub fn blocks(&self, a: &EventObject, b: &EventObject) -> bool {
        a.blocking.blocks(b.blocking) && !self.is_exempt(a.kind, b.kind)
    }
}
