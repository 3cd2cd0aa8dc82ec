//! Movement policies.
//!
//! A [`MovementHandler`] decides, once per frame, which move an event offers.
//! It is wrapped in the [`MoveHandler`] component; the wrapper shields the
//! simulation from failing or panicking policies: a policy that fails is
//! treated as having proposed no move for that frame.
//!
//! Built-in policies:
//! - [`NullMovement`] – never moves (default)
//! - [`DirectionalMovement`] – walks in a fixed direction at the event's speed
//! - [`VectorMovement`] – offers a raw displacement every frame
//! - [`RandomMovement`] – random walk that turns when blocked

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use bevy_ecs::prelude::Component;
use glam::Vec2;
use log::warn;

use crate::components::direction::Direction;
use crate::components::eventobject::EventObject;
use crate::error::{MoveError, panic_message};

pub trait MovementHandler: Send + Sync {
    /// Offer this frame's move on `event` (see
    /// [`EventObject::propose_move`]). Must not commit it.
    fn try_move(&mut self, event: &mut EventObject, delta_time: f32) -> Result<(), MoveError>;

    /// The move offered this frame was rolled back.
    fn move_blocked(&mut self, _event: &EventObject) {}

    /// Forget any internal progress.
    fn reset(&mut self) {}
}

#[derive(Component)]
pub struct MoveHandler(Box<dyn MovementHandler>);

impl MoveHandler {
    pub fn new(handler: impl MovementHandler + 'static) -> Self {
        Self(Box::new(handler))
    }

    pub fn from_boxed(handler: Box<dyn MovementHandler>) -> Self {
        Self(handler)
    }

    /// Ask the policy for a move. Returns whether a move is pending
    /// afterwards. Errors and panics cancel the move.
    pub fn try_move(&mut self, event: &mut EventObject, delta_time: f32) -> bool {
        let handler = &mut self.0;
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.try_move(event, delta_time)));
        match result {
            Ok(Ok(())) => event.moves,
            Ok(Err(e)) => {
                warn!("Movement of {} failed, no move this frame: {}", event, e);
                event.moves = false;
                false
            }
            Err(payload) => {
                warn!(
                    "Movement of {} panicked, no move this frame: {}",
                    event,
                    panic_message(payload.as_ref())
                );
                event.moves = false;
                false
            }
        }
    }

    /// Tell the policy its move was rolled back.
    pub fn move_blocked(&mut self, event: &EventObject) {
        let handler = &mut self.0;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.move_blocked(event))) {
            warn!(
                "move_blocked of {} panicked: {}",
                event,
                panic_message(payload.as_ref())
            );
        }
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl Default for MoveHandler {
    fn default() -> Self {
        Self::new(NullMovement)
    }
}

impl fmt::Debug for MoveHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MoveHandler(..)")
    }
}

/// Policy that never proposes a move. Moves queued by handler commands
/// still go through.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMovement;

impl MovementHandler for NullMovement {
    fn try_move(&mut self, _event: &mut EventObject, _delta_time: f32) -> Result<(), MoveError> {
        Ok(())
    }
}

/// Walks in `direction` at the event's speed. `None` stands still.
#[derive(Debug, Clone, Default)]
pub struct DirectionalMovement {
    pub direction: Option<Direction>,
    /// Stop (clear `direction`) the first time the move is blocked.
    pub stop_when_blocked: bool,
    /// Number of rollbacks seen so far.
    pub blocked: u32,
}

impl DirectionalMovement {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            ..Self::default()
        }
    }

    pub fn stopping_when_blocked(mut self) -> Self {
        self.stop_when_blocked = true;
        self
    }
}

impl MovementHandler for DirectionalMovement {
    fn try_move(&mut self, event: &mut EventObject, delta_time: f32) -> Result<(), MoveError> {
        if let Some(direction) = self.direction {
            event.propose_move(direction, delta_time);
        }
        Ok(())
    }

    fn move_blocked(&mut self, _event: &EventObject) {
        self.blocked += 1;
        if self.stop_when_blocked {
            self.direction = None;
        }
    }

    fn reset(&mut self) {
        self.blocked = 0;
    }
}

/// Offers the same raw displacement every frame, optionally only for a
/// limited number of frames.
#[derive(Debug, Clone)]
pub struct VectorMovement {
    pub delta: Vec2,
    pub frames_left: Option<u32>,
}

impl VectorMovement {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self {
            delta: Vec2::new(dx, dy),
            frames_left: None,
        }
    }

    pub fn for_frames(mut self, frames: u32) -> Self {
        self.frames_left = Some(frames);
        self
    }
}

impl MovementHandler for VectorMovement {
    fn try_move(&mut self, event: &mut EventObject, _delta_time: f32) -> Result<(), MoveError> {
        match self.frames_left {
            Some(0) => return Ok(()),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        event.offer_move_vec(self.delta);
        Ok(())
    }
}

/// Random walk over `allowed` directions.
///
/// After walking `slackness / 2` pixels the policy may pick a new direction;
/// a blocked move always forces a new pick on the next frame.
#[derive(Debug, Clone)]
pub struct RandomMovement {
    pub allowed: Vec<Direction>,
    pub slackness: u32,
    last_dir: Option<Direction>,
    budget: f32,
    rng: fastrand::Rng,
}

impl RandomMovement {
    pub fn new(slackness: u32) -> Self {
        Self::with_directions(Direction::CARDINAL.to_vec(), slackness)
    }

    pub fn with_directions(allowed: Vec<Direction>, slackness: u32) -> Self {
        let slackness = slackness.max(allowed.len() as u32).max(1);
        Self {
            allowed,
            slackness,
            last_dir: None,
            budget: 0.0,
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic variant for replays and tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn current_direction(&self) -> Option<Direction> {
        self.last_dir
    }
}

impl Default for RandomMovement {
    fn default() -> Self {
        Self::new(128)
    }
}

impl MovementHandler for RandomMovement {
    fn try_move(&mut self, event: &mut EventObject, delta_time: f32) -> Result<(), MoveError> {
        if self.allowed.is_empty() {
            return Err(MoveError::new("random movement without allowed directions"));
        }
        if self.last_dir.is_none() || self.budget < 0.0 {
            let mut pick = self.rng.u32(0..self.slackness) as usize;
            if self.last_dir.is_none() {
                pick %= self.allowed.len();
            }
            if let Some(dir) = self.allowed.get(pick) {
                self.last_dir = Some(*dir);
                self.budget = (self.slackness / 2) as f32;
            } else {
                self.budget = (self.slackness / 3) as f32;
            }
        }
        if let Some(dir) = self.last_dir {
            self.budget -= event.propose_move(dir, delta_time);
        }
        Ok(())
    }

    fn move_blocked(&mut self, _event: &EventObject) {
        self.last_dir = None;
    }

    fn reset(&mut self) {
        self.last_dir = None;
        self.budget = 0.0;
    }
}
