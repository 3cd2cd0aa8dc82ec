//! Engine systems.
//!
//! Per-frame logic of the event world and the worker thread loops.
//!
//! Submodules overview
//! - [`collision`] – pairwise interaction scan, move commit and rollback
//! - [`commands`] – apply commands queued by handlers
//! - [`dispatch`] – publish the committed frame, dispatch thread loop
//! - [`jobs`] – background job thread loop
//! - [`movement`] – ask movement policies for this frame's moves
//! - [`time`] – update simulation time and delta

pub mod collision;
pub mod commands;
pub mod dispatch;
pub mod jobs;
pub mod movement;
pub mod time;
