//! ECS components for map events.
//!
//! Submodules overview:
//! - [`blocking`] – ranked blocking classification and the rank-sum rule
//! - [`direction`] – eight compass directions with movement factors
//! - [`eventhandler`] – scripted handler trait and the context handlers use
//! - [`eventobject`] – the event itself: bounds, soft move and flags
//! - [`interaction`] – per-frame collision, touch and reach lists
//! - [`movehandler`] – movement policy trait and built-in policies
//! - [`polygon`] – line-segment map objects events collide with
//! - [`rect`] – axis-aligned rectangle used for touch and draw bounds
//! - [`speed`] – named speed table in pixels per second

pub mod blocking;
pub mod direction;
pub mod eventhandler;
pub mod eventobject;
pub mod interaction;
pub mod movehandler;
pub mod polygon;
pub mod rect;
pub mod speed;
