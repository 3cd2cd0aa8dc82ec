//! RPG event engine core.
//!
//! Collision, blocking and interaction scheduling for the map events of a
//! 2D tile RPG, with scripted handlers dispatched on a dedicated thread.
//! The crate is laid out as an ECS world: components, resources, systems,
//! and the message types exchanged with the worker threads. Hosts usually
//! only need the [`game::EventTrigger`] facade.

pub mod components;
pub mod error;
pub mod events;
pub mod game;
pub mod resources;
pub mod snapshot;
pub mod systems;
