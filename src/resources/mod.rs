//! ECS resources made available to systems.
//!
//! Long-lived data of the event world and the bridges to its worker
//! threads. Each submodule documents the semantics and intended usage of
//! its resource(s).
//!
//! Overview
//! - `activeevents` – ordered registry of active events, spawn/despawn
//! - `blockingrules` – category pairs exempt from blocking
//! - `commandqueue` – channel of commands queued by handlers
//! - `dispatcher` – bridge and handoff slot for the dispatch thread
//! - `engineconfig` – settings loaded from an INI file
//! - `frameinput` – host input of the current frame, last published frame
//! - `globalstate` – versioned game state shared with handlers
//! - `jobqueue` – bridge for the background job thread
//! - `worker` – deadline joins for the worker threads
//! - `worldtime` – simulation time and delta
pub mod activeevents;
pub mod blockingrules;
pub mod commandqueue;
pub mod dispatcher;
pub mod engineconfig;
pub mod frameinput;
pub mod globalstate;
pub mod jobqueue;
pub mod worker;
pub mod worldtime;
