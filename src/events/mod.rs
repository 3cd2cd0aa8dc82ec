//! Message types exchanged between the simulation and its worker threads.
//!
//! Submodules:
//! - [`command`] – entity mutations queued by handlers for the next frame
//! - [`frame`] – immutable post-commit frame data read by the dispatch thread
//! - [`job`] – commands for the background job thread
pub mod command;
pub mod frame;
pub mod job;
