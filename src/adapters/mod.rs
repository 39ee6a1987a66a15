//! Adapter implementations of the port traits.
//!
//! `live` talks to GitHub, `git` and the coding agent; `memory` keeps
//! everything in process for tests.

pub mod live;
pub mod memory;
