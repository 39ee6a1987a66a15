//! Live adapters for real external interactions.

pub mod agent;
pub mod clock;
pub mod filesystem;
pub mod git;
pub mod github;
pub mod shell;
