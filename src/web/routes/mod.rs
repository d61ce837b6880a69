//! Route handlers.

pub mod members;
pub mod projects;
pub mod tasks;
pub mod workspaces;
