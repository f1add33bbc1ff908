//! Data models for the lab portal.
//!
//! Field names serialize in camelCase to match the collections the web client already reads.

mod meta;
mod notification;
mod pending;
mod project;
mod user;

pub use meta::*;
pub use notification::*;
pub use pending::*;
pub use project::*;
pub use user::*;
