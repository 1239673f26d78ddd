//! Type definitions for the local membership cache.

mod groups;
mod ids;
mod members;

pub use groups::*;
pub use ids::*;
pub use members::*;
