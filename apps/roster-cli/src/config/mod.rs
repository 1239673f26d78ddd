pub mod project;

pub use project::{resolve_access_level, resolve_group, resolve_project};
