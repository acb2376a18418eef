//! Kubernetes object model and quantity helpers.

pub mod quantity;
pub mod resources;

pub use resources::*;
