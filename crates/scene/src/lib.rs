//! Transform hierarchy, cameras and scenes on top of `glscene-gl`.
//!
//! Nodes live in a [`SceneGraph`] arena and refer to each other by [`NodeId`].
//! A camera is a [`Transform`] carrying a [`Projection`].
//!
//! # Invariants
//! - After `update` returns, a node's world matrix matches its local TRS and
//!   its parent's world matrix as of that moment.
//! - Drawing happens in scene insertion order against a single camera.

mod error;
mod graph;
mod projection;
mod scene;
mod transform;

pub use error::SceneError;
pub use graph::SceneGraph;
pub use projection::{Projection, ProjectionParams};
pub use scene::Scene;
pub use transform::{DrawHook, MODEL_UNIFORM, NodeId, Transform, UpdateHook, VIEW_PROJECTION_UNIFORM};

pub fn crate_info() -> &'static str {
    "glscene-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert_eq!(crate_info(), "glscene-scene v0.1.0");
    }
}
