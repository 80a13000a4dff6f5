//! Engine data structures: transforms, meshes, textures and the scene graph.
//!
//! - `instance` holds local/world transformation data
//! - `model` contains meshes, their GPU buffers and materials
//! - `scene_graph` is the hierarchical node arena every carousel instance owns
//! - `texture` wraps GPU textures behind the `GpuTexture` seam

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
