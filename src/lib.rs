//! carousel-ngin
//!
//! The core of an interactive spinning-wheel carousel: a ring that rotates
//! continuously, cabins attached to it that must stay upright, and a clickable
//! image panel on every cabin. The crate owns the parts with actual invariants
//! (orientation stabilization, pointer hit-testing and the lifetime of GPU
//! resources) and leaves drawing to the host renderer.
//!
//! High-level modules
//! - `camera`: camera, projection and pointer-ray construction
//! - `carousel`: the per-mount facade (load, frame, pointer, dispose)
//! - `config`: static deployment configuration (slot table, spin, camera)
//! - `data_structures`: transforms, meshes, textures and the scene graph
//! - `logging`: logger setup for native and WASM targets
//! - `pick`: panel hit-testing, hover/click state and navigation
//! - `resources`: asset sources, glTF parsing, the loader and texture cache
//! - `stage`: the render graph the host draws and the frame registrations
//!

pub mod camera;
pub mod carousel;
pub mod config;
pub mod data_structures;
pub mod logging;
pub mod pick;
pub mod resources;
pub mod stage;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::WindowEvent;
pub use winit::window::CursorIcon;
