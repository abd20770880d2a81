//! Host scenes for the GX3D exporter
//!
//! - [`SceneDocument`] - RON description of scenes, objects, images, fonts and materials
//! - [`SceneWalker`] - validates a document and registers its entities bottom-up

pub mod document;
pub mod walker;

pub use document::{DocumentError, SceneDocument};
pub use walker::SceneWalker;
