//! Math helpers for the GX3D exporter
//!
//! ## Core Types
//!
//! - [`Vec3`] - 3D vector with x, y, z components
//! - [`Mat4`] - column-major 4x4 matrix and free functions in [`mat4`]
//! - [`Aabb`] - axis-aligned bounding box used for occlusion volumes

mod vec3;
pub mod mat4;
pub mod aabb;

pub use vec3::Vec3;
pub use mat4::Mat4;
pub use aabb::Aabb;
