//! Binary serialization engine for GX3D containers
//!
//! This crate turns registered scene entities into a GX3D container:
//!
//! - [`Registry`] - container-wide ids and the three aliasing policies
//! - [`OffsetTables`] - per-category tables written twice (reserve, then patch)
//! - [`ShaderVariant`] - mixed-radix encoding of material configurations
//! - [`BinaryWriter`] - little-endian primitive writer with a seekable cursor
//! - [`ExportContext`] - all state of one export run
//! - [`container`] - the container layout and the companion constant files
//!
//! Entities are discovered by a walker outside this crate, registered through
//! [`Registry::register`], and written in one go by
//! [`container::write_container`].

pub mod error;
pub mod writer;
pub mod reader;
pub mod category;
pub mod naming;
pub mod entity;
pub mod registry;
pub mod table;
pub mod shader;
pub mod material;
pub mod body;
pub mod constants;
pub mod scratch;
pub mod context;
pub mod container;

pub use error::{ExportError, Result};
pub use writer::BinaryWriter;
pub use category::{Category, CategoryTag, WidgetKind};
pub use entity::{AliasPolicy, Entity, EntityHandle, EntityId, EntityKey, Placement};
pub use registry::{Registration, Registry, DEFAULT_FIRST_ID};
pub use table::{OffsetTables, TableStage};
pub use shader::{ReservedVariant, ShaderVariant, VariantDescriptor, VariantTable, VertexAttributes};
pub use material::{Link, MaterialBody, PbrInputs, TextureRef};
pub use body::Body;
pub use constants::ConstantsLanguage;
pub use scratch::{BakeResolutions, IblBaker, ScratchFile};
pub use context::ExportContext;
pub use container::ExportSummary;

// Re-export math types used in bodies
pub use gx3d_math::{Aabb, Mat4, Vec3};
