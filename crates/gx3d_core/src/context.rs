//! Export context
//!
//! All state of one export run lives here and is dropped when the run ends;
//! nothing is global.

use std::collections::HashMap;

use crate::body::BodyContext;
use crate::entity::EntityId;
use crate::registry::Registry;
use crate::shader::{ShaderVariant, VariantTable, VertexAttributes};

/// Registry, shader variants and mesh requirements of one export
#[derive(Default)]
pub struct ExportContext {
    pub registry: Registry,
    pub variants: VariantTable,
    mesh_attributes: HashMap<EntityId, VertexAttributes>,
}

impl ExportContext {
    /// Fresh context handing out ids from `first_id`
    pub fn new(first_id: EntityId) -> Self {
        Self {
            registry: Registry::new(first_id),
            variants: VariantTable::new(),
            mesh_attributes: HashMap::new(),
        }
    }

    /// Register `variant` for the mesh `mesh_id` and return its code
    ///
    /// The mesh stores the union of the attributes of every variant it is drawn
    /// with, across its origin and all of its copies.
    pub fn use_variant(&mut self, mesh_id: EntityId, variant: ShaderVariant) -> u64 {
        *self.mesh_attributes.entry(mesh_id).or_default() |= variant.needs();
        self.variants.register(variant)
    }

    /// Vertex attributes required so far for `mesh_id`
    pub fn mesh_attributes(&self, mesh_id: EntityId) -> VertexAttributes {
        self.mesh_attributes.get(&mesh_id).copied().unwrap_or_default()
    }

    /// Write-time data for the body pass
    pub fn body_context(&self) -> BodyContext {
        BodyContext {
            mesh_attributes: self.mesh_attributes.clone(),
        }
    }
}
