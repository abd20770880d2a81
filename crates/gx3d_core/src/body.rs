//! Category bodies
//!
//! Every body starts with the subtype byte of its [`CategoryTag`] followed by a
//! category specific payload. Bodies are fully resolved at registration time;
//! writing them has no side effects beyond the output stream.

use std::collections::HashMap;
use std::io::{Seek, Write};

use bytemuck::{Pod, Zeroable};
use gx3d_math::{Aabb, Mat4, Vec3};

use crate::category::{Category, CategoryTag, WidgetKind};
use crate::entity::{Entity, EntityId};
use crate::error::{ExportError, Result};
use crate::material::MaterialBody;
use crate::shader::VertexAttributes;
use crate::writer::BinaryWriter;

/// RGBA, 8 bits per channel
pub const TEXTURE_FORMAT_RGBA_U8: u8 = 13;
pub const FILTER_LINEAR_MIPMAP_LINEAR: u8 = 7;
pub const FILTER_LINEAR: u8 = 5;
pub const WRAP_REPEAT: u8 = 3;

/// Data resolved after registration that some bodies need while writing
#[derive(Clone, Debug, Default)]
pub struct BodyContext {
    /// Vertex attributes each mesh must store, keyed by mesh id
    pub mesh_attributes: HashMap<EntityId, VertexAttributes>,
}

impl BodyContext {
    pub fn attributes(&self, mesh: EntityId) -> VertexAttributes {
        self.mesh_attributes.get(&mesh).copied().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraBody {
    pub location: Vec3,
    /// Quaternion `[x, y, z, w]`
    pub rotation: [f32; 4],
    pub clip_start: f32,
    pub clip_end: f32,
    /// Horizontal field of view (perspective) or orthographic scale
    pub projection: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBody {
    /// Ogg file content
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightBody {
    /// Colour multiplied by energy
    pub color: Vec3,
    pub shadow: bool,
    pub location: Vec3,
    /// World direction of the light's -Z axis
    pub direction: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TextureData {
    Image { width: u16, height: u16, data: Vec<u8> },
    /// Faces in order up, down, left, right, front, back
    Cube { faces: Box<[Vec<u8>; 6]> },
}

impl Default for TextureData {
    fn default() -> Self {
        TextureData::Image { width: 0, height: 0, data: Vec::new() }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureBody {
    pub data: TextureData,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FontBody {
    /// TrueType file content
    pub data: Vec<u8>,
}

/// Welded mesh vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// Tangent xyz and bitangent sign
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Bit pattern used to weld identical corners
    fn weld_key(&self) -> [u32; 12] {
        bytemuck::cast(*self)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBody {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Local space bounds
    pub aabb: Aabb,
}

impl MeshBody {
    /// Weld triangle corners of the object `name` into an indexed mesh
    ///
    /// Corners with bit-identical attributes share one vertex; vertices keep
    /// the order of their first appearance.
    pub fn from_corners(name: &str, corners: impl IntoIterator<Item = Vertex>) -> Result<Self> {
        let mut mesh = MeshBody::default();
        let mut welded: HashMap<[u32; 12], u32> = HashMap::new();
        for corner in corners {
            mesh.aabb.put(Vec3::from_array(corner.position));
            let index = match welded.get(&corner.weld_key()) {
                Some(&index) => index,
                None => {
                    let index = vertex_index(name, mesh.vertices.len())?;
                    welded.insert(corner.weld_key(), index);
                    mesh.vertices.push(corner);
                    index
                }
            };
            mesh.indices.push(index);
        }
        Ok(mesh)
    }

    fn write<W: Write + Seek>(&self, w: &mut BinaryWriter<W>, attributes: VertexAttributes) -> Result<()> {
        w.write_u8(attributes.bits())?;
        w.write_u64(self.vertices.len() as u64)?;
        for v in &self.vertices {
            for c in v.position {
                w.write_f32(c)?;
            }
            if attributes.contains(VertexAttributes::NORMAL) {
                for c in v.normal {
                    w.write_f32(c)?;
                }
            }
            if attributes.contains(VertexAttributes::TANGENT) {
                w.write_vec4(v.tangent)?;
            }
            if attributes.contains(VertexAttributes::UV) {
                for c in v.uv {
                    w.write_f32(c)?;
                }
            }
        }
        w.write_u32_array(&self.indices)?;
        w.write_vec3(self.aabb.upper)?;
        w.write_vec3(self.aabb.lower)?;
        w.write_f32(self.aabb.occlusion_radius())
    }
}

/// Index of the next vertex; indices are written as `u32`
fn vertex_index(name: &str, count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| {
        ExportError::malformed(name, format!("more than {} vertices", u32::MAX))
    })
}

/// A mesh placed inside a model
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMesh {
    pub mesh_id: EntityId,
    /// Encoded shader variant
    pub variant: u64,
    pub material: MaterialBody,
}

impl ModelMesh {
    /// Draw `entity` with the material of its own placement
    ///
    /// Copies share the origin's id but keep their own material.
    pub fn placed(entity: &Entity, variant: u64) -> Result<Self> {
        let material = entity.placement.material.clone().ok_or_else(|| {
            ExportError::malformed(&entity.name, "mesh has no material placement")
        })?;
        Ok(Self {
            mesh_id: entity.id,
            variant,
            material,
        })
    }
}

/// Text carried by edit and text widgets
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetText {
    pub text: String,
    /// Horizontal (0 center, 3 left, 6 right) plus vertical (1 bottom, 2 center, 3 top)
    pub alignment: u8,
    pub font_id: EntityId,
    pub material: MaterialBody,
    pub character_spacing: f32,
    pub word_spacing: f32,
    pub line_spacing: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Widget {
    pub kind: WidgetKind,
    pub text: Option<WidgetText>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelBody {
    pub widget: Option<Widget>,
    pub transform: Mat4,
    pub occlusion_center: Vec3,
    pub occlusion_radius: f32,
    pub meshes: Vec<ModelMesh>,
    pub children: Vec<EntityId>,
}

impl Default for ModelBody {
    fn default() -> Self {
        Self {
            widget: None,
            transform: gx3d_math::mat4::IDENTITY,
            occlusion_center: Vec3::ZERO,
            occlusion_radius: 0.0,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl ModelBody {
    fn write<W: Write + Seek>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        if let Some(widget) = &self.widget {
            w.write_u64(widget.kind as u64)?;
        }
        w.write_mat4(&self.transform)?;
        w.write_vec3(self.occlusion_center)?;
        w.write_f32(self.occlusion_radius)?;
        w.write_u64(self.meshes.len() as u64)?;
        for m in &self.meshes {
            w.write_u64(m.mesh_id)?;
            w.write_u64(m.variant)?;
            m.material.write(w)?;
        }
        if let Some(text) = self.widget.as_ref().and_then(|wd| wd.text.as_ref()) {
            w.write_string(&text.text)?;
            w.write_u8(text.alignment)?;
            w.write_u64(text.font_id)?;
            text.material.write(w)?;
            w.write_f32(text.character_spacing)?;
            w.write_f32(text.word_spacing)?;
            w.write_f32(text.line_spacing)?;
        }
        w.write_u64_array(&self.children)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReflectionBody {
    pub location: Vec3,
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SkyboxSource {
    Cube { texture_id: EntityId },
    Equirectangular { cube: Vec<u8>, irradiance: Vec<u8>, radiance: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkyboxBody {
    /// Reserved shader variant code
    pub variant: u64,
    pub source: SkyboxSource,
}

/// Placer constraint: keeps its child models at a screen-relative position
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacerBody {
    /// Attribute mask: 4 (x-left), 8 (x-right) or 33 (x-middle, y-down)
    pub mask: u64,
    pub ratio: Option<f32>,
    /// Attribute values in mask order
    pub values: Vec<f32>,
    /// Child model ids
    pub children: Vec<EntityId>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneBody {
    pub cameras: Vec<EntityId>,
    pub audios: Vec<EntityId>,
    pub lights: Vec<EntityId>,
    pub models: Vec<EntityId>,
    pub skyboxes: Vec<EntityId>,
    pub reflections: Vec<EntityId>,
    pub constraints: Vec<EntityId>,
}

/// Payload of an owning entity
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Camera(CameraBody),
    Audio(AudioBody),
    Light(LightBody),
    Texture(TextureBody),
    Font(FontBody),
    Mesh(MeshBody),
    Model(ModelBody),
    Reflection(ReflectionBody),
    Skybox(SkyboxBody),
    Constraint(PlacerBody),
    Scene(SceneBody),
}

impl Body {
    pub fn category(&self) -> Category {
        match self {
            Body::Camera(_) => Category::Camera,
            Body::Audio(_) => Category::Audio,
            Body::Light(_) => Category::Light,
            Body::Texture(_) => Category::Texture,
            Body::Font(_) => Category::Font,
            Body::Mesh(_) => Category::Mesh,
            Body::Model(_) => Category::Model,
            Body::Reflection(_) => Category::Reflection,
            Body::Skybox(_) => Category::Skybox,
            Body::Constraint(_) => Category::Constraint,
            Body::Scene(_) => Category::Scene,
        }
    }

    /// Payload without the subtype byte
    pub fn write<W: Write + Seek>(
        &self,
        tag: CategoryTag,
        id: EntityId,
        w: &mut BinaryWriter<W>,
        ctx: &BodyContext,
    ) -> Result<()> {
        match self {
            Body::Camera(c) => {
                w.write_vec3(c.location)?;
                w.write_vec4(c.rotation)?;
                w.write_f32(c.clip_start)?;
                w.write_f32(c.clip_end)?;
                w.write_f32(c.projection)
            }
            Body::Audio(a) => w.write_blob(&a.data),
            Body::Light(l) => {
                w.write_vec3(l.color)?;
                w.write_bool(l.shadow)?;
                if tag == CategoryTag::LIGHT_POINT || tag == CategoryTag::LIGHT_CONE {
                    w.write_vec3(l.location)?;
                }
                if tag == CategoryTag::LIGHT_DIRECTIONAL || tag == CategoryTag::LIGHT_CONE {
                    w.write_vec3(l.direction)?;
                }
                Ok(())
            }
            Body::Texture(t) => {
                w.write_u8(TEXTURE_FORMAT_RGBA_U8)?;
                w.write_u8(FILTER_LINEAR_MIPMAP_LINEAR)?;
                w.write_u8(FILTER_LINEAR)?;
                w.write_u8(WRAP_REPEAT)?;
                w.write_u8(WRAP_REPEAT)?;
                w.write_u8(WRAP_REPEAT)?;
                match &t.data {
                    TextureData::Image { width, height, data } => {
                        w.write_u16(*width)?;
                        w.write_u16(*height)?;
                        w.write_blob(data)
                    }
                    TextureData::Cube { faces } => {
                        for face in faces.iter() {
                            w.write_blob(face)?;
                        }
                        Ok(())
                    }
                }
            }
            Body::Font(f) => w.write_blob(&f.data),
            Body::Mesh(m) => m.write(w, ctx.attributes(id)),
            Body::Model(m) => m.write(w),
            Body::Reflection(r) => {
                w.write_vec3(r.location)?;
                w.write_f32(r.radius)
            }
            Body::Skybox(s) => {
                w.write_u64(s.variant)?;
                match &s.source {
                    SkyboxSource::Cube { texture_id } => w.write_u64(*texture_id),
                    SkyboxSource::Equirectangular { cube, irradiance, radiance } => {
                        w.write_blob(cube)?;
                        w.write_blob(irradiance)?;
                        w.write_blob(radiance)
                    }
                }
            }
            Body::Constraint(p) => {
                w.write_u64(p.mask)?;
                w.write_bool(p.ratio.is_some())?;
                if let Some(r) = p.ratio {
                    w.write_f32(r)?;
                }
                for &v in &p.values {
                    w.write_f32(v)?;
                }
                let mut children = p.children.clone();
                children.sort_unstable();
                w.write_u64_array(&children)
            }
            Body::Scene(s) => {
                w.write_u64_array(&s.cameras)?;
                w.write_u64_array(&s.audios)?;
                w.write_u64_array(&s.lights)?;
                w.write_u64_array(&s.models)?;
                w.write_u64_array(&s.skyboxes)?;
                w.write_u64_array(&s.reflections)?;
                w.write_u64_array(&s.constraints)
            }
        }
    }
}

/// Write the subtype byte and payload of an owning entity
pub fn write_entity<W: Write + Seek>(entity: &Entity, w: &mut BinaryWriter<W>, ctx: &BodyContext) -> Result<()> {
    let body = entity.body()?;
    if body.category() != entity.category() {
        return Err(ExportError::Format(format!(
            "{} '{}' carries a {} body",
            entity.category(),
            entity.name,
            body.category()
        )));
    }
    w.write_u8(entity.tag.subtype)?;
    body.write(entity.tag, entity.id, w, ctx)
}
