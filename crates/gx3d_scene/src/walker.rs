//! Scene walker
//!
//! Walks every scene of a [`SceneDocument`], validates the host data and
//! registers entities bottom-up: textures and fonts before the materials that
//! link them, meshes and child models before their parent model, everything
//! before the scene itself. A body therefore only ever refers to ids that are
//! already allocated.
//!
//! Objects are dispatched by name prefix. Objects whose name matches no prefix
//! are skipped.

use std::fs;
use std::path::Path;

use gx3d_core::body::{
    AudioBody, Body, CameraBody, FontBody, LightBody, MeshBody, ModelBody, ModelMesh, PlacerBody,
    ReflectionBody, SceneBody, SkyboxBody, SkyboxSource, TextureBody, TextureData, Vertex, Widget,
    WidgetText,
};
use gx3d_core::category::{Category, CategoryTag, WidgetKind};
use gx3d_core::naming::{classify, origin_name, widget_kind};
use gx3d_core::{
    EntityHandle, EntityId, ExportContext, ExportError, IblBaker, Link, MaterialBody, PbrInputs,
    Placement, Registration, ReservedVariant, Result, ShaderVariant,
};
use gx3d_core::material::TextureRef;
use gx3d_math::mat4::{self, Mat4};
use gx3d_math::{Aabb, Vec3};

use crate::document::{
    AlignX, AlignY, BlendMethod, Input, LightKind, MaterialEntry, ObjectData, ObjectEntry,
    Principled, Projection, SceneDocument, SceneEntry, ShadowMethod,
};

/// Tolerance of the "no transformation" checks
const EPSILON: f32 = 1e-4;

const PBR_PREFIX: &str = "pbr-";
const UNLIT_PREFIX: &str = "unlit-";

/// Cube map faces in container order
const CUBE_FACES: [&str; 6] = ["up", "down", "left", "right", "front", "back"];

/// Placer attributes by mask bit
const PLACER_ATTRIBUTES: [&str; 6] = ["x-middle", "y-middle", "x-left", "x-right", "y-up", "y-down"];
const PLACER_RATIO: &str = "ratio";

/// Custom property holding a reflection volume's radius
const REFLECTION_RADIUS: &str = "radius";

/// Feeds the objects of a document into an [`ExportContext`]
pub struct SceneWalker<'a> {
    document: &'a SceneDocument,
    ctx: &'a mut ExportContext,
    baker: Option<&'a IblBaker>,
}

impl<'a> SceneWalker<'a> {
    pub fn new(document: &'a SceneDocument, ctx: &'a mut ExportContext) -> Self {
        Self {
            document,
            ctx,
            baker: None,
        }
    }

    /// Baker used for equirectangular skyboxes
    pub fn with_baker(mut self, baker: Option<&'a IblBaker>) -> Self {
        self.baker = baker;
        self
    }

    /// Register every scene and everything reachable from it
    pub fn walk(mut self) -> Result<Vec<EntityHandle>> {
        let document = self.document;
        let mut scenes = Vec::new();
        for scene in &document.scenes {
            match classify(&scene.name) {
                Some(tag) if tag.category == Category::Scene => scenes.push(self.scene(scene, tag)?),
                _ => log::debug!("Skipping scene '{}' without a scene prefix", scene.name),
            }
        }
        log::info!(
            "Walked {} scene(s), {} entities registered",
            scenes.len(),
            self.ctx.registry.len()
        );
        Ok(scenes)
    }

    fn scene(&mut self, scene: &SceneEntry, tag: CategoryTag) -> Result<EntityHandle> {
        let document = self.document;
        let mut body = SceneBody::default();
        for name in &scene.objects {
            let object = document.object(name).ok_or_else(|| {
                ExportError::malformed(&scene.name, format!("links unknown object '{}'", name))
            })?;
            if object.parent.is_some() {
                continue;
            }
            let Some(tag) = classify(&object.name) else {
                log::debug!("Skipping unclassified object '{}'", object.name);
                continue;
            };
            match tag.category {
                Category::Model => body.models.push(self.model(object, tag)?.id),
                Category::Skybox => body.skyboxes.push(self.skybox(object, tag)?.id),
                Category::Reflection => body.reflections.push(self.reflection(object, tag)?.id),
                Category::Camera => body.cameras.push(self.camera(object, tag)?.id),
                Category::Light => body.lights.push(self.light(object, tag)?.id),
                Category::Audio => body.audios.push(self.audio(object, tag)?.id),
                Category::Constraint => body.constraints.push(self.constraint(object, tag)?.id),
                other => log::debug!("Skipping {} '{}' at scene level", other, object.name),
            }
        }
        if body.cameras.is_empty() {
            return Err(ExportError::malformed(
                &scene.name,
                "scene must have at least one camera",
            ));
        }
        self.ctx
            .registry
            .register(Registration::named(tag, &scene.name), |_| Ok(Body::Scene(body)))
    }

    /// Handle of an object already registered through another scene or parent
    fn existing(&self, category: Category, name: &str) -> Option<EntityHandle> {
        self.ctx.registry.lookup(category, name)
    }

    fn camera(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Camera, &object.name) {
            return Ok(handle);
        }
        let ObjectData::Camera { projection, clip_start, clip_end } = object.data else {
            return Err(wrong_data(object, "camera"));
        };
        let projection = match projection {
            Projection::Perspective { angle_x } if tag == CategoryTag::CAMERA_PERSPECTIVE => angle_x,
            Projection::Orthographic { scale } if tag == CategoryTag::CAMERA_ORTHOGRAPHIC => scale,
            _ => {
                return Err(ExportError::malformed(
                    &object.name,
                    "camera projection does not match its name",
                ))
            }
        };
        let m = object.matrix_world;
        let body = CameraBody {
            location: mat4::translation(m),
            rotation: mat4::to_quaternion(m),
            clip_start,
            clip_end,
            projection,
        };
        log::debug!("Camera '{}' at {:?}", object.name, body.location);
        self.ctx
            .registry
            .register(Registration::named(tag, &object.name), |_| Ok(Body::Camera(body)))
    }

    fn light(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Light, &object.name) {
            return Ok(handle);
        }
        let ObjectData::Light { kind, color, energy, shadow } = object.data else {
            return Err(wrong_data(object, "light"));
        };
        let expected = if tag == CategoryTag::LIGHT_DIRECTIONAL {
            LightKind::Sun
        } else if tag == CategoryTag::LIGHT_POINT {
            LightKind::Point
        } else {
            LightKind::Spot
        };
        if kind != expected {
            return Err(ExportError::malformed(
                &object.name,
                format!("should be a {:?} light, found {:?}", expected, kind),
            ));
        }
        let m = object.matrix_world;
        let body = LightBody {
            color: Vec3::from_array(color) * energy,
            shadow,
            location: mat4::translation(m),
            direction: mat4::transform_direction(m, -Vec3::Z).normalized(),
        };
        self.ctx
            .registry
            .register(Registration::named(tag, &object.name), |_| Ok(Body::Light(body)))
    }

    fn audio(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        let ObjectData::Speaker { sound } = &object.data else {
            return Err(wrong_data(object, "speaker"));
        };
        let sound = sound
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExportError::malformed(&object.name, "sound is not set in speaker"))?;
        if !sound.ends_with(".ogg") {
            return Err(ExportError::malformed(
                &object.name,
                format!("use OGG instead of '{}'", sound),
            ));
        }
        let path = self.document.resolve(sound);
        let key = path.to_string_lossy().into_owned();
        self.ctx
            .registry
            .register(Registration::keyed(tag, &object.name, &key), |_| {
                Ok(Body::Audio(AudioBody {
                    data: read_backing(&object.name, &path)?,
                }))
            })
    }

    fn reflection(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Reflection, &object.name) {
            return Ok(handle);
        }
        let radius = object
            .properties
            .get(REFLECTION_RADIUS)
            .copied()
            .filter(|r| *r > 0.0)
            .ok_or_else(|| {
                ExportError::malformed(
                    &object.name,
                    format!("reflection volume needs a positive '{}' property", REFLECTION_RADIUS),
                )
            })?;
        let body = ReflectionBody {
            location: mat4::translation(object.matrix_world),
            radius,
        };
        self.ctx
            .registry
            .register(Registration::named(tag, &object.name), |_| Ok(Body::Reflection(body)))
    }

    fn skybox(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Skybox, &object.name) {
            return Ok(handle);
        }
        let document = self.document;
        let image_name = skybox_image(document, object)?;

        if tag == CategoryTag::SKYBOX_CUBE {
            let texture = self.texture(&object.name, image_name)?;
            if texture.tag != CategoryTag::TEXTURE_CUBE {
                return Err(ExportError::malformed(
                    &object.name,
                    "texture must be cube for skybox",
                ));
            }
            let variant = self
                .ctx
                .variants
                .register(ShaderVariant::Reserved(ReservedVariant::SkyboxCube));
            return self
                .ctx
                .registry
                .register(Registration::named(tag, &object.name), |_| {
                    Ok(Body::Skybox(SkyboxBody {
                        variant,
                        source: SkyboxSource::Cube { texture_id: texture.id },
                    }))
                });
        }

        let image = document.image(image_name).ok_or_else(|| {
            ExportError::malformed(&object.name, format!("image '{}' does not exist", image_name))
        })?;
        let path = document.resolve(&image.path);
        let baker = self.baker.ok_or_else(|| ExportError::ExternalTool {
            tool: "ibl baker".to_string(),
            reason: format!("none configured, needed by '{}'", object.name),
        })?;
        let variant = self
            .ctx
            .variants
            .register(ShaderVariant::Reserved(ReservedVariant::SkyboxEquirectangular));
        self.ctx
            .registry
            .register(Registration::named(tag, &object.name), |_| {
                let baked = baker.bake(&path)?;
                Ok(Body::Skybox(SkyboxBody {
                    variant,
                    source: SkyboxSource::Equirectangular {
                        cube: baked.cube,
                        irradiance: baked.irradiance,
                        radiance: baked.radiance,
                    },
                }))
            })
    }

    fn constraint(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Constraint, &object.name) {
            return Ok(handle);
        }
        if tag != CategoryTag::CONSTRAINT_PLACER {
            return Err(ExportError::malformed(
                &object.name,
                "only placer constraints are supported",
            ));
        }
        if !matches!(object.data, ObjectData::Empty) {
            return Err(wrong_data(object, "empty"));
        }

        let document = self.document;
        let mut children = Vec::new();
        for child in document.children(&object.name) {
            let tag = classify(&child.name)
                .filter(|t| t.category == Category::Model)
                .ok_or_else(|| {
                    ExportError::malformed(
                        &object.name,
                        format!("placer can only have models as children, found '{}'", child.name),
                    )
                })?;
            children.push(self.model(child, tag)?.id);
        }
        if children.is_empty() {
            return Err(ExportError::malformed(&object.name, "placer must have children"));
        }

        let mut mask = 0u64;
        for (bit, attribute) in PLACER_ATTRIBUTES.iter().enumerate() {
            if object.properties.contains_key(*attribute) {
                mask |= 1 << bit;
            }
        }
        // Middle attributes are relative to the screen centre
        if mask & 0b11 != 0 && has_transformation(document, object)? {
            return Err(ExportError::malformed(
                &object.name,
                "placer with middle attributes must not have any transformation",
            ));
        }
        let attribute = |name: &str| object.properties.get(name).copied().unwrap_or_default();
        let values = match mask {
            4 => vec![attribute("x-left")],
            8 => vec![attribute("x-right")],
            33 => vec![attribute("x-middle"), attribute("y-down")],
            _ => {
                return Err(ExportError::malformed(
                    &object.name,
                    format!("placer attribute mask {} is not a meaningful combination", mask),
                ))
            }
        };
        let body = PlacerBody {
            mask,
            ratio: object.properties.get(PLACER_RATIO).copied(),
            values,
            children,
        };
        self.ctx
            .registry
            .register(Registration::named(tag, &object.name), |_| Ok(Body::Constraint(body)))
    }

    fn model(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Model, &object.name) {
            return Ok(handle);
        }
        let document = self.document;
        let mut meshes = Vec::new();
        let mut children = Vec::new();
        let mut bounds = Aabb::new();

        for child in document.children(&object.name) {
            match classify(&child.name) {
                Some(child_tag) if child_tag.category == Category::Mesh => {
                    let (placed, aabb) = self.model_mesh(child, child_tag)?;
                    bounds.merge(&aabb);
                    meshes.push(placed);
                }
                Some(child_tag) if child_tag.category == Category::Model => {
                    children.push(self.model(child, child_tag)?.id);
                }
                _ => log::debug!("Skipping '{}' under model '{}'", child.name, object.name),
            }
        }

        let kind = widget_kind(&object.name);
        if meshes.is_empty() && children.is_empty() && kind != Some(WidgetKind::Text) {
            return Err(ExportError::malformed(
                &object.name,
                "waste model: no meshes and no child models",
            ));
        }
        let widget = if tag == CategoryTag::MODEL_WIDGET {
            let kind = kind.ok_or_else(|| {
                ExportError::malformed(&object.name, "unrecognized widget type")
            })?;
            let text = if kind.has_text() {
                Some(self.widget_text(object)?)
            } else {
                None
            };
            Some(Widget { kind, text })
        } else {
            None
        };

        let body = ModelBody {
            widget,
            transform: object.matrix_world,
            occlusion_center: bounds.center(),
            occlusion_radius: bounds.occlusion_radius(),
            meshes,
            children,
        };
        self.ctx
            .registry
            .register(Registration::named(tag, &object.name), |_| Ok(Body::Model(body)))
    }

    fn widget_text(&mut self, object: &ObjectEntry) -> Result<WidgetText> {
        let ObjectData::Text(data) = &object.data else {
            return Err(wrong_data(object, "text"));
        };
        let font = data
            .font
            .as_deref()
            .ok_or_else(|| ExportError::malformed(&object.name, "font is none"))?;
        let font_id = self.font(&object.name, font)?;
        let horizontal = match data.align_x {
            AlignX::Center => 0,
            AlignX::Left => 3,
            AlignX::Right => 6,
        };
        let vertical = match data.align_y {
            AlignY::Bottom => 1,
            AlignY::Center => 2,
            AlignY::Top => 3,
        };
        Ok(WidgetText {
            text: data.body.trim().to_string(),
            alignment: horizontal + vertical,
            font_id,
            material: self.material(object)?,
            character_spacing: data.space_character - 1.0,
            word_spacing: data.space_word - 1.0,
            line_spacing: data.space_line,
        })
    }

    /// Register a mesh placed under a model; returns its placement and bounds
    fn model_mesh(&mut self, object: &ObjectEntry, tag: CategoryTag) -> Result<(ModelMesh, Aabb)> {
        check_mesh_object(self.document, object)?;
        let material = self.material(object)?;
        let origin = origin_name(&object.name)?.ok_or_else(|| {
            ExportError::malformed(&object.name, "origin mesh can not have parent")
        })?;
        let origin_handle = self.origin_mesh(origin, &object.name)?;

        let placement = Placement {
            material: Some(material.clone()),
        };
        let handle = self.ctx.registry.register(
            Registration::copy(tag, &object.name, origin).placed(placement),
            |_| Err(ExportError::malformed(&object.name, "mesh copy has no body of its own")),
        )?;

        let aabb = match self.ctx.registry.origin(origin_handle.key).map(|e| e.body()) {
            Some(Ok(Body::Mesh(mesh))) => mesh.aabb,
            _ => Aabb::new(),
        };

        let variant = self.ctx.use_variant(handle.id, material.variant());
        if let Some(shadow) = material.shadow_variant() {
            self.ctx.use_variant(handle.id, shadow);
        }
        let copy = self.ctx.registry.get(handle.key).ok_or_else(|| {
            ExportError::Format(format!("mesh '{}' vanished after registration", object.name))
        })?;
        Ok((ModelMesh::placed(copy, variant)?, aabb))
    }

    /// Register the origin of a mesh copy before the copy itself
    fn origin_mesh(&mut self, origin: &str, user: &str) -> Result<EntityHandle> {
        if let Some(handle) = self.existing(Category::Mesh, origin) {
            return Ok(handle);
        }
        let document = self.document;
        let object = document.object(origin).ok_or_else(|| ExportError::UnresolvedOrigin {
            category: Category::Mesh,
            name: user.to_string(),
            origin: origin.to_string(),
        })?;
        let tag = classify(origin)
            .filter(|t| t.category == Category::Mesh)
            .ok_or_else(|| ExportError::malformed(origin, "origin of a mesh copy is not a mesh"))?;
        if object.parent.is_some() {
            return Err(ExportError::malformed(origin, "origin mesh can not have parent"));
        }
        check_mesh_object(document, object)?;
        let material = self.material(object)?;
        let mesh = mesh_body(object)?;
        log::debug!(
            "Mesh '{}': {} vertices, {} indices",
            origin,
            mesh.vertices.len(),
            mesh.indices.len()
        );
        let placement = Placement {
            material: Some(material),
        };
        self.ctx
            .registry
            .register(Registration::named(tag, origin).placed(placement), |_| Ok(Body::Mesh(mesh)))
    }

    fn material(&mut self, object: &ObjectEntry) -> Result<MaterialBody> {
        let name = object.name.as_str();
        let slot = match object.material_slots.as_slice() {
            [] => return Err(ExportError::malformed(name, "there is no material")),
            [slot] => slot,
            _ => return Err(ExportError::malformed(name, "there must be only one material slot")),
        };
        let document = self.document;
        let entry = document.material(slot).ok_or_else(|| {
            ExportError::malformed(name, format!("material '{}' does not exist", slot))
        })?;
        let inputs = entry.principled.as_ref().ok_or_else(|| {
            ExportError::malformed(name, format!("material '{}' has no principled inputs", entry.name))
        })?;
        let is_pbr = if entry.name.starts_with(PBR_PREFIX) {
            true
        } else if entry.name.starts_with(UNLIT_PREFIX) {
            false
        } else {
            return Err(ExportError::malformed(
                name,
                format!("unexpected material type '{}'", entry.name),
            ));
        };

        let alpha = self.link(name, &inputs.alpha)?;
        let base_color = self.link(name, &inputs.base_color)?;
        if let Link::Texture(texture) = alpha {
            if base_color.texture() != Some(texture) {
                return Err(ExportError::malformed(
                    name,
                    "alpha texture must be the base colour texture",
                ));
            }
        }
        check_render_settings(name, entry)?;

        let pbr = if is_pbr {
            Some(self.pbr_inputs(name, entry, inputs)?)
        } else {
            None
        };
        Ok(MaterialBody {
            alpha,
            base_color,
            transparent: entry.blend_method == BlendMethod::Blend,
            shadow_caster: entry.shadow_method != ShadowMethod::None,
            alpha_cutoff: entry.alpha_threshold,
            pbr,
        })
    }

    fn pbr_inputs(&mut self, name: &str, entry: &MaterialEntry, inputs: &Principled) -> Result<PbrInputs> {
        let emission = match self.link(name, &inputs.emission)? {
            Link::Value(v) => Link::Value(Vec3::from_array(v)),
            Link::Texture(t) => Link::Texture(t),
        };
        let metallic = self.link(name, &inputs.metallic)?;
        let roughness = self.link(name, &inputs.roughness)?;
        let metallic_roughness = match (metallic, roughness) {
            (Link::Value(m), Link::Value(r)) => Link::Value((m, r)),
            (Link::Texture(m), Link::Texture(r)) if m.id == r.id => Link::Texture(m),
            (Link::Texture(_), Link::Texture(_)) => {
                return Err(ExportError::malformed(
                    name,
                    "metallic and roughness must point to the same texture",
                ))
            }
            _ => {
                return Err(ExportError::malformed(
                    name,
                    "metallic and roughness must be both scalar or both texture",
                ))
            }
        };
        let normal_map = match &inputs.normal {
            Some(image) => Some(self.texture(name, image)?),
            None => None,
        };
        Ok(PbrInputs {
            emission,
            metallic_roughness,
            normal_map,
            realtime_reflection: entry.realtime_reflection,
        })
    }

    fn link<T: Copy>(&mut self, owner: &str, input: &Input<T>) -> Result<Link<T>> {
        match input {
            Input::Value(v) => Ok(Link::Value(*v)),
            Input::Image(image) => Ok(Link::Texture(self.texture(owner, image)?)),
        }
    }

    /// Register the texture behind an image entry
    fn texture(&mut self, owner: &str, image_name: &str) -> Result<TextureRef> {
        let document = self.document;
        let image = document.image(image_name).ok_or_else(|| {
            ExportError::malformed(owner, format!("image '{}' does not exist", image_name))
        })?;
        let tag = classify(&image.name)
            .filter(|t| t.category == Category::Texture)
            .ok_or_else(|| {
                ExportError::malformed(owner, format!("texture name '{}' is wrong", image.name))
            })?;
        if image.path.trim().is_empty() {
            return Err(ExportError::malformed(&image.name, "file path is empty"));
        }
        let path = document.resolve(&image.path);
        let cube = if tag == CategoryTag::TEXTURE_CUBE {
            Some(cube_prefix(&image.name, &path)?)
        } else {
            None
        };

        let key = path.to_string_lossy().into_owned();
        let handle = self
            .ctx
            .registry
            .register(Registration::keyed(tag, &image.name, &key), |_| {
                let data = match &cube {
                    Some((stem, extension)) => TextureData::Cube {
                        faces: Box::new(cube_faces(&image.name, &path, stem, extension)?),
                    },
                    None => TextureData::Image {
                        width: image.size[0],
                        height: image.size[1],
                        data: read_backing(&image.name, &path)?,
                    },
                };
                Ok(Body::Texture(TextureBody { data }))
            })?;
        Ok(TextureRef {
            id: handle.id,
            tag: handle.tag,
        })
    }

    fn font(&mut self, owner: &str, font_name: &str) -> Result<EntityId> {
        let document = self.document;
        let entry = document.font(font_name).ok_or_else(|| {
            ExportError::malformed(owner, format!("font '{}' does not exist", font_name))
        })?;
        let tag = classify(&entry.name)
            .filter(|t| t.category == Category::Font)
            .ok_or_else(|| {
                ExportError::malformed(owner, format!("font name '{}' is wrong", entry.name))
            })?;
        let file = entry.path.trim();
        if file.is_empty() {
            return Err(ExportError::malformed(&entry.name, "file path is empty"));
        }
        if !file.ends_with(".ttf") {
            return Err(ExportError::malformed(
                &entry.name,
                format!("use TTF for font, found '{}'", file),
            ));
        }
        let path = document.resolve(file);
        let key = path.to_string_lossy().into_owned();
        let handle = self
            .ctx
            .registry
            .register(Registration::keyed(tag, &entry.name, &key), |_| {
                Ok(Body::Font(FontBody {
                    data: read_backing(&entry.name, &path)?,
                }))
            })?;
        Ok(handle.id)
    }
}

fn wrong_data(object: &ObjectEntry, expected: &str) -> ExportError {
    ExportError::malformed(
        &object.name,
        format!("expected {} data, found {}", expected, object.data.kind_name()),
    )
}

/// Whole content of a file the host refers to
fn read_backing(object: &str, path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| {
        ExportError::malformed(object, format!("cannot read '{}': {}", path.display(), err))
    })
}

/// Matrix of `object` relative to its parent
fn local_matrix(document: &SceneDocument, object: &ObjectEntry) -> Result<Mat4> {
    let Some(parent_name) = &object.parent else {
        return Ok(object.matrix_world);
    };
    let parent = document.object(parent_name).ok_or_else(|| {
        ExportError::malformed(&object.name, format!("parent '{}' does not exist", parent_name))
    })?;
    let inverse = mat4::affine_inverse(parent.matrix_world).ok_or_else(|| {
        ExportError::malformed(&object.name, format!("parent '{}' has a singular matrix", parent_name))
    })?;
    Ok(mat4::mul(inverse, object.matrix_world))
}

fn has_transformation(document: &SceneDocument, object: &ObjectEntry) -> Result<bool> {
    Ok(!mat4::is_identity(local_matrix(document, object)?, EPSILON))
}

fn check_mesh_object(document: &SceneDocument, object: &ObjectEntry) -> Result<()> {
    if !matches!(object.data, ObjectData::Mesh { .. }) {
        return Err(wrong_data(object, "mesh"));
    }
    if has_transformation(document, object)? {
        return Err(ExportError::malformed(
            &object.name,
            "mesh must not have any transformation",
        ));
    }
    if document.children(&object.name).next().is_some() {
        return Err(ExportError::malformed(&object.name, "mesh can not have children"));
    }
    Ok(())
}

fn check_render_settings(name: &str, entry: &MaterialEntry) -> Result<()> {
    if !entry.backface_culling {
        return Err(ExportError::malformed(
            name,
            format!("material '{}' must have back-face culling enabled", entry.name),
        ));
    }
    if !matches!(entry.blend_method, BlendMethod::Clip | BlendMethod::Blend) {
        return Err(ExportError::malformed(
            name,
            format!("blend method {:?} must be Clip or Blend", entry.blend_method),
        ));
    }
    if !matches!(entry.shadow_method, ShadowMethod::Clip | ShadowMethod::None) {
        return Err(ExportError::malformed(
            name,
            format!("shadow method {:?} must be Clip or None", entry.shadow_method),
        ));
    }
    Ok(())
}

/// Weld the triangles of a mesh object into a mesh body
fn mesh_body(object: &ObjectEntry) -> Result<MeshBody> {
    let ObjectData::Mesh { positions, polygons, uv_layers } = &object.data else {
        return Err(wrong_data(object, "mesh"));
    };
    let uvs = match uv_layers.as_slice() {
        [layer] => layer,
        _ => {
            return Err(ExportError::malformed(
                &object.name,
                format!("unexpected number of uv layers: {}", uv_layers.len()),
            ))
        }
    };

    let mut corners = Vec::with_capacity(polygons.len() * 3);
    for polygon in polygons {
        if polygon.len() > 3 {
            return Err(ExportError::malformed(&object.name, "is not triangulated"));
        }
        if polygon.len() < 3 {
            return Err(ExportError::malformed(&object.name, "has a degenerate polygon"));
        }
        for corner in polygon {
            let position = positions.get(corner.vertex as usize).ok_or_else(|| {
                ExportError::malformed(
                    &object.name,
                    format!("corner refers to missing vertex {}", corner.vertex),
                )
            })?;
            let uv = uvs.get(corners.len()).ok_or_else(|| {
                ExportError::malformed(&object.name, "uv layer is shorter than the corner list")
            })?;
            let normal = Vec3::from_array(corner.normal).normalized();
            let tangent = Vec3::from_array(corner.tangent).normalized();
            corners.push(Vertex {
                position: *position,
                normal: normal.to_array(),
                tangent: [tangent.x, tangent.y, tangent.z, corner.bitangent_sign],
                uv: [uv[0], 1.0 - uv[1]],
            });
        }
    }
    MeshBody::from_corners(&object.name, corners)
}

/// Image linked to the base colour of a skybox's material
fn skybox_image<'d>(document: &'d SceneDocument, object: &ObjectEntry) -> Result<&'d str> {
    let slot = object
        .material_slots
        .first()
        .ok_or_else(|| ExportError::malformed(&object.name, "skybox has no material"))?;
    let inputs = document
        .material(slot)
        .and_then(|m| m.principled.as_ref())
        .ok_or_else(|| {
            ExportError::malformed(&object.name, format!("material '{}' has no principled inputs", slot))
        })?;
    match &inputs.base_color {
        Input::Image(image) => Ok(image.as_str()),
        Input::Value(_) => Err(ExportError::malformed(
            &object.name,
            "skybox base colour must be an image",
        )),
    }
}

/// Split `.../<stem>-up.<ext>` into `<stem>` and `.<ext>`
fn cube_prefix(name: &str, up: &Path) -> Result<(String, String)> {
    let malformed = || {
        ExportError::malformed(
            name,
            "cube texture file name must end with -up.<extension>",
        )
    };
    let file = up.file_name().and_then(|f| f.to_str()).ok_or_else(malformed)?;
    let dot = file.rfind('.').ok_or_else(malformed)?;
    let (stem, extension) = file.split_at(dot);
    let stem = stem.strip_suffix("-up").ok_or_else(malformed)?;
    Ok((stem.to_string(), extension.to_string()))
}

fn cube_faces(name: &str, up: &Path, stem: &str, extension: &str) -> Result<[Vec<u8>; 6]> {
    let mut faces: [Vec<u8>; 6] = Default::default();
    for (face, suffix) in faces.iter_mut().zip(CUBE_FACES) {
        let path = up.with_file_name(format!("{}-{}{}", stem, suffix, extension));
        *face = read_backing(name, &path)?;
    }
    Ok(faces)
}
