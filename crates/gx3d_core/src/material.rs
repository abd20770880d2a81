//! Materials written inline in model bodies
//!
//! The six functions at the bottom of this module map a resolved material onto
//! the shader axes. They are pure: nothing here touches the output stream
//! except [`MaterialBody::write`].

use std::io::{Seek, Write};

use gx3d_math::Vec3;

use crate::category::CategoryTag;
use crate::entity::EntityId;
use crate::error::Result;
use crate::shader::{
    EnvironmentMapping, Lighting, ReservedVariant, ShaderVariant, Shadowing, Specular, Texturing,
    Transparency, VariantDescriptor,
};
use crate::writer::BinaryWriter;

/// Roughness at or above this is treated as fully rough
const ROUGHNESS_MATTE: f32 = 1.0 - 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MaterialKind {
    Pbr = 1,
    Unlit = 2,
}

/// Registered texture a material input points at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub id: EntityId,
    pub tag: CategoryTag,
}

/// A material input: a texture or a constant
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Link<T> {
    Texture(TextureRef),
    Value(T),
}

impl<T> Link<T> {
    pub fn texture(&self) -> Option<TextureRef> {
        match self {
            Link::Texture(t) => Some(*t),
            Link::Value(_) => None,
        }
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, Link::Texture(_))
    }
}

/// Inputs only physically based materials carry
#[derive(Clone, Debug, PartialEq)]
pub struct PbrInputs {
    pub emission: Link<Vec3>,
    /// Shared metallic-roughness texture, or `(metallic, roughness)`
    pub metallic_roughness: Link<(f32, f32)>,
    pub normal_map: Option<TextureRef>,
    /// Reflections are rendered at runtime
    pub realtime_reflection: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialBody {
    /// Alpha comes from the base colour texture when textured
    pub alpha: Link<f32>,
    pub base_color: Link<[f32; 4]>,
    pub transparent: bool,
    pub shadow_caster: bool,
    pub alpha_cutoff: f32,
    /// `None` for unlit materials
    pub pbr: Option<PbrInputs>,
}

impl Default for MaterialBody {
    fn default() -> Self {
        Self {
            alpha: Link::Value(1.0),
            base_color: Link::Value([1.0; 4]),
            transparent: false,
            shadow_caster: false,
            alpha_cutoff: 0.5,
            pbr: None,
        }
    }
}

impl MaterialBody {
    pub fn kind(&self) -> MaterialKind {
        if self.pbr.is_some() {
            MaterialKind::Pbr
        } else {
            MaterialKind::Unlit
        }
    }

    /// Combined shader variant of this material
    pub fn variant(&self) -> ShaderVariant {
        ShaderVariant::Combined(VariantDescriptor {
            lighting: lighting(self),
            texturing: texturing(self),
            specular: specular(self),
            environment: environment(self),
            shadowing: shadowing(self),
            transparency: transparency(self),
        })
    }

    /// Depth-only variant used when this material casts shadows
    pub fn shadow_variant(&self) -> Option<ShaderVariant> {
        if !self.shadow_caster {
            return None;
        }
        let reserved = if transparency(self) == Transparency::Cutoff {
            ReservedVariant::ShadowMapperCutoff
        } else {
            ReservedVariant::ShadowMapper
        };
        Some(ShaderVariant::Reserved(reserved))
    }

    pub fn write<W: Write + Seek>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_u8(self.kind() as u8)?;
        match self.alpha {
            Link::Texture(_) => w.write_bool(true)?,
            Link::Value(a) => {
                w.write_bool(false)?;
                w.write_f32(a)?;
            }
        }
        match self.base_color {
            Link::Texture(t) => {
                w.write_bool(true)?;
                w.write_u64(t.id)?;
            }
            Link::Value(c) => {
                w.write_bool(false)?;
                w.write_vec4(c)?;
            }
        }
        w.write_bool(self.transparent)?;
        w.write_bool(self.shadow_caster)?;
        w.write_f32(self.alpha_cutoff)?;

        let pbr = match &self.pbr {
            Some(pbr) => pbr,
            None => return Ok(()),
        };
        match pbr.emission {
            Link::Texture(t) => {
                w.write_bool(true)?;
                w.write_u64(t.id)?;
            }
            Link::Value(e) => {
                w.write_bool(false)?;
                w.write_vec3(e)?;
            }
        }
        match pbr.metallic_roughness {
            Link::Texture(t) => {
                w.write_bool(true)?;
                w.write_u64(t.id)?;
            }
            Link::Value((metallic, roughness)) => {
                w.write_bool(false)?;
                w.write_f32(metallic)?;
                w.write_f32(roughness)?;
            }
        }
        match pbr.normal_map {
            Some(t) => {
                w.write_bool(true)?;
                w.write_u64(t.id)?;
            }
            None => w.write_bool(false)?,
        }
        Ok(())
    }
}

pub fn lighting(m: &MaterialBody) -> Lighting {
    match &m.pbr {
        None => Lighting::Shadeless,
        Some(pbr) if pbr.normal_map.is_some() => Lighting::Normalmapped,
        Some(_) => Lighting::Directional,
    }
}

pub fn texturing(m: &MaterialBody) -> Texturing {
    match m.base_color {
        Link::Value(_) => Texturing::Colored,
        Link::Texture(t) if t.tag == CategoryTag::TEXTURE_CUBE => Texturing::Cube,
        Link::Texture(t) if t.tag == CategoryTag::TEXTURE_3D => Texturing::D3,
        Link::Texture(_) => Texturing::D2,
    }
}

pub fn specular(m: &MaterialBody) -> Specular {
    match m.pbr.as_ref().map(|p| p.metallic_roughness) {
        None => Specular::Matte,
        Some(Link::Texture(_)) => Specular::SpecularTextured,
        Some(Link::Value((_, roughness))) if roughness >= ROUGHNESS_MATTE => Specular::Matte,
        Some(Link::Value(_)) => Specular::Speculated,
    }
}

pub fn environment(m: &MaterialBody) -> EnvironmentMapping {
    match &m.pbr {
        None => EnvironmentMapping::Nonreflective,
        Some(pbr) if pbr.realtime_reflection => EnvironmentMapping::Realtime,
        Some(pbr) => match pbr.metallic_roughness {
            Link::Texture(_) => EnvironmentMapping::Baked,
            Link::Value((metallic, _)) if metallic > 0.0 => EnvironmentMapping::Baked,
            Link::Value(_) => EnvironmentMapping::Nonreflective,
        },
    }
}

pub fn shadowing(m: &MaterialBody) -> Shadowing {
    match (m.shadow_caster, m.kind()) {
        (false, _) => Shadowing::Shadeless,
        (true, MaterialKind::Unlit) => Shadowing::Caster,
        (true, MaterialKind::Pbr) => Shadowing::Full,
    }
}

pub fn transparency(m: &MaterialBody) -> Transparency {
    if m.transparent {
        Transparency::Transparent
    } else if m.alpha.is_texture() {
        Transparency::Cutoff
    } else {
        Transparency::Opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn grass() -> TextureRef {
        TextureRef { id: 1030, tag: CategoryTag::TEXTURE_2D }
    }

    fn pbr(metallic: f32, roughness: f32) -> MaterialBody {
        MaterialBody {
            shadow_caster: true,
            pbr: Some(PbrInputs {
                emission: Link::Value(Vec3::ZERO),
                metallic_roughness: Link::Value((metallic, roughness)),
                normal_map: None,
                realtime_reflection: false,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_unlit_axes() {
        let m = MaterialBody::default();
        assert_eq!(m.kind(), MaterialKind::Unlit);
        assert_eq!(lighting(&m), Lighting::Shadeless);
        assert_eq!(specular(&m), Specular::Matte);
        assert_eq!(environment(&m), EnvironmentMapping::Nonreflective);
        assert_eq!(shadowing(&m), Shadowing::Shadeless);
        assert_eq!(m.variant().encode(), ReservedVariant::COUNT);
        assert!(m.shadow_variant().is_none());
    }

    #[test]
    fn test_pbr_axes() {
        let m = pbr(0.0, 1.0);
        assert_eq!(lighting(&m), Lighting::Directional);
        assert_eq!(specular(&m), Specular::Matte);
        assert_eq!(environment(&m), EnvironmentMapping::Nonreflective);
        assert_eq!(shadowing(&m), Shadowing::Full);

        let m = pbr(0.5, 0.3);
        assert_eq!(specular(&m), Specular::Speculated);
        assert_eq!(environment(&m), EnvironmentMapping::Baked);
    }

    #[test]
    fn test_textured_inputs() {
        let mut m = pbr(0.0, 0.5);
        m.base_color = Link::Texture(grass());
        m.alpha = Link::Texture(grass());
        if let Some(p) = m.pbr.as_mut() {
            p.normal_map = Some(TextureRef { id: 1031, tag: CategoryTag::TEXTURE_2D });
            p.metallic_roughness = Link::Texture(TextureRef { id: 1032, tag: CategoryTag::TEXTURE_2D });
        }
        assert_eq!(lighting(&m), Lighting::Normalmapped);
        assert_eq!(texturing(&m), Texturing::D2);
        assert_eq!(specular(&m), Specular::SpecularTextured);
        assert_eq!(environment(&m), EnvironmentMapping::Baked);
        assert_eq!(transparency(&m), Transparency::Cutoff);
        assert_eq!(
            m.shadow_variant(),
            Some(ShaderVariant::Reserved(ReservedVariant::ShadowMapperCutoff))
        );
    }

    #[test]
    fn test_blend_is_transparent() {
        let mut m = MaterialBody::default();
        m.transparent = true;
        m.alpha = Link::Texture(grass());
        assert_eq!(transparency(&m), Transparency::Transparent);
    }

    #[test]
    fn test_unlit_write_layout() {
        let m = MaterialBody::default();
        let mut w = BinaryWriter::new(Cursor::new(Vec::new()));
        m.write(&mut w).unwrap();
        // kind, alpha flag + f32, colour flag + vec4, two bools, cutoff
        assert_eq!(w.position(), 1 + 1 + 4 + 1 + 16 + 1 + 1 + 4);
    }

    #[test]
    fn test_pbr_write_layout() {
        let mut m = pbr(0.2, 0.4);
        m.base_color = Link::Texture(grass());
        let mut w = BinaryWriter::new(Cursor::new(Vec::new()));
        m.write(&mut w).unwrap();
        let unlit = 1 + 1 + 4 + 1 + 8 + 1 + 1 + 4;
        let pbr = 1 + 12 + 1 + 8 + 1;
        assert_eq!(w.position(), unlit + pbr);
        let bytes = w.into_inner().unwrap().into_inner();
        assert_eq!(bytes[0], MaterialKind::Pbr as u8);
    }
}
