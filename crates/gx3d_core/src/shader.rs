//! Shader variant mixed-radix encoder
//!
//! Six independent material axes are packed into one integer, least
//! significant axis first:
//!
//! ```text
//! code = R + lighting + texturing * 3 + specular * 3*4 + environment * 3*4*3
//!          + shadowing * 3*4*3*3 + transparency * 3*4*3*3*3
//! ```
//!
//! Codes below `R` are reserved built-in variants that have no axis
//! decomposition.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::error::{ExportError, Result};

bitflags! {
    /// Per-vertex attributes a mesh must store besides its position
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct VertexAttributes: u8 {
        const NORMAL = 1 << 0;
        const TANGENT = 1 << 1;
        const UV = 1 << 2;
    }
}

/// One independent material axis
pub trait Axis: Copy + Sized {
    const NAME: &'static str;
    /// Number of legal values; doubles as the exclusive sentinel
    const CARDINALITY: u64;

    fn ordinal(self) -> u64;
    fn from_ordinal(ordinal: u64) -> Option<Self>;
    /// Vertex attributes this selection requires
    fn needs(self) -> VertexAttributes;

    /// Like [`from_ordinal`](Axis::from_ordinal) but fails on the sentinel and above
    fn checked(ordinal: u64) -> Result<Self> {
        Self::from_ordinal(ordinal).ok_or(ExportError::InvalidAxisValue {
            axis: Self::NAME,
            value: ordinal,
            limit: Self::CARDINALITY,
        })
    }
}

macro_rules! axis {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident = $ord:literal => $needs:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl Axis for $name {
            const NAME: &'static str = $label;
            const CARDINALITY: u64 = [$($ord),+].len() as u64;

            fn ordinal(self) -> u64 {
                match self {
                    $($name::$variant => $ord),+
                }
            }

            fn from_ordinal(ordinal: u64) -> Option<Self> {
                match ordinal {
                    $($ord => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn needs(self) -> VertexAttributes {
                match self {
                    $($name::$variant => $needs),+
                }
            }
        }
    };
}

axis! {
    /// Lighting model
    Lighting, "lighting" {
        Shadeless = 0 => VertexAttributes::empty(),
        Directional = 1 => VertexAttributes::NORMAL,
        Normalmapped = 2 => VertexAttributes::NORMAL | VertexAttributes::UV | VertexAttributes::TANGENT,
    }
}

axis! {
    /// Source of the base colour
    Texturing, "texturing" {
        Colored = 0 => VertexAttributes::empty(),
        D2 = 1 => VertexAttributes::UV,
        D3 = 2 => VertexAttributes::empty(),
        Cube = 3 => VertexAttributes::NORMAL,
    }
}

axis! {
    Specular, "specular" {
        Matte = 0 => VertexAttributes::empty(),
        Speculated = 1 => VertexAttributes::NORMAL,
        SpecularTextured = 2 => VertexAttributes::NORMAL | VertexAttributes::UV,
    }
}

axis! {
    EnvironmentMapping, "environment mapping" {
        Nonreflective = 0 => VertexAttributes::empty(),
        Baked = 1 => VertexAttributes::NORMAL,
        Realtime = 2 => VertexAttributes::NORMAL,
    }
}

axis! {
    Shadowing, "shadowing" {
        Shadeless = 0 => VertexAttributes::empty(),
        Caster = 1 => VertexAttributes::empty(),
        Full = 2 => VertexAttributes::NORMAL,
    }
}

axis! {
    Transparency, "transparency" {
        Opaque = 0 => VertexAttributes::empty(),
        Transparent = 1 => VertexAttributes::empty(),
        Cutoff = 2 => VertexAttributes::UV,
    }
}

/// Built-in variants outside the combinatorial space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservedVariant {
    ShadowMapper = 0,
    ShadowMapperCutoff = 1,
    SkyboxCube = 2,
    SkyboxEquirectangular = 3,
}

impl ReservedVariant {
    /// Number of reserved codes (`R`)
    pub const COUNT: u64 = 4;

    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(ReservedVariant::ShadowMapper),
            1 => Some(ReservedVariant::ShadowMapperCutoff),
            2 => Some(ReservedVariant::SkyboxCube),
            3 => Some(ReservedVariant::SkyboxEquirectangular),
            _ => None,
        }
    }

    pub fn needs(self) -> VertexAttributes {
        match self {
            ReservedVariant::ShadowMapperCutoff => VertexAttributes::UV,
            _ => VertexAttributes::empty(),
        }
    }
}

/// Axis selections of one combinatorial variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VariantDescriptor {
    pub lighting: Lighting,
    pub texturing: Texturing,
    pub specular: Specular,
    pub environment: EnvironmentMapping,
    pub shadowing: Shadowing,
    pub transparency: Transparency,
}

/// Cardinalities in significance order
pub const AXIS_CARDINALITIES: [u64; 6] = [
    Lighting::CARDINALITY,
    Texturing::CARDINALITY,
    Specular::CARDINALITY,
    EnvironmentMapping::CARDINALITY,
    Shadowing::CARDINALITY,
    Transparency::CARDINALITY,
];

/// Number of combinatorial variants
pub const COMBINED_COUNT: u64 = Lighting::CARDINALITY
    * Texturing::CARDINALITY
    * Specular::CARDINALITY
    * EnvironmentMapping::CARDINALITY
    * Shadowing::CARDINALITY
    * Transparency::CARDINALITY;

impl VariantDescriptor {
    /// Build from raw ordinals in significance order
    pub fn from_ordinals(o: [u64; 6]) -> Result<Self> {
        Ok(Self {
            lighting: Lighting::checked(o[0])?,
            texturing: Texturing::checked(o[1])?,
            specular: Specular::checked(o[2])?,
            environment: EnvironmentMapping::checked(o[3])?,
            shadowing: Shadowing::checked(o[4])?,
            transparency: Transparency::checked(o[5])?,
        })
    }

    /// Ordinals in significance order
    pub fn ordinals(&self) -> [u64; 6] {
        [
            self.lighting.ordinal(),
            self.texturing.ordinal(),
            self.specular.ordinal(),
            self.environment.ordinal(),
            self.shadowing.ordinal(),
            self.transparency.ordinal(),
        ]
    }

    /// Union of the attributes every axis requires
    pub fn needs(&self) -> VertexAttributes {
        self.lighting.needs()
            | self.texturing.needs()
            | self.specular.needs()
            | self.environment.needs()
            | self.shadowing.needs()
            | self.transparency.needs()
    }
}

/// A shader variant: reserved or combinatorial
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    Reserved(ReservedVariant),
    Combined(VariantDescriptor),
}

impl ShaderVariant {
    pub fn encode(&self) -> u64 {
        match self {
            ShaderVariant::Reserved(r) => r.code(),
            ShaderVariant::Combined(d) => {
                let mut code = 0;
                let mut place = 1;
                for (ordinal, cardinality) in d.ordinals().into_iter().zip(AXIS_CARDINALITIES) {
                    code += ordinal * place;
                    place *= cardinality;
                }
                ReservedVariant::COUNT + code
            }
        }
    }

    pub fn decode(code: u64) -> Result<Self> {
        if let Some(r) = ReservedVariant::from_code(code) {
            return Ok(ShaderVariant::Reserved(r));
        }
        let limit = ReservedVariant::COUNT + COMBINED_COUNT;
        if code >= limit {
            return Err(ExportError::InvalidAxisValue {
                axis: "shader variant",
                value: code,
                limit,
            });
        }
        let mut rest = code - ReservedVariant::COUNT;
        let mut ordinals = [0u64; 6];
        for (slot, cardinality) in ordinals.iter_mut().zip(AXIS_CARDINALITIES) {
            *slot = rest % cardinality;
            rest /= cardinality;
        }
        VariantDescriptor::from_ordinals(ordinals).map(ShaderVariant::Combined)
    }

    /// Axis selections of a combinatorial code
    pub fn axes(code: u64) -> Result<VariantDescriptor> {
        match Self::decode(code)? {
            ShaderVariant::Combined(d) => Ok(d),
            ShaderVariant::Reserved(_) => Err(ExportError::ReservedAxisMisuse { code }),
        }
    }

    pub fn needs(&self) -> VertexAttributes {
        match self {
            ShaderVariant::Reserved(r) => r.needs(),
            ShaderVariant::Combined(d) => d.needs(),
        }
    }
}

/// Distinct variants of one export keyed by code
#[derive(Clone, Debug, Default)]
pub struct VariantTable {
    variants: BTreeMap<u64, ShaderVariant>,
}

impl VariantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variant and return its code; repeats collapse
    pub fn register(&mut self, variant: ShaderVariant) -> u64 {
        let code = variant.encode();
        if self.variants.insert(code, variant).is_none() {
            log::debug!("new shader variant {}", code);
        }
        code
    }

    pub fn contains(&self, code: u64) -> bool {
        self.variants.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variants in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &ShaderVariant)> + '_ {
        self.variants.iter().map(|(&c, v)| (c, v))
    }
}
