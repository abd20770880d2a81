//! Entity categories and subtypes
//!
//! A [`Category`] selects the table an entity is listed in; a [`CategoryTag`]
//! adds the subtype byte that opens the entity's body.

use std::fmt;

use crate::entity::AliasPolicy;

/// Partition of entities sharing one table and one body layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Camera,
    Audio,
    Light,
    Texture,
    Font,
    Mesh,
    Model,
    Reflection,
    Skybox,
    Constraint,
    Scene,
}

impl Category {
    /// Container schema: the order of tables and of body blocks
    pub const SCHEMA: [Category; 11] = [
        Category::Camera,
        Category::Audio,
        Category::Light,
        Category::Texture,
        Category::Font,
        Category::Mesh,
        Category::Model,
        Category::Reflection,
        Category::Skybox,
        Category::Constraint,
        Category::Scene,
    ];

    /// Lowercase name, also the first word of host object names
    pub fn label(self) -> &'static str {
        match self {
            Category::Camera => "camera",
            Category::Audio => "audio",
            Category::Light => "light",
            Category::Texture => "texture",
            Category::Font => "font",
            Category::Mesh => "mesh",
            Category::Model => "model",
            Category::Reflection => "reflection",
            Category::Skybox => "skybox",
            Category::Constraint => "constraint",
            Category::Scene => "scene",
        }
    }

    /// Host name prefix, e.g. `mesh-`
    pub fn prefix(self) -> String {
        format!("{}-", self.label())
    }

    /// Group name used in the companion constant files
    pub fn group_name(self) -> &'static str {
        match self {
            Category::Camera => "Camera",
            Category::Audio => "Audio",
            Category::Light => "Light",
            Category::Texture => "Texture",
            Category::Font => "Font",
            Category::Mesh => "Mesh",
            Category::Model => "Model",
            Category::Reflection => "Reflection",
            Category::Skybox => "Skybox",
            Category::Constraint => "Constraint",
            Category::Scene => "Scene",
        }
    }

    /// How the registry treats repeated or copied entities of this category
    pub fn policy(self) -> AliasPolicy {
        match self {
            Category::Audio | Category::Texture | Category::Font => AliasPolicy::ContentSharesId,
            Category::Mesh => AliasPolicy::CopySharesId,
            _ => AliasPolicy::Exclusive,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category plus the subtype byte written at the start of the body
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CategoryTag {
    pub category: Category,
    pub subtype: u8,
}

impl CategoryTag {
    pub const CAMERA_PERSPECTIVE: Self = Self::new(Category::Camera, 1);
    pub const CAMERA_ORTHOGRAPHIC: Self = Self::new(Category::Camera, 2);

    pub const AUDIO_MUSIC: Self = Self::new(Category::Audio, 1);
    pub const AUDIO_OBJECT: Self = Self::new(Category::Audio, 2);

    pub const LIGHT_CONE: Self = Self::new(Category::Light, 1);
    pub const LIGHT_DIRECTIONAL: Self = Self::new(Category::Light, 2);
    pub const LIGHT_POINT: Self = Self::new(Category::Light, 3);

    pub const TEXTURE_2D: Self = Self::new(Category::Texture, 1);
    pub const TEXTURE_3D: Self = Self::new(Category::Texture, 2);
    pub const TEXTURE_CUBE: Self = Self::new(Category::Texture, 3);

    pub const FONT_2D: Self = Self::new(Category::Font, 1);
    pub const FONT_3D: Self = Self::new(Category::Font, 2);

    pub const MESH_BASIC: Self = Self::new(Category::Mesh, 1);

    pub const MODEL_DYNAMIC: Self = Self::new(Category::Model, 1);
    pub const MODEL_STATIC: Self = Self::new(Category::Model, 2);
    pub const MODEL_WIDGET: Self = Self::new(Category::Model, 3);

    pub const REFLECTION_BAKED: Self = Self::new(Category::Reflection, 1);
    pub const REFLECTION_RUNTIME: Self = Self::new(Category::Reflection, 2);

    pub const SKYBOX_CUBE: Self = Self::new(Category::Skybox, 1);
    pub const SKYBOX_EQUIRECTANGULAR: Self = Self::new(Category::Skybox, 2);

    pub const CONSTRAINT_PLACER: Self = Self::new(Category::Constraint, 1);
    pub const CONSTRAINT_TRACKER: Self = Self::new(Category::Constraint, 2);
    pub const CONSTRAINT_SPRING: Self = Self::new(Category::Constraint, 3);
    pub const CONSTRAINT_SPRING_JOINT: Self = Self::new(Category::Constraint, 4);

    pub const SCENE_GAME: Self = Self::new(Category::Scene, 1);
    pub const SCENE_UI: Self = Self::new(Category::Scene, 2);

    pub const fn new(category: Category, subtype: u8) -> Self {
        Self { category, subtype }
    }
}

/// Widget kind written after the subtype of widget models
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum WidgetKind {
    Button = 1,
    Edit = 2,
    Text = 3,
}

impl WidgetKind {
    /// Whether the widget carries text, a font and a text material
    pub fn has_text(self) -> bool {
        matches!(self, WidgetKind::Edit | WidgetKind::Text)
    }
}
