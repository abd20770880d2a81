//! Scene documents
//!
//! A [`SceneDocument`] is the host-side description of everything the exporter
//! can see: scenes, objects with their hierarchy and data, images, fonts and
//! materials. Documents are stored as RON files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use gx3d_math::mat4::IDENTITY;
use gx3d_math::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the walker reads from the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    pub scenes: Vec<SceneEntry>,
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
    #[serde(default)]
    pub materials: Vec<MaterialEntry>,
    /// Directory relative file paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntry {
    pub name: String,
    /// Names of the objects linked into this scene
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// World matrix, column-major
    #[serde(default = "identity")]
    pub matrix_world: Mat4,
    /// Custom float properties
    #[serde(default)]
    pub properties: BTreeMap<String, f32>,
    /// Material names, one per slot
    #[serde(default)]
    pub material_slots: Vec<String>,
    #[serde(default)]
    pub data: ObjectData,
}

fn identity() -> Mat4 {
    IDENTITY
}

/// Type specific data of an object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum ObjectData {
    #[default]
    Empty,
    Mesh {
        positions: Vec<[f32; 3]>,
        /// Polygons as lists of corners
        polygons: Vec<Vec<Corner>>,
        /// Per-corner texture coordinates, one list per layer
        #[serde(default)]
        uv_layers: Vec<Vec<[f32; 2]>>,
    },
    Camera {
        projection: Projection,
        clip_start: f32,
        clip_end: f32,
    },
    Light {
        kind: LightKind,
        color: [f32; 3],
        energy: f32,
        #[serde(default)]
        shadow: bool,
    },
    Speaker {
        sound: Option<String>,
    },
    Text(TextData),
}

impl ObjectData {
    /// Short name of the data kind, for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            ObjectData::Empty => "empty",
            ObjectData::Mesh { .. } => "mesh",
            ObjectData::Camera { .. } => "camera",
            ObjectData::Light { .. } => "light",
            ObjectData::Speaker { .. } => "speaker",
            ObjectData::Text(_) => "text",
        }
    }
}

/// One polygon corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    /// Index into the mesh positions
    pub vertex: u32,
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent_sign: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Horizontal field of view in radians
    Perspective { angle_x: f32 },
    Orthographic { scale: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Sun,
    Point,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignX {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignY {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextData {
    pub body: String,
    /// Font entry name
    pub font: Option<String>,
    pub align_x: AlignX,
    pub align_y: AlignY,
    #[serde(default = "one")]
    pub space_character: f32,
    #[serde(default = "one")]
    pub space_word: f32,
    #[serde(default = "one")]
    pub space_line: f32,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    pub name: String,
    pub path: String,
    /// Width and height in pixels
    #[serde(default)]
    pub size: [u16; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMethod {
    #[default]
    Opaque,
    Clip,
    Hashed,
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowMethod {
    None,
    #[default]
    Opaque,
    Clip,
    Hashed,
}

/// A material input: a constant or an image entry name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Input<T> {
    Value(T),
    Image(String),
}

/// Inputs of the principled surface node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principled {
    #[serde(default = "white")]
    pub base_color: Input<[f32; 4]>,
    #[serde(default = "opaque")]
    pub alpha: Input<f32>,
    #[serde(default = "black")]
    pub emission: Input<[f32; 3]>,
    #[serde(default = "zero")]
    pub metallic: Input<f32>,
    #[serde(default = "half")]
    pub roughness: Input<f32>,
    /// Normal map image name
    #[serde(default)]
    pub normal: Option<String>,
}

impl Default for Principled {
    fn default() -> Self {
        Self {
            base_color: white(),
            alpha: opaque(),
            emission: black(),
            metallic: zero(),
            roughness: half(),
            normal: None,
        }
    }
}

fn white() -> Input<[f32; 4]> {
    Input::Value([1.0; 4])
}

fn opaque() -> Input<f32> {
    Input::Value(1.0)
}

fn black() -> Input<[f32; 3]> {
    Input::Value([0.0; 3])
}

fn zero() -> Input<f32> {
    Input::Value(0.0)
}

fn half() -> Input<f32> {
    Input::Value(0.5)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialEntry {
    /// Prefixed `pbr-` or `unlit-`
    pub name: String,
    #[serde(default = "enabled")]
    pub backface_culling: bool,
    #[serde(default)]
    pub blend_method: BlendMethod,
    #[serde(default)]
    pub shadow_method: ShadowMethod,
    #[serde(default = "threshold")]
    pub alpha_threshold: f32,
    #[serde(default)]
    pub principled: Option<Principled>,
    #[serde(default)]
    pub realtime_reflection: bool,
}

fn enabled() -> bool {
    true
}

fn threshold() -> f32 {
    0.5
}

impl SceneDocument {
    /// Load a document from a RON file; relative paths resolve next to it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_ron(&contents, base_dir)
    }

    /// Parse a document from RON text
    pub fn from_ron(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let mut document: SceneDocument = ron::from_str(contents)?;
        document.base_dir = base_dir.into();
        Ok(document)
    }

    /// Save the document to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        let pretty = ron::ser::PrettyConfig::new()
            .struct_names(true)
            .enumerate_arrays(false);
        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Absolute form of a host file path
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path.trim());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn object(&self, name: &str) -> Option<&ObjectEntry> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Direct children of `name`, in document order
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ObjectEntry> + 'a {
        self.objects
            .iter()
            .filter(move |o| o.parent.as_deref() == Some(name))
    }

    pub fn image(&self, name: &str) -> Option<&ImageEntry> {
        self.images.iter().find(|i| i.name == name)
    }

    pub fn font(&self, name: &str) -> Option<&FontEntry> {
        self.fonts.iter().find(|f| f.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&MaterialEntry> {
        self.materials.iter().find(|m| m.name == name)
    }
}

/// Error loading or saving a scene document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Parse error (invalid RON syntax)
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_DOCUMENT: &str = r#"
SceneDocument(
    scenes: [
        SceneEntry(name: "scene-game-level", objects: ["camera-perspective-main", "model-static-rock"]),
    ],
    objects: [
        ObjectEntry(
            name: "camera-perspective-main",
            matrix_world: (
                (1.0, 0.0, 0.0, 0.0),
                (0.0, 1.0, 0.0, 0.0),
                (0.0, 0.0, 1.0, 0.0),
                (0.0, 2.0, 5.0, 1.0),
            ),
            data: Camera(
                projection: Perspective(angle_x: 0.9),
                clip_start: 0.1,
                clip_end: 100.0,
            ),
        ),
        ObjectEntry(name: "model-static-rock"),
        ObjectEntry(
            name: "mesh-basic-rock.001",
            parent: Some("model-static-rock"),
            material_slots: ["unlit-stone"],
            properties: {"radius": 2.0},
        ),
    ],
    images: [
        ImageEntry(name: "texture-2d-stone", path: "stone.png", size: (4, 4)),
    ],
    materials: [
        MaterialEntry(
            name: "unlit-stone",
            blend_method: Clip,
            shadow_method: None,
            principled: Some(Principled(base_color: Image("texture-2d-stone"))),
        ),
    ],
)
"#;

    #[test]
    fn test_parse_document() {
        let doc = SceneDocument::from_ron(SMALL_DOCUMENT, "/levels").unwrap();
        assert_eq!(doc.scenes.len(), 1);
        assert_eq!(doc.objects.len(), 3);
        assert_eq!(doc.base_dir, PathBuf::from("/levels"));

        let camera = doc.object("camera-perspective-main").unwrap();
        assert_eq!(camera.matrix_world[3], [0.0, 2.0, 5.0, 1.0]);
        match &camera.data {
            ObjectData::Camera { projection, clip_end, .. } => {
                assert_eq!(*projection, Projection::Perspective { angle_x: 0.9 });
                assert_eq!(*clip_end, 100.0);
            }
            other => panic!("Expected camera data, got {:?}", other),
        }

        let model = doc.object("model-static-rock").unwrap();
        assert_eq!(model.matrix_world, IDENTITY);
        assert_eq!(model.data.kind_name(), "empty");

        let children: Vec<_> = doc.children("model-static-rock").map(|o| o.name.as_str()).collect();
        assert_eq!(children, vec!["mesh-basic-rock.001"]);
        assert_eq!(doc.objects[2].properties["radius"], 2.0);
    }

    #[test]
    fn test_material_defaults() {
        let doc = SceneDocument::from_ron(SMALL_DOCUMENT, "").unwrap();
        let mat = doc.material("unlit-stone").unwrap();
        assert!(mat.backface_culling);
        assert_eq!(mat.alpha_threshold, 0.5);
        assert_eq!(mat.shadow_method, ShadowMethod::None);
        let principled = mat.principled.as_ref().unwrap();
        assert_eq!(principled.base_color, Input::Image("texture-2d-stone".to_string()));
        assert_eq!(principled.alpha, Input::Value(1.0));
        assert_eq!(principled.roughness, Input::Value(0.5));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let doc = SceneDocument {
            base_dir: PathBuf::from("/levels/one"),
            ..Default::default()
        };
        assert_eq!(doc.resolve("sky.hdr"), PathBuf::from("/levels/one/sky.hdr"));
        assert_eq!(doc.resolve(" /assets/a.ogg "), PathBuf::from("/assets/a.ogg"));
    }

    #[test]
    fn test_parse_error() {
        let result = SceneDocument::from_ron("SceneDocument(scenes: [", "");
        assert!(matches!(result, Err(DocumentError::Parse(_))));
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.ron");
        let doc = SceneDocument::from_ron(SMALL_DOCUMENT, "").unwrap();
        doc.save(&path).unwrap();

        let loaded = SceneDocument::load(&path).unwrap();
        assert_eq!(loaded.base_dir, dir.path());
        assert_eq!(loaded.objects.len(), 3);
        assert_eq!(loaded.images[0].size, [4, 4]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SceneDocument::load("/nonexistent/level.ron");
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }
}
