//! Companion constant files
//!
//! A convenience export mapping every entity name to its id, one group per
//! category plus a final group listing the shader variants. Not needed to parse
//! the container.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{ExportError, Result};
use crate::naming::{common_prefix, const_string, strip_constant};
use crate::registry::Registry;
use crate::shader::{ShaderVariant, VariantTable};

/// Target language of the companion file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantsLanguage {
    #[default]
    Cpp,
    Rust,
    /// No companion file
    None,
}

impl ConstantsLanguage {
    /// Companion path next to the container, `None` when disabled
    ///
    /// `level.gx3d` gets `level.gx3d.hpp` (C++) or `level_gx3d.rs` (Rust).
    pub fn companion_path(self, container: &Path) -> Option<PathBuf> {
        let file_name = container.file_name()?.to_string_lossy().into_owned();
        match self {
            ConstantsLanguage::Cpp => Some(container.with_file_name(format!("{}.hpp", file_name))),
            ConstantsLanguage::Rust => {
                Some(container.with_file_name(format!("{}.rs", file_name.replace('.', "_"))))
            }
            ConstantsLanguage::None => None,
        }
    }
}

/// One named group of constants
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantGroup {
    pub name: String,
    pub constants: Vec<(String, u64)>,
}

/// Build the per-category groups
///
/// Fails with [`ExportError::DuplicateIdentity`] when two entities of a category
/// end up with the same constant once the common prefix is stripped.
pub fn category_groups(registry: &Registry) -> Result<Vec<ConstantGroup>> {
    let mut groups = Vec::with_capacity(Category::SCHEMA.len());
    for category in Category::SCHEMA {
        let entities: Vec<_> = registry
            .members(category)
            .into_iter()
            .filter_map(|k| registry.get(k))
            .collect();

        let names: Vec<String> = entities.iter().map(|e| const_string(&e.name)).collect();
        let prefix = common_prefix(names.as_slice());
        let mut seen = HashSet::with_capacity(names.len());
        let mut constants = Vec::with_capacity(names.len());
        for (name, e) in names.iter().zip(&entities) {
            let constant = strip_constant(name, &prefix);
            if !seen.insert(constant.clone()) {
                return Err(ExportError::DuplicateIdentity {
                    category,
                    key: constant,
                });
            }
            constants.push((constant, e.id));
        }
        groups.push(ConstantGroup {
            name: category.group_name().to_string(),
            constants,
        });
    }
    Ok(groups)
}

fn upper_snake(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for (i, c) in camel.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

/// Constant name of a shader variant, e.g. `DIRECTIONAL_D2_MATTE_NONREFLECTIVE_FULL_OPAQUE`
pub fn variant_name(variant: &ShaderVariant) -> String {
    match variant {
        ShaderVariant::Reserved(r) => upper_snake(&format!("{:?}", r)),
        ShaderVariant::Combined(d) => [
            upper_snake(&format!("{:?}", d.lighting)),
            upper_snake(&format!("{:?}", d.texturing)),
            upper_snake(&format!("{:?}", d.specular)),
            upper_snake(&format!("{:?}", d.environment)),
            upper_snake(&format!("{:?}", d.shadowing)),
            upper_snake(&format!("{:?}", d.transparency)),
        ]
        .join("_"),
    }
}

/// Group listing every registered variant code
pub fn variant_group(variants: &VariantTable) -> ConstantGroup {
    ConstantGroup {
        name: "ShaderVariant".to_string(),
        constants: variants.iter().map(|(code, v)| (variant_name(v), code)).collect(),
    }
}

/// Render groups as source text
pub fn render(language: ConstantsLanguage, groups: &[ConstantGroup]) -> Option<String> {
    let mut out = String::new();
    match language {
        ConstantsLanguage::None => return None,
        ConstantsLanguage::Cpp => {
            out.push_str("#pragma once\n#include <cstdint>\n\n");
            for g in groups {
                out.push_str(&format!("namespace {}\n{{\n", g.name));
                for (name, id) in &g.constants {
                    out.push_str(&format!("    const std::uint64_t {} = {};\n", name, id));
                }
                out.push_str("}\n\n");
            }
        }
        ConstantsLanguage::Rust => {
            out.push_str("#![allow(dead_code)]\n\n");
            for g in groups {
                out.push_str(&format!("pub mod {} {{\n", upper_snake(&g.name).to_lowercase()));
                for (name, id) in &g.constants {
                    out.push_str(&format!("    pub const {}: u64 = {};\n", name, id));
                }
                out.push_str("}\n\n");
            }
        }
    }
    Some(out)
}

/// Full companion file for one export
pub fn companion_source(
    language: ConstantsLanguage,
    registry: &Registry,
    variants: &VariantTable,
) -> Result<Option<String>> {
    if language == ConstantsLanguage::None {
        return Ok(None);
    }
    let mut groups = category_groups(registry)?;
    groups.push(variant_group(variants));
    Ok(render(language, &groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, CameraBody};
    use crate::category::CategoryTag;
    use crate::registry::Registration;
    use crate::shader::{Lighting, ReservedVariant, VariantDescriptor};

    fn camera(reg: &mut Registry, name: &str) {
        reg.register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, name), |_| {
            Ok(Body::Camera(CameraBody::default()))
        })
        .unwrap();
    }

    #[test]
    fn test_common_prefix_stripped() {
        let mut reg = Registry::default();
        camera(&mut reg, "camera-perspective-main");
        camera(&mut reg, "camera-perspective-map");
        let groups = category_groups(&reg).unwrap();
        let cameras = &groups[0];
        assert_eq!(cameras.name, "Camera");
        assert_eq!(
            cameras.constants,
            vec![("MAIN".to_string(), 1024), ("MAP".to_string(), 1025)]
        );
        assert_eq!(groups.len(), Category::SCHEMA.len());
    }

    #[test]
    fn test_duplicate_constant_name() {
        let mut reg = Registry::default();
        camera(&mut reg, "camera-perspective-a.b");
        camera(&mut reg, "camera-perspective-a-b");
        assert!(matches!(
            category_groups(&reg),
            Err(ExportError::DuplicateIdentity { category: Category::Camera, .. })
        ));
    }

    #[test]
    fn test_stripped_names_must_stay_distinct() {
        let mut reg = Registry::default();
        camera(&mut reg, "camera-perspective-x-1");
        camera(&mut reg, "camera-perspective-x--1");
        match category_groups(&reg) {
            Err(ExportError::DuplicateIdentity { category, key }) => {
                assert_eq!(category, Category::Camera);
                assert_eq!(key, "_1");
            }
            other => panic!("Expected DuplicateIdentity, got {:?}", other),
        }
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(
            variant_name(&ShaderVariant::Reserved(ReservedVariant::ShadowMapperCutoff)),
            "SHADOW_MAPPER_CUTOFF"
        );
        let v = ShaderVariant::Combined(VariantDescriptor {
            lighting: Lighting::Directional,
            ..Default::default()
        });
        assert_eq!(variant_name(&v), "DIRECTIONAL_COLORED_MATTE_NONREFLECTIVE_SHADELESS_OPAQUE");
    }

    #[test]
    fn test_render_cpp() {
        let groups = vec![ConstantGroup {
            name: "Mesh".to_string(),
            constants: vec![("ROCK".to_string(), 1030)],
        }];
        let text = render(ConstantsLanguage::Cpp, &groups).unwrap();
        assert!(text.contains("namespace Mesh\n{\n    const std::uint64_t ROCK = 1030;\n}\n"));
    }

    #[test]
    fn test_render_rust() {
        let groups = vec![ConstantGroup {
            name: "ShaderVariant".to_string(),
            constants: vec![("SHADOW_MAPPER".to_string(), 0)],
        }];
        let text = render(ConstantsLanguage::Rust, &groups).unwrap();
        assert!(text.contains("pub mod shader_variant {\n    pub const SHADOW_MAPPER: u64 = 0;\n}\n"));
        assert!(render(ConstantsLanguage::None, &groups).is_none());
    }

    #[test]
    fn test_companion_paths() {
        let p = Path::new("/out/level.gx3d");
        assert_eq!(
            ConstantsLanguage::Cpp.companion_path(p),
            Some(PathBuf::from("/out/level.gx3d.hpp"))
        );
        assert_eq!(
            ConstantsLanguage::Rust.companion_path(p),
            Some(PathBuf::from("/out/level_gx3d.rs"))
        );
        assert_eq!(ConstantsLanguage::None.companion_path(p), None);
    }
}
