//! Host naming grammar
//!
//! Names follow `<category>-<subtype>-<free text>` with an optional `.NNN`
//! suffix marking a positional copy. Classification is a single ordered scan of
//! [`PREFIX_TABLE`]; the first matching prefix wins, so longer prefixes that
//! share a stem with shorter ones are listed first.

use crate::category::{CategoryTag, WidgetKind};
use crate::error::{ExportError, Result};

/// Ordered `(prefix, tag)` pairs consulted by [`classify`]
pub const PREFIX_TABLE: &[(&str, CategoryTag)] = &[
    ("camera-perspective-", CategoryTag::CAMERA_PERSPECTIVE),
    ("camera-orthographic-", CategoryTag::CAMERA_ORTHOGRAPHIC),
    ("audio-music-", CategoryTag::AUDIO_MUSIC),
    ("audio-object-", CategoryTag::AUDIO_OBJECT),
    ("light-cone-", CategoryTag::LIGHT_CONE),
    ("light-directional-", CategoryTag::LIGHT_DIRECTIONAL),
    ("light-point-", CategoryTag::LIGHT_POINT),
    ("texture-2d-", CategoryTag::TEXTURE_2D),
    ("texture-3d-", CategoryTag::TEXTURE_3D),
    ("texture-cube-", CategoryTag::TEXTURE_CUBE),
    ("font-2d-", CategoryTag::FONT_2D),
    ("font-3d-", CategoryTag::FONT_3D),
    ("mesh-basic-", CategoryTag::MESH_BASIC),
    ("model-dynamic-", CategoryTag::MODEL_DYNAMIC),
    ("model-static-", CategoryTag::MODEL_STATIC),
    ("model-widget-", CategoryTag::MODEL_WIDGET),
    ("reflection-baked-", CategoryTag::REFLECTION_BAKED),
    ("reflection-runtime-", CategoryTag::REFLECTION_RUNTIME),
    ("skybox-cube-", CategoryTag::SKYBOX_CUBE),
    ("skybox-equirectangular-", CategoryTag::SKYBOX_EQUIRECTANGULAR),
    ("constraint-placer-", CategoryTag::CONSTRAINT_PLACER),
    ("constraint-tracker-", CategoryTag::CONSTRAINT_TRACKER),
    ("constraint-spring-joint-", CategoryTag::CONSTRAINT_SPRING_JOINT),
    ("constraint-spring-", CategoryTag::CONSTRAINT_SPRING),
    ("scene-game-", CategoryTag::SCENE_GAME),
    ("scene-ui-", CategoryTag::SCENE_UI),
];

const WIDGET_PREFIXES: &[(&str, WidgetKind)] = &[
    ("model-widget-button-", WidgetKind::Button),
    ("model-widget-edit-", WidgetKind::Edit),
    ("model-widget-text-", WidgetKind::Text),
];

/// Category and subtype selected by the name prefix
pub fn classify(name: &str) -> Option<CategoryTag> {
    PREFIX_TABLE
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|&(_, tag)| tag)
}

/// Widget kind of a `model-widget-` name
pub fn widget_kind(name: &str) -> Option<WidgetKind> {
    WIDGET_PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|&(_, kind)| kind)
}

/// Origin of a positional copy
///
/// `mesh-basic-A.001` yields `Some("mesh-basic-A")`, a name without a dot yields
/// `None`. More than one dot or a non-numeric suffix is malformed.
pub fn origin_name(name: &str) -> Result<Option<&str>> {
    let trimmed = name.trim();
    let mut parts = trimmed.split('.');
    let base = parts.next().unwrap_or_default();
    let suffix = match parts.next() {
        None => return Ok(None),
        Some(s) => s,
    };
    if parts.next().is_some() {
        return Err(ExportError::malformed(name, "more than one '.' in name"));
    }
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExportError::malformed(name, "copy suffix must be numeric"));
    }
    Ok(Some(base))
}

/// Name written into the table: the host name without category and subtype
///
/// `mesh-basic-rock.001` becomes `rock.001`.
pub fn reference_name(name: &str) -> &str {
    let rest = match name.find('-') {
        Some(i) => &name[i + 1..],
        None => return name,
    };
    match rest.find('-') {
        Some(i) => &rest[i + 1..],
        None => rest,
    }
}

/// Constant identifier for a host name: upper case, `_` for anything else
pub fn const_string(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Longest common prefix of constant names, cut back to an `_` boundary
///
/// The result always ends in `_` (or is empty) and never swallows a whole name.
/// Fewer than two names share no prefix.
pub fn common_prefix<S: AsRef<str>>(names: &[S]) -> String {
    if names.len() < 2 {
        return String::new();
    }
    let first = names[0].as_ref().as_bytes();
    let mut len = names[1..].iter().fold(first.len(), |len, n| {
        first
            .iter()
            .zip(n.as_ref().as_bytes())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count()
    });

    loop {
        len = first[..len]
            .iter()
            .rposition(|&b| b == b'_')
            .map_or(0, |i| i + 1);
        if len == 0 || names.iter().all(|n| n.as_ref().len() > len) {
            break;
        }
        len -= 1;
    }
    String::from_utf8_lossy(&first[..len]).into_owned()
}

/// Strip `prefix` from a constant name, keeping it a valid identifier
pub fn strip_constant(name: &str, prefix: &str) -> String {
    let rest = name.strip_prefix(prefix).unwrap_or(name);
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", rest)
    } else {
        rest.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    #[test]
    fn test_classify_first_match() {
        assert_eq!(classify("mesh-basic-rock"), Some(CategoryTag::MESH_BASIC));
        assert_eq!(classify("camera-orthographic-ui"), Some(CategoryTag::CAMERA_ORTHOGRAPHIC));
        assert_eq!(
            classify("constraint-spring-joint-a"),
            Some(CategoryTag::CONSTRAINT_SPRING_JOINT)
        );
        assert_eq!(classify("constraint-spring-a"), Some(CategoryTag::CONSTRAINT_SPRING));
        assert_eq!(classify("mesh-fancy-rock"), None);
        assert_eq!(classify("Cube"), None);
    }

    #[test]
    fn test_prefix_table_matches_category_labels() {
        for (prefix, tag) in PREFIX_TABLE {
            assert!(prefix.starts_with(&tag.category.prefix()));
        }
        assert!(PREFIX_TABLE
            .iter()
            .any(|(_, tag)| tag.category == Category::Reflection));
    }

    #[test]
    fn test_widget_kind() {
        assert_eq!(widget_kind("model-widget-text-score"), Some(WidgetKind::Text));
        assert_eq!(widget_kind("model-widget-slider-x"), None);
        assert_eq!(widget_kind("model-static-x"), None);
    }

    #[test]
    fn test_origin_name() {
        assert_eq!(origin_name("mesh-basic-A").unwrap(), None);
        assert_eq!(origin_name("mesh-basic-A.001").unwrap(), Some("mesh-basic-A"));
        assert!(origin_name("mesh-basic-A.x1").is_err());
        assert!(origin_name("mesh-basic-A.").is_err());
        assert!(origin_name("mesh-basic-A.001.002").is_err());
    }

    #[test]
    fn test_reference_name() {
        assert_eq!(reference_name("mesh-basic-rock.001"), "rock.001");
        assert_eq!(reference_name("model-widget-text-score"), "text-score");
        assert_eq!(reference_name("camera-x"), "x");
    }

    #[test]
    fn test_const_string() {
        assert_eq!(const_string("mesh-basic-rock.001"), "MESH_BASIC_ROCK_001");
        assert_eq!(const_string("a/b\\c"), "A_B_C");
    }

    #[test]
    fn test_common_prefix_backs_off_to_boundary() {
        let names = ["MESH_BASIC_ROCK", "MESH_BASIC_ROAD"];
        assert_eq!(common_prefix(&names[..]), "MESH_BASIC_");
    }

    #[test]
    fn test_common_prefix_never_empties_a_name() {
        let names = ["MODEL_A", "MODEL_A_B"];
        assert_eq!(common_prefix(&names[..]), "MODEL_");
        let names = ["X_", "X_Y"];
        assert_eq!(common_prefix(&names[..]), "");
    }

    #[test]
    fn test_common_prefix_single_name() {
        assert_eq!(common_prefix(&["MESH_BASIC_A"][..]), "");
    }

    #[test]
    fn test_strip_constant_leading_digit() {
        assert_eq!(strip_constant("TEXTURE_2D_GRASS", "TEXTURE_"), "_2D_GRASS");
        assert_eq!(strip_constant("MESH_BASIC_A", "MESH_BASIC_"), "A");
    }
}
