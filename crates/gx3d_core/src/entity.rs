//! Registered entities
//!
//! One concrete [`Entity`] shape covers every aliasing policy; the policy is
//! data on the [`Category`], not a subtype.

use crate::body::Body;
use crate::category::{Category, CategoryTag};
use crate::error::{ExportError, Result};
use crate::material::MaterialBody;

slotmap::new_key_type! {
    /// Key of an entity inside the registry
    pub struct EntityKey;
}

/// Container-wide entity id
pub type EntityId = u64;

/// How repeated or copied source objects of a category are treated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AliasPolicy {
    /// Every source object is its own entity; repeats are an error
    Exclusive,
    /// `name.NNN` objects share the id and body of `name`
    CopySharesId,
    /// Objects with the same source key share one id and body
    ContentSharesId,
}

/// Per-entity data that copies keep for themselves
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Placement {
    /// Material assigned to this particular object
    pub material: Option<MaterialBody>,
}

/// A serializable scene element
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub tag: CategoryTag,
    /// Host object name
    pub name: String,
    /// Key used to detect duplicates (the name, or a resolved file path)
    pub source_key: String,
    /// Body offset, set once by the body pass (never for aliases)
    pub offset: Option<u64>,
    /// Origin whose id and body this entity borrows
    pub alias_of: Option<EntityKey>,
    pub placement: Placement,
    pub(crate) body: Option<Body>,
}

impl Entity {
    #[inline]
    pub fn category(&self) -> Category {
        self.tag.category
    }

    #[inline]
    pub fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    /// Owned body; aliases have none and writing one is an error
    pub fn body(&self) -> Result<&Body> {
        self.body.as_ref().ok_or_else(|| ExportError::AliasBodyWrite {
            category: self.category(),
            name: self.name.clone(),
        })
    }
}

/// Result of a registration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityHandle {
    pub key: EntityKey,
    pub id: EntityId,
    pub tag: CategoryTag,
    /// True when the handle refers to an alias of an existing entity
    pub alias: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_entity() -> Entity {
        let mut keys = slotmap::SlotMap::<EntityKey, ()>::with_key();
        let origin = keys.insert(());
        Entity {
            id: 1024,
            tag: CategoryTag::MESH_BASIC,
            name: "mesh-basic-A.001".to_string(),
            source_key: "mesh-basic-A.001".to_string(),
            offset: None,
            alias_of: Some(origin),
            placement: Placement::default(),
            body: None,
        }
    }

    #[test]
    fn test_alias_has_no_body() {
        let e = alias_entity();
        assert!(e.is_alias());
        assert_eq!(e.category(), Category::Mesh);
        match e.body() {
            Err(ExportError::AliasBodyWrite { category, name }) => {
                assert_eq!(category, Category::Mesh);
                assert_eq!(name, "mesh-basic-A.001");
            }
            other => panic!("Expected AliasBodyWrite, got {:?}", other),
        }
    }
}
