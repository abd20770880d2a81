//! Identity and deduplication registry
//!
//! Hands out container-wide ids from one monotonically increasing counter and
//! arbitrates the three aliasing policies:
//!
//! - exclusive categories reject a repeated source key,
//! - copy-sharing categories let `name.NNN` borrow the id and body of `name`,
//! - content-sharing categories collapse objects with the same source key.
//!
//! Aliases always point at an origin, never at another alias.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::body::Body;
use crate::category::{Category, CategoryTag};
use crate::entity::{AliasPolicy, Entity, EntityHandle, EntityId, EntityKey, Placement};
use crate::error::{ExportError, Result};

/// Lowest id handed out by default; ids below are left to built-ins
pub const DEFAULT_FIRST_ID: EntityId = 1024;

/// Everything the registry needs to know about one discovered object
#[derive(Clone, Debug)]
pub struct Registration<'a> {
    pub tag: CategoryTag,
    /// Host object name
    pub name: &'a str,
    /// Duplicate-detection key (the name, or a resolved file path)
    pub source_key: &'a str,
    /// Host name of the origin when this object is a positional copy
    pub copy_of: Option<&'a str>,
    pub placement: Placement,
}

impl<'a> Registration<'a> {
    /// Object keyed by its own name
    pub fn named(tag: CategoryTag, name: &'a str) -> Self {
        Self {
            tag,
            name,
            source_key: name,
            copy_of: None,
            placement: Placement::default(),
        }
    }

    /// Object keyed by content, e.g. a resolved file path
    pub fn keyed(tag: CategoryTag, name: &'a str, source_key: &'a str) -> Self {
        Self {
            source_key,
            ..Self::named(tag, name)
        }
    }

    /// Positional copy of `origin`
    pub fn copy(tag: CategoryTag, name: &'a str, origin: &'a str) -> Self {
        Self {
            copy_of: Some(origin),
            ..Self::named(tag, name)
        }
    }

    /// Attach per-object placement data
    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// All entities of one export run
pub struct Registry {
    entities: SlotMap<EntityKey, Entity>,
    /// `(category, source key)` of every entity that owns or claims a key
    by_key: HashMap<(Category, String), EntityKey>,
    /// `(category, host name)` of every entity
    by_name: HashMap<(Category, String), EntityKey>,
    next_id: EntityId,
    first_id: EntityId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_ID)
    }
}

impl Registry {
    /// Empty registry whose first id is `first_id`
    pub fn new(first_id: EntityId) -> Self {
        Self {
            entities: SlotMap::with_key(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
            next_id: first_id,
            first_id,
        }
    }

    /// Next id that would be handed out (the container watermark)
    #[inline]
    pub fn next_id(&self) -> EntityId {
        self.next_id
    }

    #[inline]
    pub fn first_id(&self) -> EntityId {
        self.first_id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Register a discovered object
    ///
    /// `construct` is called with the freshly allocated id only when a new
    /// owning entity is created; alias resolutions never call it. The counter
    /// advances after `construct` succeeds.
    pub fn register<F>(&mut self, reg: Registration<'_>, construct: F) -> Result<EntityHandle>
    where
        F: FnOnce(EntityId) -> Result<Body>,
    {
        let category = reg.tag.category;
        let policy = category.policy();

        if let Some(origin) = reg.copy_of {
            return self.register_copy(reg, origin);
        }

        if let Some(&existing) = self.by_key.get(&(category, reg.source_key.to_string())) {
            if policy != AliasPolicy::ContentSharesId {
                return Err(ExportError::DuplicateIdentity {
                    category,
                    key: reg.source_key.to_string(),
                });
            }
            return self.register_content_alias(reg, existing);
        }

        if self.by_name.contains_key(&(category, reg.name.to_string())) {
            return Err(ExportError::DuplicateIdentity {
                category,
                key: reg.name.to_string(),
            });
        }

        let id = self.next_id;
        let body = construct(id)?;
        self.next_id += 1;

        let key = self.entities.insert(Entity {
            id,
            tag: reg.tag,
            name: reg.name.to_string(),
            source_key: reg.source_key.to_string(),
            offset: None,
            alias_of: None,
            placement: reg.placement,
            body: Some(body),
        });
        self.by_key.insert((category, reg.source_key.to_string()), key);
        self.by_name.insert((category, reg.name.to_string()), key);
        log::debug!("{} '{}' registered with id {}", category, reg.name, id);

        Ok(EntityHandle { key, id, tag: reg.tag, alias: false })
    }

    fn register_copy(&mut self, reg: Registration<'_>, origin: &str) -> Result<EntityHandle> {
        let category = reg.tag.category;
        if category.policy() != AliasPolicy::CopySharesId {
            return Err(ExportError::malformed(
                reg.name,
                format!("{} objects cannot be positional copies", category),
            ));
        }
        if self.by_name.contains_key(&(category, reg.name.to_string())) {
            return Err(ExportError::DuplicateIdentity {
                category,
                key: reg.name.to_string(),
            });
        }

        let origin_key = self
            .by_name
            .get(&(category, origin.to_string()))
            .copied()
            .ok_or_else(|| ExportError::UnresolvedOrigin {
                category,
                name: reg.name.to_string(),
                origin: origin.to_string(),
            })?;
        let root = self.root_of(origin_key);
        let (id, tag) = (self.entities[root].id, self.entities[root].tag);

        let key = self.entities.insert(Entity {
            id,
            tag,
            name: reg.name.to_string(),
            source_key: reg.source_key.to_string(),
            offset: None,
            alias_of: Some(root),
            placement: reg.placement,
            body: None,
        });
        self.by_key.insert((category, reg.source_key.to_string()), key);
        self.by_name.insert((category, reg.name.to_string()), key);
        log::debug!("{} '{}' is a copy of '{}' sharing id {}", category, reg.name, origin, id);

        Ok(EntityHandle { key, id, tag, alias: true })
    }

    fn register_content_alias(
        &mut self,
        reg: Registration<'_>,
        existing: EntityKey,
    ) -> Result<EntityHandle> {
        let category = reg.tag.category;
        let root = self.root_of(existing);
        let (id, tag) = (self.entities[root].id, self.entities[root].tag);

        if let Some(&named) = self.by_name.get(&(category, reg.name.to_string())) {
            if self.root_of(named) != root {
                return Err(ExportError::DuplicateIdentity {
                    category,
                    key: reg.name.to_string(),
                });
            }
            return Ok(EntityHandle { key: named, id, tag, alias: named != root });
        }

        let key = self.entities.insert(Entity {
            id,
            tag,
            name: reg.name.to_string(),
            source_key: reg.source_key.to_string(),
            offset: None,
            alias_of: Some(root),
            placement: reg.placement,
            body: None,
        });
        self.by_name.insert((category, reg.name.to_string()), key);
        log::debug!(
            "{} '{}' shares content '{}' with id {}",
            category,
            reg.name,
            reg.source_key,
            id
        );

        Ok(EntityHandle { key, id, tag, alias: true })
    }

    fn root_of(&self, key: EntityKey) -> EntityKey {
        self.entities[key].alias_of.unwrap_or(key)
    }

    /// Entity registered under `(category, host name)`
    pub fn lookup(&self, category: Category, name: &str) -> Option<EntityHandle> {
        let key = *self.by_name.get(&(category, name.to_string()))?;
        let e = &self.entities[key];
        Some(EntityHandle { key, id: e.id, tag: e.tag, alias: e.is_alias() })
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Origin of an alias, or the entity itself
    pub fn origin(&self, key: EntityKey) -> Option<&Entity> {
        let e = self.entities.get(key)?;
        match e.alias_of {
            Some(origin) => self.entities.get(origin),
            None => Some(e),
        }
    }

    /// Record where the body of a non-alias entity starts
    pub fn set_offset(&mut self, key: EntityKey, offset: u64) -> Result<()> {
        let e = self
            .entities
            .get_mut(key)
            .ok_or_else(|| ExportError::Format("unknown entity key".to_string()))?;
        if e.is_alias() {
            return Err(ExportError::AliasBodyWrite {
                category: e.category(),
                name: e.name.clone(),
            });
        }
        e.offset = Some(offset);
        Ok(())
    }

    /// Own offset of an origin, the origin's offset for an alias
    pub fn resolved_offset(&self, key: EntityKey) -> Option<u64> {
        self.origin(key)?.offset
    }

    /// Every entity of a category ordered by id, origins before their aliases
    pub fn members(&self, category: Category) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(_, e)| e.category() == category)
            .map(|(k, _)| k)
            .collect();
        keys.sort_by(|&a, &b| {
            let (ea, eb) = (&self.entities[a], &self.entities[b]);
            (ea.id, ea.is_alias(), &ea.name).cmp(&(eb.id, eb.is_alias(), &eb.name))
        });
        keys
    }

    /// Entities of a category that get a table row
    ///
    /// Content-sharing categories list one row per source key, so their aliases
    /// are left out; every other category lists aliases too.
    pub fn table_members(&self, category: Category) -> Vec<EntityKey> {
        let mut keys = self.members(category);
        if category.policy() == AliasPolicy::ContentSharesId {
            keys.retain(|&k| !self.entities[k].is_alias());
        }
        keys
    }

    /// Non-alias entities of a category ordered by id
    pub fn origins(&self, category: Category) -> Vec<EntityKey> {
        let mut keys = self.members(category);
        keys.retain(|&k| !self.entities[k].is_alias());
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> + '_ {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, CameraBody};

    fn camera_body() -> Result<Body> {
        Ok(Body::Camera(CameraBody::default()))
    }

    fn no_body() -> Result<Body> {
        panic!("constructor must not run for aliases")
    }

    #[test]
    fn test_ids_start_at_base_and_increase() {
        let mut reg = Registry::default();
        let a = reg
            .register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, "camera-perspective-a"), |_| camera_body())
            .unwrap();
        let b = reg
            .register(Registration::named(CategoryTag::LIGHT_POINT, "light-point-b"), |_| {
                Ok(Body::Light(Default::default()))
            })
            .unwrap();
        assert_eq!(a.id, DEFAULT_FIRST_ID);
        assert_eq!(b.id, DEFAULT_FIRST_ID + 1);
        assert_eq!(reg.next_id(), DEFAULT_FIRST_ID + 2);
        assert!(!a.alias);
    }

    #[test]
    fn test_constructor_receives_id() {
        let mut reg = Registry::new(7);
        let mut seen = None;
        reg.register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, "camera-perspective-a"), |id| {
            seen = Some(id);
            camera_body()
        })
        .unwrap();
        assert_eq!(seen, Some(7));
    }

    #[test]
    fn test_failed_constructor_does_not_advance_counter() {
        let mut reg = Registry::default();
        let err = reg
            .register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, "camera-perspective-a"), |_| {
                Err(ExportError::malformed("camera-perspective-a", "bad"))
            })
            .unwrap_err();
        assert!(matches!(err, ExportError::MalformedSourceData { .. }));
        assert_eq!(reg.next_id(), DEFAULT_FIRST_ID);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_exclusive_duplicate_is_error() {
        let mut reg = Registry::default();
        let r = Registration::named(CategoryTag::CAMERA_PERSPECTIVE, "camera-perspective-a");
        reg.register(r.clone(), |_| camera_body()).unwrap();
        let err = reg.register(r, |_| camera_body()).unwrap_err();
        match err {
            ExportError::DuplicateIdentity { category, key } => {
                assert_eq!(category, Category::Camera);
                assert_eq!(key, "camera-perspective-a");
            }
            other => panic!("Expected DuplicateIdentity, got {:?}", other),
        }
        assert_eq!(reg.next_id(), DEFAULT_FIRST_ID + 1);
    }

    #[test]
    fn test_same_name_in_different_categories() {
        let mut reg = Registry::default();
        reg.register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, "x"), |_| camera_body())
            .unwrap();
        let h = reg
            .register(Registration::named(CategoryTag::LIGHT_POINT, "x"), |_| {
                Ok(Body::Light(Default::default()))
            })
            .unwrap();
        assert_eq!(h.id, DEFAULT_FIRST_ID + 1);
    }

    #[test]
    fn test_copy_shares_id_and_skips_constructor() {
        let mut reg = Registry::default();
        let origin = reg
            .register(Registration::named(CategoryTag::MESH_BASIC, "mesh-basic-A"), |_| {
                Ok(Body::Mesh(Default::default()))
            })
            .unwrap();
        let copy = reg
            .register(Registration::copy(CategoryTag::MESH_BASIC, "mesh-basic-A.001", "mesh-basic-A"), |_| no_body())
            .unwrap();
        assert_eq!(copy.id, origin.id);
        assert!(copy.alias);
        assert_ne!(copy.key, origin.key);
        assert_eq!(reg.next_id(), DEFAULT_FIRST_ID + 1);
        assert_eq!(reg.get(copy.key).unwrap().alias_of, Some(origin.key));
    }

    #[test]
    fn test_copy_of_copy_points_at_origin() {
        let mut reg = Registry::default();
        let origin = reg
            .register(Registration::named(CategoryTag::MESH_BASIC, "mesh-basic-A"), |_| {
                Ok(Body::Mesh(Default::default()))
            })
            .unwrap();
        reg.register(Registration::copy(CategoryTag::MESH_BASIC, "mesh-basic-A.001", "mesh-basic-A"), |_| no_body())
            .unwrap();
        let second = reg
            .register(Registration::copy(CategoryTag::MESH_BASIC, "mesh-basic-A.002", "mesh-basic-A.001"), |_| no_body())
            .unwrap();
        let e = reg.get(second.key).unwrap();
        assert_eq!(e.alias_of, Some(origin.key));
        assert!(reg.get(origin.key).unwrap().alias_of.is_none());
    }

    #[test]
    fn test_copy_without_origin_is_unresolved() {
        let mut reg = Registry::default();
        let err = reg
            .register(Registration::copy(CategoryTag::MESH_BASIC, "mesh-basic-B.001", "mesh-basic-B"), |_| no_body())
            .unwrap_err();
        assert!(matches!(err, ExportError::UnresolvedOrigin { .. }));
    }

    #[test]
    fn test_copy_in_exclusive_category_is_malformed() {
        let mut reg = Registry::default();
        reg.register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, "camera-perspective-a"), |_| camera_body())
            .unwrap();
        let err = reg
            .register(
                Registration::copy(CategoryTag::CAMERA_PERSPECTIVE, "camera-perspective-a.001", "camera-perspective-a"),
                |_| no_body(),
            )
            .unwrap_err();
        assert!(matches!(err, ExportError::MalformedSourceData { .. }));
    }

    #[test]
    fn test_content_alias_is_idempotent() {
        let mut reg = Registry::default();
        let r = Registration::keyed(CategoryTag::TEXTURE_2D, "texture-2d-grass", "/tex/grass.png");
        let a = reg.register(r.clone(), |_| Ok(Body::Texture(Default::default()))).unwrap();
        let b = reg.register(r, |_| no_body()).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.key, b.key);
        assert!(!b.alias);
        assert_eq!(reg.next_id(), DEFAULT_FIRST_ID + 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_content_alias_with_new_name() {
        let mut reg = Registry::default();
        let a = reg
            .register(Registration::keyed(CategoryTag::TEXTURE_2D, "texture-2d-grass", "/tex/grass.png"), |_| {
                Ok(Body::Texture(Default::default()))
            })
            .unwrap();
        let r = Registration::keyed(CategoryTag::TEXTURE_2D, "texture-2d-lawn", "/tex/grass.png");
        let b = reg.register(r.clone(), |_| no_body()).unwrap();
        let c = reg.register(r, |_| no_body()).unwrap();
        assert_eq!(a.id, b.id);
        assert!(b.alias);
        assert_eq!(b.key, c.key);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.members(Category::Texture).len(), 2);
        assert_eq!(reg.table_members(Category::Texture), vec![a.key]);
    }

    #[test]
    fn test_members_sorted_by_id() {
        let mut reg = Registry::default();
        let names = ["camera-perspective-z", "camera-perspective-a", "camera-perspective-m"];
        for n in names {
            reg.register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, n), |_| camera_body())
                .unwrap();
        }
        let ids: Vec<EntityId> = reg
            .members(Category::Camera)
            .into_iter()
            .map(|k| reg.get(k).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1024, 1025, 1026]);
    }

    #[test]
    fn test_resolved_offset_follows_origin() {
        let mut reg = Registry::default();
        let origin = reg
            .register(Registration::named(CategoryTag::MESH_BASIC, "mesh-basic-A"), |_| {
                Ok(Body::Mesh(Default::default()))
            })
            .unwrap();
        let copy = reg
            .register(Registration::copy(CategoryTag::MESH_BASIC, "mesh-basic-A.001", "mesh-basic-A"), |_| no_body())
            .unwrap();
        assert!(reg.set_offset(copy.key, 10).is_err());
        reg.set_offset(origin.key, 42).unwrap();
        assert_eq!(reg.resolved_offset(copy.key), Some(42));
        assert_eq!(reg.resolved_offset(origin.key), Some(42));
    }

    #[test]
    fn test_ids_unique_across_categories() {
        let mut reg = Registry::default();
        let mut ids = std::collections::HashSet::new();
        for i in 0..5 {
            let name = format!("camera-perspective-{}", i);
            let h = reg
                .register(Registration::named(CategoryTag::CAMERA_PERSPECTIVE, &name), |_| camera_body())
                .unwrap();
            assert!(ids.insert(h.id));
            let name = format!("mesh-basic-{}", i);
            let h = reg
                .register(Registration::named(CategoryTag::MESH_BASIC, &name), |_| {
                    Ok(Body::Mesh(Default::default()))
                })
                .unwrap();
            assert!(ids.insert(h.id));
        }
        for (_, e) in reg.iter() {
            if let Some(origin) = e.alias_of {
                assert!(reg.get(origin).unwrap().alias_of.is_none());
            }
        }
    }
}
