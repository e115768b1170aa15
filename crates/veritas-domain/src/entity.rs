//! Entity module - canonical entities and their surface-form aliases

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A real-world entity with every surface form that refers to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical name, used as the graph node key
    pub canonical: String,
    /// Surface forms seen in sources
    pub aliases: BTreeSet<String>,
}

/// One equivalence class proposed by alias resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasGroup {
    /// Proposed canonical name
    pub canonical: String,
    /// Surface forms that refer to it
    pub aliases: Vec<String>,
}

impl AliasGroup {
    /// Group of one: the surface form is its own canonical name
    pub fn identity(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            canonical: name.clone(),
            aliases: vec![name],
        }
    }
}

/// Registry of canonical entities for one ingestion batch
///
/// Merging is idempotent: merging a group whose names are already known is a
/// no-op, and groups that share an alias fold into the entity that owns it.
///
/// # Examples
///
/// ```
/// use veritas_domain::{AliasGroup, EntityRegistry};
///
/// let group = AliasGroup {
///     canonical: "Donald Trump".into(),
///     aliases: vec!["Donald Trump".into(), "President Trump".into()],
/// };
///
/// let mut registry = EntityRegistry::new();
/// registry.merge(&group);
/// registry.merge(&group);
///
/// assert_eq!(registry.len(), 1);
/// assert_eq!(registry.resolve("President Trump"), Some("Donald Trump"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRegistry {
    entities: BTreeMap<String, Entity>,
    // surface form -> canonical
    index: HashMap<String, String>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an alias group, returning the canonical name it landed under
    pub fn merge(&mut self, group: &AliasGroup) -> String {
        let canonical = group.canonical.trim();
        let aliases: Vec<&str> = group
            .aliases
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect();

        // Existing owner wins so a second merge never creates a new canonical
        let target = self
            .owner_of(canonical)
            .or_else(|| aliases.iter().find_map(|a| self.owner_of(a)))
            .unwrap_or_else(|| canonical.to_string());

        self.entities
            .entry(target.clone())
            .or_insert_with(|| Entity {
                canonical: target.clone(),
                aliases: BTreeSet::new(),
            });

        for alias in aliases {
            match self.index.get(alias).cloned() {
                Some(owner) if owner == target => {}
                Some(owner) => self.fold(&owner, &target),
                None => {
                    self.index.insert(alias.to_string(), target.clone());
                    if let Some(entity) = self.entities.get_mut(&target) {
                        entity.aliases.insert(alias.to_string());
                    }
                }
            }
        }

        target
    }

    /// Merge every group in order
    pub fn merge_all<'a>(&mut self, groups: impl IntoIterator<Item = &'a AliasGroup>) {
        for group in groups {
            self.merge(group);
        }
    }

    /// Canonical name for a surface form
    pub fn resolve(&self, surface: &str) -> Option<&str> {
        self.index.get(surface.trim()).map(String::as_str)
    }

    /// Entity by canonical name
    pub fn get(&self, canonical: &str) -> Option<&Entity> {
        self.entities.get(canonical)
    }

    /// All entities ordered by canonical name
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of canonical entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity has been merged
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn owner_of(&self, name: &str) -> Option<String> {
        if self.entities.contains_key(name) {
            return Some(name.to_string());
        }
        self.index.get(name).cloned()
    }

    fn fold(&mut self, from: &str, into: &str) {
        let Some(absorbed) = self.entities.remove(from) else {
            return;
        };
        for alias in absorbed.aliases {
            self.index.insert(alias.clone(), into.to_string());
            if let Some(entity) = self.entities.get_mut(into) {
                entity.aliases.insert(alias);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn trump() -> AliasGroup {
        AliasGroup {
            canonical: "Donald Trump".to_string(),
            aliases: vec!["Donald Trump".to_string(), "President Trump".to_string()],
        }
    }

    #[test]
    fn test_merge_twice_yields_one_entity_two_aliases() {
        let mut registry = EntityRegistry::new();
        registry.merge(&trump());
        registry.merge(&trump());

        assert_eq!(registry.len(), 1);
        let entity = registry.get("Donald Trump").unwrap();
        assert_eq!(entity.aliases.len(), 2);
    }

    #[test]
    fn test_merging_canonical_name_is_noop() {
        let mut registry = EntityRegistry::new();
        registry.merge(&trump());
        let before = registry.clone();

        registry.merge(&AliasGroup::identity("Donald Trump"));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_group_sharing_alias_folds_into_existing_owner() {
        let mut registry = EntityRegistry::new();
        registry.merge(&trump());
        let landed = registry.merge(&AliasGroup {
            canonical: "Trump".to_string(),
            aliases: vec!["Trump".to_string(), "President Trump".to_string()],
        });

        assert_eq!(landed, "Donald Trump");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("Trump"), Some("Donald Trump"));
    }

    #[test]
    fn test_bridging_group_folds_two_entities() {
        let mut registry = EntityRegistry::new();
        registry.merge(&AliasGroup::identity("USA"));
        registry.merge(&AliasGroup::identity("United States"));
        registry.merge(&AliasGroup {
            canonical: "United States".to_string(),
            aliases: vec!["USA".to_string(), "United States".to_string()],
        });

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("United States"), registry.resolve("USA"));
    }

    #[test]
    fn test_blank_aliases_ignored() {
        let mut registry = EntityRegistry::new();
        registry.merge(&AliasGroup {
            canonical: "Paris".to_string(),
            aliases: vec!["  ".to_string(), "Paris".to_string()],
        });
        assert_eq!(registry.get("Paris").unwrap().aliases.len(), 1);
    }

    proptest! {
        /// Property: re-merging the same groups never changes the registry
        #[test]
        fn test_merge_idempotent(names in prop::collection::vec("[a-c]{1,2}", 1..8)) {
            let groups: Vec<AliasGroup> = names
                .chunks(2)
                .map(|chunk| AliasGroup {
                    canonical: chunk[0].clone(),
                    aliases: chunk.to_vec(),
                })
                .collect();

            let mut registry = EntityRegistry::new();
            registry.merge_all(&groups);
            let once = registry.clone();
            registry.merge_all(&groups);

            prop_assert_eq!(registry, once);
        }
    }
}
