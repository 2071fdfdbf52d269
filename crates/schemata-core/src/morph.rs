//! Morph alias registry.
//!
//! Polymorphic columns store a short alias instead of the entity name when
//! one is registered. The map is passed into each run rather than held
//! globally.

use indexmap::IndexMap;

use crate::error::ConfigurationError;

/// Entity-to-alias map used for polymorphic type columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphMap {
    aliases: IndexMap<String, String>,
}

impl MorphMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an alias for an entity, replacing any previous alias.
    ///
    /// # Errors
    ///
    /// Fails when another entity already uses the alias.
    pub fn register(
        &mut self,
        entity: impl Into<String>,
        alias: impl Into<String>,
    ) -> Result<(), ConfigurationError> {
        let entity = entity.into();
        let alias = alias.into();
        if let Some(existing) = self.entity_for(&alias) {
            if existing != entity {
                return Err(ConfigurationError::DuplicateMorphAlias {
                    alias,
                    existing: existing.to_string(),
                    entity,
                });
            }
        }
        self.aliases.insert(entity, alias);
        Ok(())
    }

    /// Builder form of [`MorphMap::register`].
    ///
    /// # Errors
    ///
    /// Fails when another entity already uses the alias.
    pub fn with(
        mut self,
        entity: impl Into<String>,
        alias: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        self.register(entity, alias)?;
        Ok(self)
    }

    /// Returns the alias stored for an entity, or the entity name itself.
    #[must_use]
    pub fn alias_for<'a>(&'a self, entity: &'a str) -> &'a str {
        self.aliases.get(entity).map_or(entity, String::as_str)
    }

    /// Resolves an alias back to its entity.
    #[must_use]
    pub fn entity_for(&self, alias: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, a)| a.as_str() == alias)
            .map(|(entity, _)| entity.as_str())
    }

    /// Returns whether no alias is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup() {
        let map = MorphMap::new().with("App\\Post", "post").unwrap();

        assert_eq!(map.alias_for("App\\Post"), "post");
        assert_eq!(map.alias_for("App\\Video"), "App\\Video");
        assert_eq!(map.entity_for("post"), Some("App\\Post"));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut map = MorphMap::new();
        map.register("Post", "content").unwrap();
        map.register("Post", "content").unwrap();

        let err = map.register("Video", "content").unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateMorphAlias { .. }));
    }
}
