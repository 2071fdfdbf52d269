//! JSON inputs: entity descriptor files and live schema snapshots.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use schemata_core::morph::MorphMap;
use schemata_core::{EntityDescriptor, EntityRegistry, LiveSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DriverError, Result};

/// Contents of an entity descriptor file.
///
/// ```json
/// {
///   "entities": [{"name": "Post", "table_name": "post", "columns": [...]}],
///   "morph_map": {"Post": "post"}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorFile {
    /// Entities, in registration order.
    pub entities: Vec<EntityDescriptor>,
    /// Entity-to-alias map for polymorphic type columns.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub morph_map: IndexMap<String, String>,
}

impl DescriptorFile {
    /// Builds the registry and morph map the comparator runs on.
    ///
    /// # Errors
    ///
    /// Fails on a duplicated entity or morph alias.
    pub fn into_parts(self) -> Result<(EntityRegistry, MorphMap)> {
        let registry = EntityRegistry::from_entities(self.entities)?;
        let mut morph_map = MorphMap::new();
        for (entity, alias) in self.morph_map {
            morph_map.register(entity, alias)?;
        }
        Ok((registry, morph_map))
    }
}

/// Loads an entity descriptor file.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, or when its entities
/// conflict with each other.
pub fn load_entities(path: &Path) -> Result<(EntityRegistry, MorphMap)> {
    let file: DescriptorFile = read_json(path)?;
    debug!(path = %path.display(), entities = file.entities.len(), "Loaded entity descriptors");
    file.into_parts()
}

/// Loads a live schema snapshot.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_live(path: &Path) -> Result<LiveSchema> {
    let snapshot: LiveSchema = read_json(path)?;
    debug!(path = %path.display(), tables = snapshot.tables.len(), "Loaded live schema snapshot");
    Ok(snapshot)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| DriverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DriverError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_core::EntityMetadataProvider;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_entities_with_morph_map() {
        let file = write_temp(
            r#"{
                "entities": [
                    {"name": "Post", "table_name": "post", "columns": [
                        {"name": "id", "logical_type": "integer", "primary_key": true, "nullable": false}
                    ]}
                ],
                "morph_map": {"Post": "post"}
            }"#,
        );

        let (registry, morph_map) = load_entities(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entity("Post").unwrap().primary_key_columns(), ["id"]);
        assert_eq!(morph_map.alias_for("Post"), "post");
    }

    #[test]
    fn test_duplicate_entity_is_configuration_error() {
        let file = write_temp(
            r#"{"entities": [
                {"name": "Post", "table_name": "post"},
                {"name": "Post", "table_name": "article"}
            ]}"#,
        );

        let err = load_entities(file.path()).unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_live(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
    }

    #[test]
    fn test_malformed_snapshot_is_json_error() {
        let file = write_temp("{\"tables\": [");
        let err = load_live(file.path()).unwrap_err();
        assert!(matches!(err, DriverError::Json { .. }));
    }
}
