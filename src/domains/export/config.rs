use crate::errors::{ExportError, ExportResult};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Columns to extract from each related entity.
///
/// The config document may spell this as `"columns": [..]`, `"column": [..]`
/// or the bare single-column shorthand `"column": "name"`; all of them
/// normalize to a non-empty ordered list here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationConfigWire")]
pub struct RelationConfig {
    pub columns: Vec<String>,
}

#[derive(Deserialize)]
struct RelationConfigWire {
    #[serde(alias = "column")]
    columns: OneOrMany,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RelationConfigWire> for RelationConfig {
    type Error = String;

    fn try_from(wire: RelationConfigWire) -> Result<Self, Self::Error> {
        let columns = match wire.columns {
            OneOrMany::One(column) => vec![column],
            OneOrMany::Many(columns) => columns,
        };
        if columns.is_empty() {
            return Err("relation column list must not be empty".to_string());
        }
        Ok(Self { columns })
    }
}

/// Declarative export configuration of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Scalar fields to show, in declared order. Empty means "all fields".
    #[serde(default, rename = "columns")]
    pub scalar_columns: Vec<String>,

    /// Relation name → columns to inline, in declared order. Declaration
    /// order drives header order, so this stays a sequence, not a hash map.
    #[serde(
        default,
        rename = "relation",
        deserialize_with = "deserialize_relations"
    )]
    pub relations: Vec<(String, RelationConfig)>,

    /// When set, row and count queries filter on `locale = "en"`.
    #[serde(
        default,
        rename = "locale",
        deserialize_with = "deserialize_locale_flag"
    )]
    pub locale_filtered: bool,
}

impl CollectionConfig {
    /// Every flat-row key this config can produce, in output order: scalar
    /// columns first, then one `<relation>_<column>` key per relation column.
    ///
    /// This is the shared contract between the header deriver and the row
    /// flattener; both read from it so headers and rows cannot drift apart.
    pub fn flattened_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.scalar_columns.clone();
        for (relation, relation_config) in &self.relations {
            for column in &relation_config.columns {
                keys.push(format!("{}_{}", relation, column));
            }
        }
        keys
    }
}

fn deserialize_relations<'de, D>(
    deserializer: D,
) -> Result<Vec<(String, RelationConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RelationsVisitor;

    impl<'de> Visitor<'de> for RelationsVisitor {
        type Value = Vec<(String, RelationConfig)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of relation name to relation config")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut relations = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, config)) = map.next_entry::<String, RelationConfig>()? {
                relations.push((name, config));
            }
            Ok(relations)
        }
    }

    deserializer.deserialize_map(RelationsVisitor)
}

fn deserialize_locale_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    // Legacy config documents carry the flag as the string "true".
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Text(text) => Ok(text == "true"),
    }
}

#[derive(Deserialize)]
struct ExportConfigDocument {
    config: BTreeMap<String, CollectionConfig>,
}

/// Immutable registry of per-collection export configurations.
///
/// Loaded once at process start from a JSON document shaped as
/// `{ "config": { "<collection id>": { ... } } }` and injected into the
/// orchestrator; the core never reaches for process-wide state.
#[derive(Debug, Clone)]
pub struct ExportConfigRegistry {
    configs: BTreeMap<String, CollectionConfig>,
}

impl ExportConfigRegistry {
    pub fn from_path(path: impl AsRef<Path>) -> ExportResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ExportError::InvalidConfig(e.to_string()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> ExportResult<Self> {
        let document: ExportConfigDocument =
            serde_json::from_str(raw).map_err(|e| ExportError::InvalidConfig(e.to_string()))?;
        Self::from_configs(document.config)
    }

    pub fn from_value(value: serde_json::Value) -> ExportResult<Self> {
        let document: ExportConfigDocument =
            serde_json::from_value(value).map_err(|e| ExportError::InvalidConfig(e.to_string()))?;
        Self::from_configs(document.config)
    }

    fn from_configs(configs: BTreeMap<String, CollectionConfig>) -> ExportResult<Self> {
        for (collection_id, config) in &configs {
            validate_config(collection_id, config)?;
        }
        Ok(Self { configs })
    }

    pub fn get(&self, collection_id: &str) -> Option<&CollectionConfig> {
        self.configs.get(collection_id)
    }

    /// Registered collection identifiers, used as prefixes when matching the
    /// schema catalog for the dropdown.
    pub fn registered_ids(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn matches_registered_prefix(&self, uid: &str) -> bool {
        self.registered_ids().any(|id| uid.starts_with(id))
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }
}

/// Scalar columns and namespaced relation keys must stay distinct after
/// flattening, otherwise headers and row cells would silently overwrite each
/// other. Rejected at load rather than at request time.
fn validate_config(collection_id: &str, config: &CollectionConfig) -> ExportResult<()> {
    let mut seen = BTreeSet::new();
    for key in config.flattened_keys() {
        if !seen.insert(key.clone()) {
            return Err(ExportError::InvalidConfig(format!(
                "collection '{}' produces duplicate flattened key '{}'",
                collection_id, key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry(config: serde_json::Value) -> ExportResult<ExportConfigRegistry> {
        ExportConfigRegistry::from_value(json!({ "config": config }))
    }

    #[test]
    fn test_parses_full_config() {
        let registry = registry(json!({
            "api::article.article": {
                "columns": ["title", "slug"],
                "relation": {
                    "author": { "columns": ["name", "email"] }
                },
                "locale": true
            }
        }))
        .unwrap();

        let config = registry.get("api::article.article").unwrap();
        assert_eq!(config.scalar_columns, vec!["title", "slug"]);
        assert_eq!(config.relations.len(), 1);
        assert_eq!(config.relations[0].0, "author");
        assert_eq!(config.relations[0].1.columns, vec!["name", "email"]);
        assert!(config.locale_filtered);
    }

    #[test]
    fn test_single_column_shorthand_normalizes() {
        let registry = registry(json!({
            "api::article.article": {
                "columns": ["title"],
                "relation": {
                    "category": { "column": "title" }
                }
            }
        }))
        .unwrap();

        let config = registry.get("api::article.article").unwrap();
        assert_eq!(config.relations[0].1.columns, vec!["title"]);
    }

    #[test]
    fn test_locale_flag_accepts_legacy_string() {
        let registry = registry(json!({
            "api::article.article": { "columns": ["title"], "locale": "true" },
            "api::page.page": { "columns": ["title"], "locale": "false" }
        }))
        .unwrap();

        assert!(registry.get("api::article.article").unwrap().locale_filtered);
        assert!(!registry.get("api::page.page").unwrap().locale_filtered);
    }

    #[test]
    fn test_locale_flag_defaults_off() {
        let registry = registry(json!({
            "api::article.article": { "columns": ["title"] }
        }))
        .unwrap();

        assert!(!registry.get("api::article.article").unwrap().locale_filtered);
    }

    #[test]
    fn test_empty_relation_columns_rejected() {
        let result = registry(json!({
            "api::article.article": {
                "columns": ["title"],
                "relation": { "author": { "columns": [] } }
            }
        }));

        assert!(matches!(result, Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn test_flattened_key_collision_rejected() {
        // Scalar "author_name" collides with relation author / column name.
        let result = registry(json!({
            "api::article.article": {
                "columns": ["title", "author_name"],
                "relation": { "author": { "columns": ["name"] } }
            }
        }));

        assert!(matches!(result, Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn test_relation_declaration_order_preserved() {
        let registry = registry(json!({
            "api::article.article": {
                "columns": [],
                "relation": {
                    "zeta": { "columns": ["a"] },
                    "alpha": { "columns": ["b"] }
                }
            }
        }))
        .unwrap();

        let config = registry.get("api::article.article").unwrap();
        let names: Vec<&str> = config.relations.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_flattened_keys_order() {
        let registry = registry(json!({
            "api::article.article": {
                "columns": ["title", "slug"],
                "relation": {
                    "author": { "columns": ["name", "email"] },
                    "category": { "column": "title" }
                }
            }
        }))
        .unwrap();

        let config = registry.get("api::article.article").unwrap();
        assert_eq!(
            config.flattened_keys(),
            vec!["title", "slug", "author_name", "author_email", "category_title"]
        );
    }

    #[test]
    fn test_from_path_round_trip() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "config": {{ "api::article.article": {{ "columns": ["title"] }} }} }}"#
        )
        .unwrap();

        let registry = ExportConfigRegistry::from_path(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_missing_envelope_rejected() {
        let result = ExportConfigRegistry::from_json_str(r#"{"api::a.a": {"columns": []}}"#);
        assert!(matches!(result, Err(ExportError::InvalidConfig(_))));
    }

    #[test]
    fn test_prefix_matching() {
        let registry = registry(json!({
            "api::article": { "columns": ["title"] }
        }))
        .unwrap();

        assert!(registry.matches_registered_prefix("api::article.article"));
        assert!(!registry.matches_registered_prefix("plugin::upload.file"));
    }
}
