//! Serialized schema files.
//!
//! Declared schemas live in a directory with one file per schema, all in the
//! same format. Empty and unset fields are omitted when writing and filled
//! with their defaults when reading.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use schemasync_core::model::{Catalog, Schema};

use crate::error::{Result, SyncError};

/// File format of declared schemas and catalog snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Format {
    /// YAML (`.yaml`).
    #[default]
    Yaml,
    /// JSON (`.json`).
    Json,
}

impl Format {
    /// Returns the file extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    /// Returns the format matching a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
            Self::Json => {
                let mut text = serde_json::to_string_pretty(value)?;
                text.push('\n');
                Ok(text)
            }
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        match self {
            Self::Yaml => Ok(serde_yaml::from_str(text)?),
            Self::Json => Ok(serde_json::from_str(text)?),
        }
    }
}

/// Serializes a schema.
pub fn schema_to_string(schema: &Schema, format: Format) -> Result<String> {
    format.serialize(schema)
}

/// Deserializes a schema.
pub fn schema_from_str(text: &str, format: Format) -> Result<Schema> {
    format.deserialize(text)
}

/// Serializes a catalog.
pub fn catalog_to_string(catalog: &Catalog, format: Format) -> Result<String> {
    format.serialize(catalog)
}

/// Deserializes a catalog.
pub fn catalog_from_str(text: &str, format: Format) -> Result<Catalog> {
    format.deserialize(text)
}

/// Reads and parses one file, attaching the path to parse failures.
pub(crate) fn read_file<T: DeserializeOwned>(path: &Path, format: Format) -> Result<T> {
    let text = fs::read_to_string(path)?;
    format
        .deserialize(&text)
        .map_err(|e| SyncError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Lists the files of `format` in `dir`, sorted by file name.
pub fn schema_files(dir: &Path, format: Format) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && Format::from_path(&path) == Some(format) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Determines the format of a schema directory.
///
/// The directory must exist and contain files of exactly one format.
pub fn detect_format(dir: &Path) -> Result<Format> {
    if !dir.is_dir() {
        return Err(SyncError::NotADirectory(dir.to_path_buf()));
    }
    let has_yaml = !schema_files(dir, Format::Yaml)?.is_empty();
    let has_json = !schema_files(dir, Format::Json)?.is_empty();
    match (has_yaml, has_json) {
        (true, true) => Err(SyncError::MixedFormats(dir.to_path_buf())),
        (false, false) => Err(SyncError::NoSchemaFiles(dir.to_path_buf())),
        (_, true) => Ok(Format::Json),
        (true, false) => Ok(Format::Yaml),
    }
}

/// Loads every declared schema in `dir`.
///
/// Files are read in file name order. When `only` is set, files whose stem is
/// not in the set are skipped. Two files declaring the same schema name are
/// rejected.
pub fn load_schema_dir(
    dir: &Path,
    format: Format,
    only: Option<&BTreeSet<String>>,
) -> Result<Vec<Schema>> {
    let mut schemas: Vec<(Schema, PathBuf)> = Vec::new();
    for path in schema_files(dir, format)? {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        if only.is_some_and(|names| !names.contains(stem)) {
            debug!(file = %path.display(), "skipping filtered schema file");
            continue;
        }
        let schema: Schema = read_file(&path, format)?;
        if let Some((_, first)) = schemas.iter().find(|(s, _)| s.name == schema.name) {
            return Err(SyncError::DuplicateSchema {
                name: schema.name,
                first: first.clone(),
                second: path,
            });
        }
        debug!(schema = %schema.name, file = %path.display(), "loaded declared schema");
        schemas.push((schema, path));
    }
    Ok(schemas.into_iter().map(|(schema, _)| schema).collect())
}

/// Writes one file per schema into `dir`, creating it if needed.
pub fn write_schema_dir(dir: &Path, schemas: &[Schema], format: Format) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let path = dir.join(format!("{}.{}", schema.name, format.extension()));
        fs::write(&path, schema_to_string(schema, format)?)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::model::{Column, ForeignKey, PrimaryKey, Table, TableType};

    fn sample_schema() -> Schema {
        Schema::new("main")
            .comment("Main schema")
            .tag("env", "prod")
            .table(
                Table::new("users")
                    .table_type(TableType::Managed)
                    .comment("User accounts")
                    .column(Column::new("id", "BIGINT").not_null().comment("primary key col"))
                    .column(Column::new("name", "STRING"))
                    .primary_key(PrimaryKey::new(["id"]).named("pk_users"))
                    .foreign_key(
                        ForeignKey::new(["org_id"], "orgs", "organizations", ["id"])
                            .named("fk_org"),
                    )
                    .tag("domain", "identity"),
            )
    }

    #[test]
    fn test_yaml_round_trip() {
        let original = sample_schema();
        let text = schema_to_string(&original, Format::Yaml).unwrap();
        let restored = schema_from_str(&text, Format::Yaml).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_json_round_trip() {
        let original = sample_schema();
        let text = schema_to_string(&original, Format::Json).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(schema_from_str(&text, Format::Json).unwrap(), original);
    }

    #[test]
    fn test_empty_fields_absent_from_yaml() {
        let text = schema_to_string(&Schema::new("empty"), Format::Yaml).unwrap();
        assert_eq!(text.trim(), "name: empty");
    }

    #[test]
    fn test_nullable_false_preserved() {
        let text = schema_to_string(&sample_schema(), Format::Yaml).unwrap();
        assert!(text.contains("nullable: false"));
        let restored = schema_from_str(&text, Format::Yaml).unwrap();
        assert!(!restored.tables[0].columns[0].nullable);
        assert!(restored.tables[0].columns[1].nullable);
    }

    #[test]
    fn test_minimal_yaml_defaults() {
        let schema = schema_from_str(
            "name: main\ntables:\n  - name: t\n    columns:\n      - name: c\n        data_type: INT\n",
            Format::Yaml,
        )
        .unwrap();
        let column = &schema.tables[0].columns[0];
        assert!(column.nullable);
        assert!(column.tags.is_empty());
        assert!(schema.tables[0].primary_key.is_none());
    }

    #[test]
    fn test_catalog_round_trip() {
        let catalog = Catalog::new("prod").schema(sample_schema());
        let text = catalog_to_string(&catalog, Format::Json).unwrap();
        assert_eq!(catalog_from_str(&text, Format::Json).unwrap(), catalog);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/main.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("main.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("main.sql")), None);
        assert_eq!(Format::from_path(Path::new("README")), None);
    }
}
