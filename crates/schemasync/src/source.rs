//! Where the live catalog state comes from.
//!
//! [`CatalogSource`] is the seam between the reconciliation pipeline and the
//! catalog service. [`SnapshotSource`] reads previously captured catalog
//! snapshots from a directory, one `<catalog>.yaml` or `<catalog>.json` file
//! per catalog.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use schemasync_core::model::{Catalog, Schema};

use crate::error::{Result, SyncError};
use crate::format::{read_file, Format};

/// Schemas the catalog service manages itself.
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema"];

/// Controls what an extraction keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Only keep these schemas, if set.
    pub schema_filter: Option<BTreeSet<String>>,
    /// Keep owner, storage location and creation time.
    pub include_metadata: bool,
    /// Keep tags on every entity.
    pub include_tags: bool,
    /// Drop service-managed schemas.
    pub skip_system_schemas: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            schema_filter: None,
            include_metadata: false,
            include_tags: true,
            skip_system_schemas: true,
        }
    }
}

impl ExtractOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts extraction to the given schema names. An empty list keeps all.
    #[must_use]
    pub fn schemas<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        self.schema_filter = (!names.is_empty()).then_some(names);
        self
    }

    /// Keeps owner, storage location and creation time.
    #[must_use]
    pub fn with_metadata(mut self) -> Self {
        self.include_metadata = true;
        self
    }

    /// Clears every tag.
    #[must_use]
    pub fn without_tags(mut self) -> Self {
        self.include_tags = false;
        self
    }

    /// Keeps service-managed schemas.
    #[must_use]
    pub fn with_system_schemas(mut self) -> Self {
        self.skip_system_schemas = false;
        self
    }

    fn keeps(&self, name: &str) -> bool {
        if self.skip_system_schemas && SYSTEM_SCHEMAS.contains(&name) {
            return false;
        }
        self.schema_filter
            .as_ref()
            .is_none_or(|names| names.contains(name))
    }

    /// Applies these options to a full catalog.
    #[must_use]
    pub fn apply(&self, mut catalog: Catalog) -> Catalog {
        catalog.schemas.retain(|schema| {
            let keep = self.keeps(&schema.name);
            if !keep {
                debug!(schema = %schema.name, "schema excluded from extraction");
            }
            keep
        });
        for schema in &mut catalog.schemas {
            if !self.include_metadata {
                clear_metadata(schema);
            }
            if !self.include_tags {
                strip_tags(schema);
            }
        }
        if !self.include_tags {
            catalog.tags.clear();
        }
        catalog
    }
}

fn clear_metadata(schema: &mut Schema) {
    schema.owner = None;
    for table in &mut schema.tables {
        table.owner = None;
        table.storage_location = None;
        table.created_at = None;
    }
}

/// Removes tags from a schema and everything under it.
pub fn strip_tags(schema: &mut Schema) {
    schema.tags.clear();
    for table in &mut schema.tables {
        table.tags.clear();
        for column in &mut table.columns {
            column.tags.clear();
        }
    }
}

/// Provides the live state of catalogs.
pub trait CatalogSource {
    /// Lists available catalog names, sorted.
    fn list_catalogs(&self) -> Result<Vec<String>>;

    /// Lists schema names of a catalog, in catalog order.
    fn list_schemas(&self, catalog: &str) -> Result<Vec<String>>;

    /// Extracts a catalog, filtered and cleaned per `options`.
    fn extract_catalog(&self, catalog: &str, options: &ExtractOptions) -> Result<Catalog>;
}

/// Reads catalogs from snapshot files in a directory.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    /// Creates a source over `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the snapshot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, catalog: &str) -> Option<(PathBuf, Format)> {
        [Format::Yaml, Format::Json].into_iter().find_map(|format| {
            let path = self.dir.join(format!("{catalog}.{}", format.extension()));
            path.is_file().then_some((path, format))
        })
    }

    fn load(&self, catalog: &str) -> Result<Catalog> {
        let (path, format) = self
            .snapshot_path(catalog)
            .ok_or_else(|| SyncError::CatalogNotFound(catalog.to_string()))?;
        debug!(catalog, file = %path.display(), "reading catalog snapshot");
        let mut snapshot: Catalog = read_file(&path, format)?;
        // The requested catalog qualifies generated SQL, whatever the file says.
        snapshot.name = catalog.to_string();
        Ok(snapshot)
    }
}

impl CatalogSource for SnapshotSource {
    fn list_catalogs(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || Format::from_path(&path).is_none() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }

    fn list_schemas(&self, catalog: &str) -> Result<Vec<String>> {
        Ok(self
            .load(catalog)?
            .schema_names()
            .map(str::to_string)
            .collect())
    }

    fn extract_catalog(&self, catalog: &str, options: &ExtractOptions) -> Result<Catalog> {
        let extracted = options.apply(self.load(catalog)?);
        info!(
            catalog,
            schemas = extracted.schemas.len(),
            "extracted catalog"
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::model::{Column, Table};
    use tempfile::TempDir;

    fn fixture_catalog() -> Catalog {
        let mut orders = Table::new("orders")
            .owner("alice")
            .tag("domain", "sales")
            .column(Column::new("id", "BIGINT").tag("pii", "false"));
        orders.storage_location = Some("s3://bucket/orders".to_string());
        Catalog::new("prod")
            .schema(Schema::new("information_schema"))
            .schema(Schema::new("sales").owner("data-eng").tag("env", "prod").table(orders))
            .schema(Schema::new("staging"))
    }

    fn write_snapshot(dir: &Path, catalog: &Catalog, format: Format) {
        let text = crate::format::catalog_to_string(catalog, format).unwrap();
        fs::write(
            dir.join(format!("{}.{}", catalog.name, format.extension())),
            text,
        )
        .unwrap();
    }

    #[test]
    fn test_default_extraction_clears_metadata_and_system_schemas() {
        let catalog = ExtractOptions::new().apply(fixture_catalog());
        let names: Vec<&str> = catalog.schema_names().collect();
        assert_eq!(names, vec!["sales", "staging"]);

        let sales = &catalog.schemas[0];
        assert_eq!(sales.owner, None);
        assert_eq!(sales.tables[0].owner, None);
        assert_eq!(sales.tables[0].storage_location, None);
        assert_eq!(sales.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_metadata_kept_when_requested() {
        let catalog = ExtractOptions::new().with_metadata().apply(fixture_catalog());
        let sales = catalog.get_schema("sales").unwrap();
        assert_eq!(sales.owner.as_deref(), Some("data-eng"));
        assert_eq!(
            sales.tables[0].storage_location.as_deref(),
            Some("s3://bucket/orders")
        );
    }

    #[test]
    fn test_without_tags_clears_every_level() {
        let catalog = ExtractOptions::new().without_tags().apply(fixture_catalog());
        let sales = catalog.get_schema("sales").unwrap();
        assert!(sales.tags.is_empty());
        assert!(sales.tables[0].tags.is_empty());
        assert!(sales.tables[0].columns[0].tags.is_empty());
    }

    #[test]
    fn test_schema_filter() {
        let catalog = ExtractOptions::new()
            .schemas(["staging"])
            .apply(fixture_catalog());
        let names: Vec<&str> = catalog.schema_names().collect();
        assert_eq!(names, vec!["staging"]);

        let all = ExtractOptions::new()
            .schemas(Vec::<String>::new())
            .apply(fixture_catalog());
        assert_eq!(all.schemas.len(), 2);
    }

    #[test]
    fn test_system_schemas_kept_when_requested() {
        let catalog = ExtractOptions::new()
            .with_system_schemas()
            .apply(fixture_catalog());
        assert!(catalog.get_schema("information_schema").is_some());
    }

    #[test]
    fn test_snapshot_source_lists_and_extracts() {
        let dir = TempDir::new().unwrap();
        write_snapshot(dir.path(), &fixture_catalog(), Format::Yaml);
        write_snapshot(dir.path(), &Catalog::new("analytics"), Format::Json);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = SnapshotSource::new(dir.path());
        assert_eq!(source.list_catalogs().unwrap(), vec!["analytics", "prod"]);
        assert_eq!(
            source.list_schemas("prod").unwrap(),
            vec!["information_schema", "sales", "staging"]
        );

        let extracted = source
            .extract_catalog("prod", &ExtractOptions::new())
            .unwrap();
        assert_eq!(extracted.name, "prod");
        assert_eq!(extracted.schemas.len(), 2);
    }

    #[test]
    fn test_missing_catalog() {
        let dir = TempDir::new().unwrap();
        let source = SnapshotSource::new(dir.path());
        let err = source
            .extract_catalog("nope", &ExtractOptions::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::CatalogNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_missing_snapshot_dir_lists_nothing() {
        let source = SnapshotSource::new("/definitely/not/here");
        assert!(source.list_catalogs().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_takes_requested_catalog_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dev.yaml"), "name: prod\nschemas:\n  - name: main\n").unwrap();
        let source = SnapshotSource::new(dir.path());
        let catalog = source.extract_catalog("dev", &ExtractOptions::new()).unwrap();
        assert_eq!(catalog.name, "dev");
    }

    #[test]
    fn test_unnamed_snapshot_takes_file_stem() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dev.yaml"), "schemas:\n  - name: main\n").unwrap();
        let source = SnapshotSource::new(dir.path());
        let catalog = source.extract_catalog("dev", &ExtractOptions::new()).unwrap();
        assert_eq!(catalog.name, "dev");
        assert_eq!(catalog.schemas[0].name, "main");
    }
}
