//! Catalog entity types.
//!
//! These types describe the structure of a data catalog (catalogs, schemas,
//! tables, columns and their key constraints) and are used both for the
//! declared state loaded from files and for the live state captured from the
//! catalog. They carry no behavior beyond construction and lookup.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key/value tags attached to an entity, ordered by key.
pub type Tags = BTreeMap<String, String>;

fn default_nullable() -> bool {
    true
}

/// The kind of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    /// Storage managed by the catalog.
    Managed,
    /// Storage at an external location.
    External,
    /// Logical view.
    View,
    /// Precomputed view.
    MaterializedView,
    /// Incrementally maintained table.
    StreamingTable,
}

impl TableType {
    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Managed => "MANAGED",
            Self::External => "EXTERNAL",
            Self::View => "VIEW",
            Self::MaterializedView => "MATERIALIZED_VIEW",
            Self::StreamingTable => "STREAMING_TABLE",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,
    /// Free-form type string (e.g. `BIGINT`, `ARRAY<STRING>`).
    pub data_type: String,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Whether the column allows NULL values.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Column tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl Column {
    /// Creates a nullable column without comment or tags.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            comment: None,
            nullable: true,
            tags: Tags::new(),
        }
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// An unordered set of column names.
///
/// Used as the identity of a foreign key: two keys over the same columns are
/// the same constraint regardless of their names or column order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnSet(BTreeSet<String>);

impl ColumnSet {
    /// Returns the column names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|c| c.as_ref().to_string()).collect())
    }
}

/// A primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Key columns, in key order.
    pub columns: Vec<String>,
}

impl PrimaryKey {
    /// Creates an unnamed primary key.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referencing columns in this table.
    pub columns: Vec<String>,
    /// Schema of the referenced table.
    pub ref_schema: String,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced columns.
    pub ref_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates an unnamed foreign key.
    #[must_use]
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        ref_schema: impl Into<String>,
        ref_table: impl Into<String>,
        ref_columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            ref_schema: ref_schema.into(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the identity of this key.
    #[must_use]
    pub fn column_set(&self) -> ColumnSet {
        self.columns.iter().collect()
    }

    /// Returns the `(local, referenced)` column pairs, independent of the
    /// order they are listed in.
    #[must_use]
    pub fn column_pairs(&self) -> BTreeSet<(&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.ref_columns.iter().map(String::as_str))
            .collect()
    }

    /// Returns true if both keys describe the same constraint apart from
    /// its name and the order of its column pairs.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.ref_schema == other.ref_schema
            && self.ref_table == other.ref_table
            && self.columns.len() == other.columns.len()
            && self.ref_columns.len() == other.ref_columns.len()
            && self.column_pairs() == other.column_pairs()
    }
}

/// A table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name, unique within its schema.
    pub name: String,
    /// Table kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<TableType>,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Owning principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Creation time. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Table tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
    /// Storage location. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    /// Columns in declared position order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<Column>,
    /// Primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    /// Foreign keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_type: None,
            comment: None,
            owner: None,
            created_at: None,
            tags: Tags::new(),
            storage_location: None,
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    /// Sets the table kind.
    #[must_use]
    pub fn table_type(mut self, table_type: TableType) -> Self {
        self.table_type = Some(table_type);
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A schema (database) inside a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, unique within its catalog.
    pub name: String,
    /// Schema comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Owning principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Schema tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
    /// Tables in the schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            owner: None,
            tags: Tags::new(),
            tables: Vec::new(),
        }
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Appends a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// A catalog: the root of the entity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog name. Snapshots may leave it out.
    #[serde(default)]
    pub name: String,
    /// Catalog comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Schemas in the catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<Schema>,
    /// Catalog tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: Tags,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            schemas: Vec::new(),
            tags: Tags::new(),
        }
    }

    /// Appends a schema.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Gets a schema by name.
    #[must_use]
    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Returns schema names in catalog order.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let col = Column::new("id", "BIGINT")
            .not_null()
            .comment("surrogate key")
            .tag("pii", "false");

        assert_eq!(col.name, "id");
        assert!(!col.nullable);
        assert_eq!(col.comment.as_deref(), Some("surrogate key"));
        assert_eq!(col.tags.get("pii").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_table_builder() {
        let table = Table::new("users")
            .table_type(TableType::Managed)
            .column(Column::new("id", "BIGINT").not_null())
            .column(Column::new("email", "STRING"))
            .primary_key(PrimaryKey::new(["id"]));

        assert_eq!(table.columns.len(), 2);
        assert!(table.get_column("email").is_some());
        assert!(table.get_column("missing").is_none());
        assert_eq!(table.primary_key.unwrap().columns, vec!["id"]);
    }

    #[test]
    fn test_column_set_ignores_order() {
        let a = ForeignKey::new(["a", "b"], "s", "t", ["x", "y"]);
        let b = ForeignKey::new(["b", "a"], "s", "t", ["y", "x"]).named("fk_other");
        assert_eq!(a.column_set(), b.column_set());
        assert_eq!(a.column_set().iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_same_definition_ignores_name() {
        let a = ForeignKey::new(["org_id"], "orgs", "organizations", ["id"]);
        let b = a.clone().named("fk_org");
        let c = ForeignKey::new(["org_id"], "orgs", "teams", ["id"]);
        assert!(a.same_definition(&b));
        assert!(!a.same_definition(&c));
    }

    #[test]
    fn test_same_definition_ignores_pair_order() {
        let a = ForeignKey::new(["a", "b"], "s", "x", ["k1", "k2"]);
        let reordered = ForeignKey::new(["b", "a"], "s", "x", ["k2", "k1"]);
        let swapped = ForeignKey::new(["a", "b"], "s", "x", ["k2", "k1"]);
        assert!(a.same_definition(&reordered));
        assert!(!a.same_definition(&swapped));
    }

    #[test]
    fn test_deserialize_defaults() {
        let schema: Schema = serde_json::from_str(
            r#"{"name": "main", "tables": [{"name": "t", "columns": [{"name": "c", "data_type": "INT"}]}]}"#,
        )
        .unwrap();

        let table = &schema.tables[0];
        assert!(schema.tags.is_empty());
        assert!(table.primary_key.is_none());
        assert!(table.foreign_keys.is_empty());
        assert!(table.columns[0].nullable);
        assert!(table.columns[0].tags.is_empty());
    }

    #[test]
    fn test_serialize_strips_empty_fields() {
        let value = serde_json::to_value(Schema::new("empty")).unwrap();
        assert_eq!(value, serde_json::json!({"name": "empty"}));

        let value = serde_json::to_value(Column::new("c", "INT").not_null()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "c", "data_type": "INT", "nullable": false})
        );
    }

    #[test]
    fn test_table_type_names() {
        assert_eq!(TableType::MaterializedView.to_string(), "MATERIALIZED_VIEW");
        let parsed: TableType = serde_json::from_str("\"STREAMING_TABLE\"").unwrap();
        assert_eq!(parsed, TableType::StreamingTable);
    }
}
