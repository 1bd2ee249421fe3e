//! Structural diff engine for catalog entities.
//!
//! Compares a live entity tree against a declared one and produces a typed
//! diff tree: a status per node, the changed fields of modified nodes, and the
//! child diffs of schemas and tables.
//!
//! ## Orientation
//!
//! Every [`Change`] holds the declared value as `target` and the live value
//! as `current`. SQL synthesis always moves `current` to `target`.
//!
//! ## Status
//!
//! Statuses are named from the live side's point of view:
//!
//! - [`DiffStatus::Removed`]: declared but missing live (must be created).
//! - [`DiffStatus::Added`]: live but not declared (must be dropped).
//! - [`DiffStatus::Modified`]: present on both sides with field changes or
//!   changed children.
//!
//! Child lists only hold nodes whose status is not `Unchanged`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::model::{Column, ColumnSet, ForeignKey, PrimaryKey, Schema, Table, TableType, Tags};

/// Options controlling which fields are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Also compare ownership metadata.
    pub include_metadata: bool,
}

impl DiffOptions {
    /// Creates default options (metadata excluded).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes ownership metadata in the comparison.
    #[must_use]
    pub fn with_metadata(mut self) -> Self {
        self.include_metadata = true;
        self
    }
}

/// Status of a node in the diff tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffStatus {
    /// Identical on both sides.
    Unchanged,
    /// Present on both sides, with differences.
    Modified,
    /// Present live only.
    Added,
    /// Present in the declared state only.
    Removed,
}

impl DiffStatus {
    /// Returns the lower-case status name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Modified => "modified",
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }

    /// Returns true for every status other than `Unchanged`.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        *self != Self::Unchanged
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `Table::table_type`.
    TableType,
    /// `Column::data_type`.
    DataType,
    /// `comment` of a schema, table or column.
    Comment,
    /// `owner` of a schema or table.
    Owner,
    /// `Column::nullable`.
    Nullable,
    /// `Table::primary_key`.
    PrimaryKey,
    /// `Table::foreign_keys`.
    ForeignKeys,
    /// `tags` of a schema, table or column.
    Tags,
}

impl Field {
    /// Returns the field name as it appears in declared files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableType => "table_type",
            Self::DataType => "data_type",
            Self::Comment => "comment",
            Self::Owner => "owner",
            Self::Nullable => "nullable",
            Self::PrimaryKey => "primary_key",
            Self::ForeignKeys => "foreign_keys",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pair of values for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    /// Declared value: the desired end state.
    pub target: T,
    /// Live value: the state as currently deployed.
    pub current: T,
}

/// A change to a single tracked field.
///
/// Structural fields (keys, tags) carry the whole old and new structures;
/// the SQL generator decomposes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// Table kind changed.
    TableType(Change<Option<TableType>>),
    /// Column type changed.
    DataType(Change<String>),
    /// Comment changed.
    Comment(Change<Option<String>>),
    /// Owner changed.
    Owner(Change<Option<String>>),
    /// Column nullability changed.
    Nullable(Change<bool>),
    /// Primary key changed.
    PrimaryKey(Change<Option<PrimaryKey>>),
    /// Foreign keys changed.
    ForeignKeys(Change<Vec<ForeignKey>>),
    /// Tags changed.
    Tags(Change<Tags>),
}

impl FieldChange {
    /// Returns the field this change applies to.
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::TableType(_) => Field::TableType,
            Self::DataType(_) => Field::DataType,
            Self::Comment(_) => Field::Comment,
            Self::Owner(_) => Field::Owner,
            Self::Nullable(_) => Field::Nullable,
            Self::PrimaryKey(_) => Field::PrimaryKey,
            Self::ForeignKeys(_) => Field::ForeignKeys,
            Self::Tags(_) => Field::Tags,
        }
    }
}

/// An entity kind whose fields take part in the diff.
pub trait Tracked {
    /// Fields compared for this kind, in comparison order.
    fn tracked_fields(options: &DiffOptions) -> Vec<Field>;

    /// Compares one field; returns `None` when equal or not applicable.
    fn field_change(field: Field, target: &Self, current: &Self) -> Option<FieldChange>;
}

fn compare<T: PartialEq + Clone>(
    target: &T,
    current: &T,
    wrap: fn(Change<T>) -> FieldChange,
) -> Option<FieldChange> {
    (target != current).then(|| {
        wrap(Change {
            target: target.clone(),
            current: current.clone(),
        })
    })
}

/// Compares every tracked field of two entities of the same kind.
#[must_use]
pub fn compare_fields<T: Tracked>(current: &T, target: &T, options: &DiffOptions) -> Vec<FieldChange> {
    T::tracked_fields(options)
        .into_iter()
        .filter_map(|field| T::field_change(field, target, current))
        .collect()
}

impl Tracked for Column {
    fn tracked_fields(_options: &DiffOptions) -> Vec<Field> {
        vec![Field::DataType, Field::Comment, Field::Nullable, Field::Tags]
    }

    fn field_change(field: Field, target: &Self, current: &Self) -> Option<FieldChange> {
        match field {
            Field::DataType => compare(&target.data_type, &current.data_type, FieldChange::DataType),
            Field::Comment => compare(&target.comment, &current.comment, FieldChange::Comment),
            Field::Nullable => compare(&target.nullable, &current.nullable, FieldChange::Nullable),
            Field::Tags => compare(&target.tags, &current.tags, FieldChange::Tags),
            _ => None,
        }
    }
}

impl Tracked for Table {
    fn tracked_fields(options: &DiffOptions) -> Vec<Field> {
        let mut fields = vec![
            Field::TableType,
            Field::Comment,
            Field::PrimaryKey,
            Field::ForeignKeys,
            Field::Tags,
        ];
        if options.include_metadata {
            fields.insert(2, Field::Owner);
        }
        fields
    }

    fn field_change(field: Field, target: &Self, current: &Self) -> Option<FieldChange> {
        match field {
            Field::TableType => {
                compare(&target.table_type, &current.table_type, FieldChange::TableType)
            }
            Field::Comment => compare(&target.comment, &current.comment, FieldChange::Comment),
            Field::Owner => compare(&target.owner, &current.owner, FieldChange::Owner),
            Field::PrimaryKey => {
                compare(&target.primary_key, &current.primary_key, FieldChange::PrimaryKey)
            }
            Field::ForeignKeys => {
                if foreign_keys_equivalent(&target.foreign_keys, &current.foreign_keys) {
                    None
                } else {
                    Some(FieldChange::ForeignKeys(Change {
                        target: target.foreign_keys.clone(),
                        current: current.foreign_keys.clone(),
                    }))
                }
            }
            Field::Tags => compare(&target.tags, &current.tags, FieldChange::Tags),
            _ => None,
        }
    }
}

impl Tracked for Schema {
    fn tracked_fields(options: &DiffOptions) -> Vec<Field> {
        if options.include_metadata {
            vec![Field::Comment, Field::Owner, Field::Tags]
        } else {
            vec![Field::Comment, Field::Tags]
        }
    }

    fn field_change(field: Field, target: &Self, current: &Self) -> Option<FieldChange> {
        match field {
            Field::Comment => compare(&target.comment, &current.comment, FieldChange::Comment),
            Field::Owner => compare(&target.owner, &current.owner, FieldChange::Owner),
            Field::Tags => compare(&target.tags, &current.tags, FieldChange::Tags),
            _ => None,
        }
    }
}

/// Indexes foreign keys by their column set. Later keys win on collision.
pub(crate) fn foreign_keys_by_column_set(keys: &[ForeignKey]) -> BTreeMap<ColumnSet, &ForeignKey> {
    keys.iter().map(|fk| (fk.column_set(), fk)).collect()
}

/// Two foreign key lists are equivalent when they bind the same column sets
/// to the same definitions. Constraint names and list order are ignored.
fn foreign_keys_equivalent(a: &[ForeignKey], b: &[ForeignKey]) -> bool {
    let a = foreign_keys_by_column_set(a);
    let b = foreign_keys_by_column_set(b);
    a.len() == b.len()
        && a.iter()
            .all(|(key, fk)| b.get(key).is_some_and(|other| fk.same_definition(other)))
}

/// Diff of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDiff {
    /// Column name.
    pub name: String,
    /// Column status.
    pub status: DiffStatus,
    /// Changed fields (modified columns only).
    pub changes: Vec<FieldChange>,
}

/// Diff of a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDiff {
    /// Table name.
    pub name: String,
    /// Table status.
    pub status: DiffStatus,
    /// Changed fields (modified tables only).
    pub changes: Vec<FieldChange>,
    /// Changed columns (modified tables only).
    pub columns: Vec<ColumnDiff>,
}

/// Diff of a single schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Schema name.
    pub name: String,
    /// Schema status.
    pub status: DiffStatus,
    /// Changed fields (modified schemas only).
    pub changes: Vec<FieldChange>,
    /// Changed tables (modified schemas only).
    pub tables: Vec<TableDiff>,
}

/// Diff of every schema of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDiff {
    /// Catalog name.
    pub catalog: String,
    /// Per-schema diffs, including unchanged schemas.
    pub schemas: Vec<SchemaDiff>,
}

impl CatalogDiff {
    /// Returns true if any schema differs.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.schemas.iter().any(SchemaDiff::has_changes)
    }

    /// Counts changed nodes across all levels.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.schemas
            .iter()
            .filter(|s| s.has_changes())
            .map(|s| {
                1 + s
                    .tables
                    .iter()
                    .map(|t| 1 + t.columns.len())
                    .sum::<usize>()
            })
            .sum()
    }
}

/// A node of the diff tree.
trait DiffNode {
    fn added(name: &str) -> Self;
    fn removed(name: &str) -> Self;
    fn status(&self) -> DiffStatus;
}

/// An entity keyed by name within its parent.
trait Named {
    fn name(&self) -> &str;
}

macro_rules! impl_diff_node {
    ($node:ident { $($child:ident),* }) => {
        impl $node {
            /// Creates a node for an entity present live only.
            #[must_use]
            pub fn added(name: impl Into<String>) -> Self {
                Self::with_status(name, DiffStatus::Added)
            }

            /// Creates a node for an entity present in the declared state only.
            #[must_use]
            pub fn removed(name: impl Into<String>) -> Self {
                Self::with_status(name, DiffStatus::Removed)
            }

            fn with_status(name: impl Into<String>, status: DiffStatus) -> Self {
                Self {
                    name: name.into(),
                    status,
                    changes: Vec::new(),
                    $($child: Vec::new(),)*
                }
            }

            /// Returns true unless the node is unchanged.
            #[must_use]
            pub fn has_changes(&self) -> bool {
                self.status.is_changed()
            }
        }

        impl DiffNode for $node {
            fn added(name: &str) -> Self {
                Self::added(name)
            }

            fn removed(name: &str) -> Self {
                Self::removed(name)
            }

            fn status(&self) -> DiffStatus {
                self.status
            }
        }
    };
}

impl_diff_node!(ColumnDiff {});
impl_diff_node!(TableDiff { columns });
impl_diff_node!(SchemaDiff { tables });

impl Named for Column {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Table {
    fn name(&self) -> &str {
        &self.name
    }
}

fn modified_if(has_changes: bool) -> DiffStatus {
    if has_changes {
        DiffStatus::Modified
    } else {
        DiffStatus::Unchanged
    }
}

/// Matches two child collections by name.
///
/// Declared-only children come first (in declared order), then live children
/// in live order. Unchanged children are dropped.
fn diff_children<T: Named, D: DiffNode>(
    live: &[T],
    declared: &[T],
    recurse: impl Fn(&T, &T) -> D,
) -> Vec<D> {
    let live_map: HashMap<&str, &T> = live.iter().map(|c| (c.name(), c)).collect();
    let declared_map: HashMap<&str, &T> = declared.iter().map(|c| (c.name(), c)).collect();

    let mut diffs: Vec<D> = declared
        .iter()
        .filter(|c| !live_map.contains_key(c.name()))
        .map(|c| D::removed(c.name()))
        .collect();

    for live_child in live {
        match declared_map.get(live_child.name()) {
            None => diffs.push(D::added(live_child.name())),
            Some(declared_child) => {
                let diff = recurse(live_child, declared_child);
                if diff.status().is_changed() {
                    diffs.push(diff);
                }
            }
        }
    }

    diffs
}

/// Compares a live column against its declared counterpart.
#[must_use]
pub fn diff_column(live: &Column, declared: &Column) -> ColumnDiff {
    let changes = compare_fields(live, declared, &DiffOptions::default());
    ColumnDiff {
        name: live.name.clone(),
        status: modified_if(!changes.is_empty()),
        changes,
    }
}

/// Compares a live table against its declared counterpart.
#[must_use]
pub fn diff_table(live: &Table, declared: &Table, options: &DiffOptions) -> TableDiff {
    let changes = compare_fields(live, declared, options);
    let columns = diff_children(&live.columns, &declared.columns, diff_column);
    TableDiff {
        name: live.name.clone(),
        status: modified_if(!changes.is_empty() || !columns.is_empty()),
        changes,
        columns,
    }
}

/// Compares a live schema against its declared counterpart.
///
/// The returned diff describes what must change for the live schema to match
/// the declared one.
#[must_use]
pub fn diff_schema(live: &Schema, declared: &Schema, options: &DiffOptions) -> SchemaDiff {
    let changes = compare_fields(live, declared, options);
    let tables = diff_children(&live.tables, &declared.tables, |l, d| {
        diff_table(l, d, options)
    });
    SchemaDiff {
        name: live.name.clone(),
        status: modified_if(!changes.is_empty() || !tables.is_empty()),
        changes,
        tables,
    }
}
