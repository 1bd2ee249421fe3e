//! DDL generation from diff trees.
//!
//! Walks a [`SchemaDiff`] and emits the statements that bring the live catalog
//! in line with the declared state. Every statement moves `current` towards
//! `target`; nothing here touches a database.
//!
//! Statements within one level are emitted in a fixed order: existence
//! (create/drop), comment, owner, tags, constraints, then the child levels.
//! Destructive statements (dropping a column, table or schema) are written as
//! SQL comments unless drops are allowed.

use std::collections::BTreeSet;

use tracing::warn;

use crate::diff::{
    foreign_keys_by_column_set, Change, ColumnDiff, DiffStatus, Field, FieldChange, SchemaDiff,
    TableDiff,
};
use crate::model::{Column, ForeignKey, PrimaryKey, Schema, Table, TableType, Tags};

const SCHEMA_ORDER: &[Field] = &[Field::Comment, Field::Owner, Field::Tags];

const TABLE_ORDER: &[Field] = &[
    Field::Comment,
    Field::Owner,
    Field::Tags,
    Field::PrimaryKey,
    Field::ForeignKeys,
    Field::TableType,
];

const COLUMN_ORDER: &[Field] = &[Field::DataType, Field::Comment, Field::Nullable, Field::Tags];

/// Quotes an identifier with back-ticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a string literal, escaping embedded single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}

/// Fully qualified `catalog.schema` reference.
#[must_use]
pub fn schema_ref(catalog: &str, schema: &str) -> String {
    format!("{}.{}", quote_identifier(catalog), quote_identifier(schema))
}

/// Fully qualified `catalog.schema.table` reference.
#[must_use]
pub fn table_ref(catalog: &str, schema: &str, table: &str) -> String {
    format!(
        "{}.{}.{}",
        quote_identifier(catalog),
        quote_identifier(schema),
        quote_identifier(table)
    )
}

/// Generates a column definition: `` `name` TYPE [NOT NULL] [COMMENT '...'] ``.
#[must_use]
pub fn column_definition(column: &Column) -> String {
    let mut parts = vec![quote_identifier(&column.name), column.data_type.clone()];
    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
        parts.push(format!("COMMENT {}", quote_literal(comment)));
    }
    parts.join(" ")
}

fn quoted_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn tag_pairs<'t>(tags: impl IntoIterator<Item = (&'t String, &'t String)>) -> String {
    let items: Vec<String> = tags
        .into_iter()
        .map(|(k, v)| format!("{} = {}", quote_literal(k), quote_literal(v)))
        .collect();
    format!("({})", items.join(", "))
}

/// Generates SET TAGS / UNSET TAGS statements for `prefix`.
///
/// Keys missing live or carrying a different value are set; live keys absent
/// from `target` are unset. SET comes before UNSET.
#[must_use]
pub fn tag_statements(prefix: &str, target: &Tags, current: &Tags) -> Vec<String> {
    let to_set: Vec<(&String, &String)> = target
        .iter()
        .filter(|(k, v)| current.get(*k) != Some(*v))
        .collect();
    let to_unset: Vec<String> = current
        .keys()
        .filter(|k| !target.contains_key(*k))
        .map(|k| quote_literal(k))
        .collect();

    let mut stmts = Vec::new();
    if !to_set.is_empty() {
        stmts.push(format!("{prefix} SET TAGS {};", tag_pairs(to_set)));
    }
    if !to_unset.is_empty() {
        stmts.push(format!("{prefix} UNSET TAGS ({});", to_unset.join(", ")));
    }
    stmts
}

/// Yields `changes` grouped by `order`.
fn in_order<'c>(
    changes: &'c [FieldChange],
    order: &'static [Field],
) -> impl Iterator<Item = &'c FieldChange> {
    order
        .iter()
        .flat_map(move |field| changes.iter().filter(move |c| c.field() == *field))
}

fn describe_table_type(table_type: Option<TableType>) -> &'static str {
    table_type.as_ref().map_or("unset", TableType::as_str)
}

/// Generates DDL for one catalog.
#[derive(Debug, Clone)]
pub struct DdlGenerator<'a> {
    catalog: &'a str,
    allow_drop: bool,
}

impl<'a> DdlGenerator<'a> {
    /// Creates a generator for `catalog` with drops disabled.
    #[must_use]
    pub fn new(catalog: &'a str) -> Self {
        Self {
            catalog,
            allow_drop: false,
        }
    }

    /// Controls whether destructive statements are emitted live.
    #[must_use]
    pub fn allow_drop(mut self, allow_drop: bool) -> Self {
        self.allow_drop = allow_drop;
        self
    }

    /// Passes a destructive statement through the drop gate.
    fn gated(&self, stmt: String) -> String {
        if self.allow_drop {
            stmt
        } else {
            format!("-- {stmt}")
        }
    }

    /// Generates the statements for a schema diff.
    ///
    /// `declared` is required to expand removed (to-be-created) and modified
    /// schemas; without it only the schema-level statements are produced.
    #[must_use]
    pub fn schema_statements(&self, diff: &SchemaDiff, declared: Option<&Schema>) -> Vec<String> {
        let sref = schema_ref(self.catalog, &diff.name);
        match diff.status {
            DiffStatus::Unchanged => Vec::new(),
            DiffStatus::Removed => self.create_schema(&diff.name, declared),
            DiffStatus::Added => vec![self.gated(format!("DROP SCHEMA {sref} CASCADE;"))],
            DiffStatus::Modified => {
                let mut stmts = Vec::new();
                for change in in_order(&diff.changes, SCHEMA_ORDER) {
                    match change {
                        FieldChange::Comment(c) => stmts.push(match &c.target {
                            Some(comment) => {
                                format!("COMMENT ON SCHEMA {sref} IS {};", quote_literal(comment))
                            }
                            None => format!("COMMENT ON SCHEMA {sref} IS NULL;"),
                        }),
                        FieldChange::Owner(c) => {
                            if let Some(owner) = &c.target {
                                stmts.push(format!(
                                    "ALTER SCHEMA {sref} SET OWNER TO {};",
                                    quote_identifier(owner)
                                ));
                            }
                        }
                        FieldChange::Tags(c) => stmts.extend(tag_statements(
                            &format!("ALTER SCHEMA {sref}"),
                            &c.target,
                            &c.current,
                        )),
                        _ => {}
                    }
                }
                for table_diff in &diff.tables {
                    let table = declared.and_then(|s| s.get_table(&table_diff.name));
                    stmts.extend(self.table_statements(&diff.name, table_diff, table));
                }
                stmts
            }
        }
    }

    fn create_schema(&self, name: &str, declared: Option<&Schema>) -> Vec<String> {
        let sref = schema_ref(self.catalog, name);
        let mut stmts = vec![format!("CREATE SCHEMA IF NOT EXISTS {sref};")];
        let Some(schema) = declared else {
            return stmts;
        };
        if let Some(comment) = schema.comment.as_deref().filter(|c| !c.is_empty()) {
            stmts.push(format!("COMMENT ON SCHEMA {sref} IS {};", quote_literal(comment)));
        }
        if let Some(owner) = schema.owner.as_deref().filter(|o| !o.is_empty()) {
            stmts.push(format!(
                "ALTER SCHEMA {sref} SET OWNER TO {};",
                quote_identifier(owner)
            ));
        }
        if !schema.tags.is_empty() {
            stmts.push(format!("ALTER SCHEMA {sref} SET TAGS {};", tag_pairs(&schema.tags)));
        }
        for table in &schema.tables {
            stmts.extend(self.create_table(name, table));
        }
        stmts
    }

    /// CREATE TABLE with inline columns, followed by owner and tags.
    fn create_table(&self, schema: &str, table: &Table) -> Vec<String> {
        let tref = table_ref(self.catalog, schema, &table.name);
        let columns: Vec<String> = table.columns.iter().map(column_definition).collect();
        let mut create = format!("CREATE TABLE IF NOT EXISTS {tref} ({})", columns.join(", "));
        if let Some(comment) = table.comment.as_deref().filter(|c| !c.is_empty()) {
            create.push_str(&format!(" COMMENT {}", quote_literal(comment)));
        }
        create.push(';');

        let mut stmts = vec![create];
        if let Some(owner) = table.owner.as_deref().filter(|o| !o.is_empty()) {
            stmts.push(format!(
                "ALTER TABLE {tref} SET OWNER TO {};",
                quote_identifier(owner)
            ));
        }
        if !table.tags.is_empty() {
            stmts.push(format!("ALTER TABLE {tref} SET TAGS {};", tag_pairs(&table.tags)));
        }
        stmts
    }

    fn table_statements(
        &self,
        schema: &str,
        diff: &TableDiff,
        declared: Option<&Table>,
    ) -> Vec<String> {
        let tref = table_ref(self.catalog, schema, &diff.name);
        match diff.status {
            DiffStatus::Unchanged => Vec::new(),
            DiffStatus::Removed => match declared {
                Some(table) => self.create_table(schema, table),
                None => {
                    warn!(table = %diff.name, "declared table not found, skipping create");
                    Vec::new()
                }
            },
            DiffStatus::Added => vec![self.gated(format!("DROP TABLE {tref};"))],
            DiffStatus::Modified => {
                let mut stmts = Vec::new();
                for change in in_order(&diff.changes, TABLE_ORDER) {
                    match change {
                        FieldChange::Comment(c) => stmts.push(match &c.target {
                            Some(comment) => {
                                format!("COMMENT ON TABLE {tref} IS {};", quote_literal(comment))
                            }
                            None => format!("COMMENT ON TABLE {tref} IS NULL;"),
                        }),
                        FieldChange::Owner(c) => {
                            if let Some(owner) = &c.target {
                                stmts.push(format!(
                                    "ALTER TABLE {tref} SET OWNER TO {};",
                                    quote_identifier(owner)
                                ));
                            }
                        }
                        FieldChange::Tags(c) => stmts.extend(tag_statements(
                            &format!("ALTER TABLE {tref}"),
                            &c.target,
                            &c.current,
                        )),
                        FieldChange::PrimaryKey(c) => {
                            stmts.extend(primary_key_statements(&tref, &diff.name, c));
                        }
                        FieldChange::ForeignKeys(c) => {
                            stmts.extend(self.foreign_key_statements(&tref, &diff.name, c));
                        }
                        FieldChange::TableType(c) => stmts.push(format!(
                            "-- unsupported change: table_type {} -> {}",
                            describe_table_type(c.current),
                            describe_table_type(c.target)
                        )),
                        _ => {}
                    }
                }
                for column_diff in &diff.columns {
                    let column = declared.and_then(|t| t.get_column(&column_diff.name));
                    stmts.extend(self.column_statements(&tref, column_diff, column));
                }
                stmts
            }
        }
    }

    fn column_statements(
        &self,
        tref: &str,
        diff: &ColumnDiff,
        declared: Option<&Column>,
    ) -> Vec<String> {
        let col = quote_identifier(&diff.name);
        match diff.status {
            DiffStatus::Unchanged => Vec::new(),
            DiffStatus::Removed => match declared {
                Some(column) => vec![format!(
                    "ALTER TABLE {tref} ADD COLUMN {};",
                    column_definition(column)
                )],
                None => {
                    warn!(column = %diff.name, "declared column not found, skipping add");
                    Vec::new()
                }
            },
            DiffStatus::Added => vec![self.gated(format!("ALTER TABLE {tref} DROP COLUMN {col};"))],
            DiffStatus::Modified => {
                let prefix = format!("ALTER TABLE {tref} ALTER COLUMN {col}");
                let mut stmts = Vec::new();
                for change in in_order(&diff.changes, COLUMN_ORDER) {
                    match change {
                        FieldChange::DataType(c) => {
                            stmts.push(format!("{prefix} TYPE {};", c.target));
                        }
                        FieldChange::Comment(c) => stmts.push(match &c.target {
                            Some(comment) => format!("{prefix} COMMENT {};", quote_literal(comment)),
                            None => format!("{prefix} COMMENT NULL;"),
                        }),
                        FieldChange::Nullable(c) => stmts.push(if c.target {
                            format!("{prefix} DROP NOT NULL;")
                        } else {
                            format!("{prefix} SET NOT NULL;")
                        }),
                        FieldChange::Tags(c) => {
                            stmts.extend(tag_statements(&prefix, &c.target, &c.current));
                        }
                        _ => {}
                    }
                }
                stmts
            }
        }
    }

    /// Reconciles foreign keys by column set: live keys whose column set is
    /// not declared are dropped, then declared keys whose column set is not
    /// live are added. Keys present on both sides are left alone.
    fn foreign_key_statements(
        &self,
        tref: &str,
        table: &str,
        change: &Change<Vec<ForeignKey>>,
    ) -> Vec<String> {
        let target = foreign_keys_by_column_set(&change.target);
        let current = foreign_keys_by_column_set(&change.current);
        let mut stmts = Vec::new();

        let mut seen = BTreeSet::new();
        for fk in &change.current {
            let key = fk.column_set();
            if !seen.insert(key.clone()) {
                continue;
            }
            match target.get(&key) {
                None => stmts.push(format!(
                    "ALTER TABLE {tref} DROP FOREIGN KEY IF EXISTS ({});",
                    quoted_list(&fk.columns)
                )),
                Some(declared) if !declared.same_definition(fk) => warn!(
                    table,
                    columns = %fk.columns.join(", "),
                    "foreign key reference differs on matched columns, not reconciled"
                ),
                Some(_) => {}
            }
        }

        seen.clear();
        for fk in &change.target {
            let key = fk.column_set();
            if !seen.insert(key.clone()) || current.contains_key(&key) {
                continue;
            }
            let name = fk
                .name
                .clone()
                .unwrap_or_else(|| format!("fk_{table}_{}", fk.columns.join("_")));
            stmts.push(format!(
                "ALTER TABLE {tref} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
                quote_identifier(&name),
                quoted_list(&fk.columns),
                table_ref(self.catalog, &fk.ref_schema, &fk.ref_table),
                quoted_list(&fk.ref_columns)
            ));
        }

        stmts
    }
}

/// Drops the live primary key (if any), then adds the declared one (if any).
fn primary_key_statements(
    tref: &str,
    table: &str,
    change: &Change<Option<PrimaryKey>>,
) -> Vec<String> {
    let mut stmts = Vec::new();
    if change.current.is_some() {
        stmts.push(format!("ALTER TABLE {tref} DROP PRIMARY KEY IF EXISTS;"));
    }
    if let Some(pk) = &change.target {
        let name = pk.name.clone().unwrap_or_else(|| format!("pk_{table}"));
        stmts.push(format!(
            "ALTER TABLE {tref} ADD CONSTRAINT {} PRIMARY KEY ({});",
            quote_identifier(&name),
            quoted_list(&pk.columns)
        ));
    }
    stmts
}

/// Generates SQL that brings the live schema in line with the declared one.
///
/// Statements are separated by newlines. `declared` is the declared schema
/// and is needed for removed and modified diffs.
#[must_use]
pub fn schema_diff_to_sql(
    catalog: &str,
    diff: &SchemaDiff,
    declared: Option<&Schema>,
    allow_drop: bool,
) -> String {
    DdlGenerator::new(catalog)
        .allow_drop(allow_drop)
        .schema_statements(diff, declared)
        .join("\n")
}
