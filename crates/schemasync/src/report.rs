//! Human-readable diff report.

use std::fmt::Write;

use schemasync_core::diff::{CatalogDiff, DiffStatus, FieldChange};
use schemasync_core::model::{ForeignKey, PrimaryKey, Tags};

fn marker(status: DiffStatus) -> char {
    match status {
        DiffStatus::Added => '+',
        DiffStatus::Removed => '-',
        DiffStatus::Modified | DiffStatus::Unchanged => '~',
    }
}

fn describe_text(value: Option<&str>) -> String {
    value.map_or_else(|| "unset".to_string(), |v| format!("'{v}'"))
}

fn describe_columns(columns: &[String]) -> String {
    format!("({})", columns.join(", "))
}

fn describe_primary_key(key: Option<&PrimaryKey>) -> String {
    match key {
        None => "unset".to_string(),
        Some(key) => {
            let columns = describe_columns(&key.columns);
            match &key.name {
                Some(name) => format!("{name} {columns}"),
                None => columns,
            }
        }
    }
}

fn describe_foreign_keys(keys: &[ForeignKey]) -> String {
    let keys: Vec<String> = keys
        .iter()
        .map(|fk| {
            format!(
                "{} -> {}.{} {}",
                describe_columns(&fk.columns),
                fk.ref_schema,
                fk.ref_table,
                describe_columns(&fk.ref_columns)
            )
        })
        .collect();
    format!("[{}]", keys.join(", "))
}

fn describe_tags(tags: &Tags) -> String {
    let pairs: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Renders one field change as `field: target -> current`.
#[must_use]
pub fn describe_change(change: &FieldChange) -> String {
    let (target, current) = match change {
        FieldChange::TableType(c) => (
            c.target.map_or_else(|| "unset".to_string(), |t| t.to_string()),
            c.current.map_or_else(|| "unset".to_string(), |t| t.to_string()),
        ),
        FieldChange::DataType(c) => (c.target.clone(), c.current.clone()),
        FieldChange::Comment(c) | FieldChange::Owner(c) => (
            describe_text(c.target.as_deref()),
            describe_text(c.current.as_deref()),
        ),
        FieldChange::Nullable(c) => (c.target.to_string(), c.current.to_string()),
        FieldChange::PrimaryKey(c) => (
            describe_primary_key(c.target.as_ref()),
            describe_primary_key(c.current.as_ref()),
        ),
        FieldChange::ForeignKeys(c) => (
            describe_foreign_keys(&c.target),
            describe_foreign_keys(&c.current),
        ),
        FieldChange::Tags(c) => (describe_tags(&c.target), describe_tags(&c.current)),
    };
    format!("{}: {target} -> {current}", change.field())
}

fn push_node(out: &mut String, depth: usize, kind: &str, name: &str, status: DiffStatus) {
    let _ = writeln!(
        out,
        "{:indent$}{} {kind}: {name} [{}]",
        "",
        marker(status),
        status.as_str().to_uppercase(),
        indent = depth * 2
    );
}

fn push_changes(out: &mut String, depth: usize, changes: &[FieldChange]) {
    for change in changes {
        let _ = writeln!(
            out,
            "{:indent$}{}",
            "",
            describe_change(change),
            indent = depth * 2 + 4
        );
    }
}

/// Renders a catalog diff as an indented report.
///
/// Unchanged schemas are left out. Returns an empty string when nothing
/// differs.
#[must_use]
pub fn render_diff(diff: &CatalogDiff) -> String {
    let mut out = String::new();
    for schema in diff.schemas.iter().filter(|s| s.has_changes()) {
        push_node(&mut out, 0, "Schema", &schema.name, schema.status);
        push_changes(&mut out, 0, &schema.changes);
        for table in &schema.tables {
            push_node(&mut out, 1, "Table", &table.name, table.status);
            push_changes(&mut out, 1, &table.changes);
            for column in &table.columns {
                push_node(&mut out, 2, "Column", &column.name, column.status);
                push_changes(&mut out, 2, &column.changes);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::diff::{Change, ColumnDiff, SchemaDiff, TableDiff};
    use schemasync_core::model::TableType;

    #[test]
    fn test_empty_report() {
        let diff = CatalogDiff {
            catalog: "prod".to_string(),
            schemas: vec![SchemaDiff {
                name: "main".to_string(),
                status: DiffStatus::Unchanged,
                changes: Vec::new(),
                tables: Vec::new(),
            }],
        };
        assert_eq!(render_diff(&diff), "");
    }

    #[test]
    fn test_nested_report() {
        let diff = CatalogDiff {
            catalog: "prod".to_string(),
            schemas: vec![
                SchemaDiff {
                    name: "sales".to_string(),
                    status: DiffStatus::Modified,
                    changes: vec![FieldChange::Comment(Change {
                        target: Some("Sales".to_string()),
                        current: None,
                    })],
                    tables: vec![
                        TableDiff::removed("refunds"),
                        TableDiff {
                            name: "orders".to_string(),
                            status: DiffStatus::Modified,
                            changes: Vec::new(),
                            columns: vec![
                                ColumnDiff::added("legacy"),
                                ColumnDiff {
                                    name: "id".to_string(),
                                    status: DiffStatus::Modified,
                                    changes: vec![FieldChange::Nullable(Change {
                                        target: false,
                                        current: true,
                                    })],
                                },
                            ],
                        },
                    ],
                },
                SchemaDiff::added("tmp"),
            ],
        };

        let expected = "\
~ Schema: sales [MODIFIED]
    comment: 'Sales' -> unset
  - Table: refunds [REMOVED]
  ~ Table: orders [MODIFIED]
    + Column: legacy [ADDED]
    ~ Column: id [MODIFIED]
        nullable: false -> true
+ Schema: tmp [ADDED]
";
        assert_eq!(render_diff(&diff), expected);
    }

    #[test]
    fn test_describe_structural_changes() {
        let tags = FieldChange::Tags(Change {
            target: Tags::from([("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]),
            current: Tags::new(),
        });
        assert_eq!(describe_change(&tags), "tags: {a=1, b=2} -> {}");

        let pk = FieldChange::PrimaryKey(Change {
            target: Some(PrimaryKey::new(["id", "region"]).named("pk_t")),
            current: None,
        });
        assert_eq!(describe_change(&pk), "primary_key: pk_t (id, region) -> unset");

        let fks = FieldChange::ForeignKeys(Change {
            target: vec![ForeignKey::new(["customer_id"], "crm", "customers", ["id"])],
            current: Vec::new(),
        });
        assert_eq!(
            describe_change(&fks),
            "foreign_keys: [(customer_id) -> crm.customers (id)] -> []"
        );

        let kind = FieldChange::TableType(Change {
            target: Some(TableType::Managed),
            current: Some(TableType::External),
        });
        assert_eq!(describe_change(&kind), "table_type: MANAGED -> EXTERNAL");
    }
}
