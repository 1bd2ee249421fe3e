//! Catalog-level reconciliation.
//!
//! Matches declared schemas against the schemas of a live catalog by name,
//! classifies catalog-level additions and removals, and runs the differ and
//! the DDL generator over every pair.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::ddl::DdlGenerator;
use crate::diff::{diff_schema, CatalogDiff, DiffOptions, SchemaDiff};
use crate::model::{Catalog, Schema};

/// Schema created by the platform in every catalog.
pub const DEFAULT_SCHEMA: &str = "default";

/// Options for catalog reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Live schemas never reported as added.
    pub ignore_added: BTreeSet<String>,
    /// Also compare ownership metadata.
    pub include_metadata: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            ignore_added: BTreeSet::from([DEFAULT_SCHEMA.to_string()]),
            include_metadata: false,
        }
    }
}

impl ReconcileOptions {
    /// Creates default options: `default` is ignored, metadata is excluded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set of ignored live-only schemas.
    #[must_use]
    pub fn ignore_added<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.ignore_added = names.into_iter().map(Into::into).collect();
        self
    }

    /// Includes ownership metadata in the comparison.
    #[must_use]
    pub fn with_metadata(mut self) -> Self {
        self.include_metadata = true;
        self
    }

    fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            include_metadata: self.include_metadata,
        }
    }
}

/// Generated SQL for one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSql {
    /// Schema name.
    pub schema: String,
    /// Newline-separated statements.
    pub sql: String,
}

/// Pairs every schema diff with its declared schema, if any.
///
/// Declared schemas come first in declared order, then live-only schemas in
/// live order.
fn reconcile<'d>(
    live: &Catalog,
    declared: &'d [Schema],
    options: &ReconcileOptions,
) -> Vec<(SchemaDiff, Option<&'d Schema>)> {
    let live_map: HashMap<&str, &Schema> = live.schemas.iter().map(|s| (s.name.as_str(), s)).collect();
    let declared_names: BTreeSet<&str> = declared.iter().map(|s| s.name.as_str()).collect();
    let diff_options = options.diff_options();

    let mut pairs = Vec::new();
    for schema in declared {
        let diff = match live_map.get(schema.name.as_str()) {
            Some(live_schema) => diff_schema(live_schema, schema, &diff_options),
            None => {
                debug!(schema = %schema.name, "declared schema missing from catalog");
                SchemaDiff::removed(&schema.name)
            }
        };
        pairs.push((diff, Some(schema)));
    }

    for name in live.schema_names() {
        if declared_names.contains(name) {
            continue;
        }
        if options.ignore_added.contains(name) {
            debug!(schema = %name, "ignoring undeclared schema");
            continue;
        }
        debug!(schema = %name, "catalog schema has no declaration");
        pairs.push((SchemaDiff::added(name), None));
    }

    pairs
}

/// Compares a live catalog against declared schemas.
#[must_use]
pub fn diff_catalog(live: &Catalog, declared: &[Schema], options: &ReconcileOptions) -> CatalogDiff {
    let schemas: Vec<SchemaDiff> = reconcile(live, declared, options)
        .into_iter()
        .map(|(diff, _)| diff)
        .collect();
    let diff = CatalogDiff {
        catalog: live.name.clone(),
        schemas,
    };
    info!(
        catalog = %diff.catalog,
        changes = diff.change_count(),
        "compared catalog against declared schemas"
    );
    diff
}

/// Generates SQL for every schema whose live state differs from its
/// declaration. Schemas without statements are omitted.
#[must_use]
pub fn generate_sql(
    live: &Catalog,
    declared: &[Schema],
    options: &ReconcileOptions,
    allow_drop: bool,
) -> Vec<SchemaSql> {
    let generator = DdlGenerator::new(&live.name).allow_drop(allow_drop);
    reconcile(live, declared, options)
        .into_iter()
        .filter(|(diff, _)| diff.has_changes())
        .filter_map(|(diff, schema)| {
            let stmts = generator.schema_statements(&diff, schema);
            if stmts.is_empty() {
                return None;
            }
            debug!(schema = %diff.name, statements = stmts.len(), "generated schema SQL");
            Some(SchemaSql {
                schema: diff.name,
                sql: stmts.join("\n"),
            })
        })
        .collect()
}
