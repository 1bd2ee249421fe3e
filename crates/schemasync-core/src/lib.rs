//! Catalog-as-code core: structural diffing and DDL synthesis.
//!
//! `schemasync-core` compares the live state of a hierarchical data catalog
//! (catalogs, schemas, tables, columns, key constraints and tags) against a
//! declared state and emits the DDL that reconciles the two.
//!
//! # Architecture
//!
//! - **Model** - Plain entity records shared by every other component
//! - **Diff** - Compares two entity trees and produces a typed diff tree
//! - **DDL** - Turns a diff tree into ordered SQL statements
//! - **Reconcile** - Runs diff and DDL generation across a whole catalog
//!
//! Everything here is pure and synchronous. Fetching the live catalog,
//! loading declared files and writing SQL out are left to the caller.
//!
//! # Example
//!
//! ```rust
//! use schemasync_core::prelude::*;
//!
//! let live = Schema::new("main")
//!     .table(Table::new("users").column(Column::new("id", "BIGINT").not_null()));
//! let declared = Schema::new("main").table(
//!     Table::new("users")
//!         .column(Column::new("id", "BIGINT").not_null())
//!         .column(Column::new("email", "STRING")),
//! );
//!
//! let diff = diff_schema(&live, &declared, &DiffOptions::new());
//! let sql = schema_diff_to_sql("prod", &diff, Some(&declared), false);
//! assert_eq!(sql, "ALTER TABLE `prod`.`main`.`users` ADD COLUMN `email` STRING;");
//! ```

pub mod ddl;
pub mod diff;
pub mod model;
pub mod reconcile;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::ddl::{schema_diff_to_sql, DdlGenerator};
    pub use crate::diff::{
        diff_column, diff_schema, diff_table, CatalogDiff, Change, ColumnDiff, DiffOptions,
        DiffStatus, Field, FieldChange, SchemaDiff, TableDiff, Tracked,
    };
    pub use crate::model::{
        Catalog, Column, ColumnSet, ForeignKey, PrimaryKey, Schema, Table, TableType, Tags,
    };
    pub use crate::reconcile::{diff_catalog, generate_sql, ReconcileOptions, SchemaSql};
}
