//! Catalog-as-code: snapshot, diff and reconcile catalog schemas.
//!
//! This crate wraps [`schemasync_core`] with everything that touches the
//! outside world:
//!
//! - **Format** - YAML/JSON schema files and declared-directory loading
//! - **Source** - Where the live catalog comes from ([`source::CatalogSource`])
//! - **Report** - Human-readable rendering of a catalog diff
//!
//! # CLI Usage
//!
//! ```bash
//! # Snapshot a catalog into one file per schema
//! schemasync extract prod -o schemas/
//!
//! # Show drift between the catalog and the declared files
//! schemasync diff prod schemas/
//!
//! # Emit SQL that brings the catalog in line with the declared files
//! schemasync generate-sql prod schemas/ --allow-drop
//! ```

pub mod error;
pub mod format;
pub mod report;
pub mod source;

pub use error::{Result, SyncError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SyncError};
    pub use crate::format::{
        detect_format, load_schema_dir, schema_from_str, schema_to_string, write_schema_dir,
        Format,
    };
    pub use crate::report::render_diff;
    pub use crate::source::{strip_tags, CatalogSource, ExtractOptions, SnapshotSource};
    pub use schemasync_core::prelude::*;
}
