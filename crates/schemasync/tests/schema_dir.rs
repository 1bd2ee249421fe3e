//! Integration tests for declared-directory loading and writing.

use std::collections::BTreeSet;
use std::fs;

use schemasync::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Format detection
// =============================================================================

#[test]
fn detects_yaml_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.yaml"), "name: main\n").unwrap();
    fs::write(dir.path().join("README.md"), "docs").unwrap();
    assert_eq!(detect_format(dir.path()).unwrap(), Format::Yaml);
}

#[test]
fn detects_json_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.json"), r#"{"name": "main"}"#).unwrap();
    assert_eq!(detect_format(dir.path()).unwrap(), Format::Json);
}

#[test]
fn mixed_formats_are_a_usage_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.yaml"), "name: a\n").unwrap();
    fs::write(dir.path().join("b.json"), r#"{"name": "b"}"#).unwrap();
    let err = detect_format(dir.path()).unwrap_err();
    assert!(matches!(err, SyncError::MixedFormats(_)));
    assert!(err.is_usage());
}

#[test]
fn empty_directory_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let err = detect_format(dir.path()).unwrap_err();
    assert!(matches!(err, SyncError::NoSchemaFiles(_)));
    assert!(err.is_usage());
}

#[test]
fn missing_directory_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let err = detect_format(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, SyncError::NotADirectory(_)));
    assert!(err.is_usage());
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn loads_in_file_name_order_with_filter() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("zeta.yaml"), "name: zeta\n").unwrap();
    fs::write(dir.path().join("alpha.yaml"), "name: alpha\ncomment: First\n").unwrap();
    fs::write(dir.path().join("mid.yaml"), "name: mid\n").unwrap();

    let all = load_schema_dir(dir.path(), Format::Yaml, None).unwrap();
    let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    assert_eq!(all[0].comment.as_deref(), Some("First"));

    let only: BTreeSet<String> = ["zeta".to_string(), "alpha".to_string()].into();
    let some = load_schema_dir(dir.path(), Format::Yaml, Some(&only)).unwrap();
    let names: Vec<&str> = some.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[test]
fn malformed_file_reports_its_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("good.yaml"), "name: good\n").unwrap();
    fs::write(dir.path().join("bad.yaml"), "tables: [unclosed\n").unwrap();

    let err = load_schema_dir(dir.path(), Format::Yaml, None).unwrap_err();
    match err {
        SyncError::ParseError { path, .. } => assert!(path.ends_with("bad.yaml")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn duplicate_schema_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.yaml"), "name: main\n").unwrap();
    fs::write(dir.path().join("b.yaml"), "name: main\n").unwrap();

    let err = load_schema_dir(dir.path(), Format::Yaml, None).unwrap_err();
    match err {
        SyncError::DuplicateSchema { name, first, second } => {
            assert_eq!(name, "main");
            assert!(first.ends_with("a.yaml"));
            assert!(second.ends_with("b.yaml"));
        }
        other => panic!("expected duplicate schema, got {other:?}"),
    }
}

// =============================================================================
// Writing
// =============================================================================

#[test]
fn written_directory_loads_back() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("schemas");
    let schemas = vec![
        Schema::new("sales")
            .tag("env", "prod")
            .table(Table::new("orders").column(Column::new("id", "BIGINT").not_null())),
        Schema::new("staging"),
    ];

    let written = write_schema_dir(&out, &schemas, Format::Json).unwrap();
    assert_eq!(written.len(), 2);
    assert!(out.join("sales.json").is_file());

    assert_eq!(detect_format(&out).unwrap(), Format::Json);
    assert_eq!(load_schema_dir(&out, Format::Json, None).unwrap(), schemas);
}

// =============================================================================
// End to end against a snapshot
// =============================================================================

#[test]
fn declared_directory_against_snapshot() {
    let snapshots = TempDir::new().unwrap();
    let live = Catalog::new("prod")
        .schema(Schema::new("default"))
        .schema(Schema::new("information_schema"))
        .schema(
            Schema::new("main")
                .table(Table::new("users").column(Column::new("id", "BIGINT").not_null())),
        );
    fs::write(
        snapshots.path().join("prod.yaml"),
        schemasync::format::catalog_to_string(&live, Format::Yaml).unwrap(),
    )
    .unwrap();

    let declared_dir = TempDir::new().unwrap();
    let declared = Schema::new("main").table(
        Table::new("users")
            .column(Column::new("id", "BIGINT").not_null())
            .column(Column::new("email", "STRING")),
    );
    write_schema_dir(declared_dir.path(), &[declared], Format::Yaml).unwrap();

    let source = SnapshotSource::new(snapshots.path());
    let live = source.extract_catalog("prod", &ExtractOptions::new()).unwrap();
    let format = detect_format(declared_dir.path()).unwrap();
    let declared = load_schema_dir(declared_dir.path(), format, None).unwrap();

    let out = generate_sql(&live, &declared, &ReconcileOptions::new(), false);
    assert_eq!(
        out,
        vec![SchemaSql {
            schema: "main".to_string(),
            sql: "ALTER TABLE `prod`.`main`.`users` ADD COLUMN `email` STRING;".to_string(),
        }]
    );

    let report = render_diff(&diff_catalog(&live, &declared, &ReconcileOptions::new()));
    assert_eq!(
        report,
        "~ Schema: main [MODIFIED]\n  ~ Table: users [MODIFIED]\n    - Column: email [REMOVED]\n"
    );
}
