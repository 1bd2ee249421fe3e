//! schemasync CLI
//!
//! Command-line tool for snapshotting catalog schemas and reconciling them
//! against declared files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use schemasync::prelude::*;

/// Catalog-as-code: snapshot, diff and reconcile catalog schemas.
#[derive(Parser)]
#[command(name = "schemasync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding catalog snapshots (`<catalog>.yaml` or `.json`).
    #[arg(long, env = "SCHEMASYNC_SNAPSHOT_DIR", default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract catalog schemas to YAML or JSON files.
    Extract {
        /// Catalog name.
        catalog: String,

        /// Schema to extract (repeatable, all if not specified).
        #[arg(short = 's', long = "schema")]
        schemas: Vec<String>,

        /// Output directory (prints the single matching schema if not specified).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Include owner, storage location and creation time.
        #[arg(long)]
        include_metadata: bool,

        /// Leave out tags.
        #[arg(long)]
        no_tags: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },

    /// Compare a catalog against declared schema files.
    Diff {
        /// Catalog name.
        catalog: String,

        /// Directory of declared schema files.
        schema_dir: PathBuf,

        /// Schema to compare (repeatable, all if not specified).
        #[arg(short = 's', long = "schema")]
        schemas: Vec<String>,

        /// Compare owners too.
        #[arg(long)]
        include_metadata: bool,

        /// Leave tags out of the comparison.
        #[arg(long)]
        no_tags: bool,
    },

    /// Generate SQL that brings a catalog in line with declared schema files.
    GenerateSql {
        /// Catalog name.
        catalog: String,

        /// Directory of declared schema files.
        schema_dir: PathBuf,

        /// Write one `<schema>.sql` file per schema here instead of printing.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Emit DROP statements for columns, tables and schemas uncommented.
        #[arg(long)]
        allow_drop: bool,

        /// Schema to reconcile (repeatable, all if not specified).
        #[arg(short = 's', long = "schema")]
        schemas: Vec<String>,

        /// Compare owners too.
        #[arg(long)]
        include_metadata: bool,

        /// Leave tags out of the comparison.
        #[arg(long)]
        no_tags: bool,
    },

    /// List available catalogs.
    ListCatalogs,

    /// List schemas in a catalog.
    ListSchemas {
        /// Catalog name.
        catalog: String,
    },
}

fn extract_options(schemas: &[String], include_metadata: bool, no_tags: bool) -> ExtractOptions {
    let mut options = ExtractOptions::new().schemas(schemas.iter().cloned());
    if include_metadata {
        options = options.with_metadata();
    }
    if no_tags {
        options = options.without_tags();
    }
    options
}

fn load_declared(dir: &Path, schemas: &[String], no_tags: bool) -> schemasync::Result<Vec<Schema>> {
    let format = detect_format(dir)?;
    let only: Option<BTreeSet<String>> =
        (!schemas.is_empty()).then(|| schemas.iter().cloned().collect());
    let mut declared = load_schema_dir(dir, format, only.as_ref())?;
    if no_tags {
        declared.iter_mut().for_each(strip_tags);
    }
    Ok(declared)
}

fn reconcile_options(include_metadata: bool) -> ReconcileOptions {
    let options = ReconcileOptions::new();
    if include_metadata {
        options.with_metadata()
    } else {
        options
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let source = SnapshotSource::new(&cli.snapshot_dir);

    match cli.command {
        Commands::Extract {
            catalog,
            schemas,
            output_dir,
            include_metadata,
            no_tags,
            format,
        } => {
            info!("Extracting catalog '{catalog}'...");
            let options = extract_options(&schemas, include_metadata, no_tags);
            let extracted = source.extract_catalog(&catalog, &options)?;

            match output_dir {
                None => {
                    let [schema] = extracted.schemas.as_slice() else {
                        return Err(SyncError::AmbiguousOutput(extracted.schemas.len()).into());
                    };
                    print!("{}", schema_to_string(schema, format)?);
                }
                Some(dir) => {
                    for path in write_schema_dir(&dir, &extracted.schemas, format)? {
                        info!("  Wrote {}", path.display());
                    }
                    info!(
                        "Done: {} schema(s) written to {}",
                        extracted.schemas.len(),
                        dir.display()
                    );
                }
            }
        }

        Commands::Diff {
            catalog,
            schema_dir,
            schemas,
            include_metadata,
            no_tags,
        } => {
            let declared = load_declared(&schema_dir, &schemas, no_tags)?;
            info!("Comparing catalog '{catalog}' against {}...", schema_dir.display());
            let live = source.extract_catalog(
                &catalog,
                &extract_options(&schemas, include_metadata, no_tags),
            )?;

            let diff = diff_catalog(&live, &declared, &reconcile_options(include_metadata));
            if !diff.has_changes() {
                println!("No differences found.");
                return Ok(ExitCode::SUCCESS);
            }
            print!("{}", render_diff(&diff));
            return Ok(ExitCode::FAILURE);
        }

        Commands::GenerateSql {
            catalog,
            schema_dir,
            output_dir,
            allow_drop,
            schemas,
            include_metadata,
            no_tags,
        } => {
            let declared = load_declared(&schema_dir, &schemas, no_tags)?;
            info!(
                "Generating SQL for catalog '{catalog}' against {}...",
                schema_dir.display()
            );
            let live = source.extract_catalog(
                &catalog,
                &extract_options(&schemas, include_metadata, no_tags),
            )?;

            let outputs = generate_sql(
                &live,
                &declared,
                &reconcile_options(include_metadata),
                allow_drop,
            );
            if outputs.is_empty() {
                println!("No differences found; no SQL generated.");
                return Ok(ExitCode::SUCCESS);
            }

            match output_dir {
                Some(dir) => {
                    fs::create_dir_all(&dir)?;
                    for output in &outputs {
                        let path = dir.join(format!("{}.sql", output.schema));
                        fs::write(&path, &output.sql)?;
                        info!("  Wrote {}", path.display());
                    }
                }
                None => {
                    for output in &outputs {
                        println!("-- Schema: {}", output.schema);
                        println!("{}", output.sql);
                        println!();
                    }
                }
            }
        }

        Commands::ListCatalogs => {
            for name in source.list_catalogs()? {
                println!("{name}");
            }
        }

        Commands::ListSchemas { catalog } => {
            for name in source.list_schemas(&catalog)? {
                println!("{name}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match run(cli) {
        Err(e) if e.downcast_ref::<SyncError>().is_some_and(SyncError::is_usage) => {
            error!("{e}");
            Ok(ExitCode::from(2))
        }
        other => other,
    }
}
