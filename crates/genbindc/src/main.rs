//! The genbind command-line driver.
//!
//! Provides the `genbindc` command with the following subcommands:
//!
//! - `genbindc close <catalog>` - Load a catalog, run a closing pass and
//!   print the registry operations it produced
//! - `genbindc check <catalog>` - Load and link a catalog, then print each
//!   component's dependencies and provider links
//!
//! Options:
//! - `--json` - Emit operations and diagnostics as JSON (one object per line)
//! - `--no-color` - Disable colorized diagnostics
//!
//! Log output goes to stderr and is filtered by `GENBIND_LOG`
//! (default `warn`).

mod diagnostics;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use genbind_catalog::{Catalog, CatalogError};
use genbind_engine::RegistryBuilder;

use diagnostics::{render_diagnostic, DiagnosticOptions};

#[derive(Parser)]
#[command(
    name = "genbindc",
    version,
    about = "Close open generic services over a type catalog"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a closing pass and print the resulting registry operations
    Close {
        /// Path to the catalog (TOML)
        catalog: PathBuf,

        /// Output operations and diagnostics as JSON (one object per line)
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
    /// Validate a catalog and print its provider links
    Check {
        /// Path to the catalog (TOML)
        catalog: PathBuf,

        /// Output diagnostics as JSON
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("GENBIND_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Close {
            catalog,
            json,
            no_color,
        } => close(&catalog, &diag_options(json, no_color)),
        Commands::Check {
            catalog,
            json,
            no_color,
        } => check(&catalog, &diag_options(json, no_color)),
    };
    if let Err(rendered) = result {
        eprint!("{}", rendered);
        if !rendered.ends_with('\n') {
            eprintln!();
        }
        process::exit(1);
    }
}

fn diag_options(json: bool, no_color: bool) -> DiagnosticOptions {
    DiagnosticOptions {
        color: !no_color && !json,
        json,
    }
}

/// Read the catalog source; the text is kept for rendering diagnostics.
fn load(path: &Path, opts: &DiagnosticOptions) -> Result<(Catalog, String), String> {
    let filename = path.display().to_string();
    debug!(catalog = %filename, "loading");
    let source = std::fs::read_to_string(path).map_err(|source| {
        let err = CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };
        render_diagnostic(&err, "", &filename, opts)
    })?;
    let catalog = Catalog::from_str(&source)
        .map_err(|e| render_diagnostic(&e, &source, &filename, opts))?;
    Ok((catalog, source))
}

/// Load, close and print: one line per registry operation, then a summary.
fn close(path: &Path, opts: &DiagnosticOptions) -> Result<(), String> {
    let (mut catalog, source) = load(path, opts)?;
    let mut sink = RegistryBuilder::new();
    let report = catalog
        .run(&mut sink)
        .map_err(|e| render_diagnostic(&e, &source, &path.display().to_string(), opts))?;

    if opts.json {
        for op in sink.operations() {
            println!("{}", to_json(op)?);
        }
        println!("{}", to_json(&serde_json::json!({ "summary": report }))?);
    } else {
        for op in sink.operations() {
            println!("{}", op);
        }
        println!(
            "closed {} type(s): {} pinned, {} duplicate(s), {} constraint skip(s)",
            report.stats.closed,
            report.stats.pinned,
            report.stats.duplicates,
            report.stats.constraint_skips
        );
    }
    Ok(())
}

/// Load and link only; print what each component depends on and provides to.
fn check(path: &Path, opts: &DiagnosticOptions) -> Result<(), String> {
    let (catalog, _) = load(path, opts)?;
    let graph = &catalog.graph;

    for component in graph.components() {
        let provides: Vec<String> = component
            .provider_links
            .iter()
            .map(|&dref| {
                let dep = graph.dependency(dref);
                format!("{} ({})", graph.get(dep.owner).open, dep)
            })
            .collect();
        let depends: Vec<String> = component
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect();

        if opts.json {
            let line = serde_json::json!({
                "component": component.open.to_string(),
                "dependencies": depends,
                "provides": provides,
            });
            println!("{}", to_json(&line)?);
        } else {
            println!("{}", component.open);
            for dep in &depends {
                println!("  needs {}", dep);
            }
            for target in &provides {
                println!("  provides to {}", target);
            }
        }
    }
    if !opts.json {
        println!(
            "{} type(s), {} component(s), {} demand(s)",
            catalog.universe.len(),
            graph.len(),
            catalog.demands.len()
        );
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("error: failed to encode output: {}", e))
}
