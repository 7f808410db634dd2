//! Scene Property CLI
//!
//! Entry point for the `scene-property` command-line tool.

use clap::{Parser, Subcommand};
use dataset_store::{DatasetFixture, DatasetStore};
use scene_property::config::{EffectiveConfig, PROJECT_CONFIG_FILE};
use scene_property::ids::DatasetId;
use scene_property::property::{Pointer, Property};
use scene_property::view::{FieldView, MergedPropertyView};
use scene_property::{CancelToken, MergeEngine, MergeInput, Schema};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "scene-property")]
#[command(about = "Resolve and merge scene layer properties", version)]
struct Cli {
    /// Project config file (default: ./.scene-property.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a property with its parent and print the merged tree as JSON
    Merge {
        /// Schema JSON file
        #[arg(long, short = 's')]
        schema: PathBuf,

        /// Property of the layer itself
        #[arg(long, short = 'o')]
        original: Option<PathBuf>,

        /// Property of the enclosing group
        #[arg(long, short = 'p')]
        parent: Option<PathBuf>,

        /// Dataset fixture to resolve links against
        #[arg(long, short = 'd')]
        datasets: Option<PathBuf>,

        /// Dataset row the merged property is bound to
        #[arg(long)]
        row: Option<String>,

        /// Resolver worker threads
        #[arg(long)]
        workers: Option<u64>,

        /// Resolve timeout in milliseconds (0 disables)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum link chain depth
        #[arg(long)]
        max_depth: Option<u64>,
    },

    /// Print the field a pointer addresses
    Get {
        /// Property JSON file
        property: PathBuf,

        /// Pointer, e.g. `default/title` or `tiles[01H...]/tile_opacity`
        pointer: String,
    },

    /// Schema commands
    Schema {
        #[command(subcommand)]
        action: SchemaCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Validate schema files
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration with its sources
    Show,
}

fn main() {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Merge {
            workers,
            timeout_ms,
            max_depth,
            ..
        } => cli_overrides(*workers, *timeout_ms, *max_depth),
        _ => None,
    };
    let config = match load_config(cli.config.as_deref(), overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    init_logging(config.get_str("log.filter").unwrap_or("warn"));

    match cli.command {
        Commands::Merge {
            schema,
            original,
            parent,
            datasets,
            row,
            ..
        } => run_merge(&config, &schema, original, parent, datasets, row),
        Commands::Get { property, pointer } => run_get(&property, &pointer),
        Commands::Schema { action } => match action {
            SchemaCommands::Check { files } => run_schema_check(&files),
        },
        Commands::Config { action } => match action {
            ConfigCommands::Show => run_config_show(&config),
        },
    }
}

/// `RUST_LOG` wins over the configured filter
fn init_logging(configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cli_overrides(workers: Option<u64>, timeout_ms: Option<u64>, max_depth: Option<u64>) -> Option<serde_json::Value> {
    let mut table = serde_json::Map::new();
    if let Some(n) = workers {
        table.insert("worker_threads".to_string(), n.into());
    }
    if let Some(ms) = timeout_ms {
        table.insert("resolve_timeout_ms".to_string(), ms.into());
    }
    if let Some(depth) = max_depth {
        table.insert("max_link_depth".to_string(), depth.into());
    }
    (!table.is_empty()).then_some(serde_json::Value::Object(table))
}

fn load_config(project: Option<&Path>, overrides: Option<serde_json::Value>) -> Result<EffectiveConfig, String> {
    let user = EffectiveConfig::default_user_path();
    let project = project
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    EffectiveConfig::build(user.as_deref(), Some(&project), overrides).map_err(|e| e.to_string())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&contents).map_err(|e| format!("{}: {}", path.display(), e))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn run_merge(
    config: &EffectiveConfig,
    schema_path: &Path,
    original: Option<PathBuf>,
    parent: Option<PathBuf>,
    datasets: Option<PathBuf>,
    row: Option<String>,
) {
    let engine_config = config.engine().unwrap_or_else(|e| fail(e));
    let schema = fs::read_to_string(schema_path)
        .map_err(|e| format!("{}: {}", schema_path.display(), e))
        .and_then(|json| Schema::from_json(&json).map_err(|e| format!("{}: {}", schema_path.display(), e)))
        .unwrap_or_else(|e| fail(e));

    let load = |path: Option<PathBuf>| -> Option<Property> {
        path.map(|p| read_json::<Property>(&p).unwrap_or_else(|e| fail(e)))
    };
    let original = load(original);
    let parent = load(parent);

    let store = match datasets {
        Some(path) => fs::read_to_string(&path)
            .map_err(|e| format!("{}: {}", path.display(), e))
            .and_then(|json| {
                DatasetFixture::from_json(&json)
                    .and_then(DatasetFixture::into_store)
                    .map_err(|e| format!("{}: {}", path.display(), e))
            })
            .unwrap_or_else(|e| fail(e)),
        None => DatasetStore::new(),
    };

    let cancel = CancelToken::new();
    if let Err(e) = cancel.install_signal_handler() {
        tracing::warn!(error = %e, "could not install signal handler");
    }

    let row = row.map(DatasetId::new);
    let input = MergeInput::new(original.as_ref(), parent.as_ref())
        .with_context(row.as_ref())
        .with_schema(Some(&schema));
    let merged = MergeEngine::from_config(&store, &engine_config)
        .merge(input, &cancel)
        .unwrap_or_else(|e| fail(format!("[{}] {}", e.code().as_str(), e)));

    match merged {
        Some(merged) => match MergedPropertyView::new(&merged).to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        },
        None => println!("null"),
    }
}

fn run_get(property_path: &Path, pointer: &str) {
    let property: Property = read_json(property_path).unwrap_or_else(|e| fail(e));
    let pointer: Pointer = pointer.parse().unwrap_or_else(|e| fail(e));
    let field = property
        .get(&pointer)
        .unwrap_or_else(|e| fail(format!("[{}] {}", e.code().as_str(), e)));
    match serde_json::to_string_pretty(&FieldView::new(&property, &pointer, field)) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

fn run_schema_check(files: &[PathBuf]) {
    let mut failed = 0;
    for path in files {
        let result = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| Schema::from_json(&json).map_err(|e| e.to_string()));
        match result {
            Ok(schema) => println!("{}: ok ({}, {} groups)", path.display(), schema.id(), schema.groups().len()),
            Err(e) => {
                println!("{}: {}", path.display(), e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        process::exit(1);
    }
}

fn run_config_show(config: &EffectiveConfig) {
    match config.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}
