use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mockdb_api::json::{feed_to_json, record_to_json};
use mockdb_api::{Loader, LoaderConfig};
use mockdb_core::Record;
use mockdb_schema::{SchemaIndex, ServiceModel};
use mockdb_store::EntityStore;
use mockdb_synth::{Generator, GeneratorConfig};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mockdbctl", version, about = "mockdb CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Service model description (.json, .yaml or .yml)
    #[arg(long = "model", env = "MOCKDB_MODEL")]
    model: PathBuf,

    /// Directory holding `<Collection>.json` feeds
    #[arg(long = "data-dir", env = "MOCKDB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Generate records for collections without a data file
    #[arg(long = "generate-missing", action = ArgAction::SetTrue)]
    generate_missing: bool,

    /// Records generated per collection (default: MOCKDB_RECORD_COUNT or 50)
    #[arg(long = "records")]
    records: Option<usize>,

    /// Seed for boolean generation (default: MOCKDB_SEED, else random)
    #[arg(long = "seed")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// List declared collections with key fields and loaded record counts
    Collections,
    /// Print every record of a collection after loading
    Dump {
        /// Collection name, e.g. "Customers"
        collection: String,
    },
    /// Print the generated record for a single index
    Generate {
        /// Collection name, e.g. "Products"
        collection: String,
        /// 1-based record index
        #[arg(long = "index", default_value_t = 1)]
        index: u64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionRow<'a> {
    name: &'a str,
    entity_type: &'a str,
    key: &'a [String],
    records: usize,
}

fn init_tracing() {
    let env = std::env::var("MOCKDB_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("MOCKDB_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid MOCKDB_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_model(path: &Path) -> Result<ServiceModel> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading model {}", path.display()))?;
    let yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
    let model = if yaml {
        serde_yaml::from_str(&text).with_context(|| format!("parsing YAML model {}", path.display()))?
    } else {
        serde_json::from_str(&text).with_context(|| format!("parsing JSON model {}", path.display()))?
    };
    Ok(model)
}

fn generator_config(cli: &Cli) -> GeneratorConfig {
    let mut cfg = GeneratorConfig::from_env();
    if let Some(n) = cli.records {
        cfg.record_count = n;
    }
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    cfg
}

/// `key  Field=value Field=value`
fn render_record(key: &str, record: &Record) -> String {
    let fields: Vec<String> = record.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}  {}", key, fields.join(" "))
}

fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let model = load_model(&cli.model)?;
    let schema = Arc::new(SchemaIndex::build(model).context("building schema index")?);
    let generator = Generator::new(generator_config(&cli));
    info!(collections = schema.len(), model = %cli.model.display(), "model loaded");

    match &cli.command {
        Commands::Generate { collection, index } => {
            let c = schema.collection(collection)?;
            let record = generator.generate_record(c, *index)?;
            match cli.output {
                Output::Human => println!("{}", render_record(&c.key_of(&record).to_string(), &record)),
                Output::Json => println!("{}", serde_json::to_string_pretty(&record_to_json(&record))?),
            }
        }
        Commands::Collections | Commands::Dump { .. } => {
            let store = EntityStore::new(schema.clone());
            let loader_cfg = LoaderConfig { data_dir: cli.data_dir.clone(), generate_missing: cli.generate_missing };
            Loader::new(&store, &generator).load(loader_cfg.source().as_ref(), loader_cfg.generate_missing)?;

            if let Commands::Dump { collection } = &cli.command {
                let records = store.list_all(collection)?;
                match cli.output {
                    Output::Human => {
                        for r in records.iter() {
                            println!("{}", render_record(&store.key_of(collection, r)?.to_string(), r));
                        }
                    }
                    Output::Json => println!("{}", serde_json::to_string_pretty(&feed_to_json(&records))?),
                }
                return Ok(());
            }

            let counts = store.counts();
            let rows: Vec<CollectionRow> = schema
                .collections()
                .zip(counts.iter())
                .map(|(c, (_, n))| CollectionRow { name: c.name(), entity_type: c.entity_type(), key: c.key_fields(), records: *n })
                .collect();
            match cli.output {
                Output::Human => {
                    println!("{:<24} {:<28} {:>7}", "COLLECTION", "KEY", "RECORDS");
                    for r in rows.iter() {
                        println!("{:<24} {:<28} {:>7}", r.name, r.key.join(","), r.records);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            }
        }
    }
    Ok(())
}
