//! `lens` command-line client.
//!
//! # Responsibility
//! - Expose every store operation against a remote lens-data server or a
//!   local SQLite store.
//! - Print results as pretty JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lens_core::backend::CollectionKey;
use lens_core::derive::{group_by_field, status_histogram, sum_field};
use lens_core::{
    catalog, find_kind, init_logging, Artifact, ArtifactCollection, ArtifactDraft, ArtifactFilter,
    ArtifactId, ArtifactPatch, BackendConfig, CollectionOptions, DataMap, LensBackend, LensConfig,
    SeedCatalog,
};
use log::info;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_SEEDS: &str = include_str!("../seeds/demo.json");

#[derive(Parser, Debug)]
#[clap(
    name = "lens",
    version = env!("CARGO_PKG_VERSION"),
    about = "Browse and edit lens artifacts"
)]
struct Cli {
    /// TOML config file.
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// lens-data server base URL; overrides the configured backend.
    #[clap(long, global = true, conflicts_with = "db")]
    url: Option<String>,
    /// Local SQLite store; overrides the configured backend.
    #[clap(long, global = true)]
    db: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known artifact kinds and their statuses
    Types,
    /// List one collection
    List {
        domain: String,
        artifact_type: String,
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        tag: Option<String>,
        #[clap(long)]
        search: Option<String>,
        /// Create demo rows if the collection is empty.
        #[clap(long)]
        seed: bool,
    },
    /// Create an artifact
    Create {
        domain: String,
        artifact_type: String,
        #[clap(long)]
        title: String,
        /// JSON object of data fields.
        #[clap(long)]
        data: Option<String>,
        #[clap(long)]
        status: Option<String>,
        #[clap(long = "tag")]
        tags: Vec<String>,
    },
    /// Merge changes into an artifact
    Update {
        domain: String,
        artifact_type: String,
        id: String,
        #[clap(long)]
        title: Option<String>,
        /// JSON object of data fields to overwrite.
        #[clap(long)]
        data: Option<String>,
        #[clap(long)]
        status: Option<String>,
        /// Replaces the tag set.
        #[clap(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an artifact (no error if already gone)
    Remove {
        domain: String,
        artifact_type: String,
        id: String,
    },
    /// Run a named domain action on an artifact
    Action {
        domain: String,
        id: String,
        name: String,
        /// JSON object passed to the action.
        #[clap(long)]
        params: Option<String>,
    },
    /// Dashboard figures for one collection
    Stats {
        domain: String,
        artifact_type: String,
        /// Numeric data field to total.
        #[clap(long)]
        sum: Option<String>,
        /// Data field to group by.
        #[clap(long)]
        group: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Some(log_dir) = &config.log_dir {
        let log_dir = log_dir.to_str().context("log_dir must be valid UTF-8")?;
        init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;
    }
    info!("event=cli_command module=cli status=start command={}", command_name(&cli.command));

    let output = run(&config, cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<LensConfig> {
    let mut config = LensConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(url) = &cli.url {
        config.backend = BackendConfig::Http {
            base_url: url.clone(),
            timeout_secs: lens_core::config::DEFAULT_TIMEOUT_SECS,
        };
    }
    if let Some(db) = &cli.db {
        config.backend = BackendConfig::Local { db_path: db.clone() };
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Types => "types",
        Command::List { .. } => "list",
        Command::Create { .. } => "create",
        Command::Update { .. } => "update",
        Command::Remove { .. } => "remove",
        Command::Action { .. } => "action",
        Command::Stats { .. } => "stats",
    }
}

fn run(config: &LensConfig, command: Command) -> Result<Value> {
    match command {
        Command::Types => Ok(types()),
        Command::List {
            domain,
            artifact_type,
            status,
            tag,
            search,
            seed,
        } => {
            let key = parse_key(&domain, &artifact_type)?;
            let seeds = if seed {
                seed_catalog(config)?.seeds_for(&key)
            } else {
                Vec::new()
            };
            let collection = open_collection(config, key, seeds)?;
            let snapshot = collection.refresh()?;

            let mut filter = ArtifactFilter::new();
            filter.status = status;
            filter.tag = tag;
            filter.search = search;
            Ok(serde_json::to_value(filter.apply(&snapshot.items))?)
        }
        Command::Create {
            domain,
            artifact_type,
            title,
            data,
            status,
            tags,
        } => {
            let key = parse_key(&domain, &artifact_type)?;
            let collection = open_collection(config, key, Vec::new())?;
            let mut draft = ArtifactDraft::new(title);
            if let Some(data) = data {
                draft = draft.with_data(parse_object(&data, "--data")?);
            }
            if let Some(status) = status {
                draft = draft.with_status(status);
            }
            for tag in tags {
                draft = draft.with_tag(tag);
            }
            Ok(serde_json::to_value(collection.create(draft)?)?)
        }
        Command::Update {
            domain,
            artifact_type,
            id,
            title,
            data,
            status,
            tags,
        } => {
            let key = parse_key(&domain, &artifact_type)?;
            let collection = open_collection(config, key, Vec::new())?;
            let mut patch = ArtifactPatch {
                title,
                ..ArtifactPatch::default()
            };
            if let Some(data) = data {
                patch.data = Some(parse_object(&data, "--data")?);
            }
            if let Some(status) = status {
                patch = patch.with_status(status);
            }
            if !tags.is_empty() {
                patch = patch.with_tags(tags.into_iter().collect::<BTreeSet<_>>());
            }
            if patch.is_empty() {
                bail!("nothing to update; pass --title, --data, --status or --tag");
            }
            Ok(serde_json::to_value(collection.update(&ArtifactId::new(id), patch)?)?)
        }
        Command::Remove {
            domain,
            artifact_type,
            id,
        } => {
            let key = parse_key(&domain, &artifact_type)?;
            let collection = open_collection(config, key, Vec::new())?;
            collection.remove(&ArtifactId::new(id.clone()))?;
            Ok(json!({ "removed": id }))
        }
        Command::Action {
            domain,
            id,
            name,
            params,
        } => {
            let params = match params {
                Some(text) => Value::Object(parse_object(&text, "--params")?),
                None => Value::Null,
            };
            let result = open_backend(config)?
                .run_action(&domain, &ArtifactId::new(id), &name, &params)
                .with_context(|| format!("action `{name}` failed"))?;
            Ok(json!({ "result": result }))
        }
        Command::Stats {
            domain,
            artifact_type,
            sum,
            group,
        } => {
            let key = parse_key(&domain, &artifact_type)?;
            let collection = open_collection(config, key.clone(), Vec::new())?;
            let snapshot = collection.refresh()?;
            Ok(stats(&key, &snapshot.items, sum.as_deref(), group.as_deref()))
        }
    }
}

fn types() -> Value {
    let kinds: Vec<Value> = catalog()
        .into_iter()
        .map(|kind| {
            json!({
                "key": kind.key().to_string(),
                "statuses": kind.statuses.values(),
                "progression": kind.statuses.progression(),
            })
        })
        .collect();
    Value::Array(kinds)
}

fn stats(key: &CollectionKey, items: &[Artifact], sum: Option<&str>, group: Option<&str>) -> Value {
    // Unknown kinds bucket over the statuses actually present.
    let statuses: Vec<String> = match find_kind(key.domain(), key.artifact_type()) {
        Some(kind) => kind.statuses.values().iter().map(|s| s.to_string()).collect(),
        None => items
            .iter()
            .filter_map(|artifact| artifact.status().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };
    let status_refs: Vec<&str> = statuses.iter().map(String::as_str).collect();
    let histogram = status_histogram(items, &status_refs);

    let mut output = json!({
        "key": key.to_string(),
        "count": items.len(),
        "statuses": histogram,
        "unrecognized": histogram.unrecognized(),
    });
    if let Some(field) = sum {
        output["sum"] = json!({ "field": field, "total": sum_field(items, field) });
    }
    if let Some(field) = group {
        let groups: serde_json::Map<String, Value> = group_by_field(items, field)
            .into_iter()
            .map(|(value, members)| (value, json!(members.len())))
            .collect();
        output["groups"] = json!({ "field": field, "counts": groups });
    }
    output
}

fn parse_key(domain: &str, artifact_type: &str) -> Result<CollectionKey> {
    let key = CollectionKey::new(domain, artifact_type);
    key.validate()
        .with_context(|| format!("invalid collection `{domain}/{artifact_type}`"))?;
    Ok(key)
}

fn parse_object(text: &str, flag: &str) -> Result<DataMap> {
    match serde_json::from_str::<Value>(text).with_context(|| format!("{flag} is not valid JSON"))? {
        Value::Object(map) => Ok(map),
        _ => bail!("{flag} must be a JSON object"),
    }
}

fn seed_catalog(config: &LensConfig) -> Result<SeedCatalog> {
    if config.seed_file.is_some() {
        return config.load_seeds().context("failed to load seed file");
    }
    SeedCatalog::from_json_str(DEMO_SEEDS).context("built-in demo seeds are invalid")
}

fn open_backend(config: &LensConfig) -> Result<Arc<dyn LensBackend>> {
    config.build_backend().context("failed to open backend")
}

/// Collections opened by the CLI never refresh in the background; each
/// command loads explicitly.
fn open_collection(
    config: &LensConfig,
    key: CollectionKey,
    seeds: Vec<ArtifactDraft>,
) -> Result<ArtifactCollection> {
    Ok(ArtifactCollection::with_options(
        open_backend(config)?,
        key,
        CollectionOptions::manual(),
        seeds,
    ))
}
