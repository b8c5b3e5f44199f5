//! Operator CLI over the meditation store.
//!
//! Runs a single store operation against the configured backend and prints
//! the result as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use meditation_core::Meditation;
use meditation_server::{BackendKind, MeditationStore, StoreConfig, StoreFactory};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "meditation-admin", about = "Inspect and edit stored meditations")]
struct Cli {
    /// Storage backend.
    #[arg(long, env = "MEDITATION_BACKEND", value_enum, default_value_t = BackendKind::Redb)]
    backend: BackendKind,

    /// redb database file.
    #[arg(long, env = "MEDITATION_DB_PATH", default_value = "meditations.redb")]
    db_path: PathBuf,

    /// Relocate renamed records with independent put + delete calls instead
    /// of one transactional batch.
    #[arg(long, env = "MEDITATION_NO_TXN_RENAME")]
    no_txn_rename: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Record(RecordCommand),
    /// Remove duplicate entries left by interrupted renames.
    Repair {
        #[arg(long)]
        owner: String,
    },
}

/// Commands that run through an open [`MeditationStore`].
#[derive(Debug, Subcommand)]
enum RecordCommand {
    /// Store a new meditation.
    Save {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Explicit id; a UUID is generated when omitted.
        #[arg(long)]
        id: Option<String>,
    },
    /// List an owner's meditations.
    List {
        #[arg(long)]
        owner: String,
    },
    /// Show one meditation.
    Get {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: String,
    },
    /// Remove one meditation.
    Delete {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: String,
    },
    /// Change the name and/or URL of a meditation.
    Update {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.backend,
            redb_path: self.db_path.clone(),
            transactional_rename: !self.no_txn_rename,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn repair(factory: &StoreFactory, owner: &str) -> anyhow::Result<()> {
    let client = match factory.config().backend {
        BackendKind::Redb => factory.redb_client()?,
        other => anyhow::bail!("repair needs a persistent key-value backend, got {other}"),
    };
    let store = factory.kv_store_concrete(client);
    let removed = store.repair_partition(owner).await?;
    info!(owner, removed, "repair finished");
    print_json(&serde_json::json!({ "removed": removed }))
}

async fn execute(store: Arc<dyn MeditationStore>, command: RecordCommand) -> anyhow::Result<()> {
    match command {
        RecordCommand::Save {
            owner,
            name,
            url,
            id,
        } => {
            let record = match id {
                Some(id) => Meditation::with_id(id, owner, name, url),
                None => Meditation::new(owner, name, url),
            };
            store.save(record.clone()).await?;
            print_json(&record)
        }
        RecordCommand::List { owner } => print_json(&store.list(&owner).await?),
        RecordCommand::Get { owner, id } => print_json(&store.get(&owner, &id).await?),
        RecordCommand::Delete { owner, id } => {
            store.delete(&owner, &id).await?;
            print_json(&serde_json::json!({}))
        }
        RecordCommand::Update {
            owner,
            id,
            name,
            url,
        } => {
            let mut record = store
                .get(&owner, &id)
                .await
                .context("cannot update a meditation that does not exist")?;
            if let Some(name) = name {
                record.name = name;
            }
            if let Some(url) = url {
                record.audio_url = url;
            }
            store.update(record.clone()).await?;
            print_json(&record)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let factory = StoreFactory::new(cli.store_config());
    match cli.command {
        Command::Repair { owner } => repair(&factory, &owner).await,
        Command::Record(command) => execute(factory.build()?, command).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    meditation_server::telemetry::init_tracing(cli.json_logs)?;
    run(cli).await
}
