use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, prelude::*};

use marigold_collection::{
  Collection, Item, ItemKind, available_targets, build_ephemeral_collection,
  collect_all_node_summaries, dependency_order, effective_auth, resolve_inherited_auth,
  scoped_collection, validate_dependencies,
};
use marigold_store::{CollectionStore, FsStore};

/// Marigold - inspect API collections the way the orchestrator sees them
#[derive(Parser)]
#[command(name = "marigold")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.marigold)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Workspace holding the collections
  #[arg(long, global = true, default_value = "default")]
  workspace: String,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// List the collections in the workspace
  List,

  /// Print a collection's item tree
  Tree {
    collection: String,
  },

  /// Show the auth an item inherits and the auth it ends up with
  Auth {
    collection: String,
    item: String,
  },

  /// List the nodes an item may depend on
  Deps {
    collection: String,
    item: String,
  },

  /// Show the tree a collection run would execute, in dependency order
  Plan {
    collection: String,

    /// Request ids to run (repeatable). Omit to run everything.
    #[arg(long = "select")]
    selected: Vec<String>,
  },

  /// Print the single-request collection built for one request
  Ephemeral {
    collection: String,
    request: String,
  },
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".marigold"),
  };
  debug!(data_dir = %data_dir.display(), workspace = %cli.workspace, "cli_started");
  let store = FsStore::new(data_dir);

  let Some(command) = cli.command else {
    println!("marigold - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(command, &store, &cli.workspace).await })
}

fn init_tracing() {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter),
    )
    .init();
}

async fn run(command: Commands, store: &FsStore, workspace: &str) -> Result<()> {
  match command {
    Commands::List => {
      let ids = store
        .list_collections(workspace)
        .await
        .with_context(|| format!("failed to list collections in workspace '{}'", workspace))?;
      for id in ids {
        println!("{}", id);
      }
    }
    Commands::Tree { collection } => {
      let collection = load(store, workspace, &collection).await?;
      println!("{} ({})", collection.info.name, collection.protocol);
      print_items(&collection.items, 1);
    }
    Commands::Auth { collection, item } => {
      let collection = load(store, workspace, &collection).await?;
      let inherited = resolve_inherited_auth(&collection, &item)?;
      let effective = effective_auth(&collection, &item)?;
      let output = serde_json::json!({
        "item": item,
        "inherited": inherited,
        "effective": effective,
      });
      println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Commands::Deps { collection, item } => {
      let collection = load(store, workspace, &collection).await?;
      let all_items = collect_all_node_summaries(&collection.items);
      let targets = available_targets(&collection, &item, &all_items)?;
      for target in targets {
        println!("{}\t{}\t{}", kind_label(target.kind), target.id, target.name);
      }
    }
    Commands::Plan {
      collection,
      selected,
    } => {
      let collection = load(store, workspace, &collection).await?;
      let selected: HashSet<String> = selected.into_iter().collect();
      let scoped = scoped_collection(&collection, &selected);
      validate_dependencies(&scoped.items)
        .with_context(|| format!("collection '{}' cannot be run", collection.info.id))?;

      eprintln!(
        "Running {} of {} requests",
        scoped.request_count(),
        collection.request_count()
      );
      print_items(&scoped.items, 0);

      println!();
      for (position, request_id) in dependency_order(&scoped.items)?.iter().enumerate() {
        println!("{:>3}. {}", position + 1, request_id);
      }
    }
    Commands::Ephemeral {
      collection,
      request,
    } => {
      let collection = load(store, workspace, &collection).await?;
      let edited = collection
        .find_request(&request)
        .with_context(|| format!("request '{}' not found in '{}'", request, collection.info.id))?;
      let ephemeral = build_ephemeral_collection(&collection, edited)?;
      println!("{}", serde_json::to_string_pretty(&ephemeral)?);
    }
  }

  Ok(())
}

async fn load(store: &FsStore, workspace: &str, collection_id: &str) -> Result<Collection> {
  store
    .load_collection(workspace, collection_id)
    .await
    .with_context(|| format!("failed to load collection '{}'", collection_id))
}

fn print_items(items: &[Item], depth: usize) {
  for item in items {
    println!("{}{} {} [{}]", "  ".repeat(depth), kind_label(item.kind()), item.name(), item.id());
    print_items(item.children(), depth + 1);
  }
}

fn kind_label(kind: ItemKind) -> &'static str {
  match kind {
    ItemKind::Folder => "folder",
    ItemKind::Request => "request",
  }
}
