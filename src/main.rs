//! Catalog Cache - inspection tool for the persistent response store
//!
//! Maps request identities to file names and lists, shows, removes or
//! purges persisted responses in a cache directory.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_cache::persist::file_name_for;
use catalog_cache::{Config, PersistentResponseStore};

#[derive(Parser, Debug)]
#[command(name = "catalog-cache", version, about = "Inspect the catalog response cache")]
struct Cli {
    /// Cache directory (defaults to CATALOG_CACHE_DIR or the platform cache dir)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Maximum number of indexed responses
    #[arg(long, global = true)]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the file name a request identity is stored under
    Name { id: String },
    /// Print the persisted response for a request identity
    Show {
        id: String,
        /// Also print the body as text
        #[arg(long)]
        body: bool,
    },
    /// Delete the persisted response for a request identity
    Remove { id: String },
    /// List the data files in the cache directory
    List,
    /// Delete every data file in the cache directory
    Purge,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.dir {
        config.cache_dir = dir;
    }
    if let Some(limit) = cli.limit {
        config.max_response_entries = limit;
    }
    config.validate().context("invalid configuration")?;
    debug!(
        dir = %config.cache_dir.display(),
        limit = config.max_response_entries,
        "configuration loaded"
    );

    let store = PersistentResponseStore::from_config(&config)?;

    match cli.command {
        Command::Name { id } => {
            println!("{}", file_name_for(&id));
        }
        Command::Show { id, body } => {
            let Some(response) = store.get(&id)? else {
                bail!("no cached response for {id}");
            };
            println!("file: {}", store.file_path(&id).display());
            println!("status: {}", response.status);
            println!("requested: {}", response.request_date.to_rfc3339());
            println!("received: {}", response.response_date.to_rfc3339());
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!("body: {} bytes", response.body.len());
            if body {
                println!();
                println!("{}", String::from_utf8_lossy(&response.body));
            }
            store.close();
        }
        Command::Remove { id } => {
            let path = store.file_path(&id);
            let existed = path.is_file();
            store.remove(&id)?;
            if existed {
                info!(path = %path.display(), "removed cached response");
            } else {
                println!("no cached response for {id}");
            }
            store.close();
        }
        Command::List => {
            let files = match store.data_files() {
                Ok(files) => files,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("reading {}", store.cache_dir().display())
                    })
                }
            };
            for file in &files {
                println!("{}", file.display());
            }
            info!(count = files.len(), "listed data files");
            store.close();
        }
        Command::Purge => {
            store.shutdown();
        }
    }

    Ok(())
}
