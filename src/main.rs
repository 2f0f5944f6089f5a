use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use version_check::config::{self, load_config};
use version_check::logging;
use version_check::version::checker::LatestVersionChecker;
use version_check::version::fetcher::VersionListFetcher;
use version_check::version::request::RequestState;
use version_check::version::store::{SqliteSlot, VersionStore};
use version_check::version::transport::{HttpTransport, Transport};
use version_check::version::types::SelectionRule;

#[derive(Parser)]
#[command(name = "version-check")]
#[command(version, about = "Check for newer client versions and list preview builds")]
struct Cli {
    /// Write log lines as JSON
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the latest version and compare it with the current one
    Latest {
        /// Version URL (defaults to `versionUrl` from the config file)
        #[arg(long)]
        url: Option<String>,
    },
    /// List preview versions, one JSON object per line
    List {
        /// Versions URL (defaults to `versionsUrl` from the config file)
        #[arg(long)]
        url: Option<String>,

        /// Selection rule, applied in the order given
        #[arg(long = "rule", value_name = "prs=N|branch=NAME")]
        rules: Vec<SelectionRule>,
    },
    /// Print the current version, or set it when VALUE is given
    Current {
        value: Option<String>,

        /// Forget the stored current version
        #[arg(long, conflicts_with = "value")]
        clear: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The log file shares the data directory; commands that never touch it
    // still run when it cannot be created.
    let _guard = logging::init(&config::log_path(), cli.json_log)
        .inspect_err(|e| eprintln!("Logging disabled: {e:#}"))
        .ok();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command))
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = load_config()?;

    match command {
        Command::Latest { url } => {
            let url = url
                .or(config.version_url)
                .context("No version URL; pass --url or set versionUrl in the config file")?;

            let store = open_store()?;
            let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
            let checker = LatestVersionChecker::new(transport, Arc::clone(&store));

            let mut latest = None;
            let state = checker
                .fetch_latest_version(&url, |version| latest = version)
                .await;

            if let RequestState::Unhandled { status } = state {
                bail!("Server answered {} without a version", status);
            }

            println!("latest: {}", latest.as_deref().unwrap_or("unavailable"));
            println!(
                "current: {}",
                store.current()?.as_deref().unwrap_or("unknown")
            );
            println!("update available: {}", store.did_update()?);
        }
        Command::List { url, rules } => {
            let url = url
                .or(config.versions_url)
                .context("No versions URL; pass --url or set versionsUrl in the config file")?;

            let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
            let fetcher =
                VersionListFetcher::new(transport).with_default_rules(config.versions_to_fetch);

            let rules = (!rules.is_empty()).then_some(rules);
            let mut versions = Vec::new();
            let state = fetcher
                .fetch_all_versions(&url, rules.as_deref(), |list| versions = list, || {})
                .await;

            match state {
                RequestState::Succeeded => {
                    for version in &versions {
                        println!("{}", serde_json::to_string(version)?);
                    }
                }
                RequestState::Failed => bail!("Unable to get all versions from {}", url),
                RequestState::Unhandled { status } => {
                    bail!("Server answered {} without a version list", status)
                }
            }
        }
        Command::Current { clear: true, .. } => {
            open_store()?.set_current(None)?;
            info!("Current version cleared");
        }
        Command::Current {
            value: Some(value), ..
        } => {
            open_store()?.set_current(Some(&value))?;
            info!("Current version set to {}", value);
            println!("{value}");
        }
        Command::Current { value: None, .. } => {
            let current = open_store()?.current()?;
            println!("{}", current.as_deref().unwrap_or("unknown"));
        }
    }

    Ok(())
}

fn open_store() -> anyhow::Result<Arc<VersionStore<SqliteSlot>>> {
    let data_dir = config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let slot = SqliteSlot::new(&config::db_path())?;
    Ok(Arc::new(VersionStore::new(slot)))
}
