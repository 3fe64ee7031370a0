use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    cache::query_signature, ChannelCache, ChannelView, ChatClient, DurableChannelCache,
    InMemoryChannelCache, MissingChannelTransport, SystemClock,
};
use shared::{domain::UserId, protocol::QueryChannelsRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod replay;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; defaults to ./tools.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    user_id: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replays a recorded session and prints the resulting channel views.
    Replay {
        #[arg(long)]
        input: PathBuf,
        /// Write merged channels into the sqlite channel cache.
        #[arg(long)]
        persist: bool,
        /// Also record the replayed channel list under this query.
        #[arg(long)]
        query: Option<PathBuf>,
        /// Print only this channel.
        #[arg(long)]
        cid: Option<String>,
    },
    /// Prints the cached channel views a query returned last time.
    Cached {
        #[arg(long)]
        query: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref());
    if let Some(user_id) = cli.user_id {
        settings.user_id = user_id;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let current_user = UserId::new(settings.user_id.clone());
    match cli.command {
        Command::Replay {
            input,
            persist,
            query,
            cid,
        } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("failed to read replay input {}", input.display()))?;
            let records = replay::parse_records(&raw)?;

            let cache: Arc<dyn ChannelCache> = if persist {
                Arc::new(open_cache(&settings.database_url).await?)
            } else {
                Arc::new(InMemoryChannelCache::new())
            };
            let client = ChatClient::new_with_dependencies(
                current_user,
                Arc::new(MissingChannelTransport),
                cache.clone(),
                Arc::new(SystemClock),
            );

            let summary = replay::replay(&client, records).await?;
            info!(
                snapshots = summary.snapshots,
                events = summary.events,
                rejected = summary.rejected,
                "replay: applied recorded session"
            );

            if let Some(query) = query {
                let request = read_query(&query)?;
                cache
                    .store_query(&query_signature(&request)?, &client.active_cids().await)
                    .await?;
            }

            let views = match cid {
                Some(raw) => {
                    let cid = ChatClient::parse_cid(&raw)?;
                    let view = client
                        .channel_view(&cid)
                        .await
                        .with_context(|| format!("channel {cid} was not part of the replay"))?;
                    vec![view]
                }
                None => {
                    let mut views = Vec::new();
                    for cid in client.active_cids().await {
                        if let Some(view) = client.channel_view(&cid).await {
                            views.push(view);
                        }
                    }
                    views
                }
            };
            print_views(&views)?;
        }
        Command::Cached { query } => {
            let request = read_query(&query)?;
            let cache = open_cache(&settings.database_url).await?;
            let client = ChatClient::new_with_dependencies(
                current_user,
                Arc::new(MissingChannelTransport),
                Arc::new(cache),
                Arc::new(SystemClock),
            );
            let views = client.cached_query_channels(&request).await?;
            print_views(&views)?;
        }
    }

    Ok(())
}

async fn open_cache(raw_database_url: &str) -> Result<DurableChannelCache> {
    let database_url = normalize_database_url(raw_database_url);
    let cache = DurableChannelCache::initialize(&database_url).await?;
    cache.storage().health_check().await?;
    info!(%database_url, "cache: opened channel cache");
    Ok(cache)
}

fn read_query(path: &Path) -> Result<QueryChannelsRequest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read query file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid query in {}", path.display()))
}

fn print_views(views: &[Arc<ChannelView>]) -> Result<()> {
    let views: Vec<&ChannelView> = views.iter().map(Arc::as_ref).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}
