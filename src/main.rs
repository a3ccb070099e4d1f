use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use folio::app::ViewerContext;
use folio::cli::{commands, CacheAction, Cli, Commands};
use folio::config::Config;
use folio::store::StoreLocation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {}", e);
        Config::default()
    });

    let location = if cli.no_cache {
        StoreLocation::Disabled
    } else if let Some(path) = cli.db {
        StoreLocation::Path(path)
    } else {
        config.cache.location()
    };
    let ctx = ViewerContext::with_location(config, location)?;

    match cli.command {
        Commands::Load { url, out } => {
            commands::load_document(&ctx, &url, out.as_deref()).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::List { json } => commands::list_entries(&ctx, json).await?,
            CacheAction::Remove { url } => commands::remove_entry(&ctx, &url).await?,
            CacheAction::Clear => commands::clear_cache(&ctx).await?,
            CacheAction::Trim => commands::trim_cache(&ctx).await?,
        },
    }

    Ok(())
}
