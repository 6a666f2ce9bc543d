use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedmirror::app::AppContext;
use feedmirror::cli::{commands, Cli, Commands};
use feedmirror::config::Config;
use feedmirror::daemon::{WatchConfig, Watcher};
use feedmirror::domain::FeedMeta;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match &cli.command {
        Commands::Update { scrap: true, .. } | Commands::Watch { scrap: true, .. } => {
            config.mirror.scrap = true;
        }
        _ => {}
    }

    let ctx = AppContext::open(cli.archive, config).await?;

    match cli.command {
        Commands::Init => {
            commands::init(&ctx).await?;
        }
        Commands::Update { source, .. } => {
            commands::update(&ctx, &source).await?;
        }
        Commands::Watch {
            source,
            interval,
            no_initial_update,
            ..
        } => {
            let config = WatchConfig {
                interval: WatchConfig::parse_interval(&interval)?,
                initial_update: !no_initial_update,
            };
            Watcher::new(&ctx, source, config).run().await?;
        }
        Commands::List => {
            commands::list(&ctx).await?;
        }
        Commands::Get { id } => {
            commands::get(&ctx, &id).await?;
        }
        Commands::Scrapped { id } => {
            commands::scrapped(&ctx, &id).await?;
        }
        Commands::Save(args) => {
            commands::save(&ctx, args).await?;
        }
        Commands::SetMeta {
            title,
            description,
            link,
        } => {
            commands::set_meta(&ctx, FeedMeta::new(title, description, link)).await?;
        }
        Commands::Meta => {
            commands::show_meta(&ctx).await?;
        }
        Commands::Export { limit, output } => {
            commands::export(&ctx, limit, output.as_deref()).await?;
        }
    }

    Ok(())
}
