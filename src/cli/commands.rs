use std::io::Write;

use chrono::{DateTime, Utc};

use crate::app::{AppContext, MirrorError, Result};
use crate::cli::SaveArgs;
use crate::domain::{FeedMeta, ItemRecord};
use crate::fetcher::FetchResult;
use crate::mirror::UpdateReport;
use crate::store::Archive;

pub async fn init(ctx: &AppContext) -> Result<()> {
    let version = ctx.mirror.archive().version().await?;
    println!("Archive:       {}", ctx.archive_path().display());
    println!("Key:           {}", ctx.mirror.key());
    println!("Discovery key: {}", ctx.mirror.discovery_key());
    println!("Version:       {}", version);
    Ok(())
}

pub async fn update(ctx: &AppContext, source: &str) -> Result<UpdateReport> {
    let body = match ctx.fetch_source(source, None, None).await? {
        FetchResult::Content { body, .. } => body,
        FetchResult::NotModified => {
            println!("Feed not modified");
            return Ok(UpdateReport::default());
        }
    };

    let report = ctx.mirror.update(&body).await?;
    for id in &report.added {
        println!("  + {}", id);
    }
    println!(
        "Update complete: {} new items, {} already stored",
        report.added.len(),
        report.skipped
    );
    Ok(report)
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let ids = ctx.mirror.list().await?;

    if ids.is_empty() {
        println!("No items");
        return Ok(());
    }

    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

pub async fn get(ctx: &AppContext, id: &str) -> Result<()> {
    let data = ctx.mirror.get(id).await?;
    write_stdout(&data)
}

pub async fn scrapped(ctx: &AppContext, id: &str) -> Result<()> {
    let data = ctx.mirror.get_scrapped(id).await?;
    write_stdout(&data)
}

pub async fn save(ctx: &AppContext, args: SaveArgs) -> Result<()> {
    let date = args
        .date
        .as_deref()
        .map(parse_date)
        .transpose()?;

    let item = ItemRecord {
        title: args.title,
        description: args.description,
        link: args.link,
        guid: args.guid,
        date,
        ..Default::default()
    };

    let body = match args.body {
        Some(path) => Some(tokio::fs::read(&path).await?),
        None => None,
    };

    let id = ctx.mirror.save(&item, body.as_deref()).await?;
    println!("Saved {}", id);
    Ok(())
}

pub async fn set_meta(ctx: &AppContext, meta: FeedMeta) -> Result<()> {
    ctx.mirror.set_meta(&meta).await?;
    println!("Feed metadata updated: {}", meta.display_title());
    Ok(())
}

pub async fn show_meta(ctx: &AppContext) -> Result<()> {
    let meta = ctx.mirror.meta().await?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}

pub async fn export(
    ctx: &AppContext,
    limit: Option<usize>,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.mirror.export_limit);
    let xml = ctx.mirror.export(limit).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &xml).await?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        None => write_stdout(&xml),
    }
}

fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MirrorError::Config(format!("Invalid date '{}': {}", s, e)))
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(data)?;
    if !data.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
