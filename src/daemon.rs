//! Periodic re-ingest of a single feed source.
//!
//! Runs in the foreground until Ctrl-C. Cycles never overlap: the next tick
//! is only awaited once the previous update has finished.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::app::{AppContext, MirrorError, Result};
use crate::fetcher::FetchResult;

/// Units accepted by [`WatchConfig::parse_interval`], largest first.
const UNITS: [(char, u64); 4] = [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)];

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub interval: Duration,
    /// Ingest once before waiting for the first tick
    pub initial_update: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3_600),
            initial_update: true,
        }
    }
}

impl WatchConfig {
    /// `"90"`, `"45s"`, `"30m"`, `"6h"` or `"1d"`; zero is rejected.
    pub fn parse_interval(text: &str) -> Result<Duration> {
        let text = text.trim().to_ascii_lowercase();
        let (digits, scale) = UNITS
            .iter()
            .find_map(|&(unit, scale)| text.strip_suffix(unit).map(|d| (d, scale)))
            .unwrap_or((text.as_str(), 1));

        let count: u64 = digits
            .parse()
            .map_err(|_| MirrorError::Config(format!("Bad watch interval '{}'", text)))?;
        match count.checked_mul(scale) {
            Some(0) | None => Err(MirrorError::Config(format!(
                "Watch interval '{}' out of range",
                text
            ))),
            Some(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    /// Shortest rendering using the largest unit that divides evenly.
    pub fn describe_interval(interval: Duration) -> String {
        let secs = interval.as_secs();
        UNITS
            .iter()
            .find(|&&(_, scale)| secs >= scale && secs % scale == 0)
            .map(|&(unit, scale)| format!("{}{}", secs / scale, unit))
            .unwrap_or_else(|| format!("{}s", secs))
    }
}

/// Conditional-request validators remembered between cycles.
#[derive(Debug, Default)]
struct Validators {
    etag: Option<String>,
    last_modified: Option<String>,
}

pub struct Watcher<'a> {
    ctx: &'a AppContext,
    source: String,
    config: WatchConfig,
    validators: Validators,
}

impl<'a> Watcher<'a> {
    pub fn new(ctx: &'a AppContext, source: impl Into<String>, config: WatchConfig) -> Self {
        Self {
            ctx,
            source: source.into(),
            config,
            validators: Validators::default(),
        }
    }

    /// Run until Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Watching {} every {}",
            self.source,
            WatchConfig::describe_interval(self.config.interval)
        );

        let mut timer = interval(self.config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        timer.tick().await;

        if self.config.initial_update {
            self.run_cycle().await;
        }

        loop {
            tokio::select! {
                _ = timer.tick() => self.run_cycle().await,
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping watch of {}", self.source);
                    return Ok(());
                }
            }
        }
    }

    /// One watch cycle. Failures are logged and do not stop the watch.
    async fn run_cycle(&mut self) {
        let started = Utc::now();

        match self.update_once().await {
            Ok(Some(added)) => {
                let took = Utc::now() - started;
                info!("{}: {} new items in {}ms", self.source, added, took.num_milliseconds());
            }
            Ok(None) => info!("{} not modified", self.source),
            Err(e) => error!("Update of {} failed: {}", self.source, e),
        }
    }

    /// Returns the number of new items, or `None` when the source was unchanged.
    async fn update_once(&mut self) -> Result<Option<usize>> {
        let result = self
            .ctx
            .fetch_source(
                &self.source,
                self.validators.etag.as_deref(),
                self.validators.last_modified.as_deref(),
            )
            .await?;

        match result {
            FetchResult::NotModified => Ok(None),
            FetchResult::Content {
                body,
                etag,
                last_modified,
            } => {
                let report = self.ctx.mirror.update(&body).await?;
                // Only remember validators once the content is safely stored
                self.validators = Validators {
                    etag,
                    last_modified,
                };
                Ok(Some(report.added.len()))
            }
        }
    }
}
