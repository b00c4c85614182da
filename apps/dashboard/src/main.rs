mod config;
mod events;
mod render;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ApiConnection, ClientError, FeedApi, FetchMode, ItemFilter, Panel, SeverityFilter,
};
use shared::{
    domain::{
        Category, CveEntry, DevToolsEntry, ExportFormat, FeedItem, KubernetesEntry, NewsArticle,
        SreEntry,
    },
    protocol::StatsResponse,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::Settings,
    events::{flush_toasts, Notice},
};

/// Terminal dashboard for the security and infrastructure news backend.
#[derive(Parser, Debug)]
#[command(name = "newsdesk", version)]
struct Cli {
    /// Config file (defaults to ./newsdesk.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend root URL, overriding config and environment.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Entry counts and last update for every category.
    Overview,
    /// Source catalogue of a category.
    Sources { category: Category },
    /// Cached entries, optionally filtered.
    List {
        category: Category,
        #[arg(long, default_value_t = SeverityFilter::All)]
        severity: SeverityFilter,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Detail view of one entry, by list index or key (CVE id or link).
    Show { category: Category, target: String },
    /// Clear the cache and fetch fresh entries.
    Fetch {
        category: Category,
        #[arg(long)]
        days: Option<u32>,
        /// Restrict to these sources; repeat for more than one.
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Wait for a background fetch by polling.
        #[arg(long)]
        poll: bool,
    },
    /// Drop every cached entry of a category.
    Clear {
        category: Category,
        #[arg(long)]
        yes: bool,
    },
    Stats { category: Category },
    /// Write a report of the cached entries.
    Export {
        category: Category,
        #[arg(long)]
        format: Option<ExportFormat>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

impl Command {
    fn category(&self) -> Option<Category> {
        match self {
            Self::Overview => None,
            Self::Sources { category }
            | Self::List { category, .. }
            | Self::Show { category, .. }
            | Self::Fetch { category, .. }
            | Self::Clear { category, .. }
            | Self::Stats { category }
            | Self::Export { category, .. } => Some(*category),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<ClientError>() {
                Some(client_err) => eprintln!("{}", Notice::from_error(client_err).render()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    init_tracing(&settings.log_level);
    info!(server_url = %settings.server_url, "newsdesk starting");

    let connection = ApiConnection::new(&settings.server_url, settings.request_timeout())
        .context("failed to set up backend connection")?;

    let category = match cli.command.category() {
        None => {
            overview(&connection).await;
            return Ok(ExitCode::SUCCESS);
        }
        Some(category) => category,
    };
    if let Command::Sources { .. } = cli.command {
        print!("{}", render::sources(category));
        return Ok(ExitCode::SUCCESS);
    }

    match category {
        Category::News => run::<NewsArticle>(cli.command, &settings, &connection).await,
        Category::Cve => run::<CveEntry>(cli.command, &settings, &connection).await,
        Category::Kubernetes => run::<KubernetesEntry>(cli.command, &settings, &connection).await,
        Category::Sre => run::<SreEntry>(cli.command, &settings, &connection).await,
        Category::DevTools => run::<DevToolsEntry>(cli.command, &settings, &connection).await,
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn category_stats<T: FeedItem>(connection: &ApiConnection) -> Option<StatsResponse> {
    match connection.feed::<T>().stats().await {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!(category = %T::CATEGORY, error = %err, "stats unavailable");
            None
        }
    }
}

async fn overview(connection: &ApiConnection) {
    let (news, cve, k8s, sre, devtools) = tokio::join!(
        category_stats::<NewsArticle>(connection),
        category_stats::<CveEntry>(connection),
        category_stats::<KubernetesEntry>(connection),
        category_stats::<SreEntry>(connection),
        category_stats::<DevToolsEntry>(connection),
    );
    let rows = [news, cve, k8s, sre, devtools];
    for (category, stats) in Category::ALL.into_iter().zip(rows.iter()) {
        println!("{}", render::overview_row(category, stats.as_ref()));
    }
}

/// Runs one category command; toasts are printed before returning.
async fn run<T: FeedItem>(
    command: Command,
    settings: &Settings,
    connection: &ApiConnection,
) -> Result<ExitCode> {
    let panel = Panel::<T>::new(Arc::new(connection.feed::<T>()), settings.poll_policy());
    let mut rx = panel.subscribe_events();

    let result = execute(&panel, command, settings).await;
    let reported = flush_toasts(&mut rx);

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(_) if reported => Ok(ExitCode::FAILURE),
        Err(err) => Err(err),
    }
}

async fn execute<T: FeedItem>(panel: &Panel<T>, command: Command, settings: &Settings) -> Result<()> {
    let category = panel.category();
    match command {
        Command::Overview | Command::Sources { .. } => Ok(()),
        Command::List {
            severity,
            source,
            kind,
            limit,
            ..
        } => {
            if let Some(source) = &source {
                if category.find_source(source).is_none() {
                    warn!(%category, source = %source, "source is not in the catalogue");
                }
            }
            panel.load().await?;
            let filter = ItemFilter {
                severity,
                source,
                kind,
            };
            if let Some(summary) = render::filter_summary(category, &filter) {
                println!("{summary}");
            }
            panel.set_filter(filter).await;
            print!("{}", render::list(&panel.filtered().await, limit));
            Ok(())
        }
        Command::Show { target, .. } => {
            panel.load().await?;
            let (index, item) = match target.parse::<usize>() {
                Ok(index) => (index, panel.select(index).await?),
                Err(_) => panel
                    .select_by_key(&target)
                    .await
                    .ok_or_else(|| anyhow!("no {category} entry with key '{target}'"))?,
            };
            print!("{}", render::detail(index, &item));
            Ok(())
        }
        Command::Fetch {
            days,
            sources,
            poll,
            ..
        } => {
            if let Some(days) = days {
                panel.set_days(days).await?;
            }
            if !sources.is_empty() {
                panel.select_sources(sources.as_slice()).await?;
            }
            let mode = if poll { FetchMode::Poll } else { FetchMode::Direct };
            let outcome = panel.fetch_cycle(mode).await?;
            info!(%category, count = outcome.count, polled = outcome.polled, "fetch complete");
            print!("{}", render::list(&panel.filtered().await, Some(20)));
            Ok(())
        }
        Command::Clear { yes, .. } => {
            if !yes && !confirm(&format!("Clear every cached {} entry?", category.label())).await? {
                println!("aborted");
                return Ok(());
            }
            panel.clear_cache().await?;
            Ok(())
        }
        Command::Stats { .. } => {
            let Some(stats) = panel.load_stats().await else {
                bail!("stats unavailable for {category}");
            };
            print!("{}", render::stats(category, &stats));
            Ok(())
        }
        Command::Export {
            format, out_dir, ..
        } => {
            let format = format.unwrap_or_else(|| category.default_export_format());
            let dir = out_dir.unwrap_or_else(|| settings.export_dir.clone());
            let today = chrono::Local::now().date_naive();
            let path = panel.export(format, &dir, today).await?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn confirm(question: &str) -> Result<bool> {
    let mut stderr = tokio::io::stderr();
    stderr
        .write_all(format!("{question} [y/N] ").as_bytes())
        .await?;
    stderr.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "e" | "evet"
    ))
}
