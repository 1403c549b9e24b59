//! `csp-roster` CLI: scrape an alphabet-filtered CSP directory page and
//! write the aggregated list to a plain-text file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use csp_roster::browser::{BrowserWrapper, connect_browser, launch_browser};
use csp_roster::{CdpDriver, LogSink, Scraper, StatusSink, load_yaml_config};

#[derive(Parser, Debug)]
#[command(name = "csp-roster", version, about)]
struct Cli {
    /// Page to navigate to in a freshly launched browser.
    #[arg(long, conflicts_with = "connect")]
    url: Option<Url>,

    /// Attach to a running browser's DevTools websocket instead of
    /// launching one (e.g. ws://127.0.0.1:9222/...). The page must already
    /// be open in the first tab.
    #[arg(long)]
    connect: Option<String>,

    /// Path to a YAML config file (defaults to ./config.yaml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file for the rendered report.
    #[arg(short, long, default_value = "participating_csps_list.txt")]
    output: PathBuf,

    /// Run the launched browser with a visible window.
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = load_yaml_config(cli.config.as_deref())?;
    if cli.headed {
        config.browser.headless = false;
    }

    let (wrapper, page) = open_session(&cli, &config).await?;

    // Ctrl-C requests a cooperative stop; the run finishes the section in
    // flight and writes whatever was collected.
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing current section");
            ctrl_c_cancel.cancel();
        }
    });

    let sink: Arc<dyn StatusSink> = Arc::new(LogSink);
    let driver = CdpDriver::new(page, &config, sink.clone());
    let scraper = Scraper::new(driver, config, sink, cancel);

    let result = scraper.run().await;
    let shutdown = wrapper.shutdown().await;

    let report = result.context("scrape failed")?;
    shutdown?;

    std::fs::write(&cli.output, &report.text)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    info!(
        "Wrote {} entries from {}/{} sections to {}{}",
        report.entries.len(),
        report.sections_scraped,
        report.sections_total,
        cli.output.display(),
        if report.partial { " (partial)" } else { "" }
    );

    Ok(())
}

async fn open_session(
    cli: &Cli,
    config: &csp_roster::Config,
) -> Result<(BrowserWrapper, chromiumoxide::Page)> {
    if let Some(ws_url) = &cli.connect {
        let wrapper = connect_browser(ws_url).await?;
        let page = wrapper.current_page().await?;
        return Ok((wrapper, page));
    }

    let Some(url) = &cli.url else {
        bail!("either --url or --connect is required");
    };

    let wrapper = launch_browser(&config.browser).await?;
    let page = wrapper
        .browser()
        .new_page(url.as_str())
        .await
        .with_context(|| format!("failed to open {url}"))?;
    page.wait_for_navigation()
        .await
        .context("initial navigation did not complete")?;

    Ok((wrapper, page))
}
