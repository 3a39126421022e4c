//! AutoPRX CLI entry point.
//!
//! This binary is the composition root for the relay:
//!
//! 1. **Parse configuration** — command-line flags with environment
//!    fallbacks (`PORT`, `AUTOPRX_EVENTS_FILE`, `SLACK_WEBHOOK_URL`).
//! 2. **Wire observability** — `tracing-subscriber` with an `EnvFilter`;
//!    every crate in the workspace logs through this layer.
//! 3. **Construct infrastructure** — the file-backed event store and the
//!    Slack sink (or the log sink when no webhook URL is configured) —
//!    and inject them into the HTTP shell.
//! 4. **Serve** — bind the listener and run until interrupted.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use notify::{LogSink, SlackSink};
use relay::{NotificationDispatcher, NotificationSink, RelayRunId};
use server::AppState;
use store::FileEventStore;

/// GitHub webhook relay with a bounded event log, CI status queries, and
/// Slack notifications.
#[derive(Parser, Debug)]
#[command(name = "autoprx", version, about, long_about = None)]
struct Args {
    /// Address to bind the HTTP listener on.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Port for the HTTP listener.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Path of the persisted event log.
    #[arg(long, env = "AUTOPRX_EVENTS_FILE", default_value = "github_events.json")]
    events_file: PathBuf,

    /// Slack incoming-webhook URL. When unset, notifications go to the
    /// process log instead.
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    slack_webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let run_id = RelayRunId::new_random();
    tracing::info!(%run_id, events_file = %args.events_file.display(), "starting AutoPRX relay");

    let sink: Arc<dyn NotificationSink> = match &args.slack_webhook_url {
        Some(url) => Arc::new(SlackSink::new(url.clone()).context("building Slack sink")?),
        None => {
            tracing::warn!("SLACK_WEBHOOK_URL not set; notifications go to the process log");
            Arc::new(LogSink)
        }
    };

    let store = Arc::new(FileEventStore::new(&args.events_file));
    let dispatcher = Arc::new(NotificationDispatcher::new(sink));
    let state = Arc::new(AppState {
        store,
        dispatcher,
        run_id,
    });

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening for webhooks on /webhook/github");

    axum::serve(listener, server::router(state))
        .await
        .context("serving HTTP")?;
    Ok(())
}
