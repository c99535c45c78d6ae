mod config;

use std::sync::Arc;

use anyhow::Context;
use client::{CommentsAccessor, HttpTransport};
use domain::{Comment, CommentsTarget, LocalId, PageParams};
use dotenvy::dotenv;
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new().context("Failed to load configuration")?;

    let target = CommentsTarget::new(&settings.target.project_id, &settings.target.post_id)
        .context("Invalid comments target")?;
    let page = PageParams::new(settings.page.take, settings.page.skip)
        .context("Invalid page settings")?;
    let transport = HttpTransport::new(&settings.api.base_url)
        .with_context(|| format!("Invalid API base URL: {}", settings.api.base_url))?;

    // 可选的位置参数: <author> <content>
    let mut args = std::env::args().skip(1);
    let submission = match (args.next(), args.next()) {
        (Some(author), Some(content)) => Some((author, content)),
        (Some(_), None) => anyhow::bail!("Usage: comments [<author> <content>]"),
        _ => None,
    };

    let accessor = CommentsAccessor::new(Arc::new(transport), target, page);

    let outcome = tokio::select! {
        res = run(&accessor, submission) => res,
        _ = shutdown_signal() => Ok(()),
    };
    accessor.shutdown();
    outcome
}

async fn run(
    accessor: &CommentsAccessor,
    submission: Option<(String, String)>,
) -> anyhow::Result<()> {
    let mut updates = accessor.updates();
    while let Some(store) = updates.next().await {
        if !store.loading() {
            break;
        }
    }

    if let Some(err) = accessor.error() {
        warn!("{}: {}", err.error, err.details);
    }
    let target = accessor.target();
    println!(
        "{}/{}: {} comment(s), {} shown",
        target.project_id,
        target.post_id,
        accessor.count(),
        accessor.comments().len()
    );
    for c in accessor.comments() {
        print_comment(&c);
    }

    let Some((author, content)) = submission else {
        return Ok(());
    };

    let local_id = accessor
        .add_comment(&author, &content)
        .context("Comment rejected")?;
    info!("Queued comment {}", local_id);

    let settled = wait_settled(accessor, local_id).await;
    match settled {
        Some(c) => print_comment(&c),
        None => warn!("Comment {} disappeared before settling", local_id),
    }
    if let Some(err) = accessor.error() {
        warn!("{}: {}", err.error, err.details);
    }
    Ok(())
}

async fn wait_settled(accessor: &CommentsAccessor, local_id: LocalId) -> Option<Comment> {
    let mut updates = accessor.updates();
    while let Some(store) = updates.next().await {
        match store.find(local_id) {
            Some(c) if c.is_pending() => continue,
            other => return other.cloned(),
        }
    }
    None
}

fn print_comment(c: &Comment) {
    let status = c
        .status
        .map(|s| format!(" [{:?}]", s))
        .unwrap_or_default();
    println!(
        "      - [{}] {}: {}{}",
        c.created_at.format("%Y-%m-%d %H:%M:%S"),
        c.author,
        c.content,
        status
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
