use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use eventtail_log::{EventFilter, EventFollower, EventLog};
use eventtail_types::EventBatch;

use crate::cli::FollowArgs;
use crate::config::Config;

/// Follow the log locally and print events to stdout until Ctrl-C
pub async fn run(config: &Config, args: FollowArgs) -> Result<()> {
    let filter = build_filter(&args)?;
    let log = EventLog::new(&config.log_path);

    let start = if args.from_start {
        0
    } else {
        log.len().await.context("unable to determine log size")?
    };

    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<EventBatch>();
    let mut follower = EventFollower::new();
    follower.start(
        log,
        start,
        Duration::from_millis(args.interval_ms),
        batch_tx,
    );

    tracing::info!(
        path = %config.log_path.display(),
        offset = start,
        filter = ?filter,
        "following event log"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            batch = batch_rx.recv() => {
                let Some(batch) = batch else { break };
                let mut out = io::stdout().lock();
                write_batch(&mut out, &batch, &filter, args.pretty)?;
                out.flush()?;
            }
        }
    }

    follower.stop();
    tracing::info!("stopped following");
    Ok(())
}

fn build_filter(args: &FollowArgs) -> Result<EventFilter> {
    let pattern = args.grep.as_deref().unwrap_or("");
    let filter = if args.ignore_case {
        EventFilter::new_case_insensitive(pattern)
    } else {
        EventFilter::new(pattern)
    }
    .with_context(|| format!("invalid --grep pattern {pattern:?}"))?;

    Ok(if args.invert { filter.inverted() } else { filter })
}

/// Write matching events, one per line; returns how many were written
fn write_batch(
    out: &mut impl Write,
    batch: &EventBatch,
    filter: &EventFilter,
    pretty: bool,
) -> io::Result<usize> {
    let mut written = 0;
    for event in batch.events.iter().filter(|e| filter.matches(e)) {
        if pretty {
            serde_json::to_writer_pretty(&mut *out, event)?;
        } else {
            serde_json::to_writer(&mut *out, event)?;
        }
        writeln!(out)?;
        written += 1;
    }
    Ok(written)
}
