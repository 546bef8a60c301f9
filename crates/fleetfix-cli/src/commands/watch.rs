use std::io::BufRead;
use std::path::Path;

use fleetfix_core::trigger::{
    spawn_periodic_sync, spawn_reconnect_watch, trigger_channel, ConnectivityTrigger,
    DEFAULT_CHANNEL_CAPACITY,
};
use fleetfix_core::ClientConfig;

use crate::commands::common::{engine_for, open_database};
use crate::error::CliError;

pub async fn run_watch(
    relay_stdin: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let engine = engine_for(&db, config)?;
    let probe = config.reachability_probe()?;
    tracing::info!(
        url = probe.url(),
        interval_secs = config.probe_interval.as_secs(),
        "Watching backend reachability"
    );

    let (trigger, listener) = trigger_channel(DEFAULT_CHANNEL_CAPACITY);
    trigger.request_sync();

    let mut tasks = vec![spawn_reconnect_watch(
        trigger.clone(),
        probe,
        config.probe_interval,
    )];
    if let Some(interval) = config.sync_interval {
        tasks.push(spawn_periodic_sync(trigger.clone(), interval));
    }
    if relay_stdin {
        spawn_stdin_relay(trigger.clone());
    }
    drop(trigger);

    println!(
        "Watching for connectivity ({} queued). Press Ctrl-C to stop.",
        engine.queue_length().await?
    );

    let mut notify_update = |version: Option<&str>| match version {
        Some(version) => println!("Fleetfix {version} is available; restart to update"),
        None => println!("A Fleetfix update is available; restart to update"),
    };

    // Cancelling mid-pass leaves undelivered entries queued for the next run.
    tokio::select! {
        stats = listener.run(&engine, &mut notify_update) => {
            tracing::debug!(?stats, "All trigger sources stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(error) = signal {
                tracing::warn!("Failed to listen for Ctrl-C: {error}");
            }
        }
    }

    for task in tasks {
        task.abort();
    }

    println!(
        "Stopped; {} report(s) still queued",
        engine.queue_length().await?
    );
    Ok(())
}

/// Forward newline-delimited worker messages, e.g. `{"type":"sync-issues"}`.
fn spawn_stdin_relay(trigger: ConnectivityTrigger) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(error) => {
                    tracing::warn!("Failed to read worker messages: {error}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Err(error) = trigger.deliver_raw(line.trim()) {
                tracing::warn!("Ignoring malformed worker message: {error}");
            }
        }
    });
}
