//! Daily scheduling

use crate::pipeline::Orchestrator;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::time::Duration;

/// First occurrence of `at` strictly after `now`
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Runs the orchestrator every day at `at` (local time) until interrupted
///
/// A failed run is logged and the loop waits for the next slot.
pub async fn run_daily(orchestrator: &Orchestrator, at: NaiveTime) {
    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!("Next run at {} (in {}s)", next.format("%Y-%m-%d %H:%M"), wait.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_signal() => {
                tracing::info!("Shutdown requested, stopping scheduler");
                return;
            }
        }

        if let Err(e) = orchestrator.run_all().await {
            tracing::error!("Scheduled run failed: {}", e);
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
