//! Water portal to Home Assistant forwarder.
//!
//! Logs into the water utility's customer portal, scrapes the readings table
//! and republishes the extracted meter readings as Home Assistant sensor
//! states plus a long-term statistics import. A small web API triggers
//! fetches on demand and manages a ledger of manually entered historical
//! readings.
//!
//! # Architecture
//!
//! One fetch pipeline (login → fetch → parse → reconcile → publish) is shared
//! between two triggers: a long-interval scheduler and the web API. The
//! pipeline serializes overlapping invocations internally, so at most one
//! run is ever in flight.

mod config;
mod error;
mod hass;
mod ledger;
mod model;
mod pipeline;
mod portal;
mod reconcile;
mod web;

#[cfg(test)]
mod test_utils;

use crate::hass::StatePublisher;
use crate::ledger::HistoricalLedger;
use crate::pipeline::FetchPipeline;
use crate::portal::PortalSession;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{sleep, Duration};

/// Application entry point.
///
/// Loads configuration (missing credentials are fatal here and only here),
/// wires the pipeline and ledger together, spawns the web API and runs the
/// scheduler loop until SIGTERM/SIGINT.
#[tokio::main]
async fn main() {
    let app_config = config::load_app_config().expect("Failed to load AppConfig");
    tracing_subscriber::fmt()
        .with_max_level(app_config.log_level())
        .init();

    let portal_config = config::load_portal_config().expect("Failed to load PortalConfig");
    let meter_config = config::load_meter_config().expect("Failed to load MeterConfig");
    let hass_config = config::load_hass_config().expect("Failed to load HassConfig");
    let scheduler_config =
        config::load_scheduler_config().expect("Failed to load SchedulerConfig");
    let web_config = config::load_web_config().expect("Failed to load WebConfig");
    let ledger_config = config::load_ledger_config().expect("Failed to load LedgerConfig");

    let session = PortalSession::new(portal_config).expect("Failed to build portal session");
    let publisher: Arc<dyn StatePublisher> =
        Arc::new(hass::Client::new(hass_config).expect("Failed to build Home Assistant client"));
    let ledger = Arc::new(HistoricalLedger::load(ledger_config.path));
    let pipeline = Arc::new(FetchPipeline::new(
        session,
        publisher,
        Arc::clone(&ledger),
        meter_config.clone(),
    ));

    let listener = TcpListener::bind(("0.0.0.0", web_config.port))
        .await
        .expect("Failed to bind web listener");
    tracing::info!("Web interface listening on port {}", web_config.port);
    tokio::spawn(web::serve(
        listener,
        web::AppState {
            pipeline: Arc::clone(&pipeline),
            ledger,
            meters: meter_config,
        },
    ));

    let update_interval = Duration::from_secs(scheduler_config.update_interval_sec);
    let retry_delay = Duration::from_secs(scheduler_config.retry_delay_sec);
    tracing::info!(
        "Update interval: {} seconds ({:.1} days)",
        scheduler_config.update_interval_sec,
        scheduler_config.update_interval_sec as f64 / 86_400.0
    );

    tracing::info!("Performing initial meter reading fetch...");
    pipeline.run().await;

    let mut sig_term = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    tracing::info!("Running... Press Ctrl-C or send SIGTERM to terminate.");
    // Scheduler loop: a failed run shortens the sleep to the retry delay.
    let mut next_delay = update_interval;
    loop {
        tokio::select! {
            // Handle SIGTERM for graceful shutdown in containers
            _ = sig_term.recv() => {
                tracing::info!("Received SIGTERM. Exiting...");
                break;
            }
            // Handle Ctrl-C for manual termination
            _ = ctrl_c() => {
                tracing::info!("Received SIGINT. Exiting...");
                break;
            }
            _ = sleep(next_delay) => {
                tracing::info!("Scheduled update triggered");
                next_delay = if pipeline.run().await {
                    tracing::info!("Scheduled update completed successfully");
                    update_interval
                } else {
                    tracing::error!(
                        "Scheduled update failed, retrying in {} seconds",
                        scheduler_config.retry_delay_sec
                    );
                    retry_delay
                };
            }
        }
    }
}
