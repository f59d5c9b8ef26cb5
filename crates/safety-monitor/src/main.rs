//! Drive Safety Monitor - Main Entry Point

use anyhow::Context;
use safety_monitor::{build_services, init_logging, MonitorConfig, SafetyEvent, SafetyMonitor};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MonitorConfig::load().context("loading configuration")?;
    init_logging(&config.logging)?;

    info!("=== Drive Safety Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Running in {:?} mode", config.mode);

    let services = build_services(&config, None).context("building services")?;
    let monitor = SafetyMonitor::new(config.clone(), services);
    let mut events = monitor.subscribe();
    let handle = monitor.start().context("starting monitor")?;

    if let (Some(secs), Some(trigger)) = (config.simulation.crash_after_secs, handle.crash_trigger()) {
        info!("Simulated crash scheduled in {}s", secs);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            trigger.simulate_crash();
        });
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(SafetyEvent::CountdownTick { remaining }) => {
                    info!("Emergency call in {}s, cancel if you are OK", remaining);
                }
                Ok(event) => info!("{:?}", event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} events", missed),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await?;
    Ok(())
}
