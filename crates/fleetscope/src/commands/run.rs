//! `run`: start every service and follow its events until Ctrl-C.

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use fleetscope_core::{AccessControlEvent, DiscoveryEvent, FleetContext};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let fleet = super::fleet_config(global)?;
    let ctx = FleetContext::new(fleet)?;

    let mut discovery_rx = ctx.discovery().subscribe();
    let mut access_rx = ctx.access_control().subscribe();
    if let Err(e) = ctx.start().await {
        ctx.shutdown().await;
        return Err(e.into());
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!(error = %e, "cannot listen for Ctrl-C; stopping");
                }
                break;
            }
            event = discovery_rx.recv() => match event {
                Ok(event) => log_discovery(&event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "discovery log lagged"),
                Err(RecvError::Closed) => break,
            },
            event = access_rx.recv() => match event {
                Ok(event) => log_access(&event, &ctx),
                Err(RecvError::Lagged(missed)) => warn!(missed, "ownership log lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!(explorers = ctx.explorers().len(), "shutting down");
    ctx.shutdown().await;
    Ok(())
}

fn log_discovery(event: &DiscoveryEvent) {
    match event {
        DiscoveryEvent::LoadedClusters(clusters) => {
            info!(clusters = clusters.len(), "cluster list updated");
        }
        DiscoveryEvent::LoadedEnvironments(envs) => {
            info!(environments = %envs.join(","), "environments updated");
        }
        DiscoveryEvent::LoadedRegions(regions) => {
            info!(regions = %regions.join(","), "regions updated");
        }
        DiscoveryEvent::Error(e) => warn!(error = %e, "discovery error"),
    }
}

fn log_access(event: &AccessControlEvent, ctx: &FleetContext) {
    match event {
        AccessControlEvent::Loaded(map) => info!(
            clusters = map.len(),
            next_poll = ?ctx.access_control().next_poll_delay(),
            "ownership map loaded"
        ),
        AccessControlEvent::Error(e) => warn!(
            error = %e,
            next_poll = ?ctx.access_control().next_poll_delay(),
            "ownership poll failed; keeping previous map"
        ),
    }
}
