//! `clusters`: discover once and list what was found.

use std::sync::Arc;
use std::time::Duration;

use tabled::Tabled;
use tokio::sync::broadcast;

use fleetscope_core::{ClusterDefinition, CoreError, DiscoveryEvent, DiscoveryService};

use crate::cli::{ClustersArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Type")]
    datastore_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Env")]
    env: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Hosts")]
    hosts: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn to_row(cluster: &ClusterDefinition, color: bool) -> ClusterRow {
    let hosts = if cluster.instances.is_empty() {
        output::dim("-", color)
    } else {
        cluster.hostnames().collect::<Vec<_>>().join(", ")
    };
    let status = cluster
        .instances
        .iter()
        .map(|i| output::paint_status(i.status.as_deref().unwrap_or("?"), color))
        .collect::<Vec<_>>()
        .join(" ");
    ClusterRow {
        datastore_type: cluster.datastore_type.to_string(),
        name: cluster.name.clone(),
        env: cluster.env.clone(),
        region: cluster.region.clone(),
        hosts,
        status,
    }
}

pub async fn handle(args: ClustersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let fleet = super::fleet_config(global)?;
    let discovery = DiscoveryService::from_config(&fleet.discovery)?;

    let mut rx = discovery.subscribe();
    discovery.start().await?;
    tokio::time::timeout(Duration::from_secs(args.wait), first_cluster_list(&mut rx))
        .await
        .map_err(|_| CliError::Timeout { seconds: args.wait })??;

    let snapshot = discovery.snapshot();
    let mut clusters: Vec<ClusterDefinition> = snapshot
        .all_clusters()
        .filter(|c| args.datastore_type.is_none_or(|t| c.datastore_type == t))
        .map(|c| ClusterDefinition::clone(c))
        .collect();
    clusters.sort_by(|a, b| a.key().cmp(&b.key()));
    tracing::debug!(
        clusters = clusters.len(),
        provider = discovery.provider_name(),
        "listing discovered clusters"
    );

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &clusters,
        |c| to_row(c, color),
        |c| c.key().to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Wait for the first cluster list; a discovery error ends the wait.
async fn first_cluster_list(rx: &mut broadcast::Receiver<DiscoveryEvent>) -> Result<(), CliError> {
    loop {
        match rx.recv().await {
            Ok(DiscoveryEvent::LoadedClusters(_)) | Err(broadcast::error::RecvError::Lagged(_)) => {
                return Ok(());
            }
            Ok(DiscoveryEvent::Error(e)) => return Err(shared_error(e)),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Closed) => {
                return Err(CliError::Internal {
                    message: "discovery stopped before publishing clusters".into(),
                });
            }
        }
    }
}

/// Convert an error broadcast to every subscriber.
pub(crate) fn shared_error(err: Arc<CoreError>) -> CliError {
    Arc::try_unwrap(err).map_or_else(
        |shared| CliError::Internal {
            message: shared.to_string(),
        },
        CliError::from,
    )
}
