//! `owners`: fetch the cluster ownership map once.

use serde::Serialize;
use tabled::Tabled;

use fleetscope_core::{AccessControlEvent, FleetContext};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Ownership {
    cluster: String,
    groups: Vec<String>,
}

#[derive(Tabled)]
struct OwnershipRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Groups")]
    groups: String,
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = FleetContext::new(super::fleet_config(global)?)?;
    let access = ctx.access_control();

    // `start` polls once before returning, so the first event is already queued.
    let mut rx = access.subscribe();
    access.start().await?;
    let first = rx.try_recv();
    access.shutdown().await;
    if let Ok(AccessControlEvent::Error(e)) = first {
        return Err(super::clusters::shared_error(e));
    }

    let map = access.current();
    let entries: Vec<Ownership> = map
        .iter()
        .map(|(cluster, groups)| Ownership {
            cluster: cluster.clone(),
            groups: groups.iter().cloned().collect(),
        })
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &entries,
        |o| OwnershipRow {
            cluster: o.cluster.clone(),
            groups: if o.groups.is_empty() {
                output::dim("(nobody)", color)
            } else {
                o.groups.join(", ")
            },
        },
        |o| o.cluster.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
