//! `validate`: schema-check a cluster discovery document.

use fleetscope_core::ClusterSchema;
use fleetscope_core::discovery::parse_cluster_document;

use crate::cli::{GlobalOpts, ValidateArgs};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ValidateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(&args.file).map_err(|e| CliError::DiscoverySource {
        source_name: args.file.display().to_string(),
        reason: e.to_string(),
    })?;

    let schema = ClusterSchema::load()?;
    let clusters = parse_cluster_document(&schema, &raw)?;
    let hosts: usize = clusters.iter().map(|c| c.instances.len()).sum();

    output::print_output(
        &format!(
            "{}: {} cluster(s), {hosts} host(s)",
            args.file.display(),
            clusters.len()
        ),
        global.quiet,
    );
    Ok(())
}
