//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod clusters;
pub mod config_cmd;
pub mod owners;
pub mod run;
pub mod validate;

use fleetscope_config::Config;
use fleetscope_core::FleetConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs the fleet configuration.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(global).await,
        Command::Clusters(args) => clusters::handle(args, global).await,
        Command::Owners => owners::handle(global).await,
        Command::Validate(args) => validate::handle(&args, global),
        Command::Config(args) => config_cmd::handle(args, global),
        // Completions are generated before dispatch
        Command::Completions(_) => unreachable!(),
    }
}

/// Load the effective configuration from `--config` (or the default path)
/// plus the environment.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(fleetscope_config::load_config(global.config.as_deref())?)
}

/// Load and validate into the core's runtime configuration.
pub fn fleet_config(global: &GlobalOpts) -> Result<FleetConfig, CliError> {
    Ok(load(global)?.to_fleet_config()?)
}
