//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = super::load(global)?;
            // Validate as well, so `show` surfaces what `run` would reject.
            cfg.to_fleet_config()?;
            output::print_output(cfg.to_toml()?.trim_end(), global.quiet);
        }
        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(fleetscope_config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
        }
    }
    Ok(())
}
