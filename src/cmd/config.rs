//! Configuration view and validation commands — `vangraph config`.

use anyhow::Result;
use vangraph::config::{VangraphConfig, VangraphToml};

use super::super::ConfigCommands;

pub fn cmd_config(config: &VangraphConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", console::style("Vangraph Configuration").bold());
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No vangraph.toml found at {}", config_path.display());
                println!("Run 'vangraph init' to create one. Using defaults.");
            }
            println!();

            let toml = &config.toml;
            println!("[server]");
            println!("  host = \"{}\"", toml.server.host);
            println!("  port = {}", toml.server.port);
            println!("  dev = {}", toml.server.dev);
            println!();
            println!("[database]");
            println!("  path = \"{}\"", toml.database.path.display());
            println!();
            println!("[positions]");
            println!("  baseline = {}", toml.positions.baseline);
            println!("  step = {}", toml.positions.step);
            println!("  auto_rebalance = {}", toml.positions.auto_rebalance);
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", toml.logging.level);
            println!("  json = {}", toml.logging.json);
            println!();

            println!("Effective values (with env/CLI overrides):");
            println!("  database = {}", config.db_path().display());
            println!("  verbose = {}", config.verbose);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No vangraph.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = VangraphToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("{}", console::style("Configuration is valid.").green());
            } else {
                println!("{}", console::style("Configuration warnings:").yellow());
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
