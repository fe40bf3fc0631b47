//! Project initialization — `vangraph init`.

use anyhow::{Context, Result};
use tracing::info;
use vangraph::config::{VangraphConfig, VangraphToml};

pub async fn cmd_init(config: &VangraphConfig) -> Result<()> {
    std::fs::create_dir_all(&config.vangraph_dir)
        .with_context(|| format!("Failed to create {}", config.vangraph_dir.display()))?;

    let config_path = config.config_file();
    if config_path.exists() {
        println!("Config already present at {}", config_path.display());
    } else {
        VangraphToml::default().save(&config_path)?;
        println!("Created {}", config_path.display());
    }

    // Opening the store runs the migrations.
    super::open_store(config)?;
    info!(db = %config.db_path().display(), "database ready");

    println!(
        "{} Initialized vangraph project in {}",
        console::style("✓").green(),
        config.project_dir.display()
    );
    Ok(())
}
