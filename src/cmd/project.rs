//! Project commands — `vangraph project`.

use anyhow::{Result, bail};
use vangraph::config::VangraphConfig;

use super::super::ProjectCommands;

pub async fn cmd_project(config: &VangraphConfig, command: ProjectCommands) -> Result<()> {
    let store = super::open_store(config)?;

    match command {
        ProjectCommands::Create { name, description } => {
            if name.trim().is_empty() {
                bail!("Project name must not be empty");
            }
            let project = store.create_project(&name, &description).await?;
            println!(
                "Created project {} {}",
                console::style(format!("#{}", project.id)).bold(),
                project.name
            );
        }
        ProjectCommands::List => {
            let projects = store.list_projects().await?;
            if projects.is_empty() {
                println!("No projects yet. Create one with 'vangraph project create <name>'.");
                return Ok(());
            }
            for project in projects {
                println!(
                    "{:>4}  {}  {}",
                    format!("#{}", project.id),
                    project.name,
                    console::style(&project.description).dim()
                );
            }
        }
    }

    Ok(())
}
