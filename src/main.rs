use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "vangraph")]
#[command(version, about = "Project board with fractional card ordering")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .vangraph/ with a default config and an empty database
    Init,
    /// Serve the board HTTP API
    Serve {
        /// Port to serve on (overrides vangraph.toml and VANGRAPH_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (listen on all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,

        /// Keep the board in memory instead of the SQLite file
        #[arg(long)]
        in_memory: bool,
    },
    /// Create or list projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Create, move or list issues
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },
    /// Print a project's board, column by column
    Board { project_id: i64 },
    /// Renumber the positions of one column
    Rebalance { project_id: i64, column: String },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    List,
}

#[derive(Subcommand, Clone)]
pub enum IssueCommands {
    /// Add an issue at the end of a column
    Create {
        project_id: i64,
        title: String,
        #[arg(short, long, default_value = "backlog")]
        column: String,
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Repeat for several labels
        #[arg(short, long = "label")]
        labels: Vec<String>,
    },
    /// Move an issue to a column, optionally at a given index
    Move {
        issue_id: i64,
        column: String,
        /// Drop index among the column's other cards; omit to append
        #[arg(short, long)]
        index: Option<usize>,
    },
    List {
        project_id: i64,
        #[arg(short, long)]
        column: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = vangraph::config::VangraphConfig::with_cli_args(project_dir, cli.verbose)?;
    vangraph::logging::init(
        &config.toml.logging.level,
        config.toml.logging.json,
        config.verbose,
    );

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config).await?,
        Commands::Serve {
            port,
            dev,
            in_memory,
        } => cmd::cmd_serve(&config, *port, *dev, *in_memory).await?,
        Commands::Project { command } => cmd::cmd_project(&config, command.clone()).await?,
        Commands::Issue { command } => cmd::cmd_issue(&config, command.clone()).await?,
        Commands::Board { project_id } => cmd::cmd_board(&config, *project_id).await?,
        Commands::Rebalance { project_id, column } => {
            cmd::cmd_rebalance(&config, *project_id, column).await?
        }
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
