//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled        |
//! |-----------|-------------------------|
//! | `init`    | `Init`                  |
//! | `serve`   | `Serve`                 |
//! | `project` | `Project`               |
//! | `issue`   | `Issue`                 |
//! | `board`   | `Board`, `Rebalance`    |
//! | `config`  | `Config`                |

pub mod board;
pub mod config;
pub mod init;
pub mod issue;
pub mod project;
pub mod serve;

pub use board::{cmd_board, cmd_rebalance};
pub use config::cmd_config;
pub use init::cmd_init;
pub use issue::cmd_issue;
pub use project::cmd_project;
pub use serve::cmd_serve;

use std::sync::Arc;

use anyhow::Result;
use vangraph::board::store::IssueStore;
use vangraph::config::VangraphConfig;

/// Open the project's SQLite board.
pub fn open_store(config: &VangraphConfig) -> Result<Arc<dyn IssueStore>> {
    config.server_config()?.open_store()
}
