//! Board API server command — `vangraph serve`.

use anyhow::Result;
use vangraph::config::VangraphConfig;

pub async fn cmd_serve(
    config: &VangraphConfig,
    port: Option<u16>,
    dev: bool,
    in_memory: bool,
) -> Result<()> {
    for warning in config.validate() {
        println!("{} {}", console::style("warning:").yellow(), warning);
    }

    let mut server = config.server_config()?;
    if let Some(port) = port {
        server.port = port;
    }
    server.dev_mode |= dev;
    server.in_memory = in_memory;

    vangraph::board::server::start_server(server).await
}
