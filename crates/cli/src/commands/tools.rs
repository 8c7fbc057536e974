//! `chatloom tools` — Inspect the configured tool servers.

use chatloom_config::McpConfig;
use chatloom_gateway::ToolGateway;
use std::path::PathBuf;

pub async fn run(
    mcp_config: Option<PathBuf>,
    probe: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match mcp_config {
        Some(path) => McpConfig::load_file(&path)?,
        None => McpConfig::load_merged(&McpConfig::user_path(), &McpConfig::workspace_path())?,
    };

    if catalog.servers.is_empty() {
        println!("No tool servers configured.");
        println!();
        println!("Add servers to one of:");
        println!("  {}", McpConfig::user_path().display());
        println!("  {}", McpConfig::workspace_path().display());
        return Ok(());
    }

    let descriptors = catalog.to_descriptors();
    let disabled = catalog.servers.len() - descriptors.len();

    println!("Configured tool servers:");
    println!();
    for descriptor in &descriptors {
        let command_line = if descriptor.args.is_empty() {
            descriptor.command.clone()
        } else {
            format!("{} {}", descriptor.command, descriptor.args.join(" "))
        };

        if probe {
            let available = ToolGateway::is_available(descriptor).await;
            let status = if available { "ok" } else { "unavailable" };
            println!("  {:<24} {:<12} {}", descriptor.name, status, command_line);
        } else {
            println!("  {:<24} {}", descriptor.name, command_line);
        }
    }

    if disabled > 0 {
        println!();
        println!("({disabled} disabled server(s) not shown)");
    }

    Ok(())
}
