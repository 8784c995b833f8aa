use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::gateway::{ErrorShape, MethodContext, MethodRegistry, MethodResult};

pub fn register(reg: &mut MethodRegistry) {
    reg.register("mcp.list", Box::new(list));
}

/// One configured MCP server as reported to the UI.
#[derive(Debug, Serialize)]
struct McpServerEntry {
    name: String,
    command: String,
    args: Vec<String>,
    env: Option<BTreeMap<String, String>>,
}

fn list(ctx: &MethodContext) -> MethodResult {
    let config = ctx
        .state
        .config_loader
        .load()
        .map_err(|e| ErrorShape::unavailable(e.to_string()))?;

    let servers: Vec<McpServerEntry> = config
        .mcp_servers
        .into_iter()
        .map(|(name, cfg)| McpServerEntry {
            name,
            command: cfg.command,
            args: cfg.args.unwrap_or_default(),
            env: cfg.env,
        })
        .collect();

    Ok(json!({ "servers": servers }))
}
