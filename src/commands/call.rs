use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use secretgate::gateway::{GatewayRequest, GatewayState, MethodRegistry};

pub fn run(state_dir: &Path, method: &str, params: &str) -> Result<()> {
    let params: serde_json::Value =
        serde_json::from_str(params).context("Params must be a JSON object")?;
    let state = Arc::new(GatewayState::open(state_dir).context("Failed to open gateway state")?);

    let response = MethodRegistry::new().dispatch(state, GatewayRequest::new(method, params));
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
