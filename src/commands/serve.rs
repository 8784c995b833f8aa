use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use secretgate::gateway::{
    ErrorShape, GatewayRequest, GatewayResponse, GatewayState, MethodRegistry,
};

/// One JSON request per stdin line, one JSON response per stdout line.
/// Runs until stdin closes.
pub fn run(state_dir: &Path) -> Result<()> {
    let state = Arc::new(GatewayState::open(state_dir).context("Failed to open gateway state")?);
    let registry = MethodRegistry::new();
    tracing::info!(state_dir = %state_dir.display(), "serving gateway on stdio");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<GatewayRequest>(&line) {
            Ok(request) => registry.dispatch(Arc::clone(&state), request),
            Err(e) => GatewayResponse::err(
                None,
                ErrorShape::invalid_request(format!("malformed request: {}", e)),
            ),
        };

        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    Ok(())
}
