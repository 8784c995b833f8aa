use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use secretgate::gateway::{GatewayRequest, GatewayState, MethodRegistry};
use serde_json::{Map, Value};

pub fn run(state_dir: &Path, name: &str) -> Result<()> {
    let state = Arc::new(GatewayState::open(state_dir).context("Failed to open gateway state")?);

    let value = rpassword::prompt_password(format!("Value for '{}': ", name))
        .context("Failed to read secret value")?;

    let response = MethodRegistry::new().dispatch(state, set_request(name, value));
    if let Some(err) = response.error {
        bail!("{}", err);
    }

    println!("Secret '{}' saved.", name);
    Ok(())
}

/// Moves `value` into the params; no other copy of the plaintext is made.
fn set_request(name: &str, value: String) -> GatewayRequest {
    let mut params = Map::new();
    params.insert("name".into(), Value::String(name.to_string()));
    params.insert("value".into(), Value::String(value));
    GatewayRequest::new("secrets.set", Value::Object(params))
}
