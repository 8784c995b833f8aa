//! Gateway method dispatch.
//!
//! A [`MethodRegistry`] maps dotted method names (`secrets.set`, `mcp.list`)
//! to handlers. A handler returns a [`MethodResult`] instead of calling back,
//! so every request yields exactly one response.

pub mod mcp;
pub mod protocol;
pub mod secrets;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{self, ConfigLoader, FileConfigLoader};
use crate::error::{Result, SecretgateError};
use crate::store::StoreProvider;
use crate::user_secrets::UserSecretsManager;

pub use protocol::{ErrorCode, ErrorShape, GatewayRequest, GatewayResponse};

/// Shared state handed to every handler.
pub struct GatewayState {
    pub manager: UserSecretsManager,
    pub state_dir: PathBuf,
    pub config_loader: Arc<dyn ConfigLoader>,
}

impl GatewayState {
    /// Build the state for `state_dir` from the `[store]` table of its
    /// `config.toml`. `[mcpServers]` is read later, per `mcp.list` call.
    pub fn open(state_dir: &Path) -> Result<Self> {
        let settings = config::read_store_settings(state_dir)?;
        let stores = StoreProvider::from_settings(&settings, state_dir)?;
        Ok(Self {
            manager: UserSecretsManager::new(Arc::new(stores)),
            state_dir: state_dir.to_path_buf(),
            config_loader: Arc::new(FileConfigLoader::new(state_dir)),
        })
    }
}

/// Context passed to every method handler.
pub struct MethodContext {
    pub request_id: Option<String>,
    pub method: String,
    pub params: serde_json::Value,
    pub state: Arc<GatewayState>,
}

/// The result a method handler produces.
pub type MethodResult = std::result::Result<serde_json::Value, ErrorShape>;

pub type HandlerFn = Box<dyn Fn(&MethodContext) -> MethodResult + Send + Sync>;

/// Failures from the manager or config loader. Input errors become
/// `INVALID_REQUEST`; everything else is environmental.
impl From<SecretgateError> for ErrorShape {
    fn from(err: SecretgateError) -> Self {
        match err {
            SecretgateError::InvalidSecret(msg) => ErrorShape::invalid_request(msg),
            other => ErrorShape::unavailable(other.to_string()),
        }
    }
}

pub struct MethodRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    pub fn new() -> Self {
        let mut reg = Self::empty();
        secrets::register(&mut reg);
        mcp::register(&mut reg);
        reg
    }

    /// A registry with no methods.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, method: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(method.into(), handler);
    }

    pub fn dispatch(&self, state: Arc<GatewayState>, request: GatewayRequest) -> GatewayResponse {
        let GatewayRequest { id, method, params } = request;

        let Some(handler) = self.handlers.get(&method) else {
            warn!(method = %method, "unknown method");
            return GatewayResponse::err(
                id,
                ErrorShape::invalid_request(format!("unknown method: {method}")),
            );
        };

        let ctx = MethodContext {
            request_id: id,
            method,
            params,
            state,
        };

        debug!(method = %ctx.method, request_id = ?ctx.request_id, "dispatching method");
        match handler(&ctx) {
            Ok(payload) => {
                debug!(method = %ctx.method, "method ok");
                GatewayResponse::ok(ctx.request_id, payload)
            }
            Err(err) => {
                warn!(method = %ctx.method, code = %err.code, msg = %err.message, "method error");
                GatewayResponse::err(ctx.request_id, err)
            }
        }
    }

    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::store::{SecretStore, StoreProvider};

    pub fn state_with(
        store: Arc<dyn SecretStore>,
        state_dir: &std::path::Path,
        loader: Arc<dyn ConfigLoader>,
    ) -> Arc<GatewayState> {
        Arc::new(GatewayState {
            manager: UserSecretsManager::new(Arc::new(StoreProvider::fixed(store))),
            state_dir: state_dir.to_path_buf(),
            config_loader: loader,
        })
    }

    pub fn empty_loader() -> Arc<dyn ConfigLoader> {
        Arc::new(|| -> Result<GatewayConfig> { Ok(GatewayConfig::default()) })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_method_names_include_builtin_methods() {
        let names = MethodRegistry::new().method_names();
        assert_eq!(
            names,
            vec![
                "mcp.list",
                "secrets.delete",
                "secrets.get",
                "secrets.list",
                "secrets.set"
            ]
        );
    }

    #[test]
    fn test_unknown_method_is_invalid_request() {
        let dir = TempDir::new().unwrap();
        let state = state_with(Arc::new(MemoryStore::new()), dir.path(), empty_loader());

        let mut req = GatewayRequest::new("secrets.nope", json!({}));
        req.id = Some("7".into());
        let resp = MethodRegistry::new().dispatch(state, req);

        assert!(!resp.success);
        assert_eq!(resp.id.as_deref(), Some("7"));
        let err = resp.error.unwrap();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert_eq!(err.message, "unknown method: secrets.nope");
    }

    #[test]
    fn test_registered_handler_receives_params() {
        let dir = TempDir::new().unwrap();
        let state = state_with(Arc::new(MemoryStore::new()), dir.path(), empty_loader());

        let mut reg = MethodRegistry::empty();
        reg.register(
            "echo",
            Box::new(|ctx: &MethodContext| Ok(json!({ "method": ctx.method, "params": ctx.params }))),
        );
        let resp = reg.dispatch(state, GatewayRequest::new("echo", json!({ "a": 1 })));

        assert!(resp.success);
        assert_eq!(
            resp.data.unwrap(),
            json!({ "method": "echo", "params": { "a": 1 } })
        );
    }

    #[test]
    fn test_open_uses_configured_backend() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            config::config_path(dir.path()),
            "[store]\nbackend = \"memory\"\n\n[mcpServers.one]\ncommand = \"one-mcp\"\n",
        )
        .unwrap();
        let state = Arc::new(GatewayState::open(dir.path()).unwrap());
        let registry = MethodRegistry::new();

        let set = GatewayRequest::new("secrets.set", json!({ "name": "FOO", "value": "bar" }));
        assert!(registry.dispatch(Arc::clone(&state), set).success);
        assert_eq!(
            state.manager.stores().selected(),
            Some(crate::store::Backend::Memory)
        );

        let mcp = registry.dispatch(state, GatewayRequest::new("mcp.list", json!({})));
        assert_eq!(mcp.data.unwrap()["servers"][0]["name"], "one");
    }

    #[test]
    fn test_broken_mcp_server_only_fails_mcp_list() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            config::config_path(dir.path()),
            "[store]\nbackend = \"memory\"\n\n[mcpServers.x]\nargs = [\"--flag\"]\n",
        )
        .unwrap();
        let state = Arc::new(GatewayState::open(dir.path()).unwrap());
        let registry = MethodRegistry::new();

        let set = GatewayRequest::new("secrets.set", json!({ "name": "FOO", "value": "bar" }));
        assert!(registry.dispatch(Arc::clone(&state), set).success);
        let list = GatewayRequest::new("secrets.list", json!({}));
        let list = registry.dispatch(Arc::clone(&state), list);
        assert!(list.success);

        let mcp = registry.dispatch(state, GatewayRequest::new("mcp.list", json!({})));
        assert!(!mcp.success);
        assert_eq!(mcp.error.unwrap().code, ErrorCode::Unavailable);
    }

    #[test]
    fn test_secretgate_error_mapping() {
        let shape: ErrorShape = SecretgateError::InvalidSecret("bad".into()).into();
        assert_eq!(shape.code, ErrorCode::InvalidRequest);

        let shape: ErrorShape = SecretgateError::StoreUnavailable("locked".into()).into();
        assert_eq!(shape.code, ErrorCode::Unavailable);
        assert!(shape.message.contains("locked"));
    }
}
