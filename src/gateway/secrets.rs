use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::gateway::{ErrorShape, MethodContext, MethodRegistry, MethodResult};
use crate::user_secrets::is_valid_secret_name;

const NAME_RULE: &str = "Secret name must be uppercase letters, digits and underscores only";

pub fn register(reg: &mut MethodRegistry) {
    reg.register("secrets.list", Box::new(list));
    reg.register("secrets.set", Box::new(set));
    reg.register("secrets.delete", Box::new(delete));
    reg.register("secrets.get", Box::new(get));
}

fn list(ctx: &MethodContext) -> MethodResult {
    let secrets = ctx.state.manager.list(&ctx.state.state_dir)?;
    Ok(json!({ "secrets": secrets }))
}

fn set(ctx: &MethodContext) -> MethodResult {
    let name = secret_name(&ctx.params).ok_or_else(|| {
        ErrorShape::invalid_request(format!("{NAME_RULE} (e.g. GOOGLE_API_KEY)"))
    })?;
    let value = match ctx.params.get("value").and_then(Value::as_str) {
        Some(v) if !v.is_empty() => SecretString::new(v.to_string()),
        _ => return Err(ErrorShape::invalid_request("Secret value is required")),
    };

    ctx.state.manager.set(name, value, &ctx.state.state_dir)?;
    Ok(json!({ "ok": true }))
}

fn delete(ctx: &MethodContext) -> MethodResult {
    let name = secret_name(&ctx.params).ok_or_else(|| ErrorShape::invalid_request(NAME_RULE))?;
    ctx.state.manager.delete(name, &ctx.state.state_dir)?;
    Ok(json!({ "ok": true }))
}

fn get(ctx: &MethodContext) -> MethodResult {
    let name = secret_name(&ctx.params).ok_or_else(|| ErrorShape::invalid_request(NAME_RULE))?;
    match ctx.state.manager.get_value(name)? {
        Some(value) => Ok(json!({ "value": value.expose_secret() })),
        None => Err(ErrorShape::not_found(format!("Secret not found: {name}"))),
    }
}

/// The `name` param, if present, a string, and canonical.
fn secret_name(params: &Value) -> Option<&str> {
    params
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| is_valid_secret_name(name))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::{Result, SecretgateError};
    use crate::gateway::test_support::{empty_loader, state_with};
    use crate::gateway::{ErrorCode, GatewayRequest, GatewayResponse, GatewayState};
    use crate::store::{Backend, MemoryStore, SecretStore};
    use tempfile::TempDir;

    /// Memory store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        sets: AtomicUsize,
        deletes: AtomicUsize,
    }

    impl SecretStore for CountingStore {
        fn backend(&self) -> Backend {
            Backend::Memory
        }

        fn is_available(&self) -> bool {
            true
        }

        fn get(&self, key: &str) -> Result<Option<SecretString>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: SecretString) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(key)
        }
    }

    struct UnreachableStore;

    impl SecretStore for UnreachableStore {
        fn backend(&self) -> Backend {
            Backend::Keychain
        }

        fn is_available(&self) -> bool {
            false
        }

        fn get(&self, _key: &str) -> Result<Option<SecretString>> {
            Err(SecretgateError::StoreUnavailable("daemon absent".into()))
        }

        fn set(&self, _key: &str, _value: SecretString) -> Result<()> {
            Err(SecretgateError::StoreUnavailable("daemon absent".into()))
        }

        fn delete(&self, _key: &str) -> Result<()> {
            Err(SecretgateError::StoreUnavailable("daemon absent".into()))
        }
    }

    struct Harness {
        _dir: TempDir,
        store: Arc<CountingStore>,
        state: Arc<GatewayState>,
        registry: MethodRegistry,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(CountingStore::default());
            let state = state_with(store.clone(), dir.path(), empty_loader());
            Self {
                _dir: dir,
                store,
                state,
                registry: MethodRegistry::new(),
            }
        }

        fn call(&self, method: &str, params: Value) -> GatewayResponse {
            self.registry
                .dispatch(Arc::clone(&self.state), GatewayRequest::new(method, params))
        }
    }

    fn error_code(resp: &GatewayResponse) -> ErrorCode {
        assert!(!resp.success, "expected failure, got {resp:?}");
        resp.error.as_ref().expect("error payload").code
    }

    #[test]
    fn test_list_returns_secrets() {
        let h = Harness::new();
        assert!(h.call("secrets.set", json!({ "name": "FOO", "value": "bar" })).success);

        let resp = h.call("secrets.list", json!({}));
        assert!(resp.success);
        let data = resp.data.unwrap();
        let secrets = data["secrets"].as_array().unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0]["name"], "FOO");
        assert!(secrets[0]["createdAt"].is_string());
    }

    #[test]
    fn test_list_fresh_state_is_empty() {
        let h = Harness::new();
        let resp = h.call("secrets.list", json!({}));
        assert_eq!(resp.data.unwrap(), json!({ "secrets": [] }));
    }

    #[test]
    fn test_set_saves_secret_and_returns_ok() {
        let h = Harness::new();
        let resp = h.call("secrets.set", json!({ "name": "FOO", "value": "bar" }));
        assert!(resp.success);
        assert_eq!(resp.data.unwrap(), json!({ "ok": true }));
        assert_eq!(h.store.sets.load(Ordering::SeqCst), 1);

        let resp = h.call("secrets.get", json!({ "name": "FOO" }));
        assert_eq!(resp.data.unwrap(), json!({ "value": "bar" }));
    }

    #[test]
    fn test_set_rejects_invalid_names() {
        let h = Harness::new();
        for name in [json!("invalid name!"), json!(""), json!("lower"), json!(42), Value::Null] {
            let resp = h.call("secrets.set", json!({ "name": name, "value": "x" }));
            assert_eq!(error_code(&resp), ErrorCode::InvalidRequest);
            assert!(resp.error.unwrap().message.contains("GOOGLE_API_KEY"));
        }
        assert_eq!(h.store.sets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_set_rejects_missing_or_empty_value_without_touching_store() {
        let h = Harness::new();
        for params in [
            json!({ "name": "FOO", "value": "" }),
            json!({ "name": "FOO" }),
            json!({ "name": "FOO", "value": 5 }),
        ] {
            let resp = h.call("secrets.set", params);
            assert_eq!(error_code(&resp), ErrorCode::InvalidRequest);
            assert_eq!(resp.error.unwrap().message, "Secret value is required");
        }
        assert_eq!(h.store.sets.load(Ordering::SeqCst), 0);
        assert!(h.call("secrets.list", json!({})).data.unwrap()["secrets"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_returns_ok_and_is_idempotent() {
        let h = Harness::new();
        h.call("secrets.set", json!({ "name": "FOO", "value": "bar" }));

        for _ in 0..2 {
            let resp = h.call("secrets.delete", json!({ "name": "FOO" }));
            assert!(resp.success);
            assert_eq!(resp.data.unwrap(), json!({ "ok": true }));
        }
        assert_eq!(
            error_code(&h.call("secrets.get", json!({ "name": "FOO" }))),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_delete_rejects_invalid_name() {
        let h = Harness::new();
        let resp = h.call("secrets.delete", json!({ "name": "" }));
        assert_eq!(error_code(&resp), ErrorCode::InvalidRequest);
        assert_eq!(h.store.deletes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let h = Harness::new();
        let resp = h.call("secrets.get", json!({ "name": "MISSING" }));
        assert_eq!(error_code(&resp), ErrorCode::NotFound);
        assert_eq!(resp.error.unwrap().message, "Secret not found: MISSING");
    }

    #[test]
    fn test_get_rejects_invalid_name() {
        let h = Harness::new();
        let resp = h.call("secrets.get", json!({ "name": "invalid!" }));
        assert_eq!(error_code(&resp), ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_store_failures_surface_as_unavailable() {
        let dir = TempDir::new().unwrap();
        let state = state_with(Arc::new(UnreachableStore), dir.path(), empty_loader());
        let registry = MethodRegistry::new();

        for (method, params) in [
            ("secrets.set", json!({ "name": "FOO", "value": "bar" })),
            ("secrets.delete", json!({ "name": "FOO" })),
            ("secrets.get", json!({ "name": "FOO" })),
        ] {
            let resp = registry.dispatch(Arc::clone(&state), GatewayRequest::new(method, params));
            assert_eq!(error_code(&resp), ErrorCode::Unavailable, "{method}");
            assert!(resp.error.unwrap().message.contains("unavailable"));
        }
    }

    #[test]
    fn test_journal_failure_surfaces_as_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("state");
        std::fs::write(&blocked, "not a directory").unwrap();
        let state = state_with(Arc::new(MemoryStore::new()), &blocked, empty_loader());

        let resp = MethodRegistry::new()
            .dispatch(state, GatewayRequest::new("secrets.list", json!({})));
        assert_eq!(error_code(&resp), ErrorCode::Unavailable);
    }
}
