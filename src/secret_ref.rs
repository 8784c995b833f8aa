/// Namespace shared by every ref this gateway writes to a backend.
pub const USER_SECRETS_NAMESPACE: &str = "ya";

/// Provider segment for secrets the user manages by name.
pub const USER_SECRETS_PROVIDER: &str = "user-secrets";

const SEPARATOR: char = ':';

/// Build the backend lookup key for a secret.
///
/// The result is `{namespace}:{provider}:{scope}`. Callers pass an already
/// normalized scope; see [`user_secret_ref`] for the user-secrets convention.
pub fn build_secret_ref(namespace: &str, provider: &str, scope: &str) -> String {
    let mut out = String::with_capacity(namespace.len() + provider.len() + scope.len() + 2);
    out.push_str(namespace);
    out.push(SEPARATOR);
    out.push_str(provider);
    out.push(SEPARATOR);
    out.push_str(scope);
    out
}

/// Ref for a user secret. Backend keys are case-sensitive, so the scope is
/// always the lower-cased canonical name.
pub fn user_secret_ref(name: &str) -> String {
    build_secret_ref(
        USER_SECRETS_NAMESPACE,
        USER_SECRETS_PROVIDER,
        &name.to_lowercase(),
    )
}
