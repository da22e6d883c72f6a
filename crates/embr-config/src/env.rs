//! Environment variable overrides. These always outrank the config file,
//! per `spec.md` §6.

use std::env;

/// `EB_DIR` — explicit repository root, bypassing upward directory search.
pub fn repo_dir_override() -> Option<String> {
    env::var("EB_DIR").ok().filter(|v| !v.is_empty())
}

/// `EB_DEBUG` — any non-empty value enables debug-level logging.
pub fn debug_enabled() -> bool {
    env::var("EB_DEBUG")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default)]
pub struct AuthOverride {
    pub token: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl AuthOverride {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none() && self.password.is_none()
    }
}

/// `EB_AUTH_TOKEN` / `EB_AUTH_USER` / `EB_AUTH_PASSWORD` — remote transport
/// credentials, read once at command-layer entry.
pub fn auth_override() -> AuthOverride {
    AuthOverride {
        token: env::var("EB_AUTH_TOKEN").ok().filter(|v| !v.is_empty()),
        user: env::var("EB_AUTH_USER").ok().filter(|v| !v.is_empty()),
        password: env::var("EB_AUTH_PASSWORD").ok().filter(|v| !v.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_override_is_empty_when_nothing_set() {
        // Best-effort: only asserts the struct's own emptiness logic, since
        // mutating process env in a parallel test run is unreliable.
        let empty = AuthOverride::default();
        assert!(empty.is_empty());
    }
}
