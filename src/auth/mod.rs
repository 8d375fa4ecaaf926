//
//  bkt-cli
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Authentication
//!
//! Both products authenticate with HTTP Basic: Cloud with a username and
//! app password or API token, Data Center with an HTTP access token (the
//! username may be omitted, in which case `x-token-auth` is sent).
//!
//! ## Token Resolution
//!
//! For a host record the secret is taken from, in order:
//!
//! 1. the `BKT_TOKEN` environment variable
//! 2. a `token` field present in the config file
//! 3. the OS keyring entry for the host key
//!
//! The config file never gains a token on save.

mod keyring;

pub use keyring::*;

use anyhow::Result;

use crate::config::HostConfig;

/// Environment variable overriding the stored token.
pub const TOKEN_ENV: &str = "BKT_TOKEN";

/// Storage for per-host secrets.
pub trait SecretStore: Send + Sync {
    /// Saves `secret` for `host`, replacing any previous value.
    fn store(&self, host: &str, secret: &str) -> Result<()>;

    /// Returns the secret for `host`, if one is stored.
    fn get(&self, host: &str) -> Result<Option<String>>;

    /// Removes the secret for `host`; absent entries are not an error.
    fn delete(&self, host: &str) -> Result<()>;
}

/// Returns `host` with its token filled in from the environment, the file
/// or `store`. The token stays empty when none is found.
pub fn with_token(key: &str, host: &HostConfig, store: &dyn SecretStore) -> Result<HostConfig> {
    let env = std::env::var(TOKEN_ENV).ok();
    pick_token(key, host, env, store)
}

fn pick_token(key: &str, host: &HostConfig, env: Option<String>, store: &dyn SecretStore) -> Result<HostConfig> {
    let mut resolved = host.clone();
    if let Some(token) = env.filter(|t| !t.trim().is_empty()) {
        resolved.token = token.trim().to_string();
    } else if resolved.token.is_empty() {
        if let Some(token) = store.get(key)? {
            resolved.token = token;
        }
    }
    Ok(resolved)
}

/// Basic sanity check on a pasted token.
pub fn validate_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory [`SecretStore`] for tests.
    #[derive(Default)]
    pub(crate) struct MemoryStore(Mutex<HashMap<String, String>>);

    impl SecretStore for MemoryStore {
        fn store(&self, host: &str, secret: &str) -> Result<()> {
            self.0.lock().unwrap().insert(host.into(), secret.into());
            Ok(())
        }

        fn get(&self, host: &str) -> Result<Option<String>> {
            Ok(self.0.lock().unwrap().get(host).cloned())
        }

        fn delete(&self, host: &str) -> Result<()> {
            self.0.lock().unwrap().remove(host);
            Ok(())
        }
    }

    #[test]
    fn test_token_precedence() {
        let store = MemoryStore::default();
        store.store("h", "from-keyring").unwrap();

        let mut host = HostConfig::data_center("https://h", "u");
        assert_eq!(pick_token("h", &host, None, &store).unwrap().token, "from-keyring");

        host.token = "from-file".into();
        assert_eq!(pick_token("h", &host, None, &store).unwrap().token, "from-file");
        assert_eq!(
            pick_token("h", &host, Some(" from-env ".into()), &store).unwrap().token,
            "from-env"
        );
    }

    #[test]
    fn test_missing_token_stays_empty() {
        let store = MemoryStore::default();
        let host = HostConfig::cloud("alice");
        assert!(pick_token("bitbucket.org", &host, Some("  ".into()), &store)
            .unwrap()
            .token
            .is_empty());
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_token(" abc123 "));
        assert!(!validate_token(""));
        assert!(!validate_token("has space"));
    }
}
