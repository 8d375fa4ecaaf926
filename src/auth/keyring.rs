//
//  bkt-cli
//  auth/keyring.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! OS keyring storage for host tokens.
//!
//! Tokens are stored under the service `bkt-cli` with the host key as the
//! account name:
//!
//! | Platform | Backend |
//! |----------|---------|
//! | macOS | Keychain |
//! | Windows | Credential Manager |
//! | Linux | Secret Service (GNOME Keyring, KWallet) |

use anyhow::{Context, Result};
use keyring::Entry;

use super::SecretStore;

const SERVICE_NAME: &str = "bkt-cli";

/// Token store backed by the platform keyring.
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    /// A store using the `bkt-cli` service name.
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, host: &str) -> Result<Entry> {
        Entry::new(&self.service, host).with_context(|| format!("keyring unavailable for {host}"))
    }
}

impl SecretStore for KeyringStore {
    fn store(&self, host: &str, secret: &str) -> Result<()> {
        self.entry(host)?
            .set_password(secret)
            .with_context(|| format!("failed to store token for {host}"))
    }

    fn get(&self, host: &str) -> Result<Option<String>> {
        match self.entry(host)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read token for {host}")),
        }
    }

    fn delete(&self, host: &str) -> Result<()> {
        match self.entry(host)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete token for {host}")),
        }
    }
}
