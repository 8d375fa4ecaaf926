//
//  bkt-cli
//  config/hosts.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Host records
//!
//! A host record names one Bitbucket deployment and the account used
//! against it. Records are keyed by host name (`bitbucket.org`,
//! `git.example.com`); contexts refer to them by that key.
//!
//! ```yaml
//! hosts:
//!   git.example.com:
//!     kind: dc
//!     base_url: https://git.example.com
//!     username: alice
//! ```
//!
//! The secret never reaches the file: `token` is skipped on serialisation
//! and only populated at runtime from the keyring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{Dialect, TransportOptions, CLOUD_API_URL};

/// The Bitbucket Cloud web host.
pub const BITBUCKET_CLOUD: &str = "bitbucket.org";

/// The Bitbucket Cloud API host.
pub const BITBUCKET_API: &str = "api.bitbucket.org";

/// Which product a host runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    /// Bitbucket Data Center / Server.
    #[default]
    Dc,
    /// Bitbucket Cloud.
    Cloud,
}

impl HostKind {
    /// The REST dialect spoken by this kind of host.
    pub fn dialect(self) -> Dialect {
        match self {
            Self::Dc => Dialect::DataCenter,
            Self::Cloud => Dialect::Cloud,
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dc => "dc",
            Self::Cloud => "cloud",
        })
    }
}

/// One configured Bitbucket deployment.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// `dc` or `cloud`.
    #[serde(default)]
    pub kind: HostKind,

    /// API base URL.
    #[serde(default)]
    pub base_url: String,

    /// Account name used for HTTP Basic auth.
    #[serde(default)]
    pub username: String,

    /// Runtime-only secret.
    #[serde(default, skip_serializing)]
    pub token: String,
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

impl HostConfig {
    /// A Data Center host at `base_url`.
    pub fn data_center(base_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            kind: HostKind::Dc,
            base_url: base_url.into(),
            username: username.into(),
            token: String::new(),
        }
    }

    /// The Bitbucket Cloud host.
    pub fn cloud(username: impl Into<String>) -> Self {
        Self {
            kind: HostKind::Cloud,
            base_url: CLOUD_API_URL.to_string(),
            username: username.into(),
            token: String::new(),
        }
    }

    /// Transport options for this host, with credentials when a token is loaded.
    pub fn transport_options(&self) -> TransportOptions {
        let mut options = TransportOptions::new(self.base_url.clone()).with_dialect(self.kind.dialect());
        if !self.token.is_empty() {
            let username = if self.username.is_empty() && self.kind == HostKind::Dc {
                "x-token-auth"
            } else {
                self.username.as_str()
            };
            options = options.with_credentials(username, self.token.clone());
        }
        options
    }
}

/// `true` for the Cloud web or API host.
pub fn is_cloud_host(host: &str) -> bool {
    host == BITBUCKET_CLOUD || host == BITBUCKET_API
}

/// Lower-cases a host and strips any scheme, path or trailing slash.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host.strip_prefix("https://").unwrap_or(host);
    let host = host.strip_prefix("http://").unwrap_or(host);
    let host = host.split('/').next().unwrap_or(host);
    host.to_lowercase()
}

/// The key a host record is stored under. Both Cloud hosts share one key.
pub fn host_key(base_url: &str) -> String {
    let host = normalize_host(base_url);
    if is_cloud_host(&host) {
        BITBUCKET_CLOUD.to_string()
    } else {
        host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("https://Git.Example.com/context/"), "git.example.com");
        assert_eq!(normalize_host("bitbucket.org"), "bitbucket.org");
    }

    #[test]
    fn test_host_key_merges_cloud_hosts() {
        assert_eq!(host_key(CLOUD_API_URL), BITBUCKET_CLOUD);
        assert_eq!(host_key("https://bitbucket.org"), BITBUCKET_CLOUD);
        assert_eq!(host_key("http://git.local:7990"), "git.local:7990");
    }

    #[test]
    fn test_kind_round_trips_lowercase() {
        let yaml = serde_yaml::to_string(&HostConfig::cloud("alice")).unwrap();
        assert!(yaml.contains("kind: cloud"));
        let back: HostConfig = serde_yaml::from_str("kind: dc\nbase_url: https://x\n").unwrap();
        assert_eq!(back.kind, HostKind::Dc);
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut host = HostConfig::data_center("https://git.example.com", "alice");
        host.token = "hunter2".into();
        assert!(!format!("{host:?}").contains("hunter2"));
    }
}
