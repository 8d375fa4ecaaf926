//
//  bkt-cli
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration Module
//!
//! Loads and saves the CLI's YAML config: which hosts exist, and which
//! named contexts point at them.
//!
//! ## Configuration File Location
//!
//! - `$BKT_CONFIG_DIR/config.yml` when the variable is set
//! - otherwise the platform config dir for `bkt`
//!   (`~/.config/bkt/config.yml` on Linux)
//!
//! ## Example Configuration File
//!
//! ```yaml
//! version: 1
//! active_context: work
//! contexts:
//!   work:
//!     host: git.example.com
//!     project_key: CORE
//!     default_repo: api
//!   personal:
//!     host: bitbucket.org
//!     workspace: alice
//! hosts:
//!   git.example.com:
//!     kind: dc
//!     base_url: https://git.example.com
//!     username: alice
//!   bitbucket.org:
//!     kind: cloud
//!     base_url: https://api.bitbucket.org/2.0
//!     username: alice
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bkt::config::Config;
//!
//! let mut config = Config::load()?;
//! config.use_context("personal")?;
//! config.save()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod file;
mod hosts;

pub use file::*;
pub use hosts::*;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Current config document version.
pub const CONFIG_VERSION: u32 = 1;

/// Overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "BKT_CONFIG_DIR";

const CONFIG_FILE: &str = "config.yml";

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// The whole config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Document version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Context used when none is named on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_context: Option<String>,

    /// Named contexts.
    #[serde(default)]
    pub contexts: BTreeMap<String, Context>,

    /// Host records keyed by host name.
    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            active_context: None,
            contexts: BTreeMap::new(),
            hosts: BTreeMap::new(),
        }
    }
}

/// A named working context: one host plus default scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Key into [`Config::hosts`].
    pub host: String,

    /// Data Center project key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,

    /// Cloud workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Repository slug used when `--repo` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_repo: Option<String>,
}

impl Config {
    /// Loads from the default location, or returns an empty config.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads from `path`, or returns an empty config if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !config_exists(path) {
            return Ok(Self::default());
        }
        let content = read_config_file(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if config.version > CONFIG_VERSION {
            bail!(
                "{} has version {}, this build understands up to {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        Ok(config)
    }

    /// Saves to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Atomically saves to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = self.to_yaml()?;
        write_config_file(path, &content)
    }

    /// Serialises the document; host tokens are never included.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Directory holding the config file.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let dirs = ProjectDirs::from("", "", "bkt")
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(dirs.config_dir().to_path_buf())
    }

    /// Full path of the config file.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Looks up a context by name.
    pub fn context(&self, name: &str) -> Result<&Context> {
        self.contexts
            .get(name)
            .ok_or_else(|| anyhow!("context {name:?} not found"))
    }

    /// Resolves `name`, falling back to the active context.
    pub fn resolve_context(&self, name: Option<&str>) -> Result<(String, &Context)> {
        let name = match name.or(self.active_context.as_deref()) {
            Some(name) => name,
            None => bail!("no active context; run `bkt context create` or `bkt auth login`"),
        };
        Ok((name.to_string(), self.context(name)?))
    }

    /// Adds or replaces a context. The first context becomes active.
    pub fn set_context(&mut self, name: &str, context: Context) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("context name is required");
        }
        if !self.hosts.contains_key(&context.host) {
            bail!("host {:?} is not configured; run `bkt auth login` first", context.host);
        }
        self.contexts.insert(name.to_string(), context);
        if self.active_context.is_none() {
            self.active_context = Some(name.to_string());
        }
        Ok(())
    }

    /// Makes `name` the active context.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        self.context(name)?;
        self.active_context = Some(name.to_string());
        Ok(())
    }

    /// Looks up a host record.
    pub fn host(&self, key: &str) -> Result<&HostConfig> {
        self.hosts
            .get(key)
            .ok_or_else(|| anyhow!("host {key:?} is not configured"))
    }

    /// Adds or replaces a host record, returning its key.
    pub fn set_host(&mut self, host: HostConfig) -> String {
        let key = host_key(&host.base_url);
        self.hosts.insert(key.clone(), host);
        key
    }

    /// Removes a host and every context that points at it.
    pub fn remove_host(&mut self, key: &str) -> Option<HostConfig> {
        let removed = self.hosts.remove(key)?;
        self.contexts.retain(|_, ctx| ctx.host != key);
        if let Some(active) = &self.active_context {
            if !self.contexts.contains_key(active) {
                self.active_context = None;
            }
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;

    use super::*;

    const SECRET: &str = "s3cr3t-t0ken-value";

    fn sample() -> Config {
        let mut config = Config::default();
        let mut host = HostConfig::data_center("https://git.example.com", "alice");
        host.token = SECRET.to_string();
        let key = config.set_host(host);
        config
            .set_context(
                "work",
                Context {
                    host: key,
                    project_key: Some("CORE".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        config
    }

    #[test]
    fn test_yaml_never_contains_secret() {
        let yaml = sample().to_yaml().unwrap();
        let engine = base64::engine::general_purpose::STANDARD;
        assert!(!yaml.contains(SECRET));
        assert!(!yaml.contains(&engine.encode(SECRET)));
        assert!(!yaml.contains(&engine.encode(format!("alice:{SECRET}"))));
        assert!(!yaml.contains("token"));
    }

    #[test]
    fn test_reload_after_save_has_empty_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        sample().save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        let host = loaded.host("git.example.com").unwrap();
        assert!(host.token.is_empty());
        assert_eq!(host.username, "alice");
        assert_eq!(loaded.active_context.as_deref(), Some("work"));
        assert_eq!(loaded.context("work").unwrap().project_key.as_deref(), Some("CORE"));
    }

    #[test]
    fn test_token_in_file_is_read_back() {
        let yaml = "version: 1\nhosts:\n  h:\n    kind: dc\n    base_url: https://h\n    username: u\n    token: legacy\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.hosts["h"].token, "legacy");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_context_requires_known_host() {
        let mut config = Config::default();
        let err = config
            .set_context(
                "x",
                Context {
                    host: "nowhere".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_remove_host_drops_contexts() {
        let mut config = sample();
        assert!(config.remove_host("git.example.com").is_some());
        assert!(config.contexts.is_empty());
        assert!(config.active_context.is_none());
        assert!(config.resolve_context(None).is_err());
    }
}
