//
//  bkt-cli
//  cli/factory.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Command Factory
//!
//! Every command receives a [`Factory`] by reference. It owns the
//! capabilities a command may need and builds them lazily:
//!
//! - config (loaded once on first use)
//! - output streams ([`OutputWriter`])
//! - prompting ([`Prompter`])
//! - progress spinners
//! - API sessions for the resolved context
//!
//! Tests build one with [`Factory::with_parts`] over a temporary config,
//! in-memory streams and a memory secret store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context as _, Result};
use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::OnceCell;

use super::GlobalOptions;
use crate::api::cloud::{CloudClient, CloudRepo};
use crate::api::server::{ServerClient, ServerRepo};
use crate::api::{CallContext, Transport};
use crate::auth::{with_token, KeyringStore, SecretStore};
use crate::config::{Config, Context, HostConfig, HostKind};
use crate::output::{OutputFormat, OutputWriter};

/// Interactive input.
pub trait Prompter: Send + Sync {
    /// Free-text input; `default` is offered when present.
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Hidden input.
    fn password(&self, prompt: &str) -> Result<String>;

    /// Yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Terminal prompts via `dialoguer`.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn password(&self, prompt: &str) -> Result<String> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(default).interact()?)
    }
}

/// Prompter for non-interactive runs: inputs fail, confirmations take their default.
pub struct NoPrompter;

impl Prompter for NoPrompter {
    fn input(&self, prompt: &str, _default: Option<&str>) -> Result<String> {
        bail!("{prompt}: input required but prompts are disabled")
    }

    fn password(&self, prompt: &str) -> Result<String> {
        bail!("{prompt}: input required but prompts are disabled")
    }

    fn confirm(&self, _prompt: &str, default: bool) -> Result<bool> {
        Ok(default)
    }
}

/// A bound API client for the resolved context.
pub enum Client {
    /// Bitbucket Cloud.
    Cloud(CloudClient),
    /// Bitbucket Data Center.
    Server(ServerClient),
}

/// Everything a command needs to call the API.
pub struct Session {
    /// Context name.
    pub name: String,
    /// Resolved context.
    pub context: Context,
    /// Host key.
    pub host_key: String,
    /// Host record with its token loaded.
    pub host: HostConfig,
    /// Shared transport.
    pub transport: Arc<Transport>,
    /// Bound client.
    pub client: Client,
}

/// Resolved repository locator for the active product.
pub enum RepoTarget {
    /// Cloud `(workspace, slug)`.
    Cloud(CloudClient, CloudRepo),
    /// Data Center `(project, slug)`.
    Server(ServerClient, ServerRepo),
}

/// Lazily-built command capabilities.
pub struct Factory {
    global: GlobalOptions,
    config_path: Option<PathBuf>,
    config: OnceCell<Config>,
    secrets: Box<dyn SecretStore>,
    prompter: Box<dyn Prompter>,
    out: OutputWriter,
    interactive: bool,
}

impl Factory {
    /// A factory for a real terminal session.
    pub fn new(global: GlobalOptions) -> Self {
        let interactive = console::user_attended() && !global.no_prompt;
        let format = OutputFormat::from_flags(global.json, global.yaml);
        let prompter: Box<dyn Prompter> = if interactive {
            Box::new(TerminalPrompter)
        } else {
            Box::new(NoPrompter)
        };
        Self {
            global,
            config_path: None,
            config: OnceCell::new(),
            secrets: Box::new(KeyringStore::new()),
            prompter,
            out: OutputWriter::stdout(format),
            interactive,
        }
    }

    /// A factory with explicit capabilities.
    pub fn with_parts(
        global: GlobalOptions,
        config_path: PathBuf,
        secrets: Box<dyn SecretStore>,
        prompter: Box<dyn Prompter>,
        out: OutputWriter,
    ) -> Self {
        Self {
            global,
            config_path: Some(config_path),
            config: OnceCell::new(),
            secrets,
            prompter,
            out,
            interactive: false,
        }
    }

    /// Global flags.
    pub fn global(&self) -> &GlobalOptions {
        &self.global
    }

    /// Output writer.
    pub fn out(&mut self) -> &mut OutputWriter {
        &mut self.out
    }

    /// Prompter.
    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    /// Secret store.
    pub fn secrets(&self) -> &dyn SecretStore {
        self.secrets.as_ref()
    }

    /// `--limit`, or `default` when absent.
    pub fn limit(&self, default: usize) -> usize {
        self.global.limit.unwrap_or(default)
    }

    fn path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Config::config_path(),
        }
    }

    /// The config, loaded on first use.
    pub fn config(&self) -> Result<&Config> {
        self.config.get_or_try_init(|| {
            let path = self.path()?;
            Config::load_from(&path).with_context(|| format!("loading {}", path.display()))
        })
    }

    /// Persists `config` and refreshes the cached copy.
    pub fn save_config(&mut self, config: Config) -> Result<()> {
        config.save_to(&self.path()?)?;
        self.config = OnceCell::with_value(config);
        Ok(())
    }

    /// A call context cancelled on Ctrl-C.
    pub fn call_context(&self) -> CallContext {
        let ctx = CallContext::background();
        let handle = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.cancel();
            }
        });
        ctx
    }

    /// A spinner on stderr; hidden for structured output or non-terminals.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.interactive || self.out.format().is_structured() {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    /// Builds an API session for `--context` or the active context.
    pub fn session(&self) -> Result<Session> {
        let config = self.config()?;
        let (name, context) = config.resolve_context(self.global.context.as_deref())?;
        let stored = config.host(&context.host)?;
        let host = with_token(&context.host, stored, self.secrets())?;
        if host.token.is_empty() {
            bail!(
                "no token for {}; run `bkt auth login` or set BKT_TOKEN",
                context.host
            );
        }

        let options = host
            .transport_options()
            .with_cache(true)
            .with_user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION));
        let transport = Arc::new(Transport::new(options)?);
        let client = match host.kind {
            HostKind::Cloud => Client::Cloud(CloudClient::new(transport.clone())),
            HostKind::Dc => Client::Server(ServerClient::new(transport.clone())),
        };
        Ok(Session {
            name,
            context: context.clone(),
            host_key: context.host.clone(),
            host,
            transport,
            client,
        })
    }

    /// Resolves `arg`, else `--repo`, against the session's context.
    pub fn repo(&self, arg: Option<&str>) -> Result<RepoTarget> {
        let session = self.session()?;
        resolve_repo(session, arg.or(self.global.repo.as_deref()))
    }
}

/// Resolves a repository argument (`owner/slug` or bare `slug`) for a session.
pub fn resolve_repo(session: Session, repo: Option<&str>) -> Result<RepoTarget> {
    let raw = repo
        .map(str::to_string)
        .or_else(|| session.context.default_repo.clone())
        .ok_or_else(|| anyhow!("no repository; pass --repo or set default_repo on the context"))?;

    match session.client {
        Client::Cloud(client) => {
            let repo = match raw.split_once('/') {
                Some(_) => CloudRepo::parse(&raw)?,
                None => {
                    let workspace = session.context.workspace.as_deref().ok_or_else(|| {
                        anyhow!("context {} has no workspace; pass --repo <workspace>/<repo>", session.name)
                    })?;
                    CloudRepo::new(workspace, &raw)?
                }
            };
            Ok(RepoTarget::Cloud(client, repo))
        }
        Client::Server(client) => {
            let repo = match raw.split_once('/') {
                Some(_) => ServerRepo::parse(&raw)?,
                None => {
                    let key = session.context.project_key.as_deref().ok_or_else(|| {
                        anyhow!("context {} has no project_key; pass --repo <project>/<repo>", session.name)
                    })?;
                    ServerRepo::new(key, &raw)?
                }
            };
            Ok(RepoTarget::Server(client, repo))
        }
    }
}
