//
//  bkt-cli
//  cli/auth.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Authentication commands.
//!
//! `login` records a host in the config and its token in the keyring, and
//! optionally binds a context to it. `logout` forgets both. `status` lists
//! the configured hosts and where each token would come from.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::Factory;
use crate::api::server::ServerClient;
use crate::api::{CallContext, Transport};
use crate::auth::{validate_token, TOKEN_ENV};
use crate::config::{host_key, Context, HostConfig, HostKind};
use crate::output::TableOutput;

/// Authenticate with a Bitbucket host
#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Log in to Bitbucket Cloud or a Data Center instance
    Login(LoginArgs),

    /// Forget a host and its stored token
    Logout(LogoutArgs),

    /// Show configured hosts
    Status,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Data Center base URL (omit for Bitbucket Cloud)
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// Log in to Bitbucket Cloud
    #[arg(long, conflicts_with = "host")]
    pub cloud: bool,

    /// Account name (Cloud username or email; optional for Data Center tokens)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Read the token from standard input
    #[arg(long)]
    pub with_token: bool,

    /// Create a context with this name bound to the host
    #[arg(long)]
    pub context: Option<String>,

    /// Default Data Center project key for the new context
    #[arg(long)]
    pub project: Option<String>,

    /// Default Cloud workspace for the new context
    #[arg(long)]
    pub workspace: Option<String>,

    /// Skip the verification request
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Host key to log out of (defaults to the active context's host)
    #[arg(long, short = 'H')]
    pub host: Option<String>,
}

/// One row of `auth status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HostStatus {
    pub host: String,
    pub kind: HostKind,
    pub base_url: String,
    pub username: String,
    pub token: String,
}

impl TableOutput for HostStatus {
    fn headers() -> Vec<&'static str> {
        vec!["HOST", "KIND", "URL", "USER", "TOKEN"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.host.clone(),
            self.kind.to_string(),
            self.base_url.clone(),
            if self.username.is_empty() { "-".into() } else { self.username.clone() },
            self.token.clone(),
        ]
    }
}

impl AuthCommand {
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        match &self.command {
            AuthSubcommand::Login(args) => login(factory, args).await,
            AuthSubcommand::Logout(args) => logout(factory, args),
            AuthSubcommand::Status => status(factory),
        }
    }
}

async fn login(factory: &mut Factory, args: &LoginArgs) -> Result<()> {
    let mut host = match (&args.host, args.cloud) {
        (_, true) => HostConfig::cloud(args.username.clone().unwrap_or_default()),
        (Some(url), false) => HostConfig::data_center(normalize_url(url), args.username.clone().unwrap_or_default()),
        (None, false) => {
            let url = factory
                .prompter()
                .input("Bitbucket URL (leave empty for Bitbucket Cloud)", Some(""))?;
            if url.trim().is_empty() {
                HostConfig::cloud(args.username.clone().unwrap_or_default())
            } else {
                HostConfig::data_center(normalize_url(&url), args.username.clone().unwrap_or_default())
            }
        }
    };

    if host.kind == HostKind::Cloud && host.username.is_empty() {
        host.username = factory.prompter().input("Bitbucket username", None)?;
    }

    let token = if args.with_token {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read token from stdin")?;
        line.trim().to_string()
    } else {
        factory.prompter().password("Token")?
    };
    if !validate_token(&token) {
        bail!("Invalid token format");
    }
    host.token = token.trim().to_string();

    if !args.no_verify {
        let spinner = factory.spinner("Verifying token...");
        let verified = verify(&factory.call_context(), &host).await;
        spinner.finish_and_clear();
        verified.context("token verification failed")?;
    }

    let key = host_key(&host.base_url);
    factory.secrets().store(&key, &host.token)?;

    let mut config = factory.config()?.clone();
    config.set_host(host.clone());
    if let Some(name) = &args.context {
        config.set_context(
            name,
            Context {
                host: key.clone(),
                project_key: args.project.clone(),
                workspace: args.workspace.clone(),
                default_repo: None,
            },
        )?;
    }
    factory.save_config(config)?;

    let who = if host.username.is_empty() {
        String::new()
    } else {
        format!(" as {}", host.username)
    };
    factory.out().write_success(&format!("Logged in to {key}{who}"))?;
    if let Some(name) = &args.context {
        factory.out().write_success(&format!("Created context {name}"))?;
    }
    Ok(())
}

/// One cheap authenticated request against `host`.
async fn verify(ctx: &CallContext, host: &HostConfig) -> Result<()> {
    let transport = Arc::new(Transport::new(host.transport_options())?);
    match host.kind {
        HostKind::Cloud => {
            let request = transport.build_request(Method::GET, "/user", None)?;
            transport.execute_discard(ctx, request.no_cache()).await?;
        }
        HostKind::Dc => {
            ServerClient::new(transport).list_projects(ctx, None, 1).await?;
        }
    }
    Ok(())
}

fn logout(factory: &mut Factory, args: &LogoutArgs) -> Result<()> {
    let mut config = factory.config()?.clone();
    let key = match &args.host {
        Some(host) => host_key(host),
        None => {
            let (_, context) = config.resolve_context(factory.global().context.as_deref())?;
            context.host.clone()
        }
    };
    if config.remove_host(&key).is_none() {
        bail!("not logged in to {key}");
    }
    factory.secrets().delete(&key)?;
    factory.save_config(config)?;
    factory.out().write_success(&format!("Logged out of {key}"))
}

fn status(factory: &mut Factory) -> Result<()> {
    let env_token = std::env::var(TOKEN_ENV).is_ok_and(|t| !t.trim().is_empty());
    let mut rows = Vec::new();
    for (key, host) in &factory.config()?.hosts {
        let source = if env_token {
            TOKEN_ENV.to_string()
        } else if !host.token.is_empty() {
            "config file".to_string()
        } else if factory.secrets().get(key).ok().flatten().is_some() {
            "keyring".to_string()
        } else {
            "missing".to_string()
        };
        rows.push(HostStatus {
            host: key.clone(),
            kind: host.kind,
            base_url: host.base_url.clone(),
            username: host.username.clone(),
            token: source,
        });
    }
    factory.out().write_list(&rows)
}

fn normalize_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}
