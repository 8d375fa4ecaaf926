//
//  bkt-cli
//  cli/context.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use super::Factory;
use crate::config::Context;
use crate::output::TableOutput;

/// Manage contexts
#[derive(Args, Debug)]
pub struct ContextCommand {
    #[command(subcommand)]
    pub command: ContextSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ContextSubcommand {
    /// Make a context active
    Use(UseArgs),

    /// List contexts
    #[command(visible_alias = "ls")]
    List,

    /// Create or replace a context
    Create(CreateArgs),
}

#[derive(Args, Debug)]
pub struct UseArgs {
    /// Context name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Context name
    pub name: String,

    /// Host key (as shown by `bkt auth status`)
    #[arg(long, short = 'H')]
    pub host: String,

    /// Default Data Center project key
    #[arg(long)]
    pub project: Option<String>,

    /// Default Cloud workspace
    #[arg(long)]
    pub workspace: Option<String>,

    /// Repository used when --repo is not given
    #[arg(long)]
    pub default_repo: Option<String>,

    /// Make the new context active
    #[arg(long)]
    pub activate: bool,
}

#[derive(Debug, Serialize)]
struct ContextRow {
    name: String,
    active: bool,
    #[serde(flatten)]
    context: Context,
}

impl TableOutput for ContextRow {
    fn headers() -> Vec<&'static str> {
        vec!["", "NAME", "HOST", "PROJECT", "WORKSPACE", "REPO"]
    }

    fn row(&self) -> Vec<String> {
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
        vec![
            if self.active { "*".into() } else { String::new() },
            self.name.clone(),
            self.context.host.clone(),
            or_dash(&self.context.project_key),
            or_dash(&self.context.workspace),
            or_dash(&self.context.default_repo),
        ]
    }
}

impl ContextCommand {
    pub fn run(&self, factory: &mut Factory) -> Result<()> {
        match &self.command {
            ContextSubcommand::Use(args) => {
                let mut config = factory.config()?.clone();
                config.use_context(&args.name)?;
                factory.save_config(config)?;
                factory
                    .out()
                    .write_success(&format!("Switched to context {}", args.name))
            }
            ContextSubcommand::List => {
                let config = factory.config()?;
                let rows: Vec<ContextRow> = config
                    .contexts
                    .iter()
                    .map(|(name, context)| ContextRow {
                        name: name.clone(),
                        active: config.active_context.as_deref() == Some(name.as_str()),
                        context: context.clone(),
                    })
                    .collect();
                factory.out().write_list(&rows)
            }
            ContextSubcommand::Create(args) => {
                let mut config = factory.config()?.clone();
                let context = Context {
                    host: args.host.clone(),
                    project_key: args.project.clone(),
                    workspace: args.workspace.clone(),
                    default_repo: args.default_repo.clone(),
                };
                config.set_context(&args.name, context)?;
                if args.activate {
                    config.use_context(&args.name)?;
                }
                factory.save_config(config)?;
                factory
                    .out()
                    .write_success(&format!("Created context {}", args.name))
            }
        }
    }
}
