//
//  bkt-cli
//  cli/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI command definitions using clap derive macros

mod api;
mod auth;
mod context;
mod factory;
mod issue;
mod pipeline;
mod pr;
mod repo;

pub use api::ApiCommand;
pub use auth::AuthCommand;
pub use context::ContextCommand;
pub use factory::*;
pub use issue::IssueCommand;
pub use pipeline::PipelineCommand;
pub use pr::PrCommand;
pub use repo::RepoCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// bkt - Work with Bitbucket Cloud and Data Center from the command line
#[derive(Parser, Debug)]
#[command(
    name = "bkt",
    version,
    about = "Work with Bitbucket Cloud and Data Center from the command line",
    long_about = "bkt is a CLI for Bitbucket Cloud and Bitbucket Data Center.\n\n\
                  Configure a host with 'bkt auth login', bind it to a context and\n\
                  work with repositories, pull requests, issues and pipelines.",
    propagate_version = true,
    after_help = "Use 'bkt <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Context to use instead of the active one
    #[arg(long, global = true, env = "BKT_CONTEXT")]
    pub context: Option<String>,

    /// Repository as OWNER/REPO or REPO (owner taken from the context)
    #[arg(long, short = 'R', global = true, env = "BKT_REPO")]
    pub repo: Option<String>,

    /// Output format as JSON
    #[arg(long, global = true, conflicts_with = "yaml")]
    pub json: bool,

    /// Output format as YAML
    #[arg(long, global = true)]
    pub yaml: bool,

    /// Maximum number of records to fetch (0 fetches everything)
    #[arg(long, short = 'L', global = true)]
    pub limit: Option<usize>,

    /// Disable interactive prompts
    #[arg(long, global = true, env = "BKT_NO_PROMPT")]
    pub no_prompt: bool,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with a Bitbucket host
    Auth(AuthCommand),

    /// Manage contexts
    #[command(visible_alias = "ctx")]
    Context(ContextCommand),

    /// Work with repositories
    #[command(visible_alias = "r")]
    Repo(RepoCommand),

    /// Work with pull requests
    Pr(PrCommand),

    /// Work with issues (Cloud)
    Issue(IssueCommand),

    /// Work with pipelines (Cloud)
    Pipeline(PipelineCommand),

    /// Make an authenticated API request
    Api(ApiCommand),

    /// Print version information
    Version,
}

impl Commands {
    /// Runs the command against `factory`.
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        match self {
            Commands::Auth(cmd) => cmd.run(factory).await,
            Commands::Context(cmd) => cmd.run(factory),
            Commands::Repo(cmd) => cmd.run(factory).await,
            Commands::Pr(cmd) => cmd.run(factory).await,
            Commands::Issue(cmd) => cmd.run(factory).await,
            Commands::Pipeline(cmd) => cmd.run(factory).await,
            Commands::Api(cmd) => cmd.run(factory).await,
            Commands::Version => {
                factory
                    .out()
                    .write_info(&format!("{} {}", crate::APP_NAME, crate::VERSION))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bkt", "pr", "list", "-R", "PROJ/app", "--json", "-L", "5"]).unwrap();
        assert_eq!(cli.global.repo.as_deref(), Some("PROJ/app"));
        assert!(cli.global.json);
        assert_eq!(cli.global.limit, Some(5));
    }

    #[test]
    fn test_json_conflicts_with_yaml() {
        assert!(Cli::try_parse_from(["bkt", "repo", "list", "--json", "--yaml"]).is_err());
    }
}
