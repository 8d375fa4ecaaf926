//
//  bkt-cli
//  cli/pr.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Pull request commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{Factory, RepoTarget};
use crate::api::cloud::{
    MergePullRequestRequest as CloudMerge, PullRequest as CloudPullRequest,
    PullRequestListOptions as CloudListOptions,
};
use crate::api::server::{
    MergePullRequestRequest as ServerMerge, PullRequest as ServerPullRequest,
    PullRequestListOptions as ServerListOptions,
};
use crate::output::TableOutput;
use crate::util::{format_iso, format_millis, truncate};

/// Work with pull requests
#[derive(Args, Debug)]
pub struct PrCommand {
    #[command(subcommand)]
    pub command: PrSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum PrSubcommand {
    /// List pull requests
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show one pull request
    View(IdArgs),

    /// Decline a pull request
    #[command(visible_alias = "close")]
    Decline(DeclineArgs),

    /// Approve a pull request
    Approve(IdArgs),

    /// Merge a pull request
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by state
    #[arg(long, short = 's', value_parser = ["open", "merged", "declined", "superseded", "all"])]
    pub state: Option<String>,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Pull request id
    pub id: u64,
}

#[derive(Args, Debug)]
pub struct DeclineArgs {
    /// Pull request id
    pub id: u64,

    /// Delete the source branch after declining
    #[arg(long)]
    pub delete_source: bool,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Pull request id
    pub id: u64,

    /// Merge commit message
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Merge strategy (Cloud: merge_commit, squash, fast_forward; Data Center: strategy id)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Delete the source branch after merging
    #[arg(long)]
    pub delete_source: bool,
}

impl TableOutput for CloudPullRequest {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "TITLE", "SOURCE", "TARGET", "AUTHOR", "STATE", "UPDATED"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            format!("#{}", self.id),
            truncate(&self.title, 50),
            self.source.branch.name.clone(),
            self.destination.branch.name.clone(),
            self.author.as_ref().map_or_else(|| "-".into(), |a| a.label().to_string()),
            self.state.clone(),
            format_iso(self.updated_on.as_deref()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let approvals: Vec<&str> = self.approvals().map(|p| p.user.label()).collect();
        vec![
            ("Pull request", format!("#{} {}", self.id, self.title)),
            ("State", self.state.clone()),
            (
                "Author",
                self.author.as_ref().map_or_else(|| "-".into(), |a| a.name.clone()),
            ),
            (
                "Branches",
                format!("{} -> {}", self.source.branch.name, self.destination.branch.name),
            ),
            ("Approvals", if approvals.is_empty() { "-".into() } else { approvals.join(", ") }),
            ("Comments", self.comment_count.to_string()),
            ("Tasks", self.task_count.to_string()),
            ("Created", format_iso(self.created_on.as_deref())),
            ("Updated", format_iso(self.updated_on.as_deref())),
            ("Description", self.description.clone().unwrap_or_default()),
        ]
    }
}

impl TableOutput for ServerPullRequest {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "TITLE", "SOURCE", "TARGET", "AUTHOR", "STATE", "UPDATED"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            format!("#{}", self.id),
            truncate(&self.title, 50),
            self.from_ref.display_id.clone(),
            self.to_ref.display_id.clone(),
            self.author.as_ref().map_or_else(|| "-".into(), |a| a.user.name.clone()),
            self.state.clone(),
            format_millis(self.updated_date),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let reviewers: Vec<String> = self
            .reviewers
            .iter()
            .map(|r| match r.status.as_deref() {
                Some(status) => format!("{} ({})", r.user.name, status.to_lowercase()),
                None => r.user.name.clone(),
            })
            .collect();
        vec![
            ("Pull request", format!("#{} {}", self.id, self.title)),
            ("State", self.state.clone()),
            ("Version", self.version.to_string()),
            (
                "Author",
                self.author
                    .as_ref()
                    .map_or_else(|| "-".into(), |a| a.user.display_name.clone()),
            ),
            (
                "Branches",
                format!("{} -> {}", self.from_ref.display_id, self.to_ref.display_id),
            ),
            ("Reviewers", if reviewers.is_empty() { "-".into() } else { reviewers.join(", ") }),
            ("Created", format_millis(self.created_date)),
            ("Updated", format_millis(self.updated_date)),
            ("Description", self.description.clone().unwrap_or_default()),
        ]
    }
}

impl PrCommand {
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        match &self.command {
            PrSubcommand::List(args) => list(factory, args).await,
            PrSubcommand::View(args) => view(factory, args).await,
            PrSubcommand::Decline(args) => decline(factory, args).await,
            PrSubcommand::Approve(args) => approve(factory, args).await,
            PrSubcommand::Merge(args) => merge(factory, args).await,
        }
    }
}

async fn list(factory: &mut Factory, args: &ListArgs) -> Result<()> {
    let ctx = factory.call_context();
    let limit = factory.limit(30);
    let spinner = factory.spinner("Fetching pull requests...");
    let result = match factory.repo(None)? {
        RepoTarget::Cloud(client, repo) => {
            let options = CloudListOptions {
                state: args.state.clone().filter(|s| s != "all"),
            };
            client
                .list_pull_requests(&ctx, &repo, &options, limit)
                .await
                .map(|prs| factory.out().write_list(&prs))
        }
        RepoTarget::Server(client, repo) => {
            let options = ServerListOptions {
                state: args.state.clone(),
                ..Default::default()
            };
            client
                .list_pull_requests(&ctx, &repo, &options, limit)
                .await
                .map(|prs| factory.out().write_list(&prs))
        }
    };
    spinner.finish_and_clear();
    result?
}

async fn view(factory: &mut Factory, args: &IdArgs) -> Result<()> {
    let ctx = factory.call_context();
    match factory.repo(None)? {
        RepoTarget::Cloud(client, repo) => {
            let pr = client.get_pull_request(&ctx, &repo, args.id).await?;
            factory.out().write_record(&pr)
        }
        RepoTarget::Server(client, repo) => {
            let pr = client.get_pull_request(&ctx, &repo, args.id).await?;
            factory.out().write_record(&pr)
        }
    }
}

async fn decline(factory: &mut Factory, args: &DeclineArgs) -> Result<()> {
    let ctx = factory.call_context();
    let source = match factory.repo(None)? {
        RepoTarget::Cloud(client, repo) => {
            let pr = client.get_pull_request(&ctx, &repo, args.id).await?;
            client.decline_pull_request(&ctx, &repo, args.id).await?;
            factory
                .out()
                .write_success(&format!("Declined pull request #{}", args.id))?;
            if args.delete_source {
                client
                    .delete_branch(&ctx, &repo, &pr.source.branch.name)
                    .await?;
            }
            pr.source.branch.name
        }
        RepoTarget::Server(client, repo) => {
            let pr = client.get_pull_request(&ctx, &repo, args.id).await?;
            client
                .decline_pull_request(&ctx, &repo, args.id, pr.version)
                .await?;
            factory
                .out()
                .write_success(&format!("Declined pull request #{}", args.id))?;
            if args.delete_source {
                client
                    .delete_branch(&ctx, &repo, &pr.from_ref.display_id)
                    .await?;
            }
            pr.from_ref.display_id
        }
    };
    if args.delete_source {
        factory
            .out()
            .write_success(&format!("Deleted branch {source}"))?;
    }
    Ok(())
}

async fn approve(factory: &mut Factory, args: &IdArgs) -> Result<()> {
    let ctx = factory.call_context();
    match factory.repo(None)? {
        RepoTarget::Cloud(client, repo) => client.approve_pull_request(&ctx, &repo, args.id).await?,
        RepoTarget::Server(client, repo) => client.approve_pull_request(&ctx, &repo, args.id).await?,
    }
    factory
        .out()
        .write_success(&format!("Approved pull request #{}", args.id))
}

async fn merge(factory: &mut Factory, args: &MergeArgs) -> Result<()> {
    let ctx = factory.call_context();
    let spinner = factory.spinner("Merging...");
    let target = factory.repo(None)?;
    let (state, delete_failure) = match target {
        RepoTarget::Cloud(client, repo) => {
            let body = CloudMerge {
                message: args.message.clone(),
                close_source_branch: args.delete_source.then_some(true),
                merge_strategy: args.strategy.clone(),
            };
            let merged = client.merge_pull_request(&ctx, &repo, args.id, &body).await;
            spinner.finish_and_clear();
            (merged?.state, None)
        }
        RepoTarget::Server(client, repo) => {
            let current = client.get_pull_request(&ctx, &repo, args.id).await?;
            let body = ServerMerge {
                version: current.version,
                message: args.message.clone(),
                strategy_id: args.strategy.clone(),
            };
            let merged = client.merge_pull_request(&ctx, &repo, args.id, &body).await;
            let merged = match merged {
                Ok(pr) => pr,
                Err(e) => {
                    spinner.finish_and_clear();
                    return Err(e.into());
                }
            };
            // Merge is done; a failed branch delete only warns.
            let delete_failure = if args.delete_source {
                client
                    .delete_branch(&ctx, &repo, &current.from_ref.display_id)
                    .await
                    .err()
            } else {
                None
            };
            spinner.finish_and_clear();
            (merged.state, delete_failure)
        }
    };
    tracing::debug!(%state, "merge finished");
    factory
        .out()
        .write_success(&format!("Merged pull request #{}", args.id))?;
    match delete_failure {
        Some(e) => factory
            .out()
            .write_warning(&format!("could not delete source branch: {e}")),
        None if args.delete_source => factory.out().write_success("Deleted source branch")?,
        None => {}
    }
    Ok(())
}
