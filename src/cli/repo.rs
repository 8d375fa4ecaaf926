//
//  bkt-cli
//  cli/repo.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use super::{Client, Factory, RepoTarget};
use crate::api::cloud::Repository as CloudRepository;
use crate::api::server::Repository as ServerRepository;
use crate::output::TableOutput;
use crate::util::{format_iso, truncate};

/// Work with repositories
#[derive(Args, Debug)]
pub struct RepoCommand {
    #[command(subcommand)]
    pub command: RepoSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RepoSubcommand {
    /// List repositories in a workspace or project
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show one repository
    View(ViewArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Cloud workspace or Data Center project key (defaults to the context's)
    pub owner: Option<String>,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Repository as OWNER/REPO or REPO
    pub repo: Option<String>,
}

impl TableOutput for CloudRepository {
    fn headers() -> Vec<&'static str> {
        vec!["NAME", "VISIBILITY", "DESCRIPTION", "UPDATED"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.full_name.clone(),
            if self.is_private { "private" } else { "public" }.to_string(),
            truncate(self.description.as_deref().unwrap_or(""), 50),
            format_iso(self.updated_on.as_deref()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.full_name.clone()),
            ("Description", self.description.clone().unwrap_or_default()),
            ("Visibility", if self.is_private { "private" } else { "public" }.to_string()),
            ("Language", self.language.clone().unwrap_or_else(|| "-".into())),
            (
                "Main branch",
                self.mainbranch.as_ref().map_or_else(|| "-".into(), |b| b.name.clone()),
            ),
            (
                "Project",
                self.project.as_ref().map_or_else(|| "-".into(), |p| p.key.clone()),
            ),
            ("Created", format_iso(self.created_on.as_deref())),
            ("Updated", format_iso(self.updated_on.as_deref())),
        ]
    }
}

impl TableOutput for ServerRepository {
    fn headers() -> Vec<&'static str> {
        vec!["PROJECT", "SLUG", "NAME", "VISIBILITY", "STATE"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.project.key.clone(),
            self.slug.clone(),
            self.name.clone(),
            if self.is_public { "public" } else { "private" }.to_string(),
            self.state.clone(),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", format!("{}/{}", self.project.key, self.slug)),
            ("Description", self.description.clone().unwrap_or_default()),
            ("Visibility", if self.is_public { "public" } else { "private" }.to_string()),
            ("State", self.state.clone()),
            ("Forkable", self.forkable.to_string()),
            ("HTTP clone", self.clone_url("http").unwrap_or("-").to_string()),
            ("SSH clone", self.clone_url("ssh").unwrap_or("-").to_string()),
        ]
    }
}

impl RepoCommand {
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        match &self.command {
            RepoSubcommand::List(args) => list(factory, args).await,
            RepoSubcommand::View(args) => view(factory, args).await,
        }
    }
}

async fn list(factory: &mut Factory, args: &ListArgs) -> Result<()> {
    let session = factory.session()?;
    let ctx = factory.call_context();
    let limit = factory.limit(30);
    let spinner = factory.spinner("Fetching repositories...");

    match &session.client {
        Client::Cloud(client) => {
            let workspace = args
                .owner
                .clone()
                .or_else(|| session.context.workspace.clone())
                .ok_or_else(|| anyhow!("no workspace; pass one or set it on the context"))?;
            let repos = client.list_repositories(&ctx, &workspace, limit).await;
            spinner.finish_and_clear();
            factory.out().write_list(&repos?)
        }
        Client::Server(client) => {
            let project = args
                .owner
                .clone()
                .or_else(|| session.context.project_key.clone())
                .ok_or_else(|| anyhow!("no project key; pass one or set it on the context"))?;
            let repos = client.list_repositories(&ctx, &project, limit).await;
            spinner.finish_and_clear();
            factory.out().write_list(&repos?)
        }
    }
}

async fn view(factory: &mut Factory, args: &ViewArgs) -> Result<()> {
    let ctx = factory.call_context();
    match factory.repo(args.repo.as_deref())? {
        RepoTarget::Cloud(client, repo) => {
            let repository = client.get_repository(&ctx, &repo).await?;
            factory.out().write_record(&repository)
        }
        RepoTarget::Server(client, repo) => {
            let repository = client.get_repository(&ctx, &repo).await?;
            factory.out().write_record(&repository)
        }
    }
}
