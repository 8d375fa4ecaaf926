//
//  bkt-cli
//  cli/issue.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Issue commands (Cloud only)
//!
//! Data Center has no issue tracker; every subcommand refuses to run
//! against a Data Center context.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use tokio::io::AsyncWriteExt;

use super::{Factory, RepoTarget};
use crate::api::cloud::{Attachment, CloudClient, CloudRepo, Issue, IssueListOptions};
use crate::api::MultipartFile;
use crate::output::TableOutput;
use crate::util::{format_iso, format_size, truncate};

/// Transfers can take far longer than one API call.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Work with issues (Cloud only)
#[derive(Args, Debug)]
pub struct IssueCommand {
    #[command(subcommand)]
    pub command: IssueSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum IssueSubcommand {
    /// List issues
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show one issue
    View(ViewArgs),

    /// Upload files as attachments
    Attach(AttachArgs),

    /// Download an attachment
    Download(DownloadArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by state (new, open, resolved, on hold, invalid, duplicate, wontfix, closed, all)
    #[arg(long, short = 's')]
    pub state: Option<String>,

    /// Filter by kind (bug, enhancement, proposal, task)
    #[arg(long, short = 'k')]
    pub kind: Option<String>,

    /// Filter by priority (trivial, minor, major, critical, blocker)
    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// Filter by assignee nickname
    #[arg(long, short = 'a')]
    pub assignee: Option<String>,

    /// Filter by milestone
    #[arg(long)]
    pub milestone: Option<String>,

    /// Search in titles
    #[arg(long, short = 'S')]
    pub search: Option<String>,

    /// Sort key, e.g. -updated_on
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Issue id
    pub id: u64,

    /// Also list attachments
    #[arg(long)]
    pub attachments: bool,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Issue id
    pub id: u64,

    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Issue id
    pub id: u64,

    /// Attachment name
    pub name: String,

    /// Destination path; `-` writes to stdout (defaults to the attachment name)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl TableOutput for Issue {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "TITLE", "KIND", "PRIORITY", "STATE", "ASSIGNEE", "UPDATED"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            format!("#{}", self.id),
            truncate(&self.title, 50),
            self.kind.clone(),
            self.priority.clone(),
            self.state.clone(),
            self.assignee
                .as_ref()
                .map_or_else(|| "-".into(), |a| a.label().to_string()),
            format_iso(self.updated_on.as_deref()),
        ]
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Issue", format!("#{} {}", self.id, self.title)),
            ("State", self.state.clone()),
            ("Kind", self.kind.clone()),
            ("Priority", self.priority.clone()),
            (
                "Reporter",
                self.reporter.as_ref().map_or_else(|| "-".into(), |u| u.name.clone()),
            ),
            (
                "Assignee",
                self.assignee.as_ref().map_or_else(|| "-".into(), |u| u.name.clone()),
            ),
            ("Votes", self.votes.to_string()),
            ("Created", format_iso(self.created_on.as_deref())),
            ("Updated", format_iso(self.updated_on.as_deref())),
            (
                "Description",
                self.content.as_ref().map(|c| c.raw.clone()).unwrap_or_default(),
            ),
        ]
    }
}

impl TableOutput for Attachment {
    fn headers() -> Vec<&'static str> {
        vec!["NAME", "URL"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.links
                .self_link
                .as_ref()
                .map_or_else(|| "-".into(), |l| l.href.clone()),
        ]
    }
}

impl IssueCommand {
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        let (client, repo) = match factory.repo(None)? {
            RepoTarget::Cloud(client, repo) => (client, repo),
            RepoTarget::Server(..) => bail!("issues are only available on Bitbucket Cloud"),
        };
        match &self.command {
            IssueSubcommand::List(args) => list(factory, &client, &repo, args).await,
            IssueSubcommand::View(args) => view(factory, &client, &repo, args).await,
            IssueSubcommand::Attach(args) => attach(factory, &client, &repo, args).await,
            IssueSubcommand::Download(args) => download(factory, &client, &repo, args).await,
        }
    }
}

async fn list(factory: &mut Factory, client: &CloudClient, repo: &CloudRepo, args: &ListArgs) -> Result<()> {
    let options = IssueListOptions {
        state: args.state.clone(),
        kind: args.kind.clone(),
        priority: args.priority.clone(),
        assignee: args.assignee.clone(),
        milestone: args.milestone.clone(),
        search: args.search.clone(),
        sort: args.sort.clone(),
    };
    let ctx = factory.call_context();
    let limit = factory.limit(30);
    let spinner = factory.spinner("Fetching issues...");
    let issues = client.list_issues(&ctx, repo, &options, limit).await;
    spinner.finish_and_clear();
    factory.out().write_list(&issues?)
}

async fn view(factory: &mut Factory, client: &CloudClient, repo: &CloudRepo, args: &ViewArgs) -> Result<()> {
    let ctx = factory.call_context();
    let issue = client.get_issue(&ctx, repo, args.id).await?;
    factory.out().write_record(&issue)?;
    if args.attachments && !factory.out().format().is_structured() {
        let attachments = client.list_issue_attachments(&ctx, repo, args.id).await?;
        factory.out().write_info("")?;
        factory.out().write_list(&attachments)?;
    }
    Ok(())
}

async fn attach(factory: &mut Factory, client: &CloudClient, repo: &CloudRepo, args: &AttachArgs) -> Result<()> {
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = MultipartFile::open("files", path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        files.push(file);
    }
    let names: Vec<String> = files.iter().map(|f| f.file_name().to_string()).collect();

    let ctx = factory.call_context().with_timeout(TRANSFER_TIMEOUT);
    let spinner = factory.spinner("Uploading...");
    let uploaded = client.upload_issue_attachments(&ctx, repo, args.id, files).await;
    spinner.finish_and_clear();
    uploaded?;

    for name in names {
        factory
            .out()
            .write_success(&format!("Attached {name} to issue #{}", args.id))?;
    }
    Ok(())
}

async fn download(factory: &mut Factory, client: &CloudClient, repo: &CloudRepo, args: &DownloadArgs) -> Result<()> {
    let ctx = factory.call_context().with_timeout(TRANSFER_TIMEOUT);
    let target = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&args.name));

    if target.as_os_str() == "-" {
        let mut stdout = tokio::io::stdout();
        client
            .download_issue_attachment(&ctx, repo, args.id, &args.name, &mut stdout)
            .await?;
        stdout.flush().await?;
        return Ok(());
    }

    let mut file = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("cannot create {}", target.display()))?;
    let written = client
        .download_issue_attachment(&ctx, repo, args.id, &args.name, &mut file)
        .await;
    let written = match written {
        Ok(n) => n,
        Err(err) => {
            drop(file);
            let _ = tokio::fs::remove_file(&target).await;
            return Err(err.into());
        }
    };
    file.flush().await?;
    factory.out().write_success(&format!(
        "Downloaded {} ({})",
        target.display(),
        format_size(written)
    ))
}
