//
//  bkt-cli
//  cli/pipeline.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Pipeline commands (Cloud only)

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};

use super::{Factory, RepoTarget};
use crate::api::cloud::{Pipeline, PipelineVariable, TriggerPipelineRequest};
use crate::output::TableOutput;
use crate::util::format_iso;

/// Work with pipelines (Cloud only)
#[derive(Args, Debug)]
pub struct PipelineCommand {
    #[command(subcommand)]
    pub command: PipelineSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum PipelineSubcommand {
    /// List recent pipeline runs
    #[command(visible_alias = "ls")]
    List,

    /// Start a pipeline
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Branch to build (defaults to the repository's main branch)
    #[arg(long, short = 'b')]
    pub branch: Option<String>,

    /// Custom pipeline name from bitbucket-pipelines.yml
    #[arg(long)]
    pub custom: Option<String>,

    /// Pipeline variable as KEY=VALUE (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub variables: Vec<String>,

    /// Pipeline variable whose value is masked, as KEY=VALUE (repeatable)
    #[arg(long = "secret-var", value_name = "KEY=VALUE")]
    pub secret_variables: Vec<String>,
}

impl TableOutput for Pipeline {
    fn headers() -> Vec<&'static str> {
        vec!["#", "STATUS", "REF", "TRIGGER", "STARTED", "DURATION"]
    }

    fn row(&self) -> Vec<String> {
        let target = self.target.as_ref();
        vec![
            self.build_number.to_string(),
            self.status().to_string(),
            target
                .and_then(|t| t.ref_name.clone())
                .unwrap_or_else(|| "-".into()),
            target
                .and_then(|t| t.selector.as_ref())
                .and_then(|s| s.pattern.clone())
                .unwrap_or_else(|| "default".into()),
            format_iso(self.created_on.as_deref()),
            self.duration_in_seconds
                .map_or_else(|| "-".into(), |s| format!("{}m {:02}s", s / 60, s % 60)),
        ]
    }
}

fn parse_variable(raw: &str, secured: bool) -> Result<PipelineVariable> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid variable {raw:?}, expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("invalid variable {raw:?}, key is empty");
    }
    Ok(PipelineVariable::new(key, value, secured))
}

impl PipelineCommand {
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        let (client, repo) = match factory.repo(None)? {
            RepoTarget::Cloud(client, repo) => (client, repo),
            RepoTarget::Server(..) => bail!("pipelines are only available on Bitbucket Cloud"),
        };
        let ctx = factory.call_context();

        match &self.command {
            PipelineSubcommand::List => {
                let limit = factory.limit(20);
                let spinner = factory.spinner("Fetching pipelines...");
                let pipelines = client.list_pipelines(&ctx, &repo, limit).await;
                spinner.finish_and_clear();
                factory.out().write_list(&pipelines?)
            }
            PipelineSubcommand::Run(args) => {
                let branch = match &args.branch {
                    Some(branch) => branch.clone(),
                    None => client
                        .get_repository(&ctx, &repo)
                        .await?
                        .mainbranch
                        .map(|b| b.name)
                        .ok_or_else(|| anyhow!("{repo} has no main branch; pass --branch"))?,
                };

                let mut request = TriggerPipelineRequest::branch(&branch);
                if let Some(custom) = &args.custom {
                    request = request.with_custom(custom);
                }
                for raw in &args.variables {
                    request.variables.push(parse_variable(raw, false)?);
                }
                for raw in &args.secret_variables {
                    request.variables.push(parse_variable(raw, true)?);
                }

                let pipeline = client.trigger_pipeline(&ctx, &repo, &request).await?;
                if factory.out().format().is_structured() {
                    return factory.out().write_value(&pipeline);
                }
                factory.out().write_success(&format!(
                    "Started pipeline #{} on {branch}",
                    pipeline.build_number
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        let var = parse_variable("DEPLOY_ENV=staging=eu", false).unwrap();
        assert_eq!(var.key, "DEPLOY_ENV");
        assert_eq!(var.value, "staging=eu");
        assert!(!var.secured);

        assert!(parse_variable("NOVALUE", false).is_err());
        assert!(parse_variable("=x", true).is_err());
    }

    #[test]
    fn test_duration_column() {
        let pipeline = Pipeline {
            build_number: 7,
            duration_in_seconds: Some(125),
            ..Default::default()
        };
        let row = pipeline.row();
        assert_eq!(row[0], "7");
        assert_eq!(row[1], "-");
        assert_eq!(row[5], "2m 05s");
    }
}
