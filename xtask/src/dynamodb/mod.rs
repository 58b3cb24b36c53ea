//! DynamoDB infrastructure management commands.

mod client;
mod config;
mod deploy;
mod error;
mod planning;

pub use error::{DynamodbError, Result};

use crate::prelude::*;
use dialoguer::Confirm;

/// DynamoDB infrastructure management commands.
#[derive(Debug, clap::Parser)]
pub struct DynamodbCommand {
    #[command(subcommand)]
    pub action: DynamodbAction,
}

/// Available DynamoDB actions.
#[derive(Debug, clap::Subcommand)]
pub enum DynamodbAction {
    /// Deploy or destroy the check-in tables.
    Deploy(DeployCommand),
}

/// Deploy or destroy the check-in tables of one environment.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Deploy or destroy the check-in DynamoDB tables.

Creates the event, check-in, registration, and organization tables for an
environment, named `{env}-event`, `{env}-event-checkin`, and so on. Key
schemas are derived from the record definitions in checkin_core.

The command shows a plan of changes before applying and asks for confirmation.

Environment variables:
  AWS_ENDPOINT_URL    - Use local DynamoDB (e.g., http://localhost:8000)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct DeployCommand {
    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,

    /// Destroy the tables instead of creating them.
    #[arg(long)]
    pub destroy: bool,

    /// Environment prefix of the table names.
    #[arg(long, env = "ENV", default_value = "dev")]
    pub env: String,
}

/// Main entry point for dynamodb command.
pub async fn run(command: DynamodbCommand, global: crate::Global) -> Result<()> {
    match command.action {
        DynamodbAction::Deploy(deploy_cmd) => run_deploy(deploy_cmd, &global).await,
    }
}

async fn run_deploy(cmd: DeployCommand, global: &crate::Global) -> Result<()> {
    let aws_config = client::AwsConfig::default();
    let table_configs = config::checkin_table_configs(&cmd.env)?;

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!("{} {}", p_b("Environment:"), cmd.env);
        aprintln!();
    }

    let dynamo_client = client::create_client(&aws_config).await?;

    let mut tables = Vec::with_capacity(table_configs.len());
    for table_config in table_configs {
        let state = client::get_table_state(&dynamo_client, &table_config.table_name).await?;
        if global.is_verbose() {
            aprintln!("{} {} -> {:?}", p_m("Described"), table_config.table_name, state);
        }
        tables.push((table_config, state));
    }

    if cmd.destroy {
        run_destroy(&dynamo_client, &tables, cmd.force, global).await
    } else {
        run_create(&dynamo_client, &tables, cmd.force, global).await
    }
}

async fn run_destroy(
    dynamo_client: &aws_sdk_dynamodb::Client,
    tables: &[(config::TableConfig, Option<planning::TableState>)],
    force: bool,
    global: &crate::Global,
) -> Result<()> {
    let plans: Vec<_> = tables
        .iter()
        .map(|(config, state)| planning::calculate_destroy_plan(state.as_ref(), &config.table_name))
        .collect();

    if !global.is_silent() {
        aprintln!("{}", p_y("Destroy Plan:"));
        for line in planning::format_destroy_plan(&plans) {
            aprintln!("  {}", p_r(&line));
        }
        aprintln!();
    }

    if plans
        .iter()
        .all(|p| matches!(p, planning::DestroyPlan::AlreadyGone { .. }))
    {
        if !global.is_silent() {
            aprintln!("{}", p_g("Nothing to destroy."));
        }
        return Ok(());
    }

    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Are you sure you want to delete these tables? ALL DATA WILL BE LOST")
            .default(false)
            .interact()
            .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;

        if !confirmed {
            return Err(DynamodbError::UserCancelled);
        }
    }

    if !global.is_silent() {
        aprintln!("{}", p_b("Deleting tables..."));
    }

    deploy::execute_destroy_plan(dynamo_client, &plans).await?;

    if !global.is_silent() {
        aprintln!("{}", p_g("Tables destroyed successfully."));
    }
    Ok(())
}

async fn run_create(
    dynamo_client: &aws_sdk_dynamodb::Client,
    tables: &[(config::TableConfig, Option<planning::TableState>)],
    force: bool,
    global: &crate::Global,
) -> Result<()> {
    let plan = planning::calculate_deploy_plan(tables);

    if !global.is_silent() {
        aprintln!("{}", p_c("Deploy Plan:"));
        for line in planning::format_deploy_plan(&plan) {
            if line.starts_with('+') {
                aprintln!("  {}", p_g(&line));
            } else if line.starts_with('~') {
                aprintln!("  {}", p_y(&line));
            } else {
                aprintln!("  {}", line);
            }
        }
        aprintln!();
    }

    if let Some(planning::TablePlan::KeyConflict {
        table_name,
        expected,
        actual,
    }) = plan.conflicts().next()
    {
        return Err(DynamodbError::KeySchemaConflict {
            table_name: table_name.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        });
    }

    if !plan.has_changes() {
        if !global.is_silent() {
            aprintln!("{}", p_g("Infrastructure is up to date."));
        }
        return Ok(());
    }

    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Apply these changes?")
            .default(true)
            .interact()
            .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;

        if !confirmed {
            return Err(DynamodbError::UserCancelled);
        }
    }

    if !global.is_silent() {
        aprintln!("{}", p_b("Applying changes..."));
    }

    deploy::execute_deploy_plan(dynamo_client, &plan).await?;

    if !global.is_silent() {
        aprintln!("{}", p_g("Infrastructure deployed successfully."));
    }
    Ok(())
}
