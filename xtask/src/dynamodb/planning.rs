//! Pure functions for calculating deployment plans (Functional Core).

use super::config::TableConfig;

/// Represents the current state of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub status: TableStatus,
    pub partition_key: String,
    pub sort_key: Option<String>,
}

/// Table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

/// Planned change for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePlan {
    /// Table doesn't exist, needs to be created.
    CreateTable { config: TableConfig },
    /// Table exists with the expected keys.
    NoChanges { table_name: String },
    /// Table exists with different keys. Key schemas cannot be altered in place.
    KeyConflict {
        table_name: String,
        expected: String,
        actual: String,
    },
}

/// Planned changes for deployment, one entry per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPlan {
    pub tables: Vec<TablePlan>,
}

impl DeployPlan {
    pub fn has_changes(&self) -> bool {
        self.tables
            .iter()
            .any(|t| matches!(t, TablePlan::CreateTable { .. }))
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &TablePlan> {
        self.tables
            .iter()
            .filter(|t| matches!(t, TablePlan::KeyConflict { .. }))
    }
}

/// Plan for destroying one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    /// Table exists and will be deleted.
    DeleteTable { table_name: String },
    /// Table doesn't exist, nothing to do.
    AlreadyGone { table_name: String },
}

fn describe_keys(partition_key: &str, sort_key: Option<&str>) -> String {
    match sort_key {
        Some(sk) => format!("HASH {partition_key}, RANGE {sk}"),
        None => format!("HASH {partition_key}"),
    }
}

/// Pure function: Calculate what a single table needs to reach desired state.
pub fn calculate_table_plan(current: Option<&TableState>, desired: &TableConfig) -> TablePlan {
    let Some(state) = current else {
        return TablePlan::CreateTable {
            config: desired.clone(),
        };
    };

    let desired_sort = desired.sort_key.as_ref().map(|k| k.name.as_str());
    if state.partition_key == desired.partition_key.name
        && state.sort_key.as_deref() == desired_sort
    {
        TablePlan::NoChanges {
            table_name: desired.table_name.clone(),
        }
    } else {
        TablePlan::KeyConflict {
            table_name: desired.table_name.clone(),
            expected: describe_keys(&desired.partition_key.name, desired_sort),
            actual: describe_keys(&state.partition_key, state.sort_key.as_deref()),
        }
    }
}

/// Pure function: Plan every table given its current state.
pub fn calculate_deploy_plan(
    tables: &[(TableConfig, Option<TableState>)],
) -> DeployPlan {
    DeployPlan {
        tables: tables
            .iter()
            .map(|(desired, current)| calculate_table_plan(current.as_ref(), desired))
            .collect(),
    }
}

/// Pure function: Calculate destroy plan.
pub fn calculate_destroy_plan(current: Option<&TableState>, table_name: &str) -> DestroyPlan {
    match current {
        Some(_) => DestroyPlan::DeleteTable {
            table_name: table_name.to_string(),
        },
        None => DestroyPlan::AlreadyGone {
            table_name: table_name.to_string(),
        },
    }
}

/// Pure function: Format a deploy plan for display.
pub fn format_deploy_plan(plan: &DeployPlan) -> Vec<String> {
    let mut lines = Vec::new();
    for table in &plan.tables {
        match table {
            TablePlan::CreateTable { config } => {
                lines.push(format!("+ Create table: {}", config.table_name));
                lines.push(format!("  Partition key: {} (S)", config.partition_key.name));
                if let Some(sk) = &config.sort_key {
                    lines.push(format!("  Sort key: {} (S)", sk.name));
                }
                lines.push("  Billing: PAY_PER_REQUEST".to_string());
            }
            TablePlan::NoChanges { table_name } => {
                lines.push(format!("= Table '{table_name}' is up to date"));
            }
            TablePlan::KeyConflict {
                table_name,
                expected,
                actual,
            } => {
                lines.push(format!(
                    "~ Table '{table_name}' has keys {actual}, expected {expected}"
                ));
            }
        }
    }
    lines
}

/// Pure function: Format destroy plans for display.
pub fn format_destroy_plan(plans: &[DestroyPlan]) -> Vec<String> {
    plans
        .iter()
        .map(|plan| match plan {
            DestroyPlan::DeleteTable { table_name } => {
                format!("- Delete table: {table_name} (ALL DATA WILL BE LOST)")
            }
            DestroyPlan::AlreadyGone { table_name } => {
                format!("= Table '{table_name}' does not exist")
            }
        })
        .collect()
}
