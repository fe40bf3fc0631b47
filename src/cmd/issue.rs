//! Issue commands — `vangraph issue`.

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use vangraph::board::models::{Issue, IssueColumn, NewIssue, Priority};
use vangraph::board::ordering::{self, DropTarget};
use vangraph::board::reorder::{MoveRequest, ReorderCoordinator};
use vangraph::config::VangraphConfig;

use super::super::IssueCommands;

pub async fn cmd_issue(config: &VangraphConfig, command: IssueCommands) -> Result<()> {
    let store = super::open_store(config)?;

    match command {
        IssueCommands::Create {
            project_id,
            title,
            column,
            priority,
            description,
            labels,
        } => {
            if title.trim().is_empty() {
                bail!("Issue title must not be empty");
            }
            let mut new = NewIssue::new(project_id, title, IssueColumn::from_str(&column)?);
            if let Some(p) = priority {
                new.priority = Priority::from_str(&p)?;
            }
            new.description = description;
            new.labels = labels;

            let issue = store.create_issue(new).await?;
            println!(
                "Created issue {} in {} at position {}",
                console::style(format!("#{}", issue.id)).bold(),
                issue.column.title(),
                issue.position
            );
        }
        IssueCommands::Move {
            issue_id,
            column,
            index,
        } => {
            let column = IssueColumn::from_str(&column)?;
            let issue = store
                .get_issue(issue_id)
                .await?
                .with_context(|| format!("Issue {} not found", issue_id))?;

            let mut coordinator =
                ReorderCoordinator::load(store.clone(), issue.project_id, config.allocator()?)
                    .await?
                    .with_auto_rebalance(config.toml.positions.auto_rebalance);
            let request = MoveRequest::new(issue_id, column, DropTarget::from_index(index));
            let outcome = coordinator.move_issue(&request).await?;

            if !outcome.is_committed() {
                bail!(
                    "Move of issue {} was rolled back: {}",
                    issue_id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            println!(
                "Moved issue {} to {} at position {}",
                console::style(format!("#{}", issue_id)).bold(),
                column.title(),
                outcome.planned.position
            );
        }
        IssueCommands::List { project_id, column } => {
            let filter = column.as_deref().map(IssueColumn::from_str).transpose()?;
            if store.get_project(project_id).await?.is_none() {
                bail!("Project {} not found", project_id);
            }
            let mut issues = store.list_issues(project_id).await?;
            issues.retain(|i| filter.is_none_or(|c| i.column == c));
            issues.sort_by(|a, b| {
                a.column
                    .cmp(&b.column)
                    .then_with(|| ordering::compare_in_column(a, b))
            });
            for issue in &issues {
                print_issue(issue);
            }
        }
    }

    Ok(())
}

/// One-line rendering shared with `vangraph board`.
pub fn print_issue(issue: &Issue) {
    let priority = match issue.priority {
        Priority::Critical => console::style(issue.priority.as_str()).red().bold(),
        Priority::High => console::style(issue.priority.as_str()).yellow(),
        Priority::Medium => console::style(issue.priority.as_str()),
        Priority::Low => console::style(issue.priority.as_str()).dim(),
    };
    let labels = if issue.labels.is_empty() {
        String::new()
    } else {
        format!(" [{}]", issue.labels.join(", "))
    };
    println!(
        "  {:>5}  {:<11} {:<8} {}{}",
        format!("#{}", issue.id),
        issue.column.as_str(),
        priority,
        issue.title,
        console::style(labels).dim()
    );
}
