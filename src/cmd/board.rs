//! Board view and column maintenance — `vangraph board`, `vangraph rebalance`.

use std::str::FromStr;

use anyhow::Result;
use vangraph::board::models::IssueColumn;
use vangraph::board::reorder::ReorderCoordinator;
use vangraph::board::stats::BoardStats;
use vangraph::board::store;
use vangraph::config::VangraphConfig;

use super::issue::print_issue;

pub async fn cmd_board(config: &VangraphConfig, project_id: i64) -> Result<()> {
    let store = super::open_store(config)?;
    let board = store::load_board(store.as_ref(), project_id).await?;

    println!();
    println!("{}", console::style(&board.project.name).bold().cyan());

    let mut all = Vec::new();
    for column in &board.columns {
        println!();
        println!(
            "{} {}",
            console::style(column.name.title()).bold(),
            console::style(format!("({})", column.issues.len())).dim()
        );
        for issue in &column.issues {
            print_issue(issue);
        }
        all.extend(column.issues.iter().cloned());
    }

    let stats = BoardStats::compute(project_id, &all);
    println!();
    println!(
        "{} issues, {:.0}% done",
        stats.total, stats.completion_percent
    );
    Ok(())
}

pub async fn cmd_rebalance(config: &VangraphConfig, project_id: i64, column: &str) -> Result<()> {
    let column = IssueColumn::from_str(column)?;
    let store = super::open_store(config)?;
    let mut coordinator =
        ReorderCoordinator::load(store, project_id, config.allocator()?).await?;
    let issues = coordinator.rebalance(column).await?;

    println!(
        "Rebalanced {} issue(s) in {}",
        issues.len(),
        console::style(column.title()).bold()
    );
    for issue in &issues {
        println!("  {:>5}  {}", format!("#{}", issue.id), issue.position);
    }
    Ok(())
}
