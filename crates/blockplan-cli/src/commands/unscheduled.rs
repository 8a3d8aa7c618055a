use blockplan_core::TaskCategory;
use clap::Args;

use super::{backlog_filter, open_planner, CliResult};

#[derive(Args)]
pub struct UnscheduledArgs {
    /// Task source filter (defaults to todoist.default_filter)
    #[arg(long)]
    filter: Option<String>,
    /// Only list tasks of this category
    #[arg(long)]
    category: Option<TaskCategory>,
    /// Number of days checked for placements
    #[arg(long)]
    horizon: Option<u32>,
    /// Print JSON instead of a list
    #[arg(long)]
    json: bool,
}

pub async fn run(args: UnscheduledArgs) -> CliResult {
    let planner = open_planner(true)?;
    let mut filter = backlog_filter(args.filter)?;
    filter.category = args.category;

    let tasks = planner.unscheduled(&filter, args.horizon).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    for task in &tasks {
        let minutes = task.planned_minutes(planner.config().default_duration_minutes);
        let category = task.category.map(|c| c.as_str()).unwrap_or("-");
        println!(
            "{}  {} {:>4}m {:<12} {}",
            task.id, task.priority, minutes, category, task.content
        );
    }
    Ok(())
}
