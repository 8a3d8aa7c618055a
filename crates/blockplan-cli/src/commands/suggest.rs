use blockplan_core::{Priority, SuggestOptions, TaskCategory};
use chrono::NaiveDate;
use clap::Args;

use super::{find_task, open_planner, parse_date, CliResult};

#[derive(Args)]
pub struct SuggestArgs {
    /// Task ID
    id: String,
    /// Duration in minutes, overriding the task's own
    #[arg(long)]
    duration: Option<u32>,
    /// Category override: personal or professional
    #[arg(long)]
    category: Option<TaskCategory>,
    /// Priority override: P1 to P4
    #[arg(long)]
    priority: Option<Priority>,
    /// First day to search (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Number of days to search
    #[arg(long)]
    horizon: Option<u32>,
}

pub async fn run(args: SuggestArgs) -> CliResult {
    let planner = open_planner(true)?;
    let task = find_task(&planner, &args.id).await?;
    let options = SuggestOptions {
        anchor_date: args.from,
        duration_minutes: args.duration,
        category: args.category,
        priority: args.priority,
        horizon_days: args.horizon,
    };

    match planner.suggest_slot(&task, &options).await? {
        Some(candidate) => {
            println!("{}  score {:.3}", candidate.slot, candidate.score);
            if candidate.peak_bonus {
                println!("  inside peak hours");
            }
            if let Some(displaced) = candidate.displaced {
                println!("  displaces {} [{}]", displaced.content, displaced.task_id);
            }
        }
        None => println!("No free slot for {} in the horizon", task.id),
    }
    Ok(())
}
