//! Placing one task, either at an explicit time or at the best suggestion.

use blockplan_core::scheduler::grid::{round_duration, GRID_MINUTES};
use blockplan_core::{Slot, SuggestOptions};
use chrono::{NaiveDateTime, Timelike};
use clap::Args;

use super::{find_task, open_planner, CliResult};

#[derive(Args)]
pub struct ScheduleArgs {
    /// Task ID
    id: String,
    /// Start time (YYYY-MM-DD HH:MM); the best suggestion when omitted
    #[arg(long, value_parser = parse_start)]
    at: Option<NaiveDateTime>,
    /// Duration in minutes, overriding the task's own
    #[arg(long)]
    duration: Option<u32>,
}

fn parse_start(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .map_err(|e| format!("invalid start '{value}': {e}"))
}

pub async fn run(args: ScheduleArgs) -> CliResult {
    let planner = open_planner(true)?;
    let task = find_task(&planner, &args.id).await?;

    let slot = match args.at {
        Some(at) => {
            let start = at.hour() * 60 + at.minute();
            if start % GRID_MINUTES != 0 {
                return Err(format!("start must be on a {GRID_MINUTES}-minute boundary").into());
            }
            let minutes = args
                .duration
                .unwrap_or_else(|| task.planned_minutes(planner.config().default_duration_minutes));
            Slot::new(at.date(), start, round_duration(minutes))
        }
        None => {
            let options = SuggestOptions {
                duration_minutes: args.duration,
                ..SuggestOptions::default()
            };
            planner
                .suggest_slot(&task, &options)
                .await?
                .ok_or_else(|| format!("No free slot for {} in the horizon", task.id))?
                .slot
        }
    };

    let placement = planner.schedule_task(&task, &slot).await?;
    println!("Scheduled {} at {}", task.id, slot);
    if let Some(displaced) = placement.displaced {
        println!(
            "Displaced {} [{}] back to the unscheduled pool",
            displaced.content, displaced.task_id
        );
    }
    Ok(())
}
