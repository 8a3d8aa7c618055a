use blockplan_core::calendar::format_hhmm;
use chrono::{Local, NaiveDate};
use clap::Args;

use super::{open_planner, parse_date, CliResult};

#[derive(Args)]
pub struct DayArgs {
    /// Date to show (YYYY-MM-DD), today by default
    #[arg(value_parser = parse_date)]
    date: Option<NaiveDate>,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub async fn run(args: DayArgs) -> CliResult {
    let planner = open_planner(false)?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let view = planner.day_view(date).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.schedule)?);
        return Ok(());
    }

    println!("{} ({})", date, date.format("%A"));
    if view.blocks.is_empty() {
        println!("  no blocks");
    }
    for window in view.blocks.windows() {
        println!(
            "  [{}-{}] {}",
            format_hhmm(window.start),
            format_hhmm(window.end),
            window.block_type
        );
    }
    for task in &view.schedule.scheduled_tasks {
        let meeting = if task.is_meeting { " (meeting)" } else { "" };
        println!(
            "  {}-{} {} {}{}  [{}]",
            task.start.format("%H:%M"),
            task.end.format("%H:%M"),
            task.priority,
            task.content,
            meeting,
            task.task_id
        );
    }
    Ok(())
}
