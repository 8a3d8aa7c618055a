//! Time block commands for CLI.

use blockplan_core::{BlockType, TimeBlock};
use chrono::NaiveDate;
use clap::Subcommand;

use super::{open_planner, parse_date, CliResult};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Subcommand)]
pub enum BlocksAction {
    /// List recurring blocks, or the one-off blocks of a date
    List {
        /// Show blocks added for this date only (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Add a block
    Add {
        /// Start time (HH:MM)
        start: String,
        /// End time (HH:MM, 24:00 allowed)
        end: String,
        /// Block type: work, personal or break
        #[arg(value_parser = parse_block_type)]
        block_type: BlockType,
        /// Day of week for a recurring block (0 = Sunday)
        #[arg(long, conflicts_with = "date", required_unless_present = "date")]
        day: Option<u8>,
        /// Date for a one-off block (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Free-form label
        #[arg(long)]
        label: Option<String>,
    },
    /// Delete a block
    Delete {
        /// Block ID
        id: String,
        /// Delete a one-off block from this date instead of a recurring one
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

fn parse_block_type(value: &str) -> Result<BlockType, String> {
    value.parse()
}

fn describe(block: &TimeBlock) -> String {
    let label = block.label.as_deref().unwrap_or("");
    format!(
        "{}  {}-{}  {:<8} {}",
        block.id, block.start, block.end, block.block_type.as_str(), label
    )
}

pub async fn run(action: BlocksAction) -> CliResult {
    let planner = open_planner(false)?;

    match action {
        BlocksAction::List { date: Some(date), json } => {
            let view = planner.day_view(date).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.schedule.time_blocks)?);
            } else {
                for block in &view.schedule.time_blocks {
                    println!("{}", describe(block));
                }
            }
        }
        BlocksAction::List { date: None, json } => {
            let mut blocks = planner.recurring_blocks().await?;
            blocks.sort_by(|a, b| {
                (a.day_of_week, &a.block.start).cmp(&(b.day_of_week, &b.block.start))
            });
            if json {
                println!("{}", serde_json::to_string_pretty(&blocks)?);
            } else {
                for recurring in &blocks {
                    let day = WEEKDAYS
                        .get(usize::from(recurring.day_of_week))
                        .copied()
                        .unwrap_or("?");
                    println!("{day}  {}", describe(&recurring.block));
                }
            }
        }
        BlocksAction::Add {
            start,
            end,
            block_type,
            day,
            date,
            label,
        } => {
            let mut block = TimeBlock::new("", start, end, block_type);
            block.label = label;
            match (date, day) {
                (Some(date), _) => {
                    let added = planner.add_day_block(date, block).await?;
                    println!("Block added: {}", added.id);
                }
                (None, Some(day)) => {
                    let added = planner.add_recurring_block(block, day).await?;
                    println!("Block added: {}", added.block.id);
                }
                (None, None) => return Err("either --day or --date is required".into()),
            }
        }
        BlocksAction::Delete { id, date } => {
            match date {
                Some(date) => {
                    planner.delete_day_block(date, &id).await?;
                }
                None => {
                    planner.delete_recurring_block(&id).await?;
                }
            }
            println!("Block deleted: {id}");
        }
    }
    Ok(())
}
