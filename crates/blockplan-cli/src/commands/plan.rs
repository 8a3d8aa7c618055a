use blockplan_core::TaskCategory;
use clap::Args;
use tokio_util::sync::CancellationToken;

use super::{backlog_filter, open_planner, CliResult};

#[derive(Args)]
pub struct PlanArgs {
    /// Task source filter (defaults to todoist.default_filter)
    #[arg(long)]
    filter: Option<String>,
    /// Only plan tasks of this category
    #[arg(long)]
    category: Option<TaskCategory>,
    /// Number of days to fill
    #[arg(long)]
    horizon: Option<u32>,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: PlanArgs) -> CliResult {
    let planner = open_planner(true)?;
    let mut filter = backlog_filter(args.filter)?;
    filter.category = args.category;

    // Ctrl-C stops the run between tasks; placements already made are kept.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current task");
            on_signal.cancel();
        }
    });

    let summary = planner.run_bulk_plan(&filter, args.horizon, &cancel).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "planned {}, displaced {}, skipped {}, already scheduled {}, left displaced {}{}",
            summary.planned,
            summary.displaced,
            summary.skipped,
            summary.already_scheduled,
            summary.left_displaced,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
    }
    Ok(())
}
