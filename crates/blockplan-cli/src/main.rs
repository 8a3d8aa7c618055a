use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "blockplan", version, about = "Time-block planner for your task backlog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time block management
    Blocks {
        #[command(subcommand)]
        action: commands::blocks::BlocksAction,
    },
    /// Show the blocks and placements of one day
    Day(commands::day::DayArgs),
    /// Suggest the best slot for a task
    Suggest(commands::suggest::SuggestArgs),
    /// Place a task into a slot
    Schedule(commands::schedule::ScheduleArgs),
    /// Plan the whole backlog first-fit
    Plan(commands::plan::PlanArgs),
    /// List open tasks without a placement
    Unscheduled(commands::unscheduled::UnscheduledArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Blocks { action } => commands::blocks::run(action).await,
        Commands::Day(args) => commands::day::run(args).await,
        Commands::Suggest(args) => commands::suggest::run(args).await,
        Commands::Schedule(args) => commands::schedule::run(args).await,
        Commands::Plan(args) => commands::plan::run(args).await,
        Commands::Unscheduled(args) => commands::unscheduled::run(args).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
