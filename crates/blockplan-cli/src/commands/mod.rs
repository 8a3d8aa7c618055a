pub mod blocks;
pub mod config;
pub mod day;
pub mod plan;
pub mod schedule;
pub mod suggest;
pub mod unscheduled;

use std::sync::Arc;

use blockplan_core::{
    Config, InMemoryTaskSource, Planner, SqliteCalendarStore, Task, TaskFilter, TaskSource,
    TodoistTaskSource,
};
use chrono::NaiveDate;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the planner over the on-disk calendar.
///
/// Commands that only touch the calendar pass `needs_source = false` and get
/// an empty offline task source when no Todoist token is configured.
pub fn open_planner(needs_source: bool) -> Result<Planner, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = Arc::new(SqliteCalendarStore::open()?);
    let source: Arc<dyn TaskSource> = match TodoistTaskSource::from_config(&config.todoist) {
        Ok(source) => Arc::new(source),
        Err(e) if needs_source => return Err(e.into()),
        Err(_) => Arc::new(InMemoryTaskSource::new()),
    };
    Ok(Planner::new(source, store, config.scheduler_config()))
}

/// Backlog filter from the command line, falling back to the configured
/// default Todoist filter.
pub fn backlog_filter(query: Option<String>) -> Result<TaskFilter, Box<dyn std::error::Error>> {
    let query = match query {
        Some(q) => Some(q),
        None => Config::load()?.todoist.default_filter,
    };
    Ok(TaskFilter {
        query,
        ..TaskFilter::default()
    })
}

/// Look up one open task by id.
pub async fn find_task(planner: &Planner, id: &str) -> Result<Task, Box<dyn std::error::Error>> {
    planner
        .source()
        .fetch(&TaskFilter::default())
        .await?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| format!("Task not found: {id}").into())
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("invalid date '{value}': {e}"))
}
