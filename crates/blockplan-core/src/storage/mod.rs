mod config;
pub mod memory;
pub mod sqlite;

pub use config::{Config, SchedulerSection, TodoistConfig, TODOIST_TOKEN_ENV};
pub use memory::InMemoryCalendarStore;
pub use sqlite::SqliteCalendarStore;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::calendar::{DaySchedule, RecurringTimeBlock};
use crate::error::{ConfigError, StoreError};

/// Returns `~/.config/blockplan[-dev]/` based on BLOCKPLAN_ENV.
///
/// Set BLOCKPLAN_ENV=dev to use the development data directory, or
/// BLOCKPLAN_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BLOCKPLAN_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BLOCKPLAN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("blockplan-dev")
            } else {
                base_dir.join("blockplan")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Persistence of recurring blocks and per-day schedules.
///
/// Days are keyed by ISO date. Reading a day that was never saved yields an
/// empty schedule. No transactions are offered: callers serialize writes.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    async fn recurring_blocks(&self) -> Result<Vec<RecurringTimeBlock>, StoreError>;

    /// Replace the whole set of recurring blocks.
    async fn save_recurring_blocks(&self, blocks: &[RecurringTimeBlock]) -> Result<(), StoreError>;

    async fn day(&self, date: NaiveDate) -> Result<DaySchedule, StoreError>;

    /// Replace the schedule stored for `schedule.date`.
    async fn save_day(&self, schedule: &DaySchedule) -> Result<(), StoreError>;
}
