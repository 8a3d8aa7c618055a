//! # Blockplan Core Library
//!
//! This library decides when to work on what. Tasks are imported from an
//! external tracker and fitted into a personal calendar of recurring and
//! date-specific time blocks. All operations are available through the
//! `blockplan` CLI, a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Calendar**: weekly and per-date time blocks (work, personal, break)
//!   and the per-day ledger of placed tasks
//! - **Scheduler**: a greedy, explainable slot search over a 15-minute grid;
//!   a more important task may displace a less important one
//! - **Storage**: SQLite-backed calendar store and TOML configuration
//! - **Integrations**: task sources (Todoist REST, in-memory)
//!
//! ## Key Components
//!
//! - [`Planner`]: suggest, schedule and bulk-plan operations
//! - [`SlotScorer`] / [`SlotSearch`]: the scoring contract and grid search
//! - [`BulkAllocator`]: first-fit placement of a whole backlog
//! - [`CalendarStore`] / [`TaskSource`]: the two external collaborators
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod error;
pub mod integrations;
pub mod planner;
pub mod scheduler;
pub mod storage;
pub mod task;

pub use calendar::{BlockType, DaySchedule, RecurringTimeBlock, ScheduledTask, TimeBlock};
pub use error::{ConfigError, CoreError, SourceError, StoreError, ValidationError};
pub use integrations::{InMemoryTaskSource, TaskSource, TodoistTaskSource};
pub use planner::{Clock, FixedClock, Placement, Planner, SuggestOptions, SystemClock};
pub use scheduler::{
    BulkAllocator, BulkSummary, Candidate, SchedulerConfig, Slot, SlotScorer, SlotSearch,
};
pub use storage::{CalendarStore, Config, InMemoryCalendarStore, SqliteCalendarStore};
pub use task::{Priority, Task, TaskCategory, TaskFilter, TaskUpdate};
