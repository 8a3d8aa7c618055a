//! Time-block slot allocation.
//!
//! This module finds where a task should go:
//! - [`SlotScorer`] scores one candidate slot against a day's blocks and ledger
//! - [`SlotSearch`] walks the 15-minute grid of a multi-day horizon
//! - [`DisplacementResolver`] swaps a less important occupant out of a day
//! - [`BulkAllocator`] runs the search over a whole sorted backlog
//!
//! Scoring and search are pure. Only the bulk allocator performs I/O, and it
//! awaits every read and write in sequence: each placement depends on the
//! ledger left by the previous one.

pub mod bulk;
pub mod config;
pub mod displacement;
pub mod grid;
pub mod scorer;
pub mod search;

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{format_hhmm, DayBlocks, DaySchedule, ScheduledTask};
use crate::error::Result;
use crate::storage::CalendarStore;
use crate::task::{importance, ImportanceInput, ImportanceWeights, Priority, Task, TaskCategory};

pub use bulk::{BulkAllocator, BulkSummary};
pub use config::{PeakHours, PriorityBonus, SchedulerConfig, SchedulerConfigBuilder, ScoringWeights};
pub use displacement::{DisplacementResolver, Resolution};
pub use scorer::{SlotScore, SlotScorer};
pub use search::{Candidate, SlotSearch};

/// A contiguous interval `[start, end)` of one day, in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start: u32,
    pub end: u32,
}

impl Slot {
    pub fn new(date: NaiveDate, start: u32, minutes: u32) -> Self {
        Self {
            date,
            start,
            end: start + minutes,
        }
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        grid::at_minute(self.date, self.start)
    }

    pub fn end_datetime(&self) -> NaiveDateTime {
        grid::at_minute(self.date, self.end)
    }

    pub fn minutes(&self) -> u32 {
        self.end - self.start
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date,
            format_hhmm(self.start),
            format_hhmm(self.end)
        )
    }
}

/// What is being placed.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRequest {
    pub task_id: String,
    pub category: Option<TaskCategory>,
    pub priority: Priority,
    /// Importance of the incoming task, compared against occupants.
    pub importance: f64,
    /// Grid-rounded duration
    pub duration_minutes: u32,
}

impl SlotRequest {
    pub fn for_task(task: &Task, duration_minutes: u32, importance: f64) -> Self {
        Self {
            task_id: task.id.clone(),
            category: task.category,
            priority: task.priority,
            importance,
            duration_minutes: grid::round_duration(duration_minutes),
        }
    }
}

/// One day of the search space: resolved blocks plus the current ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningDay {
    pub date: NaiveDate,
    pub blocks: DayBlocks,
    pub schedule: DaySchedule,
}

/// Consecutive days loaded from the calendar store, kept in date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningWindow {
    days: Vec<PlanningDay>,
}

impl PlanningWindow {
    /// Load `horizon_days` days starting at `first` from the store.
    pub async fn load(
        store: &dyn CalendarStore,
        first: NaiveDate,
        horizon_days: u32,
    ) -> Result<Self> {
        let recurring = store.recurring_blocks().await?;
        let mut days = Vec::with_capacity(horizon_days as usize);
        for offset in 0..horizon_days.max(1) {
            let date = first + Duration::days(i64::from(offset));
            let schedule = store.day(date).await?;
            let blocks = DayBlocks::resolve(date, &recurring, &schedule.time_blocks);
            days.push(PlanningDay {
                date,
                blocks,
                schedule,
            });
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> &[PlanningDay] {
        &self.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&PlanningDay> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Replace a day's ledger with a committed schedule.
    pub fn commit(&mut self, schedule: DaySchedule) {
        if let Some(day) = self.days.iter_mut().find(|d| d.date == schedule.date) {
            day.schedule = schedule;
        }
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.days.iter().any(|d| d.schedule.contains_task(task_id))
    }
}

/// Importance of an occupant, as seen by the scorer.
pub trait OccupantImportance {
    fn importance_of(&self, occupant: &ScheduledTask) -> f64;
}

impl<F> OccupantImportance for F
where
    F: Fn(&ScheduledTask) -> f64,
{
    fn importance_of(&self, occupant: &ScheduledTask) -> f64 {
        self(occupant)
    }
}

/// Importance of tasks and ledger entries at a fixed instant.
///
/// An occupant's placement acts as its due time. Its deadline comes from the
/// underlying task when that task is known, and otherwise from the deadline
/// recorded on the ledger entry.
#[derive(Debug, Clone)]
pub struct ImportanceBook {
    deadlines: HashMap<String, NaiveDate>,
    now: NaiveDateTime,
    weights: ImportanceWeights,
}

impl ImportanceBook {
    pub fn new<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        now: NaiveDateTime,
        weights: ImportanceWeights,
    ) -> Self {
        let deadlines = tasks
            .into_iter()
            .filter_map(|t| t.deadline.map(|d| (t.id.clone(), d)))
            .collect();
        Self {
            deadlines,
            now,
            weights,
        }
    }

    pub fn of_task(&self, task: &Task) -> f64 {
        importance(&ImportanceInput::from_task(task), self.now, &self.weights)
    }
}

impl OccupantImportance for ImportanceBook {
    fn importance_of(&self, occupant: &ScheduledTask) -> f64 {
        let deadline = self
            .deadlines
            .get(&occupant.original_task_id)
            .copied()
            .or(occupant.deadline);
        importance(
            &ImportanceInput::from_scheduled(occupant, deadline),
            self.now,
            &self.weights,
        )
    }
}
