//! The planning API.
//!
//! [`Planner`] ties a task source and a calendar store to the scheduler.
//! Every call that reads the ledger to make a decision, or writes it, runs
//! under one run-level lock, so an interactive placement never interleaves
//! with a bulk run over the same days.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::calendar::{DaySchedule, RecurringTimeBlock, ScheduledTask, TimeBlock, MINUTES_PER_DAY};
use crate::error::{CoreError, Result, ValidationError};
use crate::integrations::TaskSource;
use crate::scheduler::grid::{round_duration, GRID_MINUTES};
use crate::scheduler::{
    BulkAllocator, BulkSummary, Candidate, DisplacementResolver, ImportanceBook, PlanningDay,
    PlanningWindow, SchedulerConfig, Slot, SlotRequest, SlotScorer, SlotSearch,
};
use crate::storage::CalendarStore;
use crate::task::{sort_backlog, Priority, Task, TaskCategory, TaskFilter, TaskUpdate};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Overrides for a slot suggestion. Unset fields come from the task and the
/// scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestOptions {
    /// First day searched; defaults to today.
    pub anchor_date: Option<NaiveDate>,
    pub duration_minutes: Option<u32>,
    pub category: Option<TaskCategory>,
    pub priority: Option<Priority>,
    pub horizon_days: Option<u32>,
}

/// Result of placing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub scheduled: ScheduledTask,
    /// Occupant sent back to the unscheduled pool
    pub displaced: Option<ScheduledTask>,
}

pub struct Planner {
    source: Arc<dyn TaskSource>,
    store: Arc<dyn CalendarStore>,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    run_lock: Mutex<()>,
}

impl Planner {
    pub fn new(
        source: Arc<dyn TaskSource>,
        store: Arc<dyn CalendarStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            clock: Arc::new(SystemClock),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn TaskSource {
        self.source.as_ref()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn horizon(&self, horizon_days: Option<u32>) -> u32 {
        horizon_days.unwrap_or(self.config.horizon_days).max(1)
    }

    /// Best slot for `task` over the horizon, or `None` if nothing fits.
    pub async fn suggest_slot(
        &self,
        task: &Task,
        options: &SuggestOptions,
    ) -> Result<Option<Candidate>> {
        let _guard = self.run_lock.lock().await;
        let now = self.clock.now();
        let anchor = options.anchor_date.unwrap_or(now.date());
        let window =
            PlanningWindow::load(self.store.as_ref(), anchor, self.horizon(options.horizon_days))
                .await?;

        let mut subject = task.clone();
        if let Some(category) = options.category {
            subject.category = Some(category);
        }
        if let Some(priority) = options.priority {
            subject.priority = priority;
        }
        let minutes = options
            .duration_minutes
            .unwrap_or_else(|| subject.planned_minutes(self.config.default_duration_minutes));

        let book = ImportanceBook::new([&subject], now, self.config.importance);
        let request = SlotRequest::for_task(&subject, minutes, book.of_task(&subject));
        let scorer = SlotScorer::new(&self.config, now, &book);
        let best = SlotSearch::new(scorer).best(&request, window.days());

        match &best {
            Some(candidate) => tracing::info!(
                task_id = %task.id,
                slot = %candidate.slot,
                score = candidate.score,
                displaces = candidate.displaced.as_ref().map(|d| d.task_id.as_str()),
                "Suggested slot"
            ),
            None => tracing::info!(task_id = %task.id, "No slot in horizon"),
        }
        Ok(best)
    }

    /// Place `task` into `slot`.
    ///
    /// The slot must start on the grid, last a whole number of grid steps and
    /// end by midnight. It is scored again against the current ledger and must still be
    /// feasible. The task source is written first; only when that succeeds
    /// is the day's ledger replaced, so a failed write leaves the calendar
    /// untouched.
    pub async fn schedule_task(&self, task: &Task, slot: &Slot) -> Result<Placement> {
        validate_slot(slot)?;
        let _guard = self.run_lock.lock().await;
        let now = self.clock.now();

        let window = PlanningWindow::load(self.store.as_ref(), slot.date, 1).await?;
        let day = window.day(slot.date).ok_or(CoreError::SlotUnavailable {
            date: slot.date,
            start: slot.start_datetime(),
        })?;

        let book = ImportanceBook::new([task], now, self.config.importance);
        let mut request = SlotRequest::for_task(task, slot.minutes(), book.of_task(task));
        request.duration_minutes = slot.minutes();
        let scored = SlotScorer::new(&self.config, now, &book)
            .score(slot, &request, day)
            .ok_or(CoreError::SlotUnavailable {
                date: slot.date,
                start: slot.start_datetime(),
            })?;
        let candidate = Candidate {
            slot: *slot,
            score: scored.score,
            displaced: scored.displaced,
            peak_bonus: scored.peak_bonus,
        };

        let resolution = DisplacementResolver::new().resolve(&day.schedule, &candidate, task)?;

        self.source
            .update(&task.id, &TaskUpdate::placement(slot.start_datetime(), slot.minutes()))
            .await
            .map_err(|source| CoreError::ExternalWrite {
                task_id: task.id.clone(),
                source,
            })?;
        self.store.save_day(&resolution.schedule).await?;
        self.clear_other_placements(&task.id, slot.date, now).await;

        tracing::info!(task_id = %task.id, slot = %slot, "Scheduled task");
        Ok(Placement {
            scheduled: resolution.placed,
            displaced: resolution.displaced,
        })
    }

    /// Drop placements of `task_id` on other horizon days after a move.
    async fn clear_other_placements(&self, task_id: &str, kept: NaiveDate, now: NaiveDateTime) {
        let window = match PlanningWindow::load(self.store.as_ref(), now.date(), self.horizon(None)).await
        {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!(task_id, error = %e, "Could not check for stale placements");
                return;
            }
        };
        for day in window.days().iter().filter(|d| d.date != kept) {
            if !day.schedule.contains_task(task_id) {
                continue;
            }
            let mut schedule = day.schedule.clone();
            schedule.scheduled_tasks.retain(|t| t.task_id != task_id);
            if let Err(e) = self.store.save_day(&schedule).await {
                tracing::warn!(task_id, date = %day.date, error = %e, "Failed to remove stale placement");
            }
        }
    }

    /// Plan the filtered backlog with first-fit placement.
    pub async fn run_bulk_plan(
        &self,
        filter: &TaskFilter,
        horizon_days: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<BulkSummary> {
        let _guard = self.run_lock.lock().await;
        let allocator = BulkAllocator::new(
            self.source.as_ref(),
            self.store.as_ref(),
            &self.config,
            self.clock.now(),
        );
        allocator.run(filter, self.horizon(horizon_days), cancel).await
    }

    /// Open tasks matching `filter` with no placement in the horizon, in
    /// backlog order.
    pub async fn unscheduled(&self, filter: &TaskFilter, horizon_days: Option<u32>) -> Result<Vec<Task>> {
        let now = self.clock.now();
        let window =
            PlanningWindow::load(self.store.as_ref(), now.date(), self.horizon(horizon_days)).await?;
        let mut tasks: Vec<Task> = self
            .source
            .fetch(filter)
            .await?
            .into_iter()
            .filter(|t| filter.matches(t) && !window.contains_task(&t.id))
            .collect();
        sort_backlog(&mut tasks);
        Ok(tasks)
    }

    /// Resolved blocks and ledger of one day.
    pub async fn day_view(&self, date: NaiveDate) -> Result<PlanningDay> {
        let window = PlanningWindow::load(self.store.as_ref(), date, 1).await?;
        window
            .days()
            .first()
            .cloned()
            .ok_or_else(|| {
                CoreError::Validation(ValidationError::NotFound {
                    kind: "Day".into(),
                    id: date.to_string(),
                })
            })
    }

    pub async fn recurring_blocks(&self) -> Result<Vec<RecurringTimeBlock>> {
        Ok(self.store.recurring_blocks().await?)
    }

    /// Add a weekly block. The block gets a fresh id.
    pub async fn add_recurring_block(
        &self,
        block: TimeBlock,
        day_of_week: u8,
    ) -> Result<RecurringTimeBlock> {
        let recurring = RecurringTimeBlock::new(
            TimeBlock {
                id: uuid::Uuid::new_v4().to_string(),
                ..block
            },
            day_of_week,
        );
        recurring.validate()?;

        let _guard = self.run_lock.lock().await;
        let mut blocks = self.store.recurring_blocks().await?;
        blocks.push(recurring.clone());
        self.store.save_recurring_blocks(&blocks).await?;
        tracing::info!(block_id = %recurring.block.id, day_of_week, "Added recurring block");
        Ok(recurring)
    }

    pub async fn delete_recurring_block(&self, id: &str) -> Result<RecurringTimeBlock> {
        let _guard = self.run_lock.lock().await;
        let mut blocks = self.store.recurring_blocks().await?;
        let index = blocks
            .iter()
            .position(|b| b.block.id == id)
            .ok_or_else(|| ValidationError::NotFound {
                kind: "Recurring block".into(),
                id: id.to_string(),
            })?;
        let removed = blocks.remove(index);
        self.store.save_recurring_blocks(&blocks).await?;
        tracing::info!(block_id = id, "Deleted recurring block");
        Ok(removed)
    }

    /// Add a block that only applies on `date`.
    pub async fn add_day_block(&self, date: NaiveDate, block: TimeBlock) -> Result<TimeBlock> {
        let block = TimeBlock {
            id: uuid::Uuid::new_v4().to_string(),
            ..block
        };
        block.validate()?;

        let _guard = self.run_lock.lock().await;
        let mut schedule: DaySchedule = self.store.day(date).await?;
        schedule.time_blocks.push(block.clone());
        self.store.save_day(&schedule).await?;
        Ok(block)
    }

    pub async fn delete_day_block(&self, date: NaiveDate, id: &str) -> Result<TimeBlock> {
        let _guard = self.run_lock.lock().await;
        let mut schedule = self.store.day(date).await?;
        let index = schedule
            .time_blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| ValidationError::NotFound {
                kind: "Time block".into(),
                id: id.to_string(),
            })?;
        let removed = schedule.time_blocks.remove(index);
        self.store.save_day(&schedule).await?;
        Ok(removed)
    }
}

fn validate_slot(slot: &Slot) -> std::result::Result<(), ValidationError> {
    let invalid = |message: String| ValidationError::InvalidValue {
        field: "slot".into(),
        message,
    };
    if slot.end <= slot.start {
        return Err(ValidationError::InvalidTimeRange {
            start: slot.start.to_string(),
            end: slot.end.to_string(),
        });
    }
    if slot.start % GRID_MINUTES != 0 {
        return Err(invalid(format!("start must be on a {GRID_MINUTES}-minute boundary")));
    }
    if slot.minutes() != round_duration(slot.minutes()) {
        return Err(invalid(format!("length must be a multiple of {GRID_MINUTES} minutes")));
    }
    if slot.end > MINUTES_PER_DAY {
        return Err(invalid("slot must end by midnight".into()));
    }
    Ok(())
}
