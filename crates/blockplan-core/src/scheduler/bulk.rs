//! Bulk planning over a whole backlog.
//!
//! Tasks are placed one at a time in backlog order against an in-memory
//! copy of the horizon's ledger, so every placement sees the ones before it.
//! Reads and writes are awaited in sequence. A task whose write fails is
//! counted as skipped and the run moves on; nothing already committed is
//! rolled back.
//!
//! Every task the run looked at lands in exactly one of `planned`,
//! `skipped`, `already_scheduled` or `left_displaced`.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::config::SchedulerConfig;
use super::displacement::{DisplacementResolver, Resolution};
use super::scorer::SlotScorer;
use super::search::{Candidate, SlotSearch};
use super::{ImportanceBook, PlanningWindow, SlotRequest};
use crate::error::{CoreError, Result};
use crate::integrations::TaskSource;
use crate::storage::CalendarStore;
use crate::task::{sort_backlog, Task, TaskFilter, TaskUpdate};

/// Counts reported by a bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    /// Tasks placed and persisted by this run
    pub planned: u32,
    /// Occupants removed to make room
    pub displaced: u32,
    /// Tasks with no slot in the horizon, or whose write failed
    pub skipped: u32,
    /// Tasks that already had a placement in the horizon
    pub already_scheduled: u32,
    /// Backlog tasks displaced earlier in this run and not replanned
    #[serde(default)]
    pub left_displaced: u32,
    /// The run stopped early on request
    pub cancelled: bool,
}

impl BulkSummary {
    /// Number of backlog tasks the run processed.
    pub fn processed(&self) -> u32 {
        self.planned + self.skipped + self.already_scheduled + self.left_displaced
    }
}

/// Runs first-fit placement over a filtered backlog.
pub struct BulkAllocator<'a> {
    source: &'a dyn TaskSource,
    store: &'a dyn CalendarStore,
    config: &'a SchedulerConfig,
    now: NaiveDateTime,
}

impl<'a> BulkAllocator<'a> {
    pub fn new(
        source: &'a dyn TaskSource,
        store: &'a dyn CalendarStore,
        config: &'a SchedulerConfig,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            source,
            store,
            config,
            now,
        }
    }

    /// Plan every open task matching `filter` within `horizon_days`.
    ///
    /// Fails only if the backlog or the calendar cannot be read. Cancellation
    /// is checked between tasks; the summary then covers what was committed.
    pub async fn run(
        &self,
        filter: &TaskFilter,
        horizon_days: u32,
        cancel: &CancellationToken,
    ) -> Result<BulkSummary> {
        let mut tasks: Vec<Task> = self
            .source
            .fetch(filter)
            .await?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        sort_backlog(&mut tasks);

        let mut window = PlanningWindow::load(self.store, self.now.date(), horizon_days).await?;
        let book = ImportanceBook::new(tasks.iter(), self.now, self.config.importance);

        tracing::info!(
            source = self.source.name(),
            tasks = tasks.len(),
            horizon_days,
            "Starting bulk plan"
        );

        let mut summary = BulkSummary::default();
        let mut displaced_ids: HashSet<String> = HashSet::new();

        for task in &tasks {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                tracing::info!("Bulk plan cancelled");
                break;
            }

            if displaced_ids.contains(&task.id) {
                tracing::debug!(task_id = %task.id, "Displaced in this run, left unscheduled");
                summary.left_displaced += 1;
                continue;
            }
            if window.contains_task(&task.id) {
                summary.already_scheduled += 1;
                continue;
            }

            let minutes = task.planned_minutes(self.config.default_duration_minutes);
            let request = SlotRequest::for_task(task, minutes, book.of_task(task));
            let candidate = {
                let scorer = SlotScorer::new(self.config, self.now, &book);
                SlotSearch::new(scorer).first_fit(&request, window.days())
            };

            let Some(candidate) = candidate else {
                tracing::debug!(task_id = %task.id, "No slot in horizon");
                summary.skipped += 1;
                continue;
            };

            match self.commit(task, &candidate, &window).await {
                Ok(resolution) => {
                    summary.planned += 1;
                    if let Some(occupant) = &resolution.displaced {
                        summary.displaced += 1;
                        displaced_ids.insert(occupant.task_id.clone());
                    }
                    tracing::debug!(task_id = %task.id, slot = %candidate.slot, "Planned task");
                    window.commit(resolution.schedule);
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.id, error = %e, "Failed to persist placement, skipping");
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            planned = summary.planned,
            displaced = summary.displaced,
            skipped = summary.skipped,
            already_scheduled = summary.already_scheduled,
            left_displaced = summary.left_displaced,
            cancelled = summary.cancelled,
            "Bulk plan finished"
        );
        Ok(summary)
    }

    /// Stage the swap, write the task back, then persist the day.
    async fn commit(
        &self,
        task: &Task,
        candidate: &Candidate,
        window: &PlanningWindow,
    ) -> Result<Resolution> {
        let day = window
            .day(candidate.slot.date)
            .ok_or(CoreError::SlotUnavailable {
                date: candidate.slot.date,
                start: candidate.slot.start_datetime(),
            })?;
        let resolution = DisplacementResolver::new().resolve(&day.schedule, candidate, task)?;

        let update = TaskUpdate::placement(resolution.placed.start, candidate.slot.minutes());
        self.source
            .update(&task.id, &update)
            .await
            .map_err(|source| CoreError::ExternalWrite {
                task_id: task.id.clone(),
                source,
            })?;
        self.store.save_day(&resolution.schedule).await?;
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{BlockType, RecurringTimeBlock, TimeBlock};
    use crate::integrations::InMemoryTaskSource;
    use crate::storage::InMemoryCalendarStore;
    use crate::task::{Priority, TaskCategory};
    use chrono::NaiveDate;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn now() -> NaiveDateTime {
        monday().and_hms_opt(8, 0, 0).unwrap()
    }

    async fn store_with_work_block(start: &str, end: &str) -> InMemoryCalendarStore {
        let store = InMemoryCalendarStore::new();
        store
            .save_recurring_blocks(&[RecurringTimeBlock::new(
                TimeBlock::new("w", start, end, BlockType::Work),
                1,
            )])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn places_tasks_back_to_back() {
        let store = store_with_work_block("09:00", "10:00").await;
        let source = InMemoryTaskSource::with_tasks(vec![
            Task::new("a", "a").with_category(TaskCategory::Professional).with_priority(Priority::P1),
            Task::new("b", "b").with_category(TaskCategory::Professional).with_priority(Priority::P2),
        ]);
        let config = SchedulerConfig::builder().horizon_days(1).build();
        let allocator = BulkAllocator::new(&source, &store, &config, now());

        let summary = allocator
            .run(&TaskFilter::default(), 1, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.planned, 2);
        assert_eq!(summary.skipped, 0);

        let day = store.day(monday()).await.unwrap();
        let starts: Vec<_> = day
            .scheduled_tasks
            .iter()
            .map(|t| (t.task_id.as_str(), t.start_minute()))
            .collect();
        assert_eq!(starts, vec![("a", 540), ("b", 570)]);
    }

    #[tokio::test]
    async fn unmatched_category_is_skipped() {
        let store = store_with_work_block("09:00", "10:00").await;
        let source = InMemoryTaskSource::with_tasks(vec![
            Task::new("p", "groceries").with_category(TaskCategory::Personal),
        ]);
        let config = SchedulerConfig::default();
        let allocator = BulkAllocator::new(&source, &store, &config, now());

        let summary = allocator
            .run(&TaskFilter::default(), 3, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.planned, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn existing_placements_are_counted_not_moved() {
        let store = store_with_work_block("09:00", "10:00").await;
        let task = Task::new("a", "a").with_category(TaskCategory::Professional);
        let source = InMemoryTaskSource::with_tasks(vec![task.clone()]);
        let config = SchedulerConfig::default();

        let first = BulkAllocator::new(&source, &store, &config, now())
            .run(&TaskFilter::default(), 1, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.planned, 1);

        let second = BulkAllocator::new(&source, &store, &config, now())
            .run(&TaskFilter::default(), 1, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(second.planned, 0);
        assert_eq!(second.already_scheduled, 1);
        assert_eq!(second.processed(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_task() {
        let store = store_with_work_block("09:00", "10:00").await;
        let source = InMemoryTaskSource::with_tasks(vec![Task::new("a", "a")]);
        let config = SchedulerConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = BulkAllocator::new(&source, &store, &config, now())
            .run(&TaskFilter::default(), 1, &cancel)
            .await
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.planned, 0);
        assert!(store.day(monday()).await.unwrap().scheduled_tasks.is_empty());
    }
}
