//! Integration tests for bulk planning.

use std::sync::Arc;

use async_trait::async_trait;
use blockplan_core::{
    BlockType, BulkSummary, CalendarStore, DaySchedule, FixedClock, InMemoryCalendarStore,
    InMemoryTaskSource, Planner, Priority, RecurringTimeBlock, ScheduledTask, SchedulerConfig,
    SourceError, Task, TaskCategory, TaskFilter, TaskSource, TaskUpdate, TimeBlock,
};
use chrono::{NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    monday().and_hms_opt(h, m, 0).unwrap()
}

fn work(id: &str, start: &str, end: &str) -> RecurringTimeBlock {
    RecurringTimeBlock::new(TimeBlock::new(id, start, end, BlockType::Work), 1)
}

fn backlog() -> Vec<Task> {
    (1..=5)
        .map(|i| {
            Task::new(format!("t{i}"), format!("Task {i}"))
                .with_category(TaskCategory::Professional)
                .with_duration(30)
        })
        .collect()
}

async fn planner_for(
    source: Arc<dyn TaskSource>,
    blocks: &[RecurringTimeBlock],
) -> (Planner, Arc<InMemoryCalendarStore>) {
    let store = Arc::new(InMemoryCalendarStore::new());
    store.save_recurring_blocks(blocks).await.unwrap();
    let planner = Planner::new(source, store.clone(), SchedulerConfig::default())
        .with_clock(Arc::new(FixedClock(at(8, 0))));
    (planner, store)
}

fn placements(schedule: &DaySchedule) -> Vec<(String, NaiveDateTime, NaiveDateTime)> {
    schedule
        .scheduled_tasks
        .iter()
        .map(|t| (t.task_id.clone(), t.start, t.end))
        .collect()
}

#[tokio::test]
async fn repeated_runs_reproduce_the_same_plan() {
    let mut tasks = backlog();
    tasks[4] = tasks[4].clone().with_priority(Priority::P1);
    tasks[2] = tasks[2].clone().starred();

    let mut results = Vec::new();
    for _ in 0..2 {
        let source = Arc::new(InMemoryTaskSource::with_tasks(tasks.clone()));
        let (planner, store) = planner_for(source, &[work("w", "09:00", "11:00")]).await;
        let summary = planner
            .run_bulk_plan(&TaskFilter::default(), Some(1), &CancellationToken::new())
            .await
            .unwrap();
        results.push((summary, placements(&store.day(monday()).await.unwrap())));
    }

    assert_eq!(results[0], results[1]);
    let (summary, placed) = &results[0];
    assert_eq!(summary.planned, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed(), 5);
    let order: Vec<_> = placed.iter().map(|(id, _, _)| id.as_str()).collect();
    assert_eq!(order, vec!["t3", "t5", "t1", "t2"]);
}

#[tokio::test]
async fn one_failed_write_does_not_stop_the_run() {
    let source = Arc::new(InMemoryTaskSource::with_tasks(backlog()));
    source.fail_updates_for("t3").await;
    let (planner, store) = planner_for(source.clone(), &[work("w", "09:00", "12:00")]).await;

    let summary = planner
        .run_bulk_plan(&TaskFilter::default(), Some(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        summary,
        BulkSummary {
            planned: 4,
            skipped: 1,
            ..BulkSummary::default()
        }
    );

    let placed = placements(&store.day(monday()).await.unwrap());
    assert_eq!(
        placed,
        vec![
            ("t1".to_string(), at(9, 0), at(9, 30)),
            ("t2".to_string(), at(9, 30), at(10, 0)),
            ("t4".to_string(), at(10, 0), at(10, 30)),
            ("t5".to_string(), at(10, 30), at(11, 0)),
        ]
    );
    let written: Vec<_> = source.updates().await.into_iter().map(|(id, _)| id).collect();
    assert_eq!(written, vec!["t1", "t2", "t4", "t5"]);
}

#[tokio::test]
async fn occupant_is_displaced_by_more_important_task() {
    let source = Arc::new(InMemoryTaskSource::with_tasks(vec![Task::new("urgent", "Hotfix")
        .with_category(TaskCategory::Professional)
        .with_priority(Priority::P1)
        .with_duration(30)]));
    let (planner, store) = planner_for(source, &[work("w", "09:00", "09:30")]).await;

    let old = ScheduledTask::place(
        &Task::new("old", "Inbox zero").with_priority(Priority::P4),
        at(9, 0),
        30,
    );
    let mut day = DaySchedule::empty(monday());
    day.scheduled_tasks.push(old);
    store.save_day(&day).await.unwrap();

    let summary = planner
        .run_bulk_plan(&TaskFilter::default(), Some(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.planned, 1);
    assert_eq!(summary.displaced, 1);

    let placed = placements(&store.day(monday()).await.unwrap());
    assert_eq!(placed, vec![("urgent".to_string(), at(9, 0), at(9, 30))]);
}

#[tokio::test]
async fn urgent_task_displaces_today_instead_of_waiting_for_tomorrow() {
    let source = Arc::new(InMemoryTaskSource::with_tasks(vec![Task::new("urgent", "Hotfix")
        .with_category(TaskCategory::Professional)
        .with_priority(Priority::P1)
        .with_deadline(monday())
        .with_duration(30)]));
    let tuesday_work =
        RecurringTimeBlock::new(TimeBlock::new("w2", "09:00", "09:30", BlockType::Work), 2);
    let (planner, store) = planner_for(source, &[work("w", "09:00", "09:30"), tuesday_work]).await;

    let low = ScheduledTask::place(
        &Task::new("low", "Sort photos").with_priority(Priority::P4),
        at(9, 0),
        30,
    );
    let mut day = DaySchedule::empty(monday());
    day.scheduled_tasks.push(low);
    store.save_day(&day).await.unwrap();

    let summary = planner
        .run_bulk_plan(&TaskFilter::default(), Some(2), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.planned, 1);
    assert_eq!(summary.displaced, 1);

    let placed = placements(&store.day(monday()).await.unwrap());
    assert_eq!(placed, vec![("urgent".to_string(), at(9, 0), at(9, 30))]);
    let tuesday = monday().succ_opt().unwrap();
    assert!(store.day(tuesday).await.unwrap().scheduled_tasks.is_empty());
}

#[tokio::test]
async fn displaced_backlog_task_is_accounted_for() {
    let old = Task::new("old", "Inbox zero")
        .with_category(TaskCategory::Professional)
        .with_priority(Priority::P4)
        .with_duration(30);
    let urgent = Task::new("urgent", "Hotfix")
        .with_category(TaskCategory::Professional)
        .with_priority(Priority::P1)
        .with_duration(30);
    let source = Arc::new(InMemoryTaskSource::with_tasks(vec![old.clone(), urgent]));
    let (planner, store) = planner_for(source, &[work("w", "09:00", "09:30")]).await;

    let mut day = DaySchedule::empty(monday());
    day.scheduled_tasks.push(ScheduledTask::place(&old, at(9, 0), 30));
    store.save_day(&day).await.unwrap();

    let summary = planner
        .run_bulk_plan(&TaskFilter::default(), Some(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        summary,
        BulkSummary {
            planned: 1,
            displaced: 1,
            left_displaced: 1,
            ..BulkSummary::default()
        }
    );
    assert_eq!(summary.processed(), 2);
}

#[tokio::test]
async fn categories_stay_in_their_blocks() {
    let source = Arc::new(InMemoryTaskSource::with_tasks(vec![
        Task::new("gym", "Gym").with_category(TaskCategory::Personal),
        Task::new("review", "Code review")
            .with_category(TaskCategory::Professional)
            .with_priority(Priority::P1),
        Task::new("misc", "Call bank"),
    ]));
    let blocks = [
        work("w", "09:00", "09:30"),
        RecurringTimeBlock::new(TimeBlock::new("p", "18:00", "18:30", BlockType::Personal), 1),
    ];
    let (planner, store) = planner_for(source, &blocks).await;

    let summary = planner
        .run_bulk_plan(&TaskFilter::default(), Some(1), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.planned, 2);
    assert_eq!(summary.skipped, 1);

    let placed = placements(&store.day(monday()).await.unwrap());
    assert!(placed.contains(&("review".to_string(), at(9, 0), at(9, 30))));
    assert!(placed.contains(&("gym".to_string(), at(18, 0), at(18, 30))));
}

/// Cancels the run as soon as the first placement is written.
struct CancelAfterFirstWrite {
    inner: InMemoryTaskSource,
    cancel: CancellationToken,
}

#[async_trait]
impl TaskSource for CancelAfterFirstWrite {
    fn name(&self) -> &str {
        "cancelling"
    }

    async fn fetch(&self, filter: &TaskFilter) -> Result<Vec<Task>, SourceError> {
        self.inner.fetch(filter).await
    }

    async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, SourceError> {
        let task = self.inner.update(id, update).await?;
        self.cancel.cancel();
        Ok(task)
    }

    async fn close(&self, id: &str) -> Result<(), SourceError> {
        self.inner.close(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), SourceError> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn cancellation_keeps_committed_work_only() {
    let cancel = CancellationToken::new();
    let source = Arc::new(CancelAfterFirstWrite {
        inner: InMemoryTaskSource::with_tasks(backlog()),
        cancel: cancel.clone(),
    });
    let (planner, store) = planner_for(source, &[work("w", "09:00", "12:00")]).await;

    let summary = planner
        .run_bulk_plan(&TaskFilter::default(), Some(1), &cancel)
        .await
        .unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.planned, 1);

    let placed = placements(&store.day(monday()).await.unwrap());
    assert_eq!(placed, vec![("t1".to_string(), at(9, 0), at(9, 30))]);
}
