//! Per-day ledger of placed tasks.
//!
//! The ledger of a [`DaySchedule`] is kept ordered by start time and its
//! entries never overlap: every insertion goes through
//! [`DaySchedule::swapped`], which refuses to create a conflict.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::DaySchedule;
use crate::error::ValidationError;
use crate::task::{Priority, Task, TaskCategory};

/// A task instance placed on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: String,
    pub task_id: String,
    pub content: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<TaskCategory>,
    pub estimated_duration_minutes: u32,
    #[serde(default)]
    pub is_meeting: bool,
    /// Deadline of the task when it was placed
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Task this instance was created from.
    pub original_task_id: String,
}

impl ScheduledTask {
    /// Place `task` at `start` for `minutes`.
    pub fn place(task: &Task, start: NaiveDateTime, minutes: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            content: task.content.clone(),
            start,
            end: start + chrono::Duration::minutes(i64::from(minutes)),
            priority: task.priority,
            category: task.category,
            estimated_duration_minutes: minutes,
            is_meeting: task.meeting,
            deadline: task.deadline,
            original_task_id: task.id.clone(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Start in minutes since midnight of [`Self::date`].
    pub fn start_minute(&self) -> u32 {
        self.start.num_seconds_from_midnight() / 60
    }

    /// End in minutes since midnight of [`Self::date`]; may be 1440.
    pub fn end_minute(&self) -> u32 {
        let midnight = self.date().and_time(chrono::NaiveTime::MIN);
        let minutes = (self.end - midnight).num_minutes();
        u32::try_from(minutes.max(0)).unwrap_or(u32::MAX)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open overlap with `[start, end)` minutes of the same day.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start_minute() < end && self.end_minute() > start
    }
}

impl DaySchedule {
    /// Entries overlapping `[start, end)`.
    pub fn occupants(&self, start: u32, end: u32) -> impl Iterator<Item = &ScheduledTask> {
        self.scheduled_tasks
            .iter()
            .filter(move |t| t.overlaps(start, end))
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.scheduled_tasks.iter().any(|t| t.task_id == task_id)
    }

    /// Schedule after removing `displaced` (if any) and inserting `incoming`.
    ///
    /// Earlier placements of the same task on this day are dropped, so a task
    /// appears at most once per ledger. The receiver is left untouched;
    /// callers replace it with the returned value in one assignment.
    ///
    /// Fails if `displaced` is not in the ledger or is a meeting, if
    /// `incoming` belongs to another day, or if `incoming` would still
    /// overlap an entry.
    pub fn swapped(
        &self,
        displaced: Option<&str>,
        incoming: ScheduledTask,
    ) -> Result<(DaySchedule, Option<ScheduledTask>), ValidationError> {
        if incoming.date() != self.date {
            return Err(ValidationError::InvalidValue {
                field: "start".into(),
                message: format!(
                    "task starts on {} but the ledger is for {}",
                    incoming.date(),
                    self.date
                ),
            });
        }

        let mut next = self.clone();
        let removed = match displaced {
            Some(id) => {
                let index = next
                    .scheduled_tasks
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| ValidationError::NotFound {
                        kind: "Scheduled task".into(),
                        id: id.to_string(),
                    })?;
                if next.scheduled_tasks[index].is_meeting {
                    return Err(ValidationError::InvalidValue {
                        field: "displaced".into(),
                        message: format!("'{id}' is a meeting and cannot be displaced"),
                    });
                }
                Some(next.scheduled_tasks.remove(index))
            }
            None => None,
        };
        next.scheduled_tasks.retain(|t| t.task_id != incoming.task_id);

        let (start, end) = (incoming.start_minute(), incoming.end_minute());
        if let Some(conflict) = next.occupants(start, end).next() {
            return Err(ValidationError::InvalidValue {
                field: "start".into(),
                message: format!("slot overlaps '{}' ({})", conflict.content, conflict.id),
            });
        }

        let at = next
            .scheduled_tasks
            .partition_point(|t| (t.start, &t.id) <= (incoming.start, &incoming.id));
        next.scheduled_tasks.insert(at, incoming);
        Ok((next, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn entry(id: &str, h: u32, m: u32, minutes: u32) -> ScheduledTask {
        let mut e = ScheduledTask::place(&Task::new(id, id), at(h, m), minutes);
        e.id = format!("s-{id}");
        e
    }

    #[test]
    fn minutes_and_overlap() {
        let e = entry("a", 9, 0, 30);
        assert_eq!(e.start_minute(), 540);
        assert_eq!(e.end_minute(), 570);
        assert!(e.overlaps(555, 585));
        assert!(!e.overlaps(570, 600));
        assert!(!e.overlaps(510, 540));
    }

    #[test]
    fn entry_may_end_at_midnight() {
        let e = entry("late", 23, 30, 30);
        assert_eq!(e.end_minute(), 1440);
    }

    #[test]
    fn swap_inserts_in_start_order() {
        let mut schedule = DaySchedule::empty(day());
        for e in [entry("b", 11, 0, 30), entry("a", 9, 0, 30), entry("c", 10, 0, 30)] {
            let (next, removed) = schedule.swapped(None, e).unwrap();
            assert!(removed.is_none());
            schedule = next;
        }
        let order: Vec<_> = schedule.scheduled_tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn swap_replaces_displaced_entry() {
        let (schedule, _) = DaySchedule::empty(day()).swapped(None, entry("low", 9, 0, 30)).unwrap();
        let (next, removed) = schedule
            .swapped(Some("s-low"), entry("high", 9, 0, 30))
            .unwrap();
        assert_eq!(removed.unwrap().task_id, "low");
        assert_eq!(next.scheduled_tasks.len(), 1);
        assert_eq!(next.scheduled_tasks[0].task_id, "high");
        // the original is untouched
        assert_eq!(schedule.scheduled_tasks[0].task_id, "low");
    }

    #[test]
    fn swap_refuses_overlap_and_meetings() {
        let mut meeting = entry("standup", 9, 0, 30);
        meeting.is_meeting = true;
        let (schedule, _) = DaySchedule::empty(day()).swapped(None, meeting).unwrap();

        assert!(schedule.swapped(None, entry("x", 9, 15, 30)).is_err());
        assert!(schedule.swapped(Some("s-standup"), entry("x", 9, 0, 30)).is_err());
        assert!(schedule.swapped(Some("missing"), entry("x", 10, 0, 30)).is_err());
    }

    #[test]
    fn swap_rejects_other_day() {
        let mut other = entry("x", 9, 0, 30);
        other.start = other.start + chrono::Duration::days(1);
        other.end = other.end + chrono::Duration::days(1);
        assert!(DaySchedule::empty(day()).swapped(None, other).is_err());
    }

    #[test]
    fn swap_moves_existing_placement_of_same_task() {
        let (schedule, _) = DaySchedule::empty(day()).swapped(None, entry("a", 9, 0, 30)).unwrap();
        let (next, removed) = schedule.swapped(None, entry("a", 14, 0, 30)).unwrap();
        assert!(removed.is_none());
        assert_eq!(next.scheduled_tasks.len(), 1);
        assert_eq!(next.scheduled_tasks[0].start, at(14, 0));
    }
}
