//! External task model.
//!
//! Tasks come from a [`crate::integrations::TaskSource`] and are read-only to
//! the engine, apart from the fields written back when a task is placed
//! (due datetime and duration). The inverted numeric priority of the
//! upstream service never leaves its adapter: inside the crate priorities
//! are the named [`Priority`] ranks.

pub mod importance;
pub mod ordering;

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub use importance::{importance, ImportanceInput, ImportanceWeights};
pub use ordering::{backlog_order, sort_backlog};

/// Task priority, `P1` being the most urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    /// Display rank: 1 for `P1` through 4 for `P4`.
    pub fn rank(self) -> u8 {
        match self {
            Priority::P1 => 1,
            Priority::P2 => 2,
            Priority::P3 => 3,
            Priority::P4 => 4,
        }
    }

    /// Urgency: 4 for `P1` down to 1 for `P4`. Higher is more urgent.
    pub fn urgency(self) -> u8 {
        5 - self.rank()
    }

    /// Build from a display rank (1..=4). Out-of-range values clamp to `P4`.
    pub fn from_rank(rank: u8) -> Self {
        match rank {
            1 => Priority::P1,
            2 => Priority::P2,
            3 => Priority::P3,
            _ => Priority::P4,
        }
    }

    /// All priorities, most urgent first.
    pub fn all() -> [Priority; 4] {
        [Priority::P1, Priority::P2, Priority::P3, Priority::P4]
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::P4
    }
}

/// Ordered by urgency: `P1 > P2 > P3 > P4`.
impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.urgency().cmp(&other.urgency())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.rank())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P1" | "1" => Ok(Priority::P1),
            "P2" | "2" => Ok(Priority::P2),
            "P3" | "3" => Ok(Priority::P3),
            "P4" | "4" => Ok(Priority::P4),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Life area a task belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Personal,
    Professional,
}

impl TaskCategory {
    /// Map a label to a category. Matching is case-insensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "professional" | "work" => Some(TaskCategory::Professional),
            "personal" => Some(TaskCategory::Personal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::Personal => "personal",
            TaskCategory::Professional => "professional",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskCategory::from_label(s).ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Due date of a task, either a whole day or a precise datetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Due {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Due {
    pub fn date(&self) -> NaiveDate {
        match self {
            Due::Date(d) => *d,
            Due::DateTime(dt) => dt.date(),
        }
    }

    /// Point in time used for ordering and proximity. A date-only due sorts
    /// after every timed due of the same day.
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            Due::Date(d) => end_of_day(*d),
            Due::DateTime(dt) => *dt,
        }
    }
}

/// Last second of a day.
pub(crate) fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

/// A task as imported from the task source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<TaskCategory>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub due: Option<Due>,
    /// Estimated duration, if the source carries one.
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    /// Pinned by the user; sorts first in bulk runs.
    #[serde(default)]
    pub starred: bool,
    /// Immutable appointment; never displaced once placed.
    #[serde(default)]
    pub meeting: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Minimal open task, mostly useful for tests and the in-memory source.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            description: None,
            priority: Priority::default(),
            category: None,
            labels: Vec::new(),
            deadline: None,
            due: None,
            duration_minutes: None,
            completed: false,
            starred: false,
            meeting: false,
            created_at: DateTime::<Utc>::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: TaskCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_due(mut self, due: Due) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn starred(mut self) -> Self {
        self.starred = true;
        self
    }

    pub fn meeting(mut self) -> Self {
        self.meeting = true;
        self
    }

    /// Duration to plan for, falling back to `default_minutes`.
    pub fn planned_minutes(&self, default_minutes: u32) -> u32 {
        match self.duration_minutes {
            Some(m) if m > 0 => m,
            _ => default_minutes,
        }
    }
}

/// Criteria for selecting a backlog from the task source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Source-side query string (a Todoist filter expression, for example).
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<TaskCategory>,
    /// Every listed label must be present.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Keep only tasks at least this urgent.
    #[serde(default)]
    pub min_priority: Option<Priority>,
    #[serde(default)]
    pub include_meetings: bool,
}

impl TaskFilter {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Local post-filter applied after fetching. Completed tasks never match.
    pub fn matches(&self, task: &Task) -> bool {
        if task.completed {
            return false;
        }
        if task.meeting && !self.include_meetings {
            return false;
        }
        if let Some(category) = self.category {
            if task.category != Some(category) {
                return false;
            }
        }
        if let Some(min) = self.min_priority {
            if task.priority < min {
                return false;
            }
        }
        self.labels.iter().all(|wanted| {
            task.labels
                .iter()
                .any(|have| have.eq_ignore_ascii_case(wanted))
        })
    }
}

/// Unit of a written-back duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minute,
    Day,
}

/// Partial update written back to the task source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub due_date: Option<NaiveDate>,
    pub due_datetime: Option<NaiveDateTime>,
    pub duration: Option<u32>,
    pub duration_unit: Option<DurationUnit>,
    pub priority: Option<Priority>,
    pub labels: Option<Vec<String>>,
    pub description: Option<String>,
}

impl TaskUpdate {
    /// Update recording a placement at `start` for `minutes`.
    pub fn placement(start: NaiveDateTime, minutes: u32) -> Self {
        Self {
            due_datetime: Some(start),
            duration: Some(minutes),
            duration_unit: Some(DurationUnit::Minute),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_by_urgency() {
        assert!(Priority::P1 > Priority::P2);
        assert!(Priority::P3 > Priority::P4);
        assert_eq!(Priority::P1.urgency(), 4);
        assert_eq!(Priority::P4.urgency(), 1);
        assert_eq!("p2".parse::<Priority>().unwrap(), Priority::P2);
        assert_eq!(Priority::P3.to_string(), "P3");
    }

    #[test]
    fn category_from_labels() {
        assert_eq!(TaskCategory::from_label("Work"), Some(TaskCategory::Professional));
        assert_eq!(TaskCategory::from_label("personal"), Some(TaskCategory::Personal));
        assert_eq!(TaskCategory::from_label("errand"), None);
    }

    #[test]
    fn date_only_due_sorts_after_timed_due_same_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let timed = Due::DateTime(day.and_hms_opt(18, 0, 0).unwrap());
        assert!(Due::Date(day).instant() > timed.instant());
        assert_eq!(Due::Date(day).date(), timed.date());
    }

    #[test]
    fn filter_excludes_completed_and_meetings() {
        let filter = TaskFilter::default();
        let mut done = Task::new("1", "done");
        done.completed = true;
        assert!(!filter.matches(&done));
        assert!(!filter.matches(&Task::new("2", "standup").meeting()));
        assert!(filter.matches(&Task::new("3", "write report")));
    }

    #[test]
    fn filter_applies_category_priority_and_labels() {
        let filter = TaskFilter {
            category: Some(TaskCategory::Professional),
            min_priority: Some(Priority::P2),
            labels: vec!["deep".into()],
            ..TaskFilter::default()
        };
        let mut task = Task::new("1", "design")
            .with_category(TaskCategory::Professional)
            .with_priority(Priority::P1);
        task.labels.push("Deep".into());
        assert!(filter.matches(&task));

        let low = task.clone().with_priority(Priority::P3);
        assert!(!filter.matches(&low));

        let personal = task.clone().with_category(TaskCategory::Personal);
        assert!(!filter.matches(&personal));
    }

    #[test]
    fn planned_minutes_falls_back_to_default() {
        assert_eq!(Task::new("1", "a").planned_minutes(30), 30);
        assert_eq!(Task::new("1", "a").with_duration(0).planned_minutes(30), 30);
        assert_eq!(Task::new("1", "a").with_duration(45).planned_minutes(30), 45);
    }
}
