//! Importance score used to arbitrate displacement.
//!
//! The score is ephemeral: it is computed on demand from deadline
//! proximity, priority and due-date proximity, and is never persisted.
//! Only its relative order matters (is the incoming task strictly more
//! important than the occupant?).
//!
//! Each factor is normalized to 0-100 and the weighted sum stays in the
//! same range.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{end_of_day, Priority, Task};
use crate::calendar::ScheduledTask;

/// Weights of the three importance factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportanceWeights {
    #[serde(default = "default_deadline_weight")]
    pub deadline: f64,
    #[serde(default = "default_priority_weight")]
    pub priority: f64,
    #[serde(default = "default_due_weight")]
    pub due: f64,
}

fn default_deadline_weight() -> f64 {
    0.4
}
fn default_priority_weight() -> f64 {
    0.4
}
fn default_due_weight() -> f64 {
    0.2
}

impl Default for ImportanceWeights {
    fn default() -> Self {
        Self {
            deadline: default_deadline_weight(),
            priority: default_priority_weight(),
            due: default_due_weight(),
        }
    }
}

/// The attributes importance is computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportanceInput {
    pub priority: Priority,
    pub deadline: Option<NaiveDateTime>,
    pub due: Option<NaiveDateTime>,
}

impl ImportanceInput {
    pub fn from_task(task: &Task) -> Self {
        Self {
            priority: task.priority,
            deadline: task.deadline.map(end_of_day),
            due: task.due.map(|d| d.instant()),
        }
    }

    /// Importance of a ledger entry when the underlying task is unknown:
    /// its placement acts as its due time.
    pub fn from_scheduled(entry: &ScheduledTask, deadline: Option<NaiveDate>) -> Self {
        Self {
            priority: entry.priority,
            deadline: deadline.map(end_of_day),
            due: Some(entry.start),
        }
    }
}

/// Compute the importance score (0-100).
pub fn importance(input: &ImportanceInput, now: NaiveDateTime, weights: &ImportanceWeights) -> f64 {
    let score = proximity_score(input.deadline, now) * weights.deadline
        + priority_score(input.priority) * weights.priority
        + proximity_score(input.due, now) * weights.due;
    score.clamp(0.0, 100.0)
}

/// Priority factor: P1 100, P2 75, P3 50, P4 25.
fn priority_score(priority: Priority) -> f64 {
    f64::from(priority.urgency()) * 25.0
}

/// Time-proximity factor (0-100)
///
/// - Overdue: 100
/// - Within 24h: 90-99 based on hours remaining
/// - Within 3 days: 60-89
/// - Within 7 days: 30-59
/// - Within 30 days: 10-29
/// - None or later: 5
fn proximity_score(target: Option<NaiveDateTime>, now: NaiveDateTime) -> f64 {
    let Some(target) = target else {
        return 5.0;
    };

    let hours = target.signed_duration_since(now).num_hours();
    if hours < 0 {
        100.0
    } else if hours < 24 {
        90.0 + 9.0 * (1.0 - hours as f64 / 24.0)
    } else if hours < 72 {
        let progress = (hours - 24) as f64 / 48.0;
        89.0 - 29.0 * progress
    } else if hours < 168 {
        let progress = (hours - 72) as f64 / 96.0;
        59.0 - 29.0 * progress
    } else if hours < 720 {
        let progress = (hours - 168) as f64 / 552.0;
        29.0 - 19.0 * progress
    } else {
        5.0
    }
}
