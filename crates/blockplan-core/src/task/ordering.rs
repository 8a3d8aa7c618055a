//! Deterministic backlog order for bulk planning.
//!
//! Starred first, then earliest deadline, then highest priority, then
//! earliest due, then oldest creation time. Missing deadlines and dues sort
//! last. The task id closes the order so equal tasks never depend on the
//! fetch order.

use std::cmp::Ordering;

use super::Task;

/// Compare two tasks in backlog order.
pub fn backlog_order(a: &Task, b: &Task) -> Ordering {
    b.starred
        .cmp(&a.starred)
        .then_with(|| none_last(a.deadline, b.deadline))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| none_last(a.due.map(|d| d.instant()), b.due.map(|d| d.instant())))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort a backlog in place.
pub fn sort_backlog(tasks: &mut [Task]) {
    tasks.sort_by(backlog_order);
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Due, Priority};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn starred_tasks_come_first() {
        let mut tasks = vec![
            Task::new("a", "a").with_priority(Priority::P1).with_deadline(date(1)),
            Task::new("b", "b").starred(),
        ];
        sort_backlog(&mut tasks);
        assert_eq!(ids(&tasks), vec!["b", "a"]);
    }

    #[test]
    fn deadline_then_priority_then_due() {
        let mut tasks = vec![
            Task::new("no-deadline", "x").with_priority(Priority::P1),
            Task::new("late", "x").with_deadline(date(9)),
            Task::new("early-p3", "x").with_deadline(date(3)).with_priority(Priority::P3),
            Task::new("early-p1", "x").with_deadline(date(3)).with_priority(Priority::P1),
            Task::new("p1-due", "x")
                .with_priority(Priority::P1)
                .with_due(Due::Date(date(4))),
        ];
        sort_backlog(&mut tasks);
        assert_eq!(
            ids(&tasks),
            vec!["early-p1", "early-p3", "late", "p1-due", "no-deadline"]
        );
    }

    #[test]
    fn creation_time_then_id_break_ties() {
        let older = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let mut tasks = vec![
            Task::new("z", "x").with_created_at(newer),
            Task::new("y", "x").with_created_at(older),
            Task::new("x", "x").with_created_at(newer),
        ];
        sort_backlog(&mut tasks);
        assert_eq!(ids(&tasks), vec!["y", "x", "z"]);
    }

    #[test]
    fn order_is_independent_of_input_order() {
        let make = || {
            vec![
                Task::new("1", "x").with_priority(Priority::P2),
                Task::new("2", "x").with_deadline(date(5)),
                Task::new("3", "x").starred(),
                Task::new("4", "x").with_priority(Priority::P2),
            ]
        };
        let mut forward = make();
        let mut backward = make();
        backward.reverse();
        sort_backlog(&mut forward);
        sort_backlog(&mut backward);
        assert_eq!(forward, backward);
    }
}
