//! Atomic displacement of a ledger occupant.

use super::search::Candidate;
use crate::calendar::{DaySchedule, ScheduledTask};
use crate::error::ValidationError;
use crate::task::Task;

/// Outcome of applying a candidate to a day's ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The day's ledger after the swap
    pub schedule: DaySchedule,
    pub placed: ScheduledTask,
    /// Occupant returned to the unscheduled pool
    pub displaced: Option<ScheduledTask>,
}

/// Turns a search candidate into a new day schedule.
///
/// The displaced occupant is removed and the incoming task inserted in one
/// step: the result is a fresh [`DaySchedule`] that replaces the old one, so
/// no state with both or neither task in the slot is ever observable. The
/// occupant is not rescheduled.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplacementResolver;

impl DisplacementResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        schedule: &DaySchedule,
        candidate: &Candidate,
        task: &Task,
    ) -> Result<Resolution, ValidationError> {
        if schedule.date != candidate.slot.date {
            return Err(ValidationError::InvalidValue {
                field: "date".into(),
                message: format!(
                    "candidate is for {} but the ledger is for {}",
                    candidate.slot.date, schedule.date
                ),
            });
        }

        let placed = ScheduledTask::place(
            task,
            candidate.slot.start_datetime(),
            candidate.slot.minutes(),
        );
        let displaced_id = candidate.displaced.as_ref().map(|d| d.id.as_str());
        let (next, displaced) = schedule.swapped(displaced_id, placed.clone())?;

        if let Some(ref occupant) = displaced {
            tracing::info!(
                task_id = %task.id,
                displaced_task_id = %occupant.task_id,
                slot = %candidate.slot,
                "Displacing scheduled task"
            );
        }

        Ok(Resolution {
            schedule: next,
            placed,
            displaced,
        })
    }
}
