//! Slot scoring.
//!
//! A slot is infeasible when it starts in the past, overlaps a meeting,
//! overlaps an occupant at least as important as the incoming task, overlaps
//! more than one displaceable occupant, or overlaps a break block.
//!
//! A feasible slot's score adds up:
//! - a bonus when the slot displaces an occupant
//! - category fit with the containing block (or a penalty when none fits)
//! - the peak-hours bonus for professional work in a morning work block
//! - a priority bonus
//! - a date-proximity bonus that dominates everything else
//! - minus a small per-minute tie-breaker favouring earlier slots

use chrono::NaiveDateTime;

use super::config::SchedulerConfig;
use super::{OccupantImportance, PlanningDay, Slot, SlotRequest};
use crate::calendar::{BlockType, ScheduledTask};
use crate::task::TaskCategory;

/// Score of a feasible slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotScore {
    pub score: f64,
    /// Occupant that must leave the ledger for this slot to be used.
    pub displaced: Option<ScheduledTask>,
    /// Whether the peak-hours bonus was applied
    pub peak_bonus: bool,
}

/// Scores candidate slots at a fixed `now`.
pub struct SlotScorer<'a> {
    config: &'a SchedulerConfig,
    now: NaiveDateTime,
    occupants: &'a dyn OccupantImportance,
}

impl<'a> SlotScorer<'a> {
    pub fn new(
        config: &'a SchedulerConfig,
        now: NaiveDateTime,
        occupants: &'a dyn OccupantImportance,
    ) -> Self {
        Self {
            config,
            now,
            occupants,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.config
    }

    /// Score `slot` for `request` on `day`, or `None` if it is infeasible.
    pub fn score(&self, slot: &Slot, request: &SlotRequest, day: &PlanningDay) -> Option<SlotScore> {
        if slot.start_datetime() < self.now {
            return None;
        }

        let weights = &self.config.weights;
        let mut score = 0.0;

        // The task's own earlier placement does not block it.
        let mut displaced: Option<&ScheduledTask> = None;
        for occupant in day
            .schedule
            .occupants(slot.start, slot.end)
            .filter(|o| o.task_id != request.task_id)
        {
            if occupant.is_meeting || displaced.is_some() {
                return None;
            }
            if request.importance <= self.occupants.importance_of(occupant) {
                return None;
            }
            displaced = Some(occupant);
        }
        if displaced.is_some() {
            score += weights.displacement_bonus;
        }

        if day.blocks.overlaps_break(slot.start, slot.end) {
            return None;
        }

        let container = day.blocks.containing(slot.start, slot.end, request.category);
        if day.blocks.is_empty() {
            score += weights.no_blocks_bonus;
        } else {
            match (container, request.category) {
                (Some(_), Some(_)) => score += weights.category_match_bonus,
                (Some(_), None) => score += weights.uncategorized_fit_bonus,
                (None, _) => score -= weights.no_fit_penalty,
            }
        }

        let in_work_block = container.is_some_and(|w| w.block_type == BlockType::Work);
        let peak_bonus = request.category == Some(TaskCategory::Professional)
            && in_work_block
            && self.config.peak_hours.covers(slot.start);
        if peak_bonus {
            score += self.config.peak_hours.bonus;
        }

        score += weights.priority_bonus.for_priority(request.priority);

        let day_offset = (slot.date - self.now.date()).num_days();
        score += weights.day_bonus(day_offset);

        score -= f64::from(slot.start) * weights.minute_tiebreak;

        Some(SlotScore {
            score,
            displaced: displaced.cloned(),
            peak_bonus,
        })
    }
}
