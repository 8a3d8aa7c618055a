//! Grid search over a planning window.
//!
//! Days are visited in ascending order and ticks in ascending time, so the
//! first maximum found is also the soonest. Days before today are skipped;
//! today starts at the next grid tick at or after now, every later day at
//! midnight. A slot never crosses midnight.
//!
//! Two strategies share the scorer:
//! - [`SlotSearch::best`] keeps the global maximum over the whole horizon
//!   (interactive suggestions).
//! - [`SlotSearch::first_fit`] only considers slots inside blocks accepting
//!   the task's category and returns a slot on the first day that has one.
//!   Within that day a free slot beats one that displaces an occupant (bulk
//!   planning).

use chrono::NaiveDate;

use super::grid::{self, GRID_MINUTES};
use super::scorer::{SlotScore, SlotScorer};
use super::{PlanningDay, Slot, SlotRequest};
use crate::calendar::{ScheduledTask, MINUTES_PER_DAY};

/// A feasible slot with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub slot: Slot,
    pub score: f64,
    pub displaced: Option<ScheduledTask>,
    pub peak_bonus: bool,
}

impl Candidate {
    fn new(slot: Slot, scored: SlotScore) -> Self {
        Self {
            slot,
            score: scored.score,
            displaced: scored.displaced,
            peak_bonus: scored.peak_bonus,
        }
    }
}

/// Searches the 15-minute grid with a [`SlotScorer`].
pub struct SlotSearch<'a> {
    scorer: SlotScorer<'a>,
}

impl<'a> SlotSearch<'a> {
    pub fn new(scorer: SlotScorer<'a>) -> Self {
        Self { scorer }
    }

    /// First minute searched on `date`, or `None` for past days.
    fn day_start(&self, date: NaiveDate) -> Option<u32> {
        let today = self.scorer.now().date();
        if date < today {
            None
        } else if date == today {
            Some(grid::next_tick(self.scorer.now()))
        } else {
            Some(0)
        }
    }

    /// Highest-scoring feasible slot over all days. Ties keep the earliest.
    pub fn best(&self, request: &SlotRequest, days: &[PlanningDay]) -> Option<Candidate> {
        let duration = request.duration_minutes;
        let mut best: Option<Candidate> = None;
        let mut evaluated = 0usize;

        for day in days {
            let Some(first) = self.day_start(day.date) else {
                continue;
            };
            let mut start = first;
            while start + duration <= MINUTES_PER_DAY {
                let slot = Slot::new(day.date, start, duration);
                evaluated += 1;
                if let Some(scored) = self.scorer.score(&slot, request, day) {
                    if best.as_ref().map_or(true, |b| scored.score > b.score) {
                        best = Some(Candidate::new(slot, scored));
                    }
                }
                start += GRID_MINUTES;
            }
        }

        tracing::debug!(
            task_id = %request.task_id,
            evaluated,
            found = best.is_some(),
            "Best-slot search finished"
        );
        best
    }

    /// First feasible slot inside a block accepting the request's category.
    ///
    /// The earliest day with any feasible slot wins, even if its only slot
    /// displaces an occupant. Within that day the first free slot is taken
    /// before the first displacing one.
    pub fn first_fit(&self, request: &SlotRequest, days: &[PlanningDay]) -> Option<Candidate> {
        let duration = request.duration_minutes;

        for day in days {
            let Some(day_start) = self.day_start(day.date) else {
                continue;
            };
            let mut first_displacing: Option<Candidate> = None;
            for window in day.blocks.accepting(request.category) {
                let mut start = grid::align_up(window.start.max(day_start));
                while start + duration <= window.end {
                    let slot = Slot::new(day.date, start, duration);
                    if let Some(scored) = self.scorer.score(&slot, request, day) {
                        if scored.displaced.is_none() {
                            return Some(Candidate::new(slot, scored));
                        }
                        if first_displacing.is_none() {
                            first_displacing = Some(Candidate::new(slot, scored));
                        }
                    }
                    start += GRID_MINUTES;
                }
            }
            if first_displacing.is_some() {
                return first_displacing;
            }
        }

        None
    }
}
