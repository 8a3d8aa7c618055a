//! Scheduler configuration.
//!
//! Every scoring constant lives here so the engine can be tuned per user.
//! The date-proximity terms must stay larger than the spread of all other
//! slot-dependent terms, otherwise a later day could outscore an earlier
//! one; [`ScoringWeights::dominance_margin`] checks that.

use serde::{Deserialize, Serialize};

use crate::task::{ImportanceWeights, Priority};

/// Bonus per priority rank. Must be monotonic: `p1 >= p2 >= p3 >= p4`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityBonus {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
}

impl PriorityBonus {
    pub fn for_priority(&self, priority: Priority) -> f64 {
        match priority {
            Priority::P1 => self.p1,
            Priority::P2 => self.p2,
            Priority::P3 => self.p3,
            Priority::P4 => self.p4,
        }
    }

    pub fn is_monotonic(&self) -> bool {
        self.p1 >= self.p2 && self.p2 >= self.p3 && self.p3 >= self.p4
    }
}

impl Default for PriorityBonus {
    fn default() -> Self {
        Self {
            p1: 40.0,
            p2: 30.0,
            p3: 20.0,
            p4: 10.0,
        }
    }
}

/// Terms of the slot score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Added when the slot displaces an occupant
    #[serde(default = "default_displacement_bonus")]
    pub displacement_bonus: f64,
    /// Task category matches the containing block type
    #[serde(default = "default_category_match_bonus")]
    pub category_match_bonus: f64,
    /// Uncategorized task inside a work or personal block
    #[serde(default = "default_uncategorized_fit_bonus")]
    pub uncategorized_fit_bonus: f64,
    /// Subtracted when the day has blocks but none fits the slot
    #[serde(default = "default_no_fit_penalty")]
    pub no_fit_penalty: f64,
    /// Baseline when the day has no blocks at all
    #[serde(default = "default_no_blocks_bonus")]
    pub no_blocks_bonus: f64,
    #[serde(default)]
    pub priority_bonus: PriorityBonus,
    #[serde(default = "default_today_bonus")]
    pub today_bonus: f64,
    #[serde(default = "default_tomorrow_bonus")]
    pub tomorrow_bonus: f64,
    /// Subtracted per day beyond tomorrow
    #[serde(default = "default_per_day_penalty")]
    pub per_day_penalty: f64,
    /// Subtracted per minute since midnight
    #[serde(default = "default_minute_tiebreak")]
    pub minute_tiebreak: f64,
}

fn default_displacement_bonus() -> f64 {
    5.0
}
fn default_category_match_bonus() -> f64 {
    30.0
}
fn default_uncategorized_fit_bonus() -> f64 {
    15.0
}
fn default_no_fit_penalty() -> f64 {
    50.0
}
fn default_no_blocks_bonus() -> f64 {
    5.0
}
fn default_today_bonus() -> f64 {
    1000.0
}
fn default_tomorrow_bonus() -> f64 {
    500.0
}
fn default_per_day_penalty() -> f64 {
    200.0
}
fn default_minute_tiebreak() -> f64 {
    0.001
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            displacement_bonus: default_displacement_bonus(),
            category_match_bonus: default_category_match_bonus(),
            uncategorized_fit_bonus: default_uncategorized_fit_bonus(),
            no_fit_penalty: default_no_fit_penalty(),
            no_blocks_bonus: default_no_blocks_bonus(),
            priority_bonus: PriorityBonus::default(),
            today_bonus: default_today_bonus(),
            tomorrow_bonus: default_tomorrow_bonus(),
            per_day_penalty: default_per_day_penalty(),
            minute_tiebreak: default_minute_tiebreak(),
        }
    }
}

impl ScoringWeights {
    /// Date-proximity term for a slot `day_offset` days after today.
    pub fn day_bonus(&self, day_offset: i64) -> f64 {
        match day_offset {
            i64::MIN..=0 => self.today_bonus,
            1 => self.tomorrow_bonus,
            n => self.tomorrow_bonus - self.per_day_penalty * (n - 1) as f64,
        }
    }

    /// Largest possible swing of the slot-dependent terms within one day.
    fn intra_day_spread(&self, peak_bonus: f64) -> f64 {
        let best = self.displacement_bonus
            + self.category_match_bonus.max(self.uncategorized_fit_bonus).max(self.no_blocks_bonus)
            + peak_bonus;
        let worst = -self.no_fit_penalty - self.minute_tiebreak * 1440.0;
        best - worst
    }

    /// Smallest gap between consecutive day bonuses minus the intra-day
    /// spread. Positive means an earlier day always wins.
    pub fn dominance_margin(&self, peak_bonus: f64) -> f64 {
        let step = (self.today_bonus - self.tomorrow_bonus).min(self.per_day_penalty);
        step - self.intra_day_spread(peak_bonus)
    }
}

/// Morning window where professional work in a work block earns a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakHours {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Inclusive start hour
    #[serde(default = "default_peak_start")]
    pub start_hour: u32,
    /// Exclusive end hour
    #[serde(default = "default_peak_end")]
    pub end_hour: u32,
    #[serde(default = "default_peak_bonus")]
    pub bonus: f64,
}

fn default_true() -> bool {
    true
}
fn default_peak_start() -> u32 {
    6
}
fn default_peak_end() -> u32 {
    10
}
fn default_peak_bonus() -> f64 {
    20.0
}

impl Default for PeakHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: default_peak_start(),
            end_hour: default_peak_end(),
            bonus: default_peak_bonus(),
        }
    }
}

impl PeakHours {
    /// Whether a slot starting at `minute` (since midnight) is in the window.
    pub fn covers(&self, minute: u32) -> bool {
        let hour = minute / 60;
        self.enabled && self.start_hour <= hour && hour < self.end_hour
    }

    fn effective_bonus(&self) -> f64 {
        if self.enabled {
            self.bonus
        } else {
            0.0
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Days searched by default
    pub horizon_days: u32,
    /// Duration used for tasks without an estimate (minutes)
    pub default_duration_minutes: u32,
    pub weights: ScoringWeights,
    pub peak_hours: PeakHours,
    pub importance: ImportanceWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            default_duration_minutes: 30,
            weights: ScoringWeights::default(),
            peak_hours: PeakHours::default(),
            importance: ImportanceWeights::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Whether an earlier feasible day always outscores a later one.
    pub fn earlier_day_dominates(&self) -> bool {
        self.weights.dominance_margin(self.peak_hours.effective_bonus()) > 0.0
    }
}

/// Builder for [`SchedulerConfig`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    pub fn horizon_days(mut self, days: u32) -> Self {
        self.config.horizon_days = days.max(1);
        self
    }

    pub fn default_duration_minutes(mut self, minutes: u32) -> Self {
        self.config.default_duration_minutes = minutes;
        self
    }

    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Set the peak window `[start_hour, end_hour)` and its bonus.
    pub fn peak_hours(mut self, start_hour: u32, end_hour: u32, bonus: f64) -> Self {
        self.config.peak_hours = PeakHours {
            enabled: true,
            start_hour,
            end_hour,
            bonus,
        };
        self
    }

    pub fn without_peak_hours(mut self) -> Self {
        self.config.peak_hours.enabled = false;
        self
    }

    pub fn importance(mut self, weights: ImportanceWeights) -> Self {
        self.config.importance = weights;
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}
