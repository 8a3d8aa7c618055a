//! Personal calendar of time blocks.
//!
//! A day's blocks are the union of the recurring weekly blocks for its
//! weekday and the date-specific overrides stored with the day. Blocks are
//! stored with `HH:MM` strings; they are resolved into minute windows when a
//! day is evaluated, and a block that does not parse or whose end is not
//! after its start is dropped with a warning instead of failing the caller.

pub mod ledger;

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::TaskCategory;

pub use ledger::ScheduledTask;

/// Minutes in a day; a block may end at `24:00`.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Kind of time block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Work,
    Personal,
    Break,
}

impl BlockType {
    /// Whether a task of `category` belongs in this block.
    ///
    /// Professional tasks go to work blocks, personal tasks to personal
    /// blocks, uncategorized tasks to either. Nothing belongs in a break.
    pub fn accepts(self, category: Option<TaskCategory>) -> bool {
        match (self, category) {
            (BlockType::Break, _) => false,
            (BlockType::Work, Some(TaskCategory::Professional)) => true,
            (BlockType::Personal, Some(TaskCategory::Personal)) => true,
            (_, None) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Work => "work",
            BlockType::Personal => "personal",
            BlockType::Break => "break",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(BlockType::Work),
            "personal" => Ok(BlockType::Personal),
            "break" => Ok(BlockType::Break),
            other => Err(format!("unknown block type: {other}")),
        }
    }
}

/// A labeled interval of a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBlock {
    pub id: String,
    /// Start time, `HH:MM`
    pub start: String,
    /// End time, `HH:MM` (`24:00` allowed)
    pub end: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub label: Option<String>,
}

impl TimeBlock {
    pub fn new(
        id: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        block_type: BlockType,
    ) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            end: end.into(),
            block_type,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Resolve to a minute window, or `None` if the stored times are invalid.
    pub fn window(&self) -> Option<BlockWindow> {
        let start = parse_hhmm(&self.start)?;
        let end = parse_hhmm(&self.end)?;
        if end <= start {
            return None;
        }
        Some(BlockWindow {
            start,
            end,
            block_type: self.block_type,
        })
    }

    /// Reject blocks that would be dropped at resolution time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if parse_hhmm(&self.start).is_none() {
            return Err(ValidationError::InvalidValue {
                field: "start".into(),
                message: format!("'{}' is not an HH:MM time", self.start),
            });
        }
        if parse_hhmm(&self.end).is_none() {
            return Err(ValidationError::InvalidValue {
                field: "end".into(),
                message: format!("'{}' is not an HH:MM time", self.end),
            });
        }
        if self.window().is_none() {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start.clone(),
                end: self.end.clone(),
            });
        }
        Ok(())
    }
}

/// A time block repeated every week on one weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringTimeBlock {
    #[serde(flatten)]
    pub block: TimeBlock,
    /// 0 = Sunday ... 6 = Saturday
    pub day_of_week: u8,
}

impl RecurringTimeBlock {
    pub fn new(block: TimeBlock, day_of_week: u8) -> Self {
        Self { block, day_of_week }
    }

    pub fn applies_on(&self, date: NaiveDate) -> bool {
        u32::from(self.day_of_week) == date.weekday().num_days_from_sunday()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.day_of_week > 6 {
            return Err(ValidationError::InvalidValue {
                field: "day_of_week".into(),
                message: format!("{} is not in 0..=6", self.day_of_week),
            });
        }
        self.block.validate()
    }
}

/// One stored day: date-specific block overrides and the ledger of placed
/// tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySchedule {
    pub date: NaiveDate,
    #[serde(default)]
    pub time_blocks: Vec<TimeBlock>,
    #[serde(default)]
    pub scheduled_tasks: Vec<ScheduledTask>,
}

impl DaySchedule {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            time_blocks: Vec::new(),
            scheduled_tasks: Vec::new(),
        }
    }
}

/// A resolved block: minutes since midnight, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub start: u32,
    pub end: u32,
    pub block_type: BlockType,
}

impl BlockWindow {
    pub fn contains(&self, start: u32, end: u32) -> bool {
        self.start <= start && end <= self.end
    }

    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start < end && self.end > start
    }
}

/// Blocks of one day after resolution, ordered by start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBlocks {
    windows: Vec<BlockWindow>,
}

impl DayBlocks {
    pub fn new(mut windows: Vec<BlockWindow>) -> Self {
        windows.sort_by_key(|w| (w.start, w.end));
        Self { windows }
    }

    /// Union of the recurring blocks for `date` and the day's overrides.
    pub fn resolve(
        date: NaiveDate,
        recurring: &[RecurringTimeBlock],
        overrides: &[TimeBlock],
    ) -> Self {
        let blocks = recurring
            .iter()
            .filter(|r| r.applies_on(date))
            .map(|r| &r.block)
            .chain(overrides.iter());

        let windows = blocks
            .filter_map(|block| {
                let window = block.window();
                if window.is_none() {
                    tracing::warn!(
                        block_id = %block.id,
                        start = %block.start,
                        end = %block.end,
                        %date,
                        "Skipping invalid time block"
                    );
                }
                window
            })
            .collect();

        Self::new(windows)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> &[BlockWindow] {
        &self.windows
    }

    pub fn overlaps_break(&self, start: u32, end: u32) -> bool {
        self.windows
            .iter()
            .any(|w| w.block_type == BlockType::Break && w.overlaps(start, end))
    }

    /// First block of a type accepting `category` that fully contains the slot.
    pub fn containing(
        &self,
        start: u32,
        end: u32,
        category: Option<TaskCategory>,
    ) -> Option<&BlockWindow> {
        self.windows
            .iter()
            .find(|w| w.block_type.accepts(category) && w.contains(start, end))
    }

    /// Blocks whose type accepts `category`.
    pub fn accepting(&self, category: Option<TaskCategory>) -> impl Iterator<Item = &BlockWindow> {
        self.windows
            .iter()
            .filter(move |w| w.block_type.accepts(category))
    }
}

/// Parse `HH:MM` into minutes since midnight. `24:00` is accepted.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (hour, minute) = value.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if minute >= 60 {
        return None;
    }
    match hour {
        0..=23 => Some(hour * 60 + minute),
        24 if minute == 0 => Some(MINUTES_PER_DAY),
        _ => None,
    }
}

/// Format minutes since midnight as `HH:MM`.
pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        // 2026-03-02 is a Monday
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn parse_hhmm_accepts_valid_times() {
        assert_eq!(parse_hhmm("00:00"), Some(0));
        assert_eq!(parse_hhmm("09:30"), Some(570));
        assert_eq!(parse_hhmm("24:00"), Some(1440));
        assert_eq!(parse_hhmm("9:05"), Some(545));
    }

    #[test]
    fn parse_hhmm_rejects_garbage() {
        assert_eq!(parse_hhmm("25:00"), None);
        assert_eq!(parse_hhmm("24:30"), None);
        assert_eq!(parse_hhmm("10:60"), None);
        assert_eq!(parse_hhmm("noon"), None);
        assert_eq!(parse_hhmm(""), None);
    }

    #[test]
    fn block_type_acceptance() {
        use TaskCategory::*;
        assert!(BlockType::Work.accepts(Some(Professional)));
        assert!(!BlockType::Work.accepts(Some(Personal)));
        assert!(BlockType::Personal.accepts(Some(Personal)));
        assert!(BlockType::Personal.accepts(None));
        assert!(BlockType::Work.accepts(None));
        assert!(!BlockType::Break.accepts(None));
    }

    #[test]
    fn recurring_blocks_match_weekday() {
        let block = TimeBlock::new("w", "09:00", "12:00", BlockType::Work);
        assert!(RecurringTimeBlock::new(block.clone(), 1).applies_on(monday()));
        assert!(!RecurringTimeBlock::new(block, 0).applies_on(monday()));
    }

    #[test]
    fn resolve_unions_recurring_and_overrides() {
        let recurring = vec![
            RecurringTimeBlock::new(TimeBlock::new("w", "09:00", "12:00", BlockType::Work), 1),
            RecurringTimeBlock::new(TimeBlock::new("sun", "10:00", "11:00", BlockType::Personal), 0),
        ];
        let overrides = vec![TimeBlock::new("b", "12:00", "13:00", BlockType::Break)];

        let day = DayBlocks::resolve(monday(), &recurring, &overrides);
        assert_eq!(
            day.windows(),
            &[
                BlockWindow { start: 540, end: 720, block_type: BlockType::Work },
                BlockWindow { start: 720, end: 780, block_type: BlockType::Break },
            ]
        );
    }

    #[test]
    fn resolve_drops_invalid_blocks() {
        let overrides = vec![
            TimeBlock::new("inverted", "12:00", "09:00", BlockType::Work),
            TimeBlock::new("empty", "09:00", "09:00", BlockType::Work),
            TimeBlock::new("garbage", "nine", "ten", BlockType::Work),
            TimeBlock::new("ok", "14:00", "15:00", BlockType::Personal),
        ];
        let day = DayBlocks::resolve(monday(), &[], &overrides);
        assert_eq!(day.windows().len(), 1);
        assert_eq!(day.windows()[0].block_type, BlockType::Personal);
    }

    #[test]
    fn containment_and_break_overlap() {
        let day = DayBlocks::new(vec![
            BlockWindow { start: 540, end: 720, block_type: BlockType::Work },
            BlockWindow { start: 720, end: 780, block_type: BlockType::Break },
        ]);
        assert!(day.containing(540, 570, Some(TaskCategory::Professional)).is_some());
        assert!(day.containing(700, 730, Some(TaskCategory::Professional)).is_none());
        assert!(day.containing(540, 570, Some(TaskCategory::Personal)).is_none());
        assert!(day.overlaps_break(700, 730));
        assert!(!day.overlaps_break(690, 720));
    }

    #[test]
    fn validate_reports_reason() {
        let inverted = TimeBlock::new("x", "12:00", "09:00", BlockType::Work);
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
        let bad_day = RecurringTimeBlock::new(TimeBlock::new("x", "09:00", "10:00", BlockType::Work), 7);
        assert!(bad_day.validate().is_err());
    }

    #[test]
    fn recurring_block_serializes_flat() {
        let block = RecurringTimeBlock::new(
            TimeBlock::new("w", "09:00", "12:00", BlockType::Work).with_label("Deep work"),
            1,
        );
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "work");
        assert_eq!(json["day_of_week"], 1);
        assert_eq!(json["label"], "Deep work");
    }
}
