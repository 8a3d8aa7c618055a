//! In-memory calendar store for tests and dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::CalendarStore;
use crate::calendar::{DaySchedule, RecurringTimeBlock};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryCalendarStore {
    recurring: RwLock<Vec<RecurringTimeBlock>>,
    days: RwLock<BTreeMap<NaiveDate, DaySchedule>>,
}

impl InMemoryCalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored day, in date order.
    pub async fn days(&self) -> Vec<DaySchedule> {
        self.days.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl CalendarStore for InMemoryCalendarStore {
    async fn recurring_blocks(&self) -> Result<Vec<RecurringTimeBlock>, StoreError> {
        Ok(self.recurring.read().await.clone())
    }

    async fn save_recurring_blocks(&self, blocks: &[RecurringTimeBlock]) -> Result<(), StoreError> {
        *self.recurring.write().await = blocks.to_vec();
        Ok(())
    }

    async fn day(&self, date: NaiveDate) -> Result<DaySchedule, StoreError> {
        Ok(self
            .days
            .read()
            .await
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DaySchedule::empty(date)))
    }

    async fn save_day(&self, schedule: &DaySchedule) -> Result<(), StoreError> {
        self.days
            .write()
            .await
            .insert(schedule.date, schedule.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_day_is_empty() {
        let store = InMemoryCalendarStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(store.day(date).await.unwrap(), DaySchedule::empty(date));
        assert!(store.days().await.is_empty());
    }
}
