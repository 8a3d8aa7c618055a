//! Task sources.
//!
//! A [`TaskSource`] is the external task tracker the backlog comes from.
//! The engine only reads tasks and writes back placements; closing and
//! deleting are exposed for the CLI.

pub mod memory;
pub mod todoist;

pub use memory::InMemoryTaskSource;
pub use todoist::TodoistTaskSource;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::task::{Task, TaskFilter, TaskUpdate};

/// Every task tracker implements this trait.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Unique identifier (e.g. "todoist").
    fn name(&self) -> &str;

    /// Tasks matching the source-side part of `filter`. Callers still apply
    /// [`TaskFilter::matches`] locally.
    async fn fetch(&self, filter: &TaskFilter) -> Result<Vec<Task>, SourceError>;

    /// Apply a partial update and return the task as stored upstream.
    async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, SourceError>;

    async fn close(&self, id: &str) -> Result<(), SourceError>;

    async fn delete(&self, id: &str) -> Result<(), SourceError>;
}
