//! In-memory task source for tests and offline use.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TaskSource;
use crate::error::SourceError;
use crate::task::{Due, Task, TaskFilter, TaskUpdate};

#[derive(Debug, Default)]
pub struct InMemoryTaskSource {
    tasks: RwLock<Vec<Task>>,
    /// Ids whose updates are rejected
    failing: RwLock<HashSet<String>>,
    updates: RwLock<Vec<(String, TaskUpdate)>>,
}

impl InMemoryTaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            ..Self::default()
        }
    }

    pub async fn insert(&self, task: Task) {
        let mut tasks = self.tasks.write().await;
        tasks.retain(|t| t.id != task.id);
        tasks.push(task);
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Make every later update of `id` fail.
    pub async fn fail_updates_for(&self, id: impl Into<String>) {
        self.failing.write().await.insert(id.into());
    }

    /// Updates applied so far, in order.
    pub async fn updates(&self) -> Vec<(String, TaskUpdate)> {
        self.updates.read().await.clone()
    }
}

#[async_trait]
impl TaskSource for InMemoryTaskSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, filter: &TaskFilter) -> Result<Vec<Task>, SourceError> {
        let tasks = self.tasks.read().await;
        let query = filter.query.as_deref().map(str::to_lowercase);
        Ok(tasks
            .iter()
            .filter(|t| !t.completed)
            .filter(|t| match &query {
                Some(q) => t.content.to_lowercase().contains(q.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, SourceError> {
        if self.failing.read().await.contains(id) {
            return Err(SourceError::Rejected(format!("update of '{id}' rejected")));
        }

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;

        if let Some(dt) = update.due_datetime {
            task.due = Some(Due::DateTime(dt));
        } else if let Some(date) = update.due_date {
            task.due = Some(Due::Date(date));
        }
        if let Some(minutes) = update.duration {
            task.duration_minutes = Some(minutes);
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(labels) = &update.labels {
            task.labels = labels.clone();
        }
        if let Some(description) = &update.description {
            task.description = Some(description.clone());
        }
        let updated = task.clone();
        drop(tasks);

        self.updates
            .write()
            .await
            .push((id.to_string(), update.clone()));
        Ok(updated)
    }

    async fn close(&self, id: &str) -> Result<(), SourceError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| SourceError::NotFound(id.to_string()))?;
        task.completed = true;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SourceError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(SourceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
