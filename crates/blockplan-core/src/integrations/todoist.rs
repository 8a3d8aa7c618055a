//! Todoist integration over the REST v2 API.
//!
//! Todoist numbers priorities backwards (4 is the most urgent, shown as
//! "P1" in its UI); the translation to [`Priority`] happens here and nowhere
//! else. Categories come from labels, meetings from a configured label or a
//! `"* "` content prefix (Todoist's uncompletable marker).

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use super::TaskSource;
use crate::error::SourceError;
use crate::storage::TodoistConfig;
use crate::task::{Due, DurationUnit, Priority, Task, TaskCategory, TaskFilter, TaskUpdate};

const SERVICE: &str = "todoist";
const MEETING_PREFIX: &str = "* ";

/// Task source backed by a Todoist account.
pub struct TodoistTaskSource {
    client: Client,
    base_url: String,
    token: String,
    meeting_label: String,
    starred_label: String,
}

#[derive(Debug, Deserialize)]
struct ApiTask {
    id: String,
    content: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default = "lowest_api_priority")]
    priority: u8,
    #[serde(default)]
    due: Option<ApiDue>,
    #[serde(default)]
    deadline: Option<ApiDeadline>,
    #[serde(default)]
    duration: Option<ApiDuration>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiDue {
    date: NaiveDate,
    #[serde(default)]
    datetime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiDeadline {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ApiDuration {
    amount: u32,
    unit: DurationUnit,
}

#[derive(Debug, Default, Serialize)]
struct ApiUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_unit: Option<DurationUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

fn lowest_api_priority() -> u8 {
    1
}

/// Todoist priority (1 lowest .. 4 highest) to [`Priority`].
fn priority_from_api(value: u8) -> Priority {
    Priority::from_rank(5u8.saturating_sub(value.clamp(1, 4)))
}

fn priority_to_api(priority: Priority) -> u8 {
    5 - priority.rank()
}

/// Todoist sends floating times without an offset and fixed-zone times in
/// UTC. Both become local wall-clock time.
fn parse_due_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(floating) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(floating);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Local wall-clock time as an RFC 3339 UTC timestamp.
fn format_due_datetime(value: NaiveDateTime) -> String {
    match Local.from_local_datetime(&value).earliest() {
        Some(local) => local
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string(),
        None => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

impl TodoistTaskSource {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            meeting_label: "meeting".into(),
            starred_label: "starred".into(),
        }
    }

    /// Build from the `[todoist]` config section.
    ///
    /// # Errors
    /// Returns [`SourceError::NotAuthenticated`] when no token is configured.
    pub fn from_config(config: &TodoistConfig) -> Result<Self, SourceError> {
        let token = config
            .api_token()
            .ok_or_else(|| SourceError::NotAuthenticated {
                service: SERVICE.into(),
            })?;
        Ok(Self::new(token, config.base_url.clone())
            .with_labels(config.meeting_label.clone(), config.starred_label.clone()))
    }

    pub fn with_labels(mut self, meeting_label: String, starred_label: String) -> Self {
        self.meeting_label = meeting_label;
        self.starred_label = starred_label;
        self
    }

    fn tasks_url(&self) -> String {
        format!("{}/rest/v2/tasks", self.base_url)
    }

    fn has_label(labels: &[String], wanted: &str) -> bool {
        labels.iter().any(|l| l.eq_ignore_ascii_case(wanted))
    }

    fn to_task(&self, api: ApiTask) -> Task {
        let category = api.labels.iter().find_map(|l| TaskCategory::from_label(l));
        let meeting = Self::has_label(&api.labels, &self.meeting_label)
            || api.content.starts_with(MEETING_PREFIX);
        let starred = Self::has_label(&api.labels, &self.starred_label);

        let due = api.due.map(|due| {
            match due.datetime.as_deref().and_then(parse_due_datetime) {
                Some(dt) => Due::DateTime(dt),
                None => Due::Date(due.date),
            }
        });
        // Day-long durations are left to the planner's default.
        let duration_minutes = api.duration.and_then(|d| match d.unit {
            DurationUnit::Minute => Some(d.amount),
            DurationUnit::Day => None,
        });

        Task {
            id: api.id,
            content: api.content,
            description: Some(api.description).filter(|d| !d.is_empty()),
            priority: priority_from_api(api.priority),
            category,
            labels: api.labels,
            deadline: api.deadline.map(|d| d.date),
            due,
            duration_minutes,
            completed: api.is_completed,
            starred,
            meeting,
            created_at: api.created_at.unwrap_or_default(),
        }
    }

    async fn check(response: Response, id: Option<&str>) -> Result<Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(SourceError::NotFound(id.to_string()));
            }
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SourceError::NotAuthenticated {
                service: SERVICE.into(),
            });
        }
        let message = response.text().await.unwrap_or_default();
        Err(SourceError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, SourceError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TaskSource for TodoistTaskSource {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn fetch(&self, filter: &TaskFilter) -> Result<Vec<Task>, SourceError> {
        let mut request = self.client.get(self.tasks_url()).bearer_auth(&self.token);
        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            request = request.query(&[("filter", query)]);
        }

        let response = Self::check(request.send().await?, None).await?;
        let tasks: Vec<ApiTask> = Self::decode(response).await?;
        tracing::debug!(count = tasks.len(), "Fetched Todoist tasks");
        Ok(tasks.into_iter().map(|t| self.to_task(t)).collect())
    }

    async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, SourceError> {
        let body = ApiUpdate {
            due_date: update.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            due_datetime: update.due_datetime.map(format_due_datetime),
            duration: update.duration,
            duration_unit: update.duration_unit,
            priority: update.priority.map(priority_to_api),
            labels: update.labels.clone(),
            description: update.description.clone(),
        };

        let response = self
            .client
            .post(format!("{}/{id}", self.tasks_url()))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, Some(id)).await?;
        let task: ApiTask = Self::decode(response).await?;
        Ok(self.to_task(task))
    }

    async fn close(&self, id: &str) -> Result<(), SourceError> {
        let response = self
            .client
            .post(format!("{}/{id}/close", self.tasks_url()))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response, Some(id)).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SourceError> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.tasks_url()))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response, Some(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const TASKS: &str = r#"[
        {
            "id": "101",
            "content": "Quarterly report",
            "description": "",
            "is_completed": false,
            "labels": ["Work", "starred"],
            "priority": 4,
            "due": {"date": "2026-03-03", "datetime": "2026-03-03T14:00:00", "string": "tomorrow 2pm", "is_recurring": false},
            "deadline": {"date": "2026-03-05"},
            "duration": {"amount": 90, "unit": "minute"},
            "created_at": "2026-02-20T08:00:00.000000Z"
        },
        {
            "id": "102",
            "content": "* Team sync",
            "labels": [],
            "priority": 2,
            "due": {"date": "2026-03-02", "string": "today", "is_recurring": true},
            "duration": {"amount": 1, "unit": "day"}
        },
        {
            "id": "103",
            "content": "Dentist",
            "labels": ["personal", "meeting"],
            "priority": 1
        }
    ]"#;

    #[test]
    fn priority_mapping_is_inverted() {
        assert_eq!(priority_from_api(4), Priority::P1);
        assert_eq!(priority_from_api(1), Priority::P4);
        assert_eq!(priority_from_api(0), Priority::P4);
        for p in Priority::all() {
            assert_eq!(priority_from_api(priority_to_api(p)), p);
        }
    }

    #[tokio::test]
    async fn fetch_maps_tasks() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v2/tasks")
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::UrlEncoded("filter".into(), "today | overdue".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TASKS)
            .create_async()
            .await;

        let source = TodoistTaskSource::new("tok", server.url());
        let tasks = source
            .fetch(&TaskFilter::query("today | overdue"))
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(tasks.len(), 3);
        let report = &tasks[0];
        assert_eq!(report.priority, Priority::P1);
        assert_eq!(report.category, Some(TaskCategory::Professional));
        assert!(report.starred);
        assert!(!report.meeting);
        assert_eq!(report.duration_minutes, Some(90));
        assert_eq!(report.deadline, NaiveDate::from_ymd_opt(2026, 3, 5));
        assert_eq!(
            report.due,
            Some(Due::DateTime(
                NaiveDate::from_ymd_opt(2026, 3, 3)
                    .unwrap()
                    .and_hms_opt(14, 0, 0)
                    .unwrap()
            ))
        );

        let sync = &tasks[1];
        assert!(sync.meeting);
        assert_eq!(sync.priority, Priority::P3);
        assert_eq!(sync.duration_minutes, None);
        assert_eq!(sync.due, Some(Due::Date(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())));

        let dentist = &tasks[2];
        assert!(dentist.meeting);
        assert_eq!(dentist.category, Some(TaskCategory::Personal));
        assert_eq!(dentist.priority, Priority::P4);
    }

    #[tokio::test]
    async fn update_sends_placement() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v2/tasks/101")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "duration": 45,
                "duration_unit": "minute"
            })))
            .with_status(200)
            .with_body(r#"{"id": "101", "content": "Quarterly report", "priority": 3}"#)
            .create_async()
            .await;

        let source = TodoistTaskSource::new("tok", server.url());
        let start = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let task = source
            .update("101", &TaskUpdate::placement(start, 45))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(task.priority, Priority::P2);
    }

    #[tokio::test]
    async fn errors_are_classified() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("POST", "/rest/v2/tasks/404/close")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("DELETE", "/rest/v2/tasks/500")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let _garbage = server
            .mock("GET", "/rest/v2/tasks")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let source = TodoistTaskSource::new("tok", server.url());
        assert!(matches!(source.close("404").await, Err(SourceError::NotFound(_))));
        assert!(matches!(
            source.delete("500").await,
            Err(SourceError::Http { status: 500, .. })
        ));
        assert!(matches!(
            source.fetch(&TaskFilter::default()).await,
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn missing_token_is_not_authenticated() {
        let config = TodoistConfig {
            api_token: None,
            ..TodoistConfig::default()
        };
        if std::env::var(crate::storage::TODOIST_TOKEN_ENV).is_err() {
            assert!(matches!(
                TodoistTaskSource::from_config(&config),
                Err(SourceError::NotAuthenticated { .. })
            ));
        }
    }

    #[test]
    fn floating_and_utc_datetimes_parse() {
        assert_eq!(
            parse_due_datetime("2026-03-03T14:00:00"),
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap().and_hms_opt(14, 0, 0)
        );
        assert!(parse_due_datetime("2026-03-03T14:00:00Z").is_some());
        assert!(parse_due_datetime("tomorrow").is_none());
    }
}
