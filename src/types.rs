//! Core types for the task board.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// Category assigned to tasks created without one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ApiError::invalid_value(
                "priority",
                &format!("`{}` is not a valid priority (expected low, medium or high)", other),
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "task")]
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Incomplete with a due date strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Apply a completion change and keep `completed_at` consistent with `completed`.
///
/// `completed_at` is the caller-supplied timestamp, if any. Marking complete
/// without one stamps `now`; marking incomplete always clears it. When
/// `completed` is not being changed the existing state is only normalised.
pub fn apply_completion(
    task: &mut Task,
    completed: Option<bool>,
    completed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) {
    match completed {
        Some(true) => {
            task.completed = true;
            task.completed_at = Some(completed_at.unwrap_or(now));
        }
        Some(false) => {
            task.completed = false;
            task.completed_at = None;
        }
        None => {
            if task.completed {
                if let Some(at) = completed_at {
                    task.completed_at = Some(at);
                }
                if task.completed_at.is_none() {
                    task.completed_at = Some(now);
                }
            } else {
                task.completed_at = None;
            }
        }
    }
}

/// Deserialize a field that distinguishes "absent" from an explicit `null`.
///
/// Use with `#[serde(default)]`: absent becomes `None`, `null` becomes `Some(None)`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parse a due date given as RFC 3339 or as a plain `YYYY-MM-DD` date.
///
/// Returns `Ok(None)` for an empty string.
pub fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    parse_timestamp("dueDate", raw)
}

fn parse_timestamp(field: &str, raw: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(midnight.and_utc()));
        }
    }
    Err(ApiError::invalid_value(field, &format!("`{}` is not a valid date", raw)))
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::missing_field("text"));
    }
    Ok(())
}

fn category_or_default(category: Option<String>) -> String {
    match category {
        Some(c) if !c.trim().is_empty() => c,
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

/// Request body for creating a task.
///
/// Enumerated and date fields are kept as raw strings so that bad values are
/// reported as validation errors with the offending field named.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default, alias = "task")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority.as_str().to_string());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Validate and build the record to store, applying defaults.
    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Result<Task, ApiError> {
        let text = self.text.ok_or_else(|| ApiError::missing_field("text"))?;
        validate_text(&text)?;

        let priority = match self.priority {
            Some(p) => p.parse()?,
            None => Priority::default(),
        };
        let due_date = match self.due_date {
            Some(raw) => parse_due_date(&raw)?,
            None => None,
        };
        let completed_at = match self.completed_at {
            Some(raw) => parse_timestamp("completedAt", &raw)?,
            None => None,
        };

        let mut task = Task {
            id,
            text,
            completed: false,
            priority,
            due_date,
            category: category_or_default(self.category),
            created_at: now,
            completed_at: None,
        };
        apply_completion(
            &mut task,
            Some(self.completed.unwrap_or(false)),
            completed_at,
            now,
        );
        Ok(task)
    }
}

/// Partial update body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, alias = "task", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<Option<String>>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Merge this patch into `task`, validating every supplied field.
    ///
    /// On error `task` is left untouched.
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) -> Result<(), ApiError> {
        let mut updated = task.clone();

        if let Some(ref text) = self.text {
            validate_text(text)?;
            updated.text = text.clone();
        }
        if let Some(ref priority) = self.priority {
            updated.priority = priority.parse()?;
        }
        if let Some(ref due) = self.due_date {
            updated.due_date = match due {
                Some(raw) => parse_due_date(raw)?,
                None => None,
            };
        }
        if let Some(ref category) = self.category {
            updated.category = category_or_default(Some(category.clone()));
        }

        let completed_at = match self.completed_at {
            Some(Some(ref raw)) => parse_timestamp("completedAt", raw)?,
            _ => None,
        };
        apply_completion(&mut updated, self.completed, completed_at, now);

        *task = updated;
        Ok(())
    }
}

/// Field a task list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    Text,
    Completed,
    Priority,
    DueDate,
    Category,
    #[default]
    CreatedAt,
    CompletedAt,
}

impl SortField {
    /// Parse a `sortBy` value. Unknown names fall back to `createdAt`.
    pub fn parse(s: &str) -> Self {
        match s {
            "id" | "_id" => SortField::Id,
            "text" | "task" => SortField::Text,
            "completed" => SortField::Completed,
            "priority" => SortField::Priority,
            "dueDate" => SortField::DueDate,
            "category" => SortField::Category,
            "completedAt" => SortField::CompletedAt,
            _ => SortField::CreatedAt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Text => "text",
            SortField::Completed => "completed",
            SortField::Priority => "priority",
            SortField::DueDate => "dueDate",
            SortField::Category => "category",
            SortField::CreatedAt => "createdAt",
            SortField::CompletedAt => "completedAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` is ascending; anything else is descending.
    pub fn parse(s: &str) -> Self {
        if s == "asc" {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filter and sort parameters for listing tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

/// Raw `GET /api/tasks` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl From<ListParams> for TaskFilter {
    fn from(params: ListParams) -> Self {
        TaskFilter {
            completed: params.completed.map(|c| c == "true"),
            priority: non_empty(params.priority),
            category: non_empty(params.category),
            search: non_empty(params.search),
            sort_by: params
                .sort_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or_default(),
            sort_order: params
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
        }
    }
}

impl TaskFilter {
    /// Encode as query-string pairs, omitting unset values.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(completed) = self.completed {
            pairs.push(("completed", completed.to_string()));
        }
        if let Some(ref priority) = self.priority {
            pairs.push(("priority", priority.clone()));
        }
        if let Some(ref category) = self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search", search.clone()));
        }
        if self.sort_by != SortField::default() {
            pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        }
        if self.sort_order != SortOrder::default() {
            pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        }
        pairs
    }
}

/// Incomplete task counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(rename = "_id")]
    pub category: String,
    pub count: i64,
}

/// Aggregate statistics over all tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub by_priority: PriorityCounts,
    pub by_category: Vec<CategoryCount>,
    pub overdue: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn sample() -> Task {
        NewTask::new("Buy milk").into_task("t1".into(), now()).unwrap()
    }

    #[test]
    fn new_task_applies_defaults() {
        let task = sample();
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert_eq!(task.due_date, None);
        assert_eq!(task.created_at, now());
    }

    #[test]
    fn new_task_rejects_blank_text() {
        let err = NewTask::new("   ").into_task("t".into(), now()).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("text"));

        let err = NewTask::default().into_task("t".into(), now()).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("text"));
    }

    #[test]
    fn new_task_rejects_unknown_priority() {
        let mut input = NewTask::new("x");
        input.priority = Some("urgent".into());
        let err = input.into_task("t".into(), now()).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("priority"));
    }

    #[test]
    fn new_task_completed_is_stamped() {
        let mut input = NewTask::new("done already");
        input.completed = Some(true);
        let task = input.into_task("t".into(), now()).unwrap();
        assert_eq!(task.completed_at, Some(now()));
    }

    #[test]
    fn new_task_incomplete_ignores_completed_at() {
        let mut input = NewTask::new("x");
        input.completed_at = Some("2024-01-01T00:00:00Z".into());
        let task = input.into_task("t".into(), now()).unwrap();
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn due_date_formats() {
        let plain = parse_due_date("2024-06-30").unwrap().unwrap();
        assert_eq!(plain, Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap());

        let rfc = parse_due_date("2024-06-30T10:00:00+02:00").unwrap().unwrap();
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 6, 30, 8, 0, 0).unwrap());

        assert_eq!(parse_due_date("").unwrap(), None);
        assert!(parse_due_date("next tuesday").is_err());
    }

    #[test]
    fn patch_completion_round_trip() {
        let mut task = sample();
        TaskPatch::completed(true).apply_to(&mut task, now()).unwrap();
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now()));

        let later = now() + Duration::hours(1);
        let mut patch = TaskPatch::completed(false);
        patch.completed_at = Some(Some("2024-05-01T13:00:00Z".into()));
        patch.apply_to(&mut task, later).unwrap();
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn patch_keeps_explicit_completed_at() {
        let mut task = sample();
        let mut patch = TaskPatch::completed(true);
        patch.completed_at = Some(Some("2024-04-01T00:00:00Z".into()));
        patch.apply_to(&mut task, now()).unwrap();
        assert_eq!(
            task.completed_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn patch_cannot_set_completed_at_on_pending_task() {
        let mut task = sample();
        let patch = TaskPatch {
            completed_at: Some(Some("2024-04-01T00:00:00Z".into())),
            ..Default::default()
        };
        patch.apply_to(&mut task, now()).unwrap();
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn patch_failure_leaves_task_unchanged() {
        let mut task = sample();
        let patch = TaskPatch {
            text: Some("renamed".into()),
            priority: Some("critical".into()),
            ..Default::default()
        };
        assert!(patch.apply_to(&mut task, now()).is_err());
        assert_eq!(task.text, "Buy milk");
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: TaskPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(patch.due_date, Some(None));

        let patch: TaskPatch = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert_eq!(patch.due_date, None);
        assert_eq!(patch.completed_at, None);
    }

    #[test]
    fn legacy_task_field_is_accepted() {
        let input: NewTask = serde_json::from_str(r#"{"task": "walk dog"}"#).unwrap();
        assert_eq!(input.text.as_deref(), Some("walk dog"));
    }

    #[test]
    fn list_params_into_filter() {
        let params = ListParams {
            completed: Some("yes".into()),
            priority: Some(String::new()),
            search: Some("milk".into()),
            sort_by: Some("bogus".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        };
        let filter = TaskFilter::from(params);
        assert_eq!(filter.completed, Some(false));
        assert_eq!(filter.priority, None);
        assert_eq!(filter.search.as_deref(), Some("milk"));
        assert_eq!(filter.sort_by, SortField::CreatedAt);
        assert_eq!(filter.sort_order, SortOrder::Asc);
    }

    #[test]
    fn overdue_requires_incomplete_past_due() {
        let mut task = sample();
        assert!(!task.is_overdue(now()));
        task.due_date = Some(now() - Duration::days(1));
        assert!(task.is_overdue(now()));
        task.due_date = Some(now());
        assert!(!task.is_overdue(now()));
        task.due_date = Some(now() - Duration::days(1));
        task.completed = true;
        assert!(!task.is_overdue(now()));
    }

    #[test]
    fn stats_serializes_wire_shape() {
        let stats = Stats {
            total: 1,
            completed: 0,
            pending: 1,
            by_priority: PriorityCounts { high: 1, medium: 0, low: 0 },
            by_category: vec![CategoryCount { category: "shopping".into(), count: 1 }],
            overdue: 0,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byPriority"]["high"], 1);
        assert_eq!(json["byCategory"][0]["_id"], "shopping");
    }
}
