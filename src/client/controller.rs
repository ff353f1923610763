//! View-state controller for a task list UI.
//!
//! Holds everything a renderer needs (tasks, filters, draft input, inline
//! edit, stats, loading and error flags) and applies optimistic updates
//! against a [`TaskApi`], rolling back when the server rejects a change.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::debounce::Debouncer;
use super::service::{TaskApi, TaskService};
use crate::config::ClientConfig;
use crate::types::{DEFAULT_CATEGORY, NewTask, Priority, Stats, Task, TaskFilter, TaskPatch};

pub const LOAD_FAILED: &str = "Failed to load tasks";
pub const ADD_FAILED: &str = "Failed to add task";
pub const UPDATE_FAILED: &str = "Failed to update task";
pub const DELETE_FAILED: &str = "Failed to delete task";

/// Quiet interval before a search change reloads the list.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Completion filter as offered in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn as_completed(&self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Completed => Some(true),
            StatusFilter::Pending => Some(false),
        }
    }
}

/// New-task input fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: Priority,
    pub category: String,
    /// Raw due date input; empty means none.
    pub due_date: String,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            text: String::new(),
            priority: Priority::default(),
            category: DEFAULT_CATEGORY.to_string(),
            due_date: String::new(),
        }
    }
}

impl TaskDraft {
    fn to_new_task(&self) -> NewTask {
        let mut input = NewTask::new(self.text.clone())
            .with_priority(self.priority)
            .with_category(self.category.clone());
        if !self.due_date.trim().is_empty() {
            input = input.with_due_date(self.due_date.clone());
        }
        input
    }
}

/// Task currently being edited inline and its pending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineEdit {
    pub task_id: String,
    pub text: String,
}

/// Snapshot of everything the UI renders.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub tasks: Vec<Task>,
    pub filter: TaskFilter,
    pub draft: TaskDraft,
    pub editing: Option<InlineEdit>,
    pub stats: Option<Stats>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ViewState {
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

/// Cloneable handle; clones share the same state and API.
pub struct TaskController<A: TaskApi + 'static> {
    api: Arc<A>,
    state: Arc<Mutex<ViewState>>,
    search: Arc<Debouncer>,
}

impl<A: TaskApi + 'static> Clone for TaskController<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
            search: Arc::clone(&self.search),
        }
    }
}

impl TaskController<TaskService> {
    /// Controller talking to the configured API URL with the configured debounce.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_debounce(
            TaskService::new(config.api_url.clone()),
            config.search_debounce(),
        )
    }
}

impl<A: TaskApi + 'static> TaskController<A> {
    pub fn new(api: A) -> Self {
        Self::with_debounce(api, DEFAULT_SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(api: A, search_debounce: Duration) -> Self {
        Self {
            api: Arc::new(api),
            state: Arc::new(Mutex::new(ViewState::default())),
            search: Arc::new(Debouncer::new(search_debounce)),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current view state.
    pub fn state(&self) -> ViewState {
        self.with_state(|s| s.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ViewState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Initial load of the task list followed by statistics.
    pub async fn activate(&self) {
        self.load_tasks().await;
        self.load_stats().await;
    }

    /// Reload the task list with the current filter.
    pub async fn load_tasks(&self) {
        let filter = self.with_state(|s| {
            s.loading = true;
            s.error = None;
            s.filter.clone()
        });

        let result = self.api.list_tasks(&filter).await;
        self.with_state(|s| {
            s.loading = false;
            match result {
                Ok(tasks) => s.tasks = tasks,
                Err(e) => {
                    warn!(error = %e, "Loading tasks failed");
                    s.error = Some(LOAD_FAILED.to_string());
                }
            }
        });
    }

    /// Reload statistics. Failure keeps the previous stats and is only logged.
    pub async fn load_stats(&self) {
        match self.api.stats().await {
            Ok(stats) => self.with_state(|s| s.stats = Some(stats)),
            Err(e) => warn!(error = %e, "Loading stats failed"),
        }
    }

    /// Refresh the list and the stats concurrently after a mutation.
    async fn refresh(&self) {
        tokio::join!(self.load_tasks(), self.load_stats());
    }

    pub fn set_draft_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.with_state(|s| s.draft.text = text);
    }

    pub fn set_draft_priority(&self, priority: Priority) {
        self.with_state(|s| s.draft.priority = priority);
    }

    pub fn set_draft_category(&self, category: impl Into<String>) {
        let category = category.into();
        self.with_state(|s| s.draft.category = category);
    }

    pub fn set_draft_due_date(&self, due_date: impl Into<String>) {
        let due_date = due_date.into();
        self.with_state(|s| s.draft.due_date = due_date);
    }

    /// Create a task from the draft. Blank text is ignored.
    ///
    /// The list only changes once the server returns the created record.
    pub async fn submit(&self) {
        let draft = self.with_state(|s| s.draft.clone());
        if draft.text.trim().is_empty() {
            return;
        }

        match self.api.create_task(&draft.to_new_task()).await {
            Ok(task) => {
                debug!(task_id = %task.id, "Task added");
                self.with_state(|s| {
                    s.tasks.push(task);
                    s.draft = TaskDraft::default();
                    s.error = None;
                });
                self.refresh().await;
            }
            Err(e) => {
                warn!(error = %e, "Adding task failed");
                self.with_state(|s| s.error = Some(ADD_FAILED.to_string()));
            }
        }
    }

    /// Apply `patch` locally, then send it; restore the previous list on failure.
    pub async fn update(&self, task_id: &str, patch: TaskPatch) {
        let snapshot = self.with_state(|s| {
            let snapshot = s.tasks.clone();
            if let Some(task) = s.tasks.iter_mut().find(|t| t.id == task_id) {
                if let Err(e) = patch.apply_to(task, Utc::now()) {
                    debug!(task_id = %task_id, error = %e, "Skipping optimistic update");
                }
            }
            snapshot
        });

        match self.api.update_task(task_id, &patch).await {
            Ok(updated) => {
                self.with_state(|s| {
                    if let Some(task) = s.tasks.iter_mut().find(|t| t.id == updated.id) {
                        *task = updated;
                    }
                    s.error = None;
                });
                self.refresh().await;
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Updating task failed, rolling back");
                self.with_state(|s| {
                    s.tasks = snapshot;
                    s.error = Some(UPDATE_FAILED.to_string());
                });
            }
        }
    }

    pub async fn toggle_complete(&self, task_id: &str) {
        let current = self.with_state(|s| s.task(task_id).map(|t| t.completed));
        match current {
            Some(completed) => self.update(task_id, TaskPatch::completed(!completed)).await,
            None => debug!(task_id = %task_id, "Toggle for unknown task ignored"),
        }
    }

    /// Enter inline edit mode with the task's current text.
    pub fn start_edit(&self, task_id: &str) {
        self.with_state(|s| {
            if let Some(text) = s.task(task_id).map(|t| t.text.clone()) {
                s.editing = Some(InlineEdit {
                    task_id: task_id.to_string(),
                    text,
                });
            }
        });
    }

    pub fn set_edit_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.with_state(|s| {
            if let Some(ref mut edit) = s.editing {
                edit.text = text;
            }
        });
    }

    pub fn cancel_edit(&self) {
        self.with_state(|s| s.editing = None);
    }

    /// Save the pending edit. Blank text cancels without changing anything.
    pub async fn save_edit(&self) {
        let Some(edit) = self.with_state(|s| s.editing.clone()) else {
            return;
        };
        if edit.text.trim().is_empty() {
            self.cancel_edit();
            return;
        }
        self.update(&edit.task_id, TaskPatch::text(edit.text)).await;
        self.cancel_edit();
    }

    /// Remove locally, then delete on the server; restore on failure.
    pub async fn delete(&self, task_id: &str) {
        let snapshot = self.with_state(|s| {
            let snapshot = s.tasks.clone();
            s.tasks.retain(|t| t.id != task_id);
            snapshot
        });

        match self.api.delete_task(task_id).await {
            Ok(_) => {
                self.with_state(|s| s.error = None);
                self.refresh().await;
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Deleting task failed, rolling back");
                self.with_state(|s| {
                    s.tasks = snapshot;
                    s.error = Some(DELETE_FAILED.to_string());
                });
            }
        }
    }

    pub async fn set_status_filter(&self, status: StatusFilter) {
        self.with_state(|s| s.filter.completed = status.as_completed());
        self.load_tasks().await;
    }

    pub async fn set_priority_filter(&self, priority: Option<Priority>) {
        self.with_state(|s| s.filter.priority = priority.map(|p| p.as_str().to_string()));
        self.load_tasks().await;
    }

    pub async fn set_category_filter(&self, category: impl Into<String>) {
        let category = category.into();
        self.with_state(|s| s.filter.category = Some(category).filter(|c| !c.is_empty()));
        self.load_tasks().await;
    }

    /// Update the search text and reload once typing pauses.
    pub fn set_search(&self, search: impl Into<String>) {
        let search = search.into();
        self.with_state(|s| s.filter.search = Some(search).filter(|q| !q.is_empty()));

        let controller = self.clone();
        self.search.schedule(async move {
            controller.load_tasks().await;
        });
    }
}
