//! Task CRUD operations.

use super::query::build_query;
use super::{Database, from_ms, now, to_ms};
use crate::error::ApiError;
use crate::types::{NewTask, Task, TaskFilter, TaskPatch};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};
use uuid::Uuid;

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let priority: String = row.get("priority")?;
    let due_date: Option<i64> = row.get("due_date")?;
    let created_at: i64 = row.get("created_at")?;
    let completed_at: Option<i64> = row.get("completed_at")?;

    Ok(Task {
        id: row.get("id")?,
        text: row.get("text")?,
        completed: row.get("completed")?,
        priority: priority.parse().map_err(|e: ApiError| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        due_date: due_date.map(from_ms).transpose()?,
        category: row.get("category")?,
        created_at: from_ms(created_at)?,
        completed_at: completed_at.map(from_ms).transpose()?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE id = ?1",
            params![task_id],
            parse_task_row,
        )
        .optional()?;
    Ok(task)
}

impl Database {
    /// Validate and insert a new task. The id and creation time are assigned here.
    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        let task = input.into_task(Uuid::now_v7().to_string(), now())?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    id, text, completed, priority, due_date, category, created_at, completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &task.id,
                    &task.text,
                    task.completed,
                    task.priority.as_str(),
                    task.due_date.as_ref().map(to_ms),
                    &task.category,
                    to_ms(&task.created_at),
                    task.completed_at.as_ref().map(to_ms),
                ],
            )?;
            Ok(())
        })?;

        info!(task_id = %task.id, priority = %task.priority, category = %task.category, "Task created");
        Ok(task)
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List tasks matching the filter, in the filter's sort order.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let query = build_query(filter);
        let sql = query.select_sql();
        debug!(sql = %sql, "Listing tasks");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_from_iter(query.params.iter()), parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Merge a partial update into an existing task.
    ///
    /// Fails with a not-found error if the task does not exist and with a
    /// validation error if any supplied field is malformed; neither writes.
    pub fn update_task(&self, task_id: &str, patch: &TaskPatch) -> Result<Task> {
        let task = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;
            patch.apply_to(&mut task, now())?;

            tx.execute(
                "UPDATE tasks SET
                    text = ?2, completed = ?3, priority = ?4, due_date = ?5,
                    category = ?6, completed_at = ?7
                 WHERE id = ?1",
                params![
                    task_id,
                    &task.text,
                    task.completed,
                    task.priority.as_str(),
                    task.due_date.as_ref().map(to_ms),
                    &task.category,
                    task.completed_at.as_ref().map(to_ms),
                ],
            )?;

            tx.commit()?;
            Ok(task)
        })?;

        info!(task_id = %task_id, completed = task.completed, "Task updated");
        Ok(task)
    }

    /// Delete a task, returning the removed record.
    pub fn delete_task(&self, task_id: &str) -> Result<Task> {
        let task = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let task = get_task_internal(&tx, task_id)?
                .ok_or_else(|| ApiError::task_not_found(task_id))?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

            tx.commit()?;
            Ok(task)
        })?;

        info!(task_id = %task_id, "Task deleted");
        Ok(task)
    }

    /// Count all stored tasks.
    pub fn count_tasks(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}
