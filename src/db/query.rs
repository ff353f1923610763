//! Translation of list filters and sort options into SQL.

use crate::types::{SortField, SortOrder, TaskFilter};
use rusqlite::types::Value;

/// A `WHERE ... ORDER BY ...` tail plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub where_clause: String,
    pub order_clause: String,
    pub params: Vec<Value>,
}

impl TaskQuery {
    /// Full SELECT statement over the tasks table.
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT * FROM tasks{}{}",
            self.where_clause, self.order_clause
        )
    }
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Id => "id",
        SortField::Text => "text",
        SortField::Completed => "completed",
        SortField::Priority => {
            "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 END"
        }
        SortField::DueDate => "due_date",
        SortField::Category => "category",
        SortField::CreatedAt => "created_at",
        SortField::CompletedAt => "completed_at",
    }
}

/// Build an ORDER BY clause. Ties fall back to insertion order in the same direction.
pub fn build_order_clause(sort_by: SortField, sort_order: SortOrder) -> String {
    let dir = match sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(" ORDER BY {} {}, rowid {}", sort_column(sort_by), dir, dir)
}

/// Build the query for a filter. An empty filter selects every task.
pub fn build_query(filter: &TaskFilter) -> TaskQuery {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(completed) = filter.completed {
        params.push(Value::Integer(completed as i64));
        conditions.push(format!("completed = ?{}", params.len()));
    }
    if let Some(ref priority) = filter.priority {
        params.push(Value::Text(priority.clone()));
        conditions.push(format!("priority = ?{}", params.len()));
    }
    if let Some(ref category) = filter.category {
        params.push(Value::Text(category.clone()));
        conditions.push(format!("category = ?{}", params.len()));
    }
    // Literal substring; `fold` is registered on every connection by `Database`.
    if let Some(ref search) = filter.search {
        params.push(Value::Text(search.clone()));
        conditions.push(format!("instr(fold(text), fold(?{})) > 0", params.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    TaskQuery {
        where_clause,
        order_clause: build_order_clause(filter.sort_by, filter.sort_order),
        params,
    }
}
