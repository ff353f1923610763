//! Output formatting utilities for markdown and JSON.

use crate::client::ViewState;
use crate::types::{Stats, Task};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

/// Pretty JSON for any serializable value.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Short date: `Jun 30`, with the year only when it differs from `now`'s.
pub fn format_date(date: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    if date.year() == now.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

/// One checklist line for a task.
pub fn format_task_short(task: &Task, now: DateTime<Utc>) -> String {
    let check = if task.completed { "x" } else { " " };
    let mut line = format!(
        "- [{}] {} `{}` ({}, {})",
        check, task.text, task.id, task.priority, task.category
    );
    if let Some(ref due) = task.due_date {
        line.push_str(&format!(" due {}", format_date(due, now)));
        if task.is_overdue(now) {
            line.push_str(" **overdue**");
        }
    }
    line.push('\n');
    line
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task, now: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.text));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!(
        "- **status**: {}\n",
        if task.completed { "completed" } else { "pending" }
    ));
    md.push_str(&format!("- **priority**: {}\n", task.priority));
    md.push_str(&format!("- **category**: {}\n", task.category));

    if let Some(ref due) = task.due_date {
        md.push_str(&format!("- **due**: {}\n", format_date(due, now)));
    }
    md.push_str(&format!("- **created**: {}\n", task.created_at.to_rfc3339()));
    if let Some(ref done) = task.completed_at {
        md.push_str(&format!("- **completed**: {}\n", done.to_rfc3339()));
    }

    md
}

/// Format a list of tasks as markdown, pending first.
pub fn format_tasks_markdown(tasks: &[Task], now: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n\n", tasks.len()));

    let (done, pending): (Vec<&Task>, Vec<&Task>) = tasks.iter().partition(|t| t.completed);
    for (heading, group) in [("Pending", pending), ("Completed", done)] {
        if group.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", heading));
        for task in group {
            md.push_str(&format_task_short(task, now));
        }
        md.push('\n');
    }

    if tasks.is_empty() {
        md.push_str("No tasks found\n");
    }

    md
}

pub fn format_stats_markdown(stats: &Stats) -> String {
    let mut md = String::new();

    md.push_str("# Stats\n\n");
    md.push_str(&format!(
        "- **total**: {} ({} completed, {} pending)\n",
        stats.total, stats.completed, stats.pending
    ));
    md.push_str(&format!("- **overdue**: {}\n", stats.overdue));
    md.push_str(&format!(
        "- **open by priority**: high {}, medium {}, low {}\n",
        stats.by_priority.high, stats.by_priority.medium, stats.by_priority.low
    ));

    if !stats.by_category.is_empty() {
        md.push_str("\n## Categories\n\n");
        for entry in &stats.by_category {
            md.push_str(&format!("- {}: {}\n", entry.category, entry.count));
        }
    }

    md
}

/// Render a controller snapshot.
pub fn format_view_markdown(view: &ViewState, now: DateTime<Utc>) -> String {
    let mut md = String::new();

    if let Some(ref error) = view.error {
        md.push_str(&format!("> {}\n\n", error));
    }
    if view.loading {
        md.push_str("Loading...\n\n");
    }
    if let Some(ref stats) = view.stats {
        md.push_str(&format_stats_markdown(stats));
        md.push('\n');
    }
    md.push_str(&format_tasks_markdown(&view.tasks, now));
    if let Some(ref edit) = view.editing {
        md.push_str(&format!("\nEditing `{}`: {}\n", edit.task_id, edit.text));
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewTask, Priority};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn task(text: &str) -> Task {
        NewTask::new(text)
            .with_priority(Priority::High)
            .into_task(format!("id-{}", text), now())
            .unwrap()
    }

    #[test]
    fn date_omits_current_year() {
        let same = Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap();
        let other = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(format_date(&same, now()), "Jun 30");
        assert_eq!(format_date(&other, now()), "Jan 2, 2025");
    }

    #[test]
    fn short_line_marks_overdue() {
        let mut t = task("pay rent");
        t.due_date = Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        let line = format_task_short(&t, now());
        assert!(line.starts_with("- [ ] pay rent"));
        assert!(line.contains("(high, general)"));
        assert!(line.contains("**overdue**"));
    }

    #[test]
    fn list_groups_pending_before_completed() {
        let mut done = task("done");
        done.completed = true;
        let md = format_tasks_markdown(&[done, task("open")], now());
        let pending_at = md.find("## Pending").unwrap();
        let completed_at = md.find("## Completed").unwrap();
        assert!(pending_at < completed_at);
        assert!(md.starts_with("# Tasks (2)"));
    }

    #[test]
    fn empty_list_message() {
        assert!(format_tasks_markdown(&[], now()).contains("No tasks found"));
    }
}
