//! Aggregation queries for statistics.

use super::{Database, to_ms};
use crate::types::{CategoryCount, Priority, PriorityCounts, Stats};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

impl Database {
    /// Compute aggregate statistics with "now" as the overdue cutoff.
    pub fn get_stats(&self) -> Result<Stats> {
        self.get_stats_at(Utc::now())
    }

    /// Compute aggregate statistics, treating tasks due before `now` as overdue.
    ///
    /// Priority counts cover only incomplete tasks; category counts cover all tasks.
    pub fn get_stats_at(&self, now: DateTime<Utc>) -> Result<Stats> {
        self.with_conn(|conn| {
            let (total, completed, overdue): (i64, i64, i64) = conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(completed), 0),
                    COALESCE(SUM(CASE WHEN completed = 0 AND due_date IS NOT NULL AND due_date < ?1
                                      THEN 1 ELSE 0 END), 0)
                 FROM tasks",
                params![to_ms(&now)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let mut by_priority = PriorityCounts::default();
            let mut stmt = conn.prepare(
                "SELECT priority, COUNT(*) FROM tasks WHERE completed = 0 GROUP BY priority",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (priority, count) = row?;
                match priority.parse::<Priority>() {
                    Ok(Priority::High) => by_priority.high = count,
                    Ok(Priority::Medium) => by_priority.medium = count,
                    Ok(Priority::Low) => by_priority.low = count,
                    Err(_) => tracing::warn!(priority = %priority, "Skipping unknown priority in stats"),
                }
            }

            let mut stmt = conn.prepare(
                "SELECT category, COUNT(*) AS count FROM tasks
                 GROUP BY category
                 ORDER BY count DESC, category ASC",
            )?;
            let by_category = stmt
                .query_map([], |row| {
                    Ok(CategoryCount {
                        category: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Stats {
                total,
                completed,
                pending: total - completed,
                by_priority,
                by_category,
                overdue,
            })
        })
    }
}
