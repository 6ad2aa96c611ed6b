use chrono::{Duration, NaiveDate, Utc};
use tracing::instrument;

use tasktrack_core::ids::TaskId;
use tasktrack_core::insights::{InsightsReport, PriorityCount};
use tasktrack_core::task::{NewTask, SortOrder, Task, TaskFilter, TaskPatch, TaskStatus};

use crate::database::Database;
use crate::error::StoreError;
use crate::query::FieldBindings;
use crate::row_helpers;

const TASK_COLUMNS: &str = "id, title, description, priority, due_date, status, created_at";

/// How many days ahead of today (inclusive) a not-completed task counts as
/// due soon.
const DUE_SOON_DAYS: i64 = 3;

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new task. Title is required; priority and status fall back
    /// to their defaults when the input leaves them out.
    #[instrument(skip(self, input))]
    pub fn create(&self, input: &NewTask) -> Result<Task, StoreError> {
        let title = match input.title.as_deref() {
            Some(t) if !t.is_empty() => t.to_owned(),
            _ => return Err(StoreError::InvalidInput("Title is required".into())),
        };

        let id = TaskId::new();
        let now = Utc::now().to_rfc3339();
        let priority = input.priority.unwrap_or_default();
        let status = input.status.unwrap_or_default();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, title, description, priority, due_date, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id.as_str(),
                    title,
                    input.description,
                    priority.to_string(),
                    input.due_date,
                    status.to_string(),
                    now,
                ],
            )?;

            Ok(Task {
                id,
                title,
                description: input.description.clone(),
                priority,
                due_date: input.due_date,
                status,
                created_at: now,
            })
        })
    }

    /// List tasks matching the filter. Supplied fields are conjunctive
    /// equality constraints; absent fields impose none.
    #[instrument(skip(self))]
    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut constraints = FieldBindings::new();
        if let Some(status) = filter.status {
            constraints.push("status", status.to_string());
        }
        if let Some(priority) = filter.priority {
            constraints.push("priority", priority.to_string());
        }

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        if !constraints.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&constraints.fragment(" AND "));
        }
        sql.push_str(match filter.sort {
            SortOrder::DueDate => " ORDER BY due_date ASC",
            SortOrder::Newest => " ORDER BY created_at DESC",
        });

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(constraints.params().as_slice())?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }
            Ok(tasks)
        })
    }

    /// Apply a partial update to exactly the supplied fields. Status and
    /// priority are the only updatable columns; an empty patch is rejected.
    #[instrument(skip(self, patch), fields(task_id = %id))]
    pub fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut assignments = FieldBindings::new();
        if let Some(status) = patch.status {
            assignments.push("status", status.to_string());
        }
        if let Some(priority) = patch.priority {
            assignments.push("priority", priority.to_string());
        }
        if assignments.is_empty() {
            return Err(StoreError::InvalidInput("Nothing to update".into()));
        }

        let set_clause = assignments.fragment(", ");
        let id_slot = assignments.push_tail(id.as_str().to_owned());
        let sql = format!("UPDATE tasks SET {set_clause} WHERE id = ?{id_slot}");

        self.db.with_conn(|conn| {
            let affected = conn.execute(&sql, assignments.params().as_slice())?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            get_task(conn, id)
        })
    }

    /// Delete a task.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", [id.as_str()])?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    /// Aggregate counts plus the derived summary, as of today (UTC).
    ///
    /// Three independent statements, no transaction: a write landing
    /// between them can yield a momentarily inconsistent snapshot.
    #[instrument(skip(self))]
    pub fn insights(&self) -> Result<InsightsReport, StoreError> {
        self.insights_as_of(Utc::now().date_naive())
    }

    fn insights_as_of(&self, today: NaiveDate) -> Result<InsightsReport, StoreError> {
        self.db.with_conn(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;

            let mut stmt =
                conn.prepare("SELECT priority, COUNT(*) FROM tasks GROUP BY priority")?;
            let mut rows = stmt.query([])?;
            let mut by_priority = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row_helpers::get(row, 0, "tasks", "priority")?;
                by_priority.push(PriorityCount {
                    priority: row_helpers::parse_enum(&raw, "tasks", "priority")?,
                    count: row_helpers::get(row, 1, "tasks", "count")?,
                });
            }

            let horizon = today + Duration::days(DUE_SOON_DAYS);
            let due_soon: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks
                 WHERE due_date IS NOT NULL AND due_date >= ?1 AND due_date <= ?2
                   AND status != ?3",
                rusqlite::params![today, horizon, TaskStatus::Completed.to_string()],
                |row| row.get(0),
            )?;

            Ok(InsightsReport::new(total, by_priority, due_soon))
        })
    }
}

fn get_task(conn: &rusqlite::Connection, id: &TaskId) -> Result<Task, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
    let mut rows = stmt.query([id.as_str()])?;
    match rows.next()? {
        Some(row) => row_to_task(row),
        None => Err(StoreError::NotFound(format!("task {id}"))),
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, StoreError> {
    let priority_raw: String = row_helpers::get(row, 3, "tasks", "priority")?;
    let status_raw: String = row_helpers::get(row, 5, "tasks", "status")?;

    Ok(Task {
        id: TaskId::from_raw(row_helpers::get::<String>(row, 0, "tasks", "id")?),
        title: row_helpers::get(row, 1, "tasks", "title")?,
        description: row_helpers::get_opt(row, 2, "tasks", "description")?,
        priority: row_helpers::parse_enum(&priority_raw, "tasks", "priority")?,
        due_date: row_helpers::get_opt(row, 4, "tasks", "due_date")?,
        status: row_helpers::parse_enum(&status_raw, "tasks", "status")?,
        created_at: row_helpers::get(row, 6, "tasks", "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasktrack_core::task::Priority;

    fn repo() -> TaskRepo {
        TaskRepo::new(Database::in_memory().unwrap())
    }

    fn titled(title: &str) -> NewTask {
        NewTask {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn create_applies_defaults() {
        let repo = repo();
        let task = repo.create(&titled("Buy milk")).unwrap();
        assert!(task.id.as_str().starts_with("task_"));
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.description.is_none());
        assert!(task.due_date.is_none());
        assert!(!task.created_at.is_empty());
    }

    #[test]
    fn create_stores_supplied_fields() {
        let repo = repo();
        let due = today() + Duration::days(1);
        let task = repo
            .create(&NewTask {
                title: Some("Write spec".into()),
                description: Some("the hard part".into()),
                priority: Some(Priority::High),
                due_date: Some(due),
                status: Some(TaskStatus::Completed),
            })
            .unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.due_date, Some(due));
        assert_eq!(task.description.as_deref(), Some("the hard part"));

        // Round-trips through the relation, not just the returned struct
        let listed = repo.list(&TaskFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].due_date, Some(due));
        assert_eq!(listed[0].priority, Priority::High);
    }

    #[test]
    fn create_generates_distinct_ids() {
        let repo = repo();
        let a = repo.create(&titled("a")).unwrap();
        let b = repo.create(&titled("b")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn create_rejects_missing_title() {
        let repo = repo();
        let err = repo.create(&NewTask::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(err.to_string(), "Title is required");
        // Nothing stored
        assert!(repo.list(&TaskFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_empty_title() {
        let repo = repo();
        let err = repo.create(&titled("")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert!(repo.list(&TaskFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn list_unfiltered_returns_everything_newest_first() {
        let repo = repo();
        repo.create(&titled("first")).unwrap();
        repo.create(&titled("second")).unwrap();
        repo.create(&titled("third")).unwrap();

        let tasks = repo.list(&TaskFilter::default()).unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[test]
    fn list_filters_are_conjunctive() {
        let repo = repo();
        repo.create(&NewTask {
            title: Some("high pending".into()),
            priority: Some(Priority::High),
            ..Default::default()
        })
        .unwrap();
        repo.create(&NewTask {
            title: Some("high done".into()),
            priority: Some(Priority::High),
            status: Some(TaskStatus::Completed),
            ..Default::default()
        })
        .unwrap();
        repo.create(&NewTask {
            title: Some("low pending".into()),
            priority: Some(Priority::Low),
            ..Default::default()
        })
        .unwrap();

        let filter = TaskFilter {
            status: Some(TaskStatus::Pending),
            priority: Some(Priority::High),
            sort: SortOrder::Newest,
        };
        let tasks = repo.list(&filter).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "high pending");
    }

    #[test]
    fn list_single_filter_is_complete() {
        let repo = repo();
        for i in 0..4 {
            repo.create(&NewTask {
                title: Some(format!("task {i}")),
                status: Some(if i % 2 == 0 { TaskStatus::Pending } else { TaskStatus::Completed }),
                ..Default::default()
            })
            .unwrap();
        }

        let pending = repo
            .list(&TaskFilter {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[test]
    fn list_sorted_by_due_date_ascending() {
        let repo = repo();
        let base = today();
        for (title, offset) in [("later", 9), ("soon", 1), ("middle", 4)] {
            repo.create(&NewTask {
                title: Some(title.into()),
                due_date: Some(base + Duration::days(offset)),
                ..Default::default()
            })
            .unwrap();
        }

        let filter = TaskFilter {
            sort: SortOrder::DueDate,
            ..Default::default()
        };
        let tasks = repo.list(&filter).unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["soon", "middle", "later"]);
    }

    #[test]
    fn update_changes_only_supplied_field() {
        let repo = repo();
        let due = today() + Duration::days(2);
        let created = repo
            .create(&NewTask {
                title: Some("Write spec".into()),
                description: Some("notes".into()),
                priority: Some(Priority::High),
                due_date: Some(due),
                ..Default::default()
            })
            .unwrap();

        let updated = repo
            .update(
                &created.id,
                &TaskPatch {
                    status: Some(TaskStatus::Completed),
                    priority: None,
                },
            )
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        // Everything else untouched
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.priority, created.priority);
        assert_eq!(updated.due_date, created.due_date);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_both_fields_at_once() {
        let repo = repo();
        let created = repo.create(&titled("task")).unwrap();
        let updated = repo
            .update(
                &created.id,
                &TaskPatch {
                    status: Some(TaskStatus::Completed),
                    priority: Some(Priority::Low),
                },
            )
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.priority, Priority::Low);
    }

    #[test]
    fn update_rejects_empty_patch() {
        let repo = repo();
        let created = repo.create(&titled("task")).unwrap();
        let err = repo.update(&created.id, &TaskPatch::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(err.to_string(), "Nothing to update");
    }

    #[test]
    fn update_unknown_id_not_found() {
        let repo = repo();
        let err = repo
            .update(
                &TaskId::from_raw("task_nonexistent"),
                &TaskPatch {
                    status: Some(TaskStatus::Completed),
                    priority: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_removes_task() {
        let repo = repo();
        let keep = repo.create(&titled("keep")).unwrap();
        let gone = repo.create(&titled("gone")).unwrap();

        repo.delete(&gone.id).unwrap();

        let remaining = repo.list(&TaskFilter::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
    }

    #[test]
    fn delete_unknown_id_not_found() {
        let repo = repo();
        let err = repo.delete(&TaskId::from_raw("task_nonexistent")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn insights_counts_totals_and_groups() {
        let repo = repo();
        for priority in [Priority::High, Priority::High, Priority::Low] {
            repo.create(&NewTask {
                title: Some("t".into()),
                priority: Some(priority),
                ..Default::default()
            })
            .unwrap();
        }

        let report = repo.insights().unwrap();
        assert_eq!(report.total_tasks, 3);

        let high = report.by_priority.iter().find(|g| g.priority == Priority::High).unwrap();
        assert_eq!(high.count, 2);
        let low = report.by_priority.iter().find(|g| g.priority == Priority::Low).unwrap();
        assert_eq!(low.count, 1);
        assert!(report.summary.contains("Most are High priority."));
    }

    #[test]
    fn insights_empty_store() {
        let repo = repo();
        let report = repo.insights().unwrap();
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.due_soon, 0);
        assert!(report.by_priority.is_empty());
        assert!(report.summary.contains("Keep it up!"));
    }

    #[test]
    fn due_soon_window_boundaries() {
        let repo = repo();
        let base = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let cases = [
            ("yesterday", -1),
            ("today", 0),
            ("plus one", 1),
            ("plus three", 3),
            ("plus four", 4),
        ];
        for (title, offset) in cases {
            repo.create(&NewTask {
                title: Some(title.into()),
                due_date: Some(base + Duration::days(offset)),
                ..Default::default()
            })
            .unwrap();
        }
        // No due date at all
        repo.create(&titled("undated")).unwrap();

        let report = repo.insights_as_of(base).unwrap();
        // today, +1 and +3 count; yesterday, +4 and undated do not
        assert_eq!(report.due_soon, 3);
    }

    #[test]
    fn due_soon_ignores_completed() {
        let repo = repo();
        let base = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        repo.create(&NewTask {
            title: Some("done".into()),
            due_date: Some(base + Duration::days(1)),
            status: Some(TaskStatus::Completed),
            ..Default::default()
        })
        .unwrap();
        repo.create(&NewTask {
            title: Some("open".into()),
            due_date: Some(base + Duration::days(1)),
            ..Default::default()
        })
        .unwrap();

        let report = repo.insights_as_of(base).unwrap();
        assert_eq!(report.due_soon, 1);
    }

    #[test]
    fn complete_lifecycle_scenario() {
        let repo = repo();
        let task = repo
            .create(&NewTask {
                title: Some("Write spec".into()),
                priority: Some(Priority::High),
                due_date: Some(today() + Duration::days(1)),
                ..Default::default()
            })
            .unwrap();

        let pending = repo
            .list(&TaskFilter {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert!(pending.iter().any(|t| t.id == task.id));
        assert_eq!(repo.insights().unwrap().due_soon, 1);

        repo.update(
            &task.id,
            &TaskPatch {
                status: Some(TaskStatus::Completed),
                priority: None,
            },
        )
        .unwrap();

        let pending = repo
            .list(&TaskFilter {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .unwrap();
        assert!(pending.is_empty());
        let completed = repo
            .list(&TaskFilter {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            })
            .unwrap();
        assert!(completed.iter().any(|t| t.id == task.id));

        // Completed, so no longer due soon
        assert_eq!(repo.insights().unwrap().due_soon, 0);
    }

    #[test]
    fn out_of_set_priority_surfaces_as_corrupt_row() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, title, priority, status, created_at)
                 VALUES ('task_bad', 'broken', 'URGENT', 'Pending', '2026-08-07T00:00:00+00:00')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let repo = TaskRepo::new(db);
        let err = repo.list(&TaskFilter::default()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::CorruptRow { table: "tasks", column: "priority", .. }
        ));
    }
}
