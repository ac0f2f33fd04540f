//! SQLite-backed task store.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{decode_time, encode_time, now, Database, TaskStore};
use crate::error::{Result, TaskError};
use crate::models::{NewTask, Task, TaskPatch};

const SELECT_TASK: &str = "SELECT id, name, description, completed, due_at, \
     created_at, updated_at, deleted_at FROM tasks";

/// Task store over a shared SQLite connection.
///
/// `create`, `update`, `soft_delete` and `restore` each run in their own
/// transaction; no transaction spans more than one call.
#[derive(Clone)]
pub struct SqliteTaskStore {
    db: Database,
}

impl SqliteTaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    decode_time(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => time_column(row, idx).map(Some),
        None => Ok(None),
    }
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        completed: row.get(3)?,
        due_at: optional_time_column(row, 4)?,
        created_at: time_column(row, 5)?,
        updated_at: time_column(row, 6)?,
        deleted_at: optional_time_column(row, 7)?,
    })
}

fn fetch(conn: &Connection, id: &str, active_only: bool) -> Result<Task> {
    let sql = if active_only {
        format!("{} WHERE id = ?1 AND deleted_at IS NULL", SELECT_TASK)
    } else {
        format!("{} WHERE id = ?1", SELECT_TASK)
    };

    conn.query_row(&sql, params![id], row_to_task)
        .optional()?
        .ok_or_else(|| TaskError::NotFound(id.to_string()))
}

/// Next `updated_at`: now, but always strictly after the previous value.
fn bumped(task: &Task) -> DateTime<Utc> {
    now().max(task.updated_at + Duration::microseconds(1))
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, task: NewTask) -> Result<Task> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let id = Uuid::new_v4().to_string();
        let at = encode_time(&now());
        tx.execute(
            "INSERT INTO tasks \
             (id, name, description, completed, due_at, created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
            params![
                id,
                task.name,
                task.description,
                task.completed,
                task.due_at.as_ref().map(encode_time),
                at,
                at
            ],
        )?;
        let stored = fetch(&tx, &id, false)?;
        tx.commit()?;

        debug!("Task {} created", id);
        Ok(stored)
    }

    fn find_active(&self, id: &str) -> Result<Task> {
        let conn = self.db.lock()?;
        fetch(&conn, id, true)
    }

    fn find_any(&self, id: &str) -> Result<Task> {
        let conn = self.db.lock()?;
        fetch(&conn, id, false)
    }

    fn list_active(&self) -> Result<Vec<Task>> {
        let conn = self.db.lock()?;
        let sql = format!(
            "{} WHERE deleted_at IS NULL ORDER BY created_at DESC, rowid DESC",
            SELECT_TASK
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let mut task = fetch(&tx, id, true)?;
        patch.apply(&mut task);
        task.updated_at = bumped(&task);

        tx.execute(
            "UPDATE tasks SET name = ?1, description = ?2, completed = ?3, due_at = ?4, \
             updated_at = ?5 WHERE id = ?6",
            params![
                task.name,
                task.description,
                task.completed,
                task.due_at.as_ref().map(encode_time),
                encode_time(&task.updated_at),
                id
            ],
        )?;
        let stored = fetch(&tx, id, true)?;
        tx.commit()?;

        debug!("Task {} updated", id);
        Ok(stored)
    }

    fn soft_delete(&self, id: &str) -> Result<()> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let task = fetch(&tx, id, true)?;
        let at = encode_time(&bumped(&task));
        tx.execute(
            "UPDATE tasks SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![at, id],
        )?;
        tx.commit()?;

        debug!("Task {} soft-deleted", id);
        Ok(())
    }

    fn hard_delete(&self, id: &str) -> Result<()> {
        let conn = self.db.lock()?;
        let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(TaskError::NotFound(id.to_string()));
        }

        debug!("Task {} hard-deleted", id);
        Ok(())
    }

    fn hard_delete_if_completed(&self, id: &str) -> Result<bool> {
        let conn = self.db.lock()?;
        let removed = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND completed = 1",
            params![id],
        )?;
        if removed == 0 {
            // Either gone or still open; the lock is held, so this is the state
            // the delete saw.
            return fetch(&conn, id, false).map(|_| false);
        }

        debug!("Completed task {} hard-deleted", id);
        Ok(true)
    }

    fn restore(&self, id: &str) -> Result<Task> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let task = fetch(&tx, id, false)?;
        if task.is_active() {
            return Err(TaskError::NotFound(id.to_string()));
        }
        tx.execute(
            "UPDATE tasks SET deleted_at = NULL, updated_at = ?1 WHERE id = ?2",
            params![encode_time(&bumped(&task)), id],
        )?;
        let stored = fetch(&tx, id, true)?;
        tx.commit()?;

        debug!("Task {} restored", id);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Existence;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn store() -> SqliteTaskStore {
        SqliteTaskStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_create_assigns_defaults() {
        let store = store();
        let task = store.create(NewTask::named("A")).unwrap();

        assert!(!task.id.is_empty());
        assert_eq!(task.name, "A");
        assert!(!task.completed);
        assert_eq!(task.description, None);
        assert_eq!(task.due_at, None);
        assert_eq!(task.deleted_at, None);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_create_then_find_is_equal() {
        let store = store();
        let due = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).unwrap();
        let created = store
            .create(NewTask {
                name: "Past due".to_string(),
                description: Some("allowed".to_string()),
                completed: true,
                due_at: Some(due),
            })
            .unwrap();

        let found = store.find_active(&created.id).unwrap();
        assert_eq!(found, created);
        assert_eq!(found.due_at, Some(due));
        assert!(found.completed);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = store();
        let a = store.create(NewTask::named("a")).unwrap();
        let b = store.create(NewTask::named("b")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_find_missing_is_not_found() {
        let store = store();
        assert!(matches!(store.find_active("nope"), Err(TaskError::NotFound(_))));
        assert!(matches!(store.find_any("nope"), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_list_newest_first() {
        let store = store();
        let t1 = store.create(NewTask::named("t1")).unwrap();
        let t2 = store.create(NewTask::named("t2")).unwrap();
        let t3 = store.create(NewTask::named("t3")).unwrap();

        let ids: Vec<String> = store.list_active().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![t3.id, t2.id, t1.id]);
    }

    #[test]
    fn test_update_is_sparse() {
        let store = store();
        let created = store
            .create(NewTask {
                name: "Original".to_string(),
                description: Some("keep me".to_string()),
                completed: false,
                due_at: None,
            })
            .unwrap();

        let updated = store
            .update(
                &created.id,
                &TaskPatch {
                    name: Some("Renamed".to_string()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = store();
        let result = store.update("nope", &TaskPatch::completed(true));
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_soft_delete_hides_but_keeps_record() {
        let store = store();
        let task = store.create(NewTask::named("gone")).unwrap();

        store.soft_delete(&task.id).unwrap();

        assert!(store.list_active().unwrap().is_empty());
        assert!(matches!(store.find_active(&task.id), Err(TaskError::NotFound(_))));
        let any = store.find_any(&task.id).unwrap();
        assert_eq!(any.existence(), Existence::SoftDeleted);
        assert!(any.updated_at >= any.created_at);
    }

    #[test]
    fn test_soft_delete_twice_is_not_found() {
        let store = store();
        let task = store.create(NewTask::named("x")).unwrap();

        store.soft_delete(&task.id).unwrap();
        assert!(matches!(store.soft_delete(&task.id), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_update_soft_deleted_is_not_found() {
        let store = store();
        let task = store.create(NewTask::named("x")).unwrap();
        store.soft_delete(&task.id).unwrap();

        let result = store.update(&task.id, &TaskPatch::completed(true));
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_hard_delete_removes_soft_deleted_record() {
        let store = store();
        let task = store.create(NewTask::named("x")).unwrap();
        store.soft_delete(&task.id).unwrap();

        store.hard_delete(&task.id).unwrap();

        assert!(matches!(store.find_any(&task.id), Err(TaskError::NotFound(_))));
        assert!(matches!(store.hard_delete(&task.id), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn test_hard_delete_if_completed() {
        let store = store();
        let open = store.create(NewTask::named("open")).unwrap();
        let done = store.create(NewTask::named("done")).unwrap();
        store.update(&done.id, &TaskPatch::completed(true)).unwrap();

        assert!(!store.hard_delete_if_completed(&open.id).unwrap());
        assert!(store.find_active(&open.id).is_ok());

        assert!(store.hard_delete_if_completed(&done.id).unwrap());
        assert!(matches!(store.find_any(&done.id), Err(TaskError::NotFound(_))));
        assert!(matches!(
            store.hard_delete_if_completed(&done.id),
            Err(TaskError::NotFound(_))
        ));
    }

    #[test]
    fn test_hard_delete_if_completed_sees_reopened_task() {
        let store = store();
        let task = store.create(NewTask::named("flip")).unwrap();
        store.update(&task.id, &TaskPatch::completed(true)).unwrap();
        store.update(&task.id, &TaskPatch::completed(false)).unwrap();

        assert!(!store.hard_delete_if_completed(&task.id).unwrap());
        assert!(!store.find_active(&task.id).unwrap().completed);
    }

    #[test]
    fn test_restore() {
        let store = store();
        let task = store.create(NewTask::named("back")).unwrap();

        assert!(matches!(store.restore(&task.id), Err(TaskError::NotFound(_))));

        store.soft_delete(&task.id).unwrap();
        let restored = store.restore(&task.id).unwrap();

        assert!(restored.is_active());
        assert_eq!(store.list_active().unwrap().len(), 1);
    }

    #[derive(Debug, Clone)]
    struct PatchInput {
        name: Option<String>,
        description: Option<Option<String>>,
        completed: Option<bool>,
    }

    fn patch_strategy() -> impl Strategy<Value = PatchInput> {
        (
            proptest::option::of("[a-z]{1,12}"),
            proptest::option::of(proptest::option::of("[a-z ]{0,20}")),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(name, description, completed)| PatchInput {
                name,
                description,
                completed,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        // A sequence of sparse updates behaves like applying each patch to a
        // local copy: unspecified fields never change.
        #[test]
        fn prop_partial_updates_keep_unspecified_fields(
            patches in prop::collection::vec(patch_strategy(), 1..10)
        ) {
            let store = store();
            let created = store.create(NewTask {
                name: "start".to_string(),
                description: Some("initial".to_string()),
                completed: false,
                due_at: None,
            }).unwrap();
            let mut expected = created.clone();

            for input in patches {
                let patch = TaskPatch {
                    name: input.name,
                    description: input.description,
                    completed: input.completed,
                    due_at: None,
                };
                patch.apply(&mut expected);
                let stored = store.update(&created.id, &patch).unwrap();

                prop_assert_eq!(&stored.name, &expected.name);
                prop_assert_eq!(&stored.description, &expected.description);
                prop_assert_eq!(stored.completed, expected.completed);
                prop_assert_eq!(stored.due_at, expected.due_at);
                prop_assert_eq!(stored.created_at, created.created_at);
                prop_assert!(stored.updated_at > expected.updated_at);
                expected.updated_at = stored.updated_at;
            }
        }
    }
}
