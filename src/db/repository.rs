use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::AppError;
use crate::models::{
    Board, BoardId, Challenge, ChallengeId, Column, ColumnId, ColumnRole, MoveTaskRequest,
    NewChallengeRequest, NewTaskRequest, SyllabusId, Task, TaskId, TaskPatch,
    UpdateChallengeRequest,
};

const TASK_COLUMNS: &str =
    "t.id, t.column_id, t.title, t.description, t.priority, t.due_date, t.completed, t.position";

#[derive(Debug, FromRow)]
struct BoardRow {
    id: i64,
    title: String,
    syllabus_id: Option<i64>,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    id: i64,
    title: String,
    role: String,
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    column_id: i64,
    title: String,
    description: Option<String>,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    completed: bool,
    position: i64,
}

impl TryFrom<TaskRow> for Task {
    type Error = sqlx::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            column_id: row.column_id,
            title: row.title,
            description: row.description,
            priority: row.priority.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            due_date: row.due_date,
            completed: row.completed,
            position: row.position,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChallengeRow {
    id: i64,
    title: String,
    description: Option<String>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

/// Column blueprint used when a board is created.
pub struct NewColumn {
    pub title: String,
    pub role: ColumnRole,
    pub task_titles: Vec<String>,
}

pub async fn fetch_boards(db: &SqlitePool) -> Result<Vec<Board>, AppError> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM boards ORDER BY id")
        .fetch_all(db)
        .await?;

    let mut boards = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(board) = find_board(db, id).await? {
            boards.push(board);
        }
    }
    Ok(boards)
}

pub async fn find_board(db: &SqlitePool, board_id: BoardId) -> Result<Option<Board>, AppError> {
    let Some(board) = sqlx::query_as::<_, BoardRow>(
        "SELECT id, title, syllabus_id FROM boards WHERE id = ?",
    )
    .bind(board_id)
    .fetch_optional(db)
    .await?
    else {
        return Ok(None);
    };

    let column_rows = sqlx::query_as::<_, ColumnRow>(
        "SELECT id, title, role FROM board_columns WHERE board_id = ? ORDER BY ordinal",
    )
    .bind(board_id)
    .fetch_all(db)
    .await?;

    let task_rows = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t
         JOIN board_columns c ON c.id = t.column_id
         WHERE c.board_id = ?
         ORDER BY t.column_id, t.position"
    ))
    .bind(board_id)
    .fetch_all(db)
    .await?;

    let mut tasks_by_column: HashMap<ColumnId, Vec<Task>> = HashMap::new();
    for row in task_rows {
        let task = Task::try_from(row)?;
        tasks_by_column.entry(task.column_id).or_default().push(task);
    }

    let mut columns = Vec::with_capacity(column_rows.len());
    for row in column_rows {
        let role = row
            .role
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        columns.push(Column {
            id: row.id,
            tasks: tasks_by_column.remove(&row.id).unwrap_or_default(),
            title: row.title,
            role,
        });
    }

    Ok(Some(Board {
        id: board.id,
        title: board.title,
        syllabus_id: board.syllabus_id,
        columns,
    }))
}

pub async fn find_board_by_syllabus(
    db: &SqlitePool,
    syllabus_id: SyllabusId,
) -> Result<Option<BoardId>, AppError> {
    let id = sqlx::query_scalar("SELECT id FROM boards WHERE syllabus_id = ?")
        .bind(syllabus_id)
        .fetch_optional(db)
        .await?;
    Ok(id)
}

pub async fn insert_board(
    db: &SqlitePool,
    title: &str,
    syllabus_id: Option<SyllabusId>,
    columns: Vec<NewColumn>,
) -> Result<Board, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("board title must not be empty"));
    }

    let now = Utc::now();
    let mut tx = db.begin().await?;

    let board_id = sqlx::query("INSERT INTO boards (title, syllabus_id, created_at) VALUES (?, ?, ?)")
        .bind(title)
        .bind(syllabus_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for (ordinal, column) in columns.into_iter().enumerate() {
        let column_id = sqlx::query(
            "INSERT INTO board_columns (board_id, title, role, ordinal) VALUES (?, ?, ?, ?)",
        )
        .bind(board_id)
        .bind(&column.title)
        .bind(column.role.as_str())
        .bind(ordinal as i64)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, task_title) in column.task_titles.iter().enumerate() {
            sqlx::query("INSERT INTO tasks (column_id, title, position) VALUES (?, ?, ?)")
                .bind(column_id)
                .bind(task_title)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    find_board(db, board_id)
        .await?
        .ok_or_else(|| AppError::Database(sqlx::Error::RowNotFound))
}

pub async fn delete_board(db: &SqlitePool, board_id: BoardId) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM boards WHERE id = ?")
        .bind(board_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn fetch_all_tasks(db: &SqlitePool) -> Result<Vec<Task>, AppError> {
    let rows = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t ORDER BY t.column_id, t.position"
    ))
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| Task::try_from(row).map_err(AppError::from))
        .collect()
}

pub async fn find_task(db: &SqlitePool, task_id: TaskId) -> Result<Option<Task>, AppError> {
    let row = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"
    ))
    .bind(task_id)
    .fetch_optional(db)
    .await?;

    row.map(|r| Task::try_from(r).map_err(AppError::from)).transpose()
}

/// Appends a task at the end of its column.
pub async fn insert_task(
    db: &SqlitePool,
    column_id: ColumnId,
    req: &NewTaskRequest,
) -> Result<Task, AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("task title must not be empty"));
    }

    let mut tx = db.begin().await?;

    let column_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM board_columns WHERE id = ?")
        .bind(column_id)
        .fetch_optional(&mut *tx)
        .await?;
    if column_exists.is_none() {
        return Err(AppError::not_found(format!("column {}", column_id)));
    }

    let max_position: Option<i64> =
        sqlx::query_scalar("SELECT MAX(position) FROM tasks WHERE column_id = ?")
            .bind(column_id)
            .fetch_one(&mut *tx)
            .await?;
    let position = max_position.map_or(0, |p| p + 1);

    let id = sqlx::query(
        "INSERT INTO tasks (column_id, title, due_date, position) VALUES (?, ?, ?, ?)",
    )
    .bind(column_id)
    .bind(title)
    .bind(req.due_date)
    .bind(position)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;

    find_task(db, id)
        .await?
        .ok_or_else(|| AppError::Database(sqlx::Error::RowNotFound))
}

pub async fn update_task(
    db: &SqlitePool,
    task_id: TaskId,
    patch: &TaskPatch,
) -> Result<Option<Task>, AppError> {
    let Some(mut current) = find_task(db, task_id).await? else {
        return Ok(None);
    };

    patch.apply_to(&mut current);
    current.title = current.title.trim().to_string();
    if current.title.is_empty() {
        return Err(AppError::validation("task title must not be empty"));
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?1,
            description = ?2,
            priority = ?3,
            due_date = ?4,
            completed = ?5
        WHERE id = ?6
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.priority.as_str())
    .bind(current.due_date)
    .bind(current.completed)
    .bind(task_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

/// Deletes a task and closes the gap it leaves in its column.
pub async fn delete_task(db: &SqlitePool, task_id: TaskId) -> Result<bool, AppError> {
    let Some(task) = find_task(db, task_id).await? else {
        return Ok(false);
    };

    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE tasks SET position = position - 1 WHERE column_id = ? AND position > ?")
        .bind(task.column_id)
        .bind(task.position)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Moves a task to `destination_index` of the destination column. Both
/// columns come out with dense positions.
pub async fn move_task(
    db: &SqlitePool,
    board_id: BoardId,
    req: &MoveTaskRequest,
) -> Result<Task, AppError> {
    let mut tx = db.begin().await?;

    let task = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"
    ))
    .bind(req.task_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("task {}", req.task_id)))?;

    let source_board: Option<i64> =
        sqlx::query_scalar("SELECT board_id FROM board_columns WHERE id = ?")
            .bind(task.column_id)
            .fetch_optional(&mut *tx)
            .await?;
    let dest_board: Option<i64> =
        sqlx::query_scalar("SELECT board_id FROM board_columns WHERE id = ?")
            .bind(req.destination_column_id)
            .fetch_optional(&mut *tx)
            .await?;
    if source_board != Some(board_id) {
        return Err(AppError::not_found(format!(
            "task {} on board {}",
            req.task_id, board_id
        )));
    }
    if dest_board != Some(board_id) {
        return Err(AppError::not_found(format!(
            "column {} on board {}",
            req.destination_column_id, board_id
        )));
    }
    if req.source_column_id != task.column_id {
        debug!(
            "move of task {} names column {} but task lives in {}",
            task.id, req.source_column_id, task.column_id
        );
    }

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE column_id = ? AND id != ?")
            .bind(req.destination_column_id)
            .bind(task.id)
            .fetch_one(&mut *tx)
            .await?;
    if req.destination_index < 0 || req.destination_index > remaining {
        return Err(AppError::validation(format!(
            "destination index {} outside 0..={}",
            req.destination_index, remaining
        )));
    }

    // Positions may be sparse; the index counts tasks in position order.
    let mut dest_ids: Vec<TaskId> = sqlx::query_scalar(
        "SELECT id FROM tasks WHERE column_id = ? AND id != ? ORDER BY position, id",
    )
    .bind(req.destination_column_id)
    .bind(task.id)
    .fetch_all(&mut *tx)
    .await?;
    dest_ids.insert(req.destination_index as usize, task.id);

    sqlx::query("UPDATE tasks SET column_id = ? WHERE id = ?")
        .bind(req.destination_column_id)
        .bind(task.id)
        .execute(&mut *tx)
        .await?;
    renumber(&mut tx, &dest_ids).await?;

    if task.column_id != req.destination_column_id {
        let source_ids: Vec<TaskId> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE column_id = ? ORDER BY position, id",
        )
        .bind(task.column_id)
        .fetch_all(&mut *tx)
        .await?;
        renumber(&mut tx, &source_ids).await?;
    }

    tx.commit().await?;

    find_task(db, task.id)
        .await?
        .ok_or_else(|| AppError::Database(sqlx::Error::RowNotFound))
}

/// Writes positions 0..n in the given order.
async fn renumber(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ordered_ids: &[TaskId],
) -> Result<(), AppError> {
    for (position, id) in ordered_ids.iter().enumerate() {
        sqlx::query("UPDATE tasks SET position = ? WHERE id = ?")
            .bind(position as i64)
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

pub async fn fetch_challenges(db: &SqlitePool) -> Result<Vec<Challenge>, AppError> {
    let rows = sqlx::query_as::<_, ChallengeRow>(
        "SELECT id, title, description, start_date, end_date FROM challenges ORDER BY end_date, id",
    )
    .fetch_all(db)
    .await?;

    let links = sqlx::query_as::<_, (i64, i64)>(
        "SELECT challenge_id, task_id FROM challenge_tasks ORDER BY challenge_id, task_id",
    )
    .fetch_all(db)
    .await?;

    let mut task_ids: HashMap<ChallengeId, Vec<TaskId>> = HashMap::new();
    for (challenge_id, task_id) in links {
        task_ids.entry(challenge_id).or_default().push(task_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| Challenge {
            task_ids: task_ids.remove(&row.id).unwrap_or_default(),
            id: row.id,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
        })
        .collect())
}

pub async fn find_challenge(
    db: &SqlitePool,
    challenge_id: ChallengeId,
) -> Result<Option<Challenge>, AppError> {
    Ok(fetch_challenges(db)
        .await?
        .into_iter()
        .find(|c| c.id == challenge_id))
}

pub async fn insert_challenge(
    db: &SqlitePool,
    req: &NewChallengeRequest,
) -> Result<Challenge, AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("challenge title must not be empty"));
    }
    let end_date = req
        .end_date
        .ok_or_else(|| AppError::validation("challenge end date is required"))?;

    let mut task_ids = req.task_ids.clone();
    task_ids.sort_unstable();
    task_ids.dedup();
    if task_ids.is_empty() {
        return Err(AppError::validation("select at least one task"));
    }

    let mut tx = db.begin().await?;

    for task_id in &task_ids {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::validation(
                "Could not create challenge. Ensure task IDs are valid.",
            ));
        }
    }

    let id = sqlx::query(
        "INSERT INTO challenges (title, description, start_date, end_date) VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(&req.description)
    .bind(Utc::now())
    .bind(end_date)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for task_id in &task_ids {
        sqlx::query("INSERT INTO challenge_tasks (challenge_id, task_id) VALUES (?, ?)")
            .bind(id)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    find_challenge(db, id)
        .await?
        .ok_or_else(|| AppError::Database(sqlx::Error::RowNotFound))
}

pub async fn update_challenge(
    db: &SqlitePool,
    challenge_id: ChallengeId,
    req: &UpdateChallengeRequest,
) -> Result<Option<Challenge>, AppError> {
    let Some(mut current) = find_challenge(db, challenge_id).await? else {
        return Ok(None);
    };

    if let Some(title) = &req.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("challenge title must not be empty"));
        }
        current.title = title.to_string();
    }
    if let Some(description) = &req.description {
        current.description = Some(description.clone());
    }

    sqlx::query("UPDATE challenges SET title = ?, description = ? WHERE id = ?")
        .bind(&current.title)
        .bind(&current.description)
        .bind(challenge_id)
        .execute(db)
        .await?;

    Ok(Some(current))
}

pub async fn delete_challenge(db: &SqlitePool, challenge_id: ChallengeId) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM challenges WHERE id = ?")
        .bind(challenge_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
