use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::RemoteStore;
use crate::db::repository::{self, NewColumn};
use crate::error::AppError;
use crate::generator::TaskGenerator;
use crate::models::{
    Board, BoardId, Challenge, ChallengeId, ColumnId, ColumnRole, MoveTaskRequest,
    NewBoardRequest, NewChallengeRequest, NewTaskRequest, SyllabusId, Task, TaskId, TaskPatch,
    UpdateChallengeRequest, DEFAULT_COLUMNS,
};

/// [`RemoteStore`] backed directly by the SQLite repository. The HTTP API
/// serves requests through it as well.
pub struct LocalStore {
    db: SqlitePool,
    generator: Arc<dyn TaskGenerator>,
}

impl LocalStore {
    pub fn new(db: SqlitePool, generator: Arc<dyn TaskGenerator>) -> Self {
        Self { db, generator }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

fn default_columns(todo_titles: Vec<String>) -> Vec<NewColumn> {
    let mut todo_titles = Some(todo_titles);
    DEFAULT_COLUMNS
        .iter()
        .map(|(title, role)| NewColumn {
            title: title.to_string(),
            role: *role,
            task_titles: match role {
                ColumnRole::Todo => todo_titles.take().unwrap_or_default(),
                _ => Vec::new(),
            },
        })
        .collect()
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn fetch_boards(&self) -> Result<Vec<Board>, AppError> {
        repository::fetch_boards(&self.db).await
    }

    async fn fetch_board(&self, board_id: BoardId) -> Result<Board, AppError> {
        repository::find_board(&self.db, board_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("board {}", board_id)))
    }

    async fn move_task(&self, board_id: BoardId, request: &MoveTaskRequest) -> Result<(), AppError> {
        repository::move_task(&self.db, board_id, request).await?;
        Ok(())
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<Task, AppError> {
        repository::update_task(&self.db, task_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))
    }

    async fn create_task(&self, column_id: ColumnId, request: &NewTaskRequest) -> Result<Task, AppError> {
        repository::insert_task(&self.db, column_id, request).await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), AppError> {
        if repository::delete_task(&self.db, task_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("task {}", task_id)))
        }
    }

    async fn create_board(&self, request: &NewBoardRequest) -> Result<Board, AppError> {
        let board =
            repository::insert_board(&self.db, &request.title, None, default_columns(Vec::new()))
                .await?;
        info!("created board {} ({})", board.id, board.title);
        Ok(board)
    }

    async fn create_board_from_source(&self, syllabus_id: SyllabusId) -> Result<Board, AppError> {
        if let Some(existing) = repository::find_board_by_syllabus(&self.db, syllabus_id).await? {
            warn!("syllabus {} already has board {}", syllabus_id, existing);
            return Err(AppError::Conflict(
                "A board already exists for this syllabus.".to_string(),
            ));
        }

        let generated = self.generator.generate(syllabus_id).await?;
        let board = repository::insert_board(
            &self.db,
            &generated.title,
            Some(syllabus_id),
            default_columns(generated.task_titles),
        )
        .await?;
        info!(
            "generated board {} from syllabus {} with {} tasks",
            board.id,
            syllabus_id,
            board.tasks().count()
        );
        Ok(board)
    }

    async fn delete_board(&self, board_id: BoardId) -> Result<(), AppError> {
        if repository::delete_board(&self.db, board_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("board {}", board_id)))
        }
    }

    async fn fetch_all_tasks(&self) -> Result<Vec<Task>, AppError> {
        repository::fetch_all_tasks(&self.db).await
    }

    async fn fetch_challenges(&self) -> Result<Vec<Challenge>, AppError> {
        repository::fetch_challenges(&self.db).await
    }

    async fn create_challenge(&self, request: &NewChallengeRequest) -> Result<Challenge, AppError> {
        repository::insert_challenge(&self.db, request).await
    }

    async fn update_challenge(
        &self,
        challenge_id: ChallengeId,
        request: &UpdateChallengeRequest,
    ) -> Result<Challenge, AppError> {
        repository::update_challenge(&self.db, challenge_id, request)
            .await?
            .ok_or_else(|| AppError::not_found(format!("challenge {}", challenge_id)))
    }

    async fn delete_challenge(&self, challenge_id: ChallengeId) -> Result<(), AppError> {
        if repository::delete_challenge(&self.db, challenge_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("challenge {}", challenge_id)))
        }
    }
}
