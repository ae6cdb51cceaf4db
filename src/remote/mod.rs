pub mod dto;
pub mod http;
pub mod local;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{
    Board, BoardId, Challenge, ChallengeId, ColumnId, MoveTaskRequest, NewBoardRequest,
    NewChallengeRequest, NewTaskRequest, SyllabusId, Task, TaskId, TaskPatch,
    UpdateChallengeRequest,
};

pub use http::HttpRemoteStore;
pub use local::LocalStore;

/// The persistent store behind the board engine.
///
/// Implementations fail fast and map their failures onto [`AppError`]:
/// unreachable or failing backends become `Transport`, missing entities
/// `NotFound`, rejected input `Validation`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_boards(&self) -> Result<Vec<Board>, AppError>;
    async fn fetch_board(&self, board_id: BoardId) -> Result<Board, AppError>;
    async fn move_task(&self, board_id: BoardId, request: &MoveTaskRequest) -> Result<(), AppError>;
    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<Task, AppError>;
    async fn create_task(&self, column_id: ColumnId, request: &NewTaskRequest) -> Result<Task, AppError>;
    async fn delete_task(&self, task_id: TaskId) -> Result<(), AppError>;
    async fn create_board(&self, request: &NewBoardRequest) -> Result<Board, AppError>;
    async fn create_board_from_source(&self, syllabus_id: SyllabusId) -> Result<Board, AppError>;
    async fn delete_board(&self, board_id: BoardId) -> Result<(), AppError>;
    async fn fetch_all_tasks(&self) -> Result<Vec<Task>, AppError>;
    async fn fetch_challenges(&self) -> Result<Vec<Challenge>, AppError>;
    async fn create_challenge(&self, request: &NewChallengeRequest) -> Result<Challenge, AppError>;
    async fn update_challenge(
        &self,
        challenge_id: ChallengeId,
        request: &UpdateChallengeRequest,
    ) -> Result<Challenge, AppError>;
    async fn delete_challenge(&self, challenge_id: ChallengeId) -> Result<(), AppError>;
}
