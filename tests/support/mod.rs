#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use studyboard::db::connect_in_memory;
use studyboard::error::AppError;
use studyboard::generator::{GeneratedBoard, TaskGenerator};
use studyboard::models::*;
use studyboard::remote::{LocalStore, RemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    FetchBoards,
    FetchBoard,
    MoveTask,
    UpdateTask,
    CreateTask,
    DeleteTask,
    CreateBoard,
    CreateBoardFromSource,
    DeleteBoard,
    FetchAllTasks,
    FetchChallenges,
    CreateChallenge,
    UpdateChallenge,
    DeleteChallenge,
}

/// Hands out the same titles for every syllabus.
pub struct FixedGenerator(pub Vec<String>);

#[async_trait]
impl TaskGenerator for FixedGenerator {
    async fn generate(&self, syllabus_id: SyllabusId) -> Result<GeneratedBoard, AppError> {
        Ok(GeneratedBoard {
            title: format!("Course {}", syllabus_id),
            task_titles: self.0.clone(),
        })
    }
}

/// A store over an in-memory database that records every call and fails
/// the ones it is told to.
pub struct FlakyStore {
    inner: LocalStore,
    failing: Mutex<HashSet<Call>>,
    calls: Mutex<Vec<Call>>,
    move_gate: Mutex<Option<Arc<Notify>>>,
}

impl FlakyStore {
    pub async fn new(todo_titles: &[&str]) -> Arc<Self> {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let generator = FixedGenerator(todo_titles.iter().map(|t| t.to_string()).collect());
        Arc::new(Self {
            inner: LocalStore::new(pool, Arc::new(generator)),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            move_gate: Mutex::new(None),
        })
    }

    pub fn inner(&self) -> &LocalStore {
        &self.inner
    }

    pub fn fail(&self, call: Call) {
        self.failing.lock().unwrap().insert(call);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Move calls wait on the returned gate until it is notified.
    pub fn hold_moves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.move_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Board generated from syllabus 1 with the constructor's titles in To Do.
    pub async fn seed_board(&self) -> Board {
        self.inner
            .create_board_from_source(1)
            .await
            .expect("Failed to seed board")
    }

    fn record(&self, call: Call) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&call) {
            Err(AppError::Transport(format!("{:?} refused", call)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn fetch_boards(&self) -> Result<Vec<Board>, AppError> {
        self.record(Call::FetchBoards)?;
        self.inner.fetch_boards().await
    }

    async fn fetch_board(&self, board_id: BoardId) -> Result<Board, AppError> {
        self.record(Call::FetchBoard)?;
        self.inner.fetch_board(board_id).await
    }

    async fn move_task(&self, board_id: BoardId, request: &MoveTaskRequest) -> Result<(), AppError> {
        let gate = self.move_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.record(Call::MoveTask)?;
        self.inner.move_task(board_id, request).await
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<Task, AppError> {
        self.record(Call::UpdateTask)?;
        self.inner.update_task(task_id, patch).await
    }

    async fn create_task(&self, column_id: ColumnId, request: &NewTaskRequest) -> Result<Task, AppError> {
        self.record(Call::CreateTask)?;
        self.inner.create_task(column_id, request).await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), AppError> {
        self.record(Call::DeleteTask)?;
        self.inner.delete_task(task_id).await
    }

    async fn create_board(&self, request: &NewBoardRequest) -> Result<Board, AppError> {
        self.record(Call::CreateBoard)?;
        self.inner.create_board(request).await
    }

    async fn create_board_from_source(&self, syllabus_id: SyllabusId) -> Result<Board, AppError> {
        self.record(Call::CreateBoardFromSource)?;
        self.inner.create_board_from_source(syllabus_id).await
    }

    async fn delete_board(&self, board_id: BoardId) -> Result<(), AppError> {
        self.record(Call::DeleteBoard)?;
        self.inner.delete_board(board_id).await
    }

    async fn fetch_all_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.record(Call::FetchAllTasks)?;
        self.inner.fetch_all_tasks().await
    }

    async fn fetch_challenges(&self) -> Result<Vec<Challenge>, AppError> {
        self.record(Call::FetchChallenges)?;
        self.inner.fetch_challenges().await
    }

    async fn create_challenge(&self, request: &NewChallengeRequest) -> Result<Challenge, AppError> {
        self.record(Call::CreateChallenge)?;
        self.inner.create_challenge(request).await
    }

    async fn update_challenge(
        &self,
        challenge_id: ChallengeId,
        request: &UpdateChallengeRequest,
    ) -> Result<Challenge, AppError> {
        self.record(Call::UpdateChallenge)?;
        self.inner.update_challenge(challenge_id, request).await
    }

    async fn delete_challenge(&self, challenge_id: ChallengeId) -> Result<(), AppError> {
        self.record(Call::DeleteChallenge)?;
        self.inner.delete_challenge(challenge_id).await
    }
}

pub fn column(board: &Board, role: ColumnRole) -> &Column {
    board
        .columns
        .iter()
        .find(|c| c.role == role)
        .expect("board has no column with that role")
}

pub fn titles(column: &Column) -> Vec<&str> {
    column.tasks.iter().map(|t| t.title.as_str()).collect()
}
