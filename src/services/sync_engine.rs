//! Client-side state of one open board.
//!
//! The engine owns the last confirmed board and publishes every state change
//! (optimistic, confirmed or rolled back) through a watch channel. Mutations
//! are serialized: each one holds the state lock until its remote calls have
//! resolved, so a rollback always restores the state that operation started
//! from.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

use super::confirm::{Confirmation, DeleteOutcome};
use crate::error::AppError;
use crate::models::{
    Board, BoardId, ColumnId, MoveTaskRequest, NewTaskRequest, Task, TaskId, TaskPatch,
};
use crate::remote::RemoteStore;

const NOTICE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    MoveTask,
    CreateTask,
    UpdateTask,
    DeleteTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Unloaded,
    Loading,
    Ready,
    /// The published board may be optimistic while remote calls are in flight.
    Mutating(Operation),
}

/// What presentation code sees. `version` increases with every publish.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub phase: SyncPhase,
    pub board: Option<Arc<Board>>,
    pub version: u64,
}

/// One user-facing message per finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    Saved(Operation),
    Failed { operation: Operation, message: String },
}

/// Result of applying a move locally.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub board: Board,
    /// New completion flag when the move crossed the done boundary.
    pub completion: Option<bool>,
}

#[derive(Default)]
struct EngineState {
    confirmed: Option<Arc<Board>>,
}

pub struct BoardSyncEngine {
    store: Arc<dyn RemoteStore>,
    state: Mutex<EngineState>,
    published: watch::Sender<BoardSnapshot>,
    notices: broadcast::Sender<SyncNotice>,
}

impl BoardSyncEngine {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (published, _) = watch::channel(BoardSnapshot {
            phase: SyncPhase::Unloaded,
            board: None,
            version: 0,
        });
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            store,
            state: Mutex::new(EngineState::default()),
            published,
            notices,
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.published.borrow().clone()
    }

    pub fn board(&self) -> Option<Arc<Board>> {
        self.published.borrow().board.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.published.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    pub async fn load_board(&self, board_id: BoardId) -> Result<Arc<Board>, AppError> {
        let mut state = self.state.lock().await;
        self.publish(SyncPhase::Loading, state.confirmed.clone());

        match self.store.fetch_board(board_id).await {
            Ok(mut board) => {
                board.sort_tasks();
                let board = Arc::new(board);
                info!(
                    "loaded board {} with {} tasks",
                    board.id,
                    board.tasks().count()
                );
                state.confirmed = Some(board.clone());
                self.publish(SyncPhase::Ready, Some(board.clone()));
                Ok(board)
            }
            Err(e) => {
                if matches!(e, AppError::NotFound(_)) {
                    state.confirmed = None;
                }
                self.rollback(&state, Operation::Load, &e);
                Err(e)
            }
        }
    }

    /// Moves a task, optimistically. The move call and, when the done
    /// boundary is crossed, the completion update run concurrently; if either
    /// fails the whole move is undone.
    pub async fn move_task(
        &self,
        task_id: TaskId,
        source_column_id: ColumnId,
        dest_column_id: ColumnId,
        dest_index: usize,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let confirmed = loaded(&state)?;
        let PlannedMove { board, completion } =
            plan_move(&confirmed, task_id, source_column_id, dest_column_id, dest_index)?;

        let working = Arc::new(board);
        self.publish(SyncPhase::Mutating(Operation::MoveTask), Some(working.clone()));
        debug!(
            "moving task {} from column {} to column {} at {}",
            task_id, source_column_id, dest_column_id, dest_index
        );

        let request = MoveTaskRequest {
            task_id,
            source_column_id,
            destination_column_id: dest_column_id,
            destination_index: dest_index as i64,
        };
        let move_call = self.store.move_task(confirmed.id, &request);
        let completion_call = async {
            match completion {
                Some(completed) => self
                    .store
                    .update_task(task_id, &TaskPatch::completion(completed))
                    .await
                    .map(|_| ()),
                None => Ok(()),
            }
        };
        let (moved, completed) = tokio::join!(move_call, completion_call);

        match moved.and(completed) {
            Ok(()) => {
                self.commit(&mut state, Operation::MoveTask, working);
                Ok(())
            }
            Err(e) => {
                self.rollback(&state, Operation::MoveTask, &e);
                Err(e)
            }
        }
    }

    /// Creates a task at the end of `column_id` once the store has assigned
    /// its id and position.
    pub async fn create_task(
        &self,
        column_id: ColumnId,
        title: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, AppError> {
        let mut state = self.state.lock().await;
        let confirmed = loaded(&state)?;
        if confirmed.column(column_id).is_none() {
            return Err(AppError::validation("select a column for the task"));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("task title must not be empty"));
        }

        self.publish(
            SyncPhase::Mutating(Operation::CreateTask),
            Some(confirmed.clone()),
        );
        let request = NewTaskRequest {
            title: title.to_string(),
            due_date,
        };

        match self.store.create_task(column_id, &request).await {
            Ok(task) => {
                let mut next = (*confirmed).clone();
                if let Some(column) = next.column_mut(column_id) {
                    column.tasks.push(task.clone());
                    column.sort_by_position();
                }
                self.commit(&mut state, Operation::CreateTask, Arc::new(next));
                Ok(task)
            }
            Err(e) => {
                self.rollback(&state, Operation::CreateTask, &e);
                Err(e)
            }
        }
    }

    /// Sends the fields of `patch` that differ from the local task and adopts
    /// the store's version of the task.
    pub async fn update_task(&self, task_id: TaskId, mut patch: TaskPatch) -> Result<Task, AppError> {
        let mut state = self.state.lock().await;
        let confirmed = loaded(&state)?;
        let (column_index, task_index) = confirmed
            .locate(task_id)
            .ok_or_else(|| AppError::validation(format!("task {} is not on this board", task_id)))?;

        if let Some(title) = patch.title.take() {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::validation("task title must not be empty"));
            }
            patch.title = Some(title);
        }

        let current = &confirmed.columns[column_index].tasks[task_index];
        let changes = patch.changes_from(current);
        if changes.is_empty() {
            return Ok(current.clone());
        }

        self.publish(
            SyncPhase::Mutating(Operation::UpdateTask),
            Some(confirmed.clone()),
        );

        match self.store.update_task(task_id, &changes).await {
            Ok(updated) => {
                let mut next = (*confirmed).clone();
                let column = &mut next.columns[column_index];
                column.tasks[task_index] = updated.clone();
                column.sort_by_position();
                self.commit(&mut state, Operation::UpdateTask, Arc::new(next));
                Ok(updated)
            }
            Err(e) => {
                self.rollback(&state, Operation::UpdateTask, &e);
                Err(e)
            }
        }
    }

    pub async fn delete_task(
        &self,
        task_id: TaskId,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, AppError> {
        let mut state = self.state.lock().await;
        let confirmed = loaded(&state)?;
        let (column_index, task_index) = confirmed
            .locate(task_id)
            .ok_or_else(|| AppError::validation(format!("task {} is not on this board", task_id)))?;

        let title = &confirmed.columns[column_index].tasks[task_index].title;
        if !confirmation.confirm(&format!("Delete task \"{}\"?", title)) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.publish(
            SyncPhase::Mutating(Operation::DeleteTask),
            Some(confirmed.clone()),
        );

        match self.store.delete_task(task_id).await {
            Ok(()) => {
                let mut next = (*confirmed).clone();
                let column = &mut next.columns[column_index];
                let removed = column.tasks.remove(task_index);
                for task in column.tasks.iter_mut().filter(|t| t.position > removed.position) {
                    task.position -= 1;
                }
                self.commit(&mut state, Operation::DeleteTask, Arc::new(next));
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                self.rollback(&state, Operation::DeleteTask, &e);
                Err(e)
            }
        }
    }

    fn publish(&self, phase: SyncPhase, board: Option<Arc<Board>>) {
        self.published.send_modify(|snapshot| {
            snapshot.phase = phase;
            snapshot.board = board;
            snapshot.version += 1;
        });
    }

    fn commit(&self, state: &mut EngineState, operation: Operation, board: Arc<Board>) {
        state.confirmed = Some(board.clone());
        self.publish(SyncPhase::Ready, Some(board));
        // No subscribers is fine.
        let _ = self.notices.send(SyncNotice::Saved(operation));
    }

    fn rollback(&self, state: &EngineState, operation: Operation, error: &AppError) {
        warn!("{:?} failed, restoring confirmed board: {}", operation, error);
        let phase = if state.confirmed.is_some() {
            SyncPhase::Ready
        } else {
            SyncPhase::Unloaded
        };
        self.publish(phase, state.confirmed.clone());
        let _ = self.notices.send(SyncNotice::Failed {
            operation,
            message: error.to_string(),
        });
    }
}

fn loaded(state: &EngineState) -> Result<Arc<Board>, AppError> {
    state
        .confirmed
        .clone()
        .ok_or_else(|| AppError::validation("no board is loaded"))
}

/// Applies a move to a copy of `board`.
///
/// `dest_index` is an insertion index into the destination column after the
/// task has been removed from its source. Completion follows the destination
/// column: entering a done column completes the task, leaving one reopens it.
/// Both touched columns are renumbered to dense positions.
pub fn plan_move(
    board: &Board,
    task_id: TaskId,
    source_column_id: ColumnId,
    dest_column_id: ColumnId,
    dest_index: usize,
) -> Result<PlannedMove, AppError> {
    let column_index = |id: ColumnId| {
        board
            .columns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| AppError::validation(format!("column {} is not on this board", id)))
    };
    let source = column_index(source_column_id)?;
    let dest = column_index(dest_column_id)?;

    let mut next = board.clone();
    let task_index = next.columns[source].index_of(task_id).ok_or_else(|| {
        AppError::validation(format!(
            "task {} is not in column {}",
            task_id, source_column_id
        ))
    })?;
    let mut task = next.columns[source].tasks.remove(task_index);

    let dest_len = next.columns[dest].tasks.len();
    if dest_index > dest_len {
        return Err(AppError::validation(format!(
            "destination index {} outside 0..={}",
            dest_index, dest_len
        )));
    }

    let completion = match (next.columns[dest].is_done(), task.completed) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    };
    if let Some(completed) = completion {
        task.completed = completed;
    }
    task.column_id = dest_column_id;

    next.columns[dest].tasks.insert(dest_index, task);
    next.columns[source].renumber();
    next.columns[dest].renumber();

    Ok(PlannedMove {
        board: next,
        completion,
    })
}
