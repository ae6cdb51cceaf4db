use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::confirm::{Confirmation, DeleteOutcome};
use super::progress::{Progress, aggregate};
use crate::error::AppError;
use crate::models::{Board, BoardId, NewBoardRequest, SyllabusId};
use crate::remote::RemoteStore;

#[derive(Debug, Clone, Serialize)]
pub struct BoardSummary {
    pub board: Board,
    pub progress: Progress,
}

impl BoardSummary {
    pub fn new(board: Board) -> Self {
        let progress = aggregate(board.tasks());
        Self { board, progress }
    }
}

/// The user's list of boards with a progress figure for each.
pub struct BoardCatalog {
    store: Arc<dyn RemoteStore>,
    boards: Vec<BoardSummary>,
}

impl BoardCatalog {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            boards: Vec::new(),
        }
    }

    pub fn boards(&self) -> &[BoardSummary] {
        &self.boards
    }

    pub async fn refresh(&mut self) -> Result<&[BoardSummary], AppError> {
        let boards = self.store.fetch_boards().await?;
        self.boards = boards.into_iter().map(BoardSummary::new).collect();
        Ok(&self.boards)
    }

    /// Completion across every task the store holds, listed or not.
    pub async fn overall_progress(&self) -> Result<Progress, AppError> {
        let tasks = self.store.fetch_all_tasks().await?;
        Ok(aggregate(&tasks))
    }

    /// A syllabus may back at most one board.
    pub fn syllabus_in_use(&self, syllabus_id: SyllabusId) -> bool {
        self.boards
            .iter()
            .any(|s| s.board.syllabus_id == Some(syllabus_id))
    }

    pub async fn create_board(&mut self, title: &str) -> Result<BoardSummary, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("board title must not be empty"));
        }

        let board = self
            .store
            .create_board(&NewBoardRequest {
                title: title.to_string(),
            })
            .await?;
        info!("board {} added to catalog", board.id);
        Ok(self.push(board))
    }

    pub async fn create_board_from_syllabus(
        &mut self,
        syllabus_id: SyllabusId,
    ) -> Result<BoardSummary, AppError> {
        if self.syllabus_in_use(syllabus_id) {
            return Err(AppError::validation(
                "this syllabus already has a board",
            ));
        }

        let board = self.store.create_board_from_source(syllabus_id).await?;
        info!("board {} generated from syllabus {}", board.id, syllabus_id);
        Ok(self.push(board))
    }

    pub async fn delete_board(
        &mut self,
        board_id: BoardId,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, AppError> {
        let index = self
            .boards
            .iter()
            .position(|s| s.board.id == board_id)
            .ok_or_else(|| AppError::validation(format!("board {} is not listed", board_id)))?;

        let prompt = format!("Delete board \"{}\"?", self.boards[index].board.title);
        if !confirmation.confirm(&prompt) {
            return Ok(DeleteOutcome::Cancelled);
        }

        self.store.delete_board(board_id).await?;
        self.boards.remove(index);
        info!("board {} deleted", board_id);
        Ok(DeleteOutcome::Deleted)
    }

    fn push(&mut self, board: Board) -> BoardSummary {
        let summary = BoardSummary::new(board);
        self.boards.push(summary.clone());
        summary
    }
}
