pub mod board;
pub mod challenge;
pub mod task;

pub use board::{Board, BoardId, Column, ColumnRole, NewBoardRequest, SyllabusId, DEFAULT_COLUMNS};
pub use challenge::{Challenge, ChallengeId, NewChallengeRequest, UpdateChallengeRequest};
pub use task::{ColumnId, MoveTaskRequest, NewTaskRequest, Priority, Task, TaskId, TaskPatch};
