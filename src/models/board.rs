use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::task::{ColumnId, Task, TaskId};

pub type BoardId = i64;
pub type SyllabusId = i64;

/// Semantic role of a column. Only `Done` carries completion meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Todo,
    InProgress,
    Done,
    Custom,
}

impl ColumnRole {
    /// Role for columns persisted before roles existed.
    pub fn from_title(title: &str) -> Self {
        match title.trim().to_lowercase().as_str() {
            "to do" | "todo" => ColumnRole::Todo,
            "in progress" | "doing" => ColumnRole::InProgress,
            "done" => ColumnRole::Done,
            _ => ColumnRole::Custom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Todo => "todo",
            ColumnRole::InProgress => "in_progress",
            ColumnRole::Done => "done",
            ColumnRole::Custom => "custom",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(ColumnRole::Todo),
            "in_progress" => Ok(ColumnRole::InProgress),
            "done" => Ok(ColumnRole::Done),
            "custom" => Ok(ColumnRole::Custom),
            other => Err(format!("unknown column role: {}", other)),
        }
    }
}

/// Columns every new board starts with.
pub const DEFAULT_COLUMNS: [(&str, ColumnRole); 3] = [
    ("To Do", ColumnRole::Todo),
    ("In Progress", ColumnRole::InProgress),
    ("Done", ColumnRole::Done),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub role: ColumnRole,
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn is_done(&self) -> bool {
        self.role == ColumnRole::Done
    }

    pub fn index_of(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }

    pub fn sort_by_position(&mut self) {
        self.tasks.sort_by_key(|t| t.position);
    }

    /// Rewrites positions to match list order (0..n).
    pub fn renumber(&mut self) {
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.position = index as i64;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub syllabus_id: Option<SyllabusId>,
    pub columns: Vec<Column>,
}

impl Board {
    pub fn column(&self, column_id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn column_mut(&mut self, column_id: ColumnId) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == column_id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.columns.iter().flat_map(|c| c.tasks.iter())
    }

    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks().find(|t| t.id == task_id)
    }

    /// Column index and in-column index of a task.
    pub fn locate(&self, task_id: TaskId) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(ci, c)| c.index_of(task_id).map(|ti| (ci, ti)))
    }

    pub fn sort_tasks(&mut self) {
        for column in &mut self.columns {
            column.sort_by_position();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBoardRequest {
    pub title: String,
}
