use serde::Deserialize;

use crate::models::{Board, Column, ColumnRole, Task};

/// Board payload as received over the wire. Older stores do not send a
/// column role, so it is derived from the title on conversion.
#[derive(Debug, Deserialize)]
pub struct BoardDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub syllabus_id: Option<i64>,
    #[serde(default)]
    pub columns: Vec<ColumnDto>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub role: Option<ColumnRole>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl From<ColumnDto> for Column {
    fn from(dto: ColumnDto) -> Self {
        let role = dto.role.unwrap_or_else(|| ColumnRole::from_title(&dto.title));
        let mut column = Column {
            id: dto.id,
            title: dto.title,
            role,
            tasks: dto.tasks,
        };
        column.sort_by_position();
        column
    }
}

impl From<BoardDto> for Board {
    fn from(dto: BoardDto) -> Self {
        Board {
            id: dto.id,
            title: dto.title,
            syllabus_id: dto.syllabus_id,
            columns: dto.columns.into_iter().map(Column::from).collect(),
        }
    }
}
