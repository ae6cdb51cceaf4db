use async_trait::async_trait;

use crate::error::AppError;
use crate::models::SyllabusId;

/// Title and task list derived from a course outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBoard {
    pub title: String,
    pub task_titles: Vec<String>,
}

/// One-shot producer of board content from a syllabus. The real producer
/// lives outside this crate.
#[async_trait]
pub trait TaskGenerator: Send + Sync {
    async fn generate(&self, syllabus_id: SyllabusId) -> Result<GeneratedBoard, AppError>;
}

pub struct NoopTaskGenerator;

#[async_trait]
impl TaskGenerator for NoopTaskGenerator {
    async fn generate(&self, syllabus_id: SyllabusId) -> Result<GeneratedBoard, AppError> {
        Ok(GeneratedBoard {
            title: format!("Syllabus {}", syllabus_id),
            task_titles: Vec::new(),
        })
    }
}
