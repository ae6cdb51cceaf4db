use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::TaskId;

pub type ChallengeId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub task_ids: Vec<TaskId>,
}

/// Form input for a new challenge. `end_date` stays optional so a missing
/// date is reported as a validation error rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChallengeRequest {
    pub title: String,
    pub description: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub task_ids: Vec<TaskId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChallengeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
