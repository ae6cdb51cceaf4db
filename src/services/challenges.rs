use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use super::confirm::{Confirmation, DeleteOutcome};
use super::progress::{Progress, aggregate};
use crate::error::AppError;
use crate::models::{Challenge, ChallengeId, NewChallengeRequest, Task, TaskId, UpdateChallengeRequest};
use crate::remote::RemoteStore;

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeProgress {
    pub challenge: Challenge,
    pub progress: Progress,
}

/// A challenge with its tasks resolved. Tasks deleted since the challenge
/// was created are left out.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeDetail {
    pub challenge: Challenge,
    pub tasks: Vec<Task>,
    pub progress: Progress,
}

impl ChallengeDetail {
    pub fn resolve(challenge: Challenge, lookup: &HashMap<TaskId, Task>) -> Self {
        let mut seen = BTreeSet::new();
        let tasks: Vec<Task> = challenge
            .task_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| lookup.get(id).cloned())
            .collect();
        let progress = aggregate(&tasks);
        Self {
            challenge,
            tasks,
            progress,
        }
    }
}

pub fn task_index<I>(tasks: I) -> HashMap<TaskId, Task>
where
    I: IntoIterator<Item = Task>,
{
    tasks.into_iter().map(|t| (t.id, t)).collect()
}

/// Progress over the referenced tasks that still exist. A task deleted
/// elsewhere drops out of the total.
pub fn compute_challenge_progress(challenge: &Challenge, lookup: &HashMap<TaskId, Task>) -> Progress {
    let ids: BTreeSet<&TaskId> = challenge.task_ids.iter().collect();
    aggregate(ids.into_iter().filter_map(|id| lookup.get(id)))
}

/// Checks that need no store access.
pub fn validate_new_challenge(req: &NewChallengeRequest, today: NaiveDate) -> Result<(), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("challenge title must not be empty"));
    }
    let end_date = req
        .end_date
        .ok_or_else(|| AppError::validation("challenge end date is required"))?;
    if end_date.date_naive() < today {
        return Err(AppError::validation("challenge end date is in the past"));
    }
    if req.task_ids.is_empty() {
        return Err(AppError::validation("select at least one task"));
    }
    Ok(())
}

/// Only tasks that exist and are still open may join a new challenge.
pub fn check_selection(task_ids: &[TaskId], lookup: &HashMap<TaskId, Task>) -> Result<(), AppError> {
    for id in task_ids {
        match lookup.get(id) {
            None => return Err(AppError::validation(format!("task {} no longer exists", id))),
            Some(task) if task.completed => {
                return Err(AppError::validation(format!(
                    "task \"{}\" is already completed",
                    task.title
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

pub struct ChallengeService {
    store: Arc<dyn RemoteStore>,
}

impl ChallengeService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<ChallengeProgress>, AppError> {
        let (challenges, tasks) =
            tokio::try_join!(self.store.fetch_challenges(), self.store.fetch_all_tasks())?;
        let lookup = task_index(tasks);

        Ok(challenges
            .into_iter()
            .map(|challenge| ChallengeProgress {
                progress: compute_challenge_progress(&challenge, &lookup),
                challenge,
            })
            .collect())
    }

    pub async fn detail(&self, challenge_id: ChallengeId) -> Result<ChallengeDetail, AppError> {
        let (challenges, tasks) =
            tokio::try_join!(self.store.fetch_challenges(), self.store.fetch_all_tasks())?;
        let challenge = challenges
            .into_iter()
            .find(|c| c.id == challenge_id)
            .ok_or_else(|| AppError::not_found(format!("challenge {}", challenge_id)))?;

        Ok(ChallengeDetail::resolve(challenge, &task_index(tasks)))
    }

    /// Tasks that can be picked for a new challenge.
    pub async fn selectable_tasks(&self) -> Result<Vec<Task>, AppError> {
        let tasks = self.store.fetch_all_tasks().await?;
        Ok(tasks.into_iter().filter(|t| !t.completed).collect())
    }

    pub async fn create(&self, mut req: NewChallengeRequest) -> Result<ChallengeProgress, AppError> {
        validate_new_challenge(&req, Utc::now().date_naive())?;
        req.title = req.title.trim().to_string();

        let lookup = task_index(self.store.fetch_all_tasks().await?);
        check_selection(&req.task_ids, &lookup)?;

        let challenge = self.store.create_challenge(&req).await?;
        info!(
            "challenge {} created with {} tasks",
            challenge.id,
            challenge.task_ids.len()
        );
        Ok(ChallengeProgress {
            progress: compute_challenge_progress(&challenge, &lookup),
            challenge,
        })
    }

    pub async fn update(
        &self,
        challenge_id: ChallengeId,
        mut req: UpdateChallengeRequest,
    ) -> Result<Challenge, AppError> {
        if let Some(title) = req.title.take() {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::validation("challenge title must not be empty"));
            }
            req.title = Some(title);
        }
        self.store.update_challenge(challenge_id, &req).await
    }

    pub async fn delete(
        &self,
        challenge: &Challenge,
        confirmation: &dyn Confirmation,
    ) -> Result<DeleteOutcome, AppError> {
        let prompt = format!(
            "Are you sure you want to delete the challenge \"{}\"?",
            challenge.title
        );
        if !confirmation.confirm(&prompt) {
            return Ok(DeleteOutcome::Cancelled);
        }
        self.store.delete_challenge(challenge.id).await?;
        Ok(DeleteOutcome::Deleted)
    }
}
