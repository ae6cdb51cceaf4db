use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::Task;
use crate::remote::RemoteStore;

pub const DEFAULT_DEADLINE_LIMIT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeadlineStatus {
    Overdue,
    DueToday,
    DueTomorrow,
    Upcoming,
}

impl DeadlineStatus {
    pub fn classify(due: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let due_day = due.date_naive();

        if due_day == today {
            DeadlineStatus::DueToday
        } else if due < now {
            DeadlineStatus::Overdue
        } else if today.succ_opt() == Some(due_day) {
            DeadlineStatus::DueTomorrow
        } else {
            DeadlineStatus::Upcoming
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Deadline {
    pub task: Task,
    pub due_date: DateTime<Utc>,
    pub status: DeadlineStatus,
}

/// Open tasks with a due date, soonest first.
pub fn upcoming_deadlines<I>(tasks: I, now: DateTime<Utc>, limit: usize) -> Vec<Deadline>
where
    I: IntoIterator<Item = Task>,
{
    let mut deadlines: Vec<Deadline> = tasks
        .into_iter()
        .filter(|t| !t.completed)
        .filter_map(|task| {
            let due_date = task.due_date?;
            Some(Deadline {
                status: DeadlineStatus::classify(due_date, now),
                due_date,
                task,
            })
        })
        .collect();

    deadlines.sort_by_key(|d| d.due_date);
    deadlines.truncate(limit);
    deadlines
}

pub async fn fetch_upcoming(
    store: &dyn RemoteStore,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<Deadline>, AppError> {
    let tasks = store.fetch_all_tasks().await?;
    Ok(upcoming_deadlines(tasks, now, limit))
}
