mod support;

use chrono::{Duration, Utc};

use studyboard::models::{ColumnRole, NewChallengeRequest, TaskPatch, UpdateChallengeRequest};
use studyboard::remote::RemoteStore;
use studyboard::services::{ChallengeService, DeleteOutcome, Progress};
use support::{Call, FlakyStore, column};

fn request(task_ids: Vec<i64>) -> NewChallengeRequest {
    NewChallengeRequest {
        title: "Midterm sprint".to_string(),
        description: Some("Everything before week 6".to_string()),
        end_date: Some(Utc::now() + Duration::days(7)),
        task_ids,
    }
}

#[tokio::test]
async fn test_challenge_progress_follows_board_changes() {
    let store = FlakyStore::new(&["T1", "T2", "T3"]).await;
    let board = store.seed_board().await;
    let ids: Vec<i64> = column(&board, ColumnRole::Todo).tasks.iter().map(|t| t.id).collect();
    let service = ChallengeService::new(store.clone());

    let created = service.create(request(ids.clone())).await.unwrap();
    assert_eq!(created.progress.total, 3);
    assert_eq!(created.progress.percentage, 0);

    store
        .inner()
        .update_task(ids[0], &TaskPatch::completion(true))
        .await
        .unwrap();
    store.inner().delete_task(ids[2]).await.unwrap();

    let listed = service.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(
        listed[0].progress,
        Progress {
            total: 2,
            completed: 1,
            percentage: 50
        }
    );
}

#[tokio::test]
async fn test_empty_selection_is_rejected_before_any_call() {
    let store = FlakyStore::new(&["T1"]).await;
    store.seed_board().await;
    let service = ChallengeService::new(store.clone());

    let err = service.create(request(Vec::new())).await.unwrap_err();
    assert!(err.is_validation());
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_past_end_date_is_rejected() {
    let store = FlakyStore::new(&["T1"]).await;
    let board = store.seed_board().await;
    let service = ChallengeService::new(store.clone());

    let mut req = request(vec![column(&board, ColumnRole::Todo).tasks[0].id]);
    req.end_date = Some(Utc::now() - Duration::days(2));
    assert!(service.create(req).await.unwrap_err().is_validation());
    assert_eq!(store.count(Call::CreateChallenge), 0);
}

#[tokio::test]
async fn test_completed_tasks_are_not_selectable() {
    let store = FlakyStore::new(&["T1", "T2"]).await;
    let board = store.seed_board().await;
    let ids: Vec<i64> = column(&board, ColumnRole::Todo).tasks.iter().map(|t| t.id).collect();
    store
        .inner()
        .update_task(ids[1], &TaskPatch::completion(true))
        .await
        .unwrap();
    let service = ChallengeService::new(store.clone());

    let selectable = service.selectable_tasks().await.unwrap();
    assert_eq!(selectable.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[0]]);

    let err = service.create(request(ids)).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.count(Call::CreateChallenge), 0);
}

#[tokio::test]
async fn test_update_and_delete_challenge() {
    let store = FlakyStore::new(&["T1"]).await;
    let board = store.seed_board().await;
    let service = ChallengeService::new(store.clone());
    let created = service
        .create(request(vec![column(&board, ColumnRole::Todo).tasks[0].id]))
        .await
        .unwrap();

    let blank = UpdateChallengeRequest {
        title: Some(" ".to_string()),
        ..Default::default()
    };
    assert!(service.update(created.challenge.id, blank).await.unwrap_err().is_validation());

    let renamed = service
        .update(
            created.challenge.id,
            UpdateChallengeRequest {
                title: Some("Final sprint".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "Final sprint");
    assert_eq!(renamed.description, created.challenge.description);

    let kept = service.delete(&renamed, &|_: &str| false).await.unwrap();
    assert_eq!(kept, DeleteOutcome::Cancelled);
    assert_eq!(store.count(Call::DeleteChallenge), 0);

    let gone = service.delete(&renamed, &|_: &str| true).await.unwrap();
    assert_eq!(gone, DeleteOutcome::Deleted);
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_fails_when_tasks_are_unavailable() {
    let store = FlakyStore::new(&["T1"]).await;
    store.fail(Call::FetchAllTasks);
    let service = ChallengeService::new(store.clone());

    assert!(service.list().await.is_err());
}

#[tokio::test]
async fn test_detail_resolves_surviving_tasks() {
    let store = FlakyStore::new(&["T1", "T2", "T3"]).await;
    let board = store.seed_board().await;
    let ids: Vec<i64> = column(&board, ColumnRole::Todo).tasks.iter().map(|t| t.id).collect();
    let service = ChallengeService::new(store.clone());
    let created = service.create(request(ids.clone())).await.unwrap();

    store
        .inner()
        .update_task(ids[1], &TaskPatch::completion(true))
        .await
        .unwrap();
    store.inner().delete_task(ids[0]).await.unwrap();

    let detail = service.detail(created.challenge.id).await.unwrap();
    let titles: Vec<&str> = detail.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["T2", "T3"]);
    assert!(detail.tasks[0].completed);
    assert_eq!(
        detail.progress,
        Progress {
            total: 2,
            completed: 1,
            percentage: 50
        }
    );

    let err = service.detail(created.challenge.id + 100).await.unwrap_err();
    assert!(matches!(err, studyboard::error::AppError::NotFound(_)));
}
