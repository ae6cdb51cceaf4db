use axum::Json;
use axum::extract::Path;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::error::AppError;
use crate::models::*;
use crate::remote::RemoteStore;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/{id}", get(get_board).delete(delete_board))
        .route("/boards/{id}/move-task", put(move_task))
        .route("/syllabi/{id}/board", post(create_board_from_syllabus))
        .route("/columns/{id}/tasks", post(create_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/challenges", get(list_challenges).post(create_challenge))
        .route("/challenges/{id}", put(update_challenge).delete(delete_challenge))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(state.store.pool()).await?;
    Ok(StatusCode::OK)
}

async fn list_boards(State(state): State<AppState>) -> Result<Json<Vec<Board>>, AppError> {
    let boards = state.store.fetch_boards().await?;
    Ok(Json(boards))
}

async fn create_board(
    State(state): State<AppState>,
    Json(req): Json<NewBoardRequest>,
) -> Result<(StatusCode, Json<Board>), AppError> {
    let board = state.store.create_board(&req).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<BoardId>,
) -> Result<Json<Board>, AppError> {
    let board = state.store.fetch_board(id).await?;
    Ok(Json(board))
}

async fn delete_board(
    State(state): State<AppState>,
    Path(id): Path<BoardId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_board(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<BoardId>,
    Json(req): Json<MoveTaskRequest>,
) -> Result<StatusCode, AppError> {
    state.store.move_task(id, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_board_from_syllabus(
    State(state): State<AppState>,
    Path(id): Path<SyllabusId>,
) -> Result<(StatusCode, Json<Board>), AppError> {
    let board = state.store.create_board_from_source(id).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

async fn create_task(
    State(state): State<AppState>,
    Path(id): Path<ColumnId>,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = state.store.create_task(id, &req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.store.fetch_all_tasks().await?;
    Ok(Json(tasks))
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, AppError> {
    let task = state.store.update_task(id, &patch).await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_challenges(State(state): State<AppState>) -> Result<Json<Vec<Challenge>>, AppError> {
    let challenges = state.store.fetch_challenges().await?;
    Ok(Json(challenges))
}

async fn create_challenge(
    State(state): State<AppState>,
    Json(req): Json<NewChallengeRequest>,
) -> Result<(StatusCode, Json<Challenge>), AppError> {
    let challenge = state.store.create_challenge(&req).await?;
    Ok((StatusCode::CREATED, Json(challenge)))
}

async fn update_challenge(
    State(state): State<AppState>,
    Path(id): Path<ChallengeId>,
    Json(req): Json<UpdateChallengeRequest>,
) -> Result<Json<Challenge>, AppError> {
    let challenge = state.store.update_challenge(id, &req).await?;
    Ok(Json(challenge))
}

async fn delete_challenge(
    State(state): State<AppState>,
    Path(id): Path<ChallengeId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_challenge(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
