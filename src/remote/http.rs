use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::RemoteStore;
use super::dto::BoardDto;
use crate::config::RemoteConfig;
use crate::error::{AppError, ErrorResponse};
use crate::models::{
    Board, BoardId, Challenge, ChallengeId, ColumnId, MoveTaskRequest, NewBoardRequest,
    NewChallengeRequest, NewTaskRequest, SyllabusId, Task, TaskId, TaskPatch,
    UpdateChallengeRequest,
};

/// [`RemoteStore`] over the JSON HTTP API served by `studyboard`.
pub struct HttpRemoteStore {
    client: Client,
    config: RemoteConfig,
}

impl HttpRemoteStore {
    pub fn new(config: RemoteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Adapter configured from `STUDYBOARD_API_URL` and friends.
    pub fn from_env() -> Result<Self, AppError> {
        Self::new(RemoteConfig::new_from_env()?)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let builder = self.client.request(method, url);
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, request: RequestBuilder, what: &str) -> Result<Response, AppError> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("{}: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("{}: could not read error body: {}", what, e);
                String::new()
            }
        };
        let message = error_message(status, body);
        tracing::warn!("{} rejected with {}: {}", what, status, message);
        Err(error_for_status(status, format!("{}: {}", what, message)))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, AppError> {
        self.execute(request, what)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AppError::Transport(format!("{}: malformed response: {}", what, e)))
    }
}

/// The `message` of a JSON error body, the raw body, or the status reason
/// when the body is empty.
fn error_message(status: StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        return status.canonical_reason().unwrap_or("no response body").to_string();
    }
    serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body)
}

/// Maps a non-success status onto the error taxonomy.
pub fn error_for_status(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ => AppError::Transport(message),
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_boards(&self) -> Result<Vec<Board>, AppError> {
        let boards: Vec<BoardDto> = self
            .fetch(self.request(Method::GET, "/boards"), "list boards")
            .await?;
        Ok(boards.into_iter().map(Board::from).collect())
    }

    async fn fetch_board(&self, board_id: BoardId) -> Result<Board, AppError> {
        let board: BoardDto = self
            .fetch(
                self.request(Method::GET, &format!("/boards/{}", board_id)),
                "load board",
            )
            .await?;
        Ok(board.into())
    }

    async fn move_task(&self, board_id: BoardId, request: &MoveTaskRequest) -> Result<(), AppError> {
        self.execute(
            self.request(Method::PUT, &format!("/boards/{}/move-task", board_id))
                .json(request),
            "move task",
        )
        .await?;
        Ok(())
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<Task, AppError> {
        self.fetch(
            self.request(Method::PUT, &format!("/tasks/{}", task_id)).json(patch),
            "update task",
        )
        .await
    }

    async fn create_task(&self, column_id: ColumnId, request: &NewTaskRequest) -> Result<Task, AppError> {
        self.fetch(
            self.request(Method::POST, &format!("/columns/{}/tasks", column_id))
                .json(request),
            "create task",
        )
        .await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), AppError> {
        self.execute(
            self.request(Method::DELETE, &format!("/tasks/{}", task_id)),
            "delete task",
        )
        .await?;
        Ok(())
    }

    async fn create_board(&self, request: &NewBoardRequest) -> Result<Board, AppError> {
        let board: BoardDto = self
            .fetch(
                self.request(Method::POST, "/boards").json(request),
                "create board",
            )
            .await?;
        Ok(board.into())
    }

    async fn create_board_from_source(&self, syllabus_id: SyllabusId) -> Result<Board, AppError> {
        let board: BoardDto = self
            .fetch(
                self.request(Method::POST, &format!("/syllabi/{}/board", syllabus_id)),
                "create board from syllabus",
            )
            .await?;
        Ok(board.into())
    }

    async fn delete_board(&self, board_id: BoardId) -> Result<(), AppError> {
        self.execute(
            self.request(Method::DELETE, &format!("/boards/{}", board_id)),
            "delete board",
        )
        .await?;
        Ok(())
    }

    async fn fetch_all_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.fetch(self.request(Method::GET, "/tasks"), "list tasks")
            .await
    }

    async fn fetch_challenges(&self) -> Result<Vec<Challenge>, AppError> {
        self.fetch(self.request(Method::GET, "/challenges"), "list challenges")
            .await
    }

    async fn create_challenge(&self, request: &NewChallengeRequest) -> Result<Challenge, AppError> {
        self.fetch(
            self.request(Method::POST, "/challenges").json(request),
            "create challenge",
        )
        .await
    }

    async fn update_challenge(
        &self,
        challenge_id: ChallengeId,
        request: &UpdateChallengeRequest,
    ) -> Result<Challenge, AppError> {
        self.fetch(
            self.request(Method::PUT, &format!("/challenges/{}", challenge_id))
                .json(request),
            "update challenge",
        )
        .await
    }

    async fn delete_challenge(&self, challenge_id: ChallengeId) -> Result<(), AppError> {
        self.execute(
            self.request(Method::DELETE, &format!("/challenges/{}", challenge_id)),
            "delete challenge",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_onto_taxonomy() {
        let msg = || "boom".to_string();
        assert!(matches!(error_for_status(StatusCode::NOT_FOUND, msg()), AppError::NotFound(_)));
        assert!(matches!(
            error_for_status(StatusCode::UNPROCESSABLE_ENTITY, msg()),
            AppError::Validation(_)
        ));
        assert!(matches!(error_for_status(StatusCode::CONFLICT, msg()), AppError::Conflict(_)));
        assert!(matches!(
            error_for_status(StatusCode::SERVICE_UNAVAILABLE, msg()),
            AppError::Transport(_)
        ));
    }

    #[test]
    fn error_message_falls_back_to_body_then_reason() {
        let json = r#"{"error":"400 Bad Request","message":"title must not be empty"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, json.to_string()),
            "title must not be empty"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down".to_string()),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            "Service Unavailable"
        );
    }
}
