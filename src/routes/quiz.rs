use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::quiz_dto::{QuizResultView, SubmitQuizRequest, SubmitQuizResponse, TakeQuizResponse},
    error::Result,
    middleware::auth::CallerIdentity,
    routes::extract::{ApiJson, ApiPath},
    AppState,
};

#[axum::debug_handler]
pub async fn list_available(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_available().await?;
    Ok(Json(json!({ "success": true, "quizzes": quizzes })))
}

#[axum::debug_handler]
pub async fn take_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(quiz_id): ApiPath<Uuid>,
) -> Result<Json<TakeQuizResponse>> {
    let quiz = state
        .attempt_service
        .fetch_for_attempt(quiz_id, &caller.user_id)
        .await?;
    Ok(Json(TakeQuizResponse {
        success: true,
        quiz,
    }))
}

#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(quiz_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SubmitQuizRequest>,
) -> Result<Json<SubmitQuizResponse>> {
    let result = state
        .attempt_service
        .submit(quiz_id, &caller.user_id, &payload.answers)
        .await?;
    Ok(Json(SubmitQuizResponse {
        success: true,
        message: "Quiz submitted successfully".to_string(),
        result: QuizResultView::from(&result),
    }))
}
