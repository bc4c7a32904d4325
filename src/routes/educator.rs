use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::quiz_dto::{CreateQuizPayload, ManagedQuiz, QuizSummary, ResultEntry},
    error::Result,
    middleware::auth::CallerIdentity,
    routes::extract::{ApiJson, ApiPath},
    services::export_service::ExportService,
    AppState,
};

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiJson(payload): ApiJson<CreateQuizPayload>,
) -> Result<impl IntoResponse> {
    let (quiz, questions) = state.quiz_service.create_quiz(payload, &caller).await?;
    let created = ManagedQuiz {
        id: quiz.id,
        title: quiz.title,
        subject: quiz.subject,
        available_from: quiz.available_from,
        available_to: quiz.available_to,
        question_count: questions.len(),
        created_at: quiz.created_at,
    };
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Quiz created successfully",
            "quiz": created
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_managed(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_managed(&caller).await?;
    Ok(Json(json!({ "success": true, "quizzes": quizzes })))
}

#[axum::debug_handler]
pub async fn get_results(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(quiz_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    let (quiz, results) = state.quiz_service.results(quiz_id, &caller).await?;
    let entries: Vec<ResultEntry> = results.iter().map(ResultEntry::from).collect();
    Ok(Json(json!({
        "success": true,
        "quiz": QuizSummary::from(quiz),
        "results": entries
    })))
}

#[axum::debug_handler]
pub async fn export_results(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(quiz_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    let (quiz, results) = state.quiz_service.results(quiz_id, &caller).await?;
    let rows = ExportService::result_rows(&quiz, &results);
    tracing::info!(%quiz_id, rows = rows.len(), "Quiz results exported");
    Ok(Json(json!({ "success": true, "rows": rows })))
}

#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiPath(quiz_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete_quiz(quiz_id, &caller).await?;
    Ok(Json(json!({ "success": true, "message": "Quiz deleted successfully" })))
}
