//! Routing and handlers for the HTTP API

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use super::types::{
    ApiRequest, ApiResponse, ExerciseResponse, ExerciseSummary, ModuleResponse, RegisterRequest,
    SubmitRequest,
};
use crate::domain::{ExerciseId, ModuleId, UserId};
use crate::error::LearnError;
use crate::pipeline::SubmissionPipeline;

/// Route a request to its handler
pub async fn dispatch(pipeline: &SubmissionPipeline, req: ApiRequest) -> ApiResponse {
    let path = req.path.split('?').next().unwrap_or("").trim_end_matches('/');
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (req.method.as_str(), segments.as_slice()) {
        ("GET", ["ping"]) => Ok(ApiResponse::ok(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }))),
        ("POST", ["users"]) => register(pipeline, &req.body).await,
        ("GET", ["users", "me"]) => match acting_user(&req) {
            Ok(user) => json(pipeline.views().profile(&user).await),
            Err(resp) => Ok(resp),
        },
        ("GET", ["modules"]) => json(pipeline.store().list_modules().await),
        ("GET", ["modules", id]) => module(pipeline, &ModuleId::new(*id)).await,
        ("GET", ["exercises", id]) => match acting_user(&req) {
            Ok(user) => exercise(pipeline, &user, &ExerciseId::new(*id)).await,
            Err(resp) => Ok(resp),
        },
        ("POST", ["exercises", id, "submit"]) => match acting_user(&req) {
            Ok(user) => submit(pipeline, &user, &ExerciseId::new(*id), &req.body).await,
            Err(resp) => Ok(resp),
        },
        ("GET", ["progress"]) => match acting_user(&req) {
            Ok(user) => json(pipeline.views().module_overview(&user).await),
            Err(resp) => Ok(resp),
        },
        ("GET", ["progress", "modules", id]) => match acting_user(&req) {
            Ok(user) => json(
                pipeline
                    .views()
                    .module_detail(&user, &ModuleId::new(*id))
                    .await,
            ),
            Err(resp) => Ok(resp),
        },
        ("GET", ["badges"]) => json(pipeline.store().list_badges().await),
        _ => Ok(ApiResponse::error(404, "not_found", format!("no route for {} {}", req.method, req.path))),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

/// Map a pipeline error onto an HTTP status
pub fn error_response(err: &LearnError) -> ApiResponse {
    match err {
        LearnError::NotFound { .. } => ApiResponse::error(404, "not_found", err),
        LearnError::Invalid(_) => ApiResponse::error(400, "invalid", err),
        LearnError::Conflict(_) => ApiResponse::error(409, "conflict", err),
        LearnError::Timeout { .. } | LearnError::Transient(_) => {
            ApiResponse::error(503, "unavailable", err)
        }
        LearnError::Constraint(_) | LearnError::Backend(_) | LearnError::Serde(_) => {
            error!("[learnpath:http] Internal error: {}", err);
            ApiResponse::error(500, "internal", err)
        }
    }
}

fn acting_user(req: &ApiRequest) -> Result<UserId, ApiResponse> {
    req.user
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(UserId::new)
        .ok_or_else(|| ApiResponse::error(401, "unauthenticated", "missing acting user header"))
}

fn json<T: Serialize>(result: Result<T, LearnError>) -> Result<ApiResponse, LearnError> {
    Ok(ApiResponse::ok(serde_json::to_value(result?)?))
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, LearnError> {
    serde_json::from_str(body).map_err(|e| LearnError::Invalid(format!("bad request body: {e}")))
}

async fn register(pipeline: &SubmissionPipeline, body: &str) -> Result<ApiResponse, LearnError> {
    let req: RegisterRequest = parse_body(body)?;
    let user = pipeline.register(&req.name, &req.email).await?;
    Ok(ApiResponse {
        status: 201,
        body: serde_json::to_value(user)?,
    })
}

async fn module(pipeline: &SubmissionPipeline, id: &ModuleId) -> Result<ApiResponse, LearnError> {
    let store = pipeline.store();
    let module = store
        .get_module(id)
        .await?
        .ok_or_else(|| LearnError::not_found("module", id))?;
    let exercises = store.list_exercises(id).await?;
    json(Ok(ModuleResponse {
        module,
        exercises: exercises.iter().map(ExerciseSummary::from).collect(),
    }))
}

async fn exercise(
    pipeline: &SubmissionPipeline,
    user: &UserId,
    id: &ExerciseId,
) -> Result<ApiResponse, LearnError> {
    let (mut exercise, progress) = pipeline.open_exercise(user, id).await?;
    // The reference answer stays server-side
    exercise.content.expected_output = None;
    json(Ok(ExerciseResponse { exercise, progress }))
}

async fn submit(
    pipeline: &SubmissionPipeline,
    user: &UserId,
    id: &ExerciseId,
    body: &str,
) -> Result<ApiResponse, LearnError> {
    let req: SubmitRequest = parse_body(body)?;
    json(pipeline.submit(user, id, req.submission).await)
}
