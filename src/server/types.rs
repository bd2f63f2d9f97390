//! Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};

use crate::domain::{Exercise, Module, Progress};

/// Body of `POST /users`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
}

/// Body of `POST /exercises/{id}/submit`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub submission: serde_json::Value,
}

/// `GET /modules/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct ModuleResponse {
    pub module: Module,
    pub exercises: Vec<ExerciseSummary>,
}

/// Exercise listing entry without the reference answer
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSummary {
    pub id: crate::domain::ExerciseId,
    pub title: String,
    pub description: String,
    pub kind: crate::domain::ExerciseKind,
    pub points: u32,
    pub difficulty: u8,
    pub order: i64,
}

impl From<&Exercise> for ExerciseSummary {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id.clone(),
            title: exercise.title.clone(),
            description: exercise.description.clone(),
            kind: exercise.content.kind,
            points: exercise.points,
            difficulty: exercise.difficulty,
            order: exercise.order,
        }
    }
}

/// `GET /exercises/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseResponse {
    pub exercise: Exercise,
    pub progress: Progress,
}

/// A request as seen by the router, detached from the transport
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    /// Value of the acting-user header, if sent
    pub user: Option<String>,
    pub body: String,
}

impl ApiRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            user: None,
            body: String::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, code: &str, message: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": code, "message": message.to_string() }),
        }
    }
}
