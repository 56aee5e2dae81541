//! HTTP JSON API, everything under `/api`

mod courses;
mod documents;
mod forms;
mod people;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::error;

use crate::{
    config::Config,
    form::{FormProcessor, ValueTransformer},
    store,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub processor: Arc<FormProcessor>,
    pub allowed_roles: Arc<[String]>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let processor = FormProcessor::new(
            pool.clone(),
            Arc::new(config.naming_convention()),
            config.transformer(),
        );
        Self {
            pool,
            processor: Arc::new(processor),
            allowed_roles: config.allowed_roles.clone().into(),
        }
    }

    pub fn transformer(&self) -> &ValueTransformer {
        self.processor.transformer()
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(people::routes())
        .merge(courses::routes())
        .merge(documents::routes())
        .merge(forms::routes());
    Router::new().nest("/api", api).with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] store::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        let Self::Store(error) = self;
        match error {
            store::Error::NotFound { .. } => StatusCode::NOT_FOUND,
            store::Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            store::Error::Inactive => StatusCode::FORBIDDEN,
            store::Error::Sqlx(_) | store::Error::Hash(_) | store::Error::HashTask(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal error".to_owned()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

fn created<T>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

fn deleted(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "mensaje": message }))
}
