use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};

use super::{ApiResult, AppState, Created, created, deleted};
use crate::store::documents::{self, Document, DocumentInput};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/documentos", get(list).post(create))
        .route("/documentos/{id}", put(update).delete(delete))
}

async fn list(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    Ok(Json(documents::list(&state.pool).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(input): Json<DocumentInput>,
) -> Created<Document> {
    Ok(created(documents::create(&state.pool, &input).await?))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<DocumentInput>,
) -> ApiResult<Document> {
    Ok(Json(documents::update(&state.pool, id, &input).await?))
}

async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<serde_json::Value> {
    documents::delete(&state.pool, id).await?;
    Ok(deleted("document deleted"))
}
