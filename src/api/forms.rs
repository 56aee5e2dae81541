use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use tracing::warn;

use super::AppState;
use crate::form::{FormRequest, ProcessingResult};

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/formulario-dinamico", post(submit))
}

/// 201 with the generated ids, 400 with the failure report otherwise.
///
/// A body that does not decode as a form gets the same 400 report.
async fn submit(
    State(state): State<AppState>,
    request: Result<Json<FormRequest>, JsonRejection>,
) -> (StatusCode, Json<ProcessingResult>) {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(%rejection, "undecodable form");
            let result = ProcessingResult::failure("Invalid form", vec![rejection.body_text()]);
            return (StatusCode::BAD_REQUEST, Json(result));
        }
    };
    let result = state.processor.process(&request).await;
    let status = if result.success {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(result))
}
