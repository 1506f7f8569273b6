//! Legacy HTTP surface: query-string and JSON `Track`, plus a health check.
//!
//! Both `/track` variants funnel into [`Gateway::track`], so they behave
//! exactly like the gRPC `Track`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::RequestContext;
use crate::error::{ErrorCode, GatewayError};
use crate::gateway::Gateway;
use crate::types::TrackRequest;

/// Build the HTTP router.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/track", get(track_query).post(track_json))
        .route("/ping", get(ping))
        .with_state(gateway)
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// HTTP rendering of a [`GatewayError`].
struct HttpError(GatewayError);

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        // nginx's "client closed request"
        ErrorCode::Canceled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::ResourceExhausted => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let body = ErrorBody {
            code: code.as_str(),
            message: self.0.to_string(),
        };
        (status_for(code), Json(body)).into_response()
    }
}

async fn track(gateway: &Gateway, req: TrackRequest) -> Result<StatusCode, HttpError> {
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let ctx = RequestContext::new(None).with_cancellation(token);
    gateway.track(&ctx, req).await.map_err(HttpError)?;
    Ok(StatusCode::OK)
}

async fn track_query(
    State(gateway): State<Arc<Gateway>>,
    Query(req): Query<TrackRequest>,
) -> Result<StatusCode, HttpError> {
    track(&gateway, req).await
}

async fn track_json(
    State(gateway): State<Arc<Gateway>>,
    Json(req): Json<TrackRequest>,
) -> Result<StatusCode, HttpError> {
    track(&gateway, req).await
}

async fn ping() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_http_statuses() {
        assert_eq!(status_for(ErrorCode::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorCode::PermissionDenied), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorCode::Canceled).as_u16(), 499);
        assert_eq!(status_for(ErrorCode::ResourceExhausted), StatusCode::SERVICE_UNAVAILABLE);
    }
}
