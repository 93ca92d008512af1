// HTTP surface consumed by the avatar front end

use crate::error::RelayError;
use crate::relay::{ChatRequest, Relay};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Create the relay router.
pub fn create_router(relay: Arc<Relay>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/ai", post(ai_handler))
        .route("/health", get(health_handler))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(AppState { relay })
}

async fn ai_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    async move {
        let body = match payload {
            Ok(Json(body)) => body,
            Err(rejection) => {
                warn!("Rejected /ai body: {}", rejection);
                return RelayError::InvalidMessage.into_response();
            }
        };

        let request = match ChatRequest::from_json(&body) {
            Ok(request) => request,
            Err(e) => return e.into_response(),
        };

        match state.relay.handle(request).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => {
                warn!("Relay request failed: {}", e);
                e.into_response()
            }
        }
    }
    .instrument(info_span!("relay", %request_id))
    .await
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "chat_configured": state.relay.chat_configured(),
        "speech_providers": state.relay.speech_providers(),
    }))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);
    RelayError::Internal(detail).into_response()
}
