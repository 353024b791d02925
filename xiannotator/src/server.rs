use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, instrument, warn};

use xiannotate::{error_envelope, AnnotationEngine, Annotator};

use crate::types::ANNOTATE_ROUTE;

/// Process-wide settings shared by every request handler
pub struct ServiceState<E: AnnotationEngine> {
    pub annotator: Arc<Annotator<E>>,
    /// Report failures to the client as a 400 error envelope instead of a bare 500
    pub debug: bool,
}

impl<E: AnnotationEngine> Clone for ServiceState<E> {
    fn clone(&self) -> Self {
        Self {
            annotator: Arc::clone(&self.annotator),
            debug: self.debug,
        }
    }
}

impl<E: AnnotationEngine> ServiceState<E> {
    pub fn new(annotator: Annotator<E>, debug: bool) -> Self {
        Self {
            annotator: Arc::new(annotator),
            debug,
        }
    }
}

#[instrument(level = "debug", skip_all)]
async fn annotate_full<E>(
    State(state): State<ServiceState<E>>,
    Json(request): Json<Value>,
) -> Response
where
    E: AnnotationEngine + Send + Sync + 'static,
{
    let annotator = Arc::clone(&state.annotator);
    let outcome = tokio::task::spawn_blocking(move || annotator.annotate(&request)).await;
    match outcome {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(err)) => {
            if state.debug {
                warn!("Annotation failed ({:?}): {err}", err.kind());
                (StatusCode::BAD_REQUEST, Json(error_envelope(&err))).into_response()
            } else {
                error!("Annotation failed: {}", err.trace());
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
        Err(err) => {
            error!("Annotation task did not complete: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the CORS policy: any origin, the listed request headers
pub fn cors_layer(allowed_headers: &[HeaderName]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(allowed_headers.to_vec())
}

pub fn router<E>(state: ServiceState<E>, allowed_headers: &[HeaderName]) -> Router
where
    E: AnnotationEngine + Send + Sync + 'static,
{
    info!(
        "Serving {ANNOTATE_ROUTE} (xiVersion {}, debug={})",
        state.annotator.version(),
        state.debug
    );
    Router::new()
        .route(ANNOTATE_ROUTE, post(annotate_full::<E>))
        .layer(cors_layer(allowed_headers))
        .with_state(state)
}
