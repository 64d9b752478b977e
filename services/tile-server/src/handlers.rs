//! HTTP handlers.
//!
//! The only resource is `GET /{z}/{x}/{y}`. Paths are parsed by hand in a
//! fallback handler so that every malformed address maps to 404 and every
//! other method to 405, whatever the path.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Request, State},
    http::{header, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use tile_common::{TileCoord, TileError};

use crate::governor::{ConcurrencyGovernor, Pool};
use crate::metrics;
use crate::pipeline::TilePipeline;

/// Build the service router around a pipeline.
pub fn router(pipeline: Arc<TilePipeline>) -> Router {
    let governor = pipeline.governor().clone();
    Router::new()
        .fallback(tile_handler)
        .layer(middleware::from_fn_with_state(governor, admit_client))
        .layer(Extension(pipeline))
        .layer(TraceLayer::new_for_http())
}

/// Holds a client permit for the whole lifetime of the request.
async fn admit_client(
    State(governor): State<Arc<ConcurrencyGovernor>>,
    request: Request,
    next: Next,
) -> Response {
    let _permit = match governor.acquire(Pool::Client).await {
        Ok(permit) => permit,
        Err(e) => return error_response(&e),
    };
    next.run(request).await
}

/// Parse `/{z}/{x}/{y}`. Leading and trailing slashes are ignored; each
/// segment must be a plain decimal number that fits in a `u32`.
pub fn parse_tile_path(path: &str) -> Option<TileCoord> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let [z, x, y] = segments.as_slice() else {
        return None;
    };
    Some(TileCoord::new(
        parse_segment(z)?,
        parse_segment(x)?,
        parse_segment(y)?,
    ))
}

fn parse_segment(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

pub async fn tile_handler(
    Extension(pipeline): Extension<Arc<TilePipeline>>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        return error_response(&TileError::UnsupportedMethod(method.to_string()));
    }
    let Some(coord) = parse_tile_path(uri.path()) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    metrics::record_request();
    match pipeline.render_tile(coord).await {
        Ok(png) => {
            info!(tile = %coord, bytes = png.len(), "Served tile");
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(png))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) => {
            metrics::record_error(&e);
            if e.is_client_error() {
                info!(tile = %coord, error = %e, "Rejected tile request");
            } else {
                error!(tile = %coord, error = %e, "Tile request failed");
            }
            error_response(&e)
        }
    }
}

/// Plain-text error response with the status the error maps to.
fn error_response(error: &TileError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let reason = status.canonical_reason().unwrap_or("Error");
    (status, reason).into_response()
}
