use crate::api::routes::RelayAttempt;
use axum::extract::MatchedPath;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Logs one summary line per request: route, status, time taken and whether
/// the media host was contacted. Error details are logged by `ApiError`.
pub async fn log_request_outcome(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let route = route_label(&req);

    let response = next.run(req).await;
    let provider_called = response
        .extensions()
        .get::<RelayAttempt>()
        .map(|attempt| attempt.provider_called);

    info!(
        %method,
        %route,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        provider_called = ?provider_called,
        "Request finished"
    );

    response
}

/// Route template when axum matched one, otherwise the raw path
fn route_label<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}
