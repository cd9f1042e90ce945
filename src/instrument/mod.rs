//! Request instrumentation middleware.
//!
//! Records every API call in the log sink, together with route failures and
//! responses slower than the configured threshold.

use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::errors::RouteFailure;
use crate::logsink::LogKind;
use crate::AppState;

/// Only paths under this prefix are instrumented.
pub const API_PREFIX: &str = "/api";

/// Middleware function recording API traffic in the application log.
pub async fn instrument_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !path.starts_with(API_PREFIX) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    state.log(
        LogKind::Info,
        "API request",
        json!({
            "method": method,
            "path": path,
            "query": request.uri().query(),
        }),
    );

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed();

    if let Some(RouteFailure(error)) = response.extensions().get::<RouteFailure>() {
        let kind = if response.status().is_server_error() {
            LogKind::Error
        } else {
            LogKind::Warn
        };
        state.log(
            kind,
            "Route error",
            json!({
                "method": method,
                "path": path,
                "status": response.status().as_u16(),
                "code": error.error_code(),
                "error": error.message(),
            }),
        );
    }

    if is_slow(elapsed, state.config.slow_request_threshold) {
        state.log(
            LogKind::Debug,
            "Slow response",
            json!({
                "path": path,
                "duration": format_duration(elapsed),
            }),
        );
    }

    response
}

fn is_slow(elapsed: Duration, threshold: Duration) -> bool {
    elapsed > threshold
}

fn format_duration(elapsed: Duration) -> String {
    format!("{:.2}ms", elapsed.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_slow_is_strict() {
        let threshold = Duration::from_millis(1000);
        assert!(!is_slow(Duration::from_millis(999), threshold));
        assert!(!is_slow(Duration::from_millis(1000), threshold));
        assert!(is_slow(Duration::from_millis(1001), threshold));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(1_234_567)), "1234.57ms");
        assert_eq!(format_duration(Duration::ZERO), "0.00ms");
    }
}
