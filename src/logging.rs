use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::app::application::RunMode;

/// Install the global fmt subscriber. `RUST_LOG` wins over the mode default.
pub fn init(mode: RunMode) {
    let default = match mode {
        RunMode::Production => "info",
        RunMode::Development => "grantgate=debug,grantgate_oauth=debug,info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = match mode {
        RunMode::Production => builder.try_init(),
        RunMode::Development => builder.with_file(true).with_line_number(true).try_init(),
    };
    if let Err(err) = result {
        // already installed, e.g. by a test harness; report to that one
        debug!(error = %err, "tracing subscriber already set, keeping it");
    }
}

/// Logs one line per request: method, path, status and elapsed time.
pub async fn print_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}
