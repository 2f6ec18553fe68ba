//! Unified logging module for the monitoring services
//!
//! Console output always, plus an optional daily rolling file sink.
//! `RUST_LOG` takes precedence over the configured level.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Global guards for keeping file writers alive
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Target used by [`http_request_logger`]
pub const API_ACCESS_TARGET: &str = "api_access";

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as the log file prefix
    pub service_name: String,
    /// Default filter level when `RUST_LOG` is unset (e.g. "info", "debug")
    pub level: String,
    /// Emit JSON lines instead of human readable text
    pub enable_json: bool,
    /// Directory for daily rolling log files. `None` logs to console only.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            level: "info".to_string(),
            enable_json: false,
            log_dir: None,
        }
    }
}

impl LogConfig {
    /// Build the filter directive string for this config
    pub fn filter_directive(&self) -> String {
        format!("{},{}={}", self.level, API_ACCESS_TARGET, self.level)
    }
}

/// Initialize logging system with configuration
pub fn init_with_config(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(env_str) if !env_str.is_empty() => EnvFilter::try_new(env_str)?,
        _ => EnvFilter::try_new(config.filter_directive())?,
    };

    let mut layers = Vec::new();

    let console = if config.enable_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };
    layers.push(console);

    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
        let appender =
            tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
        match guards.lock() {
            Ok(mut guards) => guards.push(guard),
            Err(poisoned) => poisoned.into_inner().push(guard),
        }

        let file = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking);
        if config.enable_json {
            layers.push(file.json().boxed());
        } else {
            layers.push(file.boxed());
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Replace sensitive JSON fields with a placeholder
fn redact_sensitive_fields(json_str: &str) -> String {
    const SENSITIVE: [&str; 4] = ["password", "token", "secret", "authorization"];

    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(json_str) else {
        return json_str.to_string();
    };

    fn redact_recursive(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key = key.to_lowercase();
                    if SENSITIVE.iter().any(|s| key.contains(s)) {
                        *val = serde_json::Value::String("***REDACTED***".to_string());
                    } else {
                        redact_recursive(val);
                    }
                }
            },
            serde_json::Value::Array(items) => {
                for item in items {
                    redact_recursive(item);
                }
            },
            _ => {},
        }
    }

    redact_recursive(&mut value);
    serde_json::to_string(&value).unwrap_or_else(|_| json_str.to_string())
}

/// Truncate body string to at most `max_length` bytes on a char boundary
fn truncate_body(body: &str, max_length: usize) -> String {
    if body.len() <= max_length {
        return body.to_string();
    }
    let mut cut = max_length;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}[truncated {} bytes]", &body[..cut], body.len() - cut)
}

/// HTTP API request logger middleware
///
/// - **INFO**: POST/PUT/PATCH/DELETE requests (no body)
/// - **DEBUG**: all requests, JSON bodies truncated to 500 chars with
///   credentials redacted. Bodies without a `Content-Length` or larger than
///   64 KiB are passed through unlogged.
///
/// Add before `.with_state()`:
/// ```rust,ignore
/// let app = Router::new()
///     .layer(middleware::from_fn(common::logging::http_request_logger))
///     .with_state(state);
/// ```
#[cfg(feature = "axum")]
pub async fn http_request_logger(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use std::time::Instant;
    use tracing::{debug, info, level_enabled, Level};

    const MAX_BODY_LENGTH: usize = 500;
    const MAX_BUFFERED_BODY: usize = 64 * 1024;

    let method = req.method().clone();
    let uri = req.uri().clone();
    let is_json = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    // Only bodies with a declared, small length are buffered for the log line.
    // Anything else reaches the handler as the original stream.
    let declared_len = req
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    let bufferable = declared_len.is_some_and(|len| len <= MAX_BUFFERED_BODY);
    let modifying = matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE");
    let start = Instant::now();

    let (req, body_str) = if level_enabled!(Level::DEBUG) && modifying && is_json && bufferable {
        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
            Ok(bytes) => {
                let body_str = match std::str::from_utf8(&bytes) {
                    Ok(s) => truncate_body(&redact_sensitive_fields(s), MAX_BODY_LENGTH),
                    Err(_) => "<binary data>".to_string(),
                };
                (
                    axum::extract::Request::from_parts(parts, Body::from(bytes)),
                    Some(body_str),
                )
            },
            Err(e) => {
                tracing::warn!("Failed to read request body: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(serde_json::json!({
                        "error": "Failed to read request body",
                        "code": "BAD_REQUEST",
                        "status": 400,
                    })),
                )
                    .into_response();
            },
        }
    } else {
        (req, None)
    };

    let response = next.run(req).await;
    let duration = start.elapsed();
    let status = response.status();

    if modifying {
        info!(
            target: "api_access",
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "HTTP request"
        );
    }

    match body_str {
        Some(body) => debug!(
            target: "api_access",
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            request_body = %body,
            "HTTP request (detailed)"
        ),
        None if !modifying => debug!(
            target: "api_access",
            method = %method,
            path = %uri.path(),
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            "HTTP request"
        ),
        None => {},
    }

    response
}
