//! Route handlers.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Value, json};
use tokio::time::Instant;

use super::AppState;
use crate::context::Context;
use crate::http::{HttpError, Response, StatusCode, unix_timestamp};
use crate::router::HandlerResult;

const HOME_PAGE: &str = include_str!("home.html");

/// Serves the landing page at `GET /`.
pub async fn home(_ctx: Context) -> HandlerResult {
    Ok(Response::html(HOME_PAGE))
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    timestamp: f64,
    version: &'static str,
    environment: String,
    platform: String,
    cache_entries: usize,
    uptime_seconds: u64,
}

/// Liveness report for `GET /api/health`.
pub async fn health_check(_ctx: Context, state: Arc<AppState>) -> HandlerResult {
    let config = &state.config;
    let report = HealthReport {
        status: "healthy",
        timestamp: unix_timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        environment: config
            .vercel_env
            .clone()
            .unwrap_or_else(|| config.app_env.clone()),
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        cache_entries: state.cache.len(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    };
    Ok(Response::json(StatusCode::Ok, &report))
}

#[derive(Debug, Serialize)]
struct RequestInfo {
    method: String,
    path: String,
    user_agent: String,
    ip: Option<String>,
    content_type: Option<String>,
    timestamp: f64,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    vercel_env: String,
    vercel_region: String,
}

#[derive(Debug, Serialize)]
struct TestReport {
    message: &'static str,
    request_info: RequestInfo,
    server_info: ServerInfo,
}

/// Echoes what the server saw of a `GET /api/test` request.
pub async fn test_endpoint(ctx: Context, state: Arc<AppState>) -> HandlerResult {
    let request = ctx.request();
    let report = TestReport {
        message: "Test successful",
        request_info: RequestInfo {
            method: request.method().to_string(),
            path: request.path().to_owned(),
            user_agent: request
                .headers()
                .get("user-agent")
                .unwrap_or("Unknown")
                .to_owned(),
            ip: request.client_ip(),
            content_type: request.content_type().map(str::to_owned),
            timestamp: unix_timestamp(),
        },
        server_info: ServerInfo {
            vercel_env: state
                .config
                .vercel_env
                .clone()
                .unwrap_or_else(|| "local".to_owned()),
            vercel_region: state
                .config
                .vercel_region
                .clone()
                .unwrap_or_else(|| "unknown".to_owned()),
        },
    };
    Ok(Response::json(StatusCode::Ok, &report))
}

#[derive(Debug, Serialize)]
struct Metadata {
    processed_at: f64,
    processing_time_ms: f64,
    data_type: &'static str,
    data_size_bytes: usize,
    keys_count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct Summary {
    status: &'static str,
    items_processed: usize,
    validation_passed: bool,
}

#[derive(Debug, Serialize)]
struct Processed {
    input_data: Value,
    metadata: Metadata,
    processing_summary: Summary,
}

/// Validates the JSON payload of `POST /api/data` and describes it.
pub async fn process_data(ctx: Context) -> HandlerResult {
    if !ctx.request().is_json() {
        return Err(HttpError::bad_request("Content-Type must be application/json"));
    }

    let started = Instant::now();
    let data: Value = ctx
        .json()
        .map_err(|e| HttpError::bad_request_with_details("Invalid JSON", e.to_string()))?;

    if is_empty(&data) {
        return Err(HttpError::bad_request("No data provided in request body"));
    }

    let data_size_bytes = spaced_ascii_len(&data)
        .map_err(|e| HttpError::Internal(format!("re-serializing payload: {e}")))?;
    let keys_count = data.as_object().map(|object| object.len());
    let items_processed = match &data {
        Value::Object(object) => object.len(),
        Value::Array(items) => items.len(),
        Value::String(s) => s.chars().count(),
        _ => 1,
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let processed = Processed {
        metadata: Metadata {
            processed_at: unix_timestamp(),
            processing_time_ms: (elapsed_ms * 100.0).round() / 100.0,
            data_type: type_name(&data),
            data_size_bytes,
            keys_count,
        },
        processing_summary: Summary {
            status: "success",
            items_processed,
            validation_passed: true,
        },
        input_data: data,
    };

    Ok(Response::json(
        StatusCode::Ok,
        &json!({
            "success": true,
            "message": "Data processed successfully",
            "result": processed,
        }),
    ))
}

// Null, false, zero and empty containers count as "no data".
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(object) => object.is_empty(),
    }
}

// Writes `, ` and `: ` separators and escapes everything outside ASCII as
// `\uXXXX`, the conventional "spaced" JSON encoding.
struct SpacedAscii;

impl Formatter for SpacedAscii {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

// Byte length of `value` in the spaced ASCII encoding.
fn spaced_ascii_len(value: &Value) -> Result<usize, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedAscii);
    value.serialize(&mut serializer)?;
    Ok(out.len())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
