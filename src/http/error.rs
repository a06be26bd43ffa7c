//! Handler errors and their JSON response bodies.
//!
//! Every failure a client can observe is rendered as a JSON object with at
//! least an `error` field. Internal causes are logged, never echoed.

use std::collections::BTreeMap;

use serde_json::{Value, json};
use thiserror::Error;

use super::{Method, Response, StatusCode, unix_timestamp};

/// An error returned from a route handler or produced by routing.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request was understood but rejected by validation.
    #[error("{error}")]
    BadRequest {
        error: String,
        details: Option<String>,
    },

    /// No route matches the path under any method.
    #[error("no route matches {path}")]
    NotFound {
        path: String,
        /// Registered paths grouped by method name.
        available: BTreeMap<String, Vec<String>>,
    },

    /// The path exists but not under the requested method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// Anything else. The message is logged and replaced with a generic body.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::BadRequest {
            error: error.into(),
            details: None,
        }
    }

    pub fn bad_request_with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::BadRequest {
            error: error.into(),
            details: Some(details.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BadRequest,
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
            Self::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Renders the error as a JSON response.
    pub fn into_response(self) -> Response {
        let status = self.status();
        Response::json(status, &self.body())
    }

    fn body(&self) -> Value {
        match self {
            Self::BadRequest { error, details } => match details {
                Some(details) => json!({ "error": error, "details": details }),
                None => json!({ "error": error }),
            },
            Self::NotFound { path, available } => json!({
                "error": "Endpoint not found",
                "message": format!("The path \"{path}\" does not exist"),
                "available_endpoints": available,
                "suggestion": "Check the URL and the HTTP method",
            }),
            Self::MethodNotAllowed {
                method,
                path,
                allowed,
            } => json!({
                "error": "Method not allowed",
                "message": format!("The method {method} is not allowed for {path}"),
                "allowed_methods": allowed.iter().map(Method::as_str).collect::<Vec<_>>(),
            }),
            Self::Internal(cause) => {
                tracing::error!(error = %cause, "internal server error");
                json!({
                    "error": "Internal server error",
                    "message": "An unexpected error occurred. Please try again.",
                    "timestamp": unix_timestamp(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(response: &Response) -> Value {
        serde_json::from_slice(response.body_ref()).unwrap()
    }

    #[test]
    fn bad_request_without_details() {
        let r = HttpError::bad_request("No data provided in request body").into_response();
        assert_eq!(r.status(), StatusCode::BadRequest);
        assert_eq!(
            body_of(&r),
            json!({ "error": "No data provided in request body" })
        );
    }

    #[test]
    fn bad_request_with_details() {
        let r = HttpError::bad_request_with_details("Invalid JSON", "EOF at line 1").into_response();
        let body = body_of(&r);
        assert_eq!(body["error"], "Invalid JSON");
        assert_eq!(body["details"], "EOF at line 1");
    }

    #[test]
    fn not_found_lists_endpoints() {
        let mut available = BTreeMap::new();
        available.insert("GET".to_owned(), vec!["/".to_owned(), "/api/health".to_owned()]);
        let r = HttpError::NotFound {
            path: "/nope".to_owned(),
            available,
        }
        .into_response();

        assert_eq!(r.status(), StatusCode::NotFound);
        let body = body_of(&r);
        assert_eq!(body["error"], "Endpoint not found");
        assert_eq!(body["message"], "The path \"/nope\" does not exist");
        assert_eq!(body["available_endpoints"]["GET"][1], "/api/health");
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let r = HttpError::MethodNotAllowed {
            method: Method::Get,
            path: "/api/data".to_owned(),
            allowed: vec![Method::Post],
        }
        .into_response();

        assert_eq!(r.status(), StatusCode::MethodNotAllowed);
        let body = body_of(&r);
        assert_eq!(body["message"], "The method GET is not allowed for /api/data");
        assert_eq!(body["allowed_methods"], json!(["POST"]));
    }

    #[test]
    fn internal_hides_cause() {
        let r = HttpError::Internal("db password is hunter2".to_owned()).into_response();
        assert_eq!(r.status(), StatusCode::InternalServerError);
        let text = String::from_utf8(r.body_ref().to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(body_of(&r)["timestamp"].is_number());
    }
}
