use crate::encoding::to_json;
use crate::response::{Headers, IntoResponse, Response, CONTENT_TYPE_HEADER};
use crate::StatusCode;

// Until std::error::Backtrace is fully stabilized, we can't embed a type named `Backtrace` within
// a thiserror::Error (see https://github.com/dtolnay/thiserror/issues/204).
use backtrace::Backtrace as _Backtrace;
use itertools::Itertools;
use serde::Serialize;
use serde_path_to_error::Segment;
use thiserror::Error;

use std::borrow::Cow;
use std::string::FromUtf8Error;

/// Error that a request handler raises to respond with a specific HTTP status code.
///
/// `HttpException` is both an error (handlers return it via `?`) and an [`IntoResponse`]
/// implementation. Converting it produces a JSON response with a single field, `error`:
///
/// ```json
/// {"error": "<reason>"}
/// ```
///
/// The default value is a `500 Internal Server Error` with the reason `Internal server error`.
///
/// # Example
///
/// ```rust
/// use lambda_utils::{HttpException, IntoResponse, StatusCode};
///
/// let response = HttpException::new("not found", StatusCode::NotFound).into_response();
/// assert_eq!(response.status_code, StatusCode::NotFound);
/// assert_eq!(response.body, r#"{"error": "not found"}"#);
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct HttpException {
  reason: String,
  status_code: StatusCode,
}

impl HttpException {
  /// Reason used by [`HttpException::default`].
  pub const DEFAULT_REASON: &'static str = "Internal server error";

  /// Construct an exception with the given reason and status code.
  pub fn new<R>(reason: R, status_code: StatusCode) -> Self
  where
    R: Into<String>,
  {
    Self {
      reason: reason.into(),
      status_code,
    }
  }

  /// Construct a `500 Internal Server Error` exception.
  pub fn internal<R>(reason: R) -> Self
  where
    R: Into<String>,
  {
    Self::new(reason, StatusCode::InternalServerError)
  }

  /// Construct a `400 Bad Request` exception.
  pub fn bad_request<R>(reason: R) -> Self
  where
    R: Into<String>,
  {
    Self::new(reason, StatusCode::BadRequest)
  }

  /// Construct a `404 Not Found` exception.
  pub fn not_found<R>(reason: R) -> Self
  where
    R: Into<String>,
  {
    Self::new(reason, StatusCode::NotFound)
  }

  /// Human-readable reason included in the response body.
  pub fn reason(&self) -> &str {
    &self.reason
  }

  /// HTTP status code of the response.
  pub fn status_code(&self) -> StatusCode {
    self.status_code
  }
}

impl Default for HttpException {
  fn default() -> Self {
    Self::internal(Self::DEFAULT_REASON)
  }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
  error: &'a str,
}

impl IntoResponse for HttpException {
  fn into_response(self) -> Response {
    let mut headers = Headers::new();
    headers.insert(
      CONTENT_TYPE_HEADER.to_string(),
      mime::APPLICATION_JSON.to_string(),
    );

    Response {
      status_code: self.status_code,
      headers,
      body: to_json(&ErrorBody {
        error: &self.reason,
      })
      .expect("a single string field must serialize"),
    }
  }
}

/// Error that occurred inside this crate while handling an AWS Lambda event.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LambdaError {
  /// Failed to prepare HTTP response.
  #[error("failed to prepare HTTP response")]
  HttpResponse(#[source] Box<http::Error>, _Backtrace),
  /// Invalid base64 encoding for request body.
  // The base64 encoding comes from API Gateway, so this is actually an internal error.
  #[error("invalid base64 encoding for request body")]
  InvalidBodyBase64(#[source] Box<base64::DecodeError>, _Backtrace),
  /// Failed to JSON deserialize request body.
  #[error("failed to JSON deserialize request body")]
  InvalidBodyJson(
    #[source] Box<serde_path_to_error::Error<serde_json::Error>>,
    _Backtrace,
  ),
  /// Invalid UTF-8 encoding for request body.
  #[error("invalid UTF-8 encoding for request body")]
  InvalidBodyUtf8(#[source] Box<FromUtf8Error>, _Backtrace),
  /// Request handler panicked.
  #[error("request handler panicked: {0}")]
  Panic(String, _Backtrace),
  /// Failed to serialize response body to JSON.
  #[error("failed to serialize {type_name} response to JSON")]
  ToJsonResponse {
    /// Name of the response body type that failed to serialize.
    type_name: Cow<'static, str>,
    /// Underlying error that occurred while serializing the response body.
    #[source]
    source: Box<serde_path_to_error::Error<serde_json::Error>>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
}

impl LambdaError {
  /// Return the backtrace associated with the error, if known.
  pub fn backtrace(&self) -> Option<&_Backtrace> {
    match self {
      LambdaError::HttpResponse(_, backtrace)
      | LambdaError::InvalidBodyBase64(_, backtrace)
      | LambdaError::InvalidBodyJson(_, backtrace)
      | LambdaError::InvalidBodyUtf8(_, backtrace)
      | LambdaError::Panic(_, backtrace)
      | LambdaError::ToJsonResponse { backtrace, .. } => Some(backtrace),
    }
  }

  /// Return the name of the error variant (e.g., `InvalidBodyBase64`).
  pub fn name(&self) -> &str {
    match self {
      LambdaError::HttpResponse(_, _) => "HttpResponse",
      LambdaError::InvalidBodyBase64(_, _) => "InvalidBodyBase64",
      LambdaError::InvalidBodyJson(_, _) => "InvalidBodyJson",
      LambdaError::InvalidBodyUtf8(_, _) => "InvalidBodyUtf8",
      LambdaError::Panic(_, _) => "Panic",
      LambdaError::ToJsonResponse { .. } => "ToJsonResponse",
    }
  }

  /// Whether the error was caused by the client sending an invalid request.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      LambdaError::InvalidBodyJson(_, _) | LambdaError::InvalidBodyUtf8(_, _)
    )
  }
}

impl From<LambdaError> for HttpException {
  /// Build a client-facing [`HttpException`] appropriate for the error that occurred.
  ///
  /// Errors caused by the client map to `400 Bad Request` with a human-readable reason. All
  /// other errors map to `500 Internal Server Error` with the error's `Display` text as the
  /// reason.
  fn from(err: LambdaError) -> HttpException {
    match err {
      // 400
      LambdaError::InvalidBodyJson(err, _) => HttpException::bad_request(
        // We expose parse errors to the client to provide better 400 Bad Request diagnostics.
        // Syntax errors report a path made only of unknown (`?`) segments, which isn't useful.
        if err
          .path()
          .iter()
          .all(|segment| matches!(segment, Segment::Unknown))
        {
          format!("Invalid request body: {}", err.inner())
        } else {
          format!(
            "Invalid request body (path: `{}`): {}",
            err.path(),
            err.inner()
          )
        },
      ),
      LambdaError::InvalidBodyUtf8(_, _) => {
        HttpException::bad_request("Request body must be UTF-8 encoded")
      }
      // 500
      err @ (LambdaError::HttpResponse(_, _)
      | LambdaError::InvalidBodyBase64(_, _)
      | LambdaError::Panic(_, _)
      | LambdaError::ToJsonResponse { .. }) => HttpException::internal(err.to_string()),
    }
  }
}

/// Helper function for formatting an error as a string containing a human-readable chain of causes.
///
/// This function will walk over the chain of causes returned by
/// [`Error::source`](std::error::Error::source) and append each underlying error (using the
/// [`Display`](std::fmt::Display) trait).
///
/// # Arguments
///
/// * `err` - Error to format.
/// * `name` - Optional name of the error type/variant (e.g., `LambdaError::Panic`).
/// * `backtrace` - Optional [`Backtrace`](backtrace::Backtrace) indicating where the top-level
///   error occurred.
pub fn format_error(
  err: &(dyn std::error::Error),
  name: Option<&str>,
  backtrace: Option<&_Backtrace>,
) -> String {
  let mut lines = vec![match name {
    Some(name) => format!("{name}: {err}"),
    None => err.to_string(),
  }];

  if let Some(bt) = backtrace {
    lines.push("  stack trace:".to_string());
    lines.extend(
      format!("{bt:?}")
        .lines()
        .map(|line| format!("    {line}")),
    );
  }

  lines.extend(ErrorCauseIterator(err.source()).map(|cause| format!("  caused by: {cause}")));

  lines.into_iter().join("\n")
}

struct ErrorCauseIterator<'a>(Option<&'a (dyn std::error::Error + 'static)>);

impl<'a> Iterator for ErrorCauseIterator<'a> {
  type Item = &'a (dyn std::error::Error + 'static);

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.0;
    self.0 = current.and_then(|err| err.source());
    current
  }
}
