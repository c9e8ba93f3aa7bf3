use crate::error::{format_error, HttpException, LambdaError};
use crate::event::Event;
use crate::response::{IntoResponse, Response};

use backtrace::Backtrace;
use log::{debug, error, trace};

use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

/// Result returned by request handlers wrapped with [`create_response`].
///
/// Handlers may use any error type convertible into [`anyhow::Error`] (i.e., any
/// `std::error::Error + Send + Sync + 'static`).
pub type HandlerResult<R, E = anyhow::Error> = Result<R, E>;

/// Wrap a request handler so that every invocation produces exactly one [`Response`].
///
/// The returned function accepts the same arguments as `handler`. The context argument is opaque
/// to this crate and is passed to `handler` untouched (see [`run_lambda`](crate::run_lambda),
/// which supplies the Lambda [`Context`](lambda_runtime::Context)).
///
/// Each outcome of `handler` maps to a response as follows:
///
///  * `Ok(value)`: `value.into_response()`.
///  * `Err` containing an [`HttpException`]: the exception's own response (e.g., a 404 with body
///    `{"error": "not found"}`). This is the expected way for handlers to fail.
///  * `Err` containing a [`LambdaError`]: client errors (e.g., a malformed JSON request body)
///    become a `400 Bad Request`. Other `LambdaError`s are handled like any other error.
///  * `Err` containing any other error: logged at `error` level, then rendered as a
///    `500 Internal Server Error` whose reason is the error's `Display` text.
///  * Panic: logged at `error` level, then rendered as a `500 Internal Server Error`. Panics with
///    a payload other than `String` or `&str` are resumed, since there's no message to render.
///
/// # Example
///
/// ```rust
/// use lambda_utils::{create_response, Event, HandlerResult, HttpException, PlainTextResponse};
/// use lambda_utils::StatusCode;
///
/// fn hello(event: Event, _context: ()) -> HandlerResult<PlainTextResponse> {
///   match event.query_param("name") {
///     Some(name) => Ok(PlainTextResponse::new(format!("Hello, {name}!"))),
///     None => Err(HttpException::bad_request("missing `name` query parameter").into()),
///   }
/// }
///
/// let handler = create_response(hello);
///
/// let response = handler(Event::default(), ());
/// assert_eq!(response.status_code, StatusCode::BadRequest);
/// assert_eq!(response.body, r#"{"error": "missing `name` query parameter"}"#);
/// ```
///
/// Handlers must return a value implementing [`IntoResponse`]. Anything else is rejected at
/// compile time:
///
/// ```rust,compile_fail
/// use lambda_utils::{create_response, Event, HttpException};
///
/// let handler = create_response(|_event: Event, _context: ()| Ok::<_, HttpException>(42));
/// ```
pub fn create_response<F, R, E, C>(handler: F) -> impl Fn(Event, C) -> Response
where
  F: Fn(Event, C) -> HandlerResult<R, E>,
  R: IntoResponse,
  E: Into<anyhow::Error>,
{
  move |event: Event, context: C| {
    trace!("Request: {event:#?}");

    let handler = &handler;
    let response = match catch_unwind(AssertUnwindSafe(move || handler(event, context))) {
      Ok(Ok(value)) => value.into_response(),
      Ok(Err(err)) => respond_to_handler_error(err.into()),
      Err(panic) => respond_to_lambda_error(LambdaError::Panic(
        // If the panic value isn't a String or &str, don't catch it since we can't print it and
        // it's unclear what we should do instead.
        panic_string(panic).unwrap_or_else(|panic| resume_unwind(panic)),
        // The panic doesn't carry a stack trace unless we set a panic hook, which might interfere
        // with the user's own error handling. Instead, we capture a backtrace indicating where we
        // caught the panic.
        Backtrace::new(),
      )),
    };

    trace!("Response: {response:#?}");
    response
  }
}

fn respond_to_handler_error(err: anyhow::Error) -> Response {
  let err = match err.downcast::<HttpException>() {
    Ok(exception) => {
      debug!(
        "Responding with error status {}: {}",
        exception.status_code(),
        exception.reason()
      );
      return exception.into_response();
    }
    Err(err) => err,
  };

  match err.downcast::<LambdaError>() {
    Ok(lambda_err) => respond_to_lambda_error(lambda_err),
    Err(err) => {
      error!(
        "An unhandled error occurred: {}",
        format_error(&*err, None, None)
      );
      HttpException::internal(err.to_string()).into_response()
    }
  }
}

fn respond_to_lambda_error(err: LambdaError) -> Response {
  if err.is_client_error() {
    debug!(
      "{}",
      format_error(&err, Some(&format!("LambdaError::{}", err.name())), None)
    );
  } else {
    error!(
      "An unhandled error occurred: {}",
      format_error(
        &err,
        Some(&format!("LambdaError::{}", err.name())),
        err.backtrace()
      )
    );
  }

  HttpException::from(err).into_response()
}

/// Extract the panic string after catching a panic, or return the payload if it isn't a string.
fn panic_string(panic: Box<dyn Any + Send>) -> Result<String, Box<dyn Any + Send>> {
  panic
    .downcast::<String>()
    .map(|panic| *panic)
    .or_else(|panic| panic.downcast::<&str>().map(|err| err.to_string()))
}

#[cfg(test)]
mod tests {
  use super::{create_response, HandlerResult};
  use crate::error::HttpException;
  use crate::event::Event;
  use crate::response::{Headers, JsonResponse, PlainTextResponse, Response};
  use crate::StatusCode;

  use anyhow::{anyhow, Context as _};
  use log::{Level, LevelFilter, Log, Metadata, Record};
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use std::cell::RefCell;
  use std::collections::BTreeMap;
  use std::sync::Once;

  thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
  }

  // Captures log records emitted on the current thread, so that tests running in parallel don't
  // observe each other's records.
  struct CaptureLogger;

  impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
      true
    }

    fn log(&self, record: &Record) {
      RECORDS.with(|records| {
        records
          .borrow_mut()
          .push((record.level(), record.args().to_string()))
      });
    }

    fn flush(&self) {}
  }

  static LOGGER: CaptureLogger = CaptureLogger;

  fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<(Level, String)>) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
      log::set_logger(&LOGGER).expect("logger should only be set once");
      log::set_max_level(LevelFilter::Trace);
    });

    RECORDS.with(|records| records.borrow_mut().clear());
    let output = f();
    (output, RECORDS.with(|records| records.take()))
  }

  fn error_records(records: &[(Level, String)]) -> Vec<&str> {
    records
      .iter()
      .filter(|(level, _)| *level == Level::Error)
      .map(|(_, message)| message.as_str())
      .collect()
  }

  fn json_headers() -> Headers {
    [("Content-Type".to_string(), "application/json".to_string())]
      .into_iter()
      .collect()
  }

  fn respond_ok(_event: Event, _context: ()) -> HandlerResult<PlainTextResponse> {
    Ok(PlainTextResponse::new("ok"))
  }

  fn respond_not_found(_event: Event, _context: ()) -> HandlerResult<PlainTextResponse> {
    Err(HttpException::new("not found", StatusCode::NotFound).into())
  }

  fn respond_boom(_event: Event, _context: ()) -> HandlerResult<PlainTextResponse> {
    Err(anyhow!("boom"))
  }

  #[test]
  fn test_success() {
    let handler = create_response(respond_ok);
    let (response, records) = capture_logs(|| handler(Event::default(), ()));

    assert_eq!(
      serde_json::to_value(&response).unwrap(),
      json!({
        "statusCode": 200,
        "headers": {"Content-Type": "text/plain"},
        "body": "ok",
      })
    );
    assert!(error_records(&records).is_empty());
  }

  #[test]
  fn test_http_exception() {
    let handler = create_response(respond_not_found);
    let (response, records) = capture_logs(|| handler(Event::default(), ()));

    assert_eq!(
      response,
      Response::new(
        StatusCode::NotFound,
        json_headers(),
        "{\"error\": \"not found\"}"
      )
    );
    assert!(error_records(&records).is_empty());
  }

  #[test]
  fn test_http_exception_as_handler_error_type() {
    fn respond_default_exception(
      _event: Event,
      _context: (),
    ) -> HandlerResult<PlainTextResponse, HttpException> {
      Err(HttpException::default())
    }

    let handler = create_response(respond_default_exception);

    let response = handler(Event::default(), ());
    assert_eq!(response.status_code, StatusCode::InternalServerError);
    assert_eq!(response.body, r#"{"error": "Internal server error"}"#);
  }

  #[test]
  fn test_unexpected_error() {
    let handler = create_response(respond_boom);
    let (response, records) = capture_logs(|| handler(Event::default(), ()));

    assert_eq!(
      response,
      Response::new(
        StatusCode::InternalServerError,
        json_headers(),
        r#"{"error": "boom"}"#
      )
    );

    let errors = error_records(&records);
    assert_eq!(errors, vec!["An unhandled error occurred: boom"]);
  }

  #[test]
  fn test_unexpected_error_with_context() {
    let handler = create_response(|_event: Event, _context: ()| -> HandlerResult<Response> {
      Err(anyhow!("connection refused")).context("failed to load greeting")
    });
    let (response, records) = capture_logs(|| handler(Event::default(), ()));

    assert_eq!(response.status_code, StatusCode::InternalServerError);
    assert_eq!(response.body, r#"{"error": "failed to load greeting"}"#);
    assert_eq!(
      error_records(&records),
      vec!["An unhandled error occurred: failed to load greeting\n  caused by: connection refused"]
    );
  }

  #[test]
  fn test_serialization_error_becomes_internal_error() {
    let handler = create_response(|_event: Event, _context: ()| -> HandlerResult<JsonResponse> {
      let mut content = BTreeMap::new();
      content.insert((1, 2), "tuple keys aren't valid JSON");
      Ok(JsonResponse::new(&content)?)
    });
    let (response, records) = capture_logs(|| handler(Event::default(), ()));

    assert_eq!(response.status_code, StatusCode::InternalServerError);
    assert_eq!(response.content_type(), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    let reason = body["error"].as_str().unwrap();
    assert!(
      reason.starts_with("failed to serialize") && reason.ends_with("response to JSON"),
      "{reason}"
    );

    let errors = error_records(&records);
    assert_eq!(errors.len(), 1);
    assert!(
      errors[0].starts_with("An unhandled error occurred: LambdaError::ToJsonResponse"),
      "{}",
      errors[0]
    );
    assert!(errors[0].contains("key must be a string"), "{}", errors[0]);
  }

  #[test]
  fn test_invalid_request_body_is_client_error() {
    let handler = create_response(|event: Event, _context: ()| -> HandlerResult<JsonResponse> {
      let body: BTreeMap<String, u32> = event.json_body()?;
      Ok(JsonResponse::new(&body)?)
    });
    let event = Event {
      body: "{not json".to_string(),
      ..Event::default()
    };
    let (response, records) = capture_logs(|| handler(event, ()));

    assert_eq!(response.status_code, StatusCode::BadRequest);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(
      body["error"],
      "Invalid request body: key must be a string at line 1 column 2"
    );
    assert!(error_records(&records).is_empty());
  }

  #[test]
  fn test_panic() {
    let handler = create_response(|_event: Event, _context: ()| -> HandlerResult<Response> {
      panic!("handler exploded")
    });
    let (response, records) = capture_logs(|| handler(Event::default(), ()));

    assert_eq!(response.status_code, StatusCode::InternalServerError);
    assert_eq!(
      response.body,
      r#"{"error": "request handler panicked: handler exploded"}"#
    );

    let errors = error_records(&records);
    assert_eq!(errors.len(), 1);
    assert!(
      errors[0].starts_with(
        "An unhandled error occurred: LambdaError::Panic: request handler panicked: \
         handler exploded\n  stack trace:"
      ),
      "{}",
      errors[0]
    );
  }

  #[test]
  #[should_panic]
  fn test_non_string_panic_is_resumed() {
    let handler = create_response(|_event: Event, _context: ()| -> HandlerResult<Response> {
      std::panic::panic_any(42_u32)
    });
    handler(Event::default(), ());
  }

  #[test]
  fn test_context_passed_through() {
    let handler = create_response(
      |event: Event, context: &str| -> HandlerResult<PlainTextResponse> {
        Ok(PlainTextResponse::new(format!(
          "{} {context}",
          event.raw_path
        )))
      },
    );
    let event = Event {
      raw_path: "/ctx".to_string(),
      ..Event::default()
    };
    assert_eq!(handler(event, "request-123").body, "/ctx request-123");
  }

  #[test]
  fn test_invocations_are_independent() {
    let handler = create_response(
      |event: Event, _context: ()| -> HandlerResult<PlainTextResponse> {
        match event.header("x-fail") {
          Some(reason) => Err(HttpException::bad_request(reason).into()),
          None => Ok(PlainTextResponse::new("ok").with_header("X-Path", event.raw_path.clone())),
        }
      },
    );

    let failing = Event {
      headers: [("x-fail".to_string(), "nope".to_string())]
        .into_iter()
        .collect(),
      ..Event::default()
    };
    let first = handler(failing, ());
    let second = handler(
      Event {
        raw_path: "/a".to_string(),
        ..Event::default()
      },
      (),
    );
    let third = handler(
      Event {
        raw_path: "/b".to_string(),
        ..Event::default()
      },
      (),
    );

    assert_eq!(first.status_code, StatusCode::BadRequest);
    assert_eq!(second.headers.get("X-Path").map(String::as_str), Some("/a"));
    assert_eq!(third.headers.get("X-Path").map(String::as_str), Some("/b"));
    assert_eq!(third.headers.len(), 2);
  }
}
