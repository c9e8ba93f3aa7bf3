use crate::encoding::to_json;
use crate::error::LambdaError;
use crate::StatusCode;

use aws_lambda_events::apigw::ApiGatewayV2httpResponse;
use aws_lambda_events::encodings::Body;
use backtrace::Backtrace;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use mime::Mime;
use serde::{Deserialize, Serialize};

/// Name used when inserting a default `Content-Type` header.
pub(crate) const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// HTTP headers, keyed by header name.
///
/// Insertion order is preserved so that serialized responses are deterministic.
pub type Headers = IndexMap<String, String>;

/// Response returned to API Gateway.
///
/// This serializes to exactly the shape API Gateway expects from a Lambda integration:
///
/// ```json
/// {"statusCode": 200, "headers": {"Content-Type": "text/plain"}, "body": "ok"}
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
  /// HTTP status code.
  pub status_code: StatusCode,
  /// HTTP response headers.
  pub headers: Headers,
  /// Response body.
  pub body: String,
}

impl Response {
  /// Construct a response from its parts.
  pub fn new<B>(status_code: StatusCode, headers: Headers, body: B) -> Self
  where
    B: Into<String>,
  {
    Self {
      status_code,
      headers,
      body: body.into(),
    }
  }

  /// Return the value of the `Content-Type` header, if set (matched case-insensitively).
  pub fn content_type(&self) -> Option<&str> {
    find_content_type(&self.headers)
  }

  /// Convert into an [`http::Response`].
  ///
  /// Fails if any header name or value isn't valid HTTP.
  pub fn into_http(self) -> Result<http::Response<String>, LambdaError> {
    let mut builder = http::Response::builder().status(http::StatusCode::from(self.status_code));
    for (name, value) in &self.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    builder
      .body(self.body)
      .map_err(|err| LambdaError::HttpResponse(Box::new(err), Backtrace::new()))
  }
}

impl TryFrom<Response> for ApiGatewayV2httpResponse {
  type Error = LambdaError;

  fn try_from(response: Response) -> Result<Self, Self::Error> {
    let mut headers = HeaderMap::with_capacity(response.headers.len());
    for (name, value) in &response.headers {
      let name = HeaderName::try_from(name.as_str())
        .map_err(|err| LambdaError::HttpResponse(Box::new(err.into()), Backtrace::new()))?;
      let value = HeaderValue::try_from(value.as_str())
        .map_err(|err| LambdaError::HttpResponse(Box::new(err.into()), Backtrace::new()))?;
      headers.append(name, value);
    }

    Ok(ApiGatewayV2httpResponse {
      status_code: response.status_code.as_u16() as i64,
      headers,
      body: Some(Body::Text(response.body)),
      ..Default::default()
    })
  }
}

/// A value that can be converted into a [`Response`].
///
/// Request handlers wrapped by [`create_response`](crate::create_response) return implementations
/// of this trait. This crate provides [`PlainTextResponse`], [`JsonResponse`], and
/// [`HttpException`](crate::HttpException), and [`Response`] converts into itself.
pub trait IntoResponse {
  /// Convert `self` into a [`Response`] suitable for returning from the Lambda function handler.
  fn into_response(self) -> Response;
}

impl IntoResponse for Response {
  fn into_response(self) -> Response {
    self
  }
}

fn find_content_type(headers: &Headers) -> Option<&str> {
  headers
    .iter()
    .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
    .map(|(_, value)| value.as_str())
}

// Never overrides a `Content-Type` supplied by the caller, regardless of its casing.
fn finish_response(
  status_code: StatusCode,
  mut headers: Headers,
  body: String,
  default_content_type: &Mime,
) -> Response {
  if find_content_type(&headers).is_none() {
    headers.insert(
      CONTENT_TYPE_HEADER.to_string(),
      default_content_type.to_string(),
    );
  }

  Response {
    status_code,
    headers,
    body,
  }
}

macro_rules! response_builders {
  ($ty:ident) => {
    impl $ty {
      /// Set the HTTP status code (default: `200 OK`).
      pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
      }

      /// Replace the response headers.
      ///
      /// A `Content-Type` header in `headers` takes precedence over the default.
      pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
      }

      /// Add a single response header, replacing any existing header with the same name.
      ///
      /// Names are compared case-insensitively, so `content-type` replaces `Content-Type`.
      pub fn with_header<N, V>(mut self, name: N, value: V) -> Self
      where
        N: Into<String>,
        V: Into<String>,
      {
        let name = name.into();
        self
          .headers
          .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
      }

      /// HTTP status code of the response.
      pub fn status_code(&self) -> StatusCode {
        self.status_code
      }

      /// Headers explicitly set on this response (excluding the default `Content-Type`).
      pub fn headers(&self) -> &Headers {
        &self.headers
      }
    }
  };
}

/// Response with a `text/plain` body.
///
/// `Content-Type: text/plain` is set unless the caller supplies a `Content-Type` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlainTextResponse {
  content: String,
  status_code: StatusCode,
  headers: Headers,
}

impl PlainTextResponse {
  /// Construct a `200 OK` response with the given body.
  pub fn new<C>(content: C) -> Self
  where
    C: Into<String>,
  {
    Self {
      content: content.into(),
      status_code: StatusCode::Ok,
      headers: Headers::new(),
    }
  }

  /// Response body.
  pub fn content(&self) -> &str {
    &self.content
  }
}

response_builders!(PlainTextResponse);

impl IntoResponse for PlainTextResponse {
  fn into_response(self) -> Response {
    finish_response(
      self.status_code,
      self.headers,
      self.content,
      &mime::TEXT_PLAIN,
    )
  }
}

/// Response with an `application/json` body.
///
/// The body is serialized when the response is constructed, so serialization failures surface
/// immediately rather than when the response is returned. It's written on a single line with a
/// space after each separator (e.g., `{"a": [1, 2]}`). `Content-Type: application/json` is set
/// unless the caller supplies a `Content-Type` header.
///
/// # Example
///
/// ```rust
/// use lambda_utils::{IntoResponse, JsonResponse, StatusCode};
/// use serde_json::json;
///
/// let response = JsonResponse::new(&json!({"id": 1}))
///   .unwrap()
///   .with_status(StatusCode::Created)
///   .into_response();
/// assert_eq!(response.status_code, StatusCode::Created);
/// assert_eq!(response.content_type(), Some("application/json"));
/// assert_eq!(response.body, r#"{"id": 1}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonResponse {
  content: String,
  status_code: StatusCode,
  headers: Headers,
}

impl JsonResponse {
  /// Serialize `content` to JSON and construct a `200 OK` response containing it.
  ///
  /// Fails with [`LambdaError::ToJsonResponse`] if `content` can't be serialized (e.g., a map with
  /// non-string keys).
  pub fn new<T>(content: &T) -> Result<Self, LambdaError>
  where
    T: Serialize,
  {
    let content = to_json(content).map_err(|err| LambdaError::ToJsonResponse {
      type_name: std::any::type_name::<T>().into(),
      source: Box::new(err),
      backtrace: Backtrace::new(),
    })?;

    Ok(Self {
      content,
      status_code: StatusCode::Ok,
      headers: Headers::new(),
    })
  }

  /// Serialized JSON body.
  pub fn content(&self) -> &str {
    &self.content
  }
}

response_builders!(JsonResponse);

impl IntoResponse for JsonResponse {
  fn into_response(self) -> Response {
    finish_response(
      self.status_code,
      self.headers,
      self.content,
      &mime::APPLICATION_JSON,
    )
  }
}
