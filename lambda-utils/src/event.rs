use crate::error::LambdaError;
use crate::response::Headers;

use backtrace::Backtrace;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use std::borrow::Cow;

/// HTTP details of the incoming request.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Http {
  /// HTTP method (e.g., `GET`, `POST`).
  pub method: String,
  /// Path of the requested resource.
  pub path: String,
  /// Protocol used for the request (e.g., `HTTP/1.1`).
  pub protocol: String,
  /// IP address of the client making the request.
  pub source_ip: String,
  /// User agent of the client making the request.
  pub user_agent: String,
}

/// API Gateway context of the incoming request.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
  /// AWS account ID that owns the API.
  pub account_id: String,
  /// API identifier.
  pub api_id: String,
  /// Full domain name of the API.
  pub domain_name: String,
  /// First label of the domain name.
  pub domain_prefix: String,
  /// HTTP details of the request.
  pub http: Http,
  /// Unique identifier of the request.
  pub request_id: String,
  /// Route key that matched the request (e.g., `GET /pets/{id}`).
  pub route_key: String,
  /// API stage (e.g., `$default`, `prod`).
  pub stage: String,
  /// Time the request was received, in human-readable format (e.g., `12/Mar/2020:19:03:58 +0000`).
  pub time: String,
  /// Time the request was received, in milliseconds since the Unix epoch.
  pub time_epoch: i64,
}

impl RequestContext {
  /// Time the request was received, or `None` if `timeEpoch` is out of range.
  pub fn received_at(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(self.time_epoch).single()
  }
}

/// Request passed to a Lambda function by an API Gateway HTTP API (payload format 2.0).
///
/// Events are constructed by the Lambda runtime once per invocation and are never modified by
/// this crate.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  /// Version of the event format (`2.0`).
  pub version: String,
  /// Route key that matched the request.
  pub route_key: String,
  /// Raw request path (e.g., `/pets/123`).
  pub raw_path: String,
  /// Raw query string, without the leading `?`.
  #[serde(default)]
  pub raw_query_string: String,
  /// HTTP request headers.
  ///
  /// API Gateway lowercases header names, but [`Event::header`] matches names
  /// case-insensitively regardless.
  #[serde(default)]
  pub headers: Headers,
  /// API Gateway request context.
  pub request_context: RequestContext,
  /// Request body, base64-encoded if [`is_base64_encoded`](Event::is_base64_encoded) is set.
  #[serde(default)]
  pub body: String,
  /// Whether [`body`](Event::body) is base64-encoded.
  #[serde(default)]
  pub is_base64_encoded: bool,
}

impl Event {
  /// Return the value of the named request header (matched case-insensitively).
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }

  /// Parse the raw query string into percent-decoded `(key, value)` pairs.
  ///
  /// Pairs are returned in the order they appear, and repeated keys are preserved. A key without
  /// an `=` has an empty value.
  pub fn query_params(&self) -> Vec<(String, String)> {
    self
      .raw_query_string
      .split('&')
      .filter(|pair| !pair.is_empty())
      .map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode_query_component(key), decode_query_component(value))
      })
      .collect()
  }

  /// Return the first value of the named query parameter.
  pub fn query_param(&self, name: &str) -> Option<String> {
    self
      .query_params()
      .into_iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value)
  }

  /// Return the request body bytes, decoding base64 if necessary.
  pub fn body_bytes(&self) -> Result<Cow<'_, [u8]>, LambdaError> {
    if self.is_base64_encoded {
      base64::engine::general_purpose::STANDARD
        .decode(&self.body)
        .map(Cow::Owned)
        .map_err(|err| LambdaError::InvalidBodyBase64(Box::new(err), Backtrace::new()))
    } else {
      Ok(Cow::Borrowed(self.body.as_bytes()))
    }
  }

  /// Return the request body as UTF-8 text, decoding base64 if necessary.
  pub fn body_text(&self) -> Result<Cow<'_, str>, LambdaError> {
    match self.body_bytes()? {
      // Unencoded bodies are already valid UTF-8.
      Cow::Borrowed(_) => Ok(Cow::Borrowed(self.body.as_str())),
      Cow::Owned(bytes) => String::from_utf8(bytes)
        .map(Cow::Owned)
        .map_err(|err| LambdaError::InvalidBodyUtf8(Box::new(err), Backtrace::new())),
    }
  }

  /// Deserialize the request body as JSON.
  ///
  /// On failure, the returned [`LambdaError::InvalidBodyJson`] identifies the path within the
  /// body that failed to deserialize.
  pub fn json_body<T>(&self) -> Result<T, LambdaError>
  where
    T: DeserializeOwned,
  {
    let body = self.body_bytes()?;
    log::trace!("Request body: {}", String::from_utf8_lossy(&body));

    serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&body))
      .map_err(|err| LambdaError::InvalidBodyJson(Box::new(err), Backtrace::new()))
  }
}

fn decode_query_component(component: &str) -> String {
  let component = component.replace('+', " ");
  String::from_utf8_lossy(&urlencoding::decode_binary(component.as_bytes())).into_owned()
}
