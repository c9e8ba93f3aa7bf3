use lambda_utils::{
  Event, HandlerResult, HttpException, IntoResponse, JsonResponse, PlainTextResponse, Response,
  StatusCode,
};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::str::FromStr;

/// Errors produced by the greeter API.
#[derive(Debug, Error)]
pub enum GreeterError {
  #[error("missing `name` query parameter")]
  MissingName,
  #[error("`name` must not be empty")]
  EmptyName,
  #[error("unsupported language `{0}`")]
  UnsupportedLanguage(String),
  #[error("no route for `{0}`")]
  UnknownRoute(String),
}

impl From<GreeterError> for HttpException {
  fn from(err: GreeterError) -> Self {
    let status_code = match err {
      GreeterError::MissingName
      | GreeterError::EmptyName
      | GreeterError::UnsupportedLanguage(_) => StatusCode::BadRequest,
      GreeterError::UnknownRoute(_) => StatusCode::NotFound,
    };
    HttpException::new(err.to_string(), status_code)
  }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  #[default]
  English,
  German,
  Spanish,
}

impl Language {
  fn greet(self, name: &str) -> String {
    match self {
      Language::English => format!("Hello, {name}!"),
      Language::German => format!("Hallo, {name}!"),
      Language::Spanish => format!("¡Hola, {name}!"),
    }
  }
}

impl FromStr for Language {
  type Err = GreeterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "en" | "english" => Ok(Language::English),
      "de" | "german" => Ok(Language::German),
      "es" | "spanish" => Ok(Language::Spanish),
      other => Err(GreeterError::UnsupportedLanguage(other.to_string())),
    }
  }
}

/// Request body for `POST /greetings`.
#[derive(Debug, Deserialize)]
pub struct CreateGreeting {
  pub name: String,
  #[serde(default)]
  pub language: Language,
}

/// Response body for `POST /greetings`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Greeting {
  pub message: String,
  pub language: Language,
  pub request_id: String,
}

/// Lambda entry point: dispatches on the API Gateway route key.
///
/// The Lambda context isn't needed by any route, so this accepts any context type.
pub fn handle_request<C>(event: Event, _context: C) -> HandlerResult<Response> {
  info!(
    "Handling {} ({})",
    event.route_key, event.request_context.request_id
  );

  match event.route_key.as_str() {
    "GET /hello" => Ok(hello(&event)?.into_response()),
    "POST /greetings" => Ok(create_greeting(&event)?.into_response()),
    other => Err(HttpException::from(GreeterError::UnknownRoute(other.to_string())).into()),
  }
}

fn hello(event: &Event) -> HandlerResult<PlainTextResponse, HttpException> {
  let name = event.query_param("name").ok_or(GreeterError::MissingName)?;
  let language = event
    .query_param("lang")
    .map(|lang| lang.parse::<Language>())
    .transpose()?
    .unwrap_or_default();

  Ok(PlainTextResponse::new(language.greet(&name)))
}

fn create_greeting(event: &Event) -> HandlerResult<JsonResponse> {
  let request: CreateGreeting = event.json_body()?;
  if request.name.trim().is_empty() {
    return Err(HttpException::from(GreeterError::EmptyName).into());
  }

  let greeting = Greeting {
    message: request.language.greet(&request.name),
    language: request.language,
    request_id: event.request_context.request_id.clone(),
  };

  Ok(
    JsonResponse::new(&greeting)?
      .with_status(StatusCode::Created)
      .with_header("Location", format!("/greetings/{}", greeting.request_id)),
  )
}
