#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub use lambda_runtime::{Context as LambdaContext, LambdaEvent};

/// Error handling.
pub mod error;

pub use error::{format_error, HttpException, LambdaError};

mod encoding;

/// Typed API Gateway request.
pub mod event;

pub use event::{Event, Http, RequestContext};

mod handler;

pub use handler::{create_response, HandlerResult};

/// Response types and the [`IntoResponse`] conversion.
pub mod response;

pub use response::{Headers, IntoResponse, JsonResponse, PlainTextResponse, Response};

mod runtime;

pub use runtime::run_lambda;

/// HTTP status codes.
pub mod status_code;

pub use status_code::StatusCode;
