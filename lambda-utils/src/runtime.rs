use crate::event::Event;
use crate::response::Response;

use futures::future;
use lambda_runtime::{service_fn, Context, LambdaEvent};

use std::convert::Infallible;

/// Start the Lambda runtime and invoke `handler` once per request.
///
/// `handler` is typically the function returned by [`create_response`](crate::create_response).
/// Since it always produces a [`Response`], the runtime never reports a function error to Lambda.
///
/// This function returns only if the runtime fails to communicate with the Lambda Runtime API.
///
/// # Example
///
/// ```rust,no_run
/// use lambda_utils::{create_response, run_lambda, Event, HandlerResult, LambdaContext};
/// use lambda_utils::PlainTextResponse;
///
/// fn hello(_event: Event, _context: LambdaContext) -> HandlerResult<PlainTextResponse> {
///   Ok(PlainTextResponse::new("Hello, world!"))
/// }
///
/// # async fn start() -> Result<(), lambda_runtime::Error> {
/// run_lambda(create_response(hello)).await
/// # }
/// ```
pub async fn run_lambda<F>(handler: F) -> Result<(), lambda_runtime::Error>
where
  F: Fn(Event, Context) -> Response,
{
  lambda_runtime::run(service_fn(|event: LambdaEvent<Event>| {
    let LambdaEvent {
      payload, context, ..
    } = event;
    log::debug!("Handling request {}", context.request_id);

    future::ready(Ok::<_, Infallible>(handler(payload, context)))
  }))
  .await
}
