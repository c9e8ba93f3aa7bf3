use env_logger::Env;
use greeter::handle_request;
use lambda_utils::{create_response, run_lambda, LambdaContext};

#[tokio::main]
pub async fn main() -> Result<(), lambda_runtime::Error> {
  // TIP: Use the `log4rs` crate for more fine-grained control over logging.
  env_logger::init_from_env(Env::default().filter_or("RUST_LOG", "info"));

  run_lambda(create_response(handle_request::<LambdaContext>)).await
}
