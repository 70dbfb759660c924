use echo::EchoHandler;
use lambda_http_adapter::{run_lambda, AlbHandlerAdapter, EventDecoder};

#[tokio::main]
pub async fn main() {
  env_logger::init();

  // Set LAMBDA_HTTP_ADAPTER_BASE_PATH when the load balancer forwards a path prefix.
  let adapter = AlbHandlerAdapter::with_decoder(EchoHandler, EventDecoder::from_env());

  run_lambda(adapter).await
}
