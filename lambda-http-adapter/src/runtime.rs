use crate::{AlbHandlerAdapter, ApiGatewayProxyRequest, DecodeEvent, Handler};

use futures::future;
use lambda_runtime::{service_fn, LambdaEvent};

/// Start the Lambda runtime and serve every invocation with the specified adapter.
///
/// Invocations the adapter fails to proxy are answered with
/// [`ProxyError::to_response`](crate::ProxyError::to_response) instead of being reported as
/// function errors; the failure has already been logged by the adapter.
///
/// # Example
///
/// ```rust,no_run
/// use lambda_http_adapter::{handler_fn, run_lambda, AlbHandlerAdapter, EventDecoder};
/// use lambda_http_adapter::{HttpRequest, ResponseWriter};
///
/// use std::io::Write;
///
/// #[tokio::main]
/// pub async fn main() {
///   env_logger::init();
///
///   let handler = handler_fn(|writer: &mut dyn ResponseWriter, _request: HttpRequest| {
///     let _ = writer.write_all(b"Hello, world!");
///   });
///
///   run_lambda(AlbHandlerAdapter::with_decoder(handler, EventDecoder::from_env())).await
/// }
/// ```
pub async fn run_lambda<H, D>(adapter: AlbHandlerAdapter<H, D>)
where
  H: Handler,
  D: DecodeEvent,
{
  lambda_runtime::run(service_fn(|event: LambdaEvent<ApiGatewayProxyRequest>| {
    let response = adapter
      .proxy_with_context(event.context, event.payload)
      .unwrap_or_else(Into::into);
    future::ok::<_, std::convert::Infallible>(response)
  }))
  .await
  .expect("Lambda run loop should never exit")
}
