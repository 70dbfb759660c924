use crate::capture::{CapturedResponse, ResponseCapturer};
use crate::decode::{DecodeEvent, EventDecoder};
use crate::error::{panic_string, CaptureError, DecodeError, ProxyError};
use crate::{
  AlbTargetGroupResponse, ApiGatewayProxyRequest, Handler, HeaderMap, HeaderValue, HttpRequest,
  LambdaContext,
};

use backtrace::Backtrace;

/// Separator used to flatten multi-valued response headers into the single-valued header map.
pub const HEADER_VALUE_SEPARATOR: u8 = b';';

/// Message recorded in [`CaptureError::Panic`] when the panic payload isn't a string.
pub const NON_STRING_PANIC: &str = "non-string panic payload";

/// Runs an HTTP [`Handler`] for gateway proxy events and answers with Application Load Balancer
/// target group responses.
///
/// The adapter holds no per-call state, so a single instance may serve concurrent invocations as
/// long as the handler and decoder are themselves `Sync`.
#[derive(Clone, Debug)]
pub struct AlbHandlerAdapter<H, D = EventDecoder> {
  handler: H,
  decoder: D,
}

impl<H> AlbHandlerAdapter<H>
where
  H: Handler,
{
  /// Create an adapter using the default [`EventDecoder`].
  pub fn new(handler: H) -> Self {
    Self::with_decoder(handler, EventDecoder::default())
  }
}

impl<H, D> AlbHandlerAdapter<H, D>
where
  H: Handler,
  D: DecodeEvent,
{
  /// Create an adapter using a custom event decoder.
  pub fn with_decoder(handler: H, decoder: D) -> Self {
    Self { handler, decoder }
  }

  /// The wrapped handler.
  pub fn handler(&self) -> &H {
    &self.handler
  }

  /// The event decoder.
  pub fn decoder(&self) -> &D {
    &self.decoder
  }

  /// Convert `event` into a request, send it to the handler and return the handler's response.
  ///
  /// On error, the handler's response is unavailable and the caller should reply with
  /// [`ProxyError::to_response`] (a `504 Gateway Timeout`). The error has already been logged.
  pub fn proxy(
    &self,
    event: ApiGatewayProxyRequest,
  ) -> Result<AlbTargetGroupResponse, ProxyError> {
    self.proxy_internal(self.decoder.decode(event, None))
  }

  /// Same as [`proxy`](Self::proxy), but attaches the Lambda invocation context to the request so
  /// the handler can observe the invocation deadline (see
  /// [`RequestExt::remaining_time`](crate::RequestExt::remaining_time)).
  pub fn proxy_with_context(
    &self,
    lambda_context: LambdaContext,
    event: ApiGatewayProxyRequest,
  ) -> Result<AlbTargetGroupResponse, ProxyError> {
    self.proxy_internal(self.decoder.decode(event, Some(lambda_context)))
  }

  fn proxy_internal(
    &self,
    request: Result<HttpRequest, DecodeError>,
  ) -> Result<AlbTargetGroupResponse, ProxyError> {
    let request = request.map_err(ProxyError::decode)?;

    log::info!("Handling HTTP {} {}", request.method(), request.uri());

    let mut capturer = ResponseCapturer::new();
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      self.handler.serve_http(&mut capturer, request)
    }))
    .map_err(|panic| {
      ProxyError::capture(CaptureError::Panic(
        // Payloads other than String or &str can't be printed, but the load balancer still
        // needs a response.
        panic_string(panic).unwrap_or_else(|_| NON_STRING_PANIC.to_string()),
        // The panic doesn't carry a stack trace unless a panic hook is installed, so this only
        // indicates where the panic was caught.
        Backtrace::new(),
      ))
    })?;

    let captured = capturer.finalize().map_err(ProxyError::capture)?;
    log::trace!("Captured response: {captured:#?}");

    to_target_group_response(captured).map_err(ProxyError::capture)
  }
}

fn to_target_group_response(
  captured: CapturedResponse,
) -> Result<AlbTargetGroupResponse, CaptureError> {
  let headers = join_multi_value_headers(&captured.headers)?;

  Ok(AlbTargetGroupResponse {
    status_code: captured.status.as_u16() as i64,
    status_description: Some(
      captured
        .status
        .canonical_reason()
        .unwrap_or_default()
        .to_string(),
    ),
    headers,
    multi_value_headers: captured.headers,
    body: Some(captured.body),
    is_base64_encoded: captured.is_base64_encoded,
  })
}

/// Flatten each header name to a single value by joining all of its values with
/// [`HEADER_VALUE_SEPARATOR`], preserving their order.
pub fn join_multi_value_headers(headers: &HeaderMap) -> Result<HeaderMap, CaptureError> {
  let mut joined = HeaderMap::with_capacity(headers.keys_len());
  for name in headers.keys() {
    let value = headers
      .get_all(name)
      .iter()
      .map(HeaderValue::as_bytes)
      .collect::<Vec<_>>()
      .join(&HEADER_VALUE_SEPARATOR);
    let value = HeaderValue::from_bytes(&value).map_err(|err| {
      CaptureError::InvalidHeaderValue(name.clone(), Box::new(err), Backtrace::new())
    })?;
    joined.insert(name.clone(), value);
  }
  Ok(joined)
}
