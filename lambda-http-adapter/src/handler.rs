use crate::{HttpRequest, ResponseWriter};

use std::sync::Arc;

/// Synchronous HTTP request handler.
///
/// The handler writes its response into the supplied [`ResponseWriter`] rather than returning it,
/// so code written against a conventional response-writer interface can run unchanged.
pub trait Handler {
  /// Handle a single request.
  fn serve_http(&self, writer: &mut dyn ResponseWriter, request: HttpRequest);
}

impl<H> Handler for &H
where
  H: Handler + ?Sized,
{
  fn serve_http(&self, writer: &mut dyn ResponseWriter, request: HttpRequest) {
    (**self).serve_http(writer, request)
  }
}

impl<H> Handler for Box<H>
where
  H: Handler + ?Sized,
{
  fn serve_http(&self, writer: &mut dyn ResponseWriter, request: HttpRequest) {
    (**self).serve_http(writer, request)
  }
}

impl<H> Handler for Arc<H>
where
  H: Handler + ?Sized,
{
  fn serve_http(&self, writer: &mut dyn ResponseWriter, request: HttpRequest) {
    (**self).serve_http(writer, request)
  }
}

/// [`Handler`] returned by [`handler_fn`].
#[derive(Clone, Copy, Debug)]
pub struct HandlerFn<F>(F);

/// Wrap a closure or function as a [`Handler`].
///
/// # Example
///
/// ```rust
/// use lambda_http_adapter::{handler_fn, HttpRequest, ResponseWriter, StatusCode};
///
/// use std::io::Write;
///
/// let handler = handler_fn(|writer: &mut dyn ResponseWriter, _request: HttpRequest| {
///   writer.write_status(StatusCode::CREATED);
///   let _ = writer.write_all(b"created");
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
  F: Fn(&mut dyn ResponseWriter, HttpRequest),
{
  HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
  F: Fn(&mut dyn ResponseWriter, HttpRequest),
{
  fn serve_http(&self, writer: &mut dyn ResponseWriter, request: HttpRequest) {
    (self.0)(writer, request)
  }
}
