use crate::{AlbTargetGroupResponse, HeaderName, StatusCode};

// Until std::error::Backtrace is fully stabilized, we can't embed a type named `Backtrace` within
// a thiserror::Error (see https://github.com/dtolnay/thiserror/issues/204).
use backtrace::Backtrace as _Backtrace;
use itertools::Itertools;
use thiserror::Error;

use std::any::Any;

/// Status code returned to the load balancer whenever the adapter itself fails.
///
/// Neither malformed events nor broken handler output can be classified any better from inside
/// the adapter, so both are reported as an upstream timeout.
pub const FAILURE_STATUS: StatusCode = StatusCode::GATEWAY_TIMEOUT;

/// Error that occurred while converting a proxy event into an HTTP request.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DecodeError {
  /// Invalid base64 encoding for request body.
  // The base64 encoding comes from AWS, so this usually indicates a malformed test event.
  #[error("invalid base64 encoding for request body")]
  InvalidBodyBase64(#[source] Box<base64::DecodeError>, _Backtrace),
  /// The request path and query could not be assembled into a valid URI.
  #[error("invalid request URI `{uri}`")]
  InvalidUri {
    /// URI that was rejected.
    uri: String,
    /// Underlying error returned by the request builder.
    #[source]
    source: Box<http::Error>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
  /// Error raised by a custom [`DecodeEvent`](crate::DecodeEvent) implementation.
  #[error("{message}")]
  Other {
    /// Human-readable description of the failure.
    message: String,
    /// Underlying error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    /// Stack trace indicating where the error occurred.
    backtrace: _Backtrace,
  },
}

impl DecodeError {
  /// Build an [`Other`](DecodeError::Other) error from a message and an optional cause.
  pub fn other<M>(
    message: M,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
  ) -> Self
  where
    M: Into<String>,
  {
    DecodeError::Other {
      message: message.into(),
      source,
      backtrace: _Backtrace::new(),
    }
  }

  /// Return the backtrace associated with the error.
  pub fn backtrace(&self) -> &_Backtrace {
    match self {
      DecodeError::InvalidBodyBase64(_, backtrace)
      | DecodeError::InvalidUri { backtrace, .. }
      | DecodeError::Other { backtrace, .. } => backtrace,
    }
  }

  /// Return the name of the error variant (e.g., `InvalidBodyBase64`).
  pub fn name(&self) -> &str {
    match self {
      DecodeError::InvalidBodyBase64(_, _) => "InvalidBodyBase64",
      DecodeError::InvalidUri { .. } => "InvalidUri",
      DecodeError::Other { .. } => "Other",
    }
  }
}

/// Error that occurred while turning the handler's output into a structured response.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CaptureError {
  /// The joined values of a multi-valued header are not a valid header value.
  #[error("invalid joined value for response header `{0}`")]
  InvalidHeaderValue(
    HeaderName,
    #[source] Box<http::header::InvalidHeaderValue>,
    _Backtrace,
  ),
  /// Request handler panicked.
  #[error("request handler panicked: {0}")]
  Panic(String, _Backtrace),
  /// The handler returned without setting a status code or writing a body.
  #[error("status code not set on response")]
  StatusNotSet(_Backtrace),
}

impl CaptureError {
  /// Return the backtrace associated with the error.
  pub fn backtrace(&self) -> &_Backtrace {
    match self {
      CaptureError::InvalidHeaderValue(_, _, backtrace)
      | CaptureError::Panic(_, backtrace)
      | CaptureError::StatusNotSet(backtrace) => backtrace,
    }
  }

  /// Return the name of the error variant (e.g., `StatusNotSet`).
  pub fn name(&self) -> &str {
    match self {
      CaptureError::InvalidHeaderValue(_, _, _) => "InvalidHeaderValue",
      CaptureError::Panic(_, _) => "Panic",
      CaptureError::StatusNotSet(_) => "StatusNotSet",
    }
  }
}

/// Error returned by [`AlbHandlerAdapter`](crate::AlbHandlerAdapter) when an event could not be
/// proxied.
///
/// Both variants are reported to the load balancer identically (see [`FAILURE_STATUS`]); use
/// [`to_response`](ProxyError::to_response) or the `From` conversion to obtain that response.
#[derive(Debug, Error)]
pub enum ProxyError {
  /// The inbound event could not be converted into a request. The handler was not invoked.
  #[error("could not convert proxy event to request")]
  Decode(#[source] DecodeError),
  /// The handler's output could not be converted into a response.
  #[error("error while generating proxy response")]
  Capture(#[source] CaptureError),
}

impl ProxyError {
  /// Wrap a decode failure and log it.
  pub fn decode(err: DecodeError) -> Self {
    ProxyError::Decode(err).logged()
  }

  /// Wrap a capture failure and log it.
  pub fn capture(err: CaptureError) -> Self {
    ProxyError::Capture(err).logged()
  }

  fn logged(self) -> Self {
    log::error!(
      "{}",
      format_error(
        &self,
        Some(&format!("ProxyError::{}", self.name())),
        Some(self.backtrace())
      )
    );
    self
  }

  /// Return the backtrace of the underlying error.
  pub fn backtrace(&self) -> &_Backtrace {
    match self {
      ProxyError::Decode(err) => err.backtrace(),
      ProxyError::Capture(err) => err.backtrace(),
    }
  }

  /// Return the name of the error variant and its cause (e.g., `Decode::InvalidBodyBase64`).
  pub fn name(&self) -> String {
    match self {
      ProxyError::Decode(err) => format!("Decode::{}", err.name()),
      ProxyError::Capture(err) => format!("Capture::{}", err.name()),
    }
  }

  /// Build the response returned to the load balancer for this error.
  ///
  /// The status code is always [`FAILURE_STATUS`] and every other field is left empty.
  pub fn to_response(&self) -> AlbTargetGroupResponse {
    AlbTargetGroupResponse {
      status_code: FAILURE_STATUS.as_u16() as i64,
      ..Default::default()
    }
  }
}

impl From<ProxyError> for AlbTargetGroupResponse {
  fn from(err: ProxyError) -> AlbTargetGroupResponse {
    err.to_response()
  }
}

/// Extract the panic string after catching a panic, or return the payload if it isn't a string.
pub(crate) fn panic_string(panic: Box<dyn Any + Send>) -> Result<String, Box<dyn Any + Send>> {
  panic
    .downcast::<String>()
    .map(|panic| *panic)
    .or_else(|panic| panic.downcast::<&str>().map(|err| err.to_string()))
}

/// Helper function for formatting an error as a string containing a human-readable chain of causes.
///
/// This function will walk over the chain of causes returned by
/// [`Error::source`](std::error::Error::source) and append each underlying error (using the
/// [`Display`](std::fmt::Display) trait).
///
/// # Arguments
///
/// * `err` - Error to format.
/// * `name` - Optional name of the error type/variant (e.g., `ProxyError::Decode::InvalidUri`).
/// * `backtrace` - Optional [`Backtrace`](backtrace::Backtrace) indicating where the innermost
///   error occurred.
pub fn format_error(
  err: &(dyn std::error::Error),
  name: Option<&str>,
  backtrace: Option<&_Backtrace>,
) -> String {
  let err_line = name
    .map(|n| format!("{}: {}", n, err))
    .unwrap_or_else(|| err.to_string());

  let top_error = if let Some(bt) = backtrace {
    format!("{err_line}\n  stack trace:\n{}", indent_lines(&format!("{bt:?}"), 4))
  } else {
    err_line
  };

  let cause_str = std::iter::successors(err.source(), |cause| cause.source())
    .map(|cause| format!("  caused by: {cause}"))
    .join("\n");

  if !cause_str.is_empty() {
    format!("{top_error}\n{cause_str}")
  } else {
    top_error
  }
}

fn indent_lines(text: &str, indent: usize) -> String {
  let indent_str = " ".repeat(indent);
  text
    .lines()
    .map(|line| format!("{indent_str}{line}"))
    .join("\n")
}
