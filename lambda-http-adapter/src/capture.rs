use crate::error::CaptureError;
use crate::{Body, HeaderMap, StatusCode};

use backtrace::Backtrace;
use headers::{ContentType, HeaderMapExt};

use std::io;

/// Output sink handed to a [`Handler`](crate::Handler).
///
/// Mirrors a conventional HTTP response writer: handlers set headers through
/// [`headers_mut`](ResponseWriter::headers_mut), optionally pick a status with
/// [`write_status`](ResponseWriter::write_status), and stream the body through [`io::Write`].
pub trait ResponseWriter: io::Write {
  /// Response headers written so far.
  fn headers(&self) -> &HeaderMap;

  /// Mutable access to the response headers.
  fn headers_mut(&mut self) -> &mut HeaderMap;

  /// Status code set so far, if any.
  fn status(&self) -> Option<StatusCode>;

  /// Set the response status code.
  ///
  /// Only the first call takes effect. Writing any body bytes before calling this method implies
  /// `200 OK`.
  fn write_status(&mut self, status: StatusCode);
}

/// [`ResponseWriter`] that buffers everything the handler writes so it can be converted into a
/// load balancer response afterwards.
#[derive(Debug, Default)]
pub struct ResponseCapturer {
  status: Option<StatusCode>,
  headers: HeaderMap,
  body: Vec<u8>,
}

impl ResponseCapturer {
  /// Create an empty capturer with no status, headers or body.
  pub fn new() -> Self {
    Self::default()
  }

  /// Consume the capturer and return the handler's response.
  ///
  /// Fails with [`CaptureError::StatusNotSet`] if the handler neither set a status nor wrote a
  /// body. Bodies that aren't valid UTF-8 are returned as [`Body::Binary`] and flagged as base64
  /// encoded.
  pub fn finalize(self) -> Result<CapturedResponse, CaptureError> {
    let status = self
      .status
      .ok_or_else(|| CaptureError::StatusNotSet(Backtrace::new()))?;

    let (body, is_base64_encoded) = match String::from_utf8(self.body) {
      Ok(text) => (Body::Text(text), false),
      Err(err) => (Body::Binary(err.into_bytes()), true),
    };

    Ok(CapturedResponse {
      status,
      headers: self.headers,
      body,
      is_base64_encoded,
    })
  }
}

impl ResponseWriter for ResponseCapturer {
  fn headers(&self) -> &HeaderMap {
    &self.headers
  }

  fn headers_mut(&mut self) -> &mut HeaderMap {
    &mut self.headers
  }

  fn status(&self) -> Option<StatusCode> {
    self.status
  }

  fn write_status(&mut self, status: StatusCode) {
    match self.status {
      Some(current) => {
        log::warn!("ignoring superfluous status {status}; response status is already {current}")
      }
      None => self.status = Some(status),
    }
  }
}

impl io::Write for ResponseCapturer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    if self.status.is_none() {
      self.status = Some(StatusCode::OK);
    }

    if self.body.is_empty() && !self.headers.contains_key(http::header::CONTENT_TYPE) {
      self.headers.typed_insert(sniff_content_type(buf));
    }

    self.body.extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Guess a `Content-Type` for a response body whose handler didn't set one.
fn sniff_content_type(body: &[u8]) -> ContentType {
  match std::str::from_utf8(body) {
    Ok(text) if looks_like_html(text) => ContentType::from(mime::TEXT_HTML_UTF_8),
    Ok(_) => ContentType::from(mime::TEXT_PLAIN_UTF_8),
    Err(_) => ContentType::octet_stream(),
  }
}

fn looks_like_html(text: &str) -> bool {
  let prefix = text
    .trim_start()
    .chars()
    .take(16)
    .collect::<String>()
    .to_ascii_lowercase();
  ["<!doctype html", "<html", "<head", "<body"]
    .iter()
    .any(|tag| prefix.starts_with(tag))
}

/// Handler output after it has been finalized by [`ResponseCapturer::finalize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedResponse {
  /// Status code set by the handler (or implied by writing a body).
  pub status: StatusCode,
  /// Response headers; a name may map to several values, kept in the order they were added.
  pub headers: HeaderMap,
  /// Response body.
  pub body: Body,
  /// Whether `body` must be base64 encoded on the wire.
  pub is_base64_encoded: bool,
}
