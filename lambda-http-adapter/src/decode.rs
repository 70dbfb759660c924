use crate::error::DecodeError;
use crate::request_ext::{PathParameters, StageVariables};
use crate::{ApiGatewayProxyRequest, Body, HttpRequest, LambdaContext};

use aws_lambda_events::query_map::QueryMap;
use backtrace::Backtrace;
use base64::Engine as _;
use itertools::Itertools;

/// Environment variable holding the host name used to build absolute request URIs.
pub const HOST_ENV_VAR: &str = "LAMBDA_HTTP_ADAPTER_HOST";

/// Environment variable holding a base path to strip from every request path.
pub const BASE_PATH_ENV_VAR: &str = "LAMBDA_HTTP_ADAPTER_BASE_PATH";

/// Converts gateway proxy events into HTTP requests.
///
/// This is the seam through which [`AlbHandlerAdapter`](crate::AlbHandlerAdapter) obtains its
/// requests; substitute it to customize or stub out decoding.
pub trait DecodeEvent {
  /// Convert `event` into a request for the handler.
  ///
  /// When `lambda_context` is provided, implementations should attach it to the request so the
  /// handler can observe the invocation deadline.
  fn decode(
    &self,
    event: ApiGatewayProxyRequest,
    lambda_context: Option<LambdaContext>,
  ) -> Result<HttpRequest, DecodeError>;
}

/// Default [`DecodeEvent`] implementation.
///
/// The resulting request carries:
///  * the event's method, path (minus any configured base path) and query string;
///  * the multi-valued headers, or the single-valued ones if the event has none;
///  * the body, base64-decoded if the event says it is encoded;
///  * the gateway request context, stage variables, path parameters and (if given) the Lambda
///    context as request extensions (see [`RequestExt`](crate::RequestExt)).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDecoder {
  host: Option<String>,
  base_path: Option<String>,
}

impl EventDecoder {
  /// Decoder producing origin-form URIs (path and query only) and stripping no base path.
  pub fn new() -> Self {
    Self::default()
  }

  /// Decoder configured from [`HOST_ENV_VAR`] and [`BASE_PATH_ENV_VAR`]. Unset or empty
  /// variables leave the corresponding setting disabled.
  pub fn from_env() -> Self {
    let mut decoder = Self::new();
    if let Some(host) = non_empty_env(HOST_ENV_VAR) {
      decoder = decoder.with_host(host);
    }
    if let Some(base_path) = non_empty_env(BASE_PATH_ENV_VAR) {
      decoder = decoder.with_base_path(base_path);
    }
    log::debug!("Configured event decoder from environment: {decoder:?}");
    decoder
  }

  /// Build absolute `https://{host}/...` URIs instead of origin-form ones.
  pub fn with_host<H>(mut self, host: H) -> Self
  where
    H: Into<String>,
  {
    self.host = Some(host.into());
    self
  }

  /// Strip `base_path` from the beginning of every request path that starts with it.
  ///
  /// The base path is normalized to have a leading `/` and no trailing `/`. Blank values and `/`
  /// disable stripping.
  pub fn with_base_path<P>(mut self, base_path: P) -> Self
  where
    P: AsRef<str>,
  {
    let trimmed = base_path.as_ref().trim().trim_end_matches('/');
    self.base_path = if trimmed.is_empty() {
      None
    } else if trimmed.starts_with('/') {
      Some(trimmed.to_string())
    } else {
      Some(format!("/{trimmed}"))
    };
    self
  }

  /// Configured host, if any.
  pub fn host(&self) -> Option<&str> {
    self.host.as_deref()
  }

  /// Configured (normalized) base path, if any.
  pub fn base_path(&self) -> Option<&str> {
    self.base_path.as_deref()
  }

  fn request_path(&self, event_path: Option<&str>) -> String {
    let path = event_path.unwrap_or("/");
    let path = match &self.base_path {
      Some(base_path) => match path.strip_prefix(base_path.as_str()) {
        // Only strip whole path segments (e.g., `/v1` shouldn't match `/v1beta`).
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
      },
      None => path,
    };

    if path.starts_with('/') {
      path.to_string()
    } else {
      format!("/{path}")
    }
  }

  fn request_uri(&self, event: &ApiGatewayProxyRequest) -> String {
    let path = self.request_path(event.path.as_deref());

    let query_params = if event.multi_value_query_string_parameters.is_empty() {
      &event.query_string_parameters
    } else {
      &event.multi_value_query_string_parameters
    };
    let query = encode_query(query_params);

    let path_and_query = if query.is_empty() {
      path
    } else {
      format!("{path}?{query}")
    };

    match &self.host {
      Some(host) => format!("https://{host}{path_and_query}"),
      None => path_and_query,
    }
  }
}

impl DecodeEvent for EventDecoder {
  fn decode(
    &self,
    event: ApiGatewayProxyRequest,
    lambda_context: Option<LambdaContext>,
  ) -> Result<HttpRequest, DecodeError> {
    log::trace!("Proxy event: {event:#?}");

    let uri = self.request_uri(&event);

    let body = match event.body {
      None => Body::Empty,
      Some(body) if event.is_base64_encoded => base64::engine::general_purpose::STANDARD
        .decode(body.as_bytes())
        .map(Body::Binary)
        .map_err(|err| DecodeError::InvalidBodyBase64(Box::new(err), Backtrace::new()))?,
      Some(body) => Body::Text(body),
    };

    let mut request = http::Request::builder()
      .method(event.http_method)
      .uri(&uri)
      .body(body)
      .map_err(|err| DecodeError::InvalidUri {
        uri,
        source: Box::new(err),
        backtrace: Backtrace::new(),
      })?;

    *request.headers_mut() = if event.multi_value_headers.is_empty() {
      event.headers
    } else {
      event.multi_value_headers
    };

    let extensions = request.extensions_mut();
    extensions.insert(event.request_context);
    extensions.insert(StageVariables(event.stage_variables));
    extensions.insert(PathParameters(event.path_parameters));
    if let Some(lambda_context) = lambda_context {
      extensions.insert(lambda_context);
    }

    Ok(request)
  }
}

/// Percent-encode every query parameter value, sorted by key. Values for the same key keep their
/// original order.
fn encode_query(params: &QueryMap) -> String {
  params
    .iter()
    .map(|(key, _)| key)
    .sorted()
    .dedup()
    .flat_map(|key| {
      params
        .all(key)
        .unwrap_or_default()
        .into_iter()
        .map(move |value| {
          format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value)
          )
        })
    })
    .join("&")
}

fn non_empty_env(name: &str) -> Option<String> {
  std::env::var(name)
    .ok()
    .filter(|value| !value.trim().is_empty())
}
