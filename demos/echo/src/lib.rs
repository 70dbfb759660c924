use lambda_http_adapter::{
  Body, Handler, HeaderValue, HttpRequest, RequestExt, ResponseWriter, StatusCode,
};
use serde_json::{json, Map, Value};

use std::io::Write;

/// Request header whose values are reflected back as response headers.
pub const TRACE_HEADER: &str = "x-trace";

/// Echoes each request back as a JSON document.
///
/// Requests to `/status/{code}` are answered with that status code.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoHandler;

impl Handler for EchoHandler {
  fn serve_http(&self, writer: &mut dyn ResponseWriter, request: HttpRequest) {
    log::info!("Echoing {} {}", request.method(), request.uri());

    for trace in request.headers().get_all(TRACE_HEADER) {
      writer.headers_mut().append(TRACE_HEADER, trace.clone());
    }
    writer.headers_mut().insert(
      "content-type",
      HeaderValue::from_static("application/json"),
    );

    let status = request
      .uri()
      .path()
      .strip_prefix("/status/")
      .and_then(|code| code.parse::<u16>().ok())
      .and_then(|code| StatusCode::from_u16(code).ok())
      .unwrap_or(StatusCode::OK);
    writer.write_status(status);

    if let Err(err) = write!(writer, "{}", echo_document(&request)) {
      log::error!("failed to write echo response: {err}");
    }
  }
}

/// JSON document describing `request`.
pub fn echo_document(request: &HttpRequest) -> Value {
  let mut headers = Map::new();
  for name in request.headers().keys() {
    let values = request
      .headers()
      .get_all(name)
      .iter()
      .map(|value| Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()))
      .collect();
    headers.insert(name.to_string(), Value::Array(values));
  }

  let body = match request.body() {
    Body::Empty => Value::Null,
    Body::Text(text) => Value::String(text.clone()),
    Body::Binary(bytes) => json!({ "binaryLength": bytes.len() }),
  };

  json!({
    "method": request.method().as_str(),
    "path": request.uri().path(),
    "query": request.uri().query(),
    "headers": headers,
    "body": body,
    "remainingMillis": request.remaining_time().map(|remaining| remaining.as_millis() as u64),
  })
}

#[cfg(test)]
mod tests {
  use super::{EchoHandler, TRACE_HEADER};

  use lambda_http_adapter::{
    AlbHandlerAdapter, ApiGatewayProxyRequest, Body, HeaderMap, HeaderValue, Method,
  };
  use pretty_assertions::assert_eq;
  use serde_json::{json, Value};

  fn response_json(body: Option<Body>) -> Value {
    match body {
      Some(Body::Text(text)) => serde_json::from_str(&text).unwrap(),
      other => panic!("unexpected body: {other:?}"),
    }
  }

  #[test]
  fn test_echo() {
    let mut headers = HeaderMap::new();
    headers.append(TRACE_HEADER, HeaderValue::from_static("a"));
    headers.append(TRACE_HEADER, HeaderValue::from_static("b"));

    let event = ApiGatewayProxyRequest {
      http_method: Method::POST,
      path: Some("/items".to_string()),
      multi_value_headers: headers,
      body: Some("hello".to_string()),
      ..Default::default()
    };

    let response = AlbHandlerAdapter::new(EchoHandler).proxy(event).unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers.get(TRACE_HEADER).unwrap(), "a;b");
    assert_eq!(
      response_json(response.body),
      json!({
        "method": "POST",
        "path": "/items",
        "query": null,
        "headers": { "x-trace": ["a", "b"] },
        "body": "hello",
        "remainingMillis": null,
      })
    );
  }

  #[test]
  fn test_status_path() {
    let event = ApiGatewayProxyRequest {
      http_method: Method::GET,
      path: Some("/status/418".to_string()),
      ..Default::default()
    };

    let response = AlbHandlerAdapter::new(EchoHandler).proxy(event).unwrap();

    assert_eq!(response.status_code, 418);
    assert_eq!(response.status_description.as_deref(), Some("I'm a teapot"));
    assert!(response.headers.get(TRACE_HEADER).is_none());
  }
}
