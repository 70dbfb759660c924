use lambda_http_adapter::{
  handler_fn, AlbHandlerAdapter, AlbTargetGroupResponse, ApiGatewayProxyRequest, EventDecoder,
  HeaderValue, HttpRequest, Method, RequestExt, ResponseWriter, StatusCode,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use std::io::Write;
use std::sync::Arc;
use std::thread;

fn echo_path(writer: &mut dyn ResponseWriter, request: HttpRequest) {
  writer.headers_mut().insert(
    "content-type",
    HeaderValue::from_static("application/json"),
  );
  for cookie in ["session=1", "theme=dark"] {
    writer
      .headers_mut()
      .append("set-cookie", HeaderValue::from_static(cookie));
  }
  writer.write_status(StatusCode::OK);
  let stage = request
    .stage_variables()
    .get("env")
    .cloned()
    .unwrap_or_default();
  write!(
    writer,
    "{}",
    json!({ "path": request.uri().path(), "stage": stage })
  )
  .unwrap();
}

#[test]
fn test_target_group_response_wire_shape() {
  let _ = env_logger::builder().is_test(true).try_init();

  let adapter = AlbHandlerAdapter::with_decoder(
    handler_fn(echo_path),
    EventDecoder::new().with_base_path("/api"),
  );

  let mut event = ApiGatewayProxyRequest {
    http_method: Method::GET,
    path: Some("/api/profile".to_string()),
    ..Default::default()
  };
  event
    .stage_variables
    .insert("env".to_string(), "dev".to_string());

  let response = adapter.proxy(event).unwrap();
  let wire = serde_json::to_value(&response).unwrap();

  assert_eq!(wire["statusCode"], json!(200));
  assert_eq!(wire["statusDescription"], json!("OK"));
  assert_eq!(wire["headers"]["set-cookie"], json!("session=1;theme=dark"));
  assert_eq!(wire["headers"]["content-type"], json!("application/json"));
  assert_eq!(
    wire["multiValueHeaders"]["set-cookie"],
    json!(["session=1", "theme=dark"])
  );
  assert_eq!(
    wire["multiValueHeaders"]["content-type"],
    json!(["application/json"])
  );
  assert_eq!(wire["isBase64Encoded"], json!(false));
  assert_eq!(
    serde_json::from_str::<serde_json::Value>(wire["body"].as_str().unwrap()).unwrap(),
    json!({ "path": "/profile", "stage": "dev" })
  );
}

#[test]
fn test_failure_response_wire_shape() {
  let adapter = AlbHandlerAdapter::new(handler_fn(
    |_writer: &mut dyn ResponseWriter, _request: HttpRequest| {},
  ));

  let event = ApiGatewayProxyRequest {
    http_method: Method::GET,
    path: Some("/".to_string()),
    ..Default::default()
  };

  let response: AlbTargetGroupResponse = adapter.proxy(event).unwrap_or_else(Into::into);
  let wire = serde_json::to_value(&response).unwrap();

  assert_eq!(wire["statusCode"], json!(504));
  assert_eq!(response.body, None);
}

#[test]
fn test_adapter_shared_across_threads() {
  let adapter = Arc::new(AlbHandlerAdapter::new(handler_fn(
    |writer: &mut dyn ResponseWriter, request: HttpRequest| {
      writer.write_all(request.uri().path().as_bytes()).unwrap();
    },
  )));

  let workers = (0..8)
    .map(|i| {
      let adapter = Arc::clone(&adapter);
      thread::spawn(move || {
        let event = ApiGatewayProxyRequest {
          http_method: Method::GET,
          path: Some(format!("/worker/{i}")),
          ..Default::default()
        };
        (i, adapter.proxy(event).unwrap())
      })
    })
    .collect::<Vec<_>>();

  for worker in workers {
    let (i, response) = worker.join().unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(
      response.body,
      Some(lambda_http_adapter::Body::Text(format!("/worker/{i}")))
    );
  }
}
