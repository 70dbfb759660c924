use crate::{ApiGatewayProxyRequestContext, LambdaContext};

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// API Gateway stage variables attached to a decoded request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageVariables(pub HashMap<String, String>);

/// Path parameters extracted by the gateway and attached to a decoded request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathParameters(pub HashMap<String, String>);

/// Accessors for the event metadata that [`EventDecoder`](crate::EventDecoder) stores in the
/// request extensions.
pub trait RequestExt {
  /// Gateway request context of the originating event.
  fn request_context(&self) -> Option<&ApiGatewayProxyRequestContext>;

  /// Lambda invocation context, present only for requests decoded by
  /// [`proxy_with_context`](crate::AlbHandlerAdapter::proxy_with_context).
  fn lambda_context(&self) -> Option<&LambdaContext>;

  /// Stage variables of the originating event (empty if none).
  fn stage_variables(&self) -> &HashMap<String, String>;

  /// Path parameters of the originating event (empty if none).
  fn path_parameters(&self) -> &HashMap<String, String>;

  /// Point in time at which the Lambda invocation times out.
  fn deadline(&self) -> Option<SystemTime> {
    self
      .lambda_context()
      .map(|context| SystemTime::UNIX_EPOCH + Duration::from_millis(context.deadline))
  }

  /// Time left before the invocation deadline. Returns `Some(Duration::ZERO)` once the deadline
  /// has passed and `None` when no invocation context is attached.
  fn remaining_time(&self) -> Option<Duration> {
    self.deadline().map(|deadline| {
      deadline
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO)
    })
  }
}

impl<B> RequestExt for http::Request<B> {
  fn request_context(&self) -> Option<&ApiGatewayProxyRequestContext> {
    self.extensions().get()
  }

  fn lambda_context(&self) -> Option<&LambdaContext> {
    self.extensions().get()
  }

  fn stage_variables(&self) -> &HashMap<String, String> {
    self
      .extensions()
      .get::<StageVariables>()
      .map(|vars| &vars.0)
      .unwrap_or_else(|| empty_map())
  }

  fn path_parameters(&self) -> &HashMap<String, String> {
    self
      .extensions()
      .get::<PathParameters>()
      .map(|params| &params.0)
      .unwrap_or_else(|| empty_map())
  }
}

fn empty_map() -> &'static HashMap<String, String> {
  static EMPTY: std::sync::OnceLock<HashMap<String, String>> = std::sync::OnceLock::new();
  EMPTY.get_or_init(HashMap::new)
}
