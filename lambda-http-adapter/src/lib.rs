#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]

// These are documented public exports since handlers and custom decoders depend on them.
pub use aws_lambda_events::alb::AlbTargetGroupResponse;
pub use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyRequestContext};
pub use aws_lambda_events::encodings::Body;
pub use aws_lambda_events::http::{HeaderMap, HeaderName, HeaderValue};
pub use http::{Method, Request, StatusCode};
pub use lambda_runtime::{Context as LambdaContext, LambdaEvent};

mod adapter;

pub use adapter::{
  join_multi_value_headers, AlbHandlerAdapter, HEADER_VALUE_SEPARATOR, NON_STRING_PANIC,
};

/// Handler output capture.
pub mod capture;

pub use capture::{CapturedResponse, ResponseCapturer, ResponseWriter};

/// Proxy event decoding.
pub mod decode;

pub use decode::{DecodeEvent, EventDecoder};

/// Error handling.
pub mod error;

pub use error::{CaptureError, DecodeError, ProxyError, FAILURE_STATUS};

mod handler;

pub use handler::{handler_fn, Handler, HandlerFn};

mod request_ext;

pub use request_ext::{PathParameters, RequestExt, StageVariables};

mod runtime;

pub use runtime::run_lambda;

/// HTTP request passed to a [`Handler`].
pub type HttpRequest = Request<Body>;
