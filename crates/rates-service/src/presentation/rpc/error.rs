use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::fmt;

use crate::application::{ErrorChain, RatesError};

pub const CODE_HEADER: &str = "x-rpc-code";

/// Status codes surfaced to RPC callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCode {
    InvalidArgument,
    Unavailable,
    Internal,
    DeadlineExceeded,
}

impl RpcCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcCode::InvalidArgument => "INVALID_ARGUMENT",
            RpcCode::Unavailable => "UNAVAILABLE",
            RpcCode::Internal => "INTERNAL",
            RpcCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            RpcCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error status returned to the caller. Plain text only, no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        RpcStatus {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RpcCode::InvalidArgument, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }
}

impl From<RatesError> for RpcStatus {
    fn from(err: RatesError) -> Self {
        let code = match &err {
            RatesError::Fetch(_) => RpcCode::Unavailable,
            RatesError::Parse(_) | RatesError::Db(_) => RpcCode::Internal,
            RatesError::DeadlineExceeded { .. } => RpcCode::DeadlineExceeded,
        };
        RpcStatus::new(code, ErrorChain(&err).to_string())
    }
}

impl IntoResponse for RpcStatus {
    fn into_response(self) -> Response {
        let mut response = (self.code.http_status(), self.message).into_response();
        response
            .headers_mut()
            .insert(CODE_HEADER, HeaderValue::from_static(self.code.as_str()));
        response
    }
}
