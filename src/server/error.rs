//! HTTP 层的错误：映射为状态码 + `{detail}` 响应体

use crate::nn::ModelError;
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response {
        error_response(self.status(), &self.to_string())
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnknownModel(_) => Self::NotFound(err.to_string()),
            ModelError::StateDict => Self::BadRequest(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        // panic 信息只写日志，不返回给客户端
        tracing::error!("后台任务异常退出: {err}");
        Self::Internal("后台任务异常退出".to_string())
    }
}

pub(crate) fn error_response(status: StatusCode, detail: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { detail }), status).into_response()
}
