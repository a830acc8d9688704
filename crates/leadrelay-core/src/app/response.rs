//! ApiResponse - use case の結果を HTTP レスポンスの形にする
//!
//! ルーティングやサーバーはこのクレートの外。ここではステータスコード・ヘッダー・
//! JSON ボディの組み立てと、`UseCaseError` からステータスへの対応だけを持つ。
//!
//! | error                         | status |
//! |-------------------------------|--------|
//! | NotFound                      | 404    |
//! | Validation                    | 400    |
//! | Delivery (retryable)          | 503    |
//! | Delivery (rejected)           | 502    |
//! | Repository                    | 500    |

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{SendError, UseCaseError};

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: Serialize + ?Sized>(status_code: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self::raw(status_code, body),
            Err(e) => {
                error!(error = %e, "response body could not be encoded");
                Self::error(500, format!("response encoding failed: {e}"))
            }
        }
    }

    pub fn ok<T: Serialize + ?Sized>(body: &T) -> Self {
        Self::json(200, body)
    }

    pub fn no_content() -> Self {
        Self {
            status_code: 204,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::error(404, format!("{what} not found"))
    }

    /// `Some` なら 200、`None` なら 404
    pub fn found<T: Serialize>(value: Option<T>, what: impl fmt::Display) -> Self {
        match value {
            Some(value) => Self::ok(&value),
            None => Self::not_found(what),
        }
    }

    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self::json(status_code, &json!({ "error": message.into() }))
    }

    pub fn from_error(err: &UseCaseError) -> Self {
        let status = status_for(err);
        if status >= 500 {
            warn!(status, error = %err, "request failed");
        }
        Self::error(status, err.to_string())
    }

    /// `Ok` を `success_status` で、`Err` を `from_error` で返す
    pub fn from_result<T: Serialize>(result: Result<T, UseCaseError>, success_status: u16) -> Self {
        match result {
            Ok(value) => Self::json(success_status, &value),
            Err(err) => Self::from_error(&err),
        }
    }

    /// 追加ヘッダー（値はそのまま渡す）
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    fn raw(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }
}

pub fn status_for(err: &UseCaseError) -> u16 {
    match err {
        UseCaseError::NotFound(_) => 404,
        UseCaseError::Send(SendError::Validation(_)) => 400,
        UseCaseError::Send(SendError::Delivery(e)) if e.is_retryable() => 503,
        UseCaseError::Send(SendError::Delivery(_)) => 502,
        UseCaseError::Repository(_) => 500,
    }
}
