//! Errors - エラー型と分類
//!
//! # 分類
//! - **ValidationError**: transport 呼び出し前に検出する不正（リトライ無意味）
//! - **DeliveryError**: transport の拒否・到達不能・スロットリング（リトライ判断は呼び出し側）
//! - **NotFoundError**: ドメイン別の「存在しない」
//! - **RepositoryError**: ストレージ障害のラップ
//! - **UseCaseError**: use case が境界まで伝播させるエラー

use std::fmt;

use thiserror::Error;

use super::ids::{BotConfigId, ClinicId, LeadId, NotificationId, PatientId};

/// 送信前の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("group_id must not be empty")]
    EmptyGroupId,

    #[error("deduplication_id must not be empty")]
    EmptyDeduplicationId,

    #[error("{field} is {len} characters long (max {max})")]
    KeyTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} contains invalid character {ch:?}")]
    InvalidKeyCharacter { field: &'static str, ch: char },

    #[error("payload must be a JSON object, got {0}")]
    PayloadNotObject(&'static str),

    #[error("message is {size} bytes (max {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("message could not be encoded: {0}")]
    Encoding(String),
}

/// ErrorKind は transport エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    /// transport に到達できない（接続断・DNS など）
    Unreachable,
    /// transport がレート制限で拒否
    Throttled,
    /// 応答待ちでタイムアウト
    Timeout,
    /// transport がメッセージ自体を拒否（再送しても結果は同じ）
    Rejected,
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryErrorKind::Unreachable => "unreachable",
            DeliveryErrorKind::Throttled => "throttled",
            DeliveryErrorKind::Timeout => "timeout",
            DeliveryErrorKind::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// DeliveryError は 1 回の publish 試行の失敗
///
/// port 自身はリトライしない。`is_retryable()` を見て呼び出し側が決める。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery failed ({kind}): {message}")]
pub struct DeliveryError {
    kind: DeliveryErrorKind,
    message: String,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Unreachable, message)
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Throttled, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Timeout, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::Rejected, message)
    }

    pub fn kind(&self) -> DeliveryErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 同じメッセージを再送して成功する見込みがあるか
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, DeliveryErrorKind::Rejected)
    }
}

/// MessageQueuePort::send の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl SendError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::Validation(_) => false,
            SendError::Delivery(e) => e.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("clinic {0} not found")]
    Clinic(ClinicId),

    #[error("bot config {0} not found")]
    BotConfig(BotConfigId),

    #[error("notification {0} not found")]
    Notification(NotificationId),

    #[error("patient {0} not found")]
    Patient(PatientId),

    #[error("lead {0} not found")]
    Lead(LeadId),
}

/// Storage failure surfaced by a repository adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} failed: {message}")]
    Query {
        operation: &'static str,
        message: String,
    },

    #[error("record {id} could not be decoded: {message}")]
    Decode { id: String, message: String },
}

impl RepositoryError {
    pub fn query(operation: &'static str, message: impl Into<String>) -> Self {
        RepositoryError::Query {
            operation,
            message: message.into(),
        }
    }
}

/// use case が request 境界まで伝播させるエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseCaseError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Send(#[from] SendError),
}

impl From<ValidationError> for UseCaseError {
    fn from(e: ValidationError) -> Self {
        UseCaseError::Send(SendError::Validation(e))
    }
}
