//! DeliveryOptions - send ごとの配送メタデータ（永続化しない）
//!
//! # 設計原則
//! - `group_id`: 順序保証のパーティションキー。同じ group 内だけ送信順が保たれる
//! - `deduplication_id`: dedup window 内で同じキーの送信は 1 件に畳まれる
//! - どちらも呼び出し側が決める（transport 全体の採番には頼らない）

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::message::LeadQueueMessage;

/// Longest key a FIFO transport accepts.
pub const MAX_KEY_LEN: usize = 128;

/// Per-send delivery keys.
///
/// Construction does not validate; `MessageQueuePort::send` does, before any
/// transport call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryOptions {
    pub group_id: String,
    pub deduplication_id: String,
}

impl DeliveryOptions {
    pub fn new(group_id: impl Into<String>, deduplication_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            deduplication_id: deduplication_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.group_id.is_empty() {
            return Err(ValidationError::EmptyGroupId);
        }
        if self.deduplication_id.is_empty() {
            return Err(ValidationError::EmptyDeduplicationId);
        }
        check_key("group_id", &self.group_id)?;
        check_key("deduplication_id", &self.deduplication_id)?;
        Ok(())
    }
}

/// Printable ASCII without whitespace.
pub(crate) fn is_key_char(ch: char) -> bool {
    ch.is_ascii_graphic()
}

fn check_key(field: &'static str, key: &str) -> Result<(), ValidationError> {
    if let Some(ch) = key.chars().find(|c| !is_key_char(*c)) {
        return Err(ValidationError::InvalidKeyCharacter { field, ch });
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ValidationError::KeyTooLong {
            field,
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    Ok(())
}

/// 検証済みの送信単位
///
/// `Outbound::validate` を通らないと構築できないため、transport 実装
/// （`MessageQueuePort::publish`）は常に検証済みの値だけを受け取る。
#[derive(Debug, Clone)]
pub struct Outbound {
    message: LeadQueueMessage,
    options: DeliveryOptions,
}

impl Outbound {
    pub fn validate(
        message: LeadQueueMessage,
        options: DeliveryOptions,
    ) -> Result<Self, ValidationError> {
        options.validate()?;
        message.validate()?;
        Ok(Self { message, options })
    }

    pub fn message(&self) -> &LeadQueueMessage {
        &self.message
    }

    pub fn group_id(&self) -> &str {
        &self.options.group_id
    }

    pub fn deduplication_id(&self) -> &str {
        &self.options.deduplication_id
    }

    pub fn into_parts(self) -> (LeadQueueMessage, DeliveryOptions) {
        (self.message, self.options)
    }
}
