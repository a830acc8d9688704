//! LeadQueueMessage - queue に流す 1 単位
//!
//! use case がドメインイベント（lead の作成・状態変化など）から生成し、
//! `MessageQueuePort::send` に **値で** 渡します。渡した後は producer 側から
//! 変更できません（フィールドは private、アクセサのみ）。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::{ClinicId, LeadId};

/// Upper bound for one encoded message (SQS message size limit).
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024;

/// Event type carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadAction {
    Created,
    Updated,
    StatusChanged,
    Assigned,
    Deleted,
}

impl LeadAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadAction::Created => "created",
            LeadAction::Updated => "updated",
            LeadAction::StatusChanged => "status_changed",
            LeadAction::Assigned => "assigned",
            LeadAction::Deleted => "deleted",
        }
    }
}

impl fmt::Display for LeadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work published to the lead queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadQueueMessage {
    clinic_id: ClinicId,
    lead_id: LeadId,
    action: LeadAction,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,

    /// 同じ lead・同じ action の別イベントを区別するキー（例: status の revision）。
    /// あれば dedup キーの time bucket の代わりに使われる。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_key: Option<String>,
}

impl LeadQueueMessage {
    /// `payload` の null は空オブジェクトとして扱う
    pub fn new(
        clinic_id: ClinicId,
        lead_id: LeadId,
        action: LeadAction,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        let payload = if payload.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            payload
        };
        Self {
            clinic_id,
            lead_id,
            action,
            payload,
            created_at,
            event_key: None,
        }
    }

    pub fn with_event_key(mut self, event_key: impl Into<String>) -> Self {
        self.event_key = Some(event_key.into());
        self
    }

    pub fn clinic_id(&self) -> &ClinicId {
        &self.clinic_id
    }

    pub fn lead_id(&self) -> &LeadId {
        &self.lead_id
    }

    pub fn action(&self) -> LeadAction {
        self.action
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn event_key(&self) -> Option<&str> {
        self.event_key.as_deref()
    }

    /// JSON body as sent over the wire.
    pub fn to_json(&self) -> Result<String, ValidationError> {
        serde_json::to_string(self).map_err(|e| ValidationError::Encoding(e.to_string()))
    }

    /// メッセージ単体の不変条件を検査
    ///
    /// - payload は JSON object
    /// - エンコード後のサイズが `MAX_MESSAGE_BYTES` 以下
    ///
    /// ID は型の構築時点で空でないことが保証されている。
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.payload.is_object() {
            return Err(ValidationError::PayloadNotObject(json_kind(&self.payload)));
        }
        let size = self.to_json()?.len();
        if size > MAX_MESSAGE_BYTES {
            return Err(ValidationError::MessageTooLarge {
                size,
                limit: MAX_MESSAGE_BYTES,
            });
        }
        Ok(())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
