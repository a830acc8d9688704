//! Domain identifiers (strongly-typed IDs).
//!
//! # Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。
//!
//! テナント側の ID（clinic, lead, bot config ...）は上流システムが採番した文字列です。
//! 空文字や空白だけの ID は構築時に拒否します。
//!
//! `MessageId` だけは transport が受理したメッセージに付与する ULID です。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

use super::errors::ValidationError;

/// IdMarker は各 ID 型のマーカー trait
///
/// `Clone` は `Id<T>` の derive（Clone, serde の `into`）に必要。
pub trait IdMarker: Clone + Send + Sync + 'static {
    /// エラーメッセージで使うフィールド名（例: "clinic_id"）
    fn field() -> &'static str;
}

/// ジェネリック ID 型
///
/// # 例
/// ```ignore
/// let clinic = ClinicId::new("42")?;
/// let lead = LeadId::new("L-7")?;
/// // clinic と lead は異なる型なので、混同できない
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String", bound = "")]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 文字列から Id を作成（空・空白のみは ValidationError）
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier(T::field()));
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> TryFrom<String> for Id<T> {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T: IdMarker> From<Id<T>> for String {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Clinic のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Clinic {}

impl IdMarker for Clinic {
    fn field() -> &'static str {
        "clinic_id"
    }
}

/// Lead のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lead {}

impl IdMarker for Lead {
    fn field() -> &'static str {
        "lead_id"
    }
}

/// BotConfig のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BotConfig {}

impl IdMarker for BotConfig {
    fn field() -> &'static str {
        "bot_config_id"
    }
}

/// Notification のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Notification {}

impl IdMarker for Notification {
    fn field() -> &'static str {
        "notification_id"
    }
}

/// Patient のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Patient {}

impl IdMarker for Patient {
    fn field() -> &'static str {
        "patient_id"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Tenant scope of every record and message.
pub type ClinicId = Id<Clinic>;

/// Prospective patient tracked in the CRM.
pub type LeadId = Id<Lead>;

pub type BotConfigId = Id<BotConfig>;

pub type NotificationId = Id<Notification>;

pub type PatientId = Id<Patient>;

/// Identifier assigned by a transport to an accepted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(Ulid);

impl MessageId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for MessageId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}
