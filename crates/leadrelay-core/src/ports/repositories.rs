//! Repository ports - ストレージ別の CRUD インターフェース
//!
//! すべて `ClinicSource`（legacy / platform）でスコープされる。
//! 実装は DynamoDB / MySQL 側のクレートが持ち、このクレートには
//! テスト・デモ用の in-memory 実装だけがある。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    BotConfigDto, BotConfigId, ClinicDto, ClinicId, ClinicSource, LeadDto, LeadId, LeadStatus,
    NotificationDto, NotificationId, PatientDto, PatientId, RepositoryError,
};

#[async_trait]
pub trait ClinicRepository: Send + Sync {
    /// `source` が None なら全バックエンド
    async fn find_all(&self, source: Option<ClinicSource>)
    -> Result<Vec<ClinicDto>, RepositoryError>;

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &ClinicId,
    ) -> Result<Option<ClinicDto>, RepositoryError>;
}

#[async_trait]
pub trait BotConfigRepository: Send + Sync {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<BotConfigDto>, RepositoryError>;

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &BotConfigId,
    ) -> Result<Option<BotConfigDto>, RepositoryError>;

    async fn delete(
        &self,
        id: &BotConfigId,
        source: ClinicSource,
        clinic_id: &ClinicId,
    ) -> Result<(), RepositoryError>;

    async fn update_settings(
        &self,
        source: ClinicSource,
        id: &BotConfigId,
        enabled: bool,
        settings: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<NotificationDto>, RepositoryError>;

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &NotificationId,
    ) -> Result<Option<NotificationDto>, RepositoryError>;

    async fn delete(
        &self,
        id: &NotificationId,
        source: ClinicSource,
        clinic_id: &ClinicId,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<PatientDto>, RepositoryError>;

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &PatientId,
    ) -> Result<Option<PatientDto>, RepositoryError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &LeadId,
    ) -> Result<Option<LeadDto>, RepositoryError>;

    /// `status` と `status_revision` を書き込む
    async fn update_status(
        &self,
        source: ClinicSource,
        id: &LeadId,
        status: LeadStatus,
        revision: u64,
    ) -> Result<(), RepositoryError>;
}
