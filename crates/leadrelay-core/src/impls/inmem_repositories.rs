//! In-memory repositories (開発・テスト用)
//!
//! `(ClinicSource, id)` をキーにした BTreeMap 1 枚ずつ。
//! `fail_with` を呼ぶと以降の操作はすべてそのエラーを返す（ストレージ障害の再現）。

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    BotConfigDto, BotConfigId, ClinicDto, ClinicId, ClinicSource, LeadDto, LeadId, LeadStatus,
    NotificationDto, NotificationId, PatientDto, PatientId, RepositoryError,
};
use crate::ports::{
    BotConfigRepository, ClinicRepository, LeadRepository, NotificationRepository,
    PatientRepository,
};

type Key = (&'static str, String);

fn key(source: ClinicSource, id: &str) -> Key {
    (source.as_str(), id.to_string())
}

struct Table<V> {
    rows: RwLock<BTreeMap<Key, V>>,
    failure: RwLock<Option<RepositoryError>>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            failure: RwLock::new(None),
        }
    }
}

impl<V: Clone> Table<V> {
    async fn check(&self) -> Result<(), RepositoryError> {
        match self.failure.read().await.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn fail_with(&self, err: RepositoryError) {
        *self.failure.write().await = Some(err);
    }

    async fn put(&self, source: ClinicSource, id: &str, row: V) {
        self.rows.write().await.insert(key(source, id), row);
    }

    async fn all(&self, source: Option<ClinicSource>) -> Result<Vec<V>, RepositoryError> {
        self.check().await?;
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|((s, _), _)| source.is_none_or(|wanted| wanted.as_str() == *s))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn get(&self, source: ClinicSource, id: &str) -> Result<Option<V>, RepositoryError> {
        self.check().await?;
        Ok(self.rows.read().await.get(&key(source, id)).cloned())
    }

    async fn update<F>(&self, source: ClinicSource, id: &str, f: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut V) + Send,
    {
        self.check().await?;
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&key(source, id))
            .ok_or_else(|| RepositoryError::query("update", format!("no row {source}/{id}")))?;
        f(row);
        Ok(())
    }

    /// `belongs` が false の行は消さない（他テナントの行は見えない扱い）
    async fn remove<F>(&self, source: ClinicSource, id: &str, belongs: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&V) -> bool + Send,
    {
        self.check().await?;
        let mut rows = self.rows.write().await;
        let k = key(source, id);
        if rows.get(&k).is_some_and(belongs) {
            rows.remove(&k);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryClinicRepository {
    table: Table<ClinicDto>,
}

impl InMemoryClinicRepository {
    pub async fn insert(&self, clinic: ClinicDto) {
        let id = clinic.id.to_string();
        self.table.put(clinic.source, &id, clinic).await;
    }

    pub async fn fail_with(&self, err: RepositoryError) {
        self.table.fail_with(err).await;
    }
}

#[async_trait]
impl ClinicRepository for InMemoryClinicRepository {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<ClinicDto>, RepositoryError> {
        self.table.all(source).await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &ClinicId,
    ) -> Result<Option<ClinicDto>, RepositoryError> {
        self.table.get(source, id.as_str()).await
    }
}

#[derive(Default)]
pub struct InMemoryBotConfigRepository {
    table: Table<BotConfigDto>,
}

impl InMemoryBotConfigRepository {
    pub async fn insert(&self, config: BotConfigDto) {
        let id = config.id.to_string();
        self.table.put(config.source, &id, config).await;
    }

    pub async fn fail_with(&self, err: RepositoryError) {
        self.table.fail_with(err).await;
    }
}

#[async_trait]
impl BotConfigRepository for InMemoryBotConfigRepository {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<BotConfigDto>, RepositoryError> {
        self.table.all(source).await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &BotConfigId,
    ) -> Result<Option<BotConfigDto>, RepositoryError> {
        self.table.get(source, id.as_str()).await
    }

    async fn delete(
        &self,
        id: &BotConfigId,
        source: ClinicSource,
        clinic_id: &ClinicId,
    ) -> Result<(), RepositoryError> {
        self.table
            .remove(source, id.as_str(), |c| &c.clinic_id == clinic_id)
            .await
    }

    async fn update_settings(
        &self,
        source: ClinicSource,
        id: &BotConfigId,
        enabled: bool,
        settings: serde_json::Value,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.table
            .update(source, id.as_str(), move |c| {
                c.enabled = enabled;
                c.settings = settings;
                c.updated_at = updated_at;
            })
            .await
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    table: Table<NotificationDto>,
}

impl InMemoryNotificationRepository {
    pub async fn insert(&self, source: ClinicSource, notification: NotificationDto) {
        let id = notification.id.to_string();
        self.table.put(source, &id, notification).await;
    }

    pub async fn fail_with(&self, err: RepositoryError) {
        self.table.fail_with(err).await;
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<NotificationDto>, RepositoryError> {
        self.table.all(source).await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &NotificationId,
    ) -> Result<Option<NotificationDto>, RepositoryError> {
        self.table.get(source, id.as_str()).await
    }

    async fn delete(
        &self,
        id: &NotificationId,
        source: ClinicSource,
        clinic_id: &ClinicId,
    ) -> Result<(), RepositoryError> {
        self.table
            .remove(source, id.as_str(), |n| &n.clinic_id == clinic_id)
            .await
    }
}

#[derive(Default)]
pub struct InMemoryPatientRepository {
    table: Table<PatientDto>,
}

impl InMemoryPatientRepository {
    pub async fn insert(&self, source: ClinicSource, patient: PatientDto) {
        let id = patient.id.to_string();
        self.table.put(source, &id, patient).await;
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<PatientDto>, RepositoryError> {
        self.table.all(source).await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &PatientId,
    ) -> Result<Option<PatientDto>, RepositoryError> {
        self.table.get(source, id.as_str()).await
    }
}

#[derive(Default)]
pub struct InMemoryLeadRepository {
    table: Table<LeadDto>,
    update_failure: RwLock<Option<RepositoryError>>,
}

impl InMemoryLeadRepository {
    pub async fn insert(&self, lead: LeadDto) {
        let id = lead.id.to_string();
        self.table.put(lead.source, &id, lead).await;
    }

    /// 次の `update_status` だけを `err` で失敗させる
    pub async fn fail_next_update(&self, err: RepositoryError) {
        *self.update_failure.write().await = Some(err);
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &LeadId,
    ) -> Result<Option<LeadDto>, RepositoryError> {
        self.table.get(source, id.as_str()).await
    }

    async fn update_status(
        &self,
        source: ClinicSource,
        id: &LeadId,
        status: LeadStatus,
        revision: u64,
    ) -> Result<(), RepositoryError> {
        if let Some(err) = self.update_failure.write().await.take() {
            return Err(err);
        }
        self.table
            .update(source, id.as_str(), move |l| {
                l.status = status;
                l.status_revision = revision;
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(id: &str, clinic: &str) -> BotConfigDto {
        BotConfigDto {
            id: BotConfigId::new(id).unwrap(),
            clinic_id: ClinicId::new(clinic).unwrap(),
            source: ClinicSource::Legacy,
            name: "bot".to_string(),
            enabled: true,
            settings: json!({}),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn delete_ignores_rows_of_other_clinics() {
        let repo = InMemoryBotConfigRepository::default();
        repo.insert(config("cfg-1", "42")).await;

        repo.delete(
            &BotConfigId::new("cfg-1").unwrap(),
            ClinicSource::Legacy,
            &ClinicId::new("7").unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(repo.find_all(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_a_query_error() {
        let repo = InMemoryLeadRepository::default();
        let err = repo
            .update_status(ClinicSource::Legacy, &LeadId::new("L-1").unwrap(), LeadStatus::Won, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Query { operation: "update", .. }));
    }

    #[tokio::test]
    async fn status_update_stores_the_revision_and_failure_is_one_shot() {
        let repo = InMemoryLeadRepository::default();
        let id = LeadId::new("L-1").unwrap();
        repo.insert(LeadDto {
            id: id.clone(),
            clinic_id: ClinicId::new("42").unwrap(),
            source: ClinicSource::Platform,
            name: "Ana".to_string(),
            status: LeadStatus::New,
            status_revision: 0,
        })
        .await;
        repo.fail_next_update(RepositoryError::Unavailable("mysql".to_string()))
            .await;

        assert!(repo
            .update_status(ClinicSource::Platform, &id, LeadStatus::Won, 1)
            .await
            .is_err());
        repo.update_status(ClinicSource::Platform, &id, LeadStatus::Won, 1)
            .await
            .unwrap();

        let lead = repo
            .find_by_id(ClinicSource::Platform, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.status, LeadStatus::Won);
        assert_eq!(lead.status_revision, 1);
    }

    #[tokio::test]
    async fn injected_failure_affects_every_read() {
        let repo = InMemoryBotConfigRepository::default();
        repo.fail_with(RepositoryError::Unavailable("mysql".to_string())).await;

        assert!(repo.find_all(None).await.is_err());
        assert!(repo
            .find_by_id(ClinicSource::Legacy, &BotConfigId::new("x").unwrap())
            .await
            .is_err());
    }
}
