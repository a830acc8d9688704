//! PooledRepository - repository 呼び出しを `ConnectionPool` 経由にする adapter
//!
//! 1 回の呼び出しごとにコネクションを 1 本借り、結果に関係なく返却する。
//! 同時に走るクエリ数はプールのサイズ（`LEADRELAY_POOL_SIZE`）で頭打ちになる。
//! `C` は repository を指すハンドル（`Arc<dyn LeadRepository>` など）。

use std::ops::Deref;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::pool::ConnectionPool;
use crate::domain::{
    BotConfigDto, BotConfigId, ClinicDto, ClinicId, ClinicSource, LeadDto, LeadId, LeadStatus,
    NotificationDto, NotificationId, PatientDto, PatientId, RepositoryError,
};
use crate::ports::{
    BotConfigRepository, ClinicRepository, LeadRepository, NotificationRepository,
    PatientRepository,
};

pub struct PooledRepository<C> {
    pool: ConnectionPool<C>,
}

impl<C> PooledRepository<C> {
    pub fn new(pool: ConnectionPool<C>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }
}

impl<C: Clone> PooledRepository<C> {
    /// 同じハンドルを `size` 本並べたプール
    pub fn replicate(handle: C, size: usize) -> Self {
        Self::new(ConnectionPool::new(vec![handle; size]))
    }
}

#[async_trait]
impl<C> ClinicRepository for PooledRepository<C>
where
    C: Deref + Send + Sync + 'static,
    C::Target: ClinicRepository,
{
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<ClinicDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move { ClinicRepository::find_all(&**conn, source).await })
            .await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &ClinicId,
    ) -> Result<Option<ClinicDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                ClinicRepository::find_by_id(&**conn, source, id).await
            })
            .await
    }
}

#[async_trait]
impl<C> BotConfigRepository for PooledRepository<C>
where
    C: Deref + Send + Sync + 'static,
    C::Target: BotConfigRepository,
{
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<BotConfigDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                BotConfigRepository::find_all(&**conn, source).await
            })
            .await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &BotConfigId,
    ) -> Result<Option<BotConfigDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                BotConfigRepository::find_by_id(&**conn, source, id).await
            })
            .await
    }

    async fn delete(
        &self,
        id: &BotConfigId,
        source: ClinicSource,
        clinic_id: &ClinicId,
    ) -> Result<(), RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                BotConfigRepository::delete(&**conn, id, source, clinic_id).await
            })
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
        self.pool
            .with_connection(|conn| async move {
                BotConfigRepository::update_settings(
                    &**conn, source, id, enabled, settings, updated_at,
                )
                .await
            })
            .await
    }
}

#[async_trait]
impl<C> NotificationRepository for PooledRepository<C>
where
    C: Deref + Send + Sync + 'static,
    C::Target: NotificationRepository,
{
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<NotificationDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                NotificationRepository::find_all(&**conn, source).await
            })
            .await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &NotificationId,
    ) -> Result<Option<NotificationDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                NotificationRepository::find_by_id(&**conn, source, id).await
            })
            .await
    }

    async fn delete(
        &self,
        id: &NotificationId,
        source: ClinicSource,
        clinic_id: &ClinicId,
    ) -> Result<(), RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                NotificationRepository::delete(&**conn, id, source, clinic_id).await
            })
            .await
    }
}

#[async_trait]
impl<C> PatientRepository for PooledRepository<C>
where
    C: Deref + Send + Sync + 'static,
    C::Target: PatientRepository,
{
    async fn find_all(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<PatientDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move { PatientRepository::find_all(&**conn, source).await })
            .await
    }

    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &PatientId,
    ) -> Result<Option<PatientDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                PatientRepository::find_by_id(&**conn, source, id).await
            })
            .await
    }
}

#[async_trait]
impl<C> LeadRepository for PooledRepository<C>
where
    C: Deref + Send + Sync + 'static,
    C::Target: LeadRepository,
{
    async fn find_by_id(
        &self,
        source: ClinicSource,
        id: &LeadId,
    ) -> Result<Option<LeadDto>, RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                LeadRepository::find_by_id(&**conn, source, id).await
            })
            .await
    }

    async fn update_status(
        &self,
        source: ClinicSource,
        id: &LeadId,
        status: LeadStatus,
        revision: u64,
    ) -> Result<(), RepositoryError> {
        self.pool
            .with_connection(|conn| async move {
                LeadRepository::update_status(&**conn, source, id, status, revision).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryClinicRepository, InMemoryLeadRepository};
    use std::sync::Arc;
    use std::time::Duration;

    fn lead(id: &str) -> LeadDto {
        LeadDto {
            id: LeadId::new(id).unwrap(),
            clinic_id: ClinicId::new("42").unwrap(),
            source: ClinicSource::Platform,
            name: "Ana".to_string(),
            status: LeadStatus::New,
            status_revision: 0,
        }
    }

    type PooledLeads = PooledRepository<Arc<InMemoryLeadRepository>>;

    async fn leads(size: usize) -> (Arc<InMemoryLeadRepository>, PooledLeads) {
        let inner = Arc::new(InMemoryLeadRepository::default());
        inner.insert(lead("L-7")).await;
        let pooled = PooledRepository::replicate(inner.clone(), size);
        (inner, pooled)
    }

    #[tokio::test]
    async fn calls_reach_the_repository_and_return_the_connection() {
        let (inner, pooled) = leads(2).await;
        let id = LeadId::new("L-7").unwrap();

        pooled
            .update_status(ClinicSource::Platform, &id, LeadStatus::Won, 1)
            .await
            .unwrap();
        let found = LeadRepository::find_by_id(&pooled, ClinicSource::Platform, &id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.status, LeadStatus::Won);
        assert_eq!(
            inner.find_by_id(ClinicSource::Platform, &id).await.unwrap(),
            Some(found)
        );
        assert_eq!(pooled.pool().size(), 2);
        assert_eq!(pooled.pool().available(), 2);
    }

    #[tokio::test]
    async fn failed_call_still_returns_the_connection() {
        let (inner, pooled) = leads(1).await;
        inner
            .fail_next_update(RepositoryError::Unavailable("mysql".to_string()))
            .await;

        let id = LeadId::new("L-7").unwrap();
        let err = pooled
            .update_status(ClinicSource::Platform, &id, LeadStatus::Lost, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Unavailable(_)));
        assert_eq!(pooled.pool().available(), 1);
    }

    #[tokio::test]
    async fn calls_wait_while_every_connection_is_out() {
        let (_inner, pooled) = leads(1).await;
        let held = pooled.pool().acquire().await.unwrap();

        let id = LeadId::new("L-7").unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            LeadRepository::find_by_id(&pooled, ClinicSource::Platform, &id),
        )
        .await;
        assert!(blocked.is_err());

        drop(held);
        let found = LeadRepository::find_by_id(&pooled, ClinicSource::Platform, &id).await;
        assert!(found.unwrap().is_some());
    }

    #[tokio::test]
    async fn closed_pool_surfaces_as_unavailable() {
        let inner: Arc<dyn ClinicRepository> = Arc::new(InMemoryClinicRepository::default());
        let pooled = PooledRepository::replicate(inner, 2);
        pooled.pool().close();

        let err = ClinicRepository::find_all(&pooled, None).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable(_)));
    }
}
