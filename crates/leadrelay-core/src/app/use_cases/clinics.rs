//! Clinic use cases.

use std::sync::Arc;

use crate::domain::{ClinicDto, ClinicId, ClinicSource, UseCaseError};
use crate::ports::ClinicRepository;

/// A missing clinic is `Ok(None)`, not an error.
pub struct GetClinicById {
    repository: Arc<dyn ClinicRepository>,
}

impl GetClinicById {
    pub fn new(repository: Arc<dyn ClinicRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: ClinicSource,
        id: &ClinicId,
    ) -> Result<Option<ClinicDto>, UseCaseError> {
        Ok(self.repository.find_by_id(source, id).await?)
    }
}

pub struct ListClinics {
    repository: Arc<dyn ClinicRepository>,
}

impl ListClinics {
    pub fn new(repository: Arc<dyn ClinicRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<ClinicDto>, UseCaseError> {
        Ok(self.repository.find_all(source).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RepositoryError;
    use crate::impls::InMemoryClinicRepository;

    fn clinic(id: &str, source: ClinicSource) -> ClinicDto {
        ClinicDto {
            id: ClinicId::new(id).unwrap(),
            source,
            name: format!("Clinic {id}"),
            timezone: "America/Sao_Paulo".to_string(),
            active: true,
        }
    }

    #[tokio::test]
    async fn missing_clinic_is_none() {
        let repo = Arc::new(InMemoryClinicRepository::default());
        let use_case = GetClinicById::new(repo);

        let found = use_case
            .execute(ClinicSource::Legacy, &ClinicId::new("999").unwrap())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn clinic_is_scoped_by_source() {
        let repo = Arc::new(InMemoryClinicRepository::default());
        repo.insert(clinic("42", ClinicSource::Platform)).await;
        let use_case = GetClinicById::new(repo);
        let id = ClinicId::new("42").unwrap();

        assert!(use_case.execute(ClinicSource::Platform, &id).await.unwrap().is_some());
        assert!(use_case.execute(ClinicSource::Legacy, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_source() {
        let repo = Arc::new(InMemoryClinicRepository::default());
        repo.insert(clinic("1", ClinicSource::Legacy)).await;
        repo.insert(clinic("2", ClinicSource::Platform)).await;
        let use_case = ListClinics::new(repo);

        assert_eq!(use_case.execute(None).await.unwrap().len(), 2);
        let legacy = use_case.execute(Some(ClinicSource::Legacy)).await.unwrap();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].id.as_str(), "1");
    }

    #[tokio::test]
    async fn storage_failure_is_propagated() {
        let repo = Arc::new(InMemoryClinicRepository::default());
        repo.fail_with(RepositoryError::Unavailable("dynamodb".to_string()))
            .await;
        let use_case = ListClinics::new(repo);

        let err = use_case.execute(None).await.unwrap_err();
        assert!(matches!(err, UseCaseError::Repository(RepositoryError::Unavailable(_))));
    }
}
