//! Patient use cases.

use std::sync::Arc;

use crate::domain::{ClinicSource, PatientDto, PatientId, UseCaseError};
use crate::ports::PatientRepository;

pub struct GetPatient {
    repository: Arc<dyn PatientRepository>,
}

impl GetPatient {
    pub fn new(repository: Arc<dyn PatientRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: ClinicSource,
        id: &PatientId,
    ) -> Result<Option<PatientDto>, UseCaseError> {
        Ok(self.repository.find_by_id(source, id).await?)
    }
}

pub struct ListPatients {
    repository: Arc<dyn PatientRepository>,
}

impl ListPatients {
    pub fn new(repository: Arc<dyn PatientRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<PatientDto>, UseCaseError> {
        Ok(self.repository.find_all(source).await?)
    }
}
