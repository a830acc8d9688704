//! Bot config use cases.

use std::sync::Arc;

use crate::domain::{
    BotConfigDto, BotConfigId, ClinicId, ClinicSource, NotFoundError, UseCaseError,
};
use crate::ports::{BotConfigRepository, Clock};

pub struct GetBotConfig {
    repository: Arc<dyn BotConfigRepository>,
}

impl GetBotConfig {
    pub fn new(repository: Arc<dyn BotConfigRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: ClinicSource,
        id: &BotConfigId,
    ) -> Result<Option<BotConfigDto>, UseCaseError> {
        Ok(self.repository.find_by_id(source, id).await?)
    }
}

pub struct ListBotConfigs {
    repository: Arc<dyn BotConfigRepository>,
}

impl ListBotConfigs {
    pub fn new(repository: Arc<dyn BotConfigRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<BotConfigDto>, UseCaseError> {
        Ok(self.repository.find_all(source).await?)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteBotConfigArgs {
    pub id: BotConfigId,
    pub source: ClinicSource,
    pub clinic_id: ClinicId,
}

/// Deleting a config that does not exist, or that belongs to another clinic,
/// is `NotFoundError::BotConfig`.
pub struct DeleteBotConfig {
    repository: Arc<dyn BotConfigRepository>,
}

impl DeleteBotConfig {
    pub fn new(repository: Arc<dyn BotConfigRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, args: DeleteBotConfigArgs) -> Result<(), UseCaseError> {
        let existing = self.repository.find_by_id(args.source, &args.id).await?;
        match existing {
            Some(config) if config.clinic_id == args.clinic_id => {
                self.repository
                    .delete(&args.id, args.source, &args.clinic_id)
                    .await?;
                Ok(())
            }
            _ => Err(NotFoundError::BotConfig(args.id).into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateBotConfigArgs {
    pub id: BotConfigId,
    pub source: ClinicSource,
    pub enabled: bool,
    pub settings: serde_json::Value,
}

/// Returns the config as stored after the update.
pub struct UpdateBotConfig {
    repository: Arc<dyn BotConfigRepository>,
    clock: Arc<dyn Clock>,
}

impl UpdateBotConfig {
    pub fn new(repository: Arc<dyn BotConfigRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn execute(&self, args: UpdateBotConfigArgs) -> Result<BotConfigDto, UseCaseError> {
        if self.repository.find_by_id(args.source, &args.id).await?.is_none() {
            return Err(NotFoundError::BotConfig(args.id).into());
        }
        self.repository
            .update_settings(
                args.source,
                &args.id,
                args.enabled,
                args.settings,
                self.clock.now(),
            )
            .await?;
        self.repository
            .find_by_id(args.source, &args.id)
            .await?
            .ok_or_else(|| NotFoundError::BotConfig(args.id).into())
    }
}
