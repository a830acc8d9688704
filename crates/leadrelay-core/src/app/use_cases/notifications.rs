//! Notification use cases.

use std::sync::Arc;

use crate::domain::{
    ClinicId, ClinicSource, NotFoundError, NotificationDto, NotificationId, UseCaseError,
};
use crate::ports::NotificationRepository;

pub struct GetNotification {
    repository: Arc<dyn NotificationRepository>,
}

impl GetNotification {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        source: ClinicSource,
        id: &NotificationId,
    ) -> Result<Option<NotificationDto>, UseCaseError> {
        Ok(self.repository.find_by_id(source, id).await?)
    }
}

pub struct ListNotifications {
    repository: Arc<dyn NotificationRepository>,
}

impl ListNotifications {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    /// Newest first.
    pub async fn execute(
        &self,
        source: Option<ClinicSource>,
    ) -> Result<Vec<NotificationDto>, UseCaseError> {
        let mut notifications = self.repository.find_all(source).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteNotificationArgs {
    pub id: NotificationId,
    pub source: ClinicSource,
    pub clinic_id: ClinicId,
}

pub struct DeleteNotification {
    repository: Arc<dyn NotificationRepository>,
}

impl DeleteNotification {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, args: DeleteNotificationArgs) -> Result<(), UseCaseError> {
        match self.repository.find_by_id(args.source, &args.id).await? {
            Some(n) if n.clinic_id == args.clinic_id => {
                self.repository
                    .delete(&args.id, args.source, &args.clinic_id)
                    .await?;
                Ok(())
            }
            _ => Err(NotFoundError::Notification(args.id).into()),
        }
    }
}
