//! Use cases - 1 操作 = 1 struct（`execute(args)`）
//!
//! リポジトリへの薄い委譲。エラーは握りつぶさず `UseCaseError` で境界まで返す。

pub mod bot_configs;
pub mod clinics;
pub mod leads;
pub mod notifications;
pub mod patients;

pub use self::bot_configs::{
    DeleteBotConfig, DeleteBotConfigArgs, GetBotConfig, ListBotConfigs, UpdateBotConfig,
    UpdateBotConfigArgs,
};
pub use self::clinics::{GetClinicById, ListClinics};
pub use self::leads::{ChangeLeadStatus, ChangeLeadStatusArgs};
pub use self::notifications::{
    DeleteNotification, DeleteNotificationArgs, GetNotification, ListNotifications,
};
pub use self::patients::{GetPatient, ListPatients};
