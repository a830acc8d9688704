//! Domain model (ids, records, messages, delivery keys, errors).

pub mod delivery;
pub mod errors;
pub mod events;
pub mod idempotency;
pub mod ids;
pub mod message;
pub mod records;

pub use self::delivery::{DeliveryOptions, MAX_KEY_LEN, Outbound};
pub use self::errors::{
    DeliveryError, DeliveryErrorKind, NotFoundError, RepositoryError, SendError, UseCaseError,
    ValidationError,
};
pub use self::events::LeadEvent;
pub use self::idempotency::{IdempotencyPolicy, TimeBucket, UnknownTimeBucket};
pub use self::ids::{BotConfigId, ClinicId, LeadId, MessageId, NotificationId, PatientId};
pub use self::message::{LeadAction, LeadQueueMessage, MAX_MESSAGE_BYTES};
pub use self::records::{
    BotConfigDto, ClinicDto, ClinicSource, LeadDto, LeadStatus, NotificationDto, PatientDto,
    UnknownClinicSource,
};
