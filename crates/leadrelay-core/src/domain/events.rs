//! Events - ドメインイベント
//!
//! lead に関して外部システムへ届けるべき出来事。
//! `occurred_at` は発生時刻で、dedup キーの bucket はここから決まる。

use chrono::{DateTime, Utc};

use super::ids::{ClinicId, LeadId};
use super::message::{LeadAction, LeadQueueMessage};

#[derive(Debug, Clone, PartialEq)]
pub struct LeadEvent {
    pub clinic_id: ClinicId,
    pub lead_id: LeadId,
    pub action: LeadAction,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    /// See `LeadQueueMessage::event_key`.
    pub event_key: Option<String>,
}

impl LeadEvent {
    pub fn new(
        clinic_id: ClinicId,
        lead_id: LeadId,
        action: LeadAction,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            clinic_id,
            lead_id,
            action,
            payload: serde_json::Value::Null,
            occurred_at,
            event_key: None,
        }
    }

    pub fn with_event_key(mut self, event_key: impl Into<String>) -> Self {
        self.event_key = Some(event_key.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn into_message(self) -> LeadQueueMessage {
        let message = LeadQueueMessage::new(
            self.clinic_id,
            self.lead_id,
            self.action,
            self.payload,
            self.occurred_at,
        );
        match self.event_key {
            Some(key) => message.with_event_key(key),
            None => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn message_keeps_the_occurrence_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let event = LeadEvent::new(
            ClinicId::new("42").unwrap(),
            LeadId::new("L-7").unwrap(),
            LeadAction::Created,
            at,
        )
        .with_payload(json!({ "name": "Ana" }));

        let message = event.into_message();
        assert_eq!(message.created_at(), at);
        assert_eq!(message.action(), LeadAction::Created);
        assert_eq!(message.payload()["name"], "Ana");
        assert_eq!(message.event_key(), None);
    }

    #[test]
    fn event_key_is_carried_to_the_message() {
        let message = LeadEvent::new(
            ClinicId::new("42").unwrap(),
            LeadId::new("L-7").unwrap(),
            LeadAction::StatusChanged,
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        )
        .with_event_key("r2")
        .into_message();

        assert_eq!(message.event_key(), Some("r2"));
    }
}
