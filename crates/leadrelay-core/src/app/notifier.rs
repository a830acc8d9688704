//! LeadNotifier - lead イベントを queue に流す producer
//!
//! # フロー
//! 1. `LeadEvent` → `LeadQueueMessage`（発生時刻をそのまま使う）
//! 2. `IdempotencyPolicy` で group / dedup キーを導出
//! 3. `send_with_retry` で送信（リトライ判断はここ、port ではない）

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use super::retry::{RetryPolicy, send_with_retry};
use crate::domain::{
    ClinicId, DeliveryOptions, IdempotencyPolicy, LeadAction, LeadEvent, LeadId, SendError,
};
use crate::ports::{Clock, MessageQueuePort};

pub struct LeadNotifier {
    queue: Arc<dyn MessageQueuePort>,
    clock: Arc<dyn Clock>,
    keys: IdempotencyPolicy,
    retry: RetryPolicy,
}

impl LeadNotifier {
    pub fn new(
        queue: Arc<dyn MessageQueuePort>,
        clock: Arc<dyn Clock>,
        keys: IdempotencyPolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            clock,
            keys,
            retry,
        }
    }

    /// Publish one event. Returns the options used so callers can log/correlate.
    #[instrument(
        level = "info",
        skip(self, event),
        fields(clinic_id = %event.clinic_id, lead_id = %event.lead_id, action = %event.action)
    )]
    pub async fn notify(&self, event: LeadEvent) -> Result<DeliveryOptions, SendError> {
        let message = event.into_message();
        let options = self.keys.derive(&message);
        send_with_retry(self.queue.as_ref(), message, options.clone(), &self.retry).await?;
        info!(deduplication_id = %options.deduplication_id, "lead event published");
        Ok(options)
    }

    /// 発生時刻を clock から取った `LeadEvent`
    pub fn event(&self, clinic_id: ClinicId, lead_id: LeadId, action: LeadAction) -> LeadEvent {
        LeadEvent::new(clinic_id, lead_id, action, self.clock.now())
    }

    /// `notify` with the occurrence time taken from the clock.
    pub async fn notify_now(
        &self,
        clinic_id: ClinicId,
        lead_id: LeadId,
        action: LeadAction,
        payload: Value,
    ) -> Result<DeliveryOptions, SendError> {
        let event = self.event(clinic_id, lead_id, action).with_payload(payload);
        self.notify(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryError, TimeBucket};
    use crate::impls::InMemoryMessageQueue;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::time::Duration;

    fn setup() -> (Arc<InMemoryMessageQueue>, Arc<FixedClock>, LeadNotifier) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ));
        let queue = Arc::new(InMemoryMessageQueue::with_clock(
            Duration::from_secs(300),
            clock.clone(),
        ));
        let retry = RetryPolicy {
            base_delay: Duration::from_millis(1),
            multiplier: 1.0,
            max_delay: Duration::from_millis(1),
            max_attempts: 3,
        };
        let notifier = LeadNotifier::new(
            queue.clone(),
            clock.clone(),
            IdempotencyPolicy::new(TimeBucket::Day),
            retry,
        );
        (queue, clock, notifier)
    }

    fn created(at_minute: u32) -> LeadEvent {
        LeadEvent::new(
            ClinicId::new("42").unwrap(),
            LeadId::new("L-7").unwrap(),
            LeadAction::Created,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, at_minute, 0).unwrap(),
        )
        .with_payload(json!({ "name": "Ana" }))
    }

    #[tokio::test]
    async fn republishing_the_same_event_delivers_once() {
        let (queue, _clock, notifier) = setup();

        let first = notifier.notify(created(0)).await.unwrap();
        let second = notifier.notify(created(5)).await.unwrap();

        assert_eq!(first.deduplication_id, "42:L-7:created:2024-01-01");
        assert_eq!(first, second);
        assert_eq!(queue.drain().await.len(), 1);
    }

    #[tokio::test]
    async fn events_of_one_lead_share_a_group_in_order() {
        let (queue, _clock, notifier) = setup();

        notifier.notify(created(0)).await.unwrap();
        let status = LeadEvent::new(
            ClinicId::new("42").unwrap(),
            LeadId::new("L-7").unwrap(),
            LeadAction::StatusChanged,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 1, 0).unwrap(),
        );
        notifier.notify(status).await.unwrap();

        let delivered = queue.drain().await;
        assert_eq!(delivered.len(), 2);
        assert!(delivered.iter().all(|d| d.group_id == "42:L-7"));
        assert_eq!(delivered[0].message.action(), LeadAction::Created);
        assert_eq!(delivered[1].message.action(), LeadAction::StatusChanged);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_by_the_notifier() {
        let (queue, _clock, notifier) = setup();
        queue.fail_next(DeliveryError::unreachable("dns")).await;

        notifier.notify(created(0)).await.unwrap();
        assert_eq!(queue.publish_attempts().await, 2);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn notify_now_uses_the_clock() {
        let (queue, clock, notifier) = setup();
        clock.set(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 0).unwrap());

        let opts = notifier
            .notify_now(
                ClinicId::new("42").unwrap(),
                LeadId::new("L-8").unwrap(),
                LeadAction::Assigned,
                json!({ "agent": "maria" }),
            )
            .await
            .unwrap();

        assert_eq!(opts.deduplication_id, "42:L-8:assigned:2024-02-29");
        let delivered = queue.drain().await;
        assert_eq!(delivered[0].message.payload()["agent"], "maria");
    }
}
