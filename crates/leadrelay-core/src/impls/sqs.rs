//! SQS FIFO transport for lead messages.
//!
//! The message body is the JSON encoding of `LeadQueueMessage`; `group_id` and
//! `deduplication_id` map onto SQS `MessageGroupId` / `MessageDeduplicationId`, so
//! ordering and the 5-minute dedup window are enforced by SQS itself.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::{DeliveryError, Outbound};
use crate::ports::MessageQueuePort;

/// Error codes SQS uses when it sheds load.
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestThrottledException",
    "RequestLimitExceeded",
    "KmsThrottled",
];

pub(crate) fn is_throttling_code(code: &str) -> bool {
    THROTTLING_CODES.contains(&code)
}

#[async_trait]
pub trait SqsApi: Send + Sync {
    /// Returns the SQS message id.
    async fn send_message(
        &self,
        queue_url: &str,
        body: String,
        group_id: &str,
        deduplication_id: &str,
    ) -> Result<String, DeliveryError>;
}

#[derive(Clone)]
pub struct SqsFifoQueue<C: SqsApi> {
    client: C,
    queue_url: String,
}

impl<C: SqsApi> SqsFifoQueue<C> {
    pub fn new(client: C, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl<C: SqsApi> MessageQueuePort for SqsFifoQueue<C> {
    #[instrument(
        level = "info",
        skip(self, outbound),
        fields(group_id = %outbound.group_id(), deduplication_id = %outbound.deduplication_id())
    )]
    async fn publish(&self, outbound: Outbound) -> Result<(), DeliveryError> {
        let body = outbound
            .message()
            .to_json()
            .map_err(|e| DeliveryError::rejected(format!("serialize message: {e}")))?;
        let message_id = self
            .client
            .send_message(
                &self.queue_url,
                body,
                outbound.group_id(),
                outbound.deduplication_id(),
            )
            .await?;
        debug!(%message_id, "sqs accepted message");
        Ok(())
    }
}

/// Real SQS client adapter (only compiled when the `sqs` feature is enabled).
#[cfg(feature = "sqs")]
pub mod real {
    use super::{SqsApi, is_throttling_code};
    use crate::domain::DeliveryError;
    use aws_sdk_sqs::Client as SqsClient;
    use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
    use aws_sdk_sqs::operation::send_message::SendMessageError;
    use tracing::instrument;

    #[derive(Clone)]
    pub struct AwsSqsApi {
        inner: SqsClient,
    }

    impl AwsSqsApi {
        pub fn new(inner: SqsClient) -> Self {
            Self { inner }
        }
    }

    fn classify(err: SdkError<SendMessageError>) -> DeliveryError {
        let detail = format!("sqs send: {}", DisplayErrorContext(&err));
        match &err {
            SdkError::TimeoutError(_) => DeliveryError::timeout(detail),
            SdkError::DispatchFailure(_) => DeliveryError::unreachable(detail),
            SdkError::ServiceError(_) | SdkError::ResponseError(_) => match err.code() {
                Some(code) if is_throttling_code(code) => DeliveryError::throttled(detail),
                _ if matches!(err, SdkError::ResponseError(_)) => {
                    DeliveryError::unreachable(detail)
                }
                _ => DeliveryError::rejected(detail),
            },
            _ => DeliveryError::rejected(detail),
        }
    }

    #[async_trait::async_trait]
    impl SqsApi for AwsSqsApi {
        #[instrument(level = "debug", skip(self, body))]
        async fn send_message(
            &self,
            queue_url: &str,
            body: String,
            group_id: &str,
            deduplication_id: &str,
        ) -> Result<String, DeliveryError> {
            let resp = self
                .inner
                .send_message()
                .queue_url(queue_url)
                .message_body(body)
                .message_group_id(group_id)
                .message_deduplication_id(deduplication_id)
                .send()
                .await
                .map_err(classify)?;
            Ok(resp.message_id.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ClinicId, DeliveryErrorKind, DeliveryOptions, LeadAction, LeadId, LeadQueueMessage,
        SendError, ValidationError,
    };
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct SentMessage {
        queue_url: String,
        body: String,
        group_id: String,
        deduplication_id: String,
    }

    #[derive(Default)]
    struct FakeSqs {
        sent: Mutex<Vec<SentMessage>>,
        fail_with: Option<DeliveryError>,
    }

    #[async_trait]
    impl SqsApi for FakeSqs {
        async fn send_message(
            &self,
            queue_url: &str,
            body: String,
            group_id: &str,
            deduplication_id: &str,
        ) -> Result<String, DeliveryError> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentMessage {
                queue_url: queue_url.to_string(),
                body,
                group_id: group_id.to_string(),
                deduplication_id: deduplication_id.to_string(),
            });
            Ok(format!("m-{}", sent.len()))
        }
    }

    fn message() -> LeadQueueMessage {
        LeadQueueMessage::new(
            ClinicId::new("42").unwrap(),
            LeadId::new("L-7").unwrap(),
            LeadAction::Created,
            json!({ "name": "Ana" }),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    const URL: &str = "https://sqs.sa-east-1.amazonaws.com/123/leads.fifo";

    #[tokio::test]
    async fn publish_maps_keys_onto_fifo_attributes() {
        let queue = SqsFifoQueue::new(FakeSqs::default(), URL);

        queue
            .send(message(), DeliveryOptions::new("42:L-7", "42:L-7:created:2024-01-01"))
            .await
            .unwrap();

        let sent = queue.client.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].queue_url, URL);
        assert_eq!(sent[0].group_id, "42:L-7");
        assert_eq!(sent[0].deduplication_id, "42:L-7:created:2024-01-01");

        let body: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(body["clinic_id"], "42");
        assert_eq!(body["lead_id"], "L-7");
        assert_eq!(body["action"], "created");
        assert_eq!(body["payload"]["name"], "Ana");
    }

    #[tokio::test]
    async fn invalid_options_never_reach_sqs() {
        let queue = SqsFifoQueue::new(FakeSqs::default(), URL);

        let err = queue
            .send(message(), DeliveryOptions::new("", "x"))
            .await
            .unwrap_err();

        assert_eq!(err, SendError::Validation(ValidationError::EmptyGroupId));
        assert!(queue.client.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_error_is_surfaced_unchanged() {
        let fake = FakeSqs {
            fail_with: Some(DeliveryError::throttled("RequestThrottled")),
            ..FakeSqs::default()
        };
        let queue = SqsFifoQueue::new(fake, URL);

        let err = queue
            .send(message(), DeliveryOptions::new("g", "d"))
            .await
            .unwrap_err();

        match err {
            SendError::Delivery(e) => assert_eq!(e.kind(), DeliveryErrorKind::Throttled),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case("ThrottlingException", true)]
    #[case("RequestThrottled", true)]
    #[case("KmsThrottled", true)]
    #[case("InvalidParameterValue", false)]
    #[case("AWS.SimpleQueueService.NonExistentQueue", false)]
    fn throttling_codes(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(is_throttling_code(code), expected);
    }
}
