//! Producer-side key derivation.
//!
//! `deduplication_id` と `group_id` はメッセージの意味的な同一性から決定的に導出する。
//! 乱数や送信時刻は使わない（同じイベントの再送が別メッセージになってしまうため）。
//!
//! - group: `{clinic_id}:{lead_id}`
//! - dedup: `{clinic_id}:{lead_id}:{action}:{bucket}`
//! - dedup（`event_key` あり）: `{clinic_id}:{lead_id}:{action}:{event_key}`
//!
//! bucket はイベント発生時刻（`LeadQueueMessage::created_at`）を `TimeBucket` で丸めたもの。
//! id に `:` が含まれる場合や transport が受け付けない場合は SHA-256 digest に置き換える。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::delivery::{DeliveryOptions, MAX_KEY_LEN, is_key_char};
use super::message::LeadQueueMessage;

/// Coarse time bucket folded into the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Minute,
    Hour,
    Day,
}

impl TimeBucket {
    pub fn label(self, at: DateTime<Utc>) -> String {
        let format = match self {
            TimeBucket::Minute => "%Y-%m-%dT%H:%M",
            TimeBucket::Hour => "%Y-%m-%dT%H",
            TimeBucket::Day => "%Y-%m-%d",
        };
        at.format(format).to_string()
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeBucket::Minute => "minute",
            TimeBucket::Hour => "hour",
            TimeBucket::Day => "day",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time bucket {0:?} (expected minute, hour or day)")]
pub struct UnknownTimeBucket(pub String);

impl FromStr for TimeBucket {
    type Err = UnknownTimeBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(TimeBucket::Minute),
            "hour" => Ok(TimeBucket::Hour),
            "day" => Ok(TimeBucket::Day),
            _ => Err(UnknownTimeBucket(s.to_string())),
        }
    }
}

/// IdempotencyPolicy はメッセージから DeliveryOptions を導出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyPolicy {
    pub bucket: TimeBucket,
}

impl IdempotencyPolicy {
    pub fn new(bucket: TimeBucket) -> Self {
        Self { bucket }
    }

    pub fn group_id(&self, message: &LeadQueueMessage) -> String {
        compose(&[message.clinic_id().as_str(), message.lead_id().as_str()])
    }

    /// `event_key` があれば bucket の代わりに使う（発生時刻に依存しない）
    pub fn deduplication_id(&self, message: &LeadQueueMessage) -> String {
        let last = match message.event_key() {
            Some(key) => key.to_string(),
            None => self.bucket.label(message.created_at()),
        };
        compose(&[
            message.clinic_id().as_str(),
            message.lead_id().as_str(),
            message.action().as_str(),
            &last,
        ])
    }

    pub fn derive(&self, message: &LeadQueueMessage) -> DeliveryOptions {
        DeliveryOptions::new(self.group_id(message), self.deduplication_id(message))
    }
}

impl Default for IdempotencyPolicy {
    fn default() -> Self {
        Self::new(TimeBucket::Day)
    }
}

const SEPARATOR: char = ':';

/// Joins `parts` with `:`.
///
/// The plain form is used only when it is unambiguous and the transport accepts it.
/// Only the leading parts must be free of `:`; the last one (a bucket label such as
/// `2024-01-01T13:05`) is whatever follows the last separator. Otherwise the key is the SHA-256 hex digest of the length-prefixed parts, so
/// `("4:2", "L")` and `("4", "2:L")` never meet. A digest has no `:`, so it cannot
/// equal a plain key either.
fn compose(parts: &[&str]) -> String {
    let plain = parts.join(":");
    let leading = &parts[..parts.len().saturating_sub(1)];
    let ambiguous = leading.iter().any(|p| p.contains(SEPARATOR));
    if !ambiguous && plain.len() <= MAX_KEY_LEN && plain.chars().all(is_key_char) {
        return plain;
    }

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.len().to_string().as_bytes());
        hasher.update(b"#");
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ClinicId, LeadId};
    use crate::domain::message::LeadAction;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn message(lead: &str, action: LeadAction, at: DateTime<Utc>) -> LeadQueueMessage {
        LeadQueueMessage::new(
            ClinicId::new("42").unwrap(),
            LeadId::new(lead).unwrap(),
            action,
            json!({}),
            at,
        )
    }

    #[test]
    fn lead_created_key_matches_documented_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 15, 42, 10).unwrap();
        let opts = IdempotencyPolicy::default().derive(&message("L-7", LeadAction::Created, at));

        assert_eq!(opts.group_id, "42:L-7");
        assert_eq!(opts.deduplication_id, "42:L-7:created:2024-01-01");
        assert!(opts.validate().is_ok());
    }

    #[rstest]
    #[case::minute(TimeBucket::Minute, "2024-03-05T07:09")]
    #[case::hour(TimeBucket::Hour, "2024-03-05T07")]
    #[case::day(TimeBucket::Day, "2024-03-05")]
    fn bucket_labels(#[case] bucket: TimeBucket, #[case] expected: &str) {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 9, 59).unwrap();
        assert_eq!(bucket.label(at), expected);
    }

    #[test]
    fn same_event_derives_same_key() {
        let policy = IdempotencyPolicy::new(TimeBucket::Hour);
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 1).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 1, 10, 59, 59).unwrap();

        let first = policy.derive(&message("L-7", LeadAction::Assigned, a));
        let second = policy.derive(&message("L-7", LeadAction::Assigned, b));
        assert_eq!(first, second);
    }

    #[test]
    fn different_action_or_bucket_changes_the_key() {
        let policy = IdempotencyPolicy::default();
        let day1 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

        let created = policy.deduplication_id(&message("L-7", LeadAction::Created, day1));
        let updated = policy.deduplication_id(&message("L-7", LeadAction::Updated, day1));
        let next_day = policy.deduplication_id(&message("L-7", LeadAction::Created, day2));

        assert_ne!(created, updated);
        assert_ne!(created, next_day);
    }

    #[test]
    fn group_is_shared_across_actions_of_one_lead() {
        let policy = IdempotencyPolicy::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(
            policy.group_id(&message("L-7", LeadAction::Created, at)),
            policy.group_id(&message("L-7", LeadAction::Deleted, at)),
        );
    }

    #[test]
    fn unusable_keys_are_hashed_deterministically() {
        let policy = IdempotencyPolicy::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let m = message("lead with spaces", LeadAction::Created, at);

        let first = policy.deduplication_id(&m);
        let second = policy.deduplication_id(&m);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(policy.derive(&m).validate().is_ok());
    }

    #[test]
    fn separator_inside_ids_does_not_merge_tenants() {
        let policy = IdempotencyPolicy::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let a = LeadQueueMessage::new(
            ClinicId::new("4:2").unwrap(),
            LeadId::new("L").unwrap(),
            LeadAction::Created,
            json!({}),
            at,
        );
        let b = LeadQueueMessage::new(
            ClinicId::new("4").unwrap(),
            LeadId::new("2:L").unwrap(),
            LeadAction::Created,
            json!({}),
            at,
        );

        let a = policy.derive(&a);
        let b = policy.derive(&b);
        assert_ne!(a.group_id, b.group_id);
        assert_ne!(a.deduplication_id, b.deduplication_id);
        assert!(a.validate().is_ok());
        assert!(b.validate().is_ok());

        // 素の形 "4:2:L" ではなく digest になる
        assert_eq!(a.group_id.len(), 64);
        assert!(!b.group_id.contains(':'));
    }

    #[test]
    fn minute_label_keeps_the_plain_form() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let key = IdempotencyPolicy::new(TimeBucket::Minute)
            .deduplication_id(&message("L-7", LeadAction::Created, at));
        assert_eq!(key, "42:L-7:created:2024-01-01T10:00");
    }

    #[test]
    fn event_key_replaces_the_bucket() {
        let policy = IdempotencyPolicy::default();
        let morning = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();

        let first = message("L-7", LeadAction::StatusChanged, morning).with_event_key("r1");
        let second = message("L-7", LeadAction::StatusChanged, morning).with_event_key("r2");
        let retried = message("L-7", LeadAction::StatusChanged, next_day).with_event_key("r1");

        assert_eq!(policy.deduplication_id(&first), "42:L-7:status_changed:r1");
        assert_ne!(policy.deduplication_id(&first), policy.deduplication_id(&second));
        assert_eq!(policy.deduplication_id(&first), policy.deduplication_id(&retried));
    }

    #[test]
    fn time_bucket_parses_case_insensitively() {
        assert_eq!("HOUR".parse::<TimeBucket>().unwrap(), TimeBucket::Hour);
        assert!("week".parse::<TimeBucket>().is_err());
    }
}
