//! InMemoryMessageQueue - 開発・テスト用の FIFO キュー
//!
//! SQS FIFO と同じ配送セマンティクスをプロセス内で再現します。
//!
//! # 実装詳細
//! - 受理済みメッセージは到着順の VecDeque 1 本で保持（group 内 FIFO が自然に保たれる）
//! - dedup: `deduplication_id -> 受理時刻` の HashMap。window を過ぎたエントリは publish 時に掃除
//! - 受信側（consumer）は `receive(group, timeout)` / `receive_any(timeout)`
//! - tokio の Mutex + Notify で「push が pop を起こす」
//!
//! # テスト用フック
//! - `fail_next`: 次の publish を指定の DeliveryError で失敗させる
//! - `publish_attempts`: transport が呼ばれた回数（検証エラー時は増えない）

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, instrument};

use crate::domain::{DeliveryError, LeadQueueMessage, MessageId, Outbound};
use crate::ports::{Clock, IdGenerator, MessageQueuePort, SystemClock, UlidGenerator};

/// Default dedup window (same as SQS FIFO).
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(300);

/// A message as observed by a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredMessage {
    pub message_id: MessageId,
    /// Global acceptance order, starting at 1.
    pub sequence: u64,
    pub group_id: String,
    pub deduplication_id: String,
    pub accepted_at: DateTime<Utc>,
    pub message: LeadQueueMessage,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<DeliveredMessage>,
    dedup: HashMap<String, DateTime<Utc>>,
    next_sequence: u64,
    publish_attempts: usize,
    injected_failures: VecDeque<DeliveryError>,
}

impl QueueState {
    fn prune_dedup(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        self.dedup.retain(|_, accepted_at| now - *accepted_at < window);
    }

    fn take(&mut self, group_id: Option<&str>) -> Option<DeliveredMessage> {
        let index = match group_id {
            Some(group) => self.pending.iter().position(|m| m.group_id == group)?,
            None => 0,
        };
        self.pending.remove(index)
    }
}

pub struct InMemoryMessageQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    dedup_window: chrono::Duration,
}

impl InMemoryMessageQueue {
    pub fn new(dedup_window: Duration) -> Self {
        Self::with_clock(dedup_window, Arc::new(SystemClock))
    }

    pub fn with_clock(dedup_window: Duration, clock: Arc<dyn Clock>) -> Self {
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            notify: Arc::new(Notify::new()),
            clock,
            ids,
            dedup_window: chrono::Duration::from_std(dedup_window)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// 次の publish を `error` で失敗させる（呼ぶたびに 1 件ずつ積まれる）
    pub async fn fail_next(&self, error: DeliveryError) {
        self.state.lock().await.injected_failures.push_back(error);
    }

    pub async fn publish_attempts(&self) -> usize {
        self.state.lock().await.publish_attempts
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.pending.is_empty()
    }

    /// 指定 group の先頭メッセージを取り出す（timeout までに来なければ None）
    pub async fn receive(&self, group_id: &str, timeout: Duration) -> Option<DeliveredMessage> {
        self.wait_for(Some(group_id), timeout).await
    }

    /// 到着順で次のメッセージを取り出す
    pub async fn receive_any(&self, timeout: Duration) -> Option<DeliveredMessage> {
        self.wait_for(None, timeout).await
    }

    /// Everything currently pending, in acceptance order.
    pub async fn drain(&self) -> Vec<DeliveredMessage> {
        self.state.lock().await.pending.drain(..).collect()
    }

    async fn wait_for(&self, group_id: Option<&str>, timeout: Duration) -> Option<DeliveredMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // 状態を見る前に登録しておかないと、その間の publish 通知を取りこぼす
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivered) = self.state.lock().await.take(group_id) {
                return Some(delivered);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return None,
            }
        }
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

#[async_trait]
impl MessageQueuePort for InMemoryMessageQueue {
    #[instrument(
        level = "debug",
        skip(self, outbound),
        fields(group_id = %outbound.group_id(), deduplication_id = %outbound.deduplication_id())
    )]
    async fn publish(&self, outbound: Outbound) -> Result<(), DeliveryError> {
        {
            let mut state = self.state.lock().await;
            state.publish_attempts += 1;

            if let Some(error) = state.injected_failures.pop_front() {
                debug!(%error, "injected delivery failure");
                return Err(error);
            }

            let now = self.clock.now();
            state.prune_dedup(now, self.dedup_window);

            if state.dedup.contains_key(outbound.deduplication_id()) {
                debug!("duplicate inside dedup window, collapsed");
                return Ok(());
            }

            let (message, options) = outbound.into_parts();
            state.dedup.insert(options.deduplication_id.clone(), now);
            state.next_sequence += 1;
            let delivered = DeliveredMessage {
                message_id: self.ids.generate_message_id(),
                sequence: state.next_sequence,
                group_id: options.group_id,
                deduplication_id: options.deduplication_id,
                accepted_at: now,
                message,
            };
            debug!(message_id = %delivered.message_id, sequence = delivered.sequence, "accepted");
            state.pending.push_back(delivered);
        } // Lock released here

        self.notify.notify_waiters();
        Ok(())
    }
}
