//! MessageQueuePort - lead 通知の送信境界
//!
//! use case 層はこの trait だけに依存し、特定の broker を知らない。
//!
//! # 契約
//! - `send` は検証 → `publish` の順。検証エラーは transport を一切呼ばずに返る
//! - 成功時: transport がメッセージを受理済み
//! - 同じ `group_id` の送信は送信順に観測される
//! - 同じ `deduplication_id` の送信は dedup window 内で 1 件に畳まれる
//! - port 自身はリトライ・バッファリング・バッチ化・並べ替えをしない
//!
//! # 実装
//! - **InMemoryMessageQueue**: 開発・テスト用
//! - **SqsFifoQueue**: SQS FIFO（`sqs` feature）

use async_trait::async_trait;

use crate::domain::{DeliveryError, DeliveryOptions, LeadQueueMessage, Outbound, SendError};

#[async_trait]
pub trait MessageQueuePort: Send + Sync {
    /// Validate, then make exactly one publish attempt.
    ///
    /// The message is moved into the port; the producer keeps no handle to it.
    async fn send(
        &self,
        message: LeadQueueMessage,
        options: DeliveryOptions,
    ) -> Result<(), SendError> {
        let outbound = Outbound::validate(message, options)?;
        self.publish(outbound).await?;
        Ok(())
    }

    /// Transport-specific single publish attempt of an already validated message.
    async fn publish(&self, outbound: Outbound) -> Result<(), DeliveryError>;
}
