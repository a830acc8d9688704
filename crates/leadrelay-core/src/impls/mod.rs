//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryMessageQueue**: 開発・テスト用の FIFO キュー（dedup window 付き）
//! - **SqsFifoQueue**: SQS FIFO への送信（実クライアントは `sqs` feature）
//! - **InMemory*Repository**: 開発・テスト用のリポジトリ
//! - **ConnectionPool**: スコープ付きのコネクション貸し出し
//! - **PooledRepository**: repository 呼び出しを `ConnectionPool` 経由にする adapter

pub mod inmem_queue;
pub mod inmem_repositories;
pub mod pool;
pub mod pooled;
pub mod sqs;

// 主要な型を再エクスポート
pub use self::inmem_queue::{DEFAULT_DEDUP_WINDOW, DeliveredMessage, InMemoryMessageQueue};
pub use self::inmem_repositories::{
    InMemoryBotConfigRepository, InMemoryClinicRepository, InMemoryLeadRepository,
    InMemoryNotificationRepository, InMemoryPatientRepository,
};
pub use self::pool::{ConnectionPool, PooledConnection};
pub use self::pooled::PooledRepository;
pub use self::sqs::{SqsApi, SqsFifoQueue};
#[cfg(feature = "sqs")]
pub use self::sqs::real::AwsSqsApi;
