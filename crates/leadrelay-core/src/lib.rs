//! leadrelay-core
//!
//! Lead notification dispatch for the multi-tenant clinic backend.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, records, LeadQueueMessage, DeliveryOptions, 冪等キー, errors）
//! - **ports**: 抽象化レイヤー（MessageQueuePort, repositories, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（LeadNotifier, send_with_retry, use cases, ApiResponse）
//! - **impls**: 実装（InMemoryMessageQueue, SqsFifoQueue, in-memory repositories, ConnectionPool）
//! - **config**: 環境変数からの設定（RelayConfig）
//!
//! # 配送の約束
//! - 同じ `group_id` のメッセージは送信順に観測される
//! - 同じ `deduplication_id` は dedup window 内で 1 回だけ配送される
//! - 送信前の検証エラーでは transport は呼ばれない

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
