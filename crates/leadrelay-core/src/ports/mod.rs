//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（キュー, DynamoDB / MySQL など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - use case はここにある trait だけに依存する
//! - クライアントは起動時に 1 度だけ構築し、コンストラクタで渡す（グローバル状態なし）

pub mod clock;
pub mod id_generator;
pub mod message_queue;
pub mod repositories;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::message_queue::MessageQueuePort;
pub use self::repositories::{
    BotConfigRepository, ClinicRepository, LeadRepository, NotificationRepository,
    PatientRepository,
};
