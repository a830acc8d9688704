//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **LeadNotifier**: lead イベント → 冪等キー導出 → queue への送信
//! - **send_with_retry / RetryPolicy**: 呼び出し側のリトライ（指数バックオフ）
//! - **use_cases**: CRUD の 1 操作 = 1 struct
//! - **ApiResponse**: use case の結果・エラーを HTTP レスポンスの形に変換

pub mod notifier;
pub mod response;
pub mod retry;
pub mod use_cases;

// 主要な型を再エクスポート
pub use self::notifier::LeadNotifier;
pub use self::response::{ApiResponse, status_for};
pub use self::retry::{RetryPolicy, send_with_retry};
