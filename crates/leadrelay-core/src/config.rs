//! RelayConfig - 環境変数からの設定読み込み
//!
//! | 変数                            | 既定値 |
//! |---------------------------------|--------|
//! | `LEADRELAY_QUEUE_URL`           | なし（未設定ならインメモリキュー） |
//! | `LEADRELAY_DEDUP_WINDOW_SECS`   | 300    |
//! | `LEADRELAY_TIME_BUCKET`         | day    |
//! | `LEADRELAY_RETRY_BASE_MS`       | 200    |
//! | `LEADRELAY_RETRY_MULTIPLIER`    | 2.0    |
//! | `LEADRELAY_RETRY_MAX_ATTEMPTS`  | 5      |
//! | `LEADRELAY_POOL_SIZE`           | 4      |
//!
//! 空文字の変数は未設定として扱う。

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::app::RetryPolicy;
use crate::domain::{IdempotencyPolicy, TimeBucket};
use crate::impls::DEFAULT_DEDUP_WINDOW;

pub const ENV_QUEUE_URL: &str = "LEADRELAY_QUEUE_URL";
pub const ENV_DEDUP_WINDOW_SECS: &str = "LEADRELAY_DEDUP_WINDOW_SECS";
pub const ENV_TIME_BUCKET: &str = "LEADRELAY_TIME_BUCKET";
pub const ENV_RETRY_BASE_MS: &str = "LEADRELAY_RETRY_BASE_MS";
pub const ENV_RETRY_MULTIPLIER: &str = "LEADRELAY_RETRY_MULTIPLIER";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "LEADRELAY_RETRY_MAX_ATTEMPTS";
pub const ENV_POOL_SIZE: &str = "LEADRELAY_POOL_SIZE";

const DEFAULT_POOL_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// SQS FIFO queue URL. `None` means the in-memory queue.
    pub queue_url: Option<String>,
    pub dedup_window: Duration,
    pub time_bucket: TimeBucket,
    pub retry: RetryPolicy,
    pub pool_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_url: None,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            time_bucket: TimeBucket::Day,
            retry: RetryPolicy::default_v1(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `lookup` から読む（テストでプロセス環境を汚さないため）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let dedup_window = match parse::<u64>(ENV_DEDUP_WINDOW_SECS, get(ENV_DEDUP_WINDOW_SECS))? {
            Some(secs) => Duration::from_secs(secs),
            None => defaults.dedup_window,
        };

        let time_bucket =
            parse::<TimeBucket>(ENV_TIME_BUCKET, get(ENV_TIME_BUCKET))?.unwrap_or(defaults.time_bucket);

        let mut retry = defaults.retry;
        if let Some(ms) = parse::<u64>(ENV_RETRY_BASE_MS, get(ENV_RETRY_BASE_MS))? {
            retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(multiplier) = parse::<f64>(ENV_RETRY_MULTIPLIER, get(ENV_RETRY_MULTIPLIER))? {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(ConfigError::Invalid {
                    var: ENV_RETRY_MULTIPLIER,
                    value: multiplier.to_string(),
                    reason: "must be a finite number >= 1.0".to_string(),
                });
            }
            retry.multiplier = multiplier;
        }
        if let Some(attempts) = parse::<u32>(ENV_RETRY_MAX_ATTEMPTS, get(ENV_RETRY_MAX_ATTEMPTS))? {
            if attempts == 0 {
                return Err(ConfigError::Zero {
                    var: ENV_RETRY_MAX_ATTEMPTS,
                });
            }
            retry.max_attempts = attempts;
        }

        let pool_size = parse::<usize>(ENV_POOL_SIZE, get(ENV_POOL_SIZE))?.unwrap_or(defaults.pool_size);
        if pool_size == 0 {
            return Err(ConfigError::Zero { var: ENV_POOL_SIZE });
        }

        Ok(Self {
            queue_url: get(ENV_QUEUE_URL).map(|v| v.trim().to_string()),
            dedup_window,
            time_bucket,
            retry,
            pool_size,
        })
    }

    pub fn idempotency(&self) -> IdempotencyPolicy {
        IdempotencyPolicy::new(self.time_bucket)
    }
}

fn parse<T>(var: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        })
    })
    .transpose()
}
