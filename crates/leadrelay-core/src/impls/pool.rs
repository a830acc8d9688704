//! ConnectionPool - スコープ付きのコネクション貸し出し
//!
//! 借りたコネクションは `PooledConnection` が drop された時点で idle リストに戻る。
//! use case が `?` で早期 return しても返却は漏れない。
//!
//! # 実装詳細
//! - 同時貸し出し数は tokio の `Semaphore` で制限（permit 数 = コネクション数）
//! - idle リストは std の Mutex（await をまたいで保持しない）
//! - 返却は「コネクションを戻す → permit を解放」の順。permit を得た側は必ず idle を取れる

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::domain::RepositoryError;

fn lock<C>(idle: &Mutex<Vec<C>>) -> MutexGuard<'_, Vec<C>> {
    // idle リストは push/pop しかしないので poison されても中身は壊れていない
    idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ConnectionPool<C> {
    idle: Arc<Mutex<Vec<C>>>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl<C> ConnectionPool<C> {
    pub fn new(connections: Vec<C>) -> Self {
        let size = connections.len();
        Self {
            idle: Arc::new(Mutex::new(connections)),
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 今すぐ貸し出せるコネクション数
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// 以降の `acquire` を `RepositoryError::Unavailable` で失敗させる。
    /// 貸し出し中のコネクションはそのまま使える。
    pub fn close(&self) {
        self.permits.close();
    }

    /// 空きが出るまで待ってから 1 本借りる
    pub async fn acquire(&self) -> Result<PooledConnection<C>, RepositoryError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| RepositoryError::Unavailable("connection pool is closed".to_string()))?;

        let conn = lock(&self.idle).pop().ok_or_else(|| {
            RepositoryError::Unavailable("connection pool has no idle connection".to_string())
        })?;
        debug!(available = self.permits.available_permits(), "connection acquired");

        Ok(PooledConnection {
            conn: Some(conn),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    /// 1 本借りて `f` に渡す。`f` の結果に関係なく、future の完了時に返却される。
    pub async fn with_connection<T, E, F, Fut>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(PooledConnection<C>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<RepositoryError>,
    {
        let conn = self.acquire().await?;
        f(conn).await
    }
}

/// 貸し出し中のコネクション。drop でプールへ戻る。
pub struct PooledConnection<C> {
    conn: Option<C>,
    idle: Arc<Mutex<Vec<C>>>,
    // フィールドは宣言順に drop される。Drop::drop で conn を戻した後に permit が解放される
    _permit: OwnedSemaphorePermit,
}

impl<C> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is only taken in Drop"),
        }
    }
}

impl<C> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is only taken in Drop"),
        }
    }
}

impl<C> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            lock(&self.idle).push(conn);
        }
    }
}
