use std::future::Future;

use async_trait::async_trait;
use redis::Client as RedisClient;
use tracing::warn;

use crate::errors::AppError;

/// Remembers webhook deliveries so a captured notification cannot be
/// replayed inside the signature tolerance window.
#[async_trait]
pub trait ReplayGuard: Send + Sync {
    /// Claims `key` for `ttl_secs`. Returns `false` when it is already claimed.
    async fn claim(&self, key: &str, ttl_secs: u64) -> Result<bool, AppError>;

    /// Drops a claim so the next delivery with the same key is processed.
    async fn release(&self, key: &str) -> Result<(), AppError>;
}

/// Runs `work` at most once per `key`. A failed run releases the claim so
/// the gateway's retry of the same delivery is applied instead of being
/// taken for a replay. Returns `None` for a replay.
pub async fn process_once<T, Fut>(
    guard: &dyn ReplayGuard,
    key: &str,
    ttl_secs: u64,
    work: Fut,
) -> Result<Option<T>, AppError>
where
    Fut: Future<Output = Result<T, AppError>>,
{
    if !guard.claim(key, ttl_secs).await? {
        return Ok(None);
    }
    match work.await {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            if let Err(release_err) = guard.release(key).await {
                warn!(%key, "Could not release replay claim: {release_err}");
            }
            Err(e)
        }
    }
}

#[derive(Clone)]
pub struct RedisReplayGuard {
    client: RedisClient,
}

impl RedisReplayGuard {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis connection failed: {e}")))
    }
}

#[async_trait]
impl ReplayGuard for RedisReplayGuard {
    async fn claim(&self, key: &str, ttl_secs: u64) -> Result<bool, AppError> {
        let mut conn = self.connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis SET NX failed: {e}")))?;

        Ok(set.is_some())
    }

    async fn release(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis DEL failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// In-process guard with the same claim semantics as Redis `SET NX`.
    #[derive(Default)]
    pub(crate) struct MemoryReplayGuard {
        keys: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl ReplayGuard for MemoryReplayGuard {
        async fn claim(&self, key: &str, _ttl_secs: u64) -> Result<bool, AppError> {
            Ok(self.keys.lock().unwrap().insert(key.to_string()))
        }

        async fn release(&self, key: &str) -> Result<(), AppError> {
            self.keys.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_delivery_is_a_replay() {
        let guard = MemoryReplayGuard::default();
        let first = process_once(&guard, "webhook:CVCC-1:1:ab", 600, async { Ok(1) })
            .await
            .unwrap();
        assert_eq!(first, Some(1));

        let second = process_once(&guard, "webhook:CVCC-1:1:ab", 600, async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_not_replayed() {
        let guard = MemoryReplayGuard::default();
        let key = "webhook:CVCC-2:1:cd";

        let failed: Result<Option<()>, AppError> = process_once(&guard, key, 600, async {
            Err(AppError::NotFound("Order CVCC-2 not found".to_string()))
        })
        .await;
        assert!(matches!(failed, Err(AppError::NotFound(_))));

        let retried = process_once(&guard, key, 600, async { Ok("applied") })
            .await
            .unwrap();
        assert_eq!(retried, Some("applied"));
        assert!(guard.keys.lock().unwrap().contains(key));
    }

    #[tokio::test]
    async fn test_replay_skips_work() {
        let guard = MemoryReplayGuard::default();
        guard.claim("k", 60).await.unwrap();
        let mut ran = false;
        let result = process_once(&guard, "k", 60, async {
            ran = true;
            Ok(())
        })
        .await
        .unwrap();
        assert!(result.is_none());
        assert!(!ran);
    }
}
