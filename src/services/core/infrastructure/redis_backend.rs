// Redis-backed KV store with per-operation timeouts

use super::kv_backend::{BatchEntry, KvBackend};
use crate::utils::error::{KvOperationError, KvResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Remote KV backend over a multiplexed, auto-reconnecting Redis connection.
///
/// The connection manager is created on first use. Until it exists, a failed attempt
/// blocks further attempts for `reconnect_backoff` and calls in that window fail fast
/// with [`KvOperationError::Unavailable`], so a store that was down at startup is picked
/// up once it comes back.
///
/// Every command is bounded by `operation_timeout`; an elapsed timeout is reported as
/// [`KvOperationError::Timeout`] and treated like any other transport failure upstream.
pub struct RedisBackend {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    last_failure: Mutex<Option<Instant>>,
    connect_timeout: Duration,
    operation_timeout: Duration,
    reconnect_backoff: Duration,
}

impl RedisBackend {
    /// Parse `url` without touching the network.
    pub fn new(url: &str, connect_timeout: Duration, operation_timeout: Duration) -> KvResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| KvOperationError::Connection(format!("invalid redis url: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            last_failure: Mutex::new(None),
            connect_timeout,
            operation_timeout,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
        })
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Open a client for `url` and establish the connection manager within `connect_timeout`.
    pub async fn connect(
        url: &str,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> KvResult<Self> {
        let backend = Self::new(url, connect_timeout, operation_timeout)?;
        backend.ensure_connected().await?;
        Ok(backend)
    }

    /// Try to establish the connection now instead of on the first command.
    pub async fn ensure_connected(&self) -> KvResult<()> {
        self.connection().await.map(|_| ())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    fn in_backoff(&self) -> bool {
        self.last_failure
            .lock()
            .map(|failure| matches!(*failure, Some(at) if at.elapsed() < self.reconnect_backoff))
            .unwrap_or(false)
    }

    fn record_attempt(&self, failed: bool) {
        if let Ok(mut failure) = self.last_failure.lock() {
            *failure = if failed { Some(Instant::now()) } else { None };
        }
    }

    async fn connection(&self) -> KvResult<ConnectionManager> {
        if let Some(conn) = self.connection.get() {
            return Ok(conn.clone());
        }
        if self.in_backoff() {
            return Err(KvOperationError::Unavailable);
        }

        let result = self
            .connection
            .get_or_try_init(|| async {
                match tokio::time::timeout(self.connect_timeout, self.client.get_connection_manager())
                    .await
                {
                    Ok(connected) => connected.map_err(KvOperationError::from),
                    Err(_) => Err(KvOperationError::Timeout(
                        self.connect_timeout.as_millis() as u64,
                    )),
                }
            })
            .await;

        self.record_attempt(result.is_err());
        result.map(ConnectionManager::clone)
    }

    async fn bounded<T, F>(&self, operation: F) -> KvResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result.map_err(KvOperationError::from),
            Err(_) => Err(KvOperationError::Timeout(
                self.operation_timeout.as_millis() as u64,
            )),
        }
    }

    /// Values that are not UTF-8 read as misses for their own key only.
    fn decode_values(raw: Vec<Option<Vec<u8>>>) -> Vec<Option<String>> {
        raw.into_iter()
            .map(|value| value.and_then(|bytes| String::from_utf8(bytes).ok()))
            .collect()
    }

    fn parse_info(raw: &str) -> HashMap<String, String> {
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        let value: Option<String> = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if ttl_seconds > 0 {
            cmd.arg("EX").arg(ttl_seconds);
        }
        let _: () = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if ttl_seconds > 0 {
            cmd.arg("EX").arg(ttl_seconds);
        }
        // "OK" when created, nil when the key already exists
        let reply: Option<String> = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let _: i64 = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn increment(&self, key: &str, ttl_seconds: u64) -> KvResult<i64> {
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("INCR").arg(key);
        if ttl_seconds > 0 {
            pipe.cmd("EXPIRE").arg(key).arg(ttl_seconds).ignore();
        }
        let (count,): (i64,) = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(count)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: i64 = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(count > 0)
    }

    async fn get_many(&self, keys: &[String]) -> KvResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("GET").arg(key);
        }
        let raw: Vec<Option<Vec<u8>>> = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(Self::decode_values(raw))
    }

    async fn set_many(&self, entries: &[BatchEntry]) -> KvResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for entry in entries {
            pipe.cmd("SET").arg(&entry.key).arg(&entry.value);
            if entry.ttl_seconds > 0 {
                pipe.arg("EX").arg(entry.ttl_seconds);
            }
            pipe.ignore();
        }
        let _: () = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> KvResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("DEL").arg(key);
        }
        let removed: Vec<i64> = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(removed.into_iter().filter(|n| *n > 0).map(|n| n as u64).sum())
    }

    async fn exists_many(&self, keys: &[String]) -> KvResult<Vec<bool>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("EXISTS").arg(key);
        }
        let counts: Vec<i64> = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(counts.into_iter().map(|n| n > 0).collect())
    }

    async fn ttl_many(&self, keys: &[String]) -> KvResult<Vec<Option<u64>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("TTL").arg(key);
        }
        // -1: no expiry, -2: missing key
        let ttls: Vec<i64> = self.bounded(pipe.query_async(&mut conn)).await?;
        Ok(ttls
            .into_iter()
            .map(|ttl| if ttl >= 0 { Some(ttl as u64) } else { None })
            .collect())
    }

    async fn info(&self) -> KvResult<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        let cmd = redis::cmd("INFO");
        let raw: String = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(Self::parse_info(&raw))
    }
}
