use super::{Connection, ConnectionSource};
use crate::core::{BindError, Result, ResultSet, Value};
use crate::transaction::IsolationLevel;
use log::warn;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Bounded connection pool over any inner source.
///
/// Handed-out connections are proxies: their `close()` returns the raw
/// connection to the idle queue instead of closing it, so a transaction's
/// normal release path recycles the connection transparently.
pub struct PooledSource {
    inner: Arc<PoolInner>,
    max_size: usize,
    acquire_timeout: Duration,
}

struct PoolInner {
    source: Box<dyn ConnectionSource>,
    idle: Mutex<VecDeque<Box<dyn Connection>>>,
    total: AtomicUsize,
}

impl PooledSource {
    pub fn new<S: ConnectionSource + 'static>(source: S) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                source: Box::new(source),
                idle: Mutex::new(VecDeque::new()),
                total: AtomicUsize::new(0),
            }),
            max_size: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of live connections.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set how long acquisition may wait for a free slot.
    pub fn acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn stats(&self) -> Result<PoolStats> {
        let idle = self.inner.idle.lock()?.len();
        let total = self.inner.total.load(Ordering::SeqCst);
        Ok(PoolStats {
            total_connections: total,
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
            max_size: self.max_size,
        })
    }
}

impl ConnectionSource for PooledSource {
    fn connection(&self) -> Result<Box<dyn Connection>> {
        let start = Instant::now();

        loop {
            if let Some(raw) = self.inner.idle.lock()?.pop_front() {
                return Ok(Box::new(PooledConnection {
                    raw: Some(raw),
                    pool: Arc::clone(&self.inner),
                }));
            }

            if self.inner.total.load(Ordering::SeqCst) < self.max_size {
                let raw = self.inner.source.connection()?;
                self.inner.total.fetch_add(1, Ordering::SeqCst);
                return Ok(Box::new(PooledConnection {
                    raw: Some(raw),
                    pool: Arc::clone(&self.inner),
                }));
            }

            if start.elapsed() > self.acquire_timeout {
                return Err(BindError::Connection(
                    "pool timeout: no connections available".into(),
                ));
            }

            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Pool statistics snapshot.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_connections: usize,
    pub idle_connections: usize,
    pub active_connections: usize,
    pub max_size: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pool: {}/{} active, {} idle, max {}",
            self.active_connections, self.total_connections, self.idle_connections, self.max_size
        )
    }
}

/// Proxy whose `close()` returns the raw connection to the pool.
struct PooledConnection {
    raw: Option<Box<dyn Connection>>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    fn raw(&mut self) -> Result<&mut Box<dyn Connection>> {
        self.raw
            .as_mut()
            .ok_or_else(|| BindError::Connection("connection already returned to pool".into()))
    }

    fn release(&mut self) {
        if let Some(raw) = self.raw.take() {
            match self.pool.idle.lock() {
                Ok(mut idle) => idle.push_back(raw),
                Err(_) => {
                    // Poisoned pool: drop the connection and shrink the total
                    // so the slot is not lost forever.
                    self.pool.total.fetch_sub(1, Ordering::SeqCst);
                    warn!("pool lock poisoned; dropping returned connection");
                }
            }
        }
    }
}

impl Connection for PooledConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        self.raw()?.query(sql, params)
    }

    fn update(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.raw()?.update(sql, params)
    }

    fn commit(&mut self) -> Result<()> {
        self.raw()?.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.raw()?.rollback()
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()> {
        self.raw()?.set_auto_commit(auto_commit)
    }

    fn set_isolation(&mut self, level: IsolationLevel) -> Result<()> {
        self.raw()?.set_isolation(level)
    }

    fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if self.raw.is_some() {
            warn!("pooled connection dropped without close(); returning to pool");
            self.release();
        }
    }
}
