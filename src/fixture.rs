//! Canned-result connection backend for tests and demos.
//!
//! A [`FixtureSource`] plays the role of a real driver: statements are
//! answered from pre-registered result sets, and every driver-level call
//! (acquisition, commit, rollback, close, mode changes) is counted so
//! tests can assert on resource discipline.

use crate::core::{BindError, Result, ResultSet, Value};
use crate::datasource::{Connection, ConnectionSource};
use crate::transaction::IsolationLevel;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Counters {
    acquisitions: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    closes: AtomicUsize,
    auto_commit_sets: AtomicUsize,
    isolation_sets: AtomicUsize,
    queries: AtomicUsize,
    updates: AtomicUsize,
}

/// Connection source serving canned results, with call counting.
#[derive(Default)]
pub struct FixtureSource {
    results: HashMap<String, ResultSet>,
    affected: HashMap<String, u64>,
    failing: HashSet<String>,
    refuse_connections: bool,
    counters: Arc<Counters>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the given result set for a statement's SQL text.
    pub fn with_result(mut self, sql: impl Into<String>, result: ResultSet) -> Self {
        self.results.insert(sql.into(), result);
        self
    }

    /// Serve the given affected-row count for a modifying statement.
    pub fn with_affected(mut self, sql: impl Into<String>, affected: u64) -> Self {
        self.affected.insert(sql.into(), affected);
        self
    }

    /// Make execution of the given SQL text fail.
    pub fn failing_on(mut self, sql: impl Into<String>) -> Self {
        self.failing.insert(sql.into());
        self
    }

    /// Refuse every connection request.
    pub fn refuse_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    pub fn acquisitions(&self) -> usize {
        self.counters.acquisitions.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.counters.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.counters.rollbacks.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    pub fn auto_commit_sets(&self) -> usize {
        self.counters.auto_commit_sets.load(Ordering::SeqCst)
    }

    pub fn isolation_sets(&self) -> usize {
        self.counters.isolation_sets.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.counters.queries.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.counters.updates.load(Ordering::SeqCst)
    }
}

impl ConnectionSource for FixtureSource {
    fn connection(&self) -> Result<Box<dyn Connection>> {
        if self.refuse_connections {
            return Err(BindError::Connection(
                "fixture refuses connections".into(),
            ));
        }
        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureConnection {
            results: self.results.clone(),
            affected: self.affected.clone(),
            failing: self.failing.clone(),
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

/// A connection handed out by [`FixtureSource`].
pub struct FixtureConnection {
    results: HashMap<String, ResultSet>,
    affected: HashMap<String, u64>,
    failing: HashSet<String>,
    counters: Arc<Counters>,
    closed: bool,
}

impl FixtureConnection {
    fn ensure_live(&self) -> Result<()> {
        if self.closed {
            return Err(BindError::Connection("connection is closed".into()));
        }
        Ok(())
    }
}

impl Connection for FixtureConnection {
    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<ResultSet> {
        self.ensure_live()?;
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(sql) {
            return Err(BindError::Execution(format!(
                "fixture failure for statement: {sql}"
            )));
        }
        self.results
            .get(sql)
            .cloned()
            .ok_or_else(|| BindError::Execution(format!("no fixture result for: {sql}")))
    }

    fn update(&mut self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.ensure_live()?;
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(sql) {
            return Err(BindError::Execution(format!(
                "fixture failure for statement: {sql}"
            )));
        }
        self.affected
            .get(sql)
            .copied()
            .ok_or_else(|| BindError::Execution(format!("no fixture result for: {sql}")))
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_auto_commit(&mut self, _auto_commit: bool) -> Result<()> {
        self.ensure_live()?;
        self.counters.auto_commit_sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_isolation(&mut self, _level: IsolationLevel) -> Result<()> {
        self.ensure_live()?;
        self.counters.isolation_sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
