//! Shared fixtures for bus integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use messages_event_bus::{
    ApiError, BusConfig, ConvoApi, ConvoId, ConvoView, EventBus, GetLogParams, ListConvosPage,
    ListConvosParams, LogEntry, LogKind, LogPage, Revision,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const AUTH: &str = "did:plc:alice";

/// One scripted answer to `getLog`.
pub enum LogReply {
    Page(Vec<LogEntry>),
    Fail(String),
    /// Answer after the given delay.
    Slow(Duration, Vec<LogEntry>),
}

/// In-memory conversation service driven by queued replies.
///
/// `listConvos` answers with the configured latest conversation unless a
/// failure is queued. `getLog` pops queued replies and answers with an empty
/// page once the queue runs dry.
#[derive(Default)]
pub struct ScriptedApi {
    latest: Mutex<Option<ConvoView>>,
    list_failures: Mutex<VecDeque<String>>,
    log_replies: Mutex<VecDeque<LogReply>>,
    list_calls: AtomicUsize,
    log_calls: AtomicUsize,
    log_cursors: Mutex<Vec<Option<Revision>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Service whose most recent conversation is at `rev`.
    pub fn with_latest(rev: &str) -> Arc<Self> {
        let api = Self::new();
        api.set_latest(rev);
        api
    }

    pub fn set_latest(&self, rev: &str) {
        *self.latest.lock() = Some(ConvoView {
            id: ConvoId::from("latest"),
            rev: Revision::from(rev),
            unread_count: 0,
        });
    }

    pub fn fail_next_list(&self, message: &str) {
        self.list_failures.lock().push_back(message.to_string());
    }

    pub fn push_log(&self, reply: LogReply) {
        self.log_replies.lock().push_back(reply);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.list_calls() + self.log_calls()
    }

    /// Cursors sent with each `getLog`, in call order.
    pub fn log_cursors(&self) -> Vec<Option<Revision>> {
        self.log_cursors.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConvoApi for ScriptedApi {
    async fn list_convos(
        &self,
        params: ListConvosParams,
        authorization: &str,
    ) -> Result<ListConvosPage, ApiError> {
        assert_eq!(authorization, AUTH);
        assert_eq!(params.limit, Some(1));
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.list_failures.lock().pop_front() {
            return Err(ApiError::Transport(message));
        }

        Ok(ListConvosPage {
            cursor: None,
            convos: self.latest.lock().clone().into_iter().collect(),
        })
    }

    async fn get_log(
        &self,
        params: GetLogParams,
        authorization: &str,
    ) -> Result<LogPage, ApiError> {
        assert_eq!(authorization, AUTH);
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.log_cursors.lock().push(params.cursor);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let reply = self.log_replies.lock().pop_front();
        let result = match reply {
            None => Ok(Vec::new()),
            Some(LogReply::Page(logs)) => Ok(logs),
            Some(LogReply::Fail(message)) => Err(ApiError::Transport(message)),
            Some(LogReply::Slow(delay, logs)) => {
                tokio::time::sleep(delay).await;
                Ok(logs)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result.map(|logs| LogPage { cursor: None, logs })
    }
}

pub fn entry(rev: &str, convo: &str) -> LogEntry {
    LogEntry::new(LogKind::CreateMessage, rev, convo)
}

pub fn revs(entries: &[LogEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| e.rev.as_ref().map(|r| r.0.clone()))
        .collect()
}

pub fn config() -> BusConfig {
    BusConfig {
        authorization: AUTH.to_string(),
        ..Default::default()
    }
}

pub fn bus(api: &Arc<ScriptedApi>) -> EventBus {
    init_tracing();
    EventBus::new(api.clone(), config()).unwrap()
}

/// Let spawned setup and poll tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts how often a callback fired.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collects every batch handed to a trail.
#[derive(Clone, Default)]
pub struct Batches(Arc<Mutex<Vec<Vec<LogEntry>>>>);

impl Batches {
    pub fn push(&self, batch: &[LogEntry]) {
        self.0.lock().push(batch.to_vec());
    }

    pub fn all(&self) -> Vec<Vec<LogEntry>> {
        self.0.lock().clone()
    }
}
