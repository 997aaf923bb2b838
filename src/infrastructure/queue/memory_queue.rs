//! Process-local job queue.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::JobQueue;
use crate::shared::error::AppError;

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<String>>,
    marks: HashMap<String, Instant>,
}

/// In-memory [`JobQueue`]; jobs are lost on restart.
#[derive(Default)]
pub struct InMemoryJobQueue {
    state: Mutex<State>,
    notify: Notify,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_pop(&self, queue: &str) -> Option<String> {
        self.state
            .lock()
            .queues
            .get_mut(queue)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn push(&self, queue: &str, payload: String) -> Result<(), AppError> {
        self.state
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>, AppError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop(queue) {
                return Ok(Some(item));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop(queue));
            }
        }
    }

    async fn mark_once(&self, key: &str, ttl: Duration) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.marks.retain(|_, expires| *expires > now);
        if state.marks.contains_key(key) {
            return Ok(false);
        }
        state.marks.insert(key.to_string(), now + ttl);
        Ok(true)
    }

    async fn len(&self, queue: &str) -> Result<u64, AppError> {
        Ok(self
            .state
            .lock()
            .queues
            .get(queue)
            .map_or(0, |q| q.len() as u64))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
