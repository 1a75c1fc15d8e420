use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use adaptive_backoff::prelude::{Backoff, ExponentialBackoff};
use anyhow::Result;
use async_lock::Mutex;
use event_listener::Event;
use tracing::{error, trace};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;

use crate::config::RetryConfig;
use crate::core::ObjectKey;

pub type SharedQueue = Arc<WorkQueue>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    active: HashSet<ObjectKey>,
    /// changed while active, requeue when done
    dirty: HashSet<ObjectKey>,
    backoffs: HashMap<ObjectKey, ExponentialBackoff>,
    closed: bool,
}

impl QueueState {
    /// returns true if key was appended
    fn enqueue(&mut self, key: ObjectKey) -> bool {
        if self.closed {
            return false;
        }
        if self.active.contains(&key) {
            trace!(%key, "in flight, marking dirty");
            self.dirty.insert(key);
            return false;
        }
        if self.queued.insert(key.clone()) {
            self.pending.push_back(key);
            true
        } else {
            false
        }
    }
}

/// Keys waiting for reconcile.
/// A key is queued at most once and never handed to two workers at the same time.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    event: Event,
    retry: RetryConfig,
}

impl WorkQueue {
    pub fn shared(retry: RetryConfig) -> Result<SharedQueue> {
        retry.backoff()?;
        Ok(Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            event: Event::new(),
            retry,
        }))
    }

    pub async fn add(&self, key: ObjectKey) {
        let added = self.state.lock().await.enqueue(key);
        if added {
            self.event.notify(1);
        }
    }

    /// add key once `delay` has passed
    pub fn add_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        let queue = self.clone();
        spawn(async move {
            sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// wait for next key, `None` once closed
    pub async fn next(&self) -> Option<ObjectKey> {
        loop {
            let listener = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                if let Some(key) = state.pending.pop_front() {
                    state.queued.remove(&key);
                    state.active.insert(key.clone());
                    return Some(key);
                }
                self.event.listen()
            };
            listener.await;
        }
    }

    /// release key taken by `next`
    pub async fn done(&self, key: &ObjectKey) {
        let mut state = self.state.lock().await;
        state.active.remove(key);
        if state.dirty.remove(key) && state.enqueue(key.clone()) {
            drop(state);
            self.event.notify(1);
        }
    }

    /// delay before retrying failed key; grows with consecutive failures
    pub async fn retry_delay(&self, key: &ObjectKey) -> Duration {
        let mut state = self.state.lock().await;
        match state.backoffs.entry(key.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().wait(),
            Entry::Vacant(entry) => match self.retry.backoff() {
                Ok(mut backoff) => {
                    let delay = backoff.wait();
                    entry.insert(backoff);
                    delay
                }
                Err(err) => {
                    error!(%err, "invalid retry configuration");
                    self.retry.max
                }
            },
        }
    }

    /// reset retry delay of key
    pub async fn forget(&self, key: &ObjectKey) {
        self.state.lock().await.backoffs.remove(key);
    }

    /// stop handing out keys; waiting workers get `None`
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.pending.clear();
        state.queued.clear();
        drop(state);
        self.event.notify(usize::MAX);
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[cfg(test)]
mod test {

    use std::time::Duration;

    use async_channel::bounded;
    use fluvio_future::task::spawn;
    use fluvio_future::timer::sleep;

    use crate::config::RetryConfig;
    use crate::core::ObjectKey;

    use super::WorkQueue;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    #[fluvio_future::test]
    async fn test_dedupe_pending() {
        let queue = WorkQueue::shared(RetryConfig::default()).expect("queue");
        queue.add(key("a")).await;
        queue.add(key("a")).await;
        queue.add(key("b")).await;
        assert_eq!(queue.len().await, 2);

        assert_eq!(queue.next().await, Some(key("a")));
        assert_eq!(queue.next().await, Some(key("b")));
        assert_eq!(queue.len().await, 0);
    }

    #[fluvio_future::test]
    async fn test_active_key_requeued_after_done() {
        let queue = WorkQueue::shared(RetryConfig::default()).expect("queue");
        queue.add(key("a")).await;
        let active = queue.next().await.expect("key");

        // changed while in flight
        queue.add(key("a")).await;
        assert_eq!(queue.len().await, 0);

        queue.done(&active).await;
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.next().await, Some(key("a")));
    }

    #[fluvio_future::test]
    async fn test_add_after() {
        let queue = WorkQueue::shared(RetryConfig::default()).expect("queue");
        queue.add_after(key("a"), Duration::from_millis(10));
        assert_eq!(queue.len().await, 0);

        assert_eq!(queue.next().await, Some(key("a")));
    }

    #[fluvio_future::test]
    async fn test_retry_delay_grows_and_resets() {
        let retry = RetryConfig {
            min: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 2.0,
        };
        let queue = WorkQueue::shared(retry).expect("queue");
        let first = queue.retry_delay(&key("a")).await;
        let second = queue.retry_delay(&key("a")).await;
        assert!(second > first);

        queue.forget(&key("a")).await;
        assert_eq!(queue.retry_delay(&key("a")).await, first);
    }

    #[fluvio_future::test]
    async fn test_close_wakes_workers() {
        let queue = WorkQueue::shared(RetryConfig::default()).expect("queue");
        let waiting = queue.clone();
        let (result_sender, result) = bounded(1);
        spawn(async move {
            let _ = result_sender.send(waiting.next().await).await;
        });

        sleep(Duration::from_millis(10)).await;
        queue.close().await;
        assert_eq!(result.recv().await.expect("worker result"), None);

        queue.add(key("a")).await;
        assert_eq!(queue.len().await, 0);
    }
}
