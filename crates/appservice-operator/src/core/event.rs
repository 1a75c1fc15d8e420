use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use event_listener::Event;
use tracing::trace;

const DEFAULT_EVENT_ORDERING: Ordering = Ordering::SeqCst;

pub type SharedShutdown = Arc<ShutdownEvent>;

/// One shot signal; once notified, every current and future listener completes
#[derive(Debug)]
pub struct ShutdownEvent {
    flag: AtomicBool,
    event: Event,
}

impl ShutdownEvent {
    pub fn shared() -> SharedShutdown {
        Arc::new(Self {
            flag: AtomicBool::new(false),
            event: Event::new(),
        })
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(DEFAULT_EVENT_ORDERING)
    }

    pub async fn listen(&self) {
        if self.is_set() {
            trace!("before, shutdown is set");
            return;
        }

        let listener = self.event.listen();

        if self.is_set() {
            trace!("after, shutdown is set");
            return;
        }

        listener.await
    }

    pub fn notify(&self) {
        self.flag.store(true, DEFAULT_EVENT_ORDERING);
        self.event.notify(usize::MAX);
    }
}
