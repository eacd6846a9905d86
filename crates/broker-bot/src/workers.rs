//! Per-participant event queues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use broker::{ConversationEngine, InboundEvent, MessageSender};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// How long a worker waits for the next event before it retires.
pub const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Finished workers are dropped from the map every this many dispatches.
const PRUNE_EVERY: u64 = 256;

struct Worker {
    queue: mpsc::UnboundedSender<InboundEvent>,
    handle: JoinHandle<()>,
}

/// Routes events to one worker task per participant.
///
/// Events of one participant are processed in arrival order, one at a time.
/// Idle workers exit; a replacement waits for its predecessor to finish.
pub struct Workers<S: MessageSender + 'static> {
    engine: Arc<ConversationEngine<S>>,
    idle_timeout: Duration,
    workers: HashMap<i64, Worker>,
    dispatched: u64,
}

impl<S: MessageSender + 'static> Workers<S> {
    pub fn new(engine: Arc<ConversationEngine<S>>, idle_timeout: Duration) -> Self {
        Self {
            engine,
            idle_timeout,
            workers: HashMap::new(),
            dispatched: 0,
        }
    }

    pub fn dispatch(&mut self, event: InboundEvent) {
        let channel_id = event.channel_id();

        self.dispatched += 1;
        if self.dispatched % PRUNE_EVERY == 0 {
            self.prune();
        }

        let (event, previous) = match self.workers.remove(&channel_id) {
            Some(worker) => match worker.queue.send(event) {
                Ok(()) => {
                    self.workers.insert(channel_id, worker);
                    return;
                }
                Err(mpsc::error::SendError(event)) => (event, Some(worker.handle)),
            },
            None => (event, None),
        };

        let worker = self.spawn_worker(channel_id, previous);
        // The new worker cannot have closed its queue before its first event.
        let _ = worker.queue.send(event);
        self.workers.insert(channel_id, worker);
    }

    /// Forget workers that have exited.
    pub fn prune(&mut self) {
        self.workers.retain(|_, worker| !worker.handle.is_finished());
    }

    /// Number of tracked workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn spawn_worker(&self, channel_id: i64, previous: Option<JoinHandle<()>>) -> Worker {
        let (queue, mut rx) = mpsc::unbounded_channel::<InboundEvent>();
        let engine = self.engine.clone();
        let idle_timeout = self.idle_timeout;

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            debug!(channel_id, "Worker started");

            loop {
                match tokio::time::timeout(idle_timeout, rx.recv()).await {
                    Ok(Some(event)) => engine.process(event).await,
                    Ok(None) => break,
                    Err(_) => {
                        // Refuse new events, then finish what is already queued.
                        rx.close();
                        while let Some(event) = rx.recv().await {
                            engine.process(event).await;
                        }
                        break;
                    }
                }
            }

            debug!(channel_id, "Worker stopped");
        });

        Worker { queue, handle }
    }
}
