//! Background consumer: drains the broker queue into the store.
//!
//! One long-lived task started at service lifespan begin. Each iteration
//! pops with a short bounded timeout so shutdown and error recovery are
//! observed promptly; each successfully popped envelope is metered, parsed
//! tolerantly, and inserted under the dedup constraint in its own
//! transaction. Errors never propagate to clients: the loop logs, backs off
//! a second, and continues.
//!
//! The queue has no ack step. An envelope popped by a consumer that dies
//! before the store commit is lost, which surfaces as a slightly inflated
//! duplicate estimate in the stats view.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use eventsink_broker::Broker;
use eventsink_core::Event;
use eventsink_store::{EventStore, InsertOutcome};

/// Dequeue timeout; bounds how long shutdown waits for the loop to notice.
const POP_TIMEOUT: Duration = Duration::from_secs(1);

/// Backoff after an unexpected broker/store failure.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Handle to request graceful shutdown of the consumer task.
pub struct ConsumerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signal shutdown and wait for the task to stop at its next
    /// dequeue-return boundary.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

/// Spawn the consumer loop onto the current runtime.
pub fn spawn(broker: Arc<dyn Broker>, store: Arc<dyn EventStore>) -> ConsumerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let join = tokio::spawn(consume_loop(broker, store, shutdown_rx));
    ConsumerHandle {
        shutdown: shutdown_tx,
        join,
    }
}

async fn consume_loop(
    broker: Arc<dyn Broker>,
    store: Arc<dyn EventStore>,
    shutdown_rx: watch::Receiver<bool>,
) {
    info!("consumer started, waiting for events");

    while !*shutdown_rx.borrow() {
        if let Err(err) = consume_one(broker.as_ref(), store.as_ref()).await {
            error!(error = %err, "consumer iteration failed");
            tokio::time::sleep(ERROR_BACKOFF).await;
        }
    }

    info!("consumer stopped");
}

/// One dequeue-to-commit iteration.
async fn consume_one(broker: &dyn Broker, store: &dyn EventStore) -> anyhow::Result<()> {
    let Some(envelope) = broker.blocking_pop(POP_TIMEOUT).await? else {
        // Timeout; loop around so shutdown is re-checked.
        return Ok(());
    };

    // Metered before the insert, so duplicates still count toward the
    // received total; that delta is what the stats view reports as dropped.
    broker.increment_received().await?;

    // Ingress validates before enqueueing, so an unparseable envelope means
    // a foreign producer wrote to the queue. Drop it and keep going.
    let event = match Event::from_json(&envelope) {
        Ok(event) => event,
        Err(err) => {
            debug!(error = %err, "dropping malformed envelope");
            return Ok(());
        }
    };

    match store.insert_dedup(&event).await? {
        InsertOutcome::Inserted => {
            debug!(topic = %event.topic, event_id = %event.event_id, "processed")
        }
        InsertOutcome::Duplicate => {
            debug!(topic = %event.topic, event_id = %event.event_id, "duplicate dropped")
        }
    }
    Ok(())
}
