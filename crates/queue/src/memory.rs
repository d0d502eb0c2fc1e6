use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{
    DeadLetter, MessageId, MessageQueue, QueueError, QueueMessage, QueueName, Receipt,
    ReceivedMessage, Result,
};

/// Redrive settings shared by every queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// How long a received message stays hidden before it is delivered again.
    pub visibility_timeout: Duration,
    /// Deliveries allowed before a message moves to the dead-letter sink.
    pub max_receive_count: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
            max_receive_count: 3,
        }
    }
}

#[derive(Debug)]
struct InFlight {
    receipt: Receipt,
    visible_at: Instant,
}

#[derive(Debug)]
struct Entry {
    message: QueueMessage,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn is_hidden(&self, now: Instant) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|flight| flight.visible_at > now)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<Entry>,
    dead_letters: Vec<DeadLetter>,
}

impl QueueState {
    fn take(&mut self, receipt: Receipt) -> Option<QueueMessage> {
        let position = self.entries.iter().position(|entry| {
            entry
                .in_flight
                .as_ref()
                .is_some_and(|flight| flight.receipt == receipt)
        })?;
        self.entries.remove(position).map(|entry| entry.message)
    }

    fn bury(&mut self, queue: QueueName, message: QueueMessage, reason: &str) {
        tracing::warn!(
            queue = %queue,
            message_id = %message.id,
            receive_count = message.receive_count,
            reason,
            "Message moved to dead-letter sink"
        );
        metrics::counter!("queue_messages_dead_lettered_total", "queue" => queue.as_str())
            .increment(1);
        self.dead_letters.push(DeadLetter {
            message,
            reason: reason.to_string(),
            dead_lettered_at: Utc::now(),
        });
    }
}

/// In-memory FIFO queue implementation for testing and single-process runs.
///
/// Mirrors the delivery rules of a managed FIFO queue: per-group ordering,
/// one consumer per group at a time, visibility timeouts and a receive
/// limit that redrives poison messages into a dead-letter sink.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    config: QueueConfig,
    queues: Arc<Mutex<HashMap<QueueName, QueueState>>>,
}

impl InMemoryQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            queues: Arc::default(),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Returns the number of messages in a queue, in flight or not.
    pub async fn depth(&self, queue: QueueName) -> usize {
        self.queues
            .lock()
            .await
            .get(&queue)
            .map_or(0, |state| state.entries.len())
    }

    /// Returns the messages currently held by consumers.
    pub async fn in_flight(&self, queue: QueueName) -> usize {
        let now = Instant::now();
        self.queues.lock().await.get(&queue).map_or(0, |state| {
            state.entries.iter().filter(|e| e.is_hidden(now)).count()
        })
    }

    /// Returns the contents of a queue's dead-letter sink.
    pub async fn dead_letters(&self, queue: QueueName) -> Vec<DeadLetter> {
        self.queues
            .lock()
            .await
            .get(&queue)
            .map(|state| state.dead_letters.clone())
            .unwrap_or_default()
    }

    /// Returns true when no queue holds a message.
    pub async fn is_idle(&self) -> bool {
        self.queues
            .lock()
            .await
            .values()
            .all(|state| state.entries.is_empty())
    }

    /// Clears all queues and dead-letter sinks.
    pub async fn clear(&self) {
        self.queues.lock().await.clear();
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, queue: QueueName, group_id: &str, body: String) -> Result<MessageId> {
        let message = QueueMessage {
            id: MessageId::new(),
            group_id: group_id.to_string(),
            body,
            receive_count: 0,
            sent_at: Utc::now(),
        };
        let id = message.id;

        self.queues
            .lock()
            .await
            .entry(queue)
            .or_default()
            .entries
            .push_back(Entry {
                message,
                in_flight: None,
            });

        tracing::debug!(queue = %queue, message_id = %id, group_id, "Message sent");
        metrics::counter!("queue_messages_sent_total", "queue" => queue.as_str()).increment(1);

        Ok(id)
    }

    async fn receive_batch(
        &self,
        queue: QueueName,
        max_messages: usize,
    ) -> Result<Vec<ReceivedMessage>> {
        let now = Instant::now();
        let mut queues = self.queues.lock().await;
        let Some(state) = queues.get_mut(&queue) else {
            return Ok(Vec::new());
        };

        let mut batch = Vec::new();
        let mut blocked: HashSet<String> = HashSet::new();
        let mut exhausted = Vec::new();

        for (index, entry) in state.entries.iter_mut().enumerate() {
            if batch.len() >= max_messages {
                break;
            }
            if blocked.contains(&entry.message.group_id) {
                continue;
            }
            if entry.is_hidden(now) {
                blocked.insert(entry.message.group_id.clone());
                continue;
            }
            if entry.message.receive_count >= self.config.max_receive_count {
                exhausted.push(index);
                continue;
            }

            let receipt = Receipt::new();
            entry.message.receive_count += 1;
            entry.in_flight = Some(InFlight {
                receipt,
                visible_at: now + self.config.visibility_timeout,
            });
            batch.push(ReceivedMessage {
                message_id: entry.message.id,
                receipt,
                group_id: entry.message.group_id.clone(),
                body: entry.message.body.clone(),
                receive_count: entry.message.receive_count,
            });
        }

        for index in exhausted.into_iter().rev() {
            if let Some(entry) = state.entries.remove(index) {
                state.bury(queue, entry.message, "maximum receive count exceeded");
            }
        }

        Ok(batch)
    }

    async fn ack(&self, queue: QueueName, receipt: Receipt) -> Result<()> {
        let mut queues = self.queues.lock().await;
        queues
            .get_mut(&queue)
            .and_then(|state| state.take(receipt))
            .map(|_| ())
            .ok_or(QueueError::UnknownReceipt { queue, receipt })
    }

    async fn fail(&self, queue: QueueName, receipt: Receipt) -> Result<()> {
        let queues = self.queues.lock().await;
        let known = queues.get(&queue).is_some_and(|state| {
            state.entries.iter().any(|entry| {
                entry
                    .in_flight
                    .as_ref()
                    .is_some_and(|flight| flight.receipt == receipt)
            })
        });

        if !known {
            return Err(QueueError::UnknownReceipt { queue, receipt });
        }
        // The message stays hidden until its visibility timeout lapses.
        Ok(())
    }

    async fn dead_letter(&self, queue: QueueName, receipt: Receipt, reason: &str) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(&queue)
            .ok_or(QueueError::UnknownReceipt { queue, receipt })?;
        let message = state
            .take(receipt)
            .ok_or(QueueError::UnknownReceipt { queue, receipt })?;
        state.bury(queue, message, reason);
        Ok(())
    }
}
