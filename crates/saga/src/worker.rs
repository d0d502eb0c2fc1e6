//! Stage workers: poll a queue, run batches, settle the results.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use queue::{MessageQueue, QueueName};
use store::RecordStore;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use crate::batch::{BatchMode, BatchProcessor, BatchResponse};
use crate::dispatcher::SagaDispatcher;
use crate::error::Result;
use crate::idempotency::IdempotencyGuard;
use crate::publisher::{MessagePublisher, QueuePublisher};
use crate::purchasing::{PurchasePolicy, QuantitySource, RandomQuantities};
use crate::state::Stage;

/// Polling and concurrency settings for one stage worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Messages requested per receive.
    pub batch_size: usize,
    /// Batches of one stage handled at the same time.
    pub max_concurrency: usize,
    /// Back-off when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            max_concurrency: 2,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Consumes one stage's queue.
pub struct StageWorker<S, P, Q> {
    stage: Stage,
    queue: Q,
    processor: Arc<BatchProcessor<S, P>>,
    config: WorkerConfig,
}

impl<S, P, Q> StageWorker<S, P, Q>
where
    S: RecordStore + Clone + 'static,
    P: MessagePublisher + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    pub fn new(
        stage: Stage,
        queue: Q,
        processor: Arc<BatchProcessor<S, P>>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            stage,
            queue,
            processor,
            config,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Receives and handles one batch. Returns the number of messages received.
    pub async fn poll_once(&self) -> Result<usize> {
        let messages = self
            .queue
            .receive_batch(self.stage.queue(), self.config.batch_size)
            .await?;
        if messages.is_empty() {
            return Ok(0);
        }

        let received = messages.len();
        let response = self.processor.process(self.stage, messages).await;
        self.settle(response).await;
        Ok(received)
    }

    /// Acknowledges successes, releases retryable failures and
    /// dead-letters rejections.
    async fn settle(&self, response: BatchResponse) {
        let queue: QueueName = self.stage.queue();

        for receipt in response.succeeded {
            if let Err(e) = self.queue.ack(queue, receipt).await {
                tracing::warn!(queue = %queue, error = %e, "Failed to acknowledge message");
            }
        }
        for failure in response.batch_item_failures {
            if let Err(e) = self.queue.fail(queue, failure.receipt).await {
                tracing::warn!(
                    queue = %queue,
                    message_id = %failure.item_identifier,
                    error = %e,
                    "Failed to release message"
                );
            }
        }
        for rejected in response.rejected {
            if let Err(e) = self
                .queue
                .dead_letter(queue, rejected.receipt, &rejected.reason)
                .await
            {
                tracing::warn!(
                    queue = %queue,
                    message_id = %rejected.item_identifier,
                    error = %e,
                    "Failed to dead-letter message"
                );
            }
        }
    }

    /// Polls until `shutdown` fires, running up to `max_concurrency`
    /// batches at once. In-flight batches finish before this returns.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut batches = JoinSet::new();
        tracing::info!(stage = %self.stage, queue = %self.stage.queue(), "Stage worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let permit = tokio::select! {
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            match self
                .queue
                .receive_batch(self.stage.queue(), self.config.batch_size)
                .await
            {
                Ok(messages) if messages.is_empty() => {
                    drop(permit);
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => break,
                    }
                }
                Ok(messages) => {
                    let worker = Arc::clone(&self);
                    batches.spawn(async move {
                        let response = worker.processor.process(worker.stage, messages).await;
                        worker.settle(response).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!(stage = %self.stage, error = %e, "Receive failed");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }

            while let Some(finished) = batches.try_join_next() {
                if let Err(e) = finished {
                    tracing::error!(stage = %self.stage, error = %e, "Batch task failed");
                }
            }
        }

        while let Some(finished) = batches.join_next().await {
            if let Err(e) = finished {
                tracing::error!(stage = %self.stage, error = %e, "Batch task failed");
            }
        }
        tracing::info!(stage = %self.stage, "Stage worker stopped");
    }
}

/// Settings for a [`SagaRuntime`].
#[derive(Clone)]
pub struct RuntimeOptions {
    pub worker: WorkerConfig,
    pub mode: BatchMode,
    pub purchasing: PurchasePolicy,
    pub quantities: Arc<dyn QuantitySource>,
    /// How long idempotency keys are kept before pruning.
    pub key_retention: Duration,
    /// Time between prune passes.
    pub prune_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::default(),
            mode: BatchMode::default(),
            purchasing: PurchasePolicy::default(),
            quantities: Arc::new(RandomQuantities),
            key_retention: Duration::from_secs(7 * 24 * 60 * 60),
            prune_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// One worker per stage, all sharing a store and a queue.
pub struct SagaRuntime<S, Q> {
    workers: Vec<Arc<StageWorker<S, QueuePublisher<Q>, Q>>>,
    guard: IdempotencyGuard<S>,
    key_retention: Duration,
    prune_interval: Duration,
}

impl<S, Q> SagaRuntime<S, Q>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    pub fn new(store: S, queue: Q, options: RuntimeOptions) -> Self {
        let publisher = QueuePublisher::new(queue.clone());
        let dispatcher = Arc::new(SagaDispatcher::new(
            store.clone(),
            publisher,
            options.purchasing,
            options.quantities,
        ));
        let guard = IdempotencyGuard::new(store.clone());
        let processor = Arc::new(BatchProcessor::new(store, dispatcher, options.mode));

        let workers = Stage::ALL
            .into_iter()
            .map(|stage| {
                Arc::new(StageWorker::new(
                    stage,
                    queue.clone(),
                    Arc::clone(&processor),
                    options.worker,
                ))
            })
            .collect();

        Self {
            workers,
            guard,
            key_retention: options.key_retention,
            prune_interval: options.prune_interval,
        }
    }

    /// Starts every stage worker and the key pruner. Each stops when
    /// `shutdown` fires.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        for worker in &self.workers {
            tasks.spawn(Arc::clone(worker).run(shutdown.clone()));
        }
        tasks.spawn(prune_loop(
            self.guard.clone(),
            self.key_retention,
            self.prune_interval,
            shutdown,
        ));
        tasks
    }

    /// Deletes idempotency keys older than the retention window.
    pub async fn prune_keys(&self) -> Result<usize> {
        prune_once(&self.guard, self.key_retention).await
    }

    /// Polls every stage until no queue yields a message. Returns the number
    /// of messages handled.
    pub async fn drain(&self) -> Result<usize> {
        let mut total = 0;
        loop {
            let mut round = 0;
            for worker in &self.workers {
                loop {
                    let received = worker.poll_once().await?;
                    if received == 0 {
                        break;
                    }
                    round += received;
                }
            }
            if round == 0 {
                return Ok(total);
            }
            total += round;
        }
    }
}

async fn prune_once<S: RecordStore>(
    guard: &IdempotencyGuard<S>,
    retention: Duration,
) -> Result<usize> {
    let cutoff = chrono::Duration::from_std(retention)
        .ok()
        .and_then(|window| Utc::now().checked_sub_signed(window));
    match cutoff {
        Some(cutoff) => guard.prune(cutoff).await,
        None => Ok(0),
    }
}

async fn prune_loop<S: RecordStore>(
    guard: IdempotencyGuard<S>,
    retention: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = prune_once(&guard, retention).await {
                    tracing::warn!(error = %e, "Idempotency key prune failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    tracing::info!("Key pruner stopped");
}
