//! Throttler implementation

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::consumer::Consumer;
use crate::error::ThrottleError;
use crate::operation::{Operation, Outcome};

use super::config::ThrottlerConfig;
use super::gate::ConcurrencyGate;
use super::report::{AdmissionSummary, DeliverySummary, EngineState, RunReport};
use super::store::{
    CompletedReceiver, CompletedSender, CompletionSignal, CompletionWatch, Failure, FailureSink, PendingStore,
    completed_stream,
};

/// Runs a fixed set of operations in paced, gated batches and streams the
/// results to a consumer.
///
/// Every window the admission loop takes at most `per_time_window` operations
/// off the pending store and starts them through a gate that lets at most
/// `concurrency` execute at once. A throttled operation hands back a
/// replacement, which is re-queued, and the whole admission loop then backs off
/// for one window. The delivery loop feeds results to the consumer as they
/// complete, in completion order.
pub struct Throttler<T, E> {
    config: ThrottlerConfig,
    pending: PendingStore<T, E>,
    consumer: Box<dyn Consumer<T>>,
    runtime: Handle,
    dispatch: Dispatch,
    state: watch::Sender<EngineState>,
    capacity: usize,
}

impl<T, E> Throttler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a throttler over `operations`
    ///
    /// Fails if the configuration would not actually throttle anything, i.e.
    /// `per_time_window` is not smaller than the number of operations.
    pub fn new<C>(
        operations: Vec<Operation<T, E>>,
        consumer: C,
        config: ThrottlerConfig,
        runtime: Handle,
    ) -> Result<Self, ThrottleError>
    where
        C: Consumer<T> + 'static,
    {
        config.validate(operations.len())?;

        let capacity = operations.len();
        let (state, _) = watch::channel(EngineState::Idle);

        Ok(Self {
            config,
            pending: PendingStore::seeded(operations),
            consumer: Box::new(consumer),
            runtime,
            dispatch: Dispatch::none(),
            state,
            capacity,
        })
    }

    /// Send diagnostics to `dispatch` instead of discarding them
    pub fn with_dispatch(mut self, dispatch: impl Into<Dispatch>) -> Self {
        self.dispatch = dispatch.into();
        self
    }

    /// Observe the engine's lifecycle
    pub fn watch_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &ThrottlerConfig {
        &self.config
    }

    /// Operations waiting to be admitted
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Run both loops until every operation has been delivered or recorded as failed
    pub async fn run(self) -> Result<RunReport<E>, ThrottleError> {
        let dispatch = self.dispatch.clone();
        async move {
            let span = info_span!("throttler", run_id = %Uuid::now_v7());
            self.orchestrate().instrument(span).await
        }
        .with_subscriber(dispatch)
        .await
    }

    async fn orchestrate(self) -> Result<RunReport<E>, ThrottleError> {
        let Self {
            config,
            pending,
            consumer,
            runtime,
            state,
            capacity,
            ..
        } = self;

        info!(
            operations = capacity,
            per_time_window = config.per_time_window,
            concurrency = config.concurrency,
            time_window_secs = config.time_window_secs,
            "Starting throttler"
        );

        let state = Arc::new(state);
        let gate = ConcurrencyGate::new(config.concurrency);
        let (signal, completion) = CompletionSignal::new();
        let (completed_tx, completed_rx) = completed_stream(capacity);

        let admission = AdmissionLoop {
            config,
            pending,
            gate: gate.clone(),
            completed: completed_tx,
            signal,
            runtime: runtime.clone(),
            state: state.clone(),
        };
        let delivery = DeliveryLoop {
            consumer,
            completed: completed_rx,
            completion,
        };

        state.send_replace(EngineState::Running);
        let producer = runtime.spawn(admission.run().in_current_span().with_current_subscriber());
        let consumer = runtime.spawn(delivery.run().in_current_span().with_current_subscriber());

        let delivery = match consumer.await {
            Ok(Ok(summary)) => summary,
            Ok(Err(err)) => {
                gate.close();
                producer.abort();
                let _ = producer.await;
                state.send_replace(EngineState::Done);
                return Err(err);
            }
            Err(join_err) => {
                gate.close();
                producer.abort();
                let _ = producer.await;
                state.send_replace(EngineState::Done);
                return Err(ThrottleError::TaskPanicked {
                    task: "delivery",
                    message: panic_message(join_err),
                });
            }
        };

        let admission = producer.await.map_err(|join_err| ThrottleError::TaskPanicked {
            task: "admission",
            message: panic_message(join_err),
        });
        state.send_replace(EngineState::Done);
        let admission = admission?;

        let report = RunReport::new(admission, delivery, gate.peak());
        info!(stats = ?report.stats, "Throttler finished");
        Ok(report)
    }
}

/// Producer side: batches, gates and routes operations
struct AdmissionLoop<T, E> {
    config: ThrottlerConfig,
    pending: PendingStore<T, E>,
    gate: ConcurrencyGate,
    completed: CompletedSender<T>,
    signal: CompletionSignal,
    runtime: Handle,
    state: Arc<watch::Sender<EngineState>>,
}

impl<T, E> AdmissionLoop<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(mut self) -> AdmissionSummary<E> {
        info!(pending = self.pending.len(), "Starting admission loop");
        let window = self.config.time_window();
        let mut sink = FailureSink::default();
        let mut summary = AdmissionSummary {
            batches: 0,
            admitted: 0,
            completed: 0,
            retried: 0,
            failures: Vec::new(),
            exhausted: false,
        };

        while !self.signal.is_set() {
            let batch = self.pending.take_batch(self.config.per_time_window);
            summary.batches += 1;
            info!(batch = summary.batches, size = batch.len(), "Processing batch");

            let mut running = JoinSet::new();
            for operation in batch {
                debug!(operation = operation.label(), "AdmissionLoop::run: admitting");
                summary.admitted += 1;
                let task = execute(self.gate.clone(), operation, self.config.operation_timeout());
                running.spawn_on(task.in_current_span().with_current_subscriber(), &self.runtime);
            }

            while let Some(joined) = running.join_next().await {
                let executed = joined.unwrap_or_else(|join_err| Err(Failure::Panicked(panic_message(join_err))));
                match executed {
                    Ok(Outcome::Success(value)) => {
                        if self.completed.push(value).await.is_err() {
                            warn!("Delivery loop has stopped, abandoning remaining work");
                            summary.failures = sink.into_vec();
                            return summary;
                        }
                        summary.completed += 1;
                    }
                    Ok(Outcome::Retry(replacement)) => {
                        warn!(
                            operation = replacement.label(),
                            window_secs = self.config.time_window_secs,
                            "Operation throttled, backing off for a full window"
                        );
                        self.pending.push(replacement);
                        summary.retried += 1;
                        tokio::time::sleep(window).await;
                    }
                    Ok(Outcome::Failure(err)) => {
                        error!("Operation failed, storing it in the failure sink");
                        sink.record(Failure::Operation(err));
                    }
                    Err(failure) => {
                        error!(kind = failure.kind(), "Operation did not complete, storing it in the failure sink");
                        sink.record(failure);
                    }
                }
            }

            // Only after the whole batch is folded back, retries included
            if self.pending.is_empty() {
                self.signal.set();
                self.state.send_replace(EngineState::Draining);
            }

            if self.signal.is_set() {
                info!("Done processing all operations");
            } else {
                info!(
                    remaining = self.pending.len(),
                    window_secs = self.config.time_window_secs,
                    "Finished processing batch, sleeping until next window"
                );
                tokio::time::sleep(window).await;
            }
        }

        summary.exhausted = true;
        summary.failures = sink.into_vec();
        summary
    }
}

/// Drive one operation through the gate
async fn execute<T, E>(
    gate: ConcurrencyGate,
    operation: Operation<T, E>,
    timeout: Option<Duration>,
) -> Result<Outcome<T, E>, Failure<E>> {
    let bounded = async move {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| Failure::TimedOut(limit)),
            None => Ok(operation.await),
        }
    };
    gate.run(bounded).await.map_err(Failure::Rejected)?
}

/// Consumer side: hands completed results to the caller
struct DeliveryLoop<T> {
    consumer: Box<dyn Consumer<T>>,
    completed: CompletedReceiver<T>,
    completion: CompletionWatch,
}

impl<T> DeliveryLoop<T>
where
    T: Send + 'static,
{
    async fn run(mut self) -> Result<DeliverySummary, ThrottleError> {
        info!("Starting delivery loop");
        let mut delivered = 0;

        // The stream closes only once the admission loop is gone
        while let Some(item) = self.completed.pop().await {
            if let Err(cause) = self.consumer.consume(item).await {
                error!(delivered, error = %cause, "Consumer failed, aborting delivery");
                return Err(ThrottleError::Consumer { delivered, cause });
            }
            delivered += 1;
        }

        if !self.completion.is_set() {
            warn!("Admission loop stopped without signalling completion");
        }
        info!(delivered, "Delivery loop finished");
        Ok(DeliverySummary { delivered })
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => {
            if let Some(msg) = payload.downcast_ref::<&str>() {
                msg.to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic payload".to_string()
            }
        }
        Err(err) => err.to_string(),
    }
}
