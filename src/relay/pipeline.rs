use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info, warn, Instrument};

use super::attestation::AttestationRelay;
use super::config::RelayConfig;
use super::correlator::ResponseCorrelator;
use super::dispatcher::MessageDispatcher;
use super::executor::MessageExecutor;
use super::state::{PipelineState, RequestRecord};
use crate::error::{RelayError, Result};
use crate::protocol::{MessageEnvelope, RandomnessResponse};
use crate::spans;
use crate::traits::{AttestationProvider, ChainClient};

/// Runs envelopes through Dispatch → Attest → Execute → Await-Response.
///
/// A pipeline holds one client per network and is cheap to clone; clones
/// share the clients, so concurrent runs reuse the same connections.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use hashi_vrf_rs::{MessageEnvelope, RelayConfig, RelayPipeline};
/// use hashi_vrf_rs::testing::{FakeAttestationProvider, FakeChainClient};
/// use alloy_primitives::Address;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), hashi_vrf_rs::RelayError> {
/// let config = RelayConfig::chiado_to_goerli(
///     "http://localhost:8545".parse().unwrap(),
///     "ws://localhost:8546".parse().unwrap(),
///     Address::ZERO,
/// )?;
///
/// let pipeline = RelayPipeline::builder()
///     .config(config.clone())
///     .source_client(Arc::new(FakeChainClient::new(config.source.chain_id)))
///     .destination_client(Arc::new(FakeChainClient::new(config.destination.chain_id)))
///     .attestor(Arc::new(FakeAttestationProvider::signature(vec![0x51; 65])))
///     .build()?;
///
/// let envelope = MessageEnvelope::request_random_words(10200, 5, config.response_contract);
/// let record = pipeline.run(envelope, CancellationToken::new()).await;
/// println!("finished in {}", record.status());
/// # Ok(())
/// # }
/// ```
pub struct RelayPipeline<S, D, A> {
    config: Arc<RelayConfig>,
    dispatcher: Arc<MessageDispatcher<S>>,
    attestation: Arc<AttestationRelay<D, A>>,
    executor: Arc<MessageExecutor<D>>,
    correlator: Arc<ResponseCorrelator<D>>,
}

impl<S, D, A> Clone for RelayPipeline<S, D, A> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            dispatcher: Arc::clone(&self.dispatcher),
            attestation: Arc::clone(&self.attestation),
            executor: Arc::clone(&self.executor),
            correlator: Arc::clone(&self.correlator),
        }
    }
}

#[bon::bon]
impl<S, D, A> RelayPipeline<S, D, A>
where
    S: ChainClient + 'static,
    D: ChainClient + 'static,
    A: AttestationProvider + 'static,
{
    /// Wires the stages together after checking the configuration and that
    /// each client is connected to the chain the configuration names.
    #[builder]
    pub fn new(
        config: RelayConfig,
        source_client: Arc<S>,
        destination_client: Arc<D>,
        attestor: Arc<A>,
    ) -> Result<Self> {
        config.validate()?;
        if source_client.chain_id() != config.source.chain_id {
            return Err(RelayError::InvalidConfig(format!(
                "Source client is on chain {}, configuration expects {}",
                source_client.chain_id(),
                config.source.chain_id
            )));
        }
        if destination_client.chain_id() != config.destination.chain_id {
            return Err(RelayError::InvalidConfig(format!(
                "Destination client is on chain {}, configuration expects {}",
                destination_client.chain_id(),
                config.destination.chain_id
            )));
        }

        let dispatcher = MessageDispatcher::new(
            source_client,
            config.yaho,
            config.source_adapters.clone(),
            config.destination.chain_id,
            config.destination_adapters.clone(),
        );
        let attestation = AttestationRelay::new(
            Arc::clone(&destination_client),
            attestor,
            config.destination_amb,
        );
        let executor = MessageExecutor::new(Arc::clone(&destination_client), config.yaru);
        let correlator = ResponseCorrelator::new(destination_client, config.response_contract);

        Ok(Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            attestation: Arc::new(attestation),
            executor: Arc::new(executor),
            correlator: Arc::new(correlator),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Relays `envelope` and returns its terminal record.
    ///
    /// `cancel` is checked before every stage and raced against the
    /// response wait. A transaction already submitted is always waited on.
    pub async fn run(&self, envelope: MessageEnvelope, cancel: CancellationToken) -> RequestRecord {
        self.drive(RequestRecord::new(envelope), cancel).await
    }

    /// Relays `envelope` on a background task.
    ///
    /// Dropping the returned handle without [`RequestHandle::join`] cancels
    /// the run.
    pub fn spawn(&self, envelope: MessageEnvelope) -> RequestHandle {
        let (status_tx, status) = watch::channel(PipelineState::Idle);
        let record = RequestRecord::with_status_channel(envelope, status_tx);
        let cancel = CancellationToken::new();

        let pipeline = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { pipeline.drive(record, task_cancel).await });

        RequestHandle {
            status,
            cancel: cancel.clone(),
            task,
            teardown: Some(cancel.drop_guard()),
        }
    }

    async fn drive(&self, mut record: RequestRecord, cancel: CancellationToken) -> RequestRecord {
        let span = spans::relay_request(record.envelope());

        async {
            let outcome = self.run_stages(&mut record, &cancel).await;
            let settled = match outcome {
                Ok(response) => {
                    info!(
                        message_id = ?record.message_id(),
                        event = "relay_completed"
                    );
                    record.complete(response)
                }
                Err(error) => {
                    spans::record_error(&span, &error);
                    span.record("error.stage", record.status().as_str());
                    warn!(
                        stage = %record.status(),
                        error = %error,
                        event = "relay_failed"
                    );
                    record.fail(error)
                }
            };
            if let Err(e) = settled {
                warn!(error = %e, event = "relay_record_not_settled");
            }
        }
        .instrument(span.clone())
        .await;

        record
    }

    async fn run_stages(
        &self,
        record: &mut RequestRecord,
        cancel: &CancellationToken,
    ) -> Result<RandomnessResponse> {
        let envelope = record.envelope().clone();

        enter(record, PipelineState::Dispatching, cancel)?;
        let dispatch_id = self
            .dispatcher
            .dispatch(&envelope)
            .instrument(spans::dispatch_message(&envelope, self.config.yaho))
            .await?;
        record.set_dispatch_id(dispatch_id);

        enter(record, PipelineState::AttestationPending, cancel)?;
        let encoded = envelope.canonical_encoding();
        let attestation = self
            .attestation
            .request_attestation(&envelope)
            .instrument(spans::request_attestation(&envelope, encoded.len()))
            .await?;

        enter(record, PipelineState::AttestationRegistering, cancel)?;
        let registered = self
            .attestation
            .register_attestation(&encoded, attestation)
            .instrument(spans::register_attestation(
                self.config.destination_amb,
                self.config.destination.chain_id,
            ))
            .await?;
        let message_id = self
            .config
            .message_id_policy
            .reconcile(dispatch_id, registered)?;
        record.set_message_id(message_id);
        tracing::Span::current().record("message_id", tracing::field::display(message_id));

        enter(record, PipelineState::Executing, cancel)?;
        let execution = self
            .executor
            .execute(
                &envelope,
                message_id,
                self.config.sender,
                self.config.destination_amb,
            )
            .instrument(spans::execute_message(message_id, self.config.yaru))
            .await?;
        record.set_execution(execution);

        enter(record, PipelineState::AwaitingResponse, cancel)?;
        let timeout = self.config.response_timeout();
        self.correlator
            .await_response(message_id, timeout, cancel)
            .instrument(spans::await_response(
                message_id,
                self.config.response_contract,
                timeout,
            ))
            .await
    }
}

fn enter(
    record: &mut RequestRecord,
    next: PipelineState,
    cancel: &CancellationToken,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(RelayError::OperationCancelled);
    }
    record.advance(next)
}

/// Handle to a run started with [`RelayPipeline::spawn`].
#[derive(Debug)]
pub struct RequestHandle {
    status: watch::Receiver<PipelineState>,
    cancel: CancellationToken,
    task: JoinHandle<RequestRecord>,
    teardown: Option<DropGuard>,
}

impl RequestHandle {
    pub fn status(&self) -> PipelineState {
        *self.status.borrow()
    }

    pub fn status_watch(&self) -> watch::Receiver<PipelineState> {
        self.status.clone()
    }

    /// Waits until the run reaches `target` or a terminal state, and
    /// returns the state reached.
    pub async fn wait_for_status(&mut self, target: PipelineState) -> PipelineState {
        let reached = self
            .status
            .wait_for(|state| *state == target || state.is_terminal())
            .await
            .map(|state| *state);
        reached.unwrap_or_else(|_| *self.status.borrow())
    }

    /// Requests cancellation. The run stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Waits for the run to finish and returns its record.
    ///
    /// Dropping the returned future before it completes cancels the run.
    pub async fn join(self) -> Result<RequestRecord> {
        let RequestHandle { task, teardown, .. } = self;
        let joined = task.await;
        if let Some(guard) = teardown {
            guard.disarm();
        }
        joined.map_err(|e| RelayError::Provider(format!("relay task failed: {e}")))
    }
}
