use std::fmt;

use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use super::executor::ExecutionConfirmation;
use crate::error::{RelayError, Result};
use crate::protocol::{MessageEnvelope, MessageId, RandomnessResponse};

/// Where a relay run currently is.
///
/// A run moves forward one state at a time and may drop to
/// [`Failed`](Self::Failed) from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Dispatching,
    AttestationPending,
    AttestationRegistering,
    Executing,
    AwaitingResponse,
    Completed,
    Failed,
}

impl PipelineState {
    /// The next state on the success path.
    pub fn successor(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Idle => Some(PipelineState::Dispatching),
            PipelineState::Dispatching => Some(PipelineState::AttestationPending),
            PipelineState::AttestationPending => Some(PipelineState::AttestationRegistering),
            PipelineState::AttestationRegistering => Some(PipelineState::Executing),
            PipelineState::Executing => Some(PipelineState::AwaitingResponse),
            PipelineState::AwaitingResponse => Some(PipelineState::Completed),
            PipelineState::Completed | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        !self.is_terminal() && (self.successor() == Some(next) || next == PipelineState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Dispatching => "Dispatching",
            PipelineState::AttestationPending => "AttestationPending",
            PipelineState::AttestationRegistering => "AttestationRegistering",
            PipelineState::Executing => "Executing",
            PipelineState::AwaitingResponse => "AwaitingResponse",
            PipelineState::Completed => "Completed",
            PipelineState::Failed => "Failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error that ended a run and the state it was in at the time.
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: PipelineState,
    #[source]
    pub error: RelayError,
}

impl StageFailure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// Progress and outcome of a single relay run.
///
/// Every status change is published on a [`watch`] channel so observers can
/// follow a run without borrowing the record.
#[derive(Debug)]
pub struct RequestRecord {
    envelope: MessageEnvelope,
    dispatch_id: Option<MessageId>,
    message_id: Option<MessageId>,
    execution: Option<ExecutionConfirmation>,
    status: PipelineState,
    history: Vec<PipelineState>,
    result: Option<RandomnessResponse>,
    failure: Option<StageFailure>,
    status_tx: watch::Sender<PipelineState>,
}

impl RequestRecord {
    pub fn new(envelope: MessageEnvelope) -> Self {
        let (status_tx, _) = watch::channel(PipelineState::Idle);
        Self::with_status_channel(envelope, status_tx)
    }

    /// Creates a record that publishes its status on `status_tx`.
    pub fn with_status_channel(
        envelope: MessageEnvelope,
        status_tx: watch::Sender<PipelineState>,
    ) -> Self {
        status_tx.send_replace(PipelineState::Idle);
        Self {
            envelope,
            dispatch_id: None,
            message_id: None,
            execution: None,
            status: PipelineState::Idle,
            history: vec![PipelineState::Idle],
            result: None,
            failure: None,
            status_tx,
        }
    }

    /// Moves to `next`, rejecting anything but the successor or `Failed`.
    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RelayError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        debug!(
            from = %self.status,
            to = %next,
            event = "pipeline_state_changed"
        );
        self.status = next;
        self.history.push(next);
        self.status_tx.send_replace(next);
        Ok(())
    }

    pub fn complete(&mut self, response: RandomnessResponse) -> Result<()> {
        self.advance(PipelineState::Completed)?;
        self.result = Some(response);
        Ok(())
    }

    /// Fails the run at its current stage.
    pub fn fail(&mut self, error: RelayError) -> Result<()> {
        let stage = self.status;
        self.advance(PipelineState::Failed)?;
        self.failure = Some(StageFailure { stage, error });
        Ok(())
    }

    pub(crate) fn set_dispatch_id(&mut self, id: MessageId) {
        self.dispatch_id = Some(id);
    }

    pub(crate) fn set_message_id(&mut self, id: MessageId) {
        self.message_id = Some(id);
    }

    pub(crate) fn set_execution(&mut self, confirmation: ExecutionConfirmation) {
        self.execution = Some(confirmation);
    }

    pub fn watch(&self) -> watch::Receiver<PipelineState> {
        self.status_tx.subscribe()
    }

    pub fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    /// Id read from the source-chain dispatch event
    pub fn dispatch_id(&self) -> Option<MessageId> {
        self.dispatch_id
    }

    /// Id used for execution and response correlation
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// The Yaru execution transaction, once confirmed
    pub fn execution(&self) -> Option<ExecutionConfirmation> {
        self.execution
    }

    pub fn status(&self) -> PipelineState {
        self.status
    }

    /// Every state the run has been in, starting with `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn result(&self) -> Option<&RandomnessResponse> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    /// The response of a completed run or the failure of a failed one.
    ///
    /// A record that is not terminal yet yields an `InvalidTransition`
    /// failure at its current state.
    pub fn into_outcome(self) -> std::result::Result<RandomnessResponse, StageFailure> {
        match (self.result, self.failure) {
            (Some(response), _) => Ok(response),
            (None, Some(failure)) => Err(failure),
            (None, None) => Err(StageFailure {
                stage: self.status,
                error: RelayError::InvalidTransition {
                    from: self.status,
                    to: PipelineState::Completed,
                },
            }),
        }
    }
}
