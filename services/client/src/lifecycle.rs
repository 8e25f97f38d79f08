//! Lifecycle controller
//!
//! Drives one agency run: send every batch, notify completion, poll for
//! winners. The cancellation token is checked at each phase boundary and
//! raced against every socket wait, so a shutdown request stops the run at
//! the next safe point without sending anything else.

use shared::ErrorCategory;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Span};

use crate::bet_sender::BetSender;
use crate::config::ClientConfig;
use crate::errors::{ClientError, Result};
use crate::notifier::CompletionNotifier;
use crate::source::BetSource;
use crate::winners::WinnersPoller;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    SendingBatches,
    NotifyingCompletion,
    PollingWinners,
    Done,
    ShuttingDown,
    Aborted,
}

impl ClientState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientState::Done | ClientState::ShuttingDown | ClientState::Aborted)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Done { winners: Vec<String> },
    ShuttingDown,
    Aborted { error: ClientError },
}

impl RunOutcome {
    pub fn state(&self) -> ClientState {
        match self {
            RunOutcome::Done { .. } => ClientState::Done,
            RunOutcome::ShuttingDown => ClientState::ShuttingDown,
            RunOutcome::Aborted { .. } => ClientState::Aborted,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Done { .. } => 0,
            RunOutcome::ShuttingDown => ErrorCategory::Shutdown.exit_code(),
            RunOutcome::Aborted { error } => error.category().exit_code(),
        }
    }
}

pub struct LifecycleController {
    config: Arc<ClientConfig>,
    cancel: CancellationToken,
    span: Span,
    state: ClientState,
    sender: BetSender,
    notifier: CompletionNotifier,
    poller: WinnersPoller,
    bets_sent: usize,
    batches_sent: usize,
}

impl LifecycleController {
    pub fn new(config: ClientConfig, cancel: CancellationToken) -> Self {
        let span = info_span!("agency", client_id = %config.id);
        let config = Arc::new(config);

        Self {
            sender: BetSender::new(config.clone(), cancel.clone(), span.clone()),
            notifier: CompletionNotifier::new(config.clone(), cancel.clone(), span.clone()),
            poller: WinnersPoller::new(config.clone(), cancel.clone(), span.clone()),
            config,
            cancel,
            span,
            state: ClientState::Idle,
            bets_sent: 0,
            batches_sent: 0,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn bets_sent(&self) -> usize {
        self.bets_sent
    }

    pub fn batches_sent(&self) -> usize {
        self.batches_sent
    }

    /// Run every phase to completion, shutdown or the first fatal error
    pub async fn run(&mut self, source: &mut dyn BetSource) -> RunOutcome {
        match self.drive(source).await {
            Ok(winners) => {
                self.transition(ClientState::Done);
                info!(
                    parent: &self.span,
                    action = "consulta_ganadores",
                    result = "success",
                    cant_ganadores = winners.len()
                );
                RunOutcome::Done { winners }
            }
            Err(ClientError::Cancelled) => {
                self.transition(ClientState::ShuttingDown);
                info!(
                    parent: &self.span,
                    action = "shutdown",
                    result = "success",
                    bets_sent = self.bets_sent
                );
                RunOutcome::ShuttingDown
            }
            Err(error) => {
                self.transition(ClientState::Aborted);
                metrics::counter!("client_errors_total", "kind" => error.kind()).increment(1);
                error!(
                    parent: &self.span,
                    action = "run",
                    result = "fail",
                    category = ?error.category(),
                    error = %error
                );
                RunOutcome::Aborted { error }
            }
        }
    }

    async fn drive(&mut self, source: &mut dyn BetSource) -> Result<Vec<String>> {
        loop {
            self.checkpoint()?;
            let batch = source.next_batch(self.config.batch_max_size).await?;
            if batch.is_empty() {
                break;
            }
            self.transition(ClientState::SendingBatches);

            match self.sender.send_bets(&batch).await {
                Ok(batches) => {
                    self.batches_sent += batches;
                    self.bets_sent += batch.len();
                }
                Err(e) => {
                    if !matches!(e, ClientError::Cancelled) {
                        error!(
                            parent: &self.span,
                            action = "apuesta_enviada",
                            result = "fail",
                            resume_offset = source.offset().saturating_sub(batch.len()),
                            error = %e
                        );
                    }
                    return Err(e);
                }
            }
        }

        self.checkpoint()?;
        self.transition(ClientState::NotifyingCompletion);
        if let Err(e) = self.notifier.notify_finished().await {
            if !matches!(e, ClientError::Cancelled) {
                error!(
                    parent: &self.span,
                    action = "notify_bets_finished",
                    result = "fail",
                    error = %e
                );
            }
            return Err(e);
        }

        self.checkpoint()?;
        self.transition(ClientState::PollingWinners);
        self.poller.poll_winners().await
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        Ok(())
    }

    fn transition(&mut self, next: ClientState) {
        if self.state == next {
            return;
        }
        info!(
            parent: &self.span,
            action = "state_transition",
            result = "success",
            from = ?self.state,
            to = ?next
        );
        self.state = next;
    }
}
