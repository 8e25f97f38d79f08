//! Winners poller
//!
//! Asks the server for the agency's winners until the draw has been held.
//! Connection and I/O failures are expected while the server is busy and are
//! retried after the same fixed delay as a "not held yet" answer.

use backoff::backoff::Backoff;
use shared::{Message, WinnersResponse};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Span};

use crate::channel::FramedChannel;
use crate::config::ClientConfig;
use crate::errors::{ClientError, Result};
use crate::retry_strategy::RetryStrategy;

pub struct WinnersPoller {
    config: Arc<ClientConfig>,
    cancel: CancellationToken,
    span: Span,
    retry_strategy: RetryStrategy,
}

impl WinnersPoller {
    pub fn new(config: Arc<ClientConfig>, cancel: CancellationToken, span: Span) -> Self {
        let retry_strategy = RetryStrategy::from_config(&config);
        Self {
            config,
            cancel,
            span,
            retry_strategy,
        }
    }

    /// Poll until the server returns the winners list
    #[tracing::instrument(name = "poll_winners", parent = &self.span, skip_all)]
    pub async fn poll_winners(&self) -> Result<Vec<String>> {
        let mut backoff = self.retry_strategy.create_backoff();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            metrics::counter!("winners_poll_attempts_total").increment(1);

            match self.request_winners().await {
                Ok(WinnersResponse::Ready(winners)) => return Ok(winners),
                Ok(WinnersResponse::NotReady) => {
                    info!(
                        action = "consulta_ganadores",
                        result = "in_progress",
                        attempt = attempts,
                        "draw not held yet, retrying"
                    );
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        action = "consulta_ganadores",
                        result = "fail",
                        attempt = attempts,
                        error = %e
                    );
                }
                Err(e) => return Err(e),
            }

            if !self.retry_strategy.should_retry(attempts) {
                return Err(ClientError::PollExhausted { attempts });
            }

            let delay = backoff
                .next_backoff()
                .unwrap_or_else(|| self.retry_strategy.delay());
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = sleep(delay) => {}
            }
        }
    }

    /// One attempt on a fresh connection
    ///
    /// The answer is classified from its first line. Once the draw is held,
    /// any further winner lines already sent are collected as well.
    async fn request_winners(&self) -> Result<WinnersResponse> {
        let mut channel = FramedChannel::connect(
            &self.config.server_address,
            self.config.framing,
            self.cancel.clone(),
        )
        .await?;

        let message = Message::GetWinners {
            agency: self.config.id.clone(),
        };
        channel.send_framed(&message.payload()).await?;
        let first = channel.receive_line().await?;

        let response = match WinnersResponse::parse(&first) {
            WinnersResponse::NotReady => WinnersResponse::NotReady,
            WinnersResponse::Ready(mut winners) => {
                let rest = channel.receive_pending_lines().await?;
                winners.extend(
                    rest.iter()
                        .map(|line| line.trim())
                        .filter(|line| !line.is_empty())
                        .map(str::to_string),
                );
                WinnersResponse::Ready(winners)
            }
        };
        channel.close().await;

        Ok(response)
    }
}
