//! Batch sender
//!
//! Splits bets into batches of at most `batch_max_size`, sends them over a
//! single connection and waits for one acknowledgement per batch before
//! sending the next.

use shared::protocol::{batch_payload, truncate};
use shared::Bet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Span};

use crate::channel::FramedChannel;
use crate::config::ClientConfig;
use crate::errors::Result;

pub struct BetSender {
    config: Arc<ClientConfig>,
    cancel: CancellationToken,
    span: Span,
}

impl BetSender {
    pub fn new(config: Arc<ClientConfig>, cancel: CancellationToken, span: Span) -> Self {
        Self { config, cancel, span }
    }

    /// Send every bet and return the number of acknowledged batches
    ///
    /// The first failure aborts the call. Batches acknowledged before it are
    /// neither retried nor rolled back.
    #[tracing::instrument(name = "send_bets", parent = &self.span, skip_all, fields(bet_count = bets.len()))]
    pub async fn send_bets(&self, bets: &[Bet]) -> Result<usize> {
        if bets.is_empty() {
            return Ok(0);
        }

        let mut channel = FramedChannel::connect(
            &self.config.server_address,
            self.config.framing,
            self.cancel.clone(),
        )
        .await?;

        let mut batches = 0;
        for batch in bets.chunks(self.config.batch_max_size.max(1)) {
            let payload = batch_payload(&self.config.id, batch);
            channel.send_framed(&payload).await?;
            let response = channel.receive_line().await?;

            batches += 1;
            metrics::counter!("batches_sent_total").increment(1);
            metrics::counter!("bets_sent_total").increment(batch.len() as u64);

            info!(
                action = "apuesta_enviada",
                result = "success",
                batch_size = batch.len(),
                response = %truncate(&response, 64)
            );
        }

        channel.close().await;
        Ok(batches)
    }
}
