use shared::protocol::truncate;
use shared::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Span};

use crate::channel::FramedChannel;
use crate::config::ClientConfig;
use crate::errors::Result;

/// Tells the server this agency has no more bets to send
pub struct CompletionNotifier {
    config: Arc<ClientConfig>,
    cancel: CancellationToken,
    span: Span,
}

impl CompletionNotifier {
    pub fn new(config: Arc<ClientConfig>, cancel: CancellationToken, span: Span) -> Self {
        Self { config, cancel, span }
    }

    #[tracing::instrument(name = "notify_finished", parent = &self.span, skip_all)]
    pub async fn notify_finished(&self) -> Result<()> {
        let mut channel = FramedChannel::connect(
            &self.config.server_address,
            self.config.framing,
            self.cancel.clone(),
        )
        .await?;

        let message = Message::BetsFinished {
            agency: self.config.id.clone(),
        };
        channel.send_framed(&message.payload()).await?;
        let response = channel.receive_line().await?;
        channel.close().await;

        info!(
            action = "notify_bets_finished",
            result = "success",
            response = %truncate(&response, 64)
        );
        Ok(())
    }
}
