//! Framed TCP channel
//!
//! Owns exactly one connection to the aggregator. Every wait on the socket
//! races the session's cancellation token, so a shutdown request closes the
//! connection out from under a blocked read or write.

use shared::protocol::truncate;
use shared::Framing;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::errors::{ClientError, Result};

/// Longest response excerpt written to status lines
const RESPONSE_LOG_CHARS: usize = 64;

pub struct FramedChannel {
    stream: BufReader<TcpStream>,
    framing: Framing,
    cancel: CancellationToken,
}

impl FramedChannel {
    /// Open one connection; never retries
    pub async fn connect(address: &str, framing: Framing, cancel: CancellationToken) -> Result<Self> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            res = TcpStream::connect(address) => res,
        };

        match connected {
            Ok(stream) => {
                debug!(action = "connect", result = "success", address = %address);
                Ok(Self {
                    stream: BufReader::new(stream),
                    framing,
                    cancel,
                })
            }
            Err(e) => {
                error!(action = "connect", result = "fail", address = %address, error = %e);
                Err(ClientError::Connect {
                    address: address.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Frame `payload` with the session framing and write it out
    pub async fn send_framed(&mut self, payload: &str) -> Result<()> {
        let frame = match self.framing.encode(payload) {
            Ok(frame) => frame,
            Err(e) => {
                error!(action = "send_message", result = "fail", error = %e);
                return Err(e.into());
            }
        };

        let socket = self.stream.get_mut();
        let written = until_cancelled(&self.cancel, async {
            socket.write_all(&frame).await?;
            socket.flush().await
        })
        .await;

        self.finish("send_message", written).await
    }

    /// Read one `\n`-terminated line, returned without its terminator
    pub async fn receive_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = until_cancelled(&self.cancel, self.stream.read_line(&mut line)).await;
        self.finish("receive_message", read).await?;

        if !line.ends_with('\n') {
            let e = io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed before end of line");
            error!(action = "receive_message", result = "fail", error = %e);
            return Err(ClientError::Io(e));
        }

        let line = strip_terminator(&line);
        debug!(
            action = "receive_message",
            result = "success",
            response = %truncate(&line, RESPONSE_LOG_CHARS)
        );
        Ok(line)
    }

    /// Lines the server has already sent, without waiting for more
    ///
    /// Stops at end of stream or as soon as a read would block. A trailing
    /// partial line is returned as it stands.
    pub async fn receive_pending_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            match timeout(Duration::ZERO, self.stream.read_line(&mut line)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => lines.push(strip_terminator(&line)),
                Ok(Err(e)) => return self.finish("receive_message", Err(ClientError::Io(e))).await,
                Err(_) => {
                    if !line.is_empty() {
                        lines.push(strip_terminator(&line));
                    }
                    break;
                }
            }
        }
        Ok(lines)
    }

    /// Shut the write side down; safe to call more than once
    pub async fn close(&mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!(action = "close", result = "fail", error = %e);
        }
    }

    async fn finish<T>(&mut self, action: &'static str, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(ClientError::Cancelled) => {
                debug!(action, result = "cancelled", "closing connection on shutdown request");
                self.close().await;
                Err(ClientError::Cancelled)
            }
            Err(e) => {
                error!(action, result = "fail", error = %e);
                Err(e)
            }
        }
    }
}

fn strip_terminator(line: &str) -> String {
    line.trim_end_matches('\n').trim_end_matches('\r').to_string()
}

async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        res = fut => res.map_err(ClientError::Io),
    }
}
