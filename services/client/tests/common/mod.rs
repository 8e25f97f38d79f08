//! Scripted aggregator stub for integration tests
#![allow(dead_code)]

use shared::{Bet, Framing, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the stub does after decoding one request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Write a `\n`-terminated line and keep the connection open
    Line(String),
    /// Write the text as-is and keep the connection open
    Write(String),
    /// Write the text as-is, then close the connection
    WriteAndClose(String),
    /// Drop the connection without answering
    Close,
    /// Keep the connection open and never answer
    Hang,
}

type Responder = dyn Fn(&Message) -> Reply + Send + Sync;

pub struct StubServer {
    pub address: String,
    received: Arc<Mutex<Vec<Message>>>,
    connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start<F>(framing: Framing, responder: F) -> Self
    where
        F: Fn(&Message) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let address = listener.local_addr().expect("stub address").to_string();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let responder: Arc<Responder> = Arc::new(responder);

        let handle = {
            let received = received.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(stream, framing, responder.clone(), received.clone()));
                }
            })
        };

        Self {
            address,
            received,
            connections,
            handle,
        }
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().expect("received lock").clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Sizes of every bets batch, in arrival order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.received()
            .iter()
            .filter_map(|m| match m {
                Message::Bets { bets, .. } => Some(bets.len()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Message) -> bool) -> usize {
        self.received().iter().filter(|m| pred(m)).count()
    }

    /// Wait until at least `n` requests have been decoded
    pub async fn wait_for_requests(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.received.lock().expect("received lock").len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("stub server never saw the expected requests");
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    framing: Framing,
    responder: Arc<Responder>,
    received: Arc<Mutex<Vec<Message>>>,
) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let (payload, consumed) = loop {
            match framing.decode(&buf) {
                Ok(Some(frame)) => break frame,
                Ok(None) => {}
                Err(_) => return,
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };
        buf.drain(..consumed);

        let Ok(message) = Message::parse(&payload) else {
            return;
        };
        let reply = responder(&message);
        received.lock().expect("received lock").push(message);

        match reply {
            Reply::Line(line) => {
                if stream.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                    return;
                }
            }
            Reply::Write(text) => {
                if stream.write_all(text.as_bytes()).await.is_err() {
                    return;
                }
            }
            Reply::WriteAndClose(text) => {
                let _ = stream.write_all(text.as_bytes()).await;
                let _ = stream.shutdown().await;
                return;
            }
            Reply::Close => return,
            Reply::Hang => {
                // Park until the client hangs up
                while let Ok(n) = stream.read(&mut chunk).await {
                    if n == 0 {
                        break;
                    }
                }
                return;
            }
        }
    }
}

/// Acknowledge bets and completion, answer winners with `winners`
pub fn happy_responder(winners: &'static [&'static str]) -> impl Fn(&Message) -> Reply + Send + Sync {
    move |message: &Message| match message {
        Message::GetWinners { .. } => WinnersReply::Ready(winners).into(),
        _ => Reply::Line("OK".to_string()),
    }
}

pub enum WinnersReply {
    NotHeld,
    Ready(&'static [&'static str]),
}

impl WinnersReply {
    fn render(self) -> String {
        let response = match self {
            WinnersReply::NotHeld => shared::WinnersResponse::NotReady,
            WinnersReply::Ready(docs) => {
                shared::WinnersResponse::Ready(docs.iter().map(|d| d.to_string()).collect())
            }
        };
        response.render()
    }

    /// Answer without closing, leaving the client to stop reading on its own
    pub fn keep_open(self) -> Reply {
        Reply::Write(self.render())
    }
}

impl From<WinnersReply> for Reply {
    fn from(reply: WinnersReply) -> Self {
        Reply::WriteAndClose(reply.render())
    }
}

pub fn bets(count: usize) -> Vec<Bet> {
    (0..count)
        .map(|i| {
            Bet::new(
                "Santiago Lionel",
                "Lorca",
                &(30_904_465 + i).to_string(),
                "1999-03-17",
                &(7_574 + i).to_string(),
            )
            .expect("valid fixture bet")
        })
        .collect()
}

pub fn documents(bets: &[Bet]) -> Vec<String> {
    bets.iter().map(|b| b.document.as_str().to_string()).collect()
}
