//! TCP server for game clients
//!
//! Handles incoming connections and manages client lifecycle. Each client
//! gets an id on accept; every parsed line is forwarded to the game loop as
//! an [`InboundCommand`], and the game loop answers through
//! [`OutboundMessage`]s routed back here.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::{add_message, parse_message, ClientRequest, ParsedMessage};
use crate::runtime::{ClientId, InboundCommand, OutboundMessage};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of the inbound command queue
    pub max_pending_commands: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_pending_commands: 64,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    ///
    /// - `BLOCKROOMS_HOST`: bind address (default "127.0.0.1")
    /// - `BLOCKROOMS_PORT`: port number (default 7878, 0 picks a free port)
    /// - `BLOCKROOMS_MAX_PENDING`: inbound queue capacity (default 64)
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("BLOCKROOMS_HOST").unwrap_or(defaults.host);
        let port = env::var("BLOCKROOMS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let max_pending_commands = env::var("BLOCKROOMS_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.max_pending_commands);

        Self {
            host,
            port,
            max_pending_commands,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Connected clients by id
#[derive(Default)]
struct ServerState {
    clients: RwLock<HashMap<ClientId, mpsc::UnboundedSender<String>>>,
}

impl ServerState {
    async fn send_to(&self, client_id: ClientId, line: String) {
        let clients = self.clients.read().await;
        if let Some(tx) = clients.get(&client_id) {
            let _ = tx.send(line);
        }
    }
}

/// Start the TCP server
///
/// `ready_tx` receives the bound address once the listener is up, which lets
/// callers bind port 0.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    info!(%bound, "TCP server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::default());
    let mut client_id_counter: ClientId = 0;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(OutboundMessage::ToClient { client_id, line }) = out_rx.recv().await {
                state.send_to(client_id, line).await;
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        info!(client = client_id, %addr, "client connected");

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, Arc::clone(&state), command_tx.clone()).await
            {
                warn!(client = client_id, error = %e, "client error");
            }
            state.clients.write().await.remove(&client_id);
            // The game loop must see every disconnect, so wait for capacity.
            let _ = command_tx
                .send(InboundCommand {
                    client_id,
                    request: ClientRequest::Disconnect,
                })
                .await;
            info!(client = client_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: ClientId,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.clients.write().await.insert(client_id, tx.clone());

    // Spawn task to write messages to client
    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let flash = |text: &str| {
        if let Ok(line) = add_message(text) {
            let _ = tx.send(line);
        }
    };

    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Request(request)) => {
                // Backpressure: bounded queue.
                if command_tx
                    .try_send(InboundCommand { client_id, request })
                    .is_err()
                {
                    warn!(client = client_id, "command queue full");
                    flash("Server busy");
                }
            }
            Ok(ParsedMessage::Unknown(msg_type)) => {
                debug!(client = client_id, %msg_type, "unknown message type ignored");
            }
            Err(e) => {
                warn!(client = client_id, error = %e, "malformed message");
                flash("Invalid message");
            }
        }
    }

    write_task.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_addr() {
        let addr = ServerConfig::default().socket_addr().unwrap();
        assert_eq!(addr.port(), 7878);
    }

    #[test]
    fn test_bad_host_is_an_error() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
