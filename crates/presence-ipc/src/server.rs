//! IPC server implementation

use presence_api::{ClientInfo, ClientRole, Command, Event, Request, Response};
use presence_util::ClientId;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::{IpcError, IpcResult};

/// Message from a client connection to the service loop
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        info: ClientInfo,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

/// IPC Server
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    clients: Arc<RwLock<HashMap<ClientId, ClientHandle>>>,
    event_tx: broadcast::Sender<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    message_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>>,
}

struct ClientHandle {
    info: ClientInfo,
    response_tx: mpsc::UnboundedSender<String>,
    subscribed: bool,
}

/// Role granted to a peer.
///
/// Root and the daemon's own user administer sessions. Any other local user
/// with known credentials is the prompt shell. Peers whose credentials
/// cannot be read only get to observe.
pub fn role_for_uid(uid: Option<u32>, daemon_uid: u32) -> ClientRole {
    match uid {
        Some(0) => ClientRole::Admin,
        Some(u) if u == daemon_uid => ClientRole::Admin,
        Some(_) => ClientRole::Shell,
        None => ClientRole::Observer,
    }
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            clients: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            message_tx,
            message_rx: Arc::new(Mutex::new(Some(message_rx))),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start listening
    pub async fn start(&mut self) -> IpcResult<()> {
        // Remove a stale socket left by a previous run
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        // Owner and group only
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(path = %self.socket_path.display(), "IPC server listening");

        self.listener = Some(listener);

        Ok(())
    }

    /// Get receiver for server messages; only the first call returns it
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Accept connections in a loop
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| IpcError::ServerError("Server not started".into()))?;

        let daemon_uid = nix::unistd::getuid().as_raw();

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let client_id = ClientId::new();
                    let uid = get_peer_uid(&stream);
                    let role = role_for_uid(uid, daemon_uid);

                    let info = ClientInfo {
                        client_id: client_id.clone(),
                        role,
                        uid,
                    };

                    info!(client_id = %client_id, uid = ?uid, role = ?role, "Client connected");

                    self.handle_client(stream, client_id, info).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_client(&self, stream: UnixStream, client_id: ClientId, info: ClientInfo) {
        let (read_half, write_half) = stream.into_split();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<String>();

        {
            let mut clients = self.clients.write().await;
            clients.insert(
                client_id.clone(),
                ClientHandle {
                    info: info.clone(),
                    response_tx,
                    subscribed: false,
                },
            );
        }

        let _ = self.message_tx.send(ServerMessage::ClientConnected {
            client_id: client_id.clone(),
            info,
        });

        let clients = self.clients.clone();
        let message_tx = self.message_tx.clone();
        let client_id_reader = client_id.clone();

        // Reader: parse requests, track subscription state, forward to service
        tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!(client_id = %client_id_reader, "Client disconnected (EOF)");
                        break;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<Request>(line) {
                            Ok(request) => {
                                let subscribed = match request.command {
                                    Command::SubscribeEvents => Some(true),
                                    Command::UnsubscribeEvents => Some(false),
                                    _ => None,
                                };
                                if let Some(subscribed) = subscribed {
                                    let mut clients = clients.write().await;
                                    if let Some(handle) = clients.get_mut(&client_id_reader) {
                                        handle.subscribed = subscribed;
                                    }
                                }

                                let _ = message_tx.send(ServerMessage::Request {
                                    client_id: client_id_reader.clone(),
                                    request,
                                });
                            }
                            Err(e) => {
                                warn!(
                                    client_id = %client_id_reader,
                                    error = %e,
                                    "Invalid request"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        debug!(client_id = %client_id_reader, error = %e, "Read error");
                        break;
                    }
                }
            }

            // Dropping the handle closes the writer's response channel
            clients.write().await.remove(&client_id_reader);
        });

        // Writer: responses plus events for subscribed clients
        let mut event_rx = self.event_tx.subscribe();
        let clients_writer = self.clients.clone();
        let client_id_writer = client_id;
        let message_tx_writer = self.message_tx.clone();

        tokio::spawn(async move {
            let mut writer = write_half;

            loop {
                tokio::select! {
                    response = response_rx.recv() => {
                        let Some(mut msg) = response else {
                            break;
                        };
                        msg.push('\n');
                        if let Err(e) = writer.write_all(msg.as_bytes()).await {
                            debug!(client_id = %client_id_writer, error = %e, "Write error");
                            break;
                        }
                    }

                    event = event_rx.recv() => {
                        let event = match event {
                            Ok(event) => event,
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(
                                    client_id = %client_id_writer,
                                    skipped,
                                    "Subscriber lagging, events dropped"
                                );
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        };

                        let is_subscribed = {
                            let clients = clients_writer.read().await;
                            clients.get(&client_id_writer).map(|h| h.subscribed).unwrap_or(false)
                        };

                        if is_subscribed && let Ok(mut msg) = serde_json::to_string(&event) {
                            msg.push('\n');
                            if let Err(e) = writer.write_all(msg.as_bytes()).await {
                                debug!(
                                    client_id = %client_id_writer,
                                    error = %e,
                                    "Event write error"
                                );
                                break;
                            }
                        }
                    }
                }
            }

            let _ = message_tx_writer.send(ServerMessage::ClientDisconnected {
                client_id: client_id_writer.clone(),
            });

            clients_writer.write().await.remove(&client_id_writer);
        });
    }

    /// Send a response to a specific client
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let json = serde_json::to_string(&response)?;

        let clients = self.clients.read().await;
        if let Some(handle) = clients.get(client_id) {
            handle
                .response_tx
                .send(json)
                .map_err(|_| IpcError::ConnectionClosed)?;
        }

        Ok(())
    }

    /// Broadcast an event to all subscribed clients
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    pub async fn get_client_info(&self, client_id: &ClientId) -> Option<ClientInfo> {
        let clients = self.clients.read().await;
        clients.get(client_id).map(|h| h.info.clone())
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Get peer UID from Unix socket
fn get_peer_uid(stream: &UnixStream) -> Option<u32> {
    use std::os::unix::io::AsFd;

    let fd = stream.as_fd();

    match nix::sys::socket::getsockopt(&fd, nix::sys::socket::sockopt::PeerCredentials) {
        Ok(cred) => Some(cred.uid()),
        Err(_) => None,
    }
}
