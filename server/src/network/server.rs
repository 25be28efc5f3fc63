//! UDP arena server.
//!
//! One client address owns at most one running session. Each session runs
//! in its own task (`run_session`) and writes straight to the socket; this
//! loop only routes incoming packets and reaps finished or idle clients.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use arena_shared::{ClientMessage, InputState, ServerMessage, SessionEndPayload, PROTOCOL_VERSION};

use crate::config::ServerConfig;
use crate::session::{run_session, Session, SessionInput, SnapshotSink};
use crate::world::ZoneManager;

/// Largest datagram we accept
const MAX_PACKET_SIZE: usize = 65_507;

/// Inputs buffered per session before new ones are dropped
const INPUT_QUEUE: usize = 64;

/// How often idle clients and finished sessions are checked
const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(500);

/// Sends session output to one client address
#[derive(Debug, Clone)]
pub struct UdpSink {
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
}

impl UdpSink {
    pub fn new(socket: Arc<UdpSocket>, addr: SocketAddr) -> Self {
        Self { socket, addr }
    }
}

impl SnapshotSink for UdpSink {
    fn send(&self, msg: &ServerMessage) {
        let data = match msg.serialize() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize message for {}: {}", self.addr, e);
                return;
            }
        };
        if let Err(e) = self.socket.try_send_to(&data, self.addr) {
            // Lossy by nature; the next snapshot supersedes this one
            debug!("Failed to send to {}: {}", self.addr, e);
        }
    }
}

/// A client with a session
#[derive(Debug)]
pub struct ClientConnection {
    pub session_id: u64,
    pub last_seen: Instant,
    input_tx: mpsc::Sender<SessionInput>,
    task: JoinHandle<SessionEndPayload>,
}

impl ClientConnection {
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn forward(&self, input: SessionInput) {
        match self.input_tx.try_send(input) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Session {} input queue full, dropping", self.session_id),
            // Session already over; the client gets its end payload
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Arena server
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: HashMap<SocketAddr, ClientConnection>,
    /// Sessions whose client left; kept so shutdown can wait for them
    detached: Vec<JoinHandle<SessionEndPayload>>,
    zones: Arc<ZoneManager>,
    config: Arc<ServerConfig>,
    next_session_id: u64,
}

impl Server {
    /// Listen on the configured port on all interfaces
    pub async fn new(config: ServerConfig, zones: ZoneManager) -> Result<Self, std::io::Error> {
        let addr = format!("0.0.0.0:{}", config.port);
        Self::bind(&addr, config, zones).await
    }

    pub async fn bind(addr: &str, config: ServerConfig, zones: ZoneManager) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening on {}", socket.local_addr()?);

        Ok(Self {
            socket: Arc::new(socket),
            clients: HashMap::new(),
            detached: Vec::new(),
            zones: Arc::new(zones),
            config: Arc::new(config),
            next_session_id: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.socket.local_addr()
    }

    pub fn session_count(&self) -> usize {
        self.clients.values().filter(|c| !c.is_finished()).count()
    }

    /// Serve until `shutdown` completes, then end every session
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        let socket = self.socket.clone();
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut maintenance = tokio::time::interval(MAINTENANCE_INTERVAL);

        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, addr)) => self.handle_packet(&buf[..len], addr),
                    Err(e) => error!("Error receiving packet: {}", e),
                },
                _ = maintenance.tick() => {
                    self.check_timeouts();
                    self.reap_finished();
                }
                _ = &mut shutdown => break,
            }
        }

        self.shutdown().await;
    }

    /// Handle a received packet
    fn handle_packet(&mut self, data: &[u8], addr: SocketAddr) {
        let message = match ClientMessage::deserialize(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to deserialize packet from {}: {}", addr, e);
                return;
            }
        };

        if let Some(client) = self.clients.get_mut(&addr) {
            client.last_seen = Instant::now();
        }

        match message {
            ClientMessage::StartSession {
                protocol_version,
                zone_id,
                seed,
            } => self.handle_start_session(addr, protocol_version, zone_id, seed),
            ClientMessage::Input(input) => self.handle_input(addr, input),
            ClientMessage::Flee => {
                if let Some(client) = self.clients.get(&addr) {
                    info!("Session {} fled by {}", client.session_id, addr);
                    client.forward(SessionInput::Flee);
                }
            }
            ClientMessage::Disconnect => self.handle_disconnect(addr),
        }
    }

    fn handle_start_session(&mut self, addr: SocketAddr, protocol_version: u32, zone_id: u32, seed: Option<u64>) {
        if protocol_version != PROTOCOL_VERSION {
            warn!(
                "Rejecting {}: protocol {} (server speaks {})",
                addr, protocol_version, PROTOCOL_VERSION
            );
            self.reject(addr, format!("protocol mismatch: server is {}", PROTOCOL_VERSION));
            return;
        }

        if self.clients.get(&addr).is_some_and(|c| !c.is_finished()) {
            self.reject(addr, "session already running".to_string());
            return;
        }

        let Some(zone) = self.zones.get_zone(zone_id) else {
            warn!("Rejecting {}: unknown zone {}", addr, zone_id);
            self.reject(addr, format!("unknown zone {}", zone_id));
            return;
        };

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        // Arena generation happens on the session task, off the receive loop
        let zone = zone.clone();
        let config = Arc::clone(&self.config);
        let sink = UdpSink::new(self.socket.clone(), addr);
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE);
        let task = tokio::spawn(async move {
            let session = Session::new(session_id, &zone, seed, &config);
            sink.send(&session.start_message());
            run_session(session, input_rx, sink, config.tick_duration()).await
        });

        info!("Client {} started session {} in zone {}", addr, session_id, zone_id);
        self.clients.insert(
            addr,
            ClientConnection {
                session_id,
                last_seen: Instant::now(),
                input_tx,
                task,
            },
        );
    }

    fn handle_input(&mut self, addr: SocketAddr, input: InputState) {
        match self.clients.get(&addr) {
            Some(client) => client.forward(SessionInput::Input(input)),
            None => debug!("Input from {} without a session", addr),
        }
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        if let Some(client) = self.clients.remove(&addr) {
            info!("Client {} disconnected (session {})", addr, client.session_id);
            client.forward(SessionInput::Flee);
            self.detached.push(client.task);
        }
    }

    fn reject(&self, addr: SocketAddr, reason: String) {
        UdpSink::new(self.socket.clone(), addr).send(&ServerMessage::SessionRejected { reason });
    }

    /// Drop clients that stopped sending. Closing their input channel makes
    /// the session flee.
    fn check_timeouts(&mut self) {
        let timeout = self.config.client_timeout();
        let timed_out: Vec<SocketAddr> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_timed_out(timeout))
            .map(|(addr, _)| *addr)
            .collect();

        for addr in timed_out {
            if let Some(client) = self.clients.remove(&addr) {
                warn!("Client {} timed out (session {})", addr, client.session_id);
                self.detached.push(client.task);
            }
        }
    }

    fn reap_finished(&mut self) {
        self.clients.retain(|addr, c| {
            if c.is_finished() {
                debug!("Session {} for {} finished", c.session_id, addr);
                false
            } else {
                true
            }
        });
        self.detached.retain(|task| !task.is_finished());
    }

    async fn shutdown(&mut self) {
        info!("Shutting down, ending {} sessions", self.session_count());

        let mut tasks: Vec<JoinHandle<SessionEndPayload>> = Vec::new();
        for (_, client) in self.clients.drain() {
            client.forward(SessionInput::Flee);
            tasks.push(client.task);
        }
        tasks.append(&mut self.detached);

        for result in join_all(tasks).await {
            match result {
                Ok(payload) => debug!("Session ended: {:?}", payload.result),
                Err(e) => error!("Session task failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::SessionResult;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    async fn start_server(config: ServerConfig) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
        let mut server = Server::bind("127.0.0.1:0", config, ZoneManager::with_defaults())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .await;
        });
        (addr, stop_tx, handle)
    }

    async fn send(client: &UdpSocket, server: SocketAddr, msg: &ClientMessage) {
        client.send_to(&msg.serialize().unwrap(), server).await.unwrap();
    }

    async fn recv(client: &UdpSocket) -> ServerMessage {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
            .await
            .expect("no reply from server")
            .unwrap();
        ServerMessage::deserialize(&buf[..len]).unwrap()
    }

    fn start(zone_id: u32, protocol_version: u32) -> ClientMessage {
        ClientMessage::StartSession {
            protocol_version,
            zone_id,
            seed: Some(42),
        }
    }

    #[tokio::test]
    async fn test_session_start_and_flee() {
        let (server, stop, handle) = start_server(ServerConfig::default()).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        send(&client, server, &start(1, PROTOCOL_VERSION)).await;
        match recv(&client).await {
            ServerMessage::SessionStarted { zone_id, .. } => assert_eq!(zone_id, 1),
            other => panic!("unexpected {:?}", other),
        }

        // A second start while running is refused
        send(&client, server, &start(1, PROTOCOL_VERSION)).await;
        send(&client, server, &ClientMessage::Flee).await;

        let mut rejected = false;
        loop {
            match recv(&client).await {
                ServerMessage::SessionRejected { reason } => {
                    assert!(reason.contains("already running"));
                    rejected = true;
                }
                ServerMessage::SessionEnded(end) => {
                    assert_eq!(end.result, SessionResult::Fled);
                    break;
                }
                _ => {}
            }
        }
        assert!(rejected);

        stop.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_starts_each_get_an_arena() {
        let (server, stop, handle) = start_server(ServerConfig::default()).await;
        let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let second = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let third = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        send(&first, server, &start(2, PROTOCOL_VERSION)).await;
        send(&second, server, &start(1, PROTOCOL_VERSION)).await;
        send(&third, server, &start(999, PROTOCOL_VERSION)).await;

        assert!(matches!(
            recv(&third).await,
            ServerMessage::SessionRejected { reason } if reason.contains("unknown zone")
        ));
        let mut session_ids = Vec::new();
        for (client, expected_zone) in [(&first, 2), (&second, 1)] {
            match recv(client).await {
                ServerMessage::SessionStarted { session_id, zone_id, .. } => {
                    assert_eq!(zone_id, expected_zone);
                    session_ids.push(session_id);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_ne!(session_ids[0], session_ids[1]);

        stop.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_bad_protocol_and_zone() {
        let (server, stop, handle) = start_server(ServerConfig::default()).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        send(&client, server, &start(1, PROTOCOL_VERSION + 1)).await;
        assert!(matches!(
            recv(&client).await,
            ServerMessage::SessionRejected { reason } if reason.contains("protocol")
        ));

        send(&client, server, &start(999, PROTOCOL_VERSION)).await;
        assert!(matches!(
            recv(&client).await,
            ServerMessage::SessionRejected { reason } if reason.contains("unknown zone")
        ));

        stop.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_ends_running_sessions() {
        let (server, stop, handle) = start_server(ServerConfig::default()).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        send(&client, server, &start(2, PROTOCOL_VERSION)).await;
        assert!(matches!(recv(&client).await, ServerMessage::SessionStarted { .. }));

        stop.send(()).unwrap();
        handle.await.unwrap();

        loop {
            if let ServerMessage::SessionEnded(end) = recv(&client).await {
                assert_eq!(end.result, SessionResult::Fled);
                break;
            }
        }
    }
}
