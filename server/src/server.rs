use std::time::Instant;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use protocol::{
    id_to_wire, ClientId, ClientMessage, ConnectionId, Envelope, RelayKind, ServerMessage,
};

use crate::admin::{self, AdminCommand, ServerStatus};
use crate::config::Config;
use crate::connection::{ConnectionCommand, Frame};
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::error::FatalError;
use crate::handshake::{check_client_version, HandshakeOutcome};
use crate::server_state::{Departure, JoinOutcome, ServerState, SyncStart};
use crate::session_code::SessionCodeGenerator;
use crate::sync::SyncOutcome;

pub type ServerTx = UnboundedSender<ServerCommand>;

#[derive(Debug)]
pub enum ServerCommand {
    Connection(ConnectionCommand),
    Admin(AdminCommand),
}

/// Owns every registry. Commands are handled strictly one after another, so
/// each inbound frame and all of its fan-out complete before the next.
pub struct Server {
    config: Config,
    server_state: ServerState,
    connections: ConnectionTxStorage,
    session_codes: SessionCodeGenerator,
    started_at: Instant,
    hostname: Option<String>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let session_codes = SessionCodeGenerator::new(config.max_code_attempts);
        Self {
            config,
            server_state: ServerState::new(),
            connections: ConnectionTxStorage::new(),
            session_codes,
            started_at: Instant::now(),
            hostname: admin::hostname(),
        }
    }

    pub fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connection(command) => self.handle_connection_command(command),
            ServerCommand::Admin(AdminCommand::GetStatus { tx }) => {
                if tx.send(self.status()).is_err() {
                    log::debug!("Status requester went away");
                }
            }
        }
    }

    pub fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { connection_id, tx } => {
                self.connections.insert(connection_id, tx);
                log::debug!("Connection {} registered", connection_id);
            }
            ConnectionCommand::Disconnect { from } => {
                log::info!("Client {} disconnected", from);
                self.depart(from);
                self.connections.remove(&from);
            }
            ConnectionCommand::Frame { from, frame } => {
                if !self.connections.is_open(&from) {
                    log::debug!("Ignoring frame from closing connection {}", from);
                    return;
                }
                if let Err(fatal_error) = self.handle_frame(from, frame) {
                    log::warn!("Client {} {}, closing its connection", from, fatal_error);
                    self.connections
                        .close(&from, fatal_error.close_code(&self.config.close_codes));
                }
            }
        }
    }

    pub fn status(&self) -> ServerStatus {
        ServerStatus {
            connections: self.connections.len(),
            sessions: self.server_state.session_count(),
            syncing_sessions: self.server_state.syncing_session_count(),
            clients: self.server_state.client_count(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            hostname: self.hostname.clone(),
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    fn handle_frame(&mut self, from: ConnectionId, frame: Frame) -> Result<(), FatalError> {
        let text = match frame {
            Frame::Binary(size) => return Err(FatalError::BinaryFrame(size)),
            Frame::Text(text) if text.is_empty() => return Err(FatalError::EmptyPayload),
            Frame::Text(text) => text,
        };
        let envelope = protocol::decode(&text)?;
        log::debug!("Ingress from {}: type {}", from, envelope.message_type);
        self.handle_client_message(from, ClientMessage::from(envelope))
    }

    fn handle_client_message(
        &mut self,
        from: ClientId,
        message: ClientMessage,
    ) -> Result<(), FatalError> {
        match message {
            ClientMessage::InitConnection { greeting, version } => {
                self.check_version(from, greeting, version)
            }
            ClientMessage::CreateSession { username, color } => {
                self.create_session(from, username, color)
            }
            ClientMessage::JoinSession {
                code,
                username,
                color,
            } => self.join_session(from, code, username, color),
            ClientMessage::LeaveSession => {
                // Disconnecting is what actually removes a member.
                log::info!("Client {} left their session", from);
                Ok(())
            }
            ClientMessage::SyncRequest => {
                self.forward_sync_request(from);
                Ok(())
            }
            ClientMessage::SyncDone => {
                self.sync_done(from);
                Ok(())
            }
            ClientMessage::Relay {
                kind,
                target,
                file_name,
                payload,
            } => self.relay(from, kind, target, file_name, payload),
            ClientMessage::Broadcast(envelope) => {
                self.broadcast_others(from, envelope);
                Ok(())
            }
            ClientMessage::ClientTimestamp(mut envelope) => {
                envelope.int_data.insert(0, id_to_wire(from));
                self.broadcast_others(from, envelope);
                Ok(())
            }
            ClientMessage::Unknown(message_type) => {
                log::info!(
                    "Client {} sent unsupported message type {}",
                    from,
                    message_type
                );
                Ok(())
            }
        }
    }

    fn check_version(
        &mut self,
        from: ClientId,
        greeting: Option<String>,
        version: Option<String>,
    ) -> Result<(), FatalError> {
        match check_client_version(&self.config, greeting.as_deref(), version.as_deref()) {
            HandshakeOutcome::Accepted => {
                log::info!("Client {} passed the version check", from);
                self.send(from, ServerMessage::Welcome);
                Ok(())
            }
            HandshakeOutcome::Outdated { version } => {
                self.send(from, ServerMessage::OutdatedClient);
                Err(FatalError::OutdatedClient(version))
            }
            HandshakeOutcome::Rejected => Err(FatalError::Handshake),
        }
    }

    fn create_session(
        &mut self,
        from: ClientId,
        username: String,
        color: String,
    ) -> Result<(), FatalError> {
        if let Some(client) = self.server_state.client(from) {
            return Err(FatalError::AlreadyInSession(client.session_id));
        }

        let server_state = &self.server_state;
        let code = self
            .session_codes
            .generate(|code| server_state.has_code(code))?;
        let session_id = self
            .server_state
            .create_session(from, code.clone(), username, color)?;

        if let Some(client) = self.server_state.client(from) {
            log::info!(
                "Client {} created session {} with code '{}' as '{}' ({})",
                from,
                session_id,
                code,
                client.username,
                client.color
            );
        }
        self.send(from, ServerMessage::SessionCreated { code });
        Ok(())
    }

    fn join_session(
        &mut self,
        from: ClientId,
        code: String,
        username: String,
        color: String,
    ) -> Result<(), FatalError> {
        match self.server_state.join_session(from, &code, username, color)? {
            JoinOutcome::BadCode => {
                log::info!("Client {} sent invalid session code '{}'", from, code);
                self.send(from, ServerMessage::BadSessionCode);
            }
            JoinOutcome::Joined {
                session_id,
                joiner,
                existing,
                sync,
            } => {
                log::info!(
                    "Client {} joined session {} as '{}' ({})",
                    from,
                    session_id,
                    joiner.username,
                    joiner.color
                );
                self.send(from, ServerMessage::GoodSessionCode);
                for member in existing {
                    self.send(member.client_id, ServerMessage::MemberJoined(joiner.clone()));
                    self.send(from, ServerMessage::MemberJoined(member));
                }
                match sync {
                    SyncStart::Began { members } => {
                        log::info!("Session {} started syncing", session_id);
                        self.send_all(&members, ServerMessage::SyncBegin);
                    }
                    SyncStart::AlreadySyncing => self.send(from, ServerMessage::SyncBegin),
                }
            }
        }
        Ok(())
    }

    fn forward_sync_request(&self, from: ClientId) {
        match self.server_state.sync_source(from) {
            Some(creator_id) if creator_id != from => {
                self.send(creator_id, ServerMessage::SyncRequest { requester: from })
            }
            Some(_) => log::debug!("Client {} requested a sync from itself", from),
            None => log::debug!("Client {} requested a sync outside any session", from),
        }
    }

    fn sync_done(&mut self, from: ClientId) {
        match self.server_state.mark_synced(from) {
            SyncOutcome::Converged { members } => {
                log::info!("Client {} synced last, ending the sync barrier", from);
                self.send_all(&members, ServerMessage::SyncEnd);
            }
            SyncOutcome::Waiting { pending } => {
                log::debug!("Client {} synced, {} still pending", from, pending)
            }
            outcome => log::debug!("Ignoring sync done from client {}: {:?}", from, outcome),
        }
    }

    fn relay(
        &self,
        from: ClientId,
        kind: RelayKind,
        target: Option<ClientId>,
        file_name: Option<String>,
        payload: Envelope,
    ) -> Result<(), FatalError> {
        let (_, session) = self
            .server_state
            .session_of(from)
            .ok_or(FatalError::NotInSession)?;
        let target = match target {
            Some(target) if session.is_member(target) => target,
            _ => return Err(FatalError::ForeignTarget(target)),
        };
        if kind == RelayKind::File
            && !file_name
                .as_deref()
                .map_or(false, |name| self.config.is_allowed_file(name))
        {
            return Err(FatalError::DisallowedFile(file_name));
        }

        log::debug!("Relaying {:?} from {} to {}", kind, from, target);
        self.connections.send(&target, payload);
        Ok(())
    }

    fn broadcast_others(&self, from: ClientId, envelope: Envelope) {
        match self.server_state.session_of(from) {
            Some((_, session)) => {
                for member_id in session.others(from) {
                    self.connections.send(&member_id, envelope.clone());
                }
            }
            None => log::debug!(
                "Client {} sent type {} outside any session",
                from,
                envelope.message_type
            ),
        }
    }

    fn depart(&mut self, from: ClientId) {
        match self.server_state.disconnect(from) {
            Some(Departure::SessionClosed { session_id, notify }) => {
                log::info!(
                    "Session {} closed because its creator {} left",
                    session_id,
                    from
                );
                self.send_all(&notify, ServerMessage::SessionClosed);
            }
            Some(Departure::MemberLeft {
                session_id,
                notify,
                sync,
            }) => {
                log::info!("Client {} left session {}", from, session_id);
                self.send_all(&notify, ServerMessage::MemberLeft { client_id: from });
                if let SyncOutcome::Converged { members } = sync {
                    log::info!("Session {} finished syncing after client {} left", session_id, from);
                    self.send_all(&members, ServerMessage::SyncEnd);
                }
            }
            None => (),
        }
    }

    fn send(&self, to: ClientId, message: ServerMessage) {
        self.connections.send(&to, message.into());
    }

    fn send_all(&self, to: &[ClientId], message: ServerMessage) {
        for client_id in to {
            self.send(*client_id, message.clone());
        }
    }
}

pub fn spawn_server(config: Config) -> ServerTx {
    let (srv_tx, mut srv_rx) = unbounded_channel::<ServerCommand>();

    tokio::spawn(async move {
        let mut server = Box::new(Server::new(config));

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("Server task stopped");
    });

    srv_tx
}
