#![allow(dead_code)]

use protocol::{ConnectionId, Envelope, MessageType};
use server::config::Config;
use server::connection::{ConnectionCommand, ConnectionEvent, Frame};
use server::server::Server;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

pub struct TestClient {
    pub id: ConnectionId,
    rx: UnboundedReceiver<ConnectionEvent>,
}

impl TestClient {
    /// Everything delivered since the last call.
    pub fn drain(&mut self) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn drain_envelopes(&mut self) -> Vec<Envelope> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                ConnectionEvent::Message(envelope) => Some(envelope),
                ConnectionEvent::Close { .. } => None,
            })
            .collect()
    }

    pub fn drain_types(&mut self) -> Vec<i64> {
        self.drain_envelopes()
            .into_iter()
            .map(|e| e.message_type)
            .collect()
    }
}

pub struct Harness {
    pub server: Server,
    next_id: ConnectionId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            server: Server::new(config),
            next_id: 1,
        }
    }

    pub fn connect(&mut self) -> TestClient {
        let (tx, rx) = unbounded_channel();
        let id = self.next_id;
        self.next_id += 1;
        self.server
            .handle_connection_command(ConnectionCommand::Connect {
                connection_id: id,
                tx,
            });
        TestClient { id, rx }
    }

    pub fn disconnect(&mut self, client: &TestClient) {
        self.server
            .handle_connection_command(ConnectionCommand::Disconnect { from: client.id });
    }

    pub fn send_frame(&mut self, client: &TestClient, frame: Frame) {
        self.server
            .handle_connection_command(ConnectionCommand::Frame {
                from: client.id,
                frame,
            });
    }

    pub fn send_text(&mut self, client: &TestClient, text: &str) {
        self.send_frame(client, Frame::Text(text.to_owned()));
    }

    pub fn send(&mut self, client: &TestClient, envelope: Envelope) {
        let text = protocol::encode(&envelope).expect("");
        self.send_text(client, &text);
    }

    /// Creates a session and returns its join code.
    pub fn create_session(&mut self, client: &mut TestClient, username: &str) -> String {
        self.send(
            client,
            Envelope::new(MessageType::CreateSession.code()).with_strings(vec![username, "#ffffff"]),
        );
        let reply = client.drain_envelopes();
        assert_eq!(reply.len(), 1, "{:?}", reply);
        assert_eq!(reply[0].message_type, MessageType::SessionCreated.code());
        reply[0].string_data[0].clone()
    }

    pub fn join_session(&mut self, client: &TestClient, code: &str, username: &str) {
        self.send(
            client,
            Envelope::new(MessageType::JoinSession.code()).with_strings(vec![code, username, "#000000"]),
        );
    }

    pub fn sync_done(&mut self, client: &TestClient) {
        self.send(client, Envelope::new(MessageType::SyncDone.code()));
    }
}

pub fn close_code(events: &[ConnectionEvent]) -> Option<u16> {
    events.iter().find_map(|event| match event {
        ConnectionEvent::Close { code } => Some(*code),
        ConnectionEvent::Message(_) => None,
    })
}
