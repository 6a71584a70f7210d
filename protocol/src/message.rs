use crate::envelope::Envelope;
use crate::message_type::MessageType;
use crate::types::{ClientId, MemberInfo};

/// Greeting a client must open `InitConnection` with.
pub const CLIENT_GREETING: &str = "Hello MercuryMultiMapperServer!";
/// Greeting the server answers an accepted `InitConnection` with.
pub const SERVER_GREETING: &str = "Hello MercuryMapper Client!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    File,
    ChartData,
}

/// Inbound messages, decoded from the generic envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    InitConnection {
        greeting: Option<String>,
        version: Option<String>,
    },
    CreateSession {
        username: String,
        color: String,
    },
    JoinSession {
        code: String,
        username: String,
        color: String,
    },
    LeaveSession,
    SyncRequest,
    SyncDone,
    /// Point-to-point transfer. `payload` already has the routing integers
    /// removed and is what the target receives.
    Relay {
        kind: RelayKind,
        target: Option<ClientId>,
        file_name: Option<String>,
        payload: Envelope,
    },
    /// Metadata change or realtime edit, forwarded untouched.
    Broadcast(Envelope),
    ClientTimestamp(Envelope),
    Unknown(i64),
}

impl From<Envelope> for ClientMessage {
    fn from(envelope: Envelope) -> Self {
        let message_type = match MessageType::from_code(envelope.message_type) {
            Some(message_type) => message_type,
            None => return ClientMessage::Unknown(envelope.message_type),
        };

        match message_type {
            MessageType::InitConnection => {
                let mut strings = envelope.string_data.into_iter();
                ClientMessage::InitConnection {
                    greeting: strings.next(),
                    version: strings.next(),
                }
            }
            MessageType::CreateSession => {
                let mut strings = envelope.string_data.into_iter();
                ClientMessage::CreateSession {
                    username: strings.next().unwrap_or_default(),
                    color: strings.next().unwrap_or_default(),
                }
            }
            MessageType::JoinSession => {
                let mut strings = envelope.string_data.into_iter();
                ClientMessage::JoinSession {
                    code: strings.next().unwrap_or_default(),
                    username: strings.next().unwrap_or_default(),
                    color: strings.next().unwrap_or_default(),
                }
            }
            MessageType::LeaveSession => ClientMessage::LeaveSession,
            MessageType::SyncRequest => ClientMessage::SyncRequest,
            MessageType::SyncDone => ClientMessage::SyncDone,
            MessageType::File | MessageType::ChartData => {
                let kind = if message_type == MessageType::File {
                    RelayKind::File
                } else {
                    RelayKind::ChartData
                };
                let target = envelope
                    .int_data
                    .first()
                    .and_then(|id| ClientId::try_from(*id).ok());
                let file_name = envelope.string_data.first().cloned();
                let payload = Envelope {
                    int_data: Vec::new(),
                    ..envelope
                };
                ClientMessage::Relay {
                    kind,
                    target,
                    file_name,
                    payload,
                }
            }
            MessageType::ClientTimestamp => ClientMessage::ClientTimestamp(envelope),
            t if t.is_metadata() || t.is_realtime_edit() => ClientMessage::Broadcast(envelope),
            // Server-to-client types have no meaning when a client sends them.
            _ => ClientMessage::Unknown(envelope.message_type),
        }
    }
}

/// Outbound messages produced by the server itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Welcome,
    OutdatedClient,
    SessionCreated { code: String },
    SessionClosed,
    MemberJoined(MemberInfo),
    MemberLeft { client_id: ClientId },
    BadSessionCode,
    GoodSessionCode,
    SyncRequest { requester: ClientId },
    SyncBegin,
    SyncEnd,
}

impl From<ServerMessage> for Envelope {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::Welcome => Envelope::new(MessageType::InitConnection.code())
                .with_strings(vec![SERVER_GREETING]),
            ServerMessage::OutdatedClient => Envelope::new(MessageType::OutdatedClient.code()),
            ServerMessage::SessionCreated { code } => {
                Envelope::new(MessageType::SessionCreated.code()).with_strings(vec![code])
            }
            ServerMessage::SessionClosed => Envelope::new(MessageType::SessionClosed.code()),
            ServerMessage::MemberJoined(member) => Envelope::new(MessageType::JoinSession.code())
                .with_strings(vec![member.username, member.color])
                .with_ints(vec![id_to_wire(member.client_id)]),
            ServerMessage::MemberLeft { client_id } => {
                Envelope::new(MessageType::LeaveSession.code()).with_ints(vec![id_to_wire(client_id)])
            }
            ServerMessage::BadSessionCode => Envelope::new(MessageType::BadSessionCode.code()),
            ServerMessage::GoodSessionCode => Envelope::new(MessageType::GoodSessionCode.code()),
            ServerMessage::SyncRequest { requester } => {
                Envelope::new(MessageType::SyncRequest.code()).with_ints(vec![id_to_wire(requester)])
            }
            ServerMessage::SyncBegin => Envelope::new(MessageType::SyncBegin.code()),
            ServerMessage::SyncEnd => Envelope::new(MessageType::SyncEnd.code()),
        }
    }
}

/// Client ids travel in the signed integer sequence.
pub fn id_to_wire(id: ClientId) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}
