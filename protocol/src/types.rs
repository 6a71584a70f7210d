/// Assigned once per accepted socket and never reused while the process runs.
pub type ConnectionId = u64;
/// A client is identified by the connection it talks through.
pub type ClientId = ConnectionId;
pub type SessionId = u64;

/// What other members are told about someone in their session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub client_id: ClientId,
    pub username: String,
    pub color: String,
}
