use protocol::{ClientId, MemberInfo, SessionId};

pub struct Session {
    pub code: String,
    /// Creator and sync source. Losing it closes the session.
    pub creator_id: ClientId,
    /// Join order, creator first.
    pub member_ids: Vec<ClientId>,
    /// A join-triggered sync barrier is outstanding.
    pub syncing: bool,
}

impl Session {
    pub fn new(code: String, creator_id: ClientId) -> Self {
        Self {
            code,
            creator_id,
            member_ids: vec![creator_id],
            syncing: false,
        }
    }

    pub fn is_member(&self, client_id: ClientId) -> bool {
        self.member_ids.contains(&client_id)
    }

    pub fn others(&self, client_id: ClientId) -> impl Iterator<Item = ClientId> + '_ {
        self.member_ids
            .iter()
            .copied()
            .filter(move |id| *id != client_id)
    }
}

pub struct Client {
    pub session_id: SessionId,
    pub synced: bool,
    pub username: String,
    pub color: String,
}

impl Client {
    /// The creator holds the canonical state and has nothing to import.
    pub fn creator(session_id: SessionId, username: String, color: String) -> Self {
        Self {
            session_id,
            synced: true,
            username,
            color,
        }
    }

    pub fn joiner(session_id: SessionId, username: String, color: String) -> Self {
        Self {
            session_id,
            synced: false,
            username,
            color,
        }
    }

    pub fn member_info(&self, client_id: ClientId) -> MemberInfo {
        MemberInfo {
            client_id,
            username: self.username.clone(),
            color: self.color.clone(),
        }
    }
}
