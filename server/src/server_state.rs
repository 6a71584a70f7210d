use std::collections::HashMap;

use protocol::{ClientId, MemberInfo, SessionId};
use thiserror::Error;

use crate::session::{Client, Session};
use crate::sync::SyncOutcome;

/// Session and client registries. Only the server task touches this, one
/// command at a time.
pub struct ServerState {
    session_id_source: SessionId,
    pub(crate) sessions: HashMap<SessionId, Session>,
    pub(crate) clients: HashMap<ClientId, Client>,
    session_codes: HashMap<String, SessionId>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    #[error("client {0} already belongs to session {1}")]
    AlreadyInSession(ClientId, SessionId),
    #[error("session code {0} is already in use")]
    DuplicateCode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStart {
    /// The join opened a barrier; everyone listed must hear SyncBegin.
    Began { members: Vec<ClientId> },
    /// A barrier was already open and now also waits for the joiner.
    AlreadySyncing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    BadCode,
    Joined {
        session_id: SessionId,
        joiner: MemberInfo,
        existing: Vec<MemberInfo>,
        sync: SyncStart,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    SessionClosed {
        session_id: SessionId,
        notify: Vec<ClientId>,
    },
    MemberLeft {
        session_id: SessionId,
        notify: Vec<ClientId>,
        sync: SyncOutcome,
    },
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            session_id_source: 0,
            sessions: HashMap::new(),
            clients: HashMap::new(),
            session_codes: HashMap::new(),
        }
    }

    pub fn client(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    #[cfg(test)]
    pub fn session(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    pub fn session_of(&self, client_id: ClientId) -> Option<(SessionId, &Session)> {
        let session_id = self.clients.get(&client_id)?.session_id;
        self.sessions.get(&session_id).map(|s| (session_id, s))
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.session_codes.contains_key(code)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn syncing_session_count(&self) -> usize {
        self.sessions.values().filter(|s| s.syncing).count()
    }

    pub fn create_session(
        &mut self,
        client_id: ClientId,
        code: String,
        username: String,
        color: String,
    ) -> Result<SessionId, ServerError> {
        self.ensure_sessionless(client_id)?;
        if self.has_code(&code) {
            return Err(ServerError::DuplicateCode(code));
        }

        let session_id = self.new_session_id();
        self.session_codes.insert(code.clone(), session_id);
        self.sessions
            .insert(session_id, Session::new(code, client_id));
        self.clients
            .insert(client_id, Client::creator(session_id, username, color));
        Ok(session_id)
    }

    pub fn join_session(
        &mut self,
        client_id: ClientId,
        code: &str,
        username: String,
        color: String,
    ) -> Result<JoinOutcome, ServerError> {
        self.ensure_sessionless(client_id)?;
        let session_id = match self.session_codes.get(code) {
            Some(session_id) => *session_id,
            None => return Ok(JoinOutcome::BadCode),
        };
        let session = match self.sessions.get_mut(&session_id) {
            Some(session) => session,
            None => return Ok(JoinOutcome::BadCode),
        };

        let client = Client::joiner(session_id, username, color);
        let joiner = client.member_info(client_id);
        let clients = &self.clients;
        let existing = session
            .member_ids
            .iter()
            .filter_map(|id| clients.get(id).map(|c| c.member_info(*id)))
            .collect();

        session.member_ids.push(client_id);
        let sync = if session.syncing {
            SyncStart::AlreadySyncing
        } else {
            session.syncing = true;
            SyncStart::Began {
                members: session.member_ids.clone(),
            }
        };
        self.clients.insert(client_id, client);

        Ok(JoinOutcome::Joined {
            session_id,
            joiner,
            existing,
            sync,
        })
    }

    /// Drops everything the client owned. A departing creator takes its
    /// session and the other members' client records with it; anyone else
    /// only leaves, and the sync barrier is re-evaluated without them.
    pub fn disconnect(&mut self, client_id: ClientId) -> Option<Departure> {
        let session_id = self.clients.remove(&client_id)?.session_id;
        let is_creator = match self.sessions.get(&session_id) {
            Some(session) => session.creator_id == client_id,
            None => {
                log::warn!(
                    "Client {} referred to missing session {}",
                    client_id,
                    session_id
                );
                return None;
            }
        };

        if is_creator {
            let session = self.sessions.remove(&session_id)?;
            self.session_codes.remove(&session.code);
            let notify: Vec<ClientId> = session.others(client_id).collect();
            for member_id in &notify {
                self.clients.remove(member_id);
            }
            Some(Departure::SessionClosed { session_id, notify })
        } else {
            let session = self.sessions.get_mut(&session_id)?;
            session.member_ids.retain(|id| *id != client_id);
            let notify = session.member_ids.clone();
            let sync = self.check_convergence(session_id);
            Some(Departure::MemberLeft {
                session_id,
                notify,
                sync,
            })
        }
    }

    fn ensure_sessionless(&self, client_id: ClientId) -> Result<(), ServerError> {
        match self.clients.get(&client_id) {
            Some(client) => Err(ServerError::AlreadyInSession(client_id, client.session_id)),
            None => Ok(()),
        }
    }

    fn new_session_id(&mut self) -> SessionId {
        self.session_id_source += 1;
        self.session_id_source
    }
}
