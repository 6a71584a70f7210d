//! Join-triggered convergence barrier.
//!
//! A session enters the barrier when someone joins while it is idle. Each
//! member that still has to import the session state reports `SyncDone`;
//! when the last unsynced member reports, or leaves, the barrier closes and
//! everyone hears `SyncEnd`.

use protocol::{ClientId, SessionId};

use crate::server_state::ServerState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    NoSession,
    NotSyncing,
    AlreadySynced,
    Waiting { pending: usize },
    /// The barrier just closed. Everyone listed must hear SyncEnd.
    Converged { members: Vec<ClientId> },
}

impl ServerState {
    pub fn mark_synced(&mut self, client_id: ClientId) -> SyncOutcome {
        let session_id = match self.clients.get(&client_id) {
            Some(client) => client.session_id,
            None => return SyncOutcome::NoSession,
        };
        match self.sessions.get(&session_id) {
            Some(session) if session.syncing => {}
            Some(_) => return SyncOutcome::NotSyncing,
            None => return SyncOutcome::NoSession,
        }

        match self.clients.get_mut(&client_id) {
            Some(client) if client.synced => return SyncOutcome::AlreadySynced,
            Some(client) => client.synced = true,
            None => return SyncOutcome::NoSession,
        }
        self.check_convergence(session_id)
    }

    /// Must run after anything that changes the member list of a syncing
    /// session, otherwise a departed member can hold the barrier open.
    pub fn check_convergence(&mut self, session_id: SessionId) -> SyncOutcome {
        let session = match self.sessions.get_mut(&session_id) {
            Some(session) => session,
            None => return SyncOutcome::NoSession,
        };
        if !session.syncing {
            return SyncOutcome::NotSyncing;
        }

        let clients = &self.clients;
        let pending = session
            .member_ids
            .iter()
            .filter(|id| !clients.get(*id).map_or(false, |c| c.synced))
            .count();
        if pending > 0 {
            return SyncOutcome::Waiting { pending };
        }

        session.syncing = false;
        SyncOutcome::Converged {
            members: session.member_ids.clone(),
        }
    }

    /// Where a SyncRequest from this client goes: the session creator.
    pub fn sync_source(&self, client_id: ClientId) -> Option<ClientId> {
        self.session_of(client_id).map(|(_, s)| s.creator_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::Departure;

    fn session_with(members: &[ClientId]) -> (ServerState, SessionId) {
        let mut state = ServerState::new();
        let session_id = state
            .create_session(members[0], "ACDEFGHJ".into(), "a".into(), "b".into())
            .expect("");
        for id in &members[1..] {
            state
                .join_session(*id, "ACDEFGHJ", "a".into(), "b".into())
                .expect("");
        }
        (state, session_id)
    }

    fn syncing(state: &ServerState, session_id: SessionId) -> bool {
        state.session(session_id).expect("").syncing
    }

    #[test]
    fn it_converges_when_the_only_joiner_is_done() {
        let (mut state, session_id) = session_with(&[1, 2]);
        assert!(syncing(&state, session_id));

        assert_eq!(
            state.mark_synced(2),
            SyncOutcome::Converged {
                members: vec![1, 2]
            }
        );
        assert!(!syncing(&state, session_id));
    }

    #[test]
    fn it_waits_for_the_last_unsynced_member() {
        let (mut state, session_id) = session_with(&[1, 2, 3, 4]);

        assert_eq!(state.mark_synced(3), SyncOutcome::Waiting { pending: 2 });
        assert!(syncing(&state, session_id));
        assert_eq!(state.mark_synced(2), SyncOutcome::Waiting { pending: 1 });
        assert!(syncing(&state, session_id));
        assert!(matches!(
            state.mark_synced(4),
            SyncOutcome::Converged { .. }
        ));
        assert!(!syncing(&state, session_id));
    }

    #[test]
    fn it_ignores_duplicate_and_out_of_barrier_signals() {
        let (mut state, _) = session_with(&[1, 2, 3]);
        assert_eq!(state.mark_synced(1), SyncOutcome::AlreadySynced);
        assert_eq!(state.mark_synced(2), SyncOutcome::Waiting { pending: 1 });
        assert_eq!(state.mark_synced(2), SyncOutcome::AlreadySynced);
        assert!(matches!(state.mark_synced(3), SyncOutcome::Converged { .. }));
        assert_eq!(state.mark_synced(3), SyncOutcome::NotSyncing);
        assert_eq!(state.mark_synced(42), SyncOutcome::NoSession);
    }

    #[test]
    fn it_reopens_for_the_next_join() {
        let (mut state, session_id) = session_with(&[1, 2]);
        state.mark_synced(2);
        state
            .join_session(3, "ACDEFGHJ", "c".into(), "d".into())
            .expect("");
        assert!(syncing(&state, session_id));
        assert!(matches!(state.mark_synced(3), SyncOutcome::Converged { .. }));
    }

    #[test]
    fn it_releases_the_barrier_when_the_last_unsynced_member_leaves() {
        let (mut state, session_id) = session_with(&[1, 2, 3]);
        state.mark_synced(2);

        match state.disconnect(3) {
            Some(Departure::MemberLeft { sync, .. }) => assert_eq!(
                sync,
                SyncOutcome::Converged {
                    members: vec![1, 2]
                }
            ),
            other => panic!("unexpected departure {:?}", other),
        }
        assert!(!syncing(&state, session_id));
    }

    #[test]
    fn it_keeps_waiting_when_a_synced_member_leaves() {
        let (mut state, session_id) = session_with(&[1, 2, 3]);
        state.mark_synced(2);

        match state.disconnect(2) {
            Some(Departure::MemberLeft { sync, .. }) => {
                assert_eq!(sync, SyncOutcome::Waiting { pending: 1 })
            }
            other => panic!("unexpected departure {:?}", other),
        }
        assert!(syncing(&state, session_id));
    }

    #[test]
    fn it_points_sync_requests_at_the_creator() {
        let (state, _) = session_with(&[5, 6, 7]);
        assert_eq!(state.sync_source(7), Some(5));
        assert_eq!(state.sync_source(5), Some(5));
        assert_eq!(state.sync_source(8), None);
    }
}
