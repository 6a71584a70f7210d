use serde::Serialize;
use tokio::sync::oneshot::Sender;

#[derive(Debug)]
pub enum AdminCommand {
    GetStatus { tx: Sender<ServerStatus> },
}

/// Read-only snapshot served by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub connections: usize,
    pub sessions: usize,
    pub syncing_sessions: usize,
    pub clients: usize,
    pub uptime_secs: u64,
    pub hostname: Option<String>,
    pub pid: u32,
    pub version: &'static str,
}

pub fn hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}
