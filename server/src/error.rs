use protocol::{ClientId, DecodeError, SessionId};
use thiserror::Error;

use crate::config::CloseCodes;
use crate::server_state::ServerError;
use crate::session_code::SessionCodeError;

/// FatalError makes connection be closed. There is no error envelope; the
/// close code is the only thing the client learns.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("sent a binary frame of {0} bytes")]
    BinaryFrame(usize),
    #[error("sent an empty frame")]
    EmptyPayload,
    #[error("sent a malformed envelope: {0}")]
    Malformed(serde_json::Error),
    #[error("sent an envelope without an integer message type")]
    MissingType,
    #[error("failed the version check")]
    Handshake,
    #[error("runs unsupported version {0:?}")]
    OutdatedClient(String),
    #[error("relayed to {0:?}, which is not a member of its session")]
    ForeignTarget(Option<ClientId>),
    #[error("relayed file {0:?} with a disallowed extension")]
    DisallowedFile(Option<String>),
    #[error("relayed without being in a session")]
    NotInSession,
    #[error("already belongs to session {0}")]
    AlreadyInSession(SessionId),
    #[error("could not be given a session code: {0}")]
    SessionCode(#[from] SessionCodeError),
    #[error("was handed session code {0} which is already in use")]
    DuplicateCode(String),
}

impl FatalError {
    pub fn close_code(&self, codes: &CloseCodes) -> u16 {
        match self {
            FatalError::BinaryFrame(_) => codes.bad_frame_type,
            FatalError::EmptyPayload => codes.empty_payload,
            FatalError::Malformed(_) => codes.malformed,
            FatalError::MissingType => codes.missing_type,
            FatalError::Handshake | FatalError::OutdatedClient(_) => codes.handshake,
            FatalError::ForeignTarget(_)
            | FatalError::DisallowedFile(_)
            | FatalError::NotInSession
            | FatalError::AlreadyInSession(_) => codes.unauthorized,
            FatalError::SessionCode(_) | FatalError::DuplicateCode(_) => codes.internal,
        }
    }
}

impl From<DecodeError> for FatalError {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::Malformed(e) => FatalError::Malformed(e),
            DecodeError::MissingType => FatalError::MissingType,
        }
    }
}

impl From<ServerError> for FatalError {
    fn from(error: ServerError) -> Self {
        match error {
            ServerError::AlreadyInSession(_, session_id) => FatalError::AlreadyInSession(session_id),
            ServerError::DuplicateCode(code) => FatalError::DuplicateCode(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_maps_each_class_to_its_close_code() {
        let codes = CloseCodes::default();
        assert_eq!(FatalError::BinaryFrame(4).close_code(&codes), 1003);
        assert_eq!(FatalError::EmptyPayload.close_code(&codes), 1002);
        assert_eq!(FatalError::MissingType.close_code(&codes), 1003);
        assert_eq!(FatalError::Handshake.close_code(&codes), 3003);
        assert_eq!(
            FatalError::OutdatedClient("v2.0.0".into()).close_code(&codes),
            3003
        );
        assert_eq!(FatalError::ForeignTarget(Some(3)).close_code(&codes), 1000);
        assert_eq!(
            FatalError::from(SessionCodeError::Exhausted(1)).close_code(&codes),
            1011
        );
    }

    #[test]
    fn it_follows_configured_codes() {
        let codes = CloseCodes {
            unauthorized: 4001,
            ..CloseCodes::default()
        };
        assert_eq!(FatalError::DisallowedFile(None).close_code(&codes), 4001);
    }

    #[test]
    fn it_splits_decode_errors() {
        let malformed = protocol::decode("{").expect_err("");
        assert!(matches!(FatalError::from(malformed), FatalError::Malformed(_)));
        let missing = protocol::decode("{}").expect_err("");
        assert!(matches!(FatalError::from(missing), FatalError::MissingType));
    }
}
