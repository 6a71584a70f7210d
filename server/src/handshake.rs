use protocol::CLIENT_GREETING;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Accepted,
    /// Greeting was right but the version is not on the allow-list. The
    /// client is told so before it is closed.
    Outdated { version: String },
    Rejected,
}

pub fn check_client_version(
    config: &Config,
    greeting: Option<&str>,
    version: Option<&str>,
) -> HandshakeOutcome {
    match (greeting, version) {
        (Some(CLIENT_GREETING), Some(version)) if config.is_supported_version(version) => {
            HandshakeOutcome::Accepted
        }
        (Some(CLIENT_GREETING), Some(version)) => HandshakeOutcome::Outdated {
            version: version.to_owned(),
        },
        _ => HandshakeOutcome::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_accepts_listed_versions() {
        let config = Config::default();
        assert_eq!(
            check_client_version(&config, Some(CLIENT_GREETING), Some("v3.0.0")),
            HandshakeOutcome::Accepted
        );
        assert_eq!(
            check_client_version(&config, Some(CLIENT_GREETING), Some("v3.0.0 DEV")),
            HandshakeOutcome::Accepted
        );
    }

    #[test]
    fn it_flags_unlisted_versions_as_outdated() {
        let config = Config::default();
        assert_eq!(
            check_client_version(&config, Some(CLIENT_GREETING), Some("v2.1.0")),
            HandshakeOutcome::Outdated {
                version: "v2.1.0".into()
            }
        );
    }

    #[test]
    fn it_rejects_wrong_or_missing_greeting() {
        let config = Config::default();
        assert_eq!(
            check_client_version(&config, Some("Hello"), Some("v3.0.0")),
            HandshakeOutcome::Rejected
        );
        assert_eq!(
            check_client_version(&config, Some(CLIENT_GREETING), None),
            HandshakeOutcome::Rejected
        );
        assert_eq!(
            check_client_version(&config, None, None),
            HandshakeOutcome::Rejected
        );
    }
}
