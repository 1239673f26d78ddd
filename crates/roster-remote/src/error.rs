use thiserror::Error;

/// Failure of a single remote directory call.
///
/// The `Display` output is the free-text message batch classification works on,
/// so it keeps the remote body verbatim.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// The remote reported the user is already a project member (HTTP 409).
    #[error("Member already exists")]
    AlreadyMember,

    /// Any other non-success status; `body` is the raw response text.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid project: {0}")]
    InvalidProject(String),

    #[error("client setup failed: {0}")]
    Client(String),
}

impl RemoteError {
    /// True when the request could not be completed at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else if e.is_builder() {
            RemoteError::Client(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_body_verbatim() {
        let err = RemoteError::Api {
            status: 400,
            body: r#"{"message":{"access_level":["is not included in the list"]}}"#.into(),
        };
        assert_eq!(
            err.to_string(),
            r#"API error 400: {"message":{"access_level":["is not included in the list"]}}"#
        );
        assert!(!err.is_transport());
    }

    #[test]
    fn conflict_reads_as_already_member() {
        assert_eq!(RemoteError::AlreadyMember.to_string(), "Member already exists");
    }

    #[test]
    fn transport_is_distinguishable() {
        assert!(RemoteError::Transport("connection refused".into()).is_transport());
    }
}
