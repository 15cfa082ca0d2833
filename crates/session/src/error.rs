//! Error taxonomy of the session core.
//!
//! Only identity-fetch failures and expired credentials tear the session
//! down. Unknown role switches and denied permissions are plain `false`
//! results and never appear here.

use thiserror::Error;

use crate::credentials::StoreError;

/// Failure to obtain an identity document (or a token) from the identity service.
#[derive(Debug, Error)]
pub enum IdentityFetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("identity service rejected the credential")]
    Unauthorized,
    #[error("identity service error ({0}): {1}")]
    Status(u16, String),
    #[error("malformed identity document: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for IdentityFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("credential has expired")]
    ExpiredCredential,
    #[error("identity fetch failed: {0}")]
    IdentityFetch(#[from] IdentityFetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of an authorized outbound request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no active session")]
    NotAuthenticated,
    /// The backend answered 401; the session has been torn down.
    #[error("credential rejected by backend; session ended")]
    Unauthorized,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
