//! Error types for the portal client

use thiserror::Error;

/// Errors surfaced by one login call against the portal.
///
/// Discovery failures are recovered locally (the state machine falls back
/// to default identifiers); everything else fails the call. No variant is
/// allowed to escape the polling loop.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Challenge endpoint unreachable, non-200, or missing fields.
    /// Fatal for the current call, never retried.
    #[error("challenge fetch failed: {0}")]
    ChallengeFetch(String),

    /// Portal root page unreachable or unparseable. Recoverable: the
    /// caller proceeds on fallback defaults.
    #[error("portal discovery failed: {0}")]
    PortalDiscovery(String),

    /// Network or HTTP failure submitting the login request.
    #[error("login submit failed: {0}")]
    Submit(String),

    /// Response body was not a `callback(...)` envelope around valid JSON.
    #[error("malformed JSONP response: {0}")]
    Jsonp(String),

    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
}

/// Errors from the payload cipher. These indicate a protocol or
/// implementation mismatch and should never occur in normal operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    /// Ciphertext is not a whole number of words, or its trailing length
    /// word disagrees with the word count.
    #[error("malformed ciphertext")]
    MalformedCiphertext,
}
