//! Data models for the SRUN login flow

use serde::{Deserialize, Serialize};

/// Encoding version tag the portal expects inside the info blob.
pub const ENC_VERSION: &str = "srun_bx1";

/// Account credentials, supplied once at startup and immutable for the
/// process lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Challenge issued by the portal. Server-side time-limited; fetched
/// fresh immediately before a submission and used at most once.
#[derive(Debug, Clone)]
pub struct ChallengeToken {
    pub client_ip: String,
    pub challenge: String,
}

/// Identifiers scraped from the portal's login page. A missing IP is left
/// to the caller's fallback; a missing ac_id is substituted during
/// parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalParams {
    pub ip: Option<String>,
    pub ac_id: String,
}

/// JSON blob carried (encrypted) in the login request's `info` field.
/// Field order matches the reference client.
#[derive(Debug, Serialize)]
pub struct LoginInfo<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub ip: &'a str,
    pub acid: &'a str,
    pub enc_ver: &'static str,
}

impl<'a> LoginInfo<'a> {
    pub fn new(credentials: &'a Credentials, ip: &'a str, ac_id: &'a str) -> Self {
        Self {
            username: &credentials.username,
            password: &credentials.password,
            ip,
            acid: ac_id,
            enc_ver: ENC_VERSION,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("string-only struct serializes")
    }
}

/// Fully assembled login submission.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    /// Hex HMAC-MD5 digest, without the `{MD5}` tag.
    pub hashed_password: String,
    pub ac_id: String,
    pub ip: String,
    /// `{SRBX1}`-tagged encrypted payload.
    pub info: String,
    pub chksum: String,
}

/// JSON body of the challenge endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeResponse {
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub challenge: Option<String>,
}

/// JSON body of the login endpoint response. `ecode` arrives as the
/// number 0 on success paths but as a string code on some rejections, so
/// it is kept as a raw value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub ecode: serde_json::Value,
    #[serde(default)]
    pub suc_msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

impl LoginResponse {
    pub fn ecode_is_zero(&self) -> bool {
        self.ecode.as_i64() == Some(0)
    }
}

/// Final result of a login call. Ambiguous server codes are resolved
/// internally (probe, then bounded retry); callers only ever see success
/// or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success { reason: SuccessReason },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessReason {
    /// Server acknowledged the login.
    LoginOk,
    /// Server reported the address as already authenticated.
    AlreadyOnline,
    /// Server answered ambiguously but the reachability probe succeeded.
    VerifiedOnline,
}
