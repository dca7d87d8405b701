//! SRUN protocol implementation
//!
//! Challenge fetch, payload assembly (cipher -> portal base64 -> tag ->
//! checksum) and the bounded-retry login state machine that interprets
//! the portal's ambiguous response codes.

use crate::b64;
use crate::checksum;
use crate::cipher;
use crate::config::Config;
use crate::error::PortalError;
use crate::http::{self, HttpClient};
use crate::models::{
    ChallengeResponse, ChallengeToken, Credentials, LoginInfo, LoginOutcome, LoginRequest,
    LoginResponse, PortalParams, SuccessReason,
};
use crate::parser;
use crate::portal::PortalBackend;
use async_trait::async_trait;

/// Tag announcing the srun_bx1 payload encoding to the server.
const INFO_PREFIX: &str = "{SRBX1}";
/// Tag announcing the HMAC-MD5 password hash.
const PASSWORD_PREFIX: &str = "{MD5}";
/// Placeholder sent with challenge requests; the server answers with the
/// address it actually sees.
const CHALLENGE_IP: &str = "0.0.0.0";
const OS_NAME: &str = "Windows 10";
const DEVICE_NAME: &str = "PC";
/// Attempt bound per login call. Exceeding it fails without further
/// network traffic.
const MAX_ATTEMPTS: u32 = 3;

/// Production backend speaking to a live portal over HTTPS.
pub struct HttpBackend {
    client: HttpClient,
    portal_base: String,
    test_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: HttpClient::new(cfg.http.timeout(), cfg.http.connect_timeout())?,
            portal_base: cfg.portal_base.trim_end_matches('/').to_string(),
            test_url: cfg.test_url.clone(),
        })
    }
}

#[async_trait]
impl PortalBackend for HttpBackend {
    async fn discover(&self) -> Result<PortalParams, PortalError> {
        let html = self
            .client
            .get_text(&format!("{}/", self.portal_base))
            .await
            .map_err(|e| PortalError::PortalDiscovery(e.to_string()))?;
        Ok(parser::parse_portal_params(&html))
    }

    async fn fetch_challenge(&self, username: &str) -> Result<ChallengeToken, PortalError> {
        let url = format!("{}/cgi-bin/get_challenge", self.portal_base);
        let params = [
            ("username", username.to_string()),
            ("ip", CHALLENGE_IP.to_string()),
            ("_", http::unix_millis().to_string()),
        ];
        let value = self
            .client
            .get_jsonp(&url, &params)
            .await
            .map_err(|e| PortalError::ChallengeFetch(format!("{e:#}")))?;
        let resp: ChallengeResponse =
            serde_json::from_value(value).map_err(|e| PortalError::ChallengeFetch(e.to_string()))?;

        match (resp.client_ip, resp.challenge) {
            (Some(client_ip), Some(challenge)) => Ok(ChallengeToken {
                client_ip,
                challenge,
            }),
            _ => Err(PortalError::ChallengeFetch(
                "client_ip or challenge missing from response".to_string(),
            )),
        }
    }

    async fn submit(&self, request: &LoginRequest) -> Result<LoginResponse, PortalError> {
        let url = format!("{}/cgi-bin/srun_portal", self.portal_base);
        let params = [
            ("action", "login".to_string()),
            ("username", request.username.clone()),
            (
                "password",
                format!("{PASSWORD_PREFIX}{}", request.hashed_password),
            ),
            ("ac_id", request.ac_id.clone()),
            ("ip", request.ip.clone()),
            ("info", request.info.clone()),
            ("n", "200".to_string()),
            ("type", "1".to_string()),
            ("os", OS_NAME.to_string()),
            ("name", DEVICE_NAME.to_string()),
            ("double_stack", String::new()),
            ("chksum", request.chksum.clone()),
            ("_", http::unix_millis().to_string()),
        ];
        let value = self
            .client
            .get_jsonp(&url, &params)
            .await
            .map_err(|e| PortalError::Submit(format!("{e:#}")))?;
        serde_json::from_value(value).map_err(|e| PortalError::Submit(e.to_string()))
    }

    async fn probe(&self) -> bool {
        self.client.probe(&self.test_url).await
    }
}

/// Login state machine.
///
/// One call runs discovery, challenge fetch, payload construction,
/// submission and response interpretation, looping from discovery when
/// the server answers ambiguously and the probe says the network is still
/// down. Bounded at [`MAX_ATTEMPTS`] attempts; never recursive. Calls are
/// expected to be serialized by the caller.
pub struct SrunPortal<B> {
    backend: B,
    credentials: Credentials,
    fallback_ip: String,
}

impl<B: PortalBackend> SrunPortal<B> {
    pub fn new(backend: B, credentials: Credentials, fallback_ip: String) -> Self {
        Self {
            backend,
            credentials,
            fallback_ip,
        }
    }

    /// Whether the network currently reaches the configured test URL.
    pub async fn online(&self) -> bool {
        self.backend.probe().await
    }

    /// Run one logical login call.
    ///
    /// Challenge-fetch and submit failures abort the call; ambiguous
    /// server codes are verified with a probe and retried from discovery
    /// while attempts remain.
    pub async fn login(&self) -> Result<LoginOutcome, PortalError> {
        for attempt in 1..=MAX_ATTEMPTS {
            tracing::info!("login attempt {attempt}/{MAX_ATTEMPTS}");
            match self.attempt().await? {
                Interpretation::Success(reason) => {
                    return Ok(LoginOutcome::Success { reason });
                }
                Interpretation::Failed(message) => {
                    return Ok(LoginOutcome::Failed { message });
                }
                Interpretation::Ambiguous(code) => {
                    tracing::warn!("server answered '{code}', probing connectivity");
                    if self.backend.probe().await {
                        tracing::info!("probe succeeded, treating '{code}' as a false negative");
                        return Ok(LoginOutcome::Success {
                            reason: SuccessReason::VerifiedOnline,
                        });
                    }
                    tracing::warn!("probe failed, restarting from discovery");
                }
            }
        }

        Ok(LoginOutcome::Failed {
            message: format!("retry limit reached after {MAX_ATTEMPTS} attempts"),
        })
    }

    async fn attempt(&self) -> Result<Interpretation, PortalError> {
        // Discovery failures are non-fatal: the portal may refuse its root
        // page while still accepting logins on the fallback identifiers.
        let params = match self.backend.discover().await {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("param discovery failed ({e}), using fallback defaults");
                PortalParams {
                    ip: None,
                    ac_id: parser::FALLBACK_AC_ID.to_string(),
                }
            }
        };

        let mut ip = params.ip.unwrap_or_else(|| self.fallback_ip.clone());

        // Fetch the token immediately before building the request; tokens
        // expire server-side and are never reused across attempts.
        let token = self
            .backend
            .fetch_challenge(&self.credentials.username)
            .await?;
        if !token.client_ip.is_empty() && token.client_ip != ip {
            tracing::info!("portal reports client ip {} (was {ip})", token.client_ip);
            ip = token.client_ip.clone();
        }

        let request = self.build_request(&token, &ip, &params.ac_id);
        let response = self.backend.submit(&request).await?;
        Ok(interpret(&response))
    }

    /// Assemble the submission: info JSON -> cipher (keyed by the
    /// challenge) -> portal base64 -> `{SRBX1}` tag, then the HMAC-MD5
    /// password hash and the checksum over both.
    fn build_request(&self, token: &ChallengeToken, ip: &str, ac_id: &str) -> LoginRequest {
        let info_json = LoginInfo::new(&self.credentials, ip, ac_id).to_json();
        let info = format!(
            "{INFO_PREFIX}{}",
            b64::encode(&cipher::encode(
                info_json.as_bytes(),
                token.challenge.as_bytes()
            ))
        );
        let hashed_password =
            checksum::hashed_password(&self.credentials.password, &token.challenge);
        let chksum = checksum::build(
            &token.challenge,
            &self.credentials.username,
            &hashed_password,
            ac_id,
            ip,
            &info,
        );

        LoginRequest {
            username: self.credentials.username.clone(),
            hashed_password,
            ac_id: ac_id.to_string(),
            ip: ip.to_string(),
            info,
            chksum,
        }
    }
}

enum Interpretation {
    Success(SuccessReason),
    Ambiguous(String),
    Failed(String),
}

/// Interpretation rules, in protocol order. Only the two documented
/// ambiguous codes trigger verification; unrecognized codes fail with the
/// server's message.
fn interpret(response: &LoginResponse) -> Interpretation {
    if response.ecode_is_zero() {
        match response.suc_msg.as_deref() {
            Some("login_ok") => return Interpretation::Success(SuccessReason::LoginOk),
            Some("ip_already_online_error") => {
                return Interpretation::Success(SuccessReason::AlreadyOnline)
            }
            _ => {}
        }
        if let Some(code) = response.error.as_deref() {
            if code == "challenge_expire_error" || code == "sign_error" {
                return Interpretation::Ambiguous(code.to_string());
            }
        }
    }

    Interpretation::Failed(
        response
            .error_msg
            .clone()
            .unwrap_or_else(|| "login rejected by portal".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBackend {
        params: PortalParams,
        response: LoginResponse,
        reachable: bool,
        discoveries: AtomicUsize,
        challenges: AtomicUsize,
        submits: AtomicUsize,
        probes: AtomicUsize,
    }

    impl MockBackend {
        fn new(response: serde_json::Value, reachable: bool) -> Self {
            Self {
                params: PortalParams {
                    ip: Some("10.0.0.9".to_string()),
                    ac_id: "76".to_string(),
                },
                response: serde_json::from_value(response).unwrap(),
                reachable,
                discoveries: AtomicUsize::new(0),
                challenges: AtomicUsize::new(0),
                submits: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PortalBackend for MockBackend {
        async fn discover(&self) -> Result<PortalParams, PortalError> {
            self.discoveries.fetch_add(1, Ordering::SeqCst);
            Ok(self.params.clone())
        }

        async fn fetch_challenge(&self, _username: &str) -> Result<ChallengeToken, PortalError> {
            self.challenges.fetch_add(1, Ordering::SeqCst);
            Ok(ChallengeToken {
                client_ip: "10.0.0.9".to_string(),
                challenge: "feedbeef".to_string(),
            })
        }

        async fn submit(&self, _request: &LoginRequest) -> Result<LoginResponse, PortalError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn probe(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    fn portal(backend: MockBackend) -> SrunPortal<MockBackend> {
        SrunPortal::new(
            backend,
            Credentials {
                username: "student01".to_string(),
                password: "hunter2".to_string(),
            },
            "10.34.0.142".to_string(),
        )
    }

    #[tokio::test]
    async fn login_ok_succeeds() {
        let portal = portal(MockBackend::new(
            json!({"ecode": 0, "suc_msg": "login_ok"}),
            false,
        ));
        assert_eq!(
            portal.login().await.unwrap(),
            LoginOutcome::Success {
                reason: SuccessReason::LoginOk
            }
        );
        assert_eq!(portal.backend.submits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_online_is_success() {
        let portal = portal(MockBackend::new(
            json!({"ecode": 0, "suc_msg": "ip_already_online_error"}),
            false,
        ));
        assert_eq!(
            portal.login().await.unwrap(),
            LoginOutcome::Success {
                reason: SuccessReason::AlreadyOnline
            }
        );
    }

    #[tokio::test]
    async fn ambiguous_code_with_reachable_probe_succeeds() {
        let portal = portal(MockBackend::new(
            json!({"ecode": 0, "error": "challenge_expire_error"}),
            true,
        ));
        assert_eq!(
            portal.login().await.unwrap(),
            LoginOutcome::Success {
                reason: SuccessReason::VerifiedOnline
            }
        );
        assert_eq!(portal.backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(portal.backend.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ambiguous_code_unreachable_retries_then_fails() {
        let portal = portal(MockBackend::new(
            json!({"ecode": 0, "error": "sign_error"}),
            false,
        ));
        let outcome = portal.login().await.unwrap();
        assert!(matches!(outcome, LoginOutcome::Failed { .. }));
        // Three full attempts, each re-discovering and re-fetching a
        // fresh token, then failure with no further traffic.
        assert_eq!(portal.backend.discoveries.load(Ordering::SeqCst), 3);
        assert_eq!(portal.backend.challenges.load(Ordering::SeqCst), 3);
        assert_eq!(portal.backend.submits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejection_fails_immediately_without_retry() {
        let portal = portal(MockBackend::new(
            json!({"ecode": 1, "error_msg": "bad password"}),
            true,
        ));
        assert_eq!(
            portal.login().await.unwrap(),
            LoginOutcome::Failed {
                message: "bad password".to_string()
            }
        );
        assert_eq!(portal.backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(portal.backend.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejection_without_message_gets_generic_one() {
        let portal = portal(MockBackend::new(json!({"ecode": "E2620"}), true));
        assert_eq!(
            portal.login().await.unwrap(),
            LoginOutcome::Failed {
                message: "login rejected by portal".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unlisted_ambiguous_code_is_a_plain_failure() {
        // Conservative: only the two documented codes trigger the probe.
        let portal = portal(MockBackend::new(
            json!({"ecode": 0, "error": "speed_limit_error", "error_msg": "rate limited"}),
            true,
        ));
        assert_eq!(
            portal.login().await.unwrap(),
            LoginOutcome::Failed {
                message: "rate limited".to_string()
            }
        );
        assert_eq!(portal.backend.probes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn request_assembly_matches_reference_pipeline() {
        let portal = portal(MockBackend::new(json!({}), false));
        let token = ChallengeToken {
            client_ip: "10.34.7.21".to_string(),
            challenge: "8c2e826672ab9a4b54fe1a51b2a5a9bf7f9f9d95a5a3fda9c5c9dfb8b8e6e0e5"
                .to_string(),
        };

        let request = portal.build_request(&token, "10.34.7.21", "76");

        assert_eq!(
            request.info,
            "{SRBX1}Acx/Xe+/pIoNzs5FwloPPiM5Ok69k4ZdLGCyxSvXQQvagEKzGy/kAFsN6M31pBw4\
             xPB8O3ja610dRqHUbXJXnD0vGbOhpVtwNS7m5Fc9THOoRTQ/SjiiTs59BpnSv4QLJNfPHL=="
        );
        assert_eq!(
            request.hashed_password,
            "26d31ea4fae1b27fcaac31dfafc9d6e6"
        );
        assert_eq!(request.chksum, "308de020ba7c049ac01b588900c8bf73e9b309bb");
    }
}
