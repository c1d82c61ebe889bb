//! Remote verification strategy.
//!
//! `GET <base-url>/<host>` against a verification service that answers
//! `{"code": <int>}`; `code == 1` means safe. Requests are anonymous: the
//! client keeps no cookie store and sends no credentials.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::{Host, RemoteConfig};
use crate::error::{DispatchError, GateConfigError};
use crate::ports::VerificationDispatcher;

/// The service's answer for a safe host.
const SAFE_CODE: i64 = 1;

#[derive(Debug, Deserialize)]
struct ServiceReply {
    code: i64,
}

/// Verification dispatcher backed by the remote service.
pub struct RemoteVerifier {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteVerifier {
    /// Build a verifier. The base URL always ends in `/`.
    pub fn new(config: &RemoteConfig) -> Result<Self, GateConfigError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(5)))
            .user_agent(concat!("bleed-guard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GateConfigError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: e.to_string(),
            })?;

        let mut base_url = config.base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout,
        })
    }

    /// URL queried for `host`.
    pub fn endpoint(&self, host: &Host) -> String {
        format!("{}{}", self.base_url, host)
    }
}

#[async_trait]
impl VerificationDispatcher for RemoteVerifier {
    async fn verify(&self, host: &Host) -> Result<bool, DispatchError> {
        let url = self.endpoint(host);
        debug!(%url, "querying verification service");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(self.timeout)
            } else {
                DispatchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::VerificationService {
                status: status.as_u16(),
            });
        }

        let reply: ServiceReply = response.json().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(self.timeout)
            } else if e.is_decode() {
                DispatchError::MalformedResponse(e.to_string())
            } else {
                DispatchError::Transport(e.to_string())
            }
        })?;

        debug!(code = reply.code, "verification service replied");
        Ok(reply.code == SAFE_CODE)
    }

    fn strategy(&self) -> &'static str {
        "remote"
    }
}
