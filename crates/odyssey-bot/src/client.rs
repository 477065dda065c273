//! Async HTTP client for the Sonic Odyssey reward API.

use crate::config::ApiConfig;
use crate::error::{ApiError, OdysseyError, OdysseyResult};
use crate::proxy::ProxyDescriptor;
use crate::wallet::Wallet;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::Signature;
use std::time::Duration;
use tracing::debug;

const ODYSSEY_ORIGIN: &str = "https://odyssey.sonic.game";
const ODYSSEY_REFERER: &str = "https://odyssey.sonic.game/";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Bearer token returned by `authorize`. Scoped to one account's run.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Body of `/auth/sonic/authorize`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRequest {
    pub address: String,
    /// Base64 of the raw public key bytes.
    pub address_encoded: String,
    /// Base64 detached signature over the challenge message.
    pub signature: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizeData {
    token: String,
}

/// Reward profile from `/user/rewards/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Native balance in lamports.
    #[serde(default)]
    pub wallet_balance: u64,
    /// Ring token balance.
    #[serde(default)]
    pub ring: u64,
    /// Mystery boxes available to open.
    #[serde(default)]
    pub ring_monitor: u64,
}

#[derive(Debug, Deserialize)]
struct ClaimData {
    #[serde(default)]
    claimed: bool,
}

#[derive(Debug, Deserialize)]
struct TxHashData {
    hash: String,
}

#[derive(Debug, Serialize)]
struct SignatureBody {
    hash: String,
}

/// Result of confirming a daily check-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    #[serde(default)]
    pub accumulative_days: u32,
}

/// Result of opening one mystery box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxOpened {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub amount: u64,
}

/// Standard `{code, message, data}` response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// The reward program's REST operations.
#[async_trait]
pub trait RewardApi: Send + Sync {
    /// Message the wallet must sign to log in.
    async fn challenge(&self, wallet: &str) -> OdysseyResult<String>;

    async fn authorize(&self, request: &AuthorizeRequest) -> OdysseyResult<SessionToken>;

    async fn profile(&self, token: &SessionToken) -> OdysseyResult<Profile>;

    /// Claim one daily reward stage. Returns the server's `claimed` flag.
    async fn claim_stage(&self, token: &SessionToken, stage: u8) -> OdysseyResult<bool>;

    /// Unsigned check-in transaction, base64.
    async fn check_in_build_tx(&self, token: &SessionToken) -> OdysseyResult<String>;

    async fn check_in_confirm(&self, token: &SessionToken, signature: &Signature) -> OdysseyResult<CheckIn>;

    /// Unsigned box-opening transaction, base64.
    async fn open_box_build_tx(&self, token: &SessionToken) -> OdysseyResult<String>;

    async fn open_box_confirm(&self, token: &SessionToken, signature: &Signature) -> OdysseyResult<BoxOpened>;
}

/// Challenge, sign, authorize.
pub async fn login(api: &dyn RewardApi, wallet: &Wallet) -> OdysseyResult<SessionToken> {
    let message = api.challenge(wallet.address()).await?;
    let request = AuthorizeRequest {
        address: wallet.address().to_string(),
        address_encoded: wallet.public_key_base64(),
        signature: wallet.sign_base64(message.as_bytes()),
    };
    api.authorize(&request).await
}

/// [`RewardApi`] over HTTP.
pub struct RewardApiClient {
    http: reqwest::Client,
    base_url: String,
    claim_base_url: String,
}

impl RewardApiClient {
    /// Build a client, routed through `proxy` when given.
    pub fn new(
        config: &ApiConfig,
        timeout: Duration,
        proxy: Option<&ProxyDescriptor>,
    ) -> OdysseyResult<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers())
            .timeout(timeout);
        if let Some(p) = proxy {
            let proxy = reqwest::Proxy::all(p.to_url(&config.proxy_scheme))
                .map_err(|e| OdysseyError::Config(format!("invalid proxy {}: {e}", p.endpoint())))?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            claim_base_url: config.claim_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn claim_base_url(&self) -> &str {
        &self.claim_base_url
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> OdysseyResult<T> {
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        decode_envelope(status, &body)
    }

    fn get(&self, url: &str, token: &SessionToken) -> reqwest::RequestBuilder {
        self.http.get(url).header(AUTHORIZATION, token.as_str())
    }

    fn post(&self, url: &str, token: &SessionToken) -> reqwest::RequestBuilder {
        self.http.post(url).header(AUTHORIZATION, token.as_str())
    }
}

#[async_trait]
impl RewardApi for RewardApiClient {
    async fn challenge(&self, wallet: &str) -> OdysseyResult<String> {
        let url = format!("{}/auth/sonic/challenge", self.base_url);
        debug!(url = %url, wallet, "Requesting login challenge");
        self.send(self.http.get(&url).query(&[("wallet", wallet)])).await
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> OdysseyResult<SessionToken> {
        let url = format!("{}/auth/sonic/authorize", self.base_url);
        debug!(url = %url, address = %request.address, "Authorizing");
        let data: AuthorizeData = self.send(self.http.post(&url).json(request)).await?;
        Ok(SessionToken::new(data.token))
    }

    async fn profile(&self, token: &SessionToken) -> OdysseyResult<Profile> {
        let url = format!("{}/user/rewards/info", self.base_url);
        debug!(url = %url, "Fetching reward profile");
        self.send(self.get(&url, token)).await
    }

    async fn claim_stage(&self, token: &SessionToken, stage: u8) -> OdysseyResult<bool> {
        let url = format!("{}/user/transactions/rewards/claim", self.claim_base_url);
        debug!(url = %url, stage, "Claiming daily stage");
        let data: ClaimData = self
            .send(self.post(&url, token).json(&serde_json::json!({ "stage": stage })))
            .await?;
        Ok(data.claimed)
    }

    async fn check_in_build_tx(&self, token: &SessionToken) -> OdysseyResult<String> {
        let url = format!("{}/user/check-in/transaction", self.base_url);
        debug!(url = %url, "Building check-in transaction");
        let data: TxHashData = self.send(self.get(&url, token)).await?;
        Ok(data.hash)
    }

    async fn check_in_confirm(&self, token: &SessionToken, signature: &Signature) -> OdysseyResult<CheckIn> {
        let url = format!("{}/user/check-in", self.base_url);
        debug!(url = %url, %signature, "Confirming check-in");
        let body = SignatureBody {
            hash: signature.to_string(),
        };
        self.send(self.post(&url, token).json(&body)).await
    }

    async fn open_box_build_tx(&self, token: &SessionToken) -> OdysseyResult<String> {
        let url = format!("{}/user/rewards/mystery-box/build-tx", self.base_url);
        debug!(url = %url, "Building mystery box transaction");
        let data: TxHashData = self.send(self.get(&url, token)).await?;
        Ok(data.hash)
    }

    async fn open_box_confirm(&self, token: &SessionToken, signature: &Signature) -> OdysseyResult<BoxOpened> {
        let url = format!("{}/user/rewards/mystery-box/open", self.base_url);
        debug!(url = %url, %signature, "Opening mystery box");
        let body = SignatureBody {
            hash: signature.to_string(),
        };
        self.send(self.post(&url, token).json(&body)).await
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static(ODYSSEY_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_static(ODYSSEY_REFERER));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers
}

/// Decode a response body into its `data` payload, or a typed [`ApiError`].
///
/// A non-2xx status or a missing `data` field is an error carrying the
/// envelope's `code` and `message`.
fn decode_envelope<T: DeserializeOwned>(status: u16, body: &str) -> OdysseyResult<T> {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            return Err(OdysseyError::Api(ApiError::new(status, 0, snippet)));
        }
    };
    if !(200..300).contains(&status) || envelope.data.is_null() {
        return Err(OdysseyError::Api(ApiError::new(
            status,
            envelope.code,
            envelope.message,
        )));
    }
    Ok(serde_json::from_value(envelope.data)?)
}
