//! Chain client adapter.
//!
//! Everything that touches the Solana RPC goes through [`ChainAdapter`], so
//! the reward and transfer workflows can run against a stub in tests.

use crate::error::{OdysseyError, OdysseyResult};
use crate::proxy::ProxyDescriptor;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::RpcClientConfig;
use solana_rpc_client::http_sender::HttpSender;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Operations the bot needs from a Solana RPC node.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Send a fully signed transaction and wait for confirmation.
    async fn submit_transaction(&self, tx: &Transaction) -> OdysseyResult<Signature>;

    async fn latest_blockhash(&self) -> OdysseyResult<Hash>;

    /// Minimum lamports for an account with `data_len` bytes to stay rent exempt.
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> OdysseyResult<u64>;
}

/// [`ChainAdapter`] backed by the nonblocking Solana `RpcClient`.
pub struct RpcChainAdapter {
    rpc: RpcClient,
}

impl RpcChainAdapter {
    /// Connect to `rpc_url` with `confirmed` commitment.
    pub fn new(rpc_url: &str) -> Self {
        let rpc = RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        Self { rpc }
    }

    /// Connect to `rpc_url` through `proxy`, with `confirmed` commitment.
    pub fn with_proxy(
        rpc_url: &str,
        proxy: &ProxyDescriptor,
        scheme: &str,
        timeout: Duration,
    ) -> OdysseyResult<Self> {
        let proxy_url = proxy.to_url(scheme);
        let http = reqwest::Client::builder()
            .proxy(
                reqwest::Proxy::all(&proxy_url)
                    .map_err(|e| OdysseyError::Config(format!("invalid proxy {}: {e}", proxy.endpoint())))?,
            )
            .timeout(timeout)
            .pool_idle_timeout(timeout)
            .build()?;
        let sender = HttpSender::new_with_client(rpc_url, http);
        let rpc = RpcClient::new_sender(
            sender,
            RpcClientConfig::with_commitment(CommitmentConfig::confirmed()),
        );
        Ok(Self { rpc })
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }
}

#[async_trait]
impl ChainAdapter for RpcChainAdapter {
    async fn submit_transaction(&self, tx: &Transaction) -> OdysseyResult<Signature> {
        debug!(url = %self.rpc.url(), "Sending transaction");
        let signature = self.rpc.send_and_confirm_transaction(tx).await?;
        debug!(%signature, "Transaction confirmed");
        Ok(signature)
    }

    async fn latest_blockhash(&self) -> OdysseyResult<Hash> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> OdysseyResult<u64> {
        Ok(self.rpc.get_minimum_balance_for_rent_exemption(data_len).await?)
    }
}

/// Builds a chain adapter for one source wallet.
pub trait ChainFactory: Send + Sync {
    fn connect(&self, proxy: Option<&ProxyDescriptor>) -> OdysseyResult<Arc<dyn ChainAdapter>>;
}

/// [`ChainFactory`] producing RPC adapters, proxied when a proxy is given.
pub struct RpcChainFactory {
    rpc_url: String,
    proxy_scheme: String,
    timeout: Duration,
}

impl RpcChainFactory {
    pub fn new(rpc_url: impl Into<String>, proxy_scheme: impl Into<String>, timeout: Duration) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            proxy_scheme: proxy_scheme.into(),
            timeout,
        }
    }
}

impl ChainFactory for RpcChainFactory {
    fn connect(&self, proxy: Option<&ProxyDescriptor>) -> OdysseyResult<Arc<dyn ChainAdapter>> {
        let adapter = match proxy {
            Some(p) => RpcChainAdapter::with_proxy(&self.rpc_url, p, &self.proxy_scheme, self.timeout)?,
            None => RpcChainAdapter::new(&self.rpc_url),
        };
        Ok(Arc::new(adapter))
    }
}

/// Decode a base64, bincode-serialized transaction as issued by the reward API.
pub fn decode_transaction(encoded: &str) -> OdysseyResult<Transaction> {
    let bytes = B64.decode(encoded.trim())?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Inverse of [`decode_transaction`].
pub fn encode_transaction(tx: &Transaction) -> OdysseyResult<String> {
    Ok(B64.encode(bincode::serialize(tx)?))
}
