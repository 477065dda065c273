//! `odyssey-bot`: Sonic Odyssey reward automation.
//!
//! Provides:
//! - **Wallet**: Solana keypairs from base58 secret keys or BIP-39 phrases
//! - **Client**: Async HTTP client for the Odyssey reward API
//! - **Rewards**: Daily stage claims, mystery box opening, daily check-in
//! - **Runner**: Sequential per-account orchestration over a credential file
//! - **Transfer**: Fan-out SOL transfers to a batch of destination addresses
//! - **Submit**: Partial signing and bounded-retry transaction submission

pub mod chain;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod proxy;
pub mod retry;
pub mod rewards;
pub mod runner;
pub mod submit;
pub mod transfer;
pub mod wallet;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use chain::{ChainAdapter, ChainFactory, RpcChainAdapter, RpcChainFactory};
pub use client::{RewardApi, RewardApiClient, SessionToken};
pub use config::OdysseyConfig;
pub use credentials::{load_credentials, Credential, CredentialKind};
pub use error::{ApiError, ApiErrorKind, OdysseyError, OdysseyResult};
pub use proxy::{format_proxy_url, ProxyDescriptor, ProxyPool};
pub use retry::RetryPolicy;
pub use runner::{run_batch, HttpApiFactory, RunMode, RunSettings};
pub use submit::TransactionSubmitter;
pub use wallet::Wallet;
