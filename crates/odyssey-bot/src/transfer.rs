//! Fan-out transfers: send a fixed amount from each source wallet to every
//! address in a destination batch.
//!
//! Randomly generated destinations are fresh public keys whose secret half
//! is discarded on the spot. Nothing sent there can be recovered.

use crate::chain::{ChainAdapter, ChainFactory};
use crate::error::{OdysseyError, OdysseyResult};
use crate::proxy::{ProxyDescriptor, ProxyPool};
use crate::retry::RetryPolicy;
use crate::submit::TransactionSubmitter;
use crate::wallet::Wallet;
use solana_sdk::native_token::{lamports_to_sol, sol_to_lamports};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Minimum transfer used when the rent-exemption lookup fails, in SOL.
pub const FALLBACK_MIN_SOL: f64 = 0.001;

/// `count` fresh addresses with no retained secret key.
pub fn generate_random_addresses(count: usize) -> Vec<Pubkey> {
    (0..count).map(|_| Keypair::new().pubkey()).collect()
}

/// Read a JSON array of base58 addresses.
pub fn load_destinations(path: &Path) -> OdysseyResult<Vec<Pubkey>> {
    let data = std::fs::read_to_string(path)?;
    let raw: Vec<String> = serde_json::from_str(&data)?;
    if raw.is_empty() {
        return Err(OdysseyError::InvalidInput(format!(
            "{} contains no addresses",
            path.display()
        )));
    }
    raw.iter()
        .map(|s| {
            Pubkey::from_str(s.trim())
                .map_err(|e| OdysseyError::InvalidInput(format!("bad address {s}: {e}")))
        })
        .collect()
}

/// Rent-exempt minimum for a zero-data account, in lamports. Falls back to
/// [`FALLBACK_MIN_SOL`] if the RPC cannot answer.
pub async fn minimum_transfer_lamports(chain: &dyn ChainAdapter) -> u64 {
    match chain.minimum_balance_for_rent_exemption(0).await {
        Ok(lamports) => {
            info!(min_sol = lamports_to_sol(lamports), "Minimum balance for rent exemption");
            lamports
        }
        Err(e) => {
            warn!(error = %e, fallback_sol = FALLBACK_MIN_SOL, "Rent exemption lookup failed, using default");
            sol_to_lamports(FALLBACK_MIN_SOL)
        }
    }
}

/// Validate a SOL amount against the minimum and convert it to lamports.
pub fn amount_to_lamports(amount_sol: f64, min_lamports: u64) -> OdysseyResult<u64> {
    if !amount_sol.is_finite() || amount_sol <= 0.0 {
        return Err(OdysseyError::InvalidInput(format!(
            "invalid amount {amount_sol} SOL"
        )));
    }
    let lamports = sol_to_lamports(amount_sol);
    if lamports < min_lamports {
        return Err(OdysseyError::InvalidInput(format!(
            "amount must be at least {} SOL to avoid rent issues (suggested: {} SOL)",
            lamports_to_sol(min_lamports),
            lamports_to_sol(min_lamports).max(FALLBACK_MIN_SOL)
        )));
    }
    Ok(lamports)
}

#[derive(Debug, Clone, Copy)]
pub struct TransferPlan {
    pub lamports: u64,
    pub delay: Duration,
    pub policy: RetryPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub source: String,
    /// `host:port` of the proxy this source's RPC traffic went through.
    pub proxy: Option<String>,
    pub sent: Vec<(Pubkey, Signature)>,
    pub failed: Vec<(Pubkey, String)>,
    /// Set when no connection could be built; nothing was sent.
    pub skipped: Option<String>,
}

/// Build and sign a single-instruction transfer.
pub fn build_transfer(from: &Wallet, to: &Pubkey, lamports: u64, blockhash: solana_sdk::hash::Hash) -> Transaction {
    let ix = system_instruction::transfer(&from.pubkey(), to, lamports);
    Transaction::new_signed_with_payer(&[ix], Some(&from.pubkey()), &[from.keypair()], blockhash)
}

/// Send `plan.lamports` from `source` to each destination in turn.
///
/// A failed transfer is logged and recorded; the loop continues. The delay
/// is applied after every destination, successful or not.
pub async fn fan_out(
    chain: &dyn ChainAdapter,
    source: &Wallet,
    destinations: &[Pubkey],
    plan: &TransferPlan,
) -> TransferReport {
    let submitter = TransactionSubmitter::new(chain, plan.policy);
    let mut report = TransferReport {
        source: source.address().to_string(),
        ..TransferReport::default()
    };
    for to in destinations {
        let result = async {
            let blockhash = chain.latest_blockhash().await?;
            let tx = build_transfer(source, to, plan.lamports, blockhash);
            submitter.submit(&tx).await
        }
        .await;
        match result {
            Ok(signature) => {
                info!(
                    from = source.address(),
                    to = %to,
                    sol = lamports_to_sol(plan.lamports),
                    %signature,
                    "Transfer confirmed"
                );
                report.sent.push((*to, signature));
            }
            Err(e) => {
                warn!(from = source.address(), to = %to, error = %e, "Transfer failed");
                report.failed.push((*to, e.to_string()));
            }
        }
        tokio::time::sleep(plan.delay).await;
    }
    report
}

/// Run [`fan_out`] for every source wallet, in order.
///
/// Each source gets its own RPC connection through a proxy picked at random
/// from `proxies`, or a direct one when the pool is empty. A source whose
/// connection cannot be built is skipped.
pub async fn fan_out_all(
    factory: &dyn ChainFactory,
    proxies: &ProxyPool,
    sources: &[Wallet],
    destinations: &[Pubkey],
    plan: &TransferPlan,
) -> Vec<TransferReport> {
    let mut reports = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        let account = i + 1;
        info!(account, address = source.address(), destinations = destinations.len(), "Sending from account");
        let proxy = proxies.pick();
        let proxy_label = proxy.map(ProxyDescriptor::endpoint);
        match &proxy_label {
            Some(endpoint) => info!(account, proxy = %endpoint, "Using proxy"),
            None => info!(account, "No proxy, connecting directly"),
        }
        let mut report = match factory.connect(proxy) {
            Ok(chain) => fan_out(chain.as_ref(), source, destinations, plan).await,
            Err(e) => {
                warn!(account, error = %e, "Skipping account, cannot connect through proxy");
                TransferReport {
                    source: source.address().to_string(),
                    skipped: Some(e.to_string()),
                    ..TransferReport::default()
                }
            }
        };
        report.proxy = proxy_label;
        reports.push(report);
    }
    reports
}
