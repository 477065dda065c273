//! Sign server-issued transactions and submit them with bounded retry.

use crate::chain::{decode_transaction, ChainAdapter};
use crate::error::{OdysseyError, OdysseyResult};
use crate::retry::RetryPolicy;
use crate::wallet::Wallet;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::{debug, error};

/// Turns a pending transaction into a confirmed signature.
pub struct TransactionSubmitter<'a> {
    chain: &'a dyn ChainAdapter,
    policy: RetryPolicy,
}

impl<'a> TransactionSubmitter<'a> {
    pub fn new(chain: &'a dyn ChainAdapter, policy: RetryPolicy) -> Self {
        Self { chain, policy }
    }

    /// Decode `blob`, add the wallet's signature, and submit it.
    ///
    /// The wallet signs alongside whatever signatures the server already
    /// attached; it is not assumed to be the only signer.
    pub async fn sign_and_submit(&self, blob: &str, wallet: &Wallet) -> OdysseyResult<Signature> {
        let mut tx = decode_transaction(blob)?;
        partial_sign(&mut tx, wallet)?;
        self.submit(&tx).await
    }

    /// Submit an already signed transaction under the retry policy.
    pub async fn submit(&self, tx: &Transaction) -> OdysseyResult<Signature> {
        let result = self
            .policy
            .run("submit transaction", || self.chain.submit_transaction(tx))
            .await;
        match &result {
            Ok(signature) => debug!(%signature, "Transaction submitted"),
            Err(e) => error!(error = %e, "Error in transaction"),
        }
        result
    }
}

/// Sign `tx` with `wallet` using the transaction's own recent blockhash.
pub fn partial_sign(tx: &mut Transaction, wallet: &Wallet) -> OdysseyResult<()> {
    let blockhash = tx.message.recent_blockhash;
    tx.try_partial_sign(&[wallet.keypair()], blockhash)
        .map_err(|e| OdysseyError::Transaction(format!("signing failed: {e}")))
}
