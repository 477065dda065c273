//! Per-account orchestration: log in, read the profile, run one reward mode.
//!
//! Accounts are processed strictly one after another, in credential file
//! order. A failing account is logged and recorded; the batch moves on.

use crate::chain::ChainAdapter;
use crate::client::{login, RewardApi, RewardApiClient};
use crate::config::ApiConfig;
use crate::credentials::Credential;
use crate::error::OdysseyResult;
use crate::proxy::{ProxyDescriptor, ProxyPool};
use crate::retry::RetryPolicy;
use crate::rewards::{BoxReport, ClaimReport, LoginOutcome, RewardSession};
use crate::wallet::Wallet;
use chrono::{DateTime, Utc};
use solana_sdk::native_token::lamports_to_sol;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Which reward action to run for every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Claim,
    OpenBoxes { count: u64 },
    DailyLogin,
}

/// Settings shared by every account in a batch.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub policy: RetryPolicy,
    pub proxies: ProxyPool,
}

/// Builds one reward API client per account.
pub trait ApiFactory: Send + Sync {
    fn connect(&self, proxy: Option<&ProxyDescriptor>) -> OdysseyResult<Arc<dyn RewardApi>>;
}

/// [`ApiFactory`] producing HTTP clients.
pub struct HttpApiFactory {
    config: ApiConfig,
    timeout: Duration,
}

impl HttpApiFactory {
    pub fn new(config: ApiConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

impl ApiFactory for HttpApiFactory {
    fn connect(&self, proxy: Option<&ProxyDescriptor>) -> OdysseyResult<Arc<dyn RewardApi>> {
        Ok(Arc::new(RewardApiClient::new(&self.config, self.timeout, proxy)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    Claimed(ClaimReport),
    BoxesOpened(BoxReport),
    LoggedIn(LoginOutcome),
    /// No native balance; nothing was attempted.
    Skipped,
    Failed(String),
}

impl AccountOutcome {
    /// A failed account, or a box loop that stopped before its plan.
    pub fn is_failure(&self) -> bool {
        match self {
            AccountOutcome::Failed(_) => true,
            AccountOutcome::BoxesOpened(report) => report.aborted(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountReport {
    /// 1-based position in the credential file.
    pub index: usize,
    pub address: Option<String>,
    pub proxy: Option<String>,
    pub outcome: AccountOutcome,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub accounts: Vec<AccountReport>,
}

impl BatchReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            accounts: Vec::new(),
        }
    }

    /// Wall-clock time from start to finish, if the batch has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn failed(&self) -> usize {
        self.accounts.iter().filter(|a| a.outcome.is_failure()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.accounts.len() - self.failed()
    }
}

/// Run `mode` for one account.
pub async fn process_account(
    api: &dyn RewardApi,
    chain: &dyn ChainAdapter,
    wallet: &Wallet,
    account: usize,
    mode: RunMode,
    policy: RetryPolicy,
) -> OdysseyResult<AccountOutcome> {
    let token = login(api, wallet).await?;
    let profile = api.profile(&token).await?;

    if profile.wallet_balance == 0 {
        warn!(
            account,
            address = wallet.address(),
            "No balance. Fund the wallet or check that the RPC is up"
        );
        return Ok(AccountOutcome::Skipped);
    }

    info!(
        account,
        address = wallet.address(),
        balance_sol = lamports_to_sol(profile.wallet_balance),
        ring = profile.ring,
        available_boxes = profile.ring_monitor,
        "Account ready"
    );

    let session = RewardSession {
        api,
        chain,
        wallet,
        token: &token,
        policy,
        account,
    };
    let outcome = match mode {
        RunMode::Claim => AccountOutcome::Claimed(session.daily_claim().await),
        RunMode::OpenBoxes { count } => {
            AccountOutcome::BoxesOpened(session.open_boxes(count, profile.ring_monitor).await)
        }
        RunMode::DailyLogin => AccountOutcome::LoggedIn(session.daily_login().await?),
    };
    info!(account, "All tasks completed");
    Ok(outcome)
}

/// Run `mode` for every credential, in order.
pub async fn run_batch(
    settings: &RunSettings,
    credentials: &[Credential],
    mode: RunMode,
    factory: &dyn ApiFactory,
    chain: &dyn ChainAdapter,
) -> BatchReport {
    let mut report = BatchReport::start();
    for (i, credential) in credentials.iter().enumerate() {
        let account = i + 1;
        let proxy = settings.proxies.pick();
        let proxy_label = proxy.map(ProxyDescriptor::endpoint);
        match &proxy_label {
            Some(endpoint) => info!(account, proxy = %endpoint, "Using proxy"),
            None => info!(account, "No proxy, connecting directly"),
        }

        let mut address = None;
        let result = async {
            let wallet = Wallet::from_credential(credential)?;
            address = Some(wallet.address().to_string());
            let api = factory.connect(proxy)?;
            process_account(api.as_ref(), chain, &wallet, account, mode, settings.policy).await
        }
        .await;

        let outcome = result.unwrap_or_else(|e| {
            error!(account, error = %e, "Error processing account");
            AccountOutcome::Failed(e.to_string())
        });
        report.accounts.push(AccountReport {
            index: account,
            address,
            proxy: proxy_label,
            outcome,
        });
    }
    report.finished_at = Some(Utc::now());
    info!(
        accounts = report.accounts.len(),
        failed = report.failed(),
        elapsed_secs = report.elapsed().map_or(0, |d| d.num_seconds()),
        "All accounts processed"
    );
    report
}
