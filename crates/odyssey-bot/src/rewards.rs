//! Reward workflows for one logged-in account: daily stage claims, mystery
//! box opening, and daily check-in.

use crate::chain::ChainAdapter;
use crate::client::{BoxOpened, RewardApi, SessionToken};
use crate::error::{ApiErrorKind, OdysseyError, OdysseyResult};
use crate::retry::RetryPolicy;
use crate::submit::TransactionSubmitter;
use crate::wallet::Wallet;
use tracing::{info, warn};

/// Daily claims run stages `1..=MAX_CLAIM_STAGE`.
pub const MAX_CLAIM_STAGE: u8 = 3;

/// What happened to one claim stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Server accepted the claim; carries its `claimed` flag.
    Claimed(bool),
    AlreadyClaimed,
    /// The stage's interaction task is not done yet; skipped.
    TaskNotFinished,
    /// Failed after the retry budget was spent; skipped.
    Failed(String),
}

/// Stages in the order they were visited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimReport {
    pub stages: Vec<(u8, StageOutcome)>,
}

impl ClaimReport {
    pub fn visited(&self) -> Vec<u8> {
        self.stages.iter().map(|(stage, _)| *stage).collect()
    }

    pub fn failures(&self) -> usize {
        self.stages
            .iter()
            .filter(|(_, o)| matches!(o, StageOutcome::Failed(_)))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxReport {
    pub requested: u64,
    pub planned: u64,
    /// The request was capped at the available box count.
    pub downgraded: bool,
    pub opened: Vec<BoxOpened>,
    /// Why the loop stopped early, if it did. Boxes in `opened` stay opened.
    pub error: Option<String>,
}

impl BoxReport {
    pub fn aborted(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    CheckedIn { accumulative_days: u32 },
    AlreadyCheckedIn,
}

/// Everything a reward workflow needs for one account.
pub struct RewardSession<'a> {
    pub api: &'a dyn RewardApi,
    pub chain: &'a dyn ChainAdapter,
    pub wallet: &'a Wallet,
    pub token: &'a SessionToken,
    pub policy: RetryPolicy,
    /// 1-based account number, for log lines.
    pub account: usize,
}

impl<'a> RewardSession<'a> {
    fn submitter(&self) -> TransactionSubmitter<'a> {
        TransactionSubmitter::new(self.chain, self.policy)
    }

    /// Walk the claim stages in order.
    ///
    /// Known domain answers advance immediately. Other errors are retried
    /// under the session policy and, once the budget is spent, the stage is
    /// recorded as failed and the walk moves on.
    pub async fn daily_claim(&self) -> ClaimReport {
        let mut report = ClaimReport::default();
        let mut stage = 1u8;
        while stage <= MAX_CLAIM_STAGE {
            let result = self
                .policy
                .run_while("claim stage", is_transient_claim_error, || {
                    self.api.claim_stage(self.token, stage)
                })
                .await;
            let outcome = match result {
                Ok(claimed) => {
                    info!(account = self.account, stage, claimed, "Daily claim succeeded");
                    StageOutcome::Claimed(claimed)
                }
                Err(e) => match e.api_kind() {
                    Some(ApiErrorKind::AlreadyClaimed) => {
                        info!(account = self.account, stage, "Already claimed, proceeding to the next stage");
                        StageOutcome::AlreadyClaimed
                    }
                    Some(ApiErrorKind::InteractTaskNotFinished) => {
                        warn!(account = self.account, stage, "Interact task not finished, skipping stage");
                        StageOutcome::TaskNotFinished
                    }
                    _ => {
                        warn!(account = self.account, stage, error = %e, "Error claiming stage");
                        StageOutcome::Failed(e.to_string())
                    }
                },
            };
            report.stages.push((stage, outcome));
            stage += 1;
        }
        info!(account = self.account, "All stages processed");
        report
    }

    /// Open up to `requested` boxes, capped at `available`.
    ///
    /// Each box is built, signed, submitted and confirmed as one unit under
    /// the retry policy. A box that still fails aborts the loop; the report
    /// keeps the boxes opened before it.
    pub async fn open_boxes(&self, requested: u64, available: u64) -> BoxReport {
        let downgraded = requested > available;
        let planned = requested.min(available);
        if downgraded {
            warn!(
                account = self.account,
                requested,
                available,
                "Cannot open more boxes than available"
            );
        }
        let mut report = BoxReport {
            requested,
            planned,
            downgraded,
            opened: Vec::with_capacity(planned as usize),
            error: None,
        };
        for n in 1..=planned {
            let opened = match self.policy.run("open mystery box", || self.open_one_box()).await {
                Ok(opened) => opened,
                Err(e) => {
                    warn!(account = self.account, box_number = n, error = %e, "Error opening mystery box");
                    report.error = Some(e.to_string());
                    break;
                }
            };
            if opened.success {
                info!(account = self.account, box_number = n, amount = opened.amount, "Box opened successfully");
            } else {
                warn!(account = self.account, box_number = n, "Box open was not acknowledged");
            }
            report.opened.push(opened);
        }
        report
    }

    async fn open_one_box(&self) -> OdysseyResult<BoxOpened> {
        let blob = self.api.open_box_build_tx(self.token).await?;
        let signature = self.submitter().sign_and_submit(&blob, self.wallet).await?;
        self.api.open_box_confirm(self.token, &signature).await
    }

    /// Record today's check-in on chain and confirm it with the API.
    pub async fn daily_login(&self) -> OdysseyResult<LoginOutcome> {
        let blob = match self.api.check_in_build_tx(self.token).await {
            Ok(blob) => blob,
            Err(e) if e.api_kind() == Some(ApiErrorKind::AlreadyCheckedIn) => {
                warn!(account = self.account, "Current account already checked in");
                return Ok(LoginOutcome::AlreadyCheckedIn);
            }
            Err(e) => return Err(e),
        };
        let signature = self.submitter().sign_and_submit(&blob, self.wallet).await?;
        let check_in = self.api.check_in_confirm(self.token, &signature).await?;
        info!(
            account = self.account,
            accumulative_days = check_in.accumulative_days,
            "Daily login succeeded"
        );
        Ok(LoginOutcome::CheckedIn {
            accumulative_days: check_in.accumulative_days,
        })
    }
}

fn is_transient_claim_error(e: &OdysseyError) -> bool {
    !matches!(
        e.api_kind(),
        Some(ApiErrorKind::AlreadyClaimed | ApiErrorKind::InteractTaskNotFinished)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::login;
    use crate::error::CODE_ALREADY_CLAIMED;
    use crate::testing::{api_error, EventCounter, StubApi, StubChain};
    use std::time::Duration;

    async fn log_in(api: &StubApi, wallet: &Wallet) -> SessionToken {
        login(api, wallet).await.unwrap()
    }

    #[tokio::test]
    async fn test_claim_visits_stages_in_order() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey()).with_claims(vec![
            Err(api_error(CODE_ALREADY_CLAIMED, "already claimed")),
            Ok(true),
            Ok(true),
        ]);
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::default(),
            account: 1,
        };
        let report = session.daily_claim().await;
        assert_eq!(report.visited(), vec![1, 2, 3]);
        assert_eq!(report.stages[0].1, StageOutcome::AlreadyClaimed);
        assert_eq!(report.stages[2].1, StageOutcome::Claimed(true));
        let claims: Vec<String> = api.calls().into_iter().filter(|c| c.starts_with("claim:")).collect();
        assert_eq!(claims, vec!["claim:1", "claim:2", "claim:3"]);
    }

    #[tokio::test]
    async fn test_task_not_finished_advances() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey()).with_claims(vec![
            Ok(true),
            Err(api_error(1, "interact task not finished")),
        ]);
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::default(),
            account: 1,
        };
        let report = session.daily_claim().await;
        assert_eq!(report.stages[1], (2, StageOutcome::TaskNotFinished));
        assert_eq!(api.count("claim:2"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_error_retries_then_advances() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey()).with_claims(vec![
            Err(OdysseyError::Network("timeout".into())),
            Err(OdysseyError::Network("timeout".into())),
            Ok(true),
            Ok(true),
        ]);
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::new(1, Duration::from_secs(1)),
            account: 1,
        };
        let report = session.daily_claim().await;
        assert_eq!(report.visited(), vec![1, 2, 3]);
        assert!(matches!(report.stages[0].1, StageOutcome::Failed(_)));
        assert_eq!(report.failures(), 1);
        assert_eq!(api.count("claim:1"), 2);
        assert_eq!(api.count("claim:2"), 1);
    }

    #[tokio::test]
    async fn test_box_loop_caps_at_available() {
        let downgrade_warnings = EventCounter::install("Cannot open more boxes than available");
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey());
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::default(),
            account: 1,
        };
        let report = session.open_boxes(5, 2).await;
        assert!(report.downgraded);
        assert_eq!(downgrade_warnings.count(), 1);
        assert_eq!(report.planned, 2);
        assert_eq!(report.opened.len(), 2);
        assert_eq!(api.count("open_box_build_tx"), 2);
        assert_eq!(api.count("open_box_confirm"), 2);
        assert_eq!(chain.submissions(), 2);
    }

    #[tokio::test]
    async fn test_box_loop_without_downgrade() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey());
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::default(),
            account: 1,
        };
        let downgrade_warnings = EventCounter::install("Cannot open more boxes than available");
        let report = session.open_boxes(1, 4).await;
        assert!(!report.downgraded);
        assert_eq!(downgrade_warnings.count(), 0);
        assert_eq!(report.opened, vec![BoxOpened { success: true, amount: 5 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_box_loop_aborts_on_exhausted_submission() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey());
        let chain = StubChain::failing(u32::MAX);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::new(1, Duration::from_secs(1)),
            account: 1,
        };
        let report = session.open_boxes(3, 3).await;
        assert!(report.aborted());
        assert!(report.error.as_deref().unwrap().starts_with("Gave up after 2 attempts"));
        assert!(report.opened.is_empty());
        assert_eq!(api.count("open_box_confirm"), 0);
        // two box attempts, each with two submissions
        assert_eq!(chain.submissions(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_box_abort_keeps_opened_boxes() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey());
        let chain = StubChain::failing(0).then_failing_after(1);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::new(1, Duration::from_secs(1)),
            account: 1,
        };
        let report = session.open_boxes(3, 3).await;
        assert_eq!(report.planned, 3);
        assert_eq!(report.opened, vec![BoxOpened { success: true, amount: 5 }]);
        assert!(report.aborted());
        assert_eq!(api.count("open_box_build_tx"), 3);
        assert_eq!(api.count("open_box_confirm"), 1);
        // one good box, then two attempts of two submissions each
        assert_eq!(chain.submissions(), 5);
    }

    #[tokio::test]
    async fn test_daily_login_reports_days() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey());
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::default(),
            account: 1,
        };
        let outcome = session.daily_login().await.unwrap();
        assert_eq!(outcome, LoginOutcome::CheckedIn { accumulative_days: 7 });
        assert_eq!(api.count("check_in_build_tx"), 1);
        assert_eq!(api.count("check_in_confirm"), 1);
    }

    #[tokio::test]
    async fn test_daily_login_already_checked_in() {
        let wallet = Wallet::generate();
        let api = StubApi::new(wallet.pubkey());
        *api.check_in_error.lock().unwrap() =
            Some(api_error(0, "current account already checked in"));
        let chain = StubChain::failing(0);
        let token = log_in(&api, &wallet).await;
        let session = RewardSession {
            api: &api,
            chain: &chain,
            wallet: &wallet,
            token: &token,
            policy: RetryPolicy::default(),
            account: 1,
        };
        assert_eq!(session.daily_login().await.unwrap(), LoginOutcome::AlreadyCheckedIn);
        assert_eq!(chain.submissions(), 0);
        assert_eq!(api.count("check_in_confirm"), 0);
    }
}
