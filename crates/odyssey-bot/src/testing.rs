//! In-memory stand-ins for the reward API and the chain, shared by unit tests.

use crate::chain::{encode_transaction, ChainAdapter};
use crate::client::{AuthorizeRequest, BoxOpened, CheckIn, Profile, RewardApi, SessionToken};
use crate::error::{ApiError, OdysseyError, OdysseyResult};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Base64 unsigned transfer with `payer` as the only required signer.
pub fn unsigned_blob(payer: &Pubkey) -> String {
    let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 1_000);
    let tx = Transaction::new_with_payer(&[ix], Some(payer));
    encode_transaction(&tx).unwrap()
}

pub fn api_error(code: i64, message: &str) -> OdysseyError {
    OdysseyError::Api(ApiError::new(400, code, message))
}

/// Counts events on the current thread whose message contains `needle`.
pub struct EventCounter {
    hits: Arc<AtomicUsize>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl EventCounter {
    pub fn install(needle: &'static str) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let layer = MessageLayer {
            needle,
            hits: hits.clone(),
        };
        let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
        Self { hits, _guard: guard }
    }

    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

struct MessageLayer {
    needle: &'static str,
    hits: Arc<AtomicUsize>,
}

impl<S: Subscriber> Layer<S> for MessageLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField(String::new());
        event.record(&mut message);
        if message.0.contains(self.needle) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Chain stub that fails the first `failures` submissions, and optionally
/// every submission after the first `succeed_until`.
pub struct StubChain {
    failures: u32,
    succeed_until: Option<u32>,
    signature: Signature,
    submitted: Mutex<Vec<(tokio::time::Instant, Transaction)>>,
    rent_exemption: Option<u64>,
}

impl StubChain {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            succeed_until: None,
            signature: Signature::from([7u8; 64]),
            submitted: Mutex::new(Vec::new()),
            rent_exemption: Some(890_880),
        }
    }

    /// Submissions past the first `n` fail.
    pub fn then_failing_after(mut self, n: u32) -> Self {
        self.succeed_until = Some(n);
        self
    }

    /// Rent-exemption lookups fail.
    pub fn without_rent(mut self) -> Self {
        self.rent_exemption = None;
        self
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn submissions(&self) -> u32 {
        self.submitted.lock().unwrap().len() as u32
    }

    pub fn last_transaction(&self) -> Option<Transaction> {
        self.submitted.lock().unwrap().last().map(|(_, tx)| tx.clone())
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.submitted.lock().unwrap().iter().map(|(_, tx)| tx.clone()).collect()
    }

    /// Time between consecutive submissions.
    pub fn gaps(&self) -> Vec<Duration> {
        let submitted = self.submitted.lock().unwrap();
        submitted.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }
}

#[async_trait]
impl ChainAdapter for StubChain {
    async fn submit_transaction(&self, tx: &Transaction) -> OdysseyResult<Signature> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((tokio::time::Instant::now(), tx.clone()));
        let n = submitted.len() as u32;
        if n <= self.failures || self.succeed_until.is_some_and(|limit| n > limit) {
            return Err(OdysseyError::Chain("blockhash not found".into()));
        }
        Ok(self.signature)
    }

    async fn latest_blockhash(&self) -> OdysseyResult<Hash> {
        Ok(Hash::new_unique())
    }

    async fn minimum_balance_for_rent_exemption(&self, _data_len: usize) -> OdysseyResult<u64> {
        self.rent_exemption
            .ok_or_else(|| OdysseyError::Chain("rpc unavailable".into()))
    }
}

/// Scripted reward API. Claim responses are consumed in order; the
/// transaction blobs are built for `payer`.
pub struct StubApi {
    pub payer: Pubkey,
    pub profile: Profile,
    pub fail_login: bool,
    pub claim_script: Mutex<VecDeque<OdysseyResult<bool>>>,
    pub check_in_error: Mutex<Option<OdysseyError>>,
    pub accumulative_days: u32,
    pub calls: Mutex<Vec<String>>,
}

impl StubApi {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            profile: Profile {
                wallet_balance: 1_000_000_000,
                ring: 10,
                ring_monitor: 2,
            },
            fail_login: false,
            claim_script: Mutex::new(VecDeque::new()),
            check_in_error: Mutex::new(None),
            accumulative_days: 7,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_claims(self, script: Vec<OdysseyResult<bool>>) -> Self {
        *self.claim_script.lock().unwrap() = script.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl RewardApi for StubApi {
    async fn challenge(&self, _wallet: &str) -> OdysseyResult<String> {
        self.record("challenge");
        if self.fail_login {
            return Err(OdysseyError::Network("connection refused".into()));
        }
        Ok("Sign in to Sonic Odyssey".into())
    }

    async fn authorize(&self, request: &AuthorizeRequest) -> OdysseyResult<SessionToken> {
        self.record("authorize");
        Ok(SessionToken::new(format!("token-{}", request.address)))
    }

    async fn profile(&self, _token: &SessionToken) -> OdysseyResult<Profile> {
        self.record("profile");
        Ok(self.profile.clone())
    }

    async fn claim_stage(&self, _token: &SessionToken, stage: u8) -> OdysseyResult<bool> {
        self.record(format!("claim:{stage}"));
        self.claim_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(true))
    }

    async fn check_in_build_tx(&self, _token: &SessionToken) -> OdysseyResult<String> {
        self.record("check_in_build_tx");
        if let Some(e) = self.check_in_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(unsigned_blob(&self.payer))
    }

    async fn check_in_confirm(&self, _token: &SessionToken, _signature: &Signature) -> OdysseyResult<CheckIn> {
        self.record("check_in_confirm");
        Ok(CheckIn {
            accumulative_days: self.accumulative_days,
        })
    }

    async fn open_box_build_tx(&self, _token: &SessionToken) -> OdysseyResult<String> {
        self.record("open_box_build_tx");
        Ok(unsigned_blob(&self.payer))
    }

    async fn open_box_confirm(&self, _token: &SessionToken, _signature: &Signature) -> OdysseyResult<BoxOpened> {
        self.record("open_box_confirm");
        Ok(BoxOpened {
            success: true,
            amount: 5,
        })
    }
}
