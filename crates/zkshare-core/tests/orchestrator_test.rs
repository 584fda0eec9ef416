//! Deployment and verification against an in-process ledger.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use zkshare_core::chain::rpc::{Commitment, LedgerRpc, SignatureStatus, TransactionOutcome};
use zkshare_core::chain::transaction::{
    Blockhash, Pubkey, Signature, Transaction, MAX_TRANSACTION_SIZE,
};
use zkshare_core::chain::{ChainClient, Connector, NetworkEnvironment};
use zkshare_core::config::ChainConfig;
use zkshare_core::deploy::DeploymentOrchestrator;
use zkshare_core::error::{Result, ZkShareError};
use zkshare_core::estimator::rent_exempt_minimum;
use zkshare_core::progress::{Progress, Stage};
use zkshare_core::signer::TransactionSigner;
use zkshare_core::verify::VerificationOrchestrator;

/// How the fake ledger treats submitted transactions.
#[derive(Clone)]
enum Landing {
    /// Finalized, with the given execution error if any.
    Finalized(Option<String>),
    /// Never seen by the node.
    Lost,
}

struct FakeLedger {
    landing: Landing,
    reject_submission: Option<String>,
    outcome: Mutex<TransactionOutcome>,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl FakeLedger {
    fn new(landing: Landing) -> Self {
        Self {
            landing,
            reject_submission: None,
            outcome: Mutex::new(TransactionOutcome::default()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    fn with_outcome(self, outcome: TransactionOutcome) -> Self {
        *self.outcome.lock().unwrap() = outcome;
        self
    }

    fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    fn endpoint(&self) -> &str {
        "fake://ledger"
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }

    async fn balance(&self, _account: &Pubkey) -> Result<u64> {
        Ok(10_000_000_000)
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: u64) -> Result<u64> {
        Ok(rent_exempt_minimum(data_len))
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        Ok(Blockhash([9; 32]))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature> {
        if let Some(reason) = &self.reject_submission {
            return Err(ZkShareError::SubmissionFailed(reason.clone()));
        }
        self.submitted.lock().unwrap().push(wire.to_vec());
        let first: [u8; 64] = wire[1..65].try_into().unwrap();
        Ok(Signature(first))
    }

    async fn signature_status(&self, _signature: &Signature) -> Result<Option<SignatureStatus>> {
        Ok(match &self.landing {
            Landing::Finalized(err) => Some(SignatureStatus {
                commitment: Some(Commitment::Finalized),
                err: err.clone(),
            }),
            Landing::Lost => None,
        })
    }

    async fn transaction_outcome(&self, _signature: &Signature) -> Result<Option<TransactionOutcome>> {
        Ok(Some(self.outcome.lock().unwrap().clone()))
    }

    async fn request_airdrop(&self, _account: &Pubkey, _lamports: u64) -> Result<Signature> {
        Ok(Signature([1; 64]))
    }
}

struct KeySigner(SigningKey);

impl KeySigner {
    fn random() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }
}

#[async_trait]
impl TransactionSigner for KeySigner {
    fn pubkey(&self) -> Pubkey {
        Pubkey::from_signing_key(&self.0)
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        transaction.sign(&self.0)?;
        Ok(transaction)
    }
}

/// Counts how often it is asked to sign.
struct CountingSigner {
    inner: KeySigner,
    calls: AtomicUsize,
}

impl CountingSigner {
    fn new() -> Self {
        Self {
            inner: KeySigner::random(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for CountingSigner {
    fn pubkey(&self) -> Pubkey {
        self.inner.pubkey()
    }

    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_transaction(transaction).await
    }
}

struct DecliningSigner;

#[async_trait]
impl TransactionSigner for DecliningSigner {
    fn pubkey(&self) -> Pubkey {
        Pubkey([8; 32])
    }

    async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction> {
        Err(ZkShareError::SignerRejected("user declined".into()))
    }
}

/// Signs, but with a key other than the fee payer's.
struct ImpostorSigner {
    claimed: SigningKey,
    actual: SigningKey,
}

#[async_trait]
impl TransactionSigner for ImpostorSigner {
    fn pubkey(&self) -> Pubkey {
        Pubkey::from_signing_key(&self.claimed)
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let forged = Pubkey::from_signing_key(&self.actual);
        assert_ne!(forged, self.pubkey());
        transaction.signatures[0] = Signature(
            ed25519_dalek::Signer::sign(&self.actual, &transaction.message.serialize()?).to_bytes(),
        );
        Ok(transaction)
    }
}

fn chain_with(ledger: Arc<FakeLedger>, config: ChainConfig) -> Arc<ChainClient> {
    let connector: Connector = Arc::new(move |_env: NetworkEnvironment, _endpoint: &str| {
        Ok(ledger.clone() as Arc<dyn LedgerRpc>)
    });
    Arc::new(ChainClient::with_connector(config, connector))
}

fn fast_config() -> ChainConfig {
    ChainConfig {
        confirmation_timeout_secs: 1,
        poll_interval_ms: 10,
        ..ChainConfig::default()
    }
}

fn percents(events: &[Progress]) -> Vec<u8> {
    events.iter().map(|p| p.percent).collect()
}

#[tokio::test]
async fn deploy_reports_every_stage_in_order() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(None)));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger.clone(), fast_config())).unwrap();
    let signer = KeySigner::random();
    let vk = vec![0xab; 256];

    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let record = orchestrator.deploy(&vk, &signer, &mut on_progress).await.unwrap();

    assert_eq!(percents(&events), vec![10, 20, 30, 40, 50, 70, 85, 100]);
    assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(events.iter().filter(|p| p.percent == 100).count(), 1);
    assert_eq!(events.last().unwrap().stage, Stage::Confirmed);

    assert_eq!(record.environment(), NetworkEnvironment::Devnet);
    assert_eq!(record.funding_lamports(), rent_exempt_minimum(256 + 128));
    assert_eq!(record.fee_lamports(), 5_000);

    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 1);
    let wire = &submitted[0];
    // Both the payer and the fresh account signed.
    assert_eq!(wire[0], 2);
    assert!(wire.windows(vk.len()).any(|w| w == vk.as_slice()));
    assert_eq!(record.signature(), Signature(wire[1..65].try_into().unwrap()).to_string());
}

#[tokio::test]
async fn each_deploy_uses_a_fresh_account() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(None)));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger, fast_config())).unwrap();
    let signer = KeySigner::random();

    let first = orchestrator.deploy(&[1, 2, 3], &signer, &mut |_: Progress| {}).await.unwrap();
    let second = orchestrator.deploy(&[1, 2, 3], &signer, &mut |_: Progress| {}).await.unwrap();
    assert_ne!(first.account(), second.account());
    assert_ne!(first.account(), signer.pubkey().to_string());
}

#[tokio::test]
async fn declined_signature_aborts_before_submission() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(None)));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger.clone(), fast_config())).unwrap();

    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let err = orchestrator
        .deploy(&[7; 32], &DecliningSigner, &mut on_progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Signed));
    assert!(matches!(err.root(), ZkShareError::SignerRejected(_)));
    assert!(events
        .iter()
        .all(|p| p.stage != Stage::Submitted && p.stage != Stage::Confirmed));
    assert_eq!(percents(&events), vec![10, 20, 30, 40, 50]);
    assert!(ledger.submitted().is_empty());
}

#[tokio::test]
async fn oversized_deploy_never_reaches_the_signer() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(None)));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger.clone(), fast_config())).unwrap();
    let signer = CountingSigner::new();

    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let err = orchestrator
        .deploy(&[0xcd; 4096], &signer, &mut on_progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::TransactionBuilt));
    match err.root() {
        ZkShareError::TransactionTooLarge { size, max } => {
            assert!(*size > 4096);
            assert_eq!(*max, MAX_TRANSACTION_SIZE);
        }
        other => panic!("expected TransactionTooLarge, got {other:?}"),
    }
    assert_eq!(signer.calls(), 0);
    assert_eq!(percents(&events), vec![10, 20, 30, 40]);
    assert!(events.iter().all(|p| !matches!(
        p.stage,
        Stage::Signed | Stage::Submitted | Stage::Confirmed
    )));
    assert!(ledger.submitted().is_empty());
}

#[tokio::test]
async fn signature_from_wrong_key_is_rejected() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(None)));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger.clone(), fast_config())).unwrap();
    let signer = ImpostorSigner {
        claimed: SigningKey::generate(&mut OsRng),
        actual: SigningKey::generate(&mut OsRng),
    };

    let err = orchestrator.deploy(&[7; 32], &signer, &mut |_: Progress| {}).await.unwrap_err();
    assert!(matches!(err.root(), ZkShareError::SignerRejected(_)));
    assert!(ledger.submitted().is_empty());
}

#[tokio::test]
async fn refused_submission_is_attributed() {
    let mut ledger = FakeLedger::new(Landing::Finalized(None));
    ledger.reject_submission = Some("Blockhash not found".into());
    let orchestrator = DeploymentOrchestrator::new(chain_with(Arc::new(ledger), fast_config())).unwrap();

    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let err = orchestrator
        .deploy(&[7; 32], &KeySigner::random(), &mut on_progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Submitted));
    assert!(matches!(err.root(), ZkShareError::SubmissionFailed(r) if r.contains("Blockhash")));
    assert_eq!(events.last().unwrap().percent, 70);
}

#[tokio::test]
async fn confirmation_timeout_carries_signature() {
    let ledger = Arc::new(FakeLedger::new(Landing::Lost));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger.clone(), fast_config())).unwrap();

    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let err = orchestrator
        .deploy(&[7; 32], &KeySigner::random(), &mut on_progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Confirmed));
    let submitted = ledger.submitted();
    let expected = Signature(submitted[0][1..65].try_into().unwrap()).to_string();
    match err.root() {
        ZkShareError::ConfirmationTimeout { signature, waited_secs } => {
            assert_eq!(signature, &expected);
            assert_eq!(*waited_secs, 1);
        }
        other => panic!("expected ConfirmationTimeout, got {other:?}"),
    }
    assert!(events.iter().all(|p| p.percent < 100));
}

#[tokio::test]
async fn failed_deploy_transaction_is_an_error() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(Some(
        r#"{"InstructionError":[1,{"Custom":3}]}"#.into(),
    ))));
    let orchestrator = DeploymentOrchestrator::new(chain_with(ledger, fast_config())).unwrap();

    let err = orchestrator
        .deploy(&[7; 32], &KeySigner::random(), &mut |_: Progress| {})
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Confirmed));
    assert!(matches!(err.root(), ZkShareError::TransactionFailed { .. }));
}

const VERIFIER_ACCOUNT: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

async fn run_verify(ledger: FakeLedger) -> (Result<zkshare_core::records::VerificationRecord>, Vec<Progress>) {
    let orchestrator = VerificationOrchestrator::new(chain_with(Arc::new(ledger), fast_config())).unwrap();
    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let result = orchestrator
        .verify(
            VERIFIER_ACCOUNT,
            &[0x11; 128],
            &["42".to_string(), "7".to_string()],
            &KeySigner::random(),
            &mut on_progress,
        )
        .await;
    (result, events)
}

#[tokio::test]
async fn verify_reads_return_data() {
    let ledger = FakeLedger::new(Landing::Finalized(None)).with_outcome(TransactionOutcome {
        err: None,
        logs: vec![],
        return_data: Some(vec![1]),
    });
    let (result, events) = run_verify(ledger).await;
    let record = result.unwrap();
    assert!(record.is_valid());
    assert_eq!(record.account(), VERIFIER_ACCOUNT);
    assert_eq!(percents(&events), vec![10, 30, 50, 70, 100]);
}

#[tokio::test]
async fn verify_reads_program_logs() {
    let ledger = FakeLedger::new(Landing::Finalized(None)).with_outcome(TransactionOutcome {
        err: None,
        logs: vec!["Program log: verification: invalid".into()],
        return_data: None,
    });
    let (result, _) = run_verify(ledger).await;
    assert!(!result.unwrap().is_valid());
}

#[tokio::test]
async fn verify_without_verdict_is_unrecognized() {
    let ledger = FakeLedger::new(Landing::Finalized(None)).with_outcome(TransactionOutcome {
        err: None,
        logs: vec!["Program ZkVer1fier success".into()],
        return_data: None,
    });
    let (result, events) = run_verify(ledger).await;
    let err = result.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Confirmed));
    assert!(matches!(err.root(), ZkShareError::UnrecognizedOutcome { .. }));
    assert!(events.iter().all(|p| p.percent < 100));
}

#[tokio::test]
async fn oversized_proof_never_reaches_the_signer() {
    let ledger = Arc::new(FakeLedger::new(Landing::Finalized(None)));
    let orchestrator = VerificationOrchestrator::new(chain_with(ledger.clone(), fast_config())).unwrap();
    let signer = CountingSigner::new();

    let mut events = Vec::new();
    let mut on_progress = |p: Progress| events.push(p);
    let err = orchestrator
        .verify(VERIFIER_ACCOUNT, &[0x22; 2048], &[], &signer, &mut on_progress)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::TransactionBuilt));
    assert!(matches!(err.root(), ZkShareError::TransactionTooLarge { .. }));
    assert_eq!(signer.calls(), 0);
    assert_eq!(percents(&events), vec![10]);
    assert!(ledger.submitted().is_empty());
}

#[tokio::test]
async fn verify_rejects_malformed_account_at_preparing() {
    let orchestrator = VerificationOrchestrator::new(chain_with(
        Arc::new(FakeLedger::new(Landing::Finalized(None))),
        fast_config(),
    ))
    .unwrap();
    let err = orchestrator
        .verify("nope", &[1], &[], &KeySigner::random(), &mut |_: Progress| {})
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Preparing));
    assert!(matches!(err.root(), ZkShareError::InvalidAccount(_)));
}
