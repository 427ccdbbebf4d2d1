//! End-to-end ledger behavior against every store and engine.
//!
//! The same scenarios run over the memory and SQLite stores with the
//! reference engine; scripted failures use the fake engine.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use proptest::prelude::*;

use cipherscore::engine::ReferenceEngine;
use cipherscore::store::{MemoryStore, RecordStore, SqliteStore};
use cipherscore::{
    ErrorKind, Identity, Ledger, LedgerConfig, LedgerEventKind, RecordId, RegisterRequest,
};
use cipherscore_core::encode_score;
use cipherscore_testkit::{decryption_proof, identities, workload, LedgerFixture, LEDGER_IDENTITY};

const ALICE: Identity = Identity::from_bytes([0xa1; 32]);
const BOB: Identity = Identity::from_bytes([0xb0; 32]);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

type RefLedger<S> = Ledger<S, Arc<ReferenceEngine>>;

fn reference_ledger<S: RecordStore>(store: S) -> RefLedger<S> {
    init_tracing();
    let engine = Arc::new(ReferenceEngine::from_seed(&[3; 32]));
    Ledger::new(store, engine, LedgerConfig::new(LEDGER_IDENTITY))
}

fn sign_up<S: RecordStore>(
    ledger: &RefLedger<S>,
    id: &str,
    label: &str,
    score: u64,
    caller: &Identity,
) -> Result<RegisterRequest> {
    let (ciphertext, proof) = ledger.engine().encrypt_input(score, caller)?;
    Ok(RegisterRequest::new(id, label, ciphertext, proof))
}

async fn reveal<S: RecordStore>(
    ledger: &RefLedger<S>,
    id: &RecordId,
) -> cipherscore::Result<u64> {
    let handle = ledger.get_ciphertext_handle(id).await?;
    let (plaintext, proof) = ledger
        .engine()
        .public_decrypt(&[handle])
        .map_err(cipherscore::LedgerError::Engine)?;
    ledger.validate_decryption(id, &plaintext, &proof).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

async fn alice_reveals_once<S: RecordStore>(ledger: RefLedger<S>) -> Result<()> {
    let request = sign_up(&ledger, "r1", "Alice", 77, &ALICE)?
        .factors(10, 0)
        .notes("note");
    let record = ledger.register(&ALICE, request).await?;

    let stored = ledger.get_record(&record.id).await?;
    assert_eq!(stored.label, "Alice");
    assert_eq!(stored.public_factor1, 10);
    assert_eq!(stored.public_factor2, 0);
    assert_eq!(stored.notes, "note");
    assert_eq!(stored.owner, ALICE);
    assert!(!stored.verified);
    assert_eq!(stored.revealed_value, None);

    assert_eq!(reveal(&ledger, &record.id).await?, 77);
    let sealed = ledger.get_record(&record.id).await?;
    assert!(sealed.verified);
    assert_eq!(sealed.revealed_value, Some(77));

    let err = reveal(&ledger, &record.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyVerified);
    assert_eq!(
        ledger.get_record(&record.id).await?.revealed_value,
        Some(77)
    );
    Ok(())
}

async fn duplicate_is_listed_once<S: RecordStore>(ledger: RefLedger<S>) -> Result<()> {
    let first = ledger
        .register(&ALICE, sign_up(&ledger, "r2", "first", 1, &ALICE)?)
        .await?;

    let err = ledger
        .register(&BOB, sign_up(&ledger, "r2", "second", 2, &BOB)?)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    assert_eq!(ledger.list_ids().await?, vec![first.id.clone()]);
    assert_eq!(ledger.get_record(&first.id).await?, first);
    assert_eq!(ledger.events_since(0).await?.len(), 1);
    Ok(())
}

async fn rejected_ciphertext_leaves_no_trace<S: RecordStore>(ledger: RefLedger<S>) -> Result<()> {
    // Proof bound to Alice, submitted by Bob.
    let request = sign_up(&ledger, "r3", "Bob", 5, &ALICE)?;
    let err = ledger.register(&BOB, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCiphertext);

    let id = RecordId::new("r3")?;
    assert_eq!(ledger.get_record(&id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(ledger.list_ids().await?.is_empty());
    assert!(ledger.events_since(0).await?.is_empty());
    Ok(())
}

async fn rejected_proof_keeps_record_open<S: RecordStore>(ledger: RefLedger<S>) -> Result<()> {
    let record = ledger
        .register(&ALICE, sign_up(&ledger, "r4", "Alice", 640, &ALICE)?)
        .await?;
    let (_, proof) = ledger.engine().public_decrypt(&[record.ciphertext])?;

    let err = ledger
        .validate_decryption(&record.id, &encode_score(850), &proof)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidProof);
    assert!(!ledger.get_record(&record.id).await?.verified);

    // A fresh, valid proof still works afterwards.
    assert_eq!(reveal(&ledger, &record.id).await?, 640);
    Ok(())
}

async fn ids_listed_in_call_order<S: RecordStore>(ledger: RefLedger<S>) -> Result<()> {
    let names = ["zeta", "alpha", "mid", "beta", "omega"];
    for (i, name) in names.iter().enumerate() {
        let caller = identities(names.len())[i];
        ledger
            .register(&caller, sign_up(&ledger, name, name, i as u64, &caller)?)
            .await?;
    }

    let listed: Vec<String> = ledger
        .list_ids()
        .await?
        .into_iter()
        .map(RecordId::into_string)
        .collect();
    assert_eq!(listed, names);
    assert_eq!(ledger.record_count().await?, names.len());

    let seqs: Vec<u64> = ledger.events_since(0).await?.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    Ok(())
}

macro_rules! scenario_tests {
    ($($name:ident => $scenario:ident),* $(,)?) => {
        mod memory {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() -> Result<()> {
                    $scenario(reference_ledger(MemoryStore::new())).await
                }
            )*
        }

        mod sqlite {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() -> Result<()> {
                    $scenario(reference_ledger(SqliteStore::open_memory()?)).await
                }
            )*
        }
    };
}

scenario_tests! {
    test_alice_reveals_once => alice_reveals_once,
    test_duplicate_is_listed_once => duplicate_is_listed_once,
    test_rejected_ciphertext_leaves_no_trace => rejected_ciphertext_leaves_no_trace,
    test_rejected_proof_keeps_record_open => rejected_proof_keeps_record_open,
    test_ids_listed_in_call_order => ids_listed_in_call_order,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted Engine
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_oversized_plaintext_is_malformed() -> Result<()> {
    let fixture = LedgerFixture::new();
    let id = fixture.register("r1", 9, &ALICE).await?;
    let handle = fixture.ledger.get_ciphertext_handle(&id).await?;

    // The proof checks out but the word does not fit in 64 bits.
    let mut plaintext = encode_score(9).to_vec();
    plaintext[0] = 1;
    let proof = decryption_proof(&[handle], &plaintext);

    let err = fixture
        .ledger
        .validate_decryption(&id, &plaintext, &proof)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEncoding);
    assert!(err.is_proof_rejection());
    assert!(!fixture.ledger.get_record(&id).await?.verified);
    Ok(())
}

#[tokio::test]
async fn test_engine_outage_is_internal_and_stores_nothing() -> Result<()> {
    let fixture = LedgerFixture::new();
    fixture.engine.set_unavailable(true);

    let err = fixture.register("r1", 1, &ALICE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(fixture.ledger.record_count().await?, 0);

    fixture.engine.set_unavailable(false);
    fixture.register("r1", 1, &ALICE).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reveals_have_one_winner() -> Result<()> {
    let fixture = Arc::new(LedgerFixture::new());
    let id = fixture.register("r1", 500, &ALICE).await?;
    let (plaintext, proof) = fixture.reveal_material(&id).await?;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let fixture = fixture.clone();
        let id = id.clone();
        let plaintext = plaintext.clone();
        let proof = proof.clone();
        tasks.push(tokio::spawn(async move {
            fixture
                .ledger
                .validate_decryption(&id, &plaintext, &proof)
                .await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await? {
            Ok(value) => {
                assert_eq!(value, 500);
                winners += 1;
            }
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyVerified),
        }
    }
    assert_eq!(winners, 1);

    let verified: Vec<_> = fixture
        .ledger
        .events_since(0)
        .await?
        .into_iter()
        .filter(|e| matches!(e.kind, LedgerEventKind::Verified { .. }))
        .collect();
    assert_eq!(verified.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registers_same_id() -> Result<()> {
    let fixture = Arc::new(LedgerFixture::new());
    let callers = identities(8);

    let mut tasks = Vec::new();
    for caller in callers {
        let fixture = fixture.clone();
        tasks.push(tokio::spawn(async move {
            fixture.register("contested", 1, &caller).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(fixture.ledger.list_ids().await?.len(), 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_registration_matches_model(batch in workload(24)) {
        let fixture = LedgerFixture::new();
        let mut seen = HashSet::new();
        let mut expected = Vec::new();

        runtime().block_on(async {
            for params in &batch {
                let (ciphertext, proof) = fixture.engine.encrypt(params.score, &params.owner);
                let mut request =
                    RegisterRequest::new(params.id.as_str(), "", ciphertext, proof);
                request.fields = params.fields.clone();

                let result = fixture.ledger.register(&params.owner, request).await;
                if seen.insert(params.id.clone()) {
                    let record = result.unwrap();
                    prop_assert_eq!(record.owner, params.owner);
                    prop_assert!(!record.verified);
                    expected.push(params.id.clone());
                } else {
                    prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyExists);
                }
            }

            prop_assert_eq!(fixture.ledger.list_ids().await.unwrap(), expected.clone());
            let events = fixture.ledger.events_since(0).await.unwrap();
            let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
            let dense: Vec<u64> = (1..=expected.len() as u64).collect();
            prop_assert_eq!(seqs, dense);
            Ok(())
        })?;
    }

    #[test]
    fn prop_first_valid_reveal_wins(score in any::<u64>(), attempts in prop::collection::vec(any::<bool>(), 1..12)) {
        let fixture = LedgerFixture::new();

        runtime().block_on(async {
            let id = fixture.register("r1", score, &ALICE).await.unwrap();
            let (plaintext, proof) = fixture.reveal_material(&id).await.unwrap();
            let tampered = encode_score(score.wrapping_add(1));
            let mut sealed = false;

            for valid in attempts {
                let claimed: &[u8] = if valid { &plaintext } else { &tampered };
                let result = fixture.ledger.validate_decryption(&id, claimed, &proof).await;
                match (sealed, valid) {
                    (true, _) => {
                        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyVerified)
                    }
                    (false, true) => {
                        prop_assert_eq!(result.unwrap(), score);
                        sealed = true;
                    }
                    (false, false) => {
                        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidProof)
                    }
                }

                let record = fixture.ledger.get_record(&id).await.unwrap();
                prop_assert_eq!(record.verified, sealed);
                prop_assert_eq!(record.revealed_value, sealed.then_some(score));
            }
            Ok(())
        })?;
    }
}
