//! Orchestrator scenario tests: burn-variant selection, validation order,
//! failure semantics, and the two-phase initiate/complete flow.

mod common;

use alloy::primitives::U256;
use chrono::{TimeDelta, Utc};
use std::sync::atomic::Ordering;

use common::{Harness, MockGateway, recipient, sender};
use stablebridge::TransferError;
use stablebridge::amount::AmountError;
use stablebridge::gateway::{BurnVariant, FinalityMode};
use stablebridge::orchestrator::{TransferOptions, TransferStatus, TransferStep};

fn fast_options() -> TransferOptions {
    TransferOptions {
        use_fast_transfer: true,
        ..TransferOptions::default()
    }
}

#[tokio::test]
async fn fast_transfer_uses_fast_finality_burn_variant() {
    let harness = Harness::new();

    let result = harness
        .orchestrator
        .initiate("ethereum", "base", "100.00", recipient(), sender(), fast_options())
        .await
        .unwrap();

    let burns = harness.gateway.burns.lock().unwrap();
    assert_eq!(burns.len(), 1);
    assert!(matches!(
        burns[0].variant,
        BurnVariant::FastFinality {
            min_finality_threshold: 1000,
            ..
        }
    ));
    assert_eq!(burns[0].amount, U256::from(100_000_000u64));
    assert_eq!(burns[0].destination_domain, 6);

    assert!(result.use_fast_transfer);
    assert_eq!(result.status, TransferStatus::Attested);
    assert!(result.attestation.is_some());

    // Fast transfers carry a short attestation budget: the estimate is
    // minutes out, not tens of minutes.
    let eta = result.estimated_completion.unwrap();
    assert!(eta <= Utc::now() + TimeDelta::minutes(5));
}

#[tokio::test]
async fn fast_request_falls_back_to_standard_without_capability() {
    let harness = Harness::new();

    // arbitrum advertises supports_fast_transfer = false.
    let result = harness
        .orchestrator
        .initiate("ethereum", "arbitrum", "10", recipient(), sender(), fast_options())
        .await
        .unwrap();

    let burns = harness.gateway.burns.lock().unwrap();
    assert!(matches!(burns[0].variant, BurnVariant::Standard));
    assert!(!result.use_fast_transfer);

    // Standard budget: the estimate is well past the fast window.
    let eta = result.estimated_completion.unwrap();
    assert!(eta > Utc::now() + TimeDelta::minutes(10));
}

#[tokio::test]
async fn hook_payload_takes_precedence_over_fast_transfer() {
    let harness = Harness::new();

    let options = TransferOptions {
        use_fast_transfer: true,
        hook_data: Some(alloy::primitives::Bytes::from_static(&[1, 1, 0, 0, 0x93, 0xE0])),
        gas_limit: None,
    };

    let result = harness
        .orchestrator
        .initiate("ethereum", "base", "50", recipient(), sender(), options)
        .await
        .unwrap();

    let burns = harness.gateway.burns.lock().unwrap();
    assert!(matches!(burns[0].variant, BurnVariant::WithHook { .. }));
    // Hook burns default to the higher gas ceiling.
    assert_eq!(burns[0].gas_limit, Some(500_000));

    assert!(result.enable_hooks);
    assert!(result.hook_id.is_some());
    // Hooks and fast-finality never compose; the effective mode is standard.
    assert!(!result.use_fast_transfer);
}

#[tokio::test]
async fn hook_id_is_deterministic_for_identical_inputs() {
    let harness = Harness::new();

    let id = stablebridge::hooks::derive_hook_id("ethereum", "base", common::message_hash_of(0));

    let options = TransferOptions {
        hook_data: Some(stablebridge::hooks::HookMetadata::new(
            stablebridge::hooks::HookType::Custom,
            stablebridge::hooks::ExecutionTiming::PostMint,
        )
        .encode()),
        ..TransferOptions::default()
    };

    let result = harness
        .orchestrator
        .initiate("ethereum", "base", "1", recipient(), sender(), options)
        .await
        .unwrap();

    assert_eq!(result.hook_id.unwrap(), id);
}

#[tokio::test]
async fn invalid_amounts_fail_before_any_network_call() {
    for bad_amount in ["0", "-3", "abc", "1.0000001"] {
        let harness = Harness::new();

        let err = harness
            .orchestrator
            .initiate(
                "ethereum",
                "base",
                bad_amount,
                recipient(),
                sender(),
                TransferOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, TransferError::InvalidAmount(_)),
            "expected InvalidAmount for {bad_amount}, got {err}"
        );
        assert_eq!(
            harness.gateway.calls(),
            0,
            "no network call may precede amount validation"
        );
    }
}

#[tokio::test]
async fn non_numeric_amount_reports_the_offending_value() {
    let harness = Harness::new();

    let err = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "12,50",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::InvalidAmount(AmountError::Unparsable { .. })
    ));
}

#[tokio::test]
async fn unknown_chains_are_rejected_without_network_calls() {
    let harness = Harness::new();

    let err = harness
        .orchestrator
        .initiate(
            "solana",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::UnsupportedChain { chain } if chain == "solana"));
    assert_eq!(harness.gateway.calls(), 0);
}

#[tokio::test]
async fn insufficient_balance_and_allowance_are_distinct_failures() {
    let mut gateway = MockGateway::rich();
    gateway.balance = U256::from(1u64);
    let harness = Harness::with_gateway(gateway);

    let err = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::InsufficientBalance { .. }));

    let mut gateway = MockGateway::rich();
    gateway.allowance = U256::ZERO;
    let harness = Harness::with_gateway(gateway);

    let err = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::InsufficientAllowance { .. }));
}

#[tokio::test]
async fn missing_protocol_message_is_fatal_with_failed_progress() {
    let mut gateway = MockGateway::rich();
    gateway.omit_message_log = true;
    let harness = Harness::with_gateway(gateway);

    let mut progress = harness.orchestrator.subscribe();

    let err = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::MessageNotFound));

    let mut saw_failed_at_zero = false;
    while let Ok(event) = progress.try_recv() {
        if event.step == TransferStep::Failed {
            assert_eq!(event.percent, 0);
            saw_failed_at_zero = true;
        }
    }
    assert!(saw_failed_at_zero, "expected a Failed progress event at 0%");

    assert!(
        harness
            .recorded_events()
            .contains(&"transfer.failed".to_string())
    );
}

#[tokio::test]
async fn complete_mints_with_the_mode_matching_receive_variant() {
    let harness = Harness::new();

    let fast = harness
        .orchestrator
        .initiate("ethereum", "base", "10", recipient(), sender(), fast_options())
        .await
        .unwrap();
    harness.orchestrator.complete(&fast).await.unwrap();

    let standard = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();
    harness.orchestrator.complete(&standard).await.unwrap();

    let mints = harness.gateway.mints.lock().unwrap();
    assert_eq!(mints.len(), 2);
    assert_eq!(mints[0], ("base".to_string(), FinalityMode::Unfinalized));
    assert_eq!(mints[1], ("base".to_string(), FinalityMode::Finalized));
}

#[tokio::test]
async fn complete_is_retry_safe_with_the_same_result() {
    let harness = Harness::new();

    let attested = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();

    let first = harness.orchestrator.complete(&attested).await.unwrap();
    assert_eq!(first.status, TransferStatus::Completed);
    assert!(first.destination_tx_hash.is_some());

    // No local precondition error on retry; deduplication is the bridge
    // contract's job (the mock accepts both).
    let second = harness.orchestrator.complete(&attested).await.unwrap();
    assert_eq!(second.status, TransferStatus::Completed);

    assert_eq!(harness.gateway.mints.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn complete_without_attestation_fails_the_precondition() {
    let harness = Harness::new();

    let mut attested = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();
    attested.attestation = None;

    let err = harness.orchestrator.complete(&attested).await.unwrap_err();
    assert!(matches!(err, TransferError::AttestationMissing));
    assert!(harness.gateway.mints.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mint_rejection_leaves_the_token_reusable() {
    let harness = Harness::new();

    let attested = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();

    harness.gateway.fail_mint.store(true, Ordering::Relaxed);
    let err = harness.orchestrator.complete(&attested).await.unwrap_err();
    assert!(matches!(err, TransferError::Mint(_)));

    harness.gateway.fail_mint.store(false, Ordering::Relaxed);
    let completed = harness.orchestrator.complete(&attested).await.unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);
}

#[tokio::test]
async fn resumption_token_round_trips_through_serde() {
    let harness = Harness::new();

    let attested = harness
        .orchestrator
        .initiate("ethereum", "base", "42.50", recipient(), sender(), fast_options())
        .await
        .unwrap();

    let json = serde_json::to_string(&attested).unwrap();
    let restored: stablebridge::CrossChainTransferResult = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, attested);

    let completed = harness.orchestrator.complete(&restored).await.unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);
}

#[tokio::test]
async fn auto_complete_runs_both_phases() {
    let harness = Harness::new();

    let completed = harness
        .orchestrator
        .auto_complete(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(completed.status, TransferStatus::Completed);
    assert_eq!(harness.gateway.burns.lock().unwrap().len(), 1);
    assert_eq!(harness.gateway.mints.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn lifecycle_events_fire_in_pipeline_order() {
    let harness = Harness::new();

    let attested = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();
    harness.orchestrator.complete(&attested).await.unwrap();

    assert_eq!(
        harness.recorded_events(),
        vec![
            "transfer.initiated",
            "transfer.burning",
            "transfer.attestation_pending",
            "transfer.ready_to_mint",
            "transfer.minting",
            "transfer.completed",
        ]
    );
}

#[tokio::test]
async fn progress_percentages_follow_the_state_machine() {
    let harness = Harness::new();
    let mut progress = harness.orchestrator.subscribe();

    let attested = harness
        .orchestrator
        .initiate(
            "ethereum",
            "base",
            "10",
            recipient(),
            sender(),
            TransferOptions::default(),
        )
        .await
        .unwrap();
    harness.orchestrator.complete(&attested).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = progress.try_recv() {
        seen.push((event.step, event.percent));
    }

    assert!(seen.contains(&(TransferStep::Burning, 10)));
    assert!(seen.contains(&(TransferStep::WaitingAttestation, 30)));
    assert!(seen.contains(&(TransferStep::ReadyToMint, 75)));
    assert!(seen.contains(&(TransferStep::Minting, 80)));
    assert!(seen.contains(&(TransferStep::Completed, 100)));

    let percents: Vec<u8> = seen.iter().map(|(_, percent)| *percent).collect();
    let mut sorted = percents.clone();
    sorted.sort_unstable();
    assert_eq!(percents, sorted, "progress must be monotone within one transfer");
}
