//! Integration tests exercising the node end to end:
//! deposits → delegation → governance → withdrawals → persistence.
//!
//! These tests wire the registry and governance through [`StakingNode`] with
//! nullable clock and payments, verifying the pieces work together and not
//! just in isolation.

use std::sync::{Arc, Mutex};

use stakereg_governance::{GovernanceEvent, ProposalStatus, ProposalTopic};
use stakereg_ledger::RegistryEvent;
use stakereg_node::{NodeConfig, NodeError, StakingNode};
use stakereg_nullables::{NullClock, NullPayment};
use stakereg_types::{Address, Amount, BlockHeight, ChainParams, Clock, ErrorKind, UNIT};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    node: StakingNode,
    clock: Arc<NullClock>,
    payments: Arc<NullPayment>,
}

fn harness() -> Harness {
    harness_with(ChainParams::default())
}

fn harness_with(params: ChainParams) -> Harness {
    let clock = Arc::new(NullClock::new(0));
    let payments = Arc::new(NullPayment::new());
    let node = StakingNode::new(params, payments.clone(), clock.clone()).expect("valid params");
    Harness {
        node,
        clock,
        payments,
    }
}

fn addr(name: &str) -> Address {
    Address::new(name)
}

fn units(n: u128) -> Amount {
    Amount::from_units(n)
}

fn half() -> Amount {
    Amount::new(UNIT / 2)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn validator_joins_grows_and_exits() {
    let h = harness();
    let v = addr("v");

    h.node.deposit_stake(&v, units(1)).unwrap();
    assert!(h.node.is_validator(&v));
    assert_eq!(h.node.stake_of(&v), units(1));

    h.node.deposit_stake(&v, units(1)).unwrap();
    assert_eq!(h.node.stake_of(&v), units(2));

    h.node.withdraw_stake(&v, units(2), &v).unwrap();
    assert!(!h.node.is_validator(&v));
    assert!(h.node.validator(&v).is_none());
    assert_eq!(h.node.registry().total_staked(), Amount::ZERO);
    assert_eq!(h.payments.paid_to(&v), units(2));
}

#[test]
fn delegation_backs_validator() {
    let h = harness();
    let (v, d) = (addr("v"), addr("d"));
    h.node.deposit_stake(&v, units(1)).unwrap();
    h.node.deposit_delegated_stake(&d, &v, units(1)).unwrap();

    assert_eq!(h.node.delegated_stake_of(&d, &v).unwrap(), units(1));
    let record = h.node.validator(&v).unwrap();
    assert_eq!(record.delegated_stake, units(1));
    assert_eq!(record.total_stake, units(2));
    assert_eq!(h.node.registry().total_stake_delegated(), units(1));
    assert_eq!(h.node.registry().total_bonded(), units(2));
    assert_eq!(h.node.registry().delegators_of(&v).unwrap(), vec![d]);
}

#[test]
fn delegator_spread_across_validators() {
    let h = harness();
    let (v1, v2, d) = (addr("v1"), addr("v2"), addr("d"));
    h.node.deposit_stake(&v1, units(1)).unwrap();
    h.node.deposit_stake(&v2, units(1)).unwrap();
    h.node.deposit_delegated_stake(&d, &v1, half()).unwrap();
    h.node.deposit_delegated_stake(&d, &v2, half()).unwrap();
    assert_eq!(h.node.delegator(&d).unwrap().total_delegated_stake, units(1));

    h.node.withdraw_delegated_stake(&d, &v1, half(), &d).unwrap();
    assert!(h.node.is_delegator(&d));
    assert!(h.node.registry().delegators_of(&v1).unwrap().is_empty());

    h.node.withdraw_delegated_stake(&d, &v2, half(), &d).unwrap();
    assert!(!h.node.is_delegator(&d));
    assert_eq!(h.node.registry().total_bonded(), units(2));
    h.node.registry().check_invariants().unwrap();
}

#[test]
fn overwithdraw_is_insufficient_balance() {
    let h = harness();
    let v = addr("v");
    h.node.deposit_stake(&v, units(1)).unwrap();
    let err = h.node.withdraw_stake(&v, units(2), &v).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    assert_eq!(h.node.stake_of(&v), units(1));
    assert!(h.payments.payments().is_empty());
}

#[test]
fn validator_cannot_exit_with_delegations() {
    let h = harness();
    let (v, d) = (addr("v"), addr("d"));
    h.node.deposit_stake(&v, units(1)).unwrap();
    h.node.deposit_delegated_stake(&d, &v, units(1)).unwrap();

    let err = h.node.withdraw_stake(&v, units(1), &v).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    // Partial withdrawal still works.
    h.node.withdraw_stake(&v, half(), &v).unwrap();
    assert!(h.node.is_validator(&v));
}

#[test]
fn failed_transfer_surfaces_after_ledger_update() {
    let h = harness();
    let v = addr("v");
    h.node.deposit_stake(&v, units(3)).unwrap();
    h.payments.set_failing(true);

    let err = h.node.withdraw_stake(&v, units(1), &v).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransferFailed);
    assert_eq!(h.node.stake_of(&v), units(2));
    assert_eq!(h.node.registry().total_bonded(), units(2));
    assert_eq!(h.payments.paid_to(&v), Amount::ZERO);
}

#[test]
fn registry_events_reach_subscribers() {
    let h = harness();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.node
        .subscribe_registry(move |e| sink.lock().unwrap().push(e.clone()));

    let (v, d) = (addr("v"), addr("d"));
    h.node.deposit_stake(&v, units(1)).unwrap();
    h.node.deposit_delegated_stake(&d, &v, units(1)).unwrap();
    let _ = h.node.withdraw_stake(&addr("nobody"), units(1), &v);

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&RegistryEvent::ValidatorAdded {
        validator: v.clone(),
        amount: units(1)
    }));
    assert!(seen.contains(&RegistryEvent::DelegatorAdded {
        delegator: d,
        validator: v,
        amount: units(1)
    }));
    assert!(seen
        .iter()
        .all(|e| !matches!(e, RegistryEvent::ValidatorDecreasedStake { .. })));
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

#[test]
fn early_quorum_passes_before_expiry() {
    let h = harness();
    let (a, b, c) = (addr("a"), addr("b"), addr("c"));
    h.node.deposit_stake(&a, units(60)).unwrap();
    h.node.deposit_stake(&b, units(30)).unwrap();
    h.node.deposit_stake(&c, units(10)).unwrap();

    h.clock.set(5);
    let id = h.node.create_proposal(&a, ProposalTopic::SlotSize, 20).unwrap();
    assert_eq!(id, 1);
    let proposal = h.node.proposal(id).unwrap();
    assert_eq!(proposal.vote_ends_at, BlockHeight::new(105));

    h.clock.advance(10);
    assert_eq!(h.node.vote_on_proposal(&a, id).unwrap(), ProposalStatus::Open);
    h.clock.advance(10);
    assert_eq!(h.node.vote_on_proposal(&c, id).unwrap(), ProposalStatus::Passed);
    assert!(!h.node.is_proposal_open(id));
    assert!(h.clock.now() < BlockHeight::new(105));
}

#[test]
fn proposal_without_quorum_fails_at_window_end() {
    let h = harness();
    let (a, b) = (addr("a"), addr("b"));
    h.node.deposit_stake(&a, units(50)).unwrap();
    h.node.deposit_stake(&b, units(50)).unwrap();
    let id = h.node.create_proposal(&a, ProposalTopic::EpochSize, 20).unwrap();
    h.node.vote_on_proposal(&a, id).unwrap();

    h.clock.set(99);
    assert_eq!(h.node.finalize(id).unwrap(), ProposalStatus::Open);
    h.clock.set(100);
    assert!(!h.node.is_proposal_open(id));
    assert_eq!(h.node.vote_on_proposal(&b, id).unwrap(), ProposalStatus::Failed);
    assert_eq!(h.node.finalize(id).unwrap(), ProposalStatus::Failed);
}

#[test]
fn out_of_range_penalty_is_invalid_argument() {
    let h = harness();
    let v = addr("v");
    h.node.deposit_stake(&v, units(1)).unwrap();
    let err = h
        .node
        .create_proposal(&v, ProposalTopic::Penalty, 150_000)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(h.node.proposal_count(), 0);
}

#[test]
fn double_vote_rejected() {
    let h = harness();
    let (a, b) = (addr("a"), addr("b"));
    h.node.deposit_stake(&a, units(1)).unwrap();
    h.node.deposit_stake(&b, units(9)).unwrap();
    let id = h.node.create_proposal(&b, ProposalTopic::Penalty, 3_000).unwrap();
    h.node.vote_on_proposal(&a, id).unwrap();
    let err = h.node.vote_on_proposal(&a, id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateVote);
}

#[test]
fn non_validators_cannot_propose_or_vote() {
    let h = harness();
    let (v, outsider) = (addr("v"), addr("outsider"));
    h.node.deposit_stake(&v, units(1)).unwrap();
    let err = h
        .node
        .create_proposal(&outsider, ProposalTopic::SlotSize, 5)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let id = h.node.create_proposal(&v, ProposalTopic::SlotSize, 5).unwrap();
    let err = h.node.vote_on_proposal(&outsider, id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn exited_validator_loses_vote() {
    let h = harness();
    let (a, b) = (addr("a"), addr("b"));
    h.node.deposit_stake(&a, units(1)).unwrap();
    h.node.deposit_stake(&b, units(1)).unwrap();
    let id = h.node.create_proposal(&a, ProposalTopic::SlotSize, 5).unwrap();
    h.node.withdraw_stake(&b, units(1), &b).unwrap();
    assert!(matches!(
        h.node.vote_on_proposal(&b, id),
        Err(NodeError::Governance(_))
    ));
    // a now holds all stake.
    assert_eq!(h.node.vote_on_proposal(&a, id).unwrap(), ProposalStatus::Passed);
}

#[test]
fn only_proposer_cancels_while_open() {
    let h = harness();
    let (a, b) = (addr("a"), addr("b"));
    h.node.deposit_stake(&a, units(1)).unwrap();
    h.node.deposit_stake(&b, units(1)).unwrap();
    let id = h.node.create_proposal(&a, ProposalTopic::VoteQuorum, 50_000).unwrap();

    let err = h.node.cancel_proposal(&b, id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    h.node.cancel_proposal(&a, id).unwrap();
    assert_eq!(h.node.proposal(id).unwrap().status, ProposalStatus::Cancelled);
    let err = h.node.vote_on_proposal(&b, id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
}

#[test]
fn registry_address_proposal_carries_address() {
    let h = harness();
    let v = addr("v");
    h.node.deposit_stake(&v, units(1)).unwrap();
    let err = h
        .node
        .create_proposal(&v, ProposalTopic::RegistryAddress, 7)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let id = h
        .node
        .create_address_proposal(&v, ProposalTopic::RegistryAddress, addr("registry-2"))
        .unwrap();
    assert_eq!(h.node.vote_on_proposal(&v, id).unwrap(), ProposalStatus::Passed);
}

#[test]
fn governance_events_reach_subscribers() {
    let h = harness();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.node
        .subscribe_governance(move |e| sink.lock().unwrap().push(e.clone()));

    let v = addr("v");
    h.node.deposit_stake(&v, units(1)).unwrap();
    let id = h.node.create_proposal(&v, ProposalTopic::SlotSize, 5).unwrap();
    h.node.vote_on_proposal(&v, id).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(
        seen[2],
        GovernanceEvent::ProposalFinalized {
            id,
            status: ProposalStatus::Passed
        }
    );
}

#[test]
fn governance_listener_can_read_the_node() {
    let h = harness();
    let node = Arc::new(h.node);
    let handle: Arc<Mutex<std::sync::Weak<StakingNode>>> =
        Arc::new(Mutex::new(std::sync::Weak::new()));
    *handle.lock().unwrap() = Arc::downgrade(&node);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let reader = Arc::clone(&handle);
    node.subscribe_governance(move |e| {
        let Some(node) = reader.lock().unwrap().upgrade() else {
            return;
        };
        let id = match e {
            GovernanceEvent::ProposalCreated { id, .. }
            | GovernanceEvent::VoteCast { id, .. }
            | GovernanceEvent::ProposalFinalized { id, .. }
            | GovernanceEvent::ProposalCancelled { id } => *id,
        };
        let status = node.proposal(id).map(|p| p.status);
        sink.lock().unwrap().push((node.proposal_count(), status));
    });

    let v = addr("v");
    node.deposit_stake(&v, units(1)).unwrap();
    let id = node.create_proposal(&v, ProposalTopic::SlotSize, 5).unwrap();
    node.vote_on_proposal(&v, id).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], (1, Some(ProposalStatus::Open)));
    assert_eq!(seen[2], (1, Some(ProposalStatus::Passed)));
}

#[test]
fn new_params_apply_to_later_proposals() {
    let h = harness();
    let v = addr("v");
    h.node.deposit_stake(&v, units(1)).unwrap();

    let mut params = h.node.params();
    params.vote_time_period = 10;
    h.node.set_params(params).unwrap();
    let id = h.node.create_proposal(&v, ProposalTopic::SlotSize, 5).unwrap();
    assert_eq!(h.node.proposal(id).unwrap().vote_ends_at, BlockHeight::new(10));

    let mut bad = h.node.params();
    bad.vote_quorum = 0;
    let err = h.node.set_params(bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

// ---------------------------------------------------------------------------
// Configuration and persistence
// ---------------------------------------------------------------------------

#[test]
fn node_starts_from_toml_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("node.toml");
    std::fs::write(
        &path,
        r#"
            log_level = "debug"

            [params]
            vote_time_period = 7
        "#,
    )
    .unwrap();

    let config = NodeConfig::from_toml_file(&path).unwrap();
    config.init_logging();
    let clock = Arc::new(NullClock::new(0));
    let node = StakingNode::from_config(&config, Arc::new(NullPayment::new()), clock).unwrap();
    assert_eq!(node.params().vote_time_period, 7);
}

#[test]
fn invalid_params_refuse_to_start() {
    let config = NodeConfig::from_toml_str("[params]\npenalty = 150000").unwrap();
    let result = StakingNode::from_config(
        &config,
        Arc::new(NullPayment::new()),
        Arc::new(NullClock::new(0)),
    );
    assert!(matches!(result, Err(NodeError::Params(_))));
}

#[test]
fn state_survives_restart() {
    let h = harness();
    let (a, b, d) = (addr("a"), addr("b"), addr("d"));
    h.node.deposit_stake(&a, units(1)).unwrap();
    h.node.deposit_stake(&b, units(3)).unwrap();
    h.node.deposit_delegated_stake(&d, &a, units(2)).unwrap();
    let id = h.node.create_proposal(&a, ProposalTopic::SlotSize, 5).unwrap();
    h.node.vote_on_proposal(&a, id).unwrap();

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("state.bin");
    h.node.save_state(&path).unwrap();

    let restarted =
        StakingNode::load_state(&path, h.payments.clone(), h.clock.clone()).unwrap();
    assert_eq!(restarted.registry().validators(), h.node.registry().validators());
    assert_eq!(restarted.delegated_stake_of(&d, &a).unwrap(), units(2));
    assert_eq!(restarted.registry().total_bonded(), units(6));
    assert_eq!(restarted.vote_on_proposal(&b, id).unwrap(), ProposalStatus::Passed);
}

#[test]
fn missing_state_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = StakingNode::load_state(
        dir.path().join("absent.bin"),
        Arc::new(NullPayment::new()),
        Arc::new(NullClock::new(0)),
    );
    assert!(matches!(result, Err(NodeError::Io(_))));
}
