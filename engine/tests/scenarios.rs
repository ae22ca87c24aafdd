//! End-to-end ledger scenarios with known numeric outcomes.

use std::sync::{Arc, Mutex};

use multirewards_engine::{LedgerEvent, LedgerService, MultiRewards, RewardsError};
use multirewards_nullables::{NullClock, NullStore, NullTokenBank};
use multirewards_types::{Address, Timestamp, SCALE, U256};

const WEEK: u64 = 604_800;
const FUNDING: u128 = 10_000 * SCALE;
const WEEKLY_RATE: u128 = 16_534_391_534_391_534;

fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn owner() -> Address {
    addr(0x01)
}

fn stake_token() -> Address {
    addr(0x02)
}

fn custody() -> Address {
    addr(0x03)
}

fn dai() -> Address {
    addr(0x10)
}

fn snx() -> Address {
    addr(0x11)
}

fn distributor() -> Address {
    addr(0x20)
}

fn alice() -> Address {
    addr(0xa1)
}

fn bob() -> Address {
    addr(0xb0)
}

struct Fixture {
    ledger: MultiRewards,
    bank: NullTokenBank,
    clock: NullClock,
    events: Arc<Mutex<Vec<LedgerEvent>>>,
}

fn fixture() -> Fixture {
    let mut ledger = MultiRewards::new(owner(), stake_token(), custody());
    ledger
        .register_stream(&owner(), dai(), distributor(), WEEK)
        .unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    ledger.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

    let mut bank = NullTokenBank::new();
    for token in [dai(), snx()] {
        bank.mint(token, distributor(), 1_000_000 * SCALE);
    }
    for who in [alice(), bob()] {
        bank.mint(stake_token(), who, 1_000_000 * SCALE);
    }
    Fixture {
        ledger,
        bank,
        clock: NullClock::new(1_700_000_000),
        events,
    }
}

#[test]
fn funding_with_no_stakers_sets_schedule() {
    let mut f = fixture();
    let now = f.clock.now();
    let rate = f
        .ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), FUNDING, now)
        .unwrap();

    assert_eq!(rate, WEEKLY_RATE);
    let stream = f.ledger.reward_data(&dai()).unwrap();
    assert_eq!(stream.reward_rate, FUNDING / u128::from(WEEK));
    assert_eq!(stream.reward_per_token_stored, U256::zero());
    assert_eq!(stream.period_finish.as_secs(), now.as_secs() + WEEK);
    assert_eq!(stream.last_update_time, now);
    assert_eq!(
        f.ledger.reward_for_duration(&dai()).unwrap(),
        WEEKLY_RATE * u128::from(WEEK)
    );
    assert_eq!(
        f.events.lock().unwrap().as_slice(),
        &[LedgerEvent::RewardAdded {
            token: dai(),
            reward_rate: WEEKLY_RATE,
        }]
    );
}

#[test]
fn single_staker_earns_full_period_minus_dust() {
    let mut f = fixture();
    let start = f.clock.now();
    f.ledger
        .stake(&mut f.bank, &alice(), FUNDING, start)
        .unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), FUNDING, start)
        .unwrap();
    assert_eq!(f.ledger.earned(&alice(), &dai(), start).unwrap(), 0);

    let end = f.clock.advance(WEEK);
    let earned = f.ledger.earned(&alice(), &dai(), end).unwrap();
    assert_eq!(earned, 9_999_999_999_999_999_760_000);
    let scheduled = WEEKLY_RATE * u128::from(WEEK);
    assert!(earned <= scheduled);
    assert!(scheduled - earned < 10_000);

    // Past the period finish nothing more accrues.
    let later = f.clock.advance(WEEK);
    assert_eq!(f.ledger.earned(&alice(), &dai(), later).unwrap(), earned);
    assert_eq!(f.ledger.last_time_reward_applicable(&dai(), later).unwrap(), end);
}

#[test]
fn exit_one_second_after_staking() {
    let mut f = fixture();
    let t = f.clock.now();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), FUNDING, t)
        .unwrap();
    let t1 = f.clock.advance(1);
    f.ledger.stake(&mut f.bank, &alice(), FUNDING, t1).unwrap();
    let t2 = f.clock.advance(1);

    let outcome = f.ledger.exit(&mut f.bank, &alice(), t2).unwrap();
    assert_eq!(outcome.withdrawn, FUNDING);
    assert_eq!(outcome.payouts[0].amount, 16_534_391_534_390_000);
    assert_eq!(
        f.ledger.reward_per_token(&dai(), t2).unwrap(),
        U256::from(1_653_439_153_439u64)
    );

    let events = f.events.lock().unwrap();
    assert_eq!(
        &events[1..],
        &[
            LedgerEvent::Staked {
                account: alice(),
                amount: FUNDING,
            },
            LedgerEvent::Withdrawn {
                account: alice(),
                amount: FUNDING,
            },
            LedgerEvent::RewardPaid {
                account: alice(),
                token: dai(),
                amount: 16_534_391_534_390_000,
            },
        ]
    );
}

#[test]
fn principal_token_is_never_recoverable() {
    let mut f = fixture();
    for amount in [0, 1, FUNDING] {
        let result = f
            .ledger
            .recover_foreign_asset(&mut f.bank, &owner(), &stake_token(), amount);
        assert!(matches!(result, Err(RewardsError::ProtectedAsset(t)) if t == stake_token()));
    }
    assert!(f.events.lock().unwrap().is_empty());
}

#[test]
fn second_registration_is_rejected() {
    let mut f = fixture();
    let result = f
        .ledger
        .register_stream(&owner(), dai(), distributor(), 10_000);
    assert!(matches!(result, Err(RewardsError::AlreadyRegistered(t)) if t == dai()));
    assert_eq!(f.ledger.reward_data(&dai()).unwrap().duration, WEEK);
    assert_eq!(f.ledger.reward_token_length(), 1);
}

#[test]
fn withdraw_validation() {
    let mut f = fixture();
    let now = f.clock.now();
    f.ledger.stake(&mut f.bank, &alice(), 500, now).unwrap();

    assert!(matches!(
        f.ledger.withdraw(&mut f.bank, &alice(), 0, now),
        Err(RewardsError::InvalidAmount)
    ));
    assert!(matches!(
        f.ledger.withdraw(&mut f.bank, &alice(), 501, now),
        Err(RewardsError::InsufficientBalance {
            requested: 501,
            available: 500
        })
    ));
    assert_eq!(f.ledger.balance_of(&alice()), 500);
    assert!(matches!(
        f.ledger.stake(&mut f.bank, &alice(), 0, now),
        Err(RewardsError::InvalidAmount)
    ));
}

#[test]
fn equal_stakers_split_evenly() {
    let mut f = fixture();
    let start = f.clock.now();
    let half = FUNDING / 2;
    f.ledger.stake(&mut f.bank, &alice(), half, start).unwrap();
    f.ledger.stake(&mut f.bank, &bob(), half, start).unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), FUNDING, start)
        .unwrap();

    let end = f.clock.advance(WEEK);
    let a = f.ledger.claim(&mut f.bank, &alice(), &dai(), end).unwrap().unwrap();
    let b = f.ledger.claim(&mut f.bank, &bob(), &dai(), end).unwrap().unwrap();

    assert_eq!(a.amount, b.amount);
    assert_eq!(a.amount, 4_999_999_999_999_999_880_000);
    assert!(half - a.amount < 1_000_000);
    assert_eq!(f.bank.balance(&dai(), &alice()), a.amount);
}

#[test]
fn staggered_stakers_split_by_time() {
    let mut f = fixture();
    let start = f.clock.now();
    f.ledger.stake(&mut f.bank, &alice(), SCALE, start).unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), 604_800 * SCALE, start)
        .unwrap();

    // Alice alone for half the week, then Bob matches her stake.
    let mid = f.clock.advance(WEEK / 2);
    f.ledger.stake(&mut f.bank, &bob(), SCALE, mid).unwrap();
    let end = f.clock.advance(WEEK / 2);

    let alice_earned = f.ledger.earned(&alice(), &dai(), end).unwrap();
    let bob_earned = f.ledger.earned(&bob(), &dai(), end).unwrap();
    assert_eq!(alice_earned, 453_600 * SCALE);
    assert_eq!(bob_earned, 151_200 * SCALE);
}

#[test]
fn two_streams_pay_independently() {
    let mut f = fixture();
    f.ledger
        .register_stream(&owner(), snx(), distributor(), WEEK / 7)
        .unwrap();
    let start = f.clock.now();
    f.ledger.stake(&mut f.bank, &alice(), SCALE, start).unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), 604_800, start)
        .unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &snx(), 86_400 * 3, start)
        .unwrap();

    let now = f.clock.advance(100_000);
    let payouts = f.ledger.claim_all(&mut f.bank, &alice(), now).unwrap();
    assert_eq!(payouts.len(), 2);
    assert_eq!(payouts[0].token, dai());
    assert_eq!(payouts[0].amount, 100_000);
    assert_eq!(payouts[1].token, snx());
    assert_eq!(payouts[1].amount, 86_400 * 3);

    // Nothing left to claim at the same instant.
    assert!(f.ledger.claim_all(&mut f.bank, &alice(), now).unwrap().is_empty());
}

#[test]
fn refunding_mid_period_rolls_over() {
    let mut f = fixture();
    let start = f.clock.now();
    f.ledger.stake(&mut f.bank, &alice(), SCALE, start).unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), 604_800, start)
        .unwrap();
    let mid = f.clock.advance(WEEK / 2);
    let rate = f
        .ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), 302_400 + 604_800, mid)
        .unwrap();
    assert_eq!(rate, 2);

    let end = f.clock.advance(WEEK);
    let earned = f.ledger.earned(&alice(), &dai(), end).unwrap();
    assert_eq!(earned, 302_400 + 2 * 604_800);
    assert_eq!(f.bank.balance(&dai(), &custody()), 604_800 + 302_400 + 604_800);
}

#[test]
fn failed_batch_leaves_ledger_untouched() {
    let mut f = fixture();
    let start = f.clock.now();
    f.ledger.stake(&mut f.bank, &alice(), SCALE, start).unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), 604_800, start)
        .unwrap();
    let now = f.clock.advance(1_000);
    let events_before = f.events.lock().unwrap().len();

    // Custody lost the reward tokens: the principal leg would succeed but the
    // reward leg cannot, so exit must fail as a whole.
    f.bank.burn(dai(), custody(), 604_800);
    let result = f.ledger.exit(&mut f.bank, &alice(), now);
    assert!(matches!(result, Err(RewardsError::Token(_))));

    assert_eq!(f.ledger.balance_of(&alice()), SCALE);
    assert_eq!(f.ledger.total_supply(), SCALE);
    assert_eq!(f.bank.balance(&stake_token(), &custody()), SCALE);
    assert_eq!(f.ledger.earned(&alice(), &dai(), now).unwrap(), 1_000);
    assert_eq!(f.ledger.rewards(&alice(), &dai()).unwrap(), 0);
    assert_eq!(f.events.lock().unwrap().len(), events_before);
}

#[test]
fn persisted_ledger_continues_accruing() {
    let mut f = fixture();
    let start = f.clock.now();
    f.ledger.stake(&mut f.bank, &alice(), SCALE, start).unwrap();
    f.ledger
        .fund_stream(&mut f.bank, &distributor(), &dai(), 604_800, start)
        .unwrap();
    let mid = f.clock.advance(1_000);
    f.ledger.sync_all(Some(&alice()), mid).unwrap();

    let store = NullStore::new();
    f.ledger.save_to_store(&store).unwrap();
    let mut restored = MultiRewards::load_from_store(&store).unwrap();

    let end = f.clock.advance(500);
    let payout = restored
        .claim(&mut f.bank, &alice(), &dai(), end)
        .unwrap()
        .unwrap();
    assert_eq!(payout.amount, 1_500);
}

#[test]
fn service_serializes_concurrent_participants() {
    let f = fixture();
    let start = f.clock.now();
    let service = Arc::new(LedgerService::new(f.ledger, f.bank));
    service
        .fund_stream(&distributor(), &dai(), 604_800 * SCALE, start)
        .unwrap();

    let handles: Vec<_> = [alice(), bob()]
        .into_iter()
        .map(|who| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    service.stake(&who, SCALE, start).unwrap();
                    service.withdraw(&who, SCALE / 2, start).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let end = Timestamp::new(start.as_secs() + WEEK);
    let a = service.claim(&alice(), &dai(), end).unwrap().unwrap();
    let b = service.claim(&bob(), &dai(), end).unwrap().unwrap();
    assert_eq!(a.amount, b.amount);
    assert!(a.amount + b.amount <= 604_800 * SCALE);
    service.with_ledger(|ledger| {
        assert_eq!(ledger.total_supply(), 50 * SCALE);
        assert!(ledger.state().principal.is_conserved());
    });
}
