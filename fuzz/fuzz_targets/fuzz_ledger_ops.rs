#![no_main]

use libfuzzer_sys::fuzz_target;

use multirewards_engine::MultiRewards;
use multirewards_nullables::NullTokenBank;
use multirewards_types::{Address, Timestamp};

// Drive the ledger with arbitrary operation sequences. Rejections are fine;
// panics and broken conservation are not.
fuzz_target!(|data: &[u8]| {
    let owner = Address::repeat_byte(0x01);
    let stake_token = Address::repeat_byte(0x02);
    let custody = Address::repeat_byte(0x03);
    let distributor = Address::repeat_byte(0x20);
    let tokens = [Address::repeat_byte(0x10), Address::repeat_byte(0x11)];

    let mut ledger = MultiRewards::new(owner, stake_token, custody);
    let mut bank = NullTokenBank::new();
    for token in tokens {
        let _ = ledger.register_stream(&owner, token, distributor, 3_600);
        bank.mint(token, distributor, u128::MAX / 4);
    }
    for n in 0..4u8 {
        bank.mint(stake_token, Address::repeat_byte(0x40 + n), u128::MAX / 8);
    }

    let mut now = 0u64;
    let mut funded = [0u128; 2];
    for chunk in data.chunks_exact(12) {
        let op = chunk[0] % 8;
        let who = Address::repeat_byte(0x40 + chunk[1] % 4);
        let token = tokens[usize::from(chunk[1] >> 7)];
        let dt = u64::from(u16::from_le_bytes([chunk[2], chunk[3]]));
        let amount = u128::from(u64::from_le_bytes([
            chunk[4], chunk[5], chunk[6], chunk[7],
            chunk[8], chunk[9], chunk[10], chunk[11],
        ]));
        now += dt;
        let t = Timestamp::new(now);

        match op {
            0 => { let _ = ledger.stake(&mut bank, &who, amount, t); }
            1 => { let _ = ledger.withdraw(&mut bank, &who, amount, t); }
            2 => { let _ = ledger.claim(&mut bank, &who, &token, t); }
            3 => { let _ = ledger.claim_all(&mut bank, &who, t); }
            4 => { let _ = ledger.exit(&mut bank, &who, t); }
            5 => {
                if ledger.fund_stream(&mut bank, &distributor, &token, amount, t).is_ok() {
                    funded[usize::from(chunk[1] >> 7)] += amount;
                }
            }
            6 => { let _ = ledger.set_rewards_duration(&distributor, &token, 1 + dt, t); }
            _ => { let _ = ledger.sync_all(Some(&who), t); }
        }

        assert!(ledger.state().principal.is_conserved());
        assert_eq!(bank.balance(&stake_token, &custody), ledger.total_supply());
        for (i, token) in tokens.iter().enumerate() {
            assert!(bank.balance(token, &custody) <= funded[i]);
        }
    }
});
