#![no_main]

use libfuzzer_sys::fuzz_target;

use multirewards_engine::MultiRewards;
use multirewards_nullables::NullStore;
use multirewards_store::LedgerStore;
use multirewards_types::Address;

// Loading arbitrary stored records must fail cleanly, never panic.
fuzz_target!(|data: &[u8]| {
    let store = NullStore::new();
    let mut parts = data.split(|b| *b == 0xff);
    if let Some(meta) = parts.next() {
        let _ = store.put_meta(b"ledger", meta);
    }
    if let Some(stream) = parts.next() {
        let _ = store.put_stream(0, stream);
    }
    for (n, account) in parts.enumerate() {
        let _ = store.put_account(&Address::repeat_byte(n as u8), account);
    }
    let _ = MultiRewards::load_from_store(&store);
});
