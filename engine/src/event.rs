//! Events emitted by ledger operations.

use multirewards_types::Address;
use serde::Serialize;

/// Observable outcome of a successful operation. Failed operations emit nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Staked {
        account: Address,
        amount: u128,
    },
    Withdrawn {
        account: Address,
        amount: u128,
    },
    /// One per stream with a non-zero payout.
    RewardPaid {
        account: Address,
        token: Address,
        amount: u128,
    },
    /// A stream was funded; carries the new emission rate.
    RewardAdded {
        token: Address,
        reward_rate: u128,
    },
    Recovered {
        token: Address,
        amount: u128,
    },
    RewardsDurationUpdated {
        token: Address,
        duration: u64,
    },
    RewardsDistributorUpdated {
        token: Address,
        distributor: Address,
    },
    PauseChanged {
        paused: bool,
    },
}

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the thread performing the operation, after the
/// operation has committed.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&LedgerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emit_reaches_every_listener() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            bus.subscribe(Box::new(move |e| seen.lock().unwrap().push(e.clone())));
        }

        bus.emit(&LedgerEvent::PauseChanged { paused: true });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], LedgerEvent::PauseChanged { paused: true });
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = LedgerEvent::Staked {
            account: Address::repeat_byte(0x11),
            amount: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "staked");
        assert_eq!(json["amount"], 5);
    }
}
