//! Scripted scenarios for `multirewards simulate`.
//!
//! A script seeds token balances and then runs a list of steps, each
//! optionally advancing the clock first:
//!
//! ```toml
//! start = 1_700_000_000
//!
//! [[balances]]
//! token = "0x1010101010101010101010101010101010101010"
//! holder = "0x2020202020202020202020202020202020202020"
//! amount = "10_000e18"
//!
//! [[steps]]
//! op = "fund"
//! caller = "0x2020202020202020202020202020202020202020"
//! token = "0x1010101010101010101010101010101010101010"
//! amount = "10_000e18"
//!
//! [[steps]]
//! advance = 86400
//! op = "claim_all"
//! account = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
//! ```
//!
//! Amounts are strings so they can exceed TOML's 64-bit integers.

use anyhow::{Context, Result};
use multirewards_engine::{LedgerEvent, MultiRewards, RewardsError};
use multirewards_nullables::{NullClock, NullTokenBank};
use multirewards_types::fixed::parse_amount;
use multirewards_types::{Address, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_amount(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Unix time of the first step.
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    pub token: Address,
    pub holder: Address,
    #[serde(deserialize_with = "amount")]
    pub amount: u128,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    /// Seconds to advance the clock before running the action.
    #[serde(default)]
    pub advance: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    Stake {
        account: Address,
        #[serde(deserialize_with = "amount")]
        amount: u128,
    },
    Withdraw {
        account: Address,
        #[serde(deserialize_with = "amount")]
        amount: u128,
    },
    Claim {
        account: Address,
        token: Address,
    },
    ClaimAll {
        account: Address,
    },
    Exit {
        account: Address,
    },
    Fund {
        caller: Address,
        token: Address,
        #[serde(deserialize_with = "amount")]
        amount: u128,
    },
    Recover {
        caller: Address,
        token: Address,
        #[serde(deserialize_with = "amount")]
        amount: u128,
    },
    Register {
        caller: Address,
        token: Address,
        distributor: Address,
        duration: u64,
    },
    SetDistributor {
        caller: Address,
        token: Address,
        distributor: Address,
    },
    SetDuration {
        caller: Address,
        token: Address,
        duration: u64,
    },
    SetPaused {
        caller: Address,
        paused: bool,
    },
    /// Report an account's unpaid rewards without changing state.
    Earned {
        account: Address,
        token: Address,
    },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Stake { .. } => "stake",
            Self::Withdraw { .. } => "withdraw",
            Self::Claim { .. } => "claim",
            Self::ClaimAll { .. } => "claim_all",
            Self::Exit { .. } => "exit",
            Self::Fund { .. } => "fund",
            Self::Recover { .. } => "recover",
            Self::Register { .. } => "register",
            Self::SetDistributor { .. } => "set_distributor",
            Self::SetDuration { .. } => "set_duration",
            Self::SetPaused { .. } => "set_paused",
            Self::Earned { .. } => "earned",
        }
    }
}

impl Script {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing scenario script")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

/// One line of simulation output.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Event {
        step: usize,
        at: u64,
        event: LedgerEvent,
    },
    Rejected {
        step: usize,
        at: u64,
        op: &'static str,
        error: String,
    },
    Earned {
        step: usize,
        at: u64,
        account: Address,
        token: Address,
        amount: u128,
    },
    Summary(Summary),
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub at: u64,
    pub total_staked: u128,
    pub paused: bool,
    pub streams: Vec<StreamSummary>,
    pub accounts: Vec<AccountSummary>,
}

#[derive(Debug, Serialize)]
pub struct StreamSummary {
    pub token: Address,
    pub distributor: Address,
    pub duration: u64,
    pub reward_rate: u128,
    pub period_finish: u64,
    pub custody_balance: u128,
}

#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub account: Address,
    pub staked: u128,
    /// Unpaid rewards per stream, in registry order.
    pub earned: Vec<u128>,
}

/// A ledger driven by a simulated clock and in-memory token custody.
pub struct Simulation {
    ledger: MultiRewards,
    bank: NullTokenBank,
    clock: NullClock,
    events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl Simulation {
    pub fn new(mut ledger: MultiRewards, script: &Script) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        ledger.subscribe(Box::new(move |e| {
            sink.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(e.clone())
        }));

        let mut bank = NullTokenBank::new();
        for balance in &script.balances {
            bank.mint(balance.token, balance.holder, balance.amount);
        }
        Self {
            ledger,
            bank,
            clock: NullClock::new(script.start),
            events,
        }
    }

    pub fn ledger(&self) -> &MultiRewards {
        &self.ledger
    }

    /// Run every step, returning the records they produced. Rejected steps are
    /// reported and the run continues.
    pub fn run(&mut self, steps: &[Step]) -> Vec<Record> {
        let mut records = Vec::new();
        for (idx, step) in steps.iter().enumerate() {
            let now = self.clock.advance(step.advance);
            match self.apply(&step.action, now) {
                Ok(Some(amount)) => {
                    if let Action::Earned { account, token } = &step.action {
                        records.push(Record::Earned {
                            step: idx,
                            at: now.as_secs(),
                            account: *account,
                            token: *token,
                            amount,
                        });
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(step = idx, op = step.action.name(), error = %e, "step rejected");
                    records.push(Record::Rejected {
                        step: idx,
                        at: now.as_secs(),
                        op: step.action.name(),
                        error: e.to_string(),
                    });
                }
            }
            let drained: Vec<LedgerEvent> = self
                .events
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .drain(..)
                .collect();
            records.extend(drained.into_iter().map(|event| Record::Event {
                step: idx,
                at: now.as_secs(),
                event,
            }));
        }
        records
    }

    fn apply(&mut self, action: &Action, now: Timestamp) -> Result<Option<u128>, RewardsError> {
        let ledger = &mut self.ledger;
        let bank = &mut self.bank;
        match action {
            Action::Stake { account, amount } => ledger.stake(bank, account, *amount, now)?,
            Action::Withdraw { account, amount } => ledger.withdraw(bank, account, *amount, now)?,
            Action::Claim { account, token } => {
                ledger.claim(bank, account, token, now)?;
            }
            Action::ClaimAll { account } => {
                ledger.claim_all(bank, account, now)?;
            }
            Action::Exit { account } => {
                ledger.exit(bank, account, now)?;
            }
            Action::Fund {
                caller,
                token,
                amount,
            } => {
                ledger.fund_stream(bank, caller, token, *amount, now)?;
            }
            Action::Recover {
                caller,
                token,
                amount,
            } => ledger.recover_foreign_asset(bank, caller, token, *amount)?,
            Action::Register {
                caller,
                token,
                distributor,
                duration,
            } => {
                ledger.register_stream(caller, *token, *distributor, *duration)?;
            }
            Action::SetDistributor {
                caller,
                token,
                distributor,
            } => ledger.set_rewards_distributor(caller, token, *distributor)?,
            Action::SetDuration {
                caller,
                token,
                duration,
            } => ledger.set_rewards_duration(caller, token, *duration, now)?,
            Action::SetPaused { caller, paused } => ledger.set_paused(caller, *paused)?,
            Action::Earned { account, token } => {
                return ledger.earned(account, token, now).map(Some);
            }
        }
        Ok(None)
    }

    pub fn summary(&self) -> Result<Summary, RewardsError> {
        let now = self.clock.now();
        let state = self.ledger.state();
        let streams = state
            .registry
            .iter()
            .map(|s| StreamSummary {
                token: s.token,
                distributor: s.distributor,
                duration: s.duration,
                reward_rate: s.reward_rate,
                period_finish: s.period_finish.as_secs(),
                custody_balance: self.bank.balance(&s.token, &state.custody),
            })
            .collect();

        let mut holders: Vec<Address> = state.principal.accounts().map(|(a, _)| *a).collect();
        holders.sort();
        let mut accounts = Vec::with_capacity(holders.len());
        for account in holders {
            let earned = state
                .registry
                .iter()
                .map(|s| self.ledger.earned(&account, &s.token, now))
                .collect::<Result<Vec<_>, _>>()?;
            accounts.push(AccountSummary {
                account,
                staked: self.ledger.balance_of(&account),
                earned,
            });
        }

        Ok(Summary {
            at: now.as_secs(),
            total_staked: self.ledger.total_supply(),
            paused: self.ledger.is_paused(),
            streams,
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multirewards_engine::LedgerConfig;

    const SCRIPT: &str = r#"
        start = 1000

        [[balances]]
        token = "0x1010101010101010101010101010101010101010"
        holder = "0x2020202020202020202020202020202020202020"
        amount = "604_800e18"

        [[balances]]
        token = "0x0202020202020202020202020202020202020202"
        holder = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
        amount = "1e18"

        [[steps]]
        op = "stake"
        account = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
        amount = "1e18"

        [[steps]]
        op = "fund"
        caller = "0x2020202020202020202020202020202020202020"
        token = "0x1010101010101010101010101010101010101010"
        amount = "604_800e18"

        [[steps]]
        advance = 10
        op = "earned"
        account = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
        token = "0x1010101010101010101010101010101010101010"

        [[steps]]
        op = "withdraw"
        account = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
        amount = "0"

        [[steps]]
        op = "claim_all"
        account = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
    "#;

    fn config() -> LedgerConfig {
        LedgerConfig::from_toml_str(
            r#"
            owner = "0x0101010101010101010101010101010101010101"
            staking_token = "0x0202020202020202020202020202020202020202"
            custody = "0x0303030303030303030303030303030303030303"

            [[streams]]
            token = "0x1010101010101010101010101010101010101010"
            distributor = "0x2020202020202020202020202020202020202020"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn parses_steps_and_amounts() {
        let script = Script::from_toml_str(SCRIPT).unwrap();
        assert_eq!(script.start, 1000);
        assert_eq!(script.balances[0].amount, 604_800 * 10u128.pow(18));
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[2].advance, 10);
        assert!(matches!(script.steps[3].action, Action::Withdraw { amount: 0, .. }));
    }

    #[test]
    fn rejects_bad_amount() {
        let bad = SCRIPT.replace("\"1e18\"", "\"lots\"");
        assert!(Script::from_toml_str(&bad).is_err());
    }

    #[test]
    fn run_reports_events_queries_and_rejections() {
        let script = Script::from_toml_str(SCRIPT).unwrap();
        let ledger = MultiRewards::from_config(&config()).unwrap();
        let mut sim = Simulation::new(ledger, &script);
        let records = sim.run(&script.steps);

        let earned: Vec<u128> = records
            .iter()
            .filter_map(|r| match r {
                Record::Earned { amount, .. } => Some(*amount),
                _ => None,
            })
            .collect();
        assert_eq!(earned, vec![10 * 10u128.pow(18)]);

        assert!(records.iter().any(|r| matches!(
            r,
            Record::Rejected { op: "withdraw", .. }
        )));
        let paid: Vec<u128> = records
            .iter()
            .filter_map(|r| match r {
                Record::Event {
                    event: LedgerEvent::RewardPaid { amount, .. },
                    ..
                } => Some(*amount),
                _ => None,
            })
            .collect();
        assert_eq!(paid, vec![10 * 10u128.pow(18)]);

        let summary = sim.summary().unwrap();
        assert_eq!(summary.at, 1010);
        assert_eq!(summary.total_staked, 10u128.pow(18));
        assert_eq!(summary.accounts[0].earned, vec![0]);
        assert_eq!(
            summary.streams[0].custody_balance,
            (604_800 - 10) * 10u128.pow(18)
        );
    }

    #[test]
    fn records_serialize_as_json_lines() {
        let record = Record::Event {
            step: 3,
            at: 99,
            event: LedgerEvent::PauseChanged { paused: true },
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"kind\":\"event\""));
        assert!(line.contains("\"event\":\"pause_changed\""));
    }
}
