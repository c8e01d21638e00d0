//! Operation filter: allow-listing by kind, destination whitelist, and
//! rolling daily value caps with strict-less-than, non-poisoning
//! semantics (a denied operation never contributes to the running total).

use crate::operation::{Operation, Watermark, KIND_BALLOT, KIND_PROPOSALS, KIND_TRANSACTION};
use chrono::{Datelike, Local};
use num_bigint::BigUint;
use std::sync::Mutex;

/// Ballots and proposals contribute zero to the daily vote cap — neither
/// the original source nor the spec define a concrete per-vote cost, and
/// inventing one would be arbitrary (see DESIGN.md open-question ledger).
const VOTE_VALUE: u32 = 0;

/// Hard-coded daily cap on vote traffic, independent of the configurable
/// transaction daily max.
fn daily_vote_cap() -> BigUint {
    BigUint::from(100_000_000u64)
}

struct DailyCounter {
    day_key: Mutex<(String, BigUint)>,
}

impl DailyCounter {
    fn new() -> Self {
        DailyCounter {
            day_key: Mutex::new((String::new(), BigUint::from(0u32))),
        }
    }

    /// Returns true (and advances the running sum) iff `sum + value` would
    /// remain strictly less than `cap`. Resets the sum when the day
    /// changes. A denial never advances the sum — this prevents an
    /// oversized operation from permanently poisoning the counter.
    ///
    /// A poisoned mutex (some other request panicked while holding it) is
    /// treated as a denial rather than propagated as a panic, matching the
    /// poison-as-error convention the watermark stores use — a single bad
    /// request must not take the whole daemon down with it.
    fn allow_and_advance(&self, value: &BigUint, cap: &BigUint) -> bool {
        let today = today_key();
        let mut guard = match self.day_key.lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("daily counter mutex poisoned, denying operation");
                return false;
            }
        };
        if guard.0 != today {
            *guard = (today, BigUint::from(0u32));
        }
        let (_, ref mut sum) = *guard;
        let candidate = &*sum + value;
        if candidate < *cap {
            *sum = candidate;
            true
        } else {
            false
        }
    }
}

fn today_key() -> String {
    let now = Local::now();
    format!("{}-{}", now.year(), now.ordinal())
}

/// Configuration and running state for generic-operation policy.
pub struct OperationFilter {
    enable_generic: bool,
    enable_tx: bool,
    enable_voting: bool,
    tx_whitelist: Vec<[u8; 20]>,
    tx_daily_max: BigUint,
    tx_counter: DailyCounter,
    vote_counter: DailyCounter,
}

pub struct OperationFilterConfig {
    pub enable_generic: bool,
    pub enable_tx: bool,
    pub enable_voting: bool,
    pub tx_whitelist: Vec<[u8; 20]>,
    pub tx_daily_max: BigUint,
}

impl OperationFilter {
    #[must_use]
    pub fn new(config: OperationFilterConfig) -> Self {
        OperationFilter {
            enable_generic: config.enable_generic,
            enable_tx: config.enable_tx,
            enable_voting: config.enable_voting,
            tx_whitelist: config.tx_whitelist,
            tx_daily_max: config.tx_daily_max,
            tx_counter: DailyCounter::new(),
            vote_counter: DailyCounter::new(),
        }
    }

    /// `is_allowed(op)`: block/endorsement decisions are delegated to the
    /// watermark store and always pass here. Generic operations are
    /// classified by inner kind and checked against the configured
    /// sub-policies.
    pub fn is_allowed(&self, op: &Operation) -> bool {
        if op.watermark() != Watermark::Generic {
            return true;
        }

        let Some(generic) = op.generic() else {
            log::warn!("generic watermark byte but no generic view, denying");
            return false;
        };

        if self.enable_generic {
            return true;
        }

        match generic.kind() {
            KIND_TRANSACTION if self.enable_tx => {
                let destination = generic.transaction_destination();
                if !self.whitelisted(&destination) {
                    log::warn!("transaction destination {destination} not whitelisted");
                    return false;
                }
                let value = generic.transaction_value();
                let allowed = self.tx_counter.allow_and_advance(&value, &self.tx_daily_max);
                if !allowed {
                    log::warn!("transaction value {value} would exceed daily max");
                }
                allowed
            }
            KIND_BALLOT | KIND_PROPOSALS if self.enable_voting => {
                let value = BigUint::from(VOTE_VALUE);
                let allowed = self.vote_counter.allow_and_advance(&value, &daily_vote_cap());
                if !allowed {
                    log::warn!("vote would exceed daily cap");
                }
                allowed
            }
            other => {
                log::warn!("generic operation kind 0x{other:02x} denied by policy");
                false
            }
        }
    }

    fn whitelisted(&self, destination_hex: &str) -> bool {
        if self.tx_whitelist.is_empty() {
            return true;
        }
        if destination_hex.is_empty() {
            return false;
        }
        let Ok(bytes) = hex::decode(destination_hex) else {
            return false;
        };
        if bytes.len() != 20 {
            return false;
        }
        self.tx_whitelist.iter().any(|w| w.as_slice() == bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;

    fn transaction_op(destination: [u8; 20], fee: u8, amount: u8) -> Operation {
        let mut bytes = vec![0x03u8];
        bytes.extend_from_slice(&[0; 32]);
        bytes.push(KIND_TRANSACTION);
        bytes.extend_from_slice(&[0; 2]);
        bytes.extend_from_slice(&[1u8; 20]); // source
        bytes.push(fee);
        bytes.push(0x01); // counter
        bytes.push(0x01); // gas_limit
        bytes.push(0x01); // storage_limit
        bytes.push(amount);
        bytes.extend_from_slice(&[0; 2]); // padding
        bytes.extend_from_slice(&destination);
        bytes.push(0x00);
        Operation::parse(&format!("\"{}\"", hex::encode(&bytes)).into_bytes()).unwrap()
    }

    fn block_op() -> Operation {
        let mut bytes = vec![0x01u8];
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        Operation::parse(&format!("\"{}\"", hex::encode(&bytes)).into_bytes()).unwrap()
    }

    #[test]
    fn block_and_endorsement_always_allowed() {
        let filter = OperationFilter::new(OperationFilterConfig {
            enable_generic: false,
            enable_tx: false,
            enable_voting: false,
            tx_whitelist: vec![],
            tx_daily_max: BigUint::from(0u32),
        });
        assert!(filter.is_allowed(&block_op()));
    }

    #[test]
    fn transaction_denied_when_tx_disabled() {
        let filter = OperationFilter::new(OperationFilterConfig {
            enable_generic: false,
            enable_tx: false,
            enable_voting: false,
            tx_whitelist: vec![],
            tx_daily_max: BigUint::from(1_000_000u32),
        });
        assert!(!filter.is_allowed(&transaction_op([9u8; 20], 1, 1)));
    }

    #[test]
    fn transaction_allowed_when_tx_enabled_and_under_cap() {
        let filter = OperationFilter::new(OperationFilterConfig {
            enable_generic: false,
            enable_tx: true,
            enable_voting: false,
            tx_whitelist: vec![],
            tx_daily_max: BigUint::from(1_000_000u32),
        });
        assert!(filter.is_allowed(&transaction_op([9u8; 20], 1, 1)));
    }

    #[test]
    fn destination_not_whitelisted_is_denied() {
        let filter = OperationFilter::new(OperationFilterConfig {
            enable_generic: false,
            enable_tx: true,
            enable_voting: false,
            tx_whitelist: vec![[1u8; 20]],
            tx_daily_max: BigUint::from(1_000_000u32),
        });
        assert!(!filter.is_allowed(&transaction_op([9u8; 20], 1, 1)));
        assert!(filter.is_allowed(&transaction_op([1u8; 20], 1, 1)));
    }

    #[test]
    fn daily_cap_denies_without_poisoning_counter() {
        let filter = OperationFilter::new(OperationFilterConfig {
            enable_generic: false,
            enable_tx: true,
            enable_voting: false,
            tx_whitelist: vec![],
            tx_daily_max: BigUint::from(10u32),
        });
        // fee=0x09 + gas=1 + storage=1 + amount=0x09 -> value = 9+1+1+9 = 20 >= 10, denied
        assert!(!filter.is_allowed(&transaction_op([9u8; 20], 9, 9)));
        // a small one should still be allowed afterward since the big one never added
        assert!(filter.is_allowed(&transaction_op([9u8; 20], 1, 1)));
    }

    #[test]
    fn equal_to_cap_is_denied_strict_less_than() {
        let filter = OperationFilter::new(OperationFilterConfig {
            enable_generic: false,
            enable_tx: true,
            enable_voting: false,
            tx_whitelist: vec![],
            tx_daily_max: BigUint::from(4u32),
        });
        // fee=1 + gas=1 + storage=1 + amount=1 = 4, equals cap, denied
        assert!(!filter.is_allowed(&transaction_op([9u8; 20], 1, 1)));
    }
}
