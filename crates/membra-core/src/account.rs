use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::HOLD_PERIOD_SECS;
use crate::types::{AccountType, Asset, Principal, Timestamp};

// ── StakeState ───────────────────────────────────────────────────────────────

/// Per-account position in the staking lifecycle.
///
///   Unstaked ──(exact deposit)──▶ Staked ──(unstake after hold)──▶ Unstaked
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StakeState {
    Unstaked,
    Staked { since: Timestamp },
}

// ── AccountRecord ────────────────────────────────────────────────────────────

/// Membership record of one registered principal, as stored in the state DB.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AccountRecord {
    pub principal: Principal,
    pub account_type: AccountType,
    /// Either zero or exactly `stake_requirement`; never anything between.
    pub stake_amount: Asset,
    /// Resolved once at registration from the population band; immutable.
    pub stake_requirement: Asset,
    pub registered_at: Timestamp,
    /// `None` while not staked.
    pub staked_at: Option<Timestamp>,
}

impl AccountRecord {
    pub fn new(
        principal: Principal,
        account_type: AccountType,
        stake_requirement: Asset,
        registered_at: Timestamp,
    ) -> Self {
        Self {
            principal,
            account_type,
            stake_amount: Asset::zero(stake_requirement.symbol.clone()),
            stake_requirement,
            registered_at,
            staked_at: None,
        }
    }

    pub fn stake_state(&self) -> StakeState {
        match self.staked_at {
            Some(since) => StakeState::Staked { since },
            None => StakeState::Unstaked,
        }
    }

    pub fn is_staked(&self) -> bool {
        self.staked_at.is_some()
    }

    /// Earliest time an unstake is accepted, if currently staked. Saturates
    /// at `Timestamp::MAX` rather than wrapping into the past.
    pub fn unlocks_at(&self) -> Option<Timestamp> {
        self.staked_at.map(|t| t.saturating_add(HOLD_PERIOD_SECS))
    }
}

// ── StakeBand ────────────────────────────────────────────────────────────────

/// One row of the stake-requirement table: from `threshold` registered
/// accounts upward (until the next band), each account type owes the listed
/// stake.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StakeBand {
    pub threshold: u64,
    pub requirements: BTreeMap<AccountType, Asset>,
}

impl StakeBand {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            requirements: BTreeMap::new(),
        }
    }

    pub fn with(mut self, account_type: AccountType, requirement: Asset) -> Self {
        self.requirements.insert(account_type, requirement);
        self
    }
}
