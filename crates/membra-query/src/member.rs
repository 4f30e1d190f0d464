use membra_core::account::{AccountRecord, StakeState};
use membra_core::error::MembraError;
use membra_core::types::{Principal, Timestamp};
use membra_state::StateDb;

/// Query helpers for registered members.
pub struct MemberQuery<'a> {
    db: &'a StateDb,
}

impl<'a> MemberQuery<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    /// The member's record, if registered.
    pub fn get_user(&self, principal: &Principal) -> Result<Option<AccountRecord>, MembraError> {
        self.db.get_account(principal)
    }

    pub fn population(&self) -> Result<u64, MembraError> {
        self.db.population()
    }

    pub fn stake_state(&self, principal: &Principal) -> Result<StakeState, MembraError> {
        self.db
            .get_account(principal)?
            .map(|acc| acc.stake_state())
            .ok_or_else(|| MembraError::NotRegistered(principal.to_string()))
    }

    /// True once the member may unstake at `now`.
    pub fn can_unstake(&self, principal: &Principal, now: Timestamp) -> Result<bool, MembraError> {
        let acc = self
            .db
            .get_account(principal)?
            .ok_or_else(|| MembraError::NotRegistered(principal.to_string()))?;
        Ok(matches!(acc.unlocks_at(), Some(t) if now >= t))
    }

    /// Human-readable summary of a member's standing.
    pub fn describe(&self, principal: &Principal, now: Timestamp) -> Result<String, MembraError> {
        let acc = self
            .db
            .get_account(principal)?
            .ok_or_else(|| MembraError::NotRegistered(principal.to_string()))?;

        let status = match (acc.stake_state(), acc.unlocks_at()) {
            (StakeState::Staked { since }, Some(unlock_at)) => {
                let secs_remaining = unlock_at - now;
                if secs_remaining > 0 {
                    format!(
                        "Staked since {} | unlocks in {}d {}h",
                        since,
                        secs_remaining / 86_400,
                        (secs_remaining % 86_400) / 3_600
                    )
                } else {
                    format!("Staked since {} | matured, ready to unstake", since)
                }
            }
            _ => format!("Unstaked | owes {} to stake", acc.stake_requirement),
        };

        Ok(format!(
            "Member {} | type {} | stake {} of {} | registered at {} | {}",
            acc.principal,
            acc.account_type,
            acc.stake_amount,
            acc.stake_requirement,
            acc.registered_at,
            status
        ))
    }
}
