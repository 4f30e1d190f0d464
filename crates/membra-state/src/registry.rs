use membra_core::account::AccountRecord;
use membra_core::error::MembraError;
use membra_core::request::{Outcome, Request};
use membra_core::types::{AccountType, Principal, Timestamp};
use tracing::{info, warn};

use crate::engine::{LedgerEngine, StagedMutations};
use crate::threshold;

impl LedgerEngine {
    // ── Register ──────────────────────────────────────────────────────────────

    /// Join the member set. The new member counts toward the band its own
    /// requirement is resolved from.
    pub(crate) fn register(
        &self,
        request: &Request,
        principal: &Principal,
        account_type: &str,
        staged: &mut StagedMutations,
        now: Timestamp,
    ) -> Result<Outcome, MembraError> {
        self.require_auth(request, principal)?;
        let account_type: AccountType = account_type.parse()?;

        if self.db.get_account(principal)?.is_some() {
            warn!(principal = %principal, "already registered; nothing to do");
            return Ok(Outcome::Unchanged);
        }

        let population = self
            .db
            .population()?
            .checked_add(1)
            .ok_or_else(|| MembraError::Other("population counter overflow".into()))?;
        let requirement = threshold::resolve_from(
            self.db.as_ref(),
            population,
            account_type,
            &self.config.stake_symbol,
        )?;

        info!(
            principal = %principal,
            %account_type,
            requirement = %requirement,
            population,
            "member registered"
        );
        staged
            .accounts
            .push(AccountRecord::new(principal.clone(), account_type, requirement, now));
        staged.population = Some(population);
        Ok(Outcome::Applied)
    }

    // ── Deregister ────────────────────────────────────────────────────────────

    /// Remove an unstaked member. Operator only.
    pub(crate) fn deregister(
        &self,
        request: &Request,
        principal: &Principal,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        self.require_auth(request, &self.config.operator)?;

        let account = self
            .db
            .get_account(principal)?
            .ok_or_else(|| MembraError::NotRegistered(principal.to_string()))?;
        if !account.stake_amount.is_zero() {
            return Err(MembraError::StillStaked(principal.to_string()));
        }

        let population = self.db.population()?.saturating_sub(1);
        info!(principal = %principal, population, "member deregistered");
        staged.removed_accounts.push(principal.clone());
        staged.population = Some(population);
        Ok(Outcome::Applied)
    }
}
