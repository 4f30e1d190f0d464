use membra_core::constants::{HOLD_PERIOD_SECS, REFUND_MEMO};
use membra_core::error::MembraError;
use membra_core::host::OutboundTransfer;
use membra_core::request::{Deposit, Outcome, Request};
use membra_core::types::{Asset, Principal, Timestamp};
use tracing::{debug, info};

use crate::engine::{LedgerEngine, StagedMutations};

impl LedgerEngine {
    // ── Deposit ───────────────────────────────────────────────────────────────

    /// Fund the sender's stake. Only an exact match of the requirement is
    /// accepted, and only once until it is unstaked.
    pub(crate) fn deposit(
        &self,
        deposit: &Deposit,
        staged: &mut StagedMutations,
        now: Timestamp,
    ) -> Result<Outcome, MembraError> {
        // Our own refunds echo back through the same notification path.
        if deposit.from == self.config.system || deposit.to != self.config.system {
            debug!(from = %deposit.from, to = %deposit.to, "deposit not addressed to us; ignored");
            return Ok(Outcome::Ignored);
        }

        let mut account = self
            .db
            .get_account(&deposit.from)?
            .ok_or_else(|| MembraError::NotRegistered(deposit.from.to_string()))?;
        if account.is_staked() {
            return Err(MembraError::AlreadyStaked(deposit.from.to_string()));
        }
        if deposit.quantity != account.stake_requirement {
            return Err(MembraError::StakeMismatch {
                expected: account.stake_requirement.to_string(),
                got: deposit.quantity.to_string(),
            });
        }

        let unlock_at = now
            .checked_add(HOLD_PERIOD_SECS)
            .ok_or(MembraError::TimeOutOfRange(now))?;

        account.stake_amount = account.stake_amount.checked_add(&deposit.quantity)?;
        account.staked_at = Some(now);
        info!(
            principal = %account.principal,
            stake = %account.stake_amount,
            unlock_at,
            "stake locked"
        );
        staged.accounts.push(account);
        Ok(Outcome::Applied)
    }

    // ── Unstake ───────────────────────────────────────────────────────────────

    /// Return a matured stake. The refund is staged; the engine either sends
    /// it before committing the reset or queues it in the same commit.
    pub(crate) fn unstake(
        &self,
        request: &Request,
        principal: &Principal,
        staged: &mut StagedMutations,
        now: Timestamp,
    ) -> Result<Outcome, MembraError> {
        self.require_auth(request, principal)?;

        let mut account = self
            .db
            .get_account(principal)?
            .ok_or_else(|| MembraError::NotRegistered(principal.to_string()))?;
        if account.stake_amount.is_zero() {
            return Err(MembraError::NothingStaked(principal.to_string()));
        }
        if let Some(unlock_at) = account.unlocks_at() {
            if now < unlock_at {
                return Err(MembraError::HoldNotElapsed { unlock_at });
            }
        }

        let refund = OutboundTransfer {
            from: self.config.system.clone(),
            to: principal.clone(),
            quantity: account.stake_amount.clone(),
            memo: REFUND_MEMO.to_string(),
        };
        info!(principal = %principal, quantity = %refund.quantity, "stake released");

        account.stake_amount = Asset::zero(account.stake_amount.symbol.clone());
        account.staked_at = None;
        staged.refunds.push(refund);
        staged.accounts.push(account);
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::engine::LedgerEngine;
    use crate::testutil::*;
    use membra_core::account::StakeState;
    use membra_core::constants::{HOLD_PERIOD_SECS, REFUND_MEMO};
    use membra_core::error::MembraError;
    use membra_core::host::{CurrencyLedger, OutboundTransfer};
    use membra_core::request::{Action, Deposit, Outcome, Request};
    use membra_core::types::Asset;

    fn deposit(from: &str, to: &str, quantity: &str) -> Request {
        Request::new(Action::Deposit(Deposit {
            from: p(from),
            to: p(to),
            quantity: asset(quantity),
            memo: String::new(),
        }))
    }

    fn unstake_req(who: &str) -> Request {
        signed(Action::Unstake { principal: p(who) }, &p(who))
    }

    fn staked_alice(name: &str) -> LedgerEngine {
        let engine = test_engine(name);
        engine.apply(&register_req(&p("alice"), "e"), NOW).unwrap();
        engine.apply(&deposit("alice", "membra", "10.0000 TLOS"), NOW).unwrap();
        engine
    }

    struct FailingLedger;

    impl CurrencyLedger for FailingLedger {
        fn send(&self, _transfer: &OutboundTransfer) -> Result<(), MembraError> {
            Err(MembraError::Other("base ledger unavailable".into()))
        }
    }

    #[test]
    fn exact_deposit_stakes() {
        let engine = staked_alice("stake_exact");
        let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        assert_eq!(rec.stake_amount, asset("10.0000 TLOS"));
        assert_eq!(rec.stake_state(), StakeState::Staked { since: NOW });
    }

    #[test]
    fn off_by_one_deposits_are_rejected() {
        let engine = test_engine("stake_mismatch");
        engine.apply(&register_req(&p("alice"), "e"), NOW).unwrap();
        for q in ["9.9999 TLOS", "10.0001 TLOS", "10.000 TLOS"] {
            let err = engine.apply(&deposit("alice", "membra", q), NOW).unwrap_err();
            assert!(matches!(err, MembraError::StakeMismatch { .. }), "{q}");
        }
        let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        assert!(rec.stake_amount.is_zero());
        assert!(!rec.is_staked());
    }

    #[test]
    fn second_deposit_is_rejected() {
        let engine = staked_alice("stake_twice");
        let err = engine
            .apply(&deposit("alice", "membra", "10.0000 TLOS"), NOW + 1)
            .unwrap_err();
        assert!(matches!(err, MembraError::AlreadyStaked(_)));
        let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        assert_eq!(rec.stake_amount, asset("10.0000 TLOS"));
        assert_eq!(rec.staked_at, Some(NOW));
    }

    #[test]
    fn deposit_from_unregistered_sender() {
        let engine = test_engine("stake_unregistered");
        let err = engine
            .apply(&deposit("bob", "membra", "10.0000 TLOS"), NOW)
            .unwrap_err();
        assert!(matches!(err, MembraError::NotRegistered(_)));
    }

    #[test]
    fn foreign_and_self_deposits_are_ignored() {
        let engine = test_engine("stake_ignored");
        engine.apply(&register_req(&p("alice"), "e"), NOW).unwrap();

        let to_other = engine.apply(&deposit("alice", "bob", "10.0000 TLOS"), NOW).unwrap();
        assert_eq!(to_other, Outcome::Ignored);
        let own_refund = engine.apply(&deposit("membra", "alice", "10.0000 TLOS"), NOW).unwrap();
        assert_eq!(own_refund, Outcome::Ignored);
        let loop_back = engine.apply(&deposit("membra", "membra", "10.0000 TLOS"), NOW).unwrap();
        assert_eq!(loop_back, Outcome::Ignored);

        assert!(!engine.db.get_account(&p("alice")).unwrap().unwrap().is_staked());
    }

    #[test]
    fn hold_period_is_enforced_to_the_second() {
        let engine = staked_alice("stake_hold");
        let err = engine
            .apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS - 1)
            .unwrap_err();
        match err {
            MembraError::HoldNotElapsed { unlock_at } => assert_eq!(unlock_at, NOW + 604_800),
            other => panic!("expected HoldNotElapsed, got {other}"),
        }
        assert!(engine.db.outbox().unwrap().is_empty());

        let ok = engine.apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS).unwrap();
        assert_eq!(ok, Outcome::Applied);
    }

    #[test]
    fn deposit_too_close_to_time_limit_is_rejected() {
        let engine = test_engine("stake_far_future");
        engine.apply(&register_req(&p("alice"), "e"), NOW).unwrap();

        let late = i64::MAX - 10;
        let err = engine
            .apply(&deposit("alice", "membra", "10.0000 TLOS"), late)
            .unwrap_err();
        assert!(matches!(err, MembraError::TimeOutOfRange(t) if t == late));
        assert!(!engine.db.get_account(&p("alice")).unwrap().unwrap().is_staked());

        let err = engine.apply(&unstake_req("alice"), late + 5).unwrap_err();
        assert!(matches!(err, MembraError::NothingStaked(_)));
    }

    #[test]
    fn stake_near_time_limit_never_unlocks_early() {
        let engine = test_engine("stake_saturating_unlock");
        engine.apply(&register_req(&p("alice"), "e"), NOW).unwrap();
        // A record written before deposits bounded the ledger time.
        let mut rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        rec.stake_amount = asset("10.0000 TLOS");
        rec.staked_at = Some(i64::MAX - 10);
        let mut staged = crate::engine::StagedMutations::default();
        staged.accounts.push(rec);
        engine.db.commit(&staged).unwrap();

        for at in [NOW, i64::MAX - 5] {
            let err = engine.apply(&unstake_req("alice"), at).unwrap_err();
            assert!(
                matches!(err, MembraError::HoldNotElapsed { unlock_at } if unlock_at == i64::MAX),
                "{at}"
            );
        }
        assert!(engine.db.outbox().unwrap().is_empty());
    }

    #[test]
    fn unstake_refunds_and_resets() {
        let engine = staked_alice("stake_refund");
        engine.apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS).unwrap();

        let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        assert!(rec.stake_amount.is_zero());
        assert_eq!(rec.stake_state(), StakeState::Unstaked);

        let outbox = engine.db.outbox().unwrap();
        assert_eq!(
            outbox,
            vec![OutboundTransfer {
                from: p("membra"),
                to: p("alice"),
                quantity: asset("10.0000 TLOS"),
                memo: REFUND_MEMO.to_string(),
            }]
        );
    }

    #[test]
    fn outbox_refund_commits_with_the_reset() {
        let engine = staked_alice("stake_outbox_atomic");
        engine.apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS).unwrap();
        assert_eq!(engine.db.outbox().unwrap().len(), 1);

        // The reset landed with the refund, so a retry has nothing to pay.
        let err = engine
            .apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS + 1)
            .unwrap_err();
        assert!(matches!(err, MembraError::NothingStaked(_)));
        assert_eq!(engine.db.outbox().unwrap().len(), 1);
    }

    #[test]
    fn restake_after_unstake() {
        let engine = staked_alice("stake_again");
        let later = NOW + HOLD_PERIOD_SECS;
        engine.apply(&unstake_req("alice"), later).unwrap();
        engine.apply(&deposit("alice", "membra", "10.0000 TLOS"), later + 5).unwrap();
        let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        assert_eq!(rec.staked_at, Some(later + 5));
    }

    #[test]
    fn unstake_without_stake() {
        let engine = test_engine("stake_nothing");
        engine.apply(&register_req(&p("alice"), "e"), NOW).unwrap();
        let err = engine.apply(&unstake_req("alice"), NOW).unwrap_err();
        assert!(matches!(err, MembraError::NothingStaked(_)));

        let err = engine.apply(&unstake_req("bob"), NOW).unwrap_err();
        assert!(matches!(err, MembraError::NotRegistered(_)));
    }

    #[test]
    fn unstake_needs_owner_authorization() {
        let engine = staked_alice("stake_unstake_auth");
        let forged = signed(Action::Unstake { principal: p("alice") }, &p("bob"));
        let err = engine.apply(&forged, NOW + HOLD_PERIOD_SECS).unwrap_err();
        assert!(matches!(err, MembraError::Unauthorized(_)));
    }

    #[test]
    fn failed_refund_keeps_stake_locked() {
        let staged = staked_alice("stake_refund_fails");
        let engine = LedgerEngine::new(
            Arc::clone(&staged.db),
            staged.config.clone(),
            Arc::new(FailingLedger),
        );

        let err = engine
            .apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS)
            .unwrap_err();
        assert!(matches!(err, MembraError::RefundFailed(_)));

        let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
        assert_eq!(rec.stake_amount, asset("10.0000 TLOS"));
        assert_eq!(rec.staked_at, Some(NOW));
        assert!(engine.db.outbox().unwrap().is_empty());
    }

    #[test]
    fn stake_is_always_zero_or_requirement() {
        let engine = staked_alice("stake_monotone");
        let check = |engine: &LedgerEngine| {
            let rec = engine.db.get_account(&p("alice")).unwrap().unwrap();
            assert!(
                rec.stake_amount == Asset::zero(rec.stake_requirement.symbol.clone())
                    || rec.stake_amount == rec.stake_requirement
            );
        };
        check(&engine);
        let _ = engine.apply(&deposit("alice", "membra", "10.0000 TLOS"), NOW + 1);
        check(&engine);
        let _ = engine.apply(&unstake_req("alice"), NOW + 2);
        check(&engine);
        engine.apply(&unstake_req("alice"), NOW + HOLD_PERIOD_SECS).unwrap();
        check(&engine);
    }
}
