use std::sync::{Arc, Mutex};

use membra_core::account::AccountRecord;
use membra_core::error::MembraError;
use membra_core::host::{CurrencyLedger, EngineConfig, OutboundTransfer};
use membra_core::request::{Action, Outcome, Request};
use membra_core::token::{BalanceRecord, SymbolRecord};
use membra_core::types::{Principal, SymbolCode, Timestamp};
use tracing::{info, warn};

use crate::db::StateDb;
use crate::gate;

// ── Staged mutations ──────────────────────────────────────────────────────────

/// All state changes staged by an action handler before atomic commit.
#[derive(Default)]
pub(crate) struct StagedMutations {
    pub accounts: Vec<AccountRecord>,
    pub removed_accounts: Vec<Principal>,
    pub symbols: Vec<SymbolRecord>,
    pub balances: Vec<BalanceRecord>,
    pub removed_balances: Vec<(SymbolCode, Principal)>,
    pub population: Option<u64>,
    /// Refunds owed by the action; routed by the engine's `RefundSink`.
    pub refunds: Vec<OutboundTransfer>,
    /// Refunds appended to the DB outbox in the same transaction as the rest.
    pub outbox: Vec<OutboundTransfer>,
}

impl StagedMutations {
    fn has_writes(&self) -> bool {
        !self.accounts.is_empty()
            || !self.removed_accounts.is_empty()
            || !self.symbols.is_empty()
            || !self.balances.is_empty()
            || !self.removed_balances.is_empty()
            || self.population.is_some()
            || !self.outbox.is_empty()
    }

    /// Latest staged version of a balance row, if any.
    pub fn balance(&self, code: &SymbolCode, owner: &Principal) -> Option<&BalanceRecord> {
        self.balances
            .iter()
            .rev()
            .find(|b| &b.balance.symbol.code == code && &b.owner == owner)
    }
}

// ── Refund routing ────────────────────────────────────────────────────────────

enum RefundSink {
    /// Queued in the state DB's outbox by the commit transaction itself.
    Outbox,
    /// Sent to a host ledger before the commit; a failed send aborts.
    External(Arc<dyn CurrencyLedger>),
}

// ── LedgerEngine ──────────────────────────────────────────────────────────────

/// The state transition engine.
///
/// Validates and applies requests to the persistent state database. Each
/// `apply` call is atomic: either every mutation of the action lands or
/// none does. Calls are serialized by an internal lock, so at most one
/// request is ever in flight.
pub struct LedgerEngine {
    pub db: Arc<StateDb>,
    pub config: EngineConfig,
    refunds: RefundSink,
    apply_lock: Mutex<()>,
}

impl LedgerEngine {
    /// Engine that pays refunds through an external base-currency ledger.
    pub fn new(db: Arc<StateDb>, config: EngineConfig, currency: Arc<dyn CurrencyLedger>) -> Self {
        Self {
            db,
            config,
            refunds: RefundSink::External(currency),
            apply_lock: Mutex::new(()),
        }
    }

    /// Engine whose refunds are queued in the state DB's own outbox,
    /// atomically with the state change that owes them.
    pub fn with_outbox(db: Arc<StateDb>, config: EngineConfig) -> Self {
        Self {
            db,
            config,
            refunds: RefundSink::Outbox,
            apply_lock: Mutex::new(()),
        }
    }

    /// Validate and apply one request at ledger time `now`.
    pub fn apply(&self, request: &Request, now: Timestamp) -> Result<Outcome, MembraError> {
        // A poisoned lock only means an earlier caller panicked; nothing was
        // committed on its behalf.
        let _guard = self.apply_lock.lock().unwrap_or_else(|p| p.into_inner());

        let request_id = request.id();
        match self.apply_serialized(request, now) {
            Ok(outcome) => {
                info!(
                    request_id = %request_id,
                    action = request.action.name(),
                    ?outcome,
                    "applied request"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    action = request.action.name(),
                    error = %e,
                    "request rejected"
                );
                Err(e)
            }
        }
    }

    fn apply_serialized(&self, request: &Request, now: Timestamp) -> Result<Outcome, MembraError> {
        // ── Master switch ─────────────────────────────────────────────────────
        gate::ensure_enabled(self.db.as_ref())?;

        // ── Stage ─────────────────────────────────────────────────────────────
        let mut staged = StagedMutations::default();
        let outcome = self.apply_action(request, &mut staged, now)?;

        // ── Refunds strictly before (or together with) the local reset ────────
        match &self.refunds {
            RefundSink::Outbox => staged.outbox = std::mem::take(&mut staged.refunds),
            RefundSink::External(currency) => {
                for refund in &staged.refunds {
                    currency
                        .send(refund)
                        .map_err(|e| MembraError::RefundFailed(e.to_string()))?;
                }
            }
        }

        // ── Commit ────────────────────────────────────────────────────────────
        if staged.has_writes() {
            self.db.commit(&staged)?;
        }
        Ok(outcome)
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    fn apply_action(
        &self,
        request: &Request,
        staged: &mut StagedMutations,
        now: Timestamp,
    ) -> Result<Outcome, MembraError> {
        match &request.action {
            Action::Register { principal, account_type } => {
                self.register(request, principal, account_type, staged, now)
            }
            Action::Deregister { principal } => self.deregister(request, principal, staged),
            Action::Deposit(deposit) => self.deposit(deposit, staged, now),
            Action::Unstake { principal } => self.unstake(request, principal, staged, now),
            Action::Create { issuer, max_supply } => {
                self.create(request, issuer, max_supply, staged)
            }
            Action::Issue { to, quantity, memo } => self.issue(request, to, quantity, memo, staged),
            Action::Retire { quantity, memo } => self.retire(request, quantity, memo, staged),
            Action::Transfer { from, to, quantity, memo } => {
                self.transfer(request, from, to, quantity, memo, staged)
            }
            Action::Open { owner, symbol, payer } => self.open(request, owner, symbol, payer, staged),
            Action::Close { owner, symbol } => self.close(request, owner, symbol, staged),
        }
    }

    /// Fails unless `principal` is among the request's authorizations.
    pub(crate) fn require_auth(&self, request: &Request, principal: &Principal) -> Result<(), MembraError> {
        if request.is_authorized_by(principal) {
            Ok(())
        } else {
            Err(MembraError::Unauthorized(principal.to_string()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
