use membra_core::constants::MAX_MEMO_BYTES;
use membra_core::error::MembraError;
use membra_core::host::AccountDirectory;
use membra_core::request::{Outcome, Request};
use membra_core::token::{BalanceRecord, SymbolRecord};
use membra_core::types::{Asset, Principal, Symbol, SymbolCode};
use tracing::{info, warn};

use crate::engine::{LedgerEngine, StagedMutations};

/// Shared quantity rules for issue, retire and transfer.
fn check_quantity(quantity: &Asset, record: &SymbolRecord, memo: &str) -> Result<(), MembraError> {
    if !quantity.is_valid() {
        return Err(MembraError::InvalidQuantity(format!("invalid quantity {quantity}")));
    }
    if quantity.amount <= 0 {
        return Err(MembraError::InvalidQuantity("quantity must be positive".into()));
    }
    if &quantity.symbol != record.symbol() {
        return Err(MembraError::InvalidQuantity(format!(
            "symbol precision mismatch: token is {}",
            record.symbol()
        )));
    }
    if memo.len() > MAX_MEMO_BYTES {
        return Err(MembraError::InvalidQuantity(format!(
            "memo has more than {MAX_MEMO_BYTES} bytes"
        )));
    }
    Ok(())
}

impl LedgerEngine {
    // ── Lookups ───────────────────────────────────────────────────────────────

    fn symbol_record(&self, code: &SymbolCode) -> Result<SymbolRecord, MembraError> {
        self.db
            .get_symbol(code)?
            .ok_or_else(|| MembraError::SymbolNotFound(code.to_string()))
    }

    /// Balance row as this action currently sees it: staged first, then DB.
    fn current_balance(
        &self,
        staged: &StagedMutations,
        code: &SymbolCode,
        owner: &Principal,
    ) -> Result<Option<BalanceRecord>, MembraError> {
        match staged.balance(code, owner) {
            Some(row) => Ok(Some(row.clone())),
            None => self.db.get_balance(code, owner),
        }
    }

    fn sub_balance(
        &self,
        staged: &mut StagedMutations,
        owner: &Principal,
        quantity: &Asset,
    ) -> Result<(), MembraError> {
        let code = &quantity.symbol.code;
        let mut row = match self.current_balance(staged, code, owner)? {
            Some(row) if row.balance.amount >= quantity.amount => row,
            Some(row) => {
                return Err(MembraError::Overdrawn {
                    need: quantity.to_string(),
                    have: row.balance.to_string(),
                })
            }
            None => {
                return Err(MembraError::Overdrawn {
                    need: quantity.to_string(),
                    have: Asset::zero(quantity.symbol.clone()).to_string(),
                })
            }
        };
        row.balance = row.balance.checked_sub(quantity)?;
        staged.balances.push(row);
        Ok(())
    }

    fn add_balance(
        &self,
        staged: &mut StagedMutations,
        owner: &Principal,
        quantity: &Asset,
        payer: &Principal,
    ) -> Result<(), MembraError> {
        let code = &quantity.symbol.code;
        let row = match self.current_balance(staged, code, owner)? {
            Some(mut row) => {
                row.balance = row.balance.checked_add(quantity)?;
                row
            }
            None => BalanceRecord {
                owner: owner.clone(),
                balance: quantity.clone(),
                payer: payer.clone(),
            },
        };
        staged.balances.push(row);
        Ok(())
    }

    // ── Create ────────────────────────────────────────────────────────────────

    pub(crate) fn create(
        &self,
        request: &Request,
        issuer: &Principal,
        max_supply: &Asset,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        self.require_auth(request, &self.config.operator)?;

        if !max_supply.is_valid() {
            return Err(MembraError::InvalidQuantity(format!("invalid supply {max_supply}")));
        }
        if max_supply.amount <= 0 {
            return Err(MembraError::InvalidQuantity("max supply must be positive".into()));
        }
        let code = &max_supply.symbol.code;
        if self.db.get_symbol(code)?.is_some() {
            return Err(MembraError::DuplicateSymbol(code.to_string()));
        }

        info!(symbol = %max_supply.symbol, issuer = %issuer, max_supply = %max_supply, "token created");
        staged.symbols.push(SymbolRecord {
            supply: Asset::zero(max_supply.symbol.clone()),
            max_supply: max_supply.clone(),
            issuer: issuer.clone(),
        });
        Ok(Outcome::Applied)
    }

    // ── Issue ─────────────────────────────────────────────────────────────────

    pub(crate) fn issue(
        &self,
        request: &Request,
        to: &Principal,
        quantity: &Asset,
        memo: &str,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        let mut record = self.symbol_record(&quantity.symbol.code)?;
        self.require_auth(request, &record.issuer)?;
        if to != &record.issuer {
            return Err(MembraError::IssuerOnly);
        }
        check_quantity(quantity, &record, memo)?;
        if quantity.amount > record.available() {
            let available = Asset {
                amount: record.available(),
                symbol: record.symbol().clone(),
            };
            return Err(MembraError::SupplyExceeded { available: available.to_string() });
        }

        record.supply = record.supply.checked_add(quantity)?;
        let issuer = record.issuer.clone();
        self.add_balance(staged, &issuer, quantity, &issuer)?;
        info!(quantity = %quantity, supply = %record.supply, "tokens issued");
        staged.symbols.push(record);
        Ok(Outcome::Applied)
    }

    // ── Retire ────────────────────────────────────────────────────────────────

    pub(crate) fn retire(
        &self,
        request: &Request,
        quantity: &Asset,
        memo: &str,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        let mut record = self.symbol_record(&quantity.symbol.code)?;
        self.require_auth(request, &record.issuer)?;
        check_quantity(quantity, &record, memo)?;

        let issuer = record.issuer.clone();
        self.sub_balance(staged, &issuer, quantity)?;
        record.supply = record.supply.checked_sub(quantity)?;
        info!(quantity = %quantity, supply = %record.supply, "tokens retired");
        staged.symbols.push(record);
        Ok(Outcome::Applied)
    }

    // ── Transfer ──────────────────────────────────────────────────────────────

    pub(crate) fn transfer(
        &self,
        request: &Request,
        from: &Principal,
        to: &Principal,
        quantity: &Asset,
        memo: &str,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        if from == to {
            return Err(MembraError::SelfTransfer);
        }
        self.require_auth(request, from)?;
        if !self.db.principal_exists(to)? {
            return Err(MembraError::AccountNotFound(to.to_string()));
        }
        let record = self.symbol_record(&quantity.symbol.code)?;
        check_quantity(quantity, &record, memo)?;

        let payer = if request.is_authorized_by(to) { to } else { from };
        self.sub_balance(staged, from, quantity)?;
        self.add_balance(staged, to, quantity, payer)?;
        info!(from = %from, to = %to, quantity = %quantity, "tokens transferred");
        Ok(Outcome::Applied)
    }

    // ── Open / Close ──────────────────────────────────────────────────────────

    pub(crate) fn open(
        &self,
        request: &Request,
        owner: &Principal,
        symbol: &Symbol,
        payer: &Principal,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        self.require_auth(request, payer)?;
        if !self.db.principal_exists(owner)? {
            return Err(MembraError::AccountNotFound(owner.to_string()));
        }
        let record = self.symbol_record(&symbol.code)?;
        if record.symbol() != symbol {
            return Err(MembraError::InvalidQuantity(format!(
                "symbol precision mismatch: token is {}",
                record.symbol()
            )));
        }
        if self.db.get_balance(&symbol.code, owner)?.is_some() {
            return Ok(Outcome::Unchanged);
        }

        info!(owner = %owner, symbol = %symbol, payer = %payer, "balance row opened");
        staged
            .balances
            .push(BalanceRecord::empty(owner.clone(), symbol.clone(), payer.clone()));
        Ok(Outcome::Applied)
    }

    pub(crate) fn close(
        &self,
        request: &Request,
        owner: &Principal,
        symbol: &Symbol,
        staged: &mut StagedMutations,
    ) -> Result<Outcome, MembraError> {
        self.require_auth(request, owner)?;
        let row = self
            .db
            .get_balance(&symbol.code, owner)?
            .ok_or_else(|| MembraError::BalanceNotFound(format!("{owner} {}", symbol.code)))?;
        if !row.balance.is_zero() {
            warn!(owner = %owner, balance = %row.balance, "close refused: balance not empty");
            return Err(MembraError::NonZeroBalance(row.balance.to_string()));
        }

        info!(owner = %owner, symbol = %symbol, "balance row closed");
        staged.removed_balances.push((symbol.code.clone(), owner.clone()));
        Ok(Outcome::Applied)
    }
}
