use membra_core::error::MembraError;
use membra_core::token::{BalanceRecord, SymbolRecord};
use membra_core::types::{Asset, Principal, SymbolCode};
use membra_state::StateDb;
use serde::Serialize;
use tracing::warn;

/// Outcome of comparing a token's supply with the sum of its balances.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ConservationReport {
    pub symbol: String,
    pub supply: i64,
    pub held: i64,
    pub holders: usize,
}

impl ConservationReport {
    pub fn is_conserved(&self) -> bool {
        self.supply == self.held
    }
}

/// Query helpers for the token ledger.
pub struct TokenQuery<'a> {
    db: &'a StateDb,
}

impl<'a> TokenQuery<'a> {
    pub fn new(db: &'a StateDb) -> Self {
        Self { db }
    }

    pub fn symbol(&self, code: &SymbolCode) -> Result<SymbolRecord, MembraError> {
        self.db
            .get_symbol(code)?
            .ok_or_else(|| MembraError::SymbolNotFound(code.to_string()))
    }

    /// Outstanding supply of a token.
    pub fn supply(&self, code: &SymbolCode) -> Result<Asset, MembraError> {
        Ok(self.symbol(code)?.supply)
    }

    /// Balance held by `owner`; zero when the owner has no row.
    pub fn balance(&self, code: &SymbolCode, owner: &Principal) -> Result<Asset, MembraError> {
        let record = self.symbol(code)?;
        Ok(match self.db.get_balance(code, owner)? {
            Some(row) => row.balance,
            None => Asset::zero(record.symbol().clone()),
        })
    }

    /// Every balance row of the token, largest holder first.
    pub fn holders(&self, code: &SymbolCode) -> Result<Vec<BalanceRecord>, MembraError> {
        let mut rows = self.db.iter_balances(code)?;
        rows.sort_by(|a, b| {
            b.balance
                .amount
                .cmp(&a.balance.amount)
                .then_with(|| a.owner.cmp(&b.owner))
        });
        Ok(rows)
    }

    /// Check that the balances of `code` add up to its supply.
    ///
    /// Returns the report when they do and `SupplyMismatch` when they do not.
    pub fn audit_conservation(&self, code: &SymbolCode) -> Result<ConservationReport, MembraError> {
        let record = self.symbol(code)?;
        let rows = self.db.iter_balances(code)?;
        let held = rows
            .iter()
            .try_fold(0i64, |acc, row| acc.checked_add(row.balance.amount))
            .ok_or_else(|| MembraError::Other(format!("balance sum of {code} overflows")))?;

        let report = ConservationReport {
            symbol: record.symbol().to_string(),
            supply: record.supply.amount,
            held,
            holders: rows.len(),
        };
        if !report.is_conserved() {
            warn!(symbol = %code, supply = report.supply, held, "supply does not match balances");
            return Err(MembraError::SupplyMismatch {
                symbol: code.to_string(),
                supply: report.supply,
                held,
            });
        }
        Ok(report)
    }
}
