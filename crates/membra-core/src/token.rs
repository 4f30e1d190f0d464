use serde::{Deserialize, Serialize};

use crate::types::{Asset, Principal, Symbol, SymbolCode};

/// Metadata for one fungible token, keyed by its symbol code.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecord {
    pub supply: Asset,
    pub max_supply: Asset,
    pub issuer: Principal,
}

impl SymbolRecord {
    pub fn symbol(&self) -> &Symbol {
        &self.max_supply.symbol
    }

    pub fn code(&self) -> &SymbolCode {
        &self.max_supply.symbol.code
    }

    /// Base units that may still be issued.
    pub fn available(&self) -> i64 {
        self.max_supply.amount - self.supply.amount
    }
}

/// One holder's balance of one token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BalanceRecord {
    pub owner: Principal,
    pub balance: Asset,
    /// Principal the row's storage was attributed to when it was created.
    pub payer: Principal,
}

impl BalanceRecord {
    pub fn empty(owner: Principal, symbol: Symbol, payer: Principal) -> Self {
        Self {
            owner,
            balance: Asset::zero(symbol),
            payer,
        }
    }
}
