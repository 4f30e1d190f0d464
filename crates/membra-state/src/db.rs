use membra_core::account::{AccountRecord, StakeBand};
use membra_core::error::MembraError;
use membra_core::host::{AccountDirectory, ConfigStore, EngineConfig, OutboundTransfer};
use membra_core::token::{BalanceRecord, SymbolRecord};
use membra_core::types::{Principal, SymbolCode};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::path::Path;
use tracing::{info, warn};

use crate::engine::StagedMutations;

const POPULATION_KEY: &str = "population";
const ENGINE_CONFIG_KEY: &str = "engine_config";

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees (analogous to column families):
///   accounts  : principal utf8      → bincode(AccountRecord)
///   symbols   : symbol code utf8   → bincode(SymbolRecord)
///   balances  : "CODE/owner" utf8  → bincode(BalanceRecord)
///   meta      : utf8 key bytes     → raw bytes (population, engine config)
///   params    : parameter name     → utf8 value
///   bands     : threshold u64 BE   → bincode(StakeBand)
///   principals: principal utf8     → [] (host account directory)
///   outbox    : sequence u64 BE    → bincode(OutboundTransfer)
pub struct StateDb {
    _db: sled::Db,
    accounts: sled::Tree,
    symbols: sled::Tree,
    balances: sled::Tree,
    meta: sled::Tree,
    params: sled::Tree,
    bands: sled::Tree,
    principals: sled::Tree,
    outbox: sled::Tree,
}

fn balance_key(code: &SymbolCode, owner: &Principal) -> Vec<u8> {
    format!("{code}/{owner}").into_bytes()
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MembraError> {
        let db = sled::open(path).map_err(|e| MembraError::Storage(e.to_string()))?;
        let accounts   = db.open_tree("accounts").map_err(|e| MembraError::Storage(e.to_string()))?;
        let symbols    = db.open_tree("symbols").map_err(|e| MembraError::Storage(e.to_string()))?;
        let balances   = db.open_tree("balances").map_err(|e| MembraError::Storage(e.to_string()))?;
        let meta       = db.open_tree("meta").map_err(|e| MembraError::Storage(e.to_string()))?;
        let params     = db.open_tree("params").map_err(|e| MembraError::Storage(e.to_string()))?;
        let bands      = db.open_tree("bands").map_err(|e| MembraError::Storage(e.to_string()))?;
        let principals = db.open_tree("principals").map_err(|e| MembraError::Storage(e.to_string()))?;
        let outbox     = db.open_tree("outbox").map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(Self { _db: db, accounts, symbols, balances, meta, params, bands, principals, outbox })
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    pub fn get_account(&self, principal: &Principal) -> Result<Option<AccountRecord>, MembraError> {
        match self.accounts.get(principal.as_str()).map_err(|e| MembraError::Storage(e.to_string()))? {
            Some(bytes) => {
                let acc = bincode::deserialize(&bytes)
                    .map_err(|e| MembraError::Serialization(e.to_string()))?;
                Ok(Some(acc))
            }
            None => Ok(None),
        }
    }

    pub fn account_exists(&self, principal: &Principal) -> Result<bool, MembraError> {
        self.accounts
            .contains_key(principal.as_str())
            .map_err(|e| MembraError::Storage(e.to_string()))
    }

    /// Registered-member count. Reads as zero until the first registration.
    pub fn population(&self) -> Result<u64, MembraError> {
        match self.get_meta(POPULATION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| MembraError::Serialization("population counter is not 8 bytes".into()))?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    // ── Tokens ───────────────────────────────────────────────────────────────

    pub fn get_symbol(&self, code: &SymbolCode) -> Result<Option<SymbolRecord>, MembraError> {
        match self.symbols.get(code.as_str()).map_err(|e| MembraError::Storage(e.to_string()))? {
            Some(bytes) => {
                let rec = bincode::deserialize(&bytes)
                    .map_err(|e| MembraError::Serialization(e.to_string()))?;
                Ok(Some(rec))
            }
            None => Ok(None),
        }
    }

    pub fn put_symbol(&self, record: &SymbolRecord) -> Result<(), MembraError> {
        let bytes = bincode::serialize(record)
            .map_err(|e| MembraError::Serialization(e.to_string()))?;
        self.symbols
            .insert(record.code().as_str(), bytes)
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_balance(
        &self,
        code: &SymbolCode,
        owner: &Principal,
    ) -> Result<Option<BalanceRecord>, MembraError> {
        match self.balances.get(balance_key(code, owner)).map_err(|e| MembraError::Storage(e.to_string()))? {
            Some(bytes) => {
                let rec = bincode::deserialize(&bytes)
                    .map_err(|e| MembraError::Serialization(e.to_string()))?;
                Ok(Some(rec))
            }
            None => Ok(None),
        }
    }

    pub fn put_balance(&self, record: &BalanceRecord) -> Result<(), MembraError> {
        let bytes = bincode::serialize(record)
            .map_err(|e| MembraError::Serialization(e.to_string()))?;
        self.balances
            .insert(balance_key(&record.balance.symbol.code, &record.owner), bytes)
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Every balance row of one token.
    pub fn iter_balances(&self, code: &SymbolCode) -> Result<Vec<BalanceRecord>, MembraError> {
        let prefix = format!("{code}/");
        let mut out = Vec::new();
        for item in self.balances.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = item.map_err(|e| MembraError::Storage(e.to_string()))?;
            out.push(
                bincode::deserialize(&bytes).map_err(|e| MembraError::Serialization(e.to_string()))?,
            );
        }
        Ok(out)
    }

    // ── Configuration ────────────────────────────────────────────────────────

    pub fn put_parameter(&self, name: &str, value: &str) -> Result<(), MembraError> {
        self.params
            .insert(name.as_bytes(), value.as_bytes())
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        info!(param = name, value, "parameter set");
        Ok(())
    }

    /// Remove a parameter. Returns `false` (and only logs) when it was not set.
    pub fn erase_parameter(&self, name: &str) -> Result<bool, MembraError> {
        let removed = self
            .params
            .remove(name.as_bytes())
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        if removed.is_none() {
            warn!(param = name, "parameter does not exist; nothing to erase");
            return Ok(false);
        }
        info!(param = name, "parameter erased");
        Ok(true)
    }

    pub fn put_band(&self, band: &StakeBand) -> Result<(), MembraError> {
        let bytes = bincode::serialize(band)
            .map_err(|e| MembraError::Serialization(e.to_string()))?;
        self.bands
            .insert(band.threshold.to_be_bytes(), bytes)
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn remove_band(&self, threshold: u64) -> Result<bool, MembraError> {
        Ok(self
            .bands
            .remove(threshold.to_be_bytes())
            .map_err(|e| MembraError::Storage(e.to_string()))?
            .is_some())
    }

    pub fn get_engine_config(&self) -> Result<Option<EngineConfig>, MembraError> {
        match self.get_meta(ENGINE_CONFIG_KEY)? {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|e| MembraError::Serialization(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    pub fn put_engine_config(&self, config: &EngineConfig) -> Result<(), MembraError> {
        let bytes = bincode::serialize(config)
            .map_err(|e| MembraError::Serialization(e.to_string()))?;
        self.put_meta(ENGINE_CONFIG_KEY, &bytes)
    }

    // ── Host directory ───────────────────────────────────────────────────────

    pub fn put_principal(&self, principal: &Principal) -> Result<(), MembraError> {
        self.principals
            .insert(principal.as_str(), b"".as_ref())
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(())
    }

    // ── Outbox ───────────────────────────────────────────────────────────────

    /// Refunds handed to the base-currency ledger, oldest first.
    pub fn outbox(&self) -> Result<Vec<OutboundTransfer>, MembraError> {
        let mut out = Vec::new();
        for item in self.outbox.iter() {
            let (_, bytes) = item.map_err(|e| MembraError::Storage(e.to_string()))?;
            out.push(
                bincode::deserialize(&bytes).map_err(|e| MembraError::Serialization(e.to_string()))?,
            );
        }
        Ok(out)
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), MembraError> {
        self.meta
            .insert(key.as_bytes(), value)
            .map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, MembraError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(|e| MembraError::Storage(e.to_string()))
    }

    // ── Commit ───────────────────────────────────────────────────────────────

    /// Write every staged mutation in one multi-tree transaction: either all
    /// of them land or none do.
    pub(crate) fn commit(&self, staged: &StagedMutations) -> Result<(), MembraError> {
        let mut account_puts = Vec::with_capacity(staged.accounts.len());
        for acc in &staged.accounts {
            let bytes = bincode::serialize(acc).map_err(|e| MembraError::Serialization(e.to_string()))?;
            account_puts.push((acc.principal.as_str().as_bytes().to_vec(), bytes));
        }
        let account_dels: Vec<Vec<u8>> = staged
            .removed_accounts
            .iter()
            .map(|p| p.as_str().as_bytes().to_vec())
            .collect();

        let mut symbol_puts = Vec::with_capacity(staged.symbols.len());
        for rec in &staged.symbols {
            let bytes = bincode::serialize(rec).map_err(|e| MembraError::Serialization(e.to_string()))?;
            symbol_puts.push((rec.code().as_str().as_bytes().to_vec(), bytes));
        }

        let mut balance_puts = Vec::with_capacity(staged.balances.len());
        for rec in &staged.balances {
            let bytes = bincode::serialize(rec).map_err(|e| MembraError::Serialization(e.to_string()))?;
            balance_puts.push((balance_key(&rec.balance.symbol.code, &rec.owner), bytes));
        }
        let balance_dels: Vec<Vec<u8>> = staged
            .removed_balances
            .iter()
            .map(|(code, owner)| balance_key(code, owner))
            .collect();

        let population = staged.population.map(u64::to_be_bytes);

        // Sequence ids are drawn up front; an aborted commit only leaves a gap.
        let mut outbox_puts = Vec::with_capacity(staged.outbox.len());
        for transfer in &staged.outbox {
            let seq = self._db.generate_id().map_err(|e| MembraError::Storage(e.to_string()))?;
            let bytes = bincode::serialize(transfer).map_err(|e| MembraError::Serialization(e.to_string()))?;
            outbox_puts.push((seq.to_be_bytes(), bytes));
        }

        let result: Result<(), TransactionError<MembraError>> =
            (&self.accounts, &self.symbols, &self.balances, &self.meta, &self.outbox).transaction(
                |(accounts, symbols, balances, meta, outbox)| {
                    for (k, v) in &account_puts {
                        accounts.insert(k.as_slice(), v.as_slice())?;
                    }
                    for k in &account_dels {
                        accounts.remove(k.as_slice())?;
                    }
                    for (k, v) in &symbol_puts {
                        symbols.insert(k.as_slice(), v.as_slice())?;
                    }
                    for (k, v) in &balance_puts {
                        balances.insert(k.as_slice(), v.as_slice())?;
                    }
                    for k in &balance_dels {
                        balances.remove(k.as_slice())?;
                    }
                    if let Some(count) = &population {
                        meta.insert(POPULATION_KEY.as_bytes(), &count[..])?;
                    }
                    for (k, v) in &outbox_puts {
                        outbox.insert(&k[..], v.as_slice())?;
                    }
                    Ok::<(), ConflictableTransactionError<MembraError>>(())
                },
            );
        result.map_err(|e| MembraError::Storage(e.to_string()))?;
        for transfer in &staged.outbox {
            info!(to = %transfer.to, quantity = %transfer.quantity, "outbound transfer queued");
        }
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), MembraError> {
        self._db.flush().map_err(|e| MembraError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ── Collaborator implementations ─────────────────────────────────────────────

impl ConfigStore for StateDb {
    fn read_parameter(&self, name: &str) -> Result<Option<String>, MembraError> {
        match self.params.get(name.as_bytes()).map_err(|e| MembraError::Storage(e.to_string()))? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| MembraError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn stake_bands(&self) -> Result<Vec<StakeBand>, MembraError> {
        let mut out = Vec::new();
        // Big-endian keys iterate in ascending threshold order.
        for item in self.bands.iter() {
            let (_, bytes) = item.map_err(|e| MembraError::Storage(e.to_string()))?;
            out.push(
                bincode::deserialize(&bytes).map_err(|e| MembraError::Serialization(e.to_string()))?,
            );
        }
        Ok(out)
    }
}

impl AccountDirectory for StateDb {
    fn principal_exists(&self, principal: &Principal) -> Result<bool, MembraError> {
        self.principals
            .contains_key(principal.as_str())
            .map_err(|e| MembraError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{asset, p, temp_db};
    use membra_core::types::AccountType;

    #[test]
    fn commit_writes_outbox_with_account_rows() {
        let db = temp_db("db_commit_outbox");
        let mut staged = StagedMutations::default();
        staged
            .accounts
            .push(AccountRecord::new(p("alice"), AccountType('e'), asset("10.0000 TLOS"), 1));
        staged.outbox.push(OutboundTransfer {
            from: p("membra"),
            to: p("alice"),
            quantity: asset("10.0000 TLOS"),
            memo: "refund".into(),
        });
        db.commit(&staged).unwrap();

        assert!(db.account_exists(&p("alice")).unwrap());
        let outbox = db.outbox().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, p("alice"));
    }

    #[test]
    fn outbox_keeps_commit_order() {
        let db = temp_db("db_outbox_order");
        for who in ["alice", "bob", "carol"] {
            let mut staged = StagedMutations::default();
            staged.outbox.push(OutboundTransfer {
                from: p("membra"),
                to: p(who),
                quantity: asset("1.0000 TLOS"),
                memo: String::new(),
            });
            db.commit(&staged).unwrap();
        }
        let order: Vec<String> = db.outbox().unwrap().iter().map(|t| t.to.to_string()).collect();
        assert_eq!(order, ["alice", "bob", "carol"]);
    }
}
