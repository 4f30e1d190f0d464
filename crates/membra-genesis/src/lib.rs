//! membra-genesis
//!
//! Bootstraps a fresh `StateDb`: engine identity, stake bands, host
//! principals, configuration parameters and, optionally, the system token.
//! Writes go straight to the DB; there is no request to authorize yet.

pub mod params;

pub use params::{GenesisParams, GenesisToken};

use membra_core::constants::MASTER_SWITCH_PARAM;
use membra_core::error::MembraError;
use membra_core::host::EngineConfig;
use membra_core::token::{BalanceRecord, SymbolRecord};
use membra_core::types::Asset;
use membra_state::StateDb;
use tracing::info;

/// Apply genesis to an empty `StateDb` and return the stored engine config.
///
/// Fails without writing anything if the DB was already initialised or the
/// parameters are inconsistent.
pub fn apply_genesis(db: &StateDb, params: &GenesisParams) -> Result<EngineConfig, MembraError> {
    if db.get_engine_config()?.is_some() {
        return Err(MembraError::Other("state is already initialised".into()));
    }
    validate(params)?;
    info!(system = %params.system, operator = %params.operator, "applying genesis state");

    // ── 1. Host directory ────────────────────────────────────────────────────
    let mut principals = params.principals.clone();
    principals.push(params.system.clone());
    principals.push(params.operator.clone());
    if let Some(token) = &params.token {
        principals.push(token.issuer.clone());
    }
    principals.sort();
    principals.dedup();
    for principal in &principals {
        db.put_principal(principal)?;
    }
    info!(count = principals.len(), "genesis: host principals");

    // ── 2. Stake bands ───────────────────────────────────────────────────────
    for band in &params.bands {
        db.put_band(band)?;
        info!(threshold = band.threshold, types = band.requirements.len(), "genesis: stake band");
    }

    // ── 3. Parameters ────────────────────────────────────────────────────────
    for (name, value) in &params.parameters {
        db.put_parameter(name, value)?;
    }
    if let Some(on) = params.master_switch {
        db.put_parameter(MASTER_SWITCH_PARAM, if on { "true" } else { "false" })?;
    }

    // ── 4. System token ──────────────────────────────────────────────────────
    if let Some(token) = &params.token {
        let symbol = token.max_supply.symbol.clone();
        let supply = token
            .initial_issue
            .clone()
            .unwrap_or_else(|| Asset::zero(symbol.clone()));
        db.put_symbol(&SymbolRecord {
            supply: supply.clone(),
            max_supply: token.max_supply.clone(),
            issuer: token.issuer.clone(),
        })?;
        if !supply.is_zero() {
            db.put_balance(&BalanceRecord {
                owner: token.issuer.clone(),
                balance: supply.clone(),
                payer: token.issuer.clone(),
            })?;
        }
        info!(
            symbol = %symbol,
            issuer = %token.issuer,
            supply = %supply,
            max_supply = %token.max_supply,
            "genesis: token created"
        );
    }

    // ── 5. Engine identity ───────────────────────────────────────────────────
    let config = EngineConfig {
        system: params.system.clone(),
        operator: params.operator.clone(),
        stake_symbol: params.stake_symbol.clone(),
    };
    db.put_engine_config(&config)?;
    db.flush()?;

    info!("genesis complete");
    Ok(config)
}

fn validate(params: &GenesisParams) -> Result<(), MembraError> {
    if params.bands.is_empty() {
        return Err(MembraError::NoStakeBands);
    }
    for band in &params.bands {
        for requirement in band.requirements.values() {
            if requirement.symbol != params.stake_symbol {
                return Err(MembraError::InvalidSymbol(format!(
                    "band {} requires {}, stake symbol is {}",
                    band.threshold, requirement, params.stake_symbol
                )));
            }
            if !requirement.is_valid() || requirement.amount < 0 {
                return Err(MembraError::InvalidQuantity(format!(
                    "band {} requires {}",
                    band.threshold, requirement
                )));
            }
        }
    }

    if let Some(token) = &params.token {
        if !token.max_supply.is_valid() || token.max_supply.amount <= 0 {
            return Err(MembraError::InvalidQuantity("max supply must be positive".into()));
        }
        if let Some(initial) = &token.initial_issue {
            if initial.symbol != token.max_supply.symbol {
                return Err(MembraError::InvalidQuantity(format!(
                    "initial issue {initial} does not match {}",
                    token.max_supply.symbol
                )));
            }
            if initial.amount < 0 {
                return Err(MembraError::InvalidQuantity("initial issue must not be negative".into()));
            }
            if initial.amount > token.max_supply.amount {
                return Err(MembraError::SupplyExceeded {
                    available: token.max_supply.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use membra_core::host::AccountDirectory;
    use membra_core::types::{Principal, SymbolCode};
    use membra_query::TokenQuery;

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("membra_genesis_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).unwrap()
    }

    fn test_params() -> GenesisParams {
        GenesisParams::from_json(
            r#"{
                "system": "membra",
                "operator": "operator",
                "stake_symbol": "4,TLOS",
                "principals": ["alice", "bob"],
                "bands": [
                    { "threshold": 0,   "requirements": { "e": "10.0000 TLOS", "b": "50.0000 TLOS" } },
                    { "threshold": 100, "requirements": { "e": "5.0000 TLOS" } }
                ],
                "master_switch": true,
                "parameters": { "motd": "hello" },
                "token": {
                    "issuer": "treasury",
                    "max_supply": "1000000.0000 VOTE",
                    "initial_issue": "2500.0000 VOTE"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn genesis_seeds_everything() {
        use membra_core::host::ConfigStore;

        let db = temp_db("seeds");
        let config = apply_genesis(&db, &test_params()).expect("genesis must succeed");

        assert_eq!(db.get_engine_config().unwrap(), Some(config.clone()));
        assert_eq!(config.stake_symbol.to_string(), "4,TLOS");
        assert_eq!(db.stake_bands().unwrap().len(), 2);
        assert_eq!(db.read_parameter("motd").unwrap().as_deref(), Some("hello"));
        assert_eq!(db.read_parameter(MASTER_SWITCH_PARAM).unwrap().as_deref(), Some("true"));
        for who in ["alice", "bob", "membra", "operator", "treasury"] {
            assert!(db.principal_exists(&Principal::new(who).unwrap()).unwrap(), "{who}");
        }
        assert_eq!(db.population().unwrap(), 0);
    }

    #[test]
    fn genesis_token_supply_is_conserved() {
        let db = temp_db("token");
        apply_genesis(&db, &test_params()).unwrap();

        let code = SymbolCode::new("VOTE").unwrap();
        let report = TokenQuery::new(&db).audit_conservation(&code).unwrap();
        assert_eq!(report.supply, 25_000_000);
        assert_eq!(report.holders, 1);
    }

    #[test]
    fn genesis_runs_once() {
        let db = temp_db("twice");
        apply_genesis(&db, &test_params()).unwrap();
        assert!(apply_genesis(&db, &test_params()).is_err());
    }

    #[test]
    fn rejects_band_in_foreign_symbol() {
        let db = temp_db("foreign_band");
        let mut params = test_params();
        params.bands[1]
            .requirements
            .insert(membra_core::types::AccountType('e'), "5.00 EOS".parse().unwrap());
        let err = apply_genesis(&db, &params).unwrap_err();
        assert!(matches!(err, MembraError::InvalidSymbol(_)));
        assert!(db.get_engine_config().unwrap().is_none());
    }

    #[test]
    fn rejects_initial_issue_above_max() {
        let db = temp_db("over_issue");
        let mut params = test_params();
        if let Some(token) = params.token.as_mut() {
            token.initial_issue = Some("1000000.0001 VOTE".parse().unwrap());
        }
        assert!(matches!(
            apply_genesis(&db, &params),
            Err(MembraError::SupplyExceeded { .. })
        ));
    }

    #[test]
    fn rejects_empty_band_table() {
        let db = temp_db("no_bands");
        let mut params = test_params();
        params.bands.clear();
        assert!(matches!(apply_genesis(&db, &params), Err(MembraError::NoStakeBands)));
    }
}
