use std::collections::BTreeMap;

use membra_core::account::StakeBand;
use membra_core::error::MembraError;
use membra_core::types::{Asset, Principal, Symbol};
use serde::{Deserialize, Serialize};

/// Everything a fresh deployment is bootstrapped with.
///
/// Read from a JSON document by `membra-node init --genesis <file>`:
///
/// ```json
/// {
///   "system": "membra",
///   "operator": "operator",
///   "stake_symbol": "4,TLOS",
///   "principals": ["alice", "bob"],
///   "bands": [
///     { "threshold": 0,   "requirements": { "e": "10.0000 TLOS" } },
///     { "threshold": 100, "requirements": { "e": "5.0000 TLOS" } }
///   ],
///   "token": { "issuer": "membra", "max_supply": "1000000.0000 VOTE" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisParams {
    /// Principal stakes are paid to and refunded from.
    pub system: Principal,
    /// Authority for deregistration and token creation.
    pub operator: Principal,
    pub stake_symbol: Symbol,
    /// Host accounts known to the directory. `system`, `operator` and the
    /// token issuer are added implicitly.
    #[serde(default)]
    pub principals: Vec<Principal>,
    pub bands: Vec<StakeBand>,
    /// Initial master switch position; unset means enabled.
    #[serde(default)]
    pub master_switch: Option<bool>,
    /// Any further configuration parameters, stored verbatim.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub token: Option<GenesisToken>,
}

/// Token created at genesis, optionally with an initial issue to its issuer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisToken {
    pub issuer: Principal,
    pub max_supply: Asset,
    #[serde(default)]
    pub initial_issue: Option<Asset>,
}

impl GenesisParams {
    pub fn from_json(text: &str) -> Result<Self, MembraError> {
        serde_json::from_str(text).map_err(|e| MembraError::Serialization(e.to_string()))
    }
}
