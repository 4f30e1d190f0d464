//! Banded stake-requirement lookup.

use membra_core::account::StakeBand;
use membra_core::constants::UNRECOGNIZED_TYPE_STAKE;
use membra_core::error::MembraError;
use membra_core::host::ConfigStore;
use membra_core::types::{AccountType, Asset, Symbol};
use tracing::debug;

/// The band in force at `population`: the last one whose threshold is at
/// most `population`, or the lowest band when population is below them all.
/// `bands` must be in ascending threshold order.
pub fn select_band(bands: &[StakeBand], population: u64) -> Option<&StakeBand> {
    let idx = bands.partition_point(|b| b.threshold <= population);
    if idx == 0 {
        bands.first()
    } else {
        bands.get(idx - 1)
    }
}

/// Stake owed by `account_type` at `population`.
///
/// A type the band does not list owes `UNRECOGNIZED_TYPE_STAKE`, which can
/// never be funded. An empty table is `NoStakeBands`.
pub fn resolve(
    bands: &[StakeBand],
    population: u64,
    account_type: AccountType,
    stake_symbol: &Symbol,
) -> Result<Asset, MembraError> {
    let band = select_band(bands, population).ok_or(MembraError::NoStakeBands)?;
    let requirement = match band.requirements.get(&account_type) {
        Some(asset) => asset.clone(),
        None => Asset {
            amount: UNRECOGNIZED_TYPE_STAKE,
            symbol: stake_symbol.clone(),
        },
    };
    debug!(
        population,
        band = band.threshold,
        %account_type,
        requirement = %requirement,
        "stake requirement resolved"
    );
    Ok(requirement)
}

/// `resolve` against the bands currently held in `config`.
pub fn resolve_from<C: ConfigStore + ?Sized>(
    config: &C,
    population: u64,
    account_type: AccountType,
    stake_symbol: &Symbol,
) -> Result<Asset, MembraError> {
    let bands = config.stake_bands()?;
    resolve(&bands, population, account_type, stake_symbol)
}
