//! Narrow interfaces to what the host ledger provides around the core:
//! configuration, the base-currency ledger and the account directory.

use serde::{Deserialize, Serialize};

use crate::account::StakeBand;
use crate::error::MembraError;
use crate::types::{Asset, Principal, Symbol};

/// Read access to dynamic configuration.
pub trait ConfigStore {
    /// Raw parameter value, `None` when unset.
    fn read_parameter(&self, name: &str) -> Result<Option<String>, MembraError>;

    /// Stake-requirement bands in ascending threshold order.
    fn stake_bands(&self) -> Result<Vec<StakeBand>, MembraError>;
}

/// A base-currency transfer leaving this system.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OutboundTransfer {
    pub from: Principal,
    pub to: Principal,
    pub quantity: Asset,
    pub memo: String,
}

/// The base-currency ledger stakes are paid into and refunded from.
/// `send` is synchronous; an error means nothing was sent.
pub trait CurrencyLedger: Send + Sync {
    fn send(&self, transfer: &OutboundTransfer) -> Result<(), MembraError>;
}

/// Which principals exist on the host.
pub trait AccountDirectory {
    fn principal_exists(&self, principal: &Principal) -> Result<bool, MembraError>;
}

/// Deployment identity, fixed at genesis.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// This system's own principal: destination of stake deposits and
    /// sender of refunds.
    pub system: Principal,
    /// Authority for operator-only actions (deregister, create).
    pub operator: Principal,
    /// Base-currency symbol every stake requirement is denominated in.
    pub stake_symbol: Symbol,
}
