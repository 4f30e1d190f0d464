/// ─── Membra Protocol Constants ──────────────────────────────────────────────
///
/// Staked membership: every registered account locks a population-banded
/// bond of the base currency and may withdraw it after the hold period.

// ── Staking ──────────────────────────────────────────────────────────────────

/// Mandatory interval between staking and eligibility to unstake: 7 days.
pub const HOLD_PERIOD_SECS: i64 = 7 * 24 * 3600;

/// Stake requirement (base units) returned for an account type that no band
/// lists. Large enough that no one can ever fund it.
pub const UNRECOGNIZED_TYPE_STAKE: i64 = MAX_ASSET_AMOUNT;

/// Memo attached to the outbound transfer that returns a stake.
pub const REFUND_MEMO: &str = "stake refund";

// ── Configuration parameters ─────────────────────────────────────────────────

/// Name of the boolean parameter that enables or disables every mutating
/// action. Missing or unreadable means enabled.
pub const MASTER_SWITCH_PARAM: &str = "master_switch";

// ── Assets ───────────────────────────────────────────────────────────────────

/// Largest representable asset amount in base units: 2^62 - 1.
pub const MAX_ASSET_AMOUNT: i64 = (1 << 62) - 1;

/// Maximum decimal places a symbol may declare.
pub const MAX_PRECISION: u8 = 18;

/// Maximum length of a symbol code (upper-case ASCII letters).
pub const MAX_SYMBOL_CODE_LEN: usize = 7;

/// Maximum memo length in bytes for token actions.
pub const MAX_MEMO_BYTES: usize = 256;

// ── Principals ───────────────────────────────────────────────────────────────

/// Maximum length of a principal name.
pub const MAX_PRINCIPAL_LEN: usize = 12;
