use thiserror::Error;

#[derive(Debug, Error)]
pub enum MembraError {
    // ── Authorization / gate ─────────────────────────────────────────────────
    #[error("missing required authority of {0}")]
    Unauthorized(String),

    #[error("system is disabled by the master switch")]
    SystemDisabled,

    // ── Registration errors ──────────────────────────────────────────────────
    #[error("account is not registered: {0}")]
    NotRegistered(String),

    #[error("account type must be exactly one character, got {0:?}")]
    InvalidAccountType(String),

    #[error("cannot deregister while staked: {0}")]
    StillStaked(String),

    #[error("stake requirement table is empty")]
    NoStakeBands,

    // ── Staking errors ───────────────────────────────────────────────────────
    #[error("account already staked: {0}")]
    AlreadyStaked(String),

    #[error("nothing staked for account {0}")]
    NothingStaked(String),

    #[error("stake must be exactly {expected}, got {got}")]
    StakeMismatch { expected: String, got: String },

    #[error("hold period not elapsed (unstake allowed at {unlock_at})")]
    HoldNotElapsed { unlock_at: i64 },

    #[error("ledger time {0} leaves no room for the hold period")]
    TimeOutOfRange(i64),

    #[error("refund transfer failed: {0}")]
    RefundFailed(String),

    // ── Token errors ─────────────────────────────────────────────────────────
    #[error("token with symbol already exists: {0}")]
    DuplicateSymbol(String),

    #[error("token with symbol does not exist: {0}")]
    SymbolNotFound(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("quantity exceeds available supply ({available} left)")]
    SupplyExceeded { available: String },

    #[error("overdrawn balance: need {need}, have {have}")]
    Overdrawn { need: String, have: String },

    #[error("account does not exist: {0}")]
    AccountNotFound(String),

    #[error("cannot transfer to self")]
    SelfTransfer,

    #[error("tokens can only be issued to the issuer account")]
    IssuerOnly,

    #[error("balance row already deleted or never existed: {0}")]
    BalanceNotFound(String),

    #[error("cannot close a balance row holding {0}")]
    NonZeroBalance(String),

    #[error("supply {supply} of {symbol} does not match the sum of balances {held}")]
    SupplyMismatch { symbol: String, supply: i64, held: i64 },

    // ── Parsing ──────────────────────────────────────────────────────────────
    #[error("invalid principal name: {0:?}")]
    InvalidName(String),

    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("invalid asset: {0:?}")]
    InvalidAsset(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}
