use serde::{Deserialize, Serialize};

use crate::types::{Asset, Principal, RequestId, Symbol};

// ── Deposit ──────────────────────────────────────────────────────────────────

/// Notification of a base-currency transfer observed by the host ledger.
/// The only inbound event the staking machine consumes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Deposit {
    pub from: Principal,
    pub to: Principal,
    pub quantity: Asset,
    pub memo: String,
}

// ── Action ───────────────────────────────────────────────────────────────────

/// Every state-changing operation is one of these variants.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // ── Membership ───────────────────────────────────────────────────────────

    /// Join the member set. Authorized by `principal`.
    Register {
        principal: Principal,
        /// Must be exactly one character.
        account_type: String,
    },

    /// Remove an unstaked member. Authorized by the operator.
    Deregister {
        principal: Principal,
    },

    // ── Staking ──────────────────────────────────────────────────────────────

    /// Base-currency transfer notification; funds the sender's stake.
    Deposit(Deposit),

    /// Return a matured stake to its owner. Authorized by `principal`.
    Unstake {
        principal: Principal,
    },

    // ── Token ledger ─────────────────────────────────────────────────────────

    /// Register a new token. Authorized by the operator.
    Create {
        issuer: Principal,
        max_supply: Asset,
    },

    /// Mint onto the issuer's own balance. Authorized by the issuer.
    Issue {
        to: Principal,
        quantity: Asset,
        memo: String,
    },

    /// Burn from the issuer's balance. Authorized by the issuer.
    Retire {
        quantity: Asset,
        memo: String,
    },

    /// Move tokens between holders. Authorized by `from`.
    Transfer {
        from: Principal,
        to: Principal,
        quantity: Asset,
        memo: String,
    },

    /// Create an empty balance row. Authorized by `payer`.
    Open {
        owner: Principal,
        symbol: Symbol,
        payer: Principal,
    },

    /// Delete an empty balance row. Authorized by `owner`.
    Close {
        owner: Principal,
        symbol: Symbol,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Register { .. } => "register",
            Action::Deregister { .. } => "deregister",
            Action::Deposit(_) => "deposit",
            Action::Unstake { .. } => "unstake",
            Action::Create { .. } => "create",
            Action::Issue { .. } => "issue",
            Action::Retire { .. } => "retire",
            Action::Transfer { .. } => "transfer",
            Action::Open { .. } => "open",
            Action::Close { .. } => "close",
        }
    }
}

// ── Request ──────────────────────────────────────────────────────────────────

/// One action plus the principals that authorized it. The host has already
/// verified the authorizations; the engine only checks that the required
/// principal is among them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(default)]
    pub authorizations: Vec<Principal>,
    pub action: Action,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Self {
            authorizations: Vec::new(),
            action,
        }
    }

    pub fn authorized_by(mut self, principal: &Principal) -> Self {
        self.authorizations.push(principal.clone());
        self
    }

    pub fn is_authorized_by(&self, principal: &Principal) -> bool {
        self.authorizations.contains(principal)
    }

    /// Canonical bytes (bincode) of the request.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("request serialization is infallible")
    }

    /// BLAKE3 of the canonical bytes.
    pub fn id(&self) -> RequestId {
        RequestId::from_bytes(*blake3::hash(&self.to_bytes()).as_bytes())
    }
}

// ── Outcome ──────────────────────────────────────────────────────────────────

/// How a successfully processed request affected state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Mutations were committed.
    Applied,
    /// Accepted as a no-op (e.g. registering an existing member).
    Unchanged,
    /// Not addressed to this system (e.g. its own refund echoing back).
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_request_shape() {
        let json = r#"{
            "authorizations": ["alice"],
            "action": { "register": { "principal": "alice", "account_type": "e" } }
        }"#;
        let req: Request = serde_json::from_str(json).unwrap();
        let alice = Principal::new("alice").unwrap();
        assert!(req.is_authorized_by(&alice));
        assert_eq!(req.action.name(), "register");
    }

    #[test]
    fn request_id_depends_on_authorizations() {
        let alice = Principal::new("alice").unwrap();
        let action = Action::Unstake { principal: alice.clone() };
        let bare = Request::new(action.clone());
        let signed = Request::new(action).authorized_by(&alice);
        assert_ne!(bare.id(), signed.id());
        assert_eq!(signed.id(), signed.clone().id());
    }
}
