// ── Shared test helpers ──────────────────────────────────────────────────────

use std::sync::Arc;

use membra_core::account::StakeBand;
use membra_core::host::EngineConfig;
use membra_core::request::{Action, Request};
use membra_core::types::{AccountType, Asset, Principal};

use crate::db::StateDb;
use crate::engine::LedgerEngine;

pub const NOW: i64 = 1_700_000_000;

pub fn temp_db(name: &str) -> StateDb {
    let dir = std::env::temp_dir().join(format!("membra_state_test_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    StateDb::open(&dir).expect("open temp db")
}

pub fn p(name: &str) -> Principal {
    Principal::new(name).unwrap()
}

pub fn asset(s: &str) -> Asset {
    s.parse().unwrap()
}

pub fn config() -> EngineConfig {
    EngineConfig {
        system: p("membra"),
        operator: p("operator"),
        stake_symbol: "4,TLOS".parse().unwrap(),
    }
}

/// `{0: 10, 100: 5, 1000: 1}` TLOS for type `e`; type `b` always owes 50.
pub fn seed_bands(db: &StateDb) {
    for (threshold, e) in [(0, "10.0000 TLOS"), (100, "5.0000 TLOS"), (1000, "1.0000 TLOS")] {
        let band = StakeBand::new(threshold)
            .with(AccountType('e'), asset(e))
            .with(AccountType('b'), asset("50.0000 TLOS"));
        db.put_band(&band).unwrap();
    }
}

/// Host principals every test may refer to.
pub fn seed_principals(db: &StateDb) {
    for name in ["membra", "operator", "alice", "bob", "carol", "dave", "issuer"] {
        db.put_principal(&p(name)).unwrap();
    }
}

/// Engine over a fresh DB with bands and principals seeded; refunds go to
/// the DB outbox.
pub fn test_engine(name: &str) -> LedgerEngine {
    let db = temp_db(name);
    seed_bands(&db);
    seed_principals(&db);
    LedgerEngine::with_outbox(Arc::new(db), config())
}

pub fn signed(action: Action, by: &Principal) -> Request {
    Request::new(action).authorized_by(by)
}

pub fn register_req(who: &Principal, account_type: &str) -> Request {
    signed(
        Action::Register {
            principal: who.clone(),
            account_type: account_type.to_string(),
        },
        who,
    )
}
