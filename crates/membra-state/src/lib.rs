//! membra-state
//!
//! Persistent state and the state transition engine. Every mutating action
//! goes through `LedgerEngine::apply`, which gates on the master switch,
//! stages the action's mutations and commits them atomically.

pub mod db;
pub mod engine;
pub mod gate;
pub mod threshold;

mod registry;
mod staking;
mod tokens;

#[cfg(test)]
mod testutil;

pub use db::StateDb;
pub use engine::LedgerEngine;
