//! membra-query
//!
//! Read-only views over the state DB: member status and token accounting.
//! All writes go through `membra_state::LedgerEngine`.

pub mod member;
pub mod token;

pub use member::MemberQuery;
pub use token::{ConservationReport, TokenQuery};
