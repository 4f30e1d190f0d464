pub mod constants;
pub mod error;
pub mod types;
pub mod account;
pub mod token;
pub mod request;
pub mod host;

pub use constants::*;
pub use error::MembraError;
pub use types::*;
pub use account::*;
pub use token::*;
pub use request::*;
pub use host::*;
