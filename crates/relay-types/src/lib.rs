//! Common types for the job-board gasless relay.
//!
//! Everything that crosses a crate boundary lives here: the Solidity ABI, the
//! action set and its typed-data digests, the on-ledger error taxonomy, and
//! the HTTP wire format.

pub mod abi;
pub mod action;
pub mod api;
pub mod delivery;
pub mod errors;
pub mod request;
pub mod typed_data;
pub mod validation;

pub use action::*;
pub use api::*;
pub use delivery::*;
pub use errors::*;
pub use request::*;
pub use typed_data::*;
pub use validation::*;
