//! HTTP relay service for gasless job-board actions.
//!
//! - `api`: axum routes for `/relay`, `/nonce/{address}` and `/health`
//! - `cli`: command-line arguments of the binary
//! - `error`: relay failures and their HTTP mapping
//! - `service`: validation, simulation and delivery of one submission

pub mod api;
pub mod cli;
pub mod error;
pub mod service;

pub use error::RelayError;
pub use service::{build_delivery, RelayService};
