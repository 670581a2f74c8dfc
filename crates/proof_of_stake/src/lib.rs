//! Proof of Stake bonding module: nomination of delegatees, bonding and
//! delayed unbonding of coin in exchange for bond tokens, commission rate
//! changes bounded within a history window, and block rewards that raise the
//! delegatees' exchange rates.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_lossless,
    clippy::arithmetic_side_effects,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]

pub mod error;
pub mod handlers;
pub mod parameters;
pub mod processor;
pub mod queues;
pub mod rewards;
pub mod storage;
pub mod storage_key;
pub mod types;
pub mod validator_set_update;

#[cfg(test)]
mod tests;

pub use error::{Error, Result, TxError};
pub use parameters::PosParams;
pub use processor::{decode_tx, StakeProcessor};
pub use storage::*;
pub use types::StakeTx;

