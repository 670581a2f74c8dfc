//! The core public types shared by the stakebond crates: fixed-point
//! decimals, addresses, token amounts and storage keys.

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

pub mod address;
pub mod arith;
pub mod dec;
pub mod proof_of_stake;
pub mod storage;
pub mod token;
pub mod uint;

/// Borsh binary encoding (re-exported) from official crate.
pub mod borsh {
    pub use borsh::*;

    /// Serialize a value to a vector of bytes.
    pub trait BorshSerializeExt {
        /// Serialize `self` with borsh. Writing into a `Vec` cannot fail.
        fn serialize_to_vec(&self) -> Vec<u8>;
    }

    impl<T: BorshSerialize> BorshSerializeExt for T {
        fn serialize_to_vec(&self) -> Vec<u8> {
            let mut bytes = Vec::new();
            // Writing into a `Vec` is infallible
            let _ = self.serialize(&mut bytes);
            bytes
        }
    }
}
