//! The reference coin ledger: balances per denomination and owner, transfers
//! and protocol minting, dispatched into through
//! [`stakebond_systems::trans_token::SubDispatch`].

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

mod storage;
pub mod storage_key;

use stakebond_core::address::Address;
pub use stakebond_core::token::*;
use stakebond_storage::{StorageRead, StorageWrite};
use stakebond_systems::trans_token::{
    DispatchError, DispatchOutcome, SubDispatch,
};
pub use storage::*;

/// A coin movement applied by the [`TokenLedger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchRecord {
    /// A transfer between two accounts
    Transfer {
        /// Source account
        src: Address,
        /// Destination account
        dest: Address,
        /// The coin moved
        coin: Coin,
    },
    /// Newly minted coin
    Credit {
        /// Destination account
        dest: Address,
        /// The coin minted
        coin: Coin,
    },
}

/// The coin ledger over any storage. It keeps the applied coin movements of
/// the current transaction in order, which the host takes once the
/// transaction is delivered.
#[derive(Debug, Default)]
pub struct TokenLedger {
    records: Vec<DispatchRecord>,
}

impl TokenLedger {
    /// The coin movements applied since the last [`TokenLedger::take_records`]
    pub fn records(&self) -> &[DispatchRecord] {
        &self.records
    }

    /// Take the applied coin movements, leaving none behind
    pub fn take_records(&mut self) -> Vec<DispatchRecord> {
        std::mem::take(&mut self.records)
    }
}

impl<S> SubDispatch<S> for TokenLedger
where
    S: StorageRead + StorageWrite,
{
    fn transfer(
        &mut self,
        storage: &mut S,
        src: &Address,
        dest: &Address,
        coin: &Coin,
    ) -> Result<DispatchOutcome, DispatchError> {
        storage::transfer(storage, &coin.denom, src, dest, coin.amount)?;
        self.records.push(DispatchRecord::Transfer {
            src: src.clone(),
            dest: dest.clone(),
            coin: coin.clone(),
        });
        Ok(DispatchOutcome {
            log: format!("transferred {coin} from {src} to {dest}"),
        })
    }

    fn credit(
        &mut self,
        storage: &mut S,
        dest: &Address,
        coin: &Coin,
    ) -> Result<DispatchOutcome, DispatchError> {
        storage::credit_tokens(storage, &coin.denom, dest, coin.amount)?;
        tracing::debug!(%dest, %coin, "Minted coin");
        self.records.push(DispatchRecord::Credit {
            dest: dest.clone(),
            coin: coin.clone(),
        });
        Ok(DispatchOutcome {
            log: format!("credited {coin} to {dest}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use stakebond_core::address::testing::{
        established_address_1, established_address_2,
    };
    use stakebond_storage::testing::TestStorage;

    use super::*;

    #[test]
    fn test_ledger_records_applied_dispatches_only() {
        let mut storage = TestStorage::default();
        let mut ledger = TokenLedger::default();
        let alice = established_address_1();
        let bob = established_address_2();
        let coin = Coin::new("atom", Amount::from(10));

        ledger.credit(&mut storage, &alice, &coin).unwrap();
        ledger
            .transfer(
                &mut storage,
                &alice,
                &bob,
                &Coin::new("atom", Amount::from(11)),
            )
            .unwrap_err();
        let outcome = ledger.transfer(&mut storage, &alice, &bob, &coin).unwrap();
        assert!(outcome.log.starts_with("transferred 10atom"));

        assert_eq!(
            ledger.take_records(),
            vec![
                DispatchRecord::Credit {
                    dest: alice.clone(),
                    coin: coin.clone(),
                },
                DispatchRecord::Transfer {
                    src: alice,
                    dest: bob.clone(),
                    coin: coin.clone(),
                },
            ]
        );
        assert!(ledger.records().is_empty());
        assert_eq!(read_balance(&storage, "atom", &bob).unwrap(), coin.amount);
    }
}
