//! A test host that delivers transactions to the [`StakeProcessor`] over the
//! shared state, with the reference coin ledger as sub-dispatcher.

#![allow(clippy::arithmetic_side_effects)]

use proptest::prelude::*;
use stakebond_core::address::testing::address_from_simple_seed;
use stakebond_core::address::Address;
use stakebond_core::dec::Dec;
use stakebond_core::storage::BlockHeight;
use stakebond_core::token::{Amount, Coin};
use stakebond_state::State;
use stakebond_systems::processor::{
    AuthenticatedSender, DeliverResult, TransactionProcessor, TxContext,
};
use stakebond_trans_token::{credit_tokens, read_balance, TokenLedger};

use crate::error::{Result, TxError};
use crate::parameters::PosParams;
use crate::processor::StakeProcessor;
use crate::storage::{
    read_delegatee_bonds, read_delegator_bonds, read_retired_delegatee,
};
use crate::types::{
    Bond, DelegateeBond, ModifyCommission, Nominate, StakeTx, Unbond,
};

pub struct TestShell {
    pub state: State,
    pub ledger: TokenLedger,
    pub params: PosParams,
    height: BlockHeight,
}

impl TestShell {
    pub fn new(params: PosParams) -> Self {
        Self {
            state: State::default(),
            ledger: TokenLedger::default(),
            params,
            height: BlockHeight(1),
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// Mint genesis coin to an account
    pub fn fund(&mut self, owner: &Address, amount: u64) {
        credit_tokens(
            &mut self.state,
            &self.params.bond_denom,
            owner,
            Amount::from(amount),
        )
        .expect("Genesis credit must succeed");
        self.state.commit_tx();
    }

    /// Commit the current block and start a new one at the given height
    pub fn next_block(&mut self, height: u64) {
        let height = BlockHeight(height);
        assert!(height > self.height, "Heights must increase");
        self.state
            .commit_block(self.height)
            .expect("Block commit must succeed");
        self.height = height;
    }

    /// Deliver a transaction signed by a single account. Panics on a fatal
    /// error.
    pub fn deliver(
        &mut self,
        signer: &Address,
        tx: StakeTx,
    ) -> DeliverResult<TxError> {
        self.deliver_signed(vec![signer.clone()], tx)
            .expect("Delivering must not fail fatally")
    }

    /// Deliver a transaction with the given signers. The transaction's
    /// changes are committed unless the processor failed fatally, in which
    /// case the whole block and the ledger's records are dropped.
    pub fn deliver_signed(
        &mut self,
        signers: Vec<Address>,
        tx: StakeTx,
    ) -> Result<DeliverResult<TxError>> {
        let ctx = TxContext::new(
            self.height,
            signers.into_iter().map(AuthenticatedSender::new).collect(),
        );
        let processor = StakeProcessor::new(&self.params);
        match processor.deliver(&ctx, &mut self.state, &tx, &mut self.ledger)
        {
            Ok(res) => {
                self.state.commit_tx();
                Ok(res)
            }
            Err(err) => {
                self.state.drop_block();
                // The block's coin movements are dropped with it
                self.ledger.take_records();
                Err(err)
            }
        }
    }

    pub fn balance(&self, owner: &Address) -> u64 {
        read_balance(&self.state, &self.params.bond_denom, owner)
            .expect("Balance must be readable")
            .into()
    }

    pub fn delegatee(&self, delegatee: &Address) -> Option<DelegateeBond> {
        read_delegatee_bonds(&self.state)
            .expect("Delegatee bonds must be readable")
            .get(delegatee)
            .map(|(_, bond)| bond.clone())
    }

    pub fn retired(&self, delegatee: &Address) -> Option<DelegateeBond> {
        read_retired_delegatee(&self.state, delegatee)
            .expect("Retired delegatee must be readable")
    }

    /// The bond tokens a delegator holds of a delegatee, `None` if there's
    /// no such bond
    pub fn bond_tokens(
        &self,
        delegator: &Address,
        delegatee: &Address,
    ) -> Option<Dec> {
        read_delegator_bonds(&self.state, delegator)
            .expect("Delegator bonds must be readable")
            .and_then(|bonds| {
                bonds.get(delegatee).map(|(_, bond)| bond.bond_tokens)
            })
    }

    pub fn coin(&self, amount: u64) -> Coin {
        Coin::new(&self.params.bond_denom, Amount::from(amount))
    }

    pub fn bond_tx(&self, delegatee: &Address, amount: u64) -> StakeTx {
        StakeTx::Bond(Bond {
            delegatee: delegatee.clone(),
            amount: self.coin(amount),
        })
    }

    pub fn nominate_tx(
        &self,
        nominee: &Address,
        commission: Dec,
        amount: u64,
    ) -> StakeTx {
        StakeTx::Nominate(Nominate {
            nominee: nominee.clone(),
            commission,
            amount: self.coin(amount),
        })
    }
}

pub fn unbond_tx(delegatee: &Address, bond_tokens: impl Into<Dec>) -> StakeTx {
    StakeTx::Unbond(Unbond {
        delegatee: delegatee.clone(),
        bond_tokens: bond_tokens.into(),
    })
}

pub fn modify_commission_tx(delegatee: &Address, commission: Dec) -> StakeTx {
    StakeTx::ModifyCommission(ModifyCommission {
        delegatee: delegatee.clone(),
        commission,
    })
}

/// A percentage as a `Dec`
pub fn percent(value: i128) -> Dec {
    Dec::new(value, 2).expect("Percentage must be valid")
}

/// Params with short windows and a high inflation so that rewards and
/// queues take effect within a few blocks
pub fn fast_params() -> PosParams {
    PosParams {
        unbonding_period: 5,
        commission_history_period: 5,
        inflation: percent(50),
        blocks_per_year: 100,
        ..PosParams::default()
    }
}

/// The accounts of a generated ledger history
#[derive(Debug, Clone)]
pub struct Accounts {
    pub owners: Vec<Address>,
    pub delegatees: Vec<Address>,
    pub delegators: Vec<Address>,
}

impl Accounts {
    pub const DELEGATEES: usize = 3;
    pub const DELEGATORS: usize = 4;
    pub const FUNDS: u64 = 1_000_000;

    pub fn new() -> Self {
        let seeds = |offset: u64, len: usize| {
            (offset..offset + len as u64)
                .map(address_from_simple_seed)
                .collect::<Vec<_>>()
        };
        Self {
            owners: seeds(100, Self::DELEGATEES),
            delegatees: seeds(200, Self::DELEGATEES),
            delegators: seeds(300, Self::DELEGATORS),
        }
    }

    /// Fund everyone and nominate all the delegatees
    pub fn init(&self, shell: &mut TestShell) {
        for account in self.owners.iter().chain(&self.delegators) {
            shell.fund(account, Self::FUNDS);
        }
        for (owner, delegatee) in self.owners.iter().zip(&self.delegatees) {
            let tx = shell.nominate_tx(delegatee, percent(10), 1_000);
            let res = shell.deliver(owner, tx);
            assert!(res.is_ok(), "Nomination failed: {}", res.log);
        }
    }
}

/// A step of a generated ledger history
#[derive(Debug, Clone)]
pub enum Op {
    Bond {
        delegator: usize,
        delegatee: usize,
        amount: u64,
    },
    Unbond {
        delegator: usize,
        delegatee: usize,
        percent: i128,
    },
    ModifyCommission {
        delegatee: usize,
        commission: Dec,
    },
    NextBlock {
        blocks: u64,
    },
}

pub fn arb_op() -> impl Strategy<Value = Op> {
    let delegatee = 0..Accounts::DELEGATEES;
    let delegator = 0..Accounts::DELEGATORS;
    prop_oneof![
        4 => (delegator.clone(), delegatee.clone(), 1_u64..20_000).prop_map(
            |(delegator, delegatee, amount)| Op::Bond {
                delegator,
                delegatee,
                amount,
            }
        ),
        3 => (delegator, delegatee.clone(), 1_i128..=100).prop_map(
            |(delegator, delegatee, percent)| Op::Unbond {
                delegator,
                delegatee,
                percent,
            }
        ),
        1 => (delegatee, 0_i128..=100).prop_map(|(delegatee, commission)| {
            Op::ModifyCommission {
                delegatee,
                commission: percent(commission),
            }
        }),
        3 => (1_u64..4).prop_map(|blocks| Op::NextBlock { blocks }),
    ]
}

pub fn arb_ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(arb_op(), 1..max_len)
}

/// Apply a generated step. Rejected transactions are expected, fatal errors
/// are not.
pub fn apply_op(shell: &mut TestShell, accounts: &Accounts, op: &Op) {
    match op {
        Op::Bond {
            delegator,
            delegatee,
            amount,
        } => {
            let tx = shell.bond_tx(&accounts.delegatees[*delegatee], *amount);
            shell.deliver(&accounts.delegators[*delegator], tx);
        }
        Op::Unbond {
            delegator,
            delegatee,
            percent: share,
        } => {
            let delegator = &accounts.delegators[*delegator];
            let delegatee = &accounts.delegatees[*delegatee];
            let held = shell
                .bond_tokens(delegator, delegatee)
                .unwrap_or_default();
            let tokens = held
                .checked_mul(percent(*share))
                .expect("Share must not overflow");
            shell.deliver(delegator, unbond_tx(delegatee, tokens));
        }
        Op::ModifyCommission {
            delegatee,
            commission,
        } => {
            let tx = modify_commission_tx(
                &accounts.delegatees[*delegatee],
                *commission,
            );
            shell.deliver(&accounts.owners[*delegatee], tx);
        }
        Op::NextBlock { blocks } => {
            let height = shell.height().0 + blocks;
            shell.next_block(height);
        }
    }
}

/// The escrow of every delegatee backs its deposit and the coin value of
/// all its outstanding bond tokens, and the delegators' bond tokens add up
/// to the delegatee's total.
pub fn check_ledger_invariants(shell: &TestShell, accounts: &Accounts) {
    for delegatee in &accounts.delegatees {
        let bond = match shell.delegatee(delegatee) {
            Some(bond) => {
                let held = accounts
                    .delegators
                    .iter()
                    .filter_map(|delegator| {
                        shell.bond_tokens(delegator, delegatee)
                    })
                    .try_fold(Dec::zero(), |acc, tokens| {
                        acc.checked_add(tokens)
                    })
                    .expect("Bond tokens must not overflow");
                assert_eq!(held, bond.total_bond_tokens);
                bond
            }
            None => match shell.retired(delegatee) {
                Some(bond) => {
                    assert!(bond.total_bond_tokens.is_zero());
                    assert!(bond.pending_unbonds > 0);
                    bond
                }
                None => continue,
            },
        };
        assert!(bond.exchange_rate >= Dec::one());
        let backed = bond
            .claim_tokens()
            .and_then(|claims| claims.checked_mul(bond.exchange_rate))
            .and_then(|coin| coin.to_amount())
            .expect("Claims must not overflow");
        let required = u64::from(backed) + u64::from(bond.deposit);
        let escrow = shell.balance(&bond.account);
        assert!(
            escrow >= required,
            "Escrow {} of {delegatee} holds {escrow}, requires {required}",
            bond.account
        );
    }
}
