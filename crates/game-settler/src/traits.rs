//! Trait definitions for external system boundaries.
//!
//! These traits abstract the scoreboard, the blockchain and the announcement
//! channel to enable unit testing with mocks.

use {
    crate::{feed::EventSnapshot, notifier::Announcement},
    alloy::{
        primitives::{Address, B256, Bytes, Log, U256},
        sol_types::SolCall,
    },
    anyhow::Result,
};

/// A state-mutating contract call that has not been priced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub to: Address,
    /// ABI encoded selector and arguments.
    pub calldata: Bytes,
    /// Used for logging only.
    pub label: &'static str,
}

impl TransactionIntent {
    pub fn new<C: SolCall>(to: Address, call: &C, label: &'static str) -> Self {
        Self {
            to,
            calldata: call.abi_encode().into(),
            label,
        }
    }
}

/// Fee parameters decided by the gas strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParameters {
    /// `None` lets the node estimate the limit when the transaction is filled.
    pub gas_limit: Option<u64>,
    /// Price per gas unit in wei.
    pub gas_price: u128,
}

/// The parts of a mined transaction's receipt the settler cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// `false` if the transaction was mined but reverted.
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Source of the current game schedule.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScoreFeed: Send + Sync {
    /// Returns the current snapshot of all games. Failures are logged and
    /// result in an empty list.
    async fn fetch(&self) -> Vec<EventSnapshot>;
}

/// Abstracts blockchain read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainRead: Send + Sync {
    /// Address of the account that signs the settlement transactions.
    fn account(&self) -> Address;

    /// Native currency balance of [`ChainRead::account`] in wei.
    async fn balance(&self) -> Result<U256>;

    /// The node's currently suggested gas price in wei.
    async fn gas_price(&self) -> Result<u128>;

    /// Simulates the call and returns the gas units it consumes.
    async fn estimate_gas(&self, intent: &TransactionIntent) -> Result<u64>;

    /// Reads the `decimals()` of an ERC20-like token.
    async fn decimals(&self, token: Address) -> Result<u8>;
}

/// Abstracts blockchain write operations (transaction submission).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainWrite: Send + Sync {
    /// Signs and broadcasts the transaction, returning its hash.
    async fn submit(&self, intent: &TransactionIntent, fees: FeeParameters) -> Result<B256>;

    /// Waits until the transaction is mined. Does not time out.
    async fn confirm(&self, tx_hash: B256) -> Result<SettlementReceipt>;
}

/// Outbound announcement of a successful settlement.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Announcing: Send + Sync {
    async fn announce(&self, announcement: &Announcement) -> Result<()>;
}
