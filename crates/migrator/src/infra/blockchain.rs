//! Trait seam over the connected wallet. Connection management, signing and
//! broadcasting all live outside this crate; the orchestrator only consumes
//! the finished capability.

use {
    crate::domain::eth::{H160, TxId, U256},
    anyhow::Result,
};

/// A transaction payload ready to be signed and broadcast.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallData {
    pub to: H160,
    pub data: Vec<u8>,
    pub value: U256,
}

/// Outcome of an on-chain transaction as reported by its receipt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Receipt {
    Success,
    Reverted,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The connected wallet and its view of transaction confirmation.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Wallet: Send + Sync {
    /// The connected account, if any. `None` disables every migration
    /// action.
    fn account(&self) -> Option<H160>;

    /// Signs and broadcasts a transaction. Broadcasting is irreversible;
    /// callers must treat a returned hash as money in motion.
    async fn send_transaction(&self, call: CallData) -> Result<TxId>;

    /// Waits until the transaction is confirmed and returns its receipt
    /// status. No timeout of its own; callers bound the wait.
    async fn wait_for_receipt(&self, tx: TxId) -> Result<Receipt>;
}
