//! External pool-math capability. Slippage tolerance, permit signatures and
//! call-data building belong to the protocol SDKs; the orchestrator depends
//! only on this interface, which also makes the migration sequence fully
//! mockable in tests.

use {
    crate::{
        domain::eth::{H160, H256, TokenAmount, U256},
        infra::blockchain::CallData,
    },
    anyhow::Result,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PoolMathProvider: Send + Sync {
    /// Builds the proportional remove-liquidity call withdrawing `bpt_in`
    /// (the user's full raw LP balance) from the source pool.
    async fn withdrawal_call(&self, pool: H160, bpt_in: U256) -> Result<CallData>;

    /// Builds the call depositing the given exact token amounts into the
    /// destination pool.
    async fn deposit_call(&self, pool_id: H256, amounts: Vec<TokenAmount>) -> Result<CallData>;
}
