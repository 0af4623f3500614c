//! The withdraw-then-deposit migration sequence and its status machine.
//!
//! One migration attempt drives two wallet-signed transactions: a
//! proportional withdrawal from the source Balancer pool, then a deposit of
//! the same value into the destination Uniswap V4 pool. The deposit only
//! runs after the withdrawal receipt confirms success; a failure in between
//! leaves funds withdrawn but not redeposited, which callers must surface to
//! the user.

use {
    crate::{
        domain::eth::{H160, H256, TokenAmount, TxId},
        infra::{
            blockchain::{Receipt, Wallet},
            pool_math::PoolMathProvider,
        },
        util::conv,
    },
    std::{sync::Arc, time::Duration},
    tokio::{sync::watch, time},
};

/// Status of one migration attempt. Transitions move forward only; a new
/// user-initiated attempt starts over at [`MigrationStatus::Migrating`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum MigrationStatus {
    #[default]
    Idle,
    Migrating,
    Success {
        tx: TxId,
    },
    Error {
        message: String,
    },
}

/// Everything one migration attempt needs. Amounts are exact raw integers;
/// the share calculator's float output never appears here.
#[derive(Clone, Debug)]
pub struct MigrationRequest {
    /// Source pool address.
    pub pool: H160,
    /// The user's LP token balance as the raw decimal string reported by the
    /// subgraph.
    pub balance: String,
    /// Decimals of the LP token itself, used to scale `balance` into the
    /// exact withdrawal amount.
    pub lp_decimals: u8,
    /// Destination pool id.
    pub destination: H256,
    /// Exact token amounts to deposit.
    pub amounts: Vec<TokenAmount>,
}

/// Notified after a successful migration so upstream position lists can be
/// re-fetched and the withdrawn position disappears from the source view.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PositionRefresher: Send + Sync {
    async fn refresh(&self);
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error("Transaction reverted")]
    Reverted,
    #[error("timed out waiting for transaction confirmation")]
    ConfirmationTimeout,
    #[error("malformed LP token balance: {0:?}")]
    InvalidBalance(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Orchestrates migration attempts and publishes their status.
pub struct Migrator {
    pool_math: Arc<dyn PoolMathProvider>,
    wallet: Arc<dyn Wallet>,
    refresher: Arc<dyn PositionRefresher>,
    confirmation_timeout: Duration,
    status: watch::Sender<MigrationStatus>,
}

impl Migrator {
    pub fn new(
        pool_math: Arc<dyn PoolMathProvider>,
        wallet: Arc<dyn Wallet>,
        refresher: Arc<dyn PositionRefresher>,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            pool_math,
            wallet,
            refresher,
            confirmation_timeout,
            status: watch::channel(MigrationStatus::Idle).0,
        }
    }

    /// Observes status transitions. The UI side uses this to disable the
    /// migrate action while an attempt is in flight; that gate is advisory
    /// re-entrancy prevention, not a hard concurrency primitive.
    pub fn subscribe(&self) -> watch::Receiver<MigrationStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> MigrationStatus {
        self.status.borrow().clone()
    }

    /// Runs one migration attempt to completion and returns the final
    /// status. A disconnected wallet makes this a no-op rather than an
    /// error. Step errors never escape; they fold into
    /// [`MigrationStatus::Error`].
    pub async fn migrate(&self, request: &MigrationRequest) -> MigrationStatus {
        if self.wallet.account().is_none() {
            tracing::debug!(pool = ?request.pool, "no wallet connected, ignoring migration");
            return self.status();
        }

        self.publish(MigrationStatus::Migrating);
        let status = match self.run(request).await {
            Ok(tx) => {
                self.refresher.refresh().await;
                MigrationStatus::Success { tx }
            }
            Err(err) => {
                tracing::warn!(pool = ?request.pool, ?err, "migration failed");
                MigrationStatus::Error {
                    message: error_message(&err),
                }
            }
        };
        self.publish(status.clone());
        status
    }

    async fn run(&self, request: &MigrationRequest) -> Result<TxId, StepError> {
        // The withdrawal amount is the exact scaled balance, never the
        // derived display float.
        let bpt_in = conv::decimal_to_scaled(&request.balance, request.lp_decimals)
            .ok_or_else(|| StepError::InvalidBalance(request.balance.clone()))?;

        let withdrawal = self.pool_math.withdrawal_call(request.pool, bpt_in).await?;
        let tx = self.wallet.send_transaction(withdrawal).await?;
        tracing::info!(tx = ?tx.0, pool = ?request.pool, "withdrawal submitted");

        let receipt = self.wait_for_receipt(tx).await?;
        if !receipt.is_success() {
            return Err(StepError::Reverted);
        }

        let deposit = self
            .pool_math
            .deposit_call(request.destination, request.amounts.clone())
            .await?;
        let tx = self.wallet.send_transaction(deposit).await?;
        if tx.is_zero() {
            return Err(StepError::Reverted);
        }
        tracing::info!(tx = ?tx.0, destination = ?request.destination, "deposit submitted");

        Ok(tx)
    }

    async fn wait_for_receipt(&self, tx: TxId) -> Result<Receipt, StepError> {
        time::timeout(self.confirmation_timeout, self.wallet.wait_for_receipt(tx))
            .await
            .map_err(|_| StepError::ConfirmationTimeout)?
            .map_err(StepError::Other)
    }

    fn publish(&self, status: MigrationStatus) {
        self.status.send_replace(status);
    }
}

fn error_message(err: &StepError) -> String {
    let message = err.to_string();
    if message.is_empty() {
        "Unknown error occurred".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            domain::eth::U256,
            infra::{
                blockchain::{CallData, MockWallet},
                pool_math::MockPoolMathProvider,
            },
        },
        anyhow::anyhow,
        mockall::Sequence,
    };

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn request() -> MigrationRequest {
        MigrationRequest {
            pool: H160::from_low_u64_be(1),
            balance: "100".to_string(),
            lp_decimals: 18,
            destination: H256::repeat_byte(2),
            amounts: vec![TokenAmount {
                token: H160::from_low_u64_be(3),
                amount: U256::exp10(18),
            }],
        }
    }

    fn connected_wallet() -> MockWallet {
        let mut wallet = MockWallet::new();
        wallet
            .expect_account()
            .return_const(Some(H160::from_low_u64_be(42)));
        wallet
    }

    fn pool_math_for_both_steps() -> MockPoolMathProvider {
        let mut pool_math = MockPoolMathProvider::new();
        pool_math
            .expect_withdrawal_call()
            .withf(|_, bpt_in| *bpt_in == U256::exp10(18) * 100_u64)
            .returning(|_, _| Ok(CallData::default()));
        pool_math
            .expect_deposit_call()
            .returning(|_, _| Ok(CallData::default()));
        pool_math
    }

    fn migrator(
        pool_math: MockPoolMathProvider,
        wallet: MockWallet,
        refresher: MockPositionRefresher,
    ) -> Migrator {
        Migrator::new(
            Arc::new(pool_math),
            Arc::new(wallet),
            Arc::new(refresher),
            TIMEOUT,
        )
    }

    #[tokio::test]
    async fn successful_migration() {
        let mut wallet = connected_wallet();
        let mut sequence = Sequence::new();
        wallet
            .expect_send_transaction()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(TxId(H256::repeat_byte(0xaa))));
        wallet
            .expect_wait_for_receipt()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Receipt::Success));
        wallet
            .expect_send_transaction()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(TxId(H256::repeat_byte(0xbb))));

        let mut refresher = MockPositionRefresher::new();
        refresher.expect_refresh().times(1).return_const(());

        let migrator = migrator(pool_math_for_both_steps(), wallet, refresher);
        let status = migrator.migrate(&request()).await;
        assert_eq!(
            status,
            MigrationStatus::Success {
                tx: TxId(H256::repeat_byte(0xbb)),
            }
        );
        assert_eq!(migrator.status(), status);
    }

    #[tokio::test]
    async fn reverted_withdrawal_skips_the_deposit() {
        let mut wallet = connected_wallet();
        wallet
            .expect_send_transaction()
            .times(1)
            .returning(|_| Ok(TxId(H256::repeat_byte(0xaa))));
        wallet
            .expect_wait_for_receipt()
            .returning(|_| Ok(Receipt::Reverted));

        let mut pool_math = MockPoolMathProvider::new();
        pool_math
            .expect_withdrawal_call()
            .returning(|_, _| Ok(CallData::default()));
        pool_math.expect_deposit_call().never();

        let mut refresher = MockPositionRefresher::new();
        refresher.expect_refresh().never();

        let migrator = migrator(pool_math, wallet, refresher);
        assert_eq!(
            migrator.migrate(&request()).await,
            MigrationStatus::Error {
                message: "Transaction reverted".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn empty_deposit_result_is_a_revert() {
        let mut wallet = connected_wallet();
        let mut sequence = Sequence::new();
        wallet
            .expect_send_transaction()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(TxId(H256::repeat_byte(0xaa))));
        wallet
            .expect_wait_for_receipt()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Receipt::Success));
        // A zero hash is how the wallet reports an empty deposit result.
        wallet
            .expect_send_transaction()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(TxId::default()));

        let mut refresher = MockPositionRefresher::new();
        refresher.expect_refresh().never();

        let migrator = migrator(pool_math_for_both_steps(), wallet, refresher);
        assert_eq!(
            migrator.migrate(&request()).await,
            MigrationStatus::Error {
                message: "Transaction reverted".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn step_errors_fold_into_the_error_state() {
        let mut wallet = connected_wallet();
        wallet
            .expect_send_transaction()
            .returning(|_| Err(anyhow!("user rejected the signature")));

        let mut pool_math = MockPoolMathProvider::new();
        pool_math
            .expect_withdrawal_call()
            .returning(|_, _| Ok(CallData::default()));

        let mut refresher = MockPositionRefresher::new();
        refresher.expect_refresh().never();

        let migrator = migrator(pool_math, wallet, refresher);
        assert_eq!(
            migrator.migrate(&request()).await,
            MigrationStatus::Error {
                message: "user rejected the signature".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn disconnected_wallet_is_a_no_op() {
        let mut wallet = MockWallet::new();
        wallet.expect_account().return_const(None);
        wallet.expect_send_transaction().never();

        let mut pool_math = MockPoolMathProvider::new();
        pool_math.expect_withdrawal_call().never();

        let migrator = migrator(pool_math, wallet, MockPositionRefresher::new());
        assert_eq!(migrator.migrate(&request()).await, MigrationStatus::Idle);
    }

    #[tokio::test]
    async fn confirmation_wait_is_bounded() {
        struct NeverConfirms;

        #[async_trait::async_trait]
        impl Wallet for NeverConfirms {
            fn account(&self) -> Option<H160> {
                Some(H160::from_low_u64_be(42))
            }

            async fn send_transaction(&self, _call: CallData) -> anyhow::Result<TxId> {
                Ok(TxId(H256::repeat_byte(0xaa)))
            }

            async fn wait_for_receipt(&self, _tx: TxId) -> anyhow::Result<Receipt> {
                std::future::pending().await
            }
        }

        let mut pool_math = MockPoolMathProvider::new();
        pool_math
            .expect_withdrawal_call()
            .returning(|_, _| Ok(CallData::default()));
        pool_math.expect_deposit_call().never();

        let migrator = Migrator::new(
            Arc::new(pool_math),
            Arc::new(NeverConfirms),
            Arc::new(MockPositionRefresher::new()),
            Duration::from_millis(10),
        );
        assert_eq!(
            migrator.migrate(&request()).await,
            MigrationStatus::Error {
                message: "timed out waiting for transaction confirmation".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn status_transitions_are_observable() {
        let mut wallet = connected_wallet();
        wallet
            .expect_send_transaction()
            .returning(|_| Ok(TxId(H256::repeat_byte(0xaa))));
        wallet
            .expect_wait_for_receipt()
            .returning(|_| Ok(Receipt::Success));

        let mut refresher = MockPositionRefresher::new();
        refresher.expect_refresh().return_const(());

        let migrator = migrator(pool_math_for_both_steps(), wallet, refresher);
        let mut status = migrator.subscribe();
        assert_eq!(*status.borrow(), MigrationStatus::Idle);

        migrator.migrate(&request()).await;
        assert!(status.has_changed().unwrap());
        assert_eq!(
            *status.borrow_and_update(),
            MigrationStatus::Success {
                tx: TxId(H256::repeat_byte(0xaa)),
            }
        );
    }
}
