use {
    crate::{metrics::Metrics, traits::ChainRead},
    alloy::primitives::{U256, utils::format_ether},
    std::sync::Arc,
};

/// 0.01 of the native currency.
pub const LOW_BALANCE_THRESHOLD: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowBalance {
    pub balance: U256,
    pub threshold: U256,
}

pub fn check(balance: U256, threshold: U256) -> Option<LowBalance> {
    (balance < threshold).then_some(LowBalance { balance, threshold })
}

/// Warns when the operating account is running out of gas money. Never
/// stops the settler.
pub struct BalanceGuard {
    chain: Arc<dyn ChainRead>,
    threshold: U256,
}

impl BalanceGuard {
    pub fn new(chain: Arc<dyn ChainRead>, threshold: U256) -> Self {
        Self { chain, threshold }
    }

    pub async fn run(&self) -> Option<LowBalance> {
        let balance = match self.chain.balance().await {
            Ok(balance) => balance,
            Err(err) => {
                tracing::warn!(?err, "failed to query balance");
                return None;
            }
        };
        Metrics::get().record_balance(balance);
        let low = check(balance, self.threshold);
        match low {
            Some(low) => tracing::warn!(
                account = %self.chain.account(),
                balance = %format_ether(low.balance),
                threshold = %format_ether(low.threshold),
                "low balance, please fund the account with gas money"
            ),
            None => tracing::debug!(balance = %format_ether(balance), "balance"),
        }
        low
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::traits::MockChainRead,
        alloy::primitives::{Address, utils::parse_ether},
        anyhow::anyhow,
    };

    #[test]
    fn threshold_is_a_hundredth_ether() {
        assert_eq!(LOW_BALANCE_THRESHOLD, parse_ether("0.01").unwrap());
    }

    #[test]
    fn warns_below_threshold() {
        let threshold = LOW_BALANCE_THRESHOLD;
        assert_eq!(
            check(threshold - U256::from(1), threshold),
            Some(LowBalance {
                balance: threshold - U256::from(1),
                threshold,
            })
        );
        assert_eq!(check(U256::ZERO, threshold).map(|low| low.balance), Some(U256::ZERO));
        assert_eq!(check(threshold, threshold), None);
        assert_eq!(check(U256::MAX, threshold), None);
    }

    #[tokio::test]
    async fn guard_reports_low_balance() {
        let mut chain = MockChainRead::new();
        chain.expect_balance().returning(|| Ok(U256::from(5)));
        chain.expect_account().returning(|| Address::repeat_byte(1));

        let guard = BalanceGuard::new(Arc::new(chain), LOW_BALANCE_THRESHOLD);
        assert!(guard.run().await.is_some());
    }

    #[tokio::test]
    async fn guard_survives_query_failure() {
        let mut chain = MockChainRead::new();
        chain
            .expect_balance()
            .returning(|| Err(anyhow!("connection refused")));

        let guard = BalanceGuard::new(Arc::new(chain), LOW_BALANCE_THRESHOLD);
        assert_eq!(guard.run().await, None);
    }
}
