// The settler uses one of two interchangeable pricing policies:
//
// - estimate-and-buffer: simulate the exact call, add a 20% safety margin to
//   the estimated gas units and pay the node's current gas price as is.
// - network-price: pay the node's current gas price and leave the gas limit to
//   the node.
//
// In both cases a failing gas price query is replaced by a fixed conservative
// price instead of aborting the settlement.

use {
    crate::traits::{ChainRead, FeeParameters, TransactionIntent},
    anyhow::{Context, Result},
    std::sync::Arc,
};

/// 1 gwei.
pub const DEFAULT_FALLBACK_GAS_PRICE: u128 = 1_000_000_000;

// Estimated gas units get multiplied by GAS_LIMIT_BUFFER_PERCENT / 100.
const GAS_LIMIT_BUFFER_PERCENT: u64 = 120;

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GasPolicy {
    EstimateAndBuffer,
    NetworkPrice,
}

pub struct GasStrategy {
    chain: Arc<dyn ChainRead>,
    policy: GasPolicy,
    fallback_gas_price: u128,
}

impl GasStrategy {
    pub fn new(chain: Arc<dyn ChainRead>, policy: GasPolicy, fallback_gas_price: u128) -> Self {
        Self {
            chain,
            policy,
            fallback_gas_price,
        }
    }

    /// Decides the fee parameters of the transaction.
    ///
    /// Only fails if the gas units of the call can't be estimated under
    /// [`GasPolicy::EstimateAndBuffer`], which usually means the call would
    /// revert.
    pub async fn price(&self, intent: &TransactionIntent) -> Result<FeeParameters> {
        let gas_limit = match self.policy {
            GasPolicy::EstimateAndBuffer => {
                let estimate = self
                    .chain
                    .estimate_gas(intent)
                    .await
                    .with_context(|| format!("failed to estimate gas of {}", intent.label))?;
                let gas_limit = buffered_gas_limit(estimate);
                tracing::debug!(call = intent.label, estimate, gas_limit, "estimated gas");
                Some(gas_limit)
            }
            GasPolicy::NetworkPrice => None,
        };
        Ok(FeeParameters {
            gas_limit,
            gas_price: self.network_gas_price().await,
        })
    }

    async fn network_gas_price(&self) -> u128 {
        match self.chain.gas_price().await {
            Ok(gas_price) => gas_price,
            Err(err) => {
                tracing::warn!(
                    ?err,
                    fallback = self.fallback_gas_price,
                    "failed to query gas price, using fallback"
                );
                self.fallback_gas_price
            }
        }
    }
}

fn buffered_gas_limit(estimate: u64) -> u64 {
    let buffered = u128::from(estimate) * u128::from(GAS_LIMIT_BUFFER_PERCENT) / 100;
    u64::try_from(buffered).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::traits::MockChainRead,
        alloy::primitives::{Address, Bytes},
        anyhow::anyhow,
    };

    fn intent() -> TransactionIntent {
        TransactionIntent {
            to: Address::repeat_byte(1),
            calldata: Bytes::from_static(&[1, 2, 3, 4]),
            label: "test",
        }
    }

    #[test]
    fn buffers_gas_limit_by_twenty_percent() {
        assert_eq!(buffered_gas_limit(100_000), 120_000);
        assert_eq!(buffered_gas_limit(21_001), 25_201);
        assert_eq!(buffered_gas_limit(0), 0);
        // Never below the estimate, even when the buffer doesn't fit.
        assert_eq!(buffered_gas_limit(u64::MAX), u64::MAX);
        assert_eq!(buffered_gas_limit(u64::MAX / 2), u64::MAX);
        assert_eq!(buffered_gas_limit(u64::MAX / 120 * 100), u64::MAX / 120 * 120);
    }

    #[tokio::test]
    async fn estimate_and_buffer() {
        let mut chain = MockChainRead::new();
        chain
            .expect_estimate_gas()
            .times(1)
            .withf(|intent| intent.label == "test")
            .returning(|_| Ok(50_000));
        chain
            .expect_gas_price()
            .times(1)
            .returning(|| Ok(3_000_000_000));

        let strategy = GasStrategy::new(
            Arc::new(chain),
            GasPolicy::EstimateAndBuffer,
            DEFAULT_FALLBACK_GAS_PRICE,
        );
        let fees = strategy.price(&intent()).await.unwrap();
        assert_eq!(
            fees,
            FeeParameters {
                gas_limit: Some(60_000),
                gas_price: 3_000_000_000,
            }
        );
    }

    #[tokio::test]
    async fn failed_estimation_is_an_error() {
        let mut chain = MockChainRead::new();
        chain
            .expect_estimate_gas()
            .returning(|_| Err(anyhow!("execution reverted")));
        chain.expect_gas_price().never();

        let strategy = GasStrategy::new(
            Arc::new(chain),
            GasPolicy::EstimateAndBuffer,
            DEFAULT_FALLBACK_GAS_PRICE,
        );
        assert!(strategy.price(&intent()).await.is_err());
    }

    #[tokio::test]
    async fn network_price() {
        let mut chain = MockChainRead::new();
        chain.expect_estimate_gas().never();
        chain.expect_gas_price().returning(|| Ok(7));

        let strategy = GasStrategy::new(
            Arc::new(chain),
            GasPolicy::NetworkPrice,
            DEFAULT_FALLBACK_GAS_PRICE,
        );
        assert_eq!(
            strategy.price(&intent()).await.unwrap(),
            FeeParameters {
                gas_limit: None,
                gas_price: 7,
            }
        );
    }

    #[tokio::test]
    async fn network_price_falls_back_on_query_failure() {
        let mut chain = MockChainRead::new();
        chain
            .expect_gas_price()
            .returning(|| Err(anyhow!("connection refused")));

        let strategy = GasStrategy::new(
            Arc::new(chain),
            GasPolicy::NetworkPrice,
            DEFAULT_FALLBACK_GAS_PRICE,
        );
        let fees = strategy.price(&intent()).await.unwrap();
        assert_eq!(fees.gas_price, 1_000_000_000);
        assert_eq!(fees.gas_limit, None);
    }

    #[tokio::test]
    async fn estimate_and_buffer_falls_back_on_price_query_failure() {
        let mut chain = MockChainRead::new();
        chain.expect_estimate_gas().returning(|_| Ok(1_000));
        chain
            .expect_gas_price()
            .returning(|| Err(anyhow!("connection refused")));

        let strategy = GasStrategy::new(Arc::new(chain), GasPolicy::EstimateAndBuffer, 42);
        assert_eq!(
            strategy.price(&intent()).await.unwrap(),
            FeeParameters {
                gas_limit: Some(1_200),
                gas_price: 42,
            }
        );
    }
}
