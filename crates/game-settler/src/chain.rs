use {
    crate::{
        contracts::TeamToken,
        traits::{ChainRead, ChainWrite, FeeParameters, SettlementReceipt, TransactionIntent},
    },
    alloy::{
        network::{EthereumWallet, TransactionBuilder},
        primitives::{Address, B256, U256},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
        signers::local::PrivateKeySigner,
    },
    anyhow::{Context, Result},
    std::time::Duration,
    url::Url,
};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Node access through a signing alloy provider.
pub struct AlloyChain {
    provider: DynProvider,
    account: Address,
}

impl AlloyChain {
    pub fn new(node_url: &Url, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("private key is not a valid hex encoded secp256k1 key")?;
        let account = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_http(node_url.clone())
            .erased();
        Ok(Self { provider, account })
    }

    fn request(&self, intent: &TransactionIntent) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.account)
            .with_to(intent.to)
            .with_input(intent.calldata.clone())
    }
}

#[async_trait::async_trait]
impl ChainRead for AlloyChain {
    fn account(&self) -> Address {
        self.account
    }

    async fn balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.account)
            .await
            .context("failed to get balance")
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .context("failed to get gas price")
    }

    async fn estimate_gas(&self, intent: &TransactionIntent) -> Result<u64> {
        self.provider
            .estimate_gas(self.request(intent))
            .await
            .context("failed to estimate gas")
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        TeamToken::new(token, &self.provider)
            .decimals()
            .call()
            .await
            .context("failed to call decimals()")
    }
}

#[async_trait::async_trait]
impl ChainWrite for AlloyChain {
    async fn submit(&self, intent: &TransactionIntent, fees: FeeParameters) -> Result<B256> {
        let mut request = self.request(intent).with_gas_price(fees.gas_price);
        if let Some(gas_limit) = fees.gas_limit {
            request = request.with_gas_limit(gas_limit);
        }
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .context("failed to send transaction")?;
        Ok(*pending.tx_hash())
    }

    async fn confirm(&self, tx_hash: B256) -> Result<SettlementReceipt> {
        // Node errors must not end the wait, the transaction is already out.
        let receipt = loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => break receipt,
                Ok(None) => (),
                Err(err) => tracing::warn!(?err, ?tx_hash, "failed to query receipt"),
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        };
        Ok(SettlementReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success: receipt.status(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        })
    }
}
