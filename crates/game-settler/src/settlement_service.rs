use {
    crate::{
        burn,
        contracts::{LeaguePoolByAddress, LeaguePoolByName, TeamToken},
        feed::{CompetitorRecord, EventSnapshot},
        gas::GasStrategy,
        metrics::Metrics,
        notifier::{Announcement, Notifier},
        outcome::{self, Outcome},
        targets::{SettlementTarget, SettlementTargets, TargetId},
        traits::{ChainRead, ChainWrite, SettlementReceipt, TransactionIntent},
    },
    alloy::primitives::{Address, B256, U256},
    anyhow::{Context, Result, ensure},
    std::{collections::HashSet, sync::Arc},
};

/// What happened to the buy-back that follows a successful settlement. None
/// of these affect the settlement itself.
#[derive(Debug)]
pub enum SecondaryOutcome {
    /// The winning target has no token contract configured.
    Skipped,
    /// Expected whenever the token's buy-back preconditions aren't met yet.
    Failed(anyhow::Error),
    Burned { tx_hash: B256, quantity: U256 },
}

/// Counters of a single poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Games settled with a confirmed transaction.
    pub settled: usize,
    /// Games that were already final when the settler started.
    pub baseline: usize,
    /// Final games that can't be settled (tie, bad scores, no target).
    pub skipped: usize,
    /// Final games whose settlement transaction failed.
    pub failed: usize,
}

pub struct SettlementService {
    chain: Arc<dyn ChainRead>,
    submitter: Arc<dyn ChainWrite>,
    gas: GasStrategy,
    targets: SettlementTargets,
    notifier: Notifier,
    settlement_contract: Address,
    sink: Address,
    /// Games settled by this process. Entries are never removed.
    settled: HashSet<String>,
    /// Whether the games that were final before startup have been recorded.
    baseline_established: bool,
}

impl SettlementService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn ChainRead>,
        submitter: Arc<dyn ChainWrite>,
        gas: GasStrategy,
        targets: SettlementTargets,
        notifier: Notifier,
        settlement_contract: Address,
        sink: Address,
    ) -> Self {
        Self {
            chain,
            submitter,
            gas,
            targets,
            notifier,
            settlement_contract,
            sink,
            settled: HashSet::new(),
            baseline_established: false,
        }
    }

    pub fn is_settled(&self, id: &str) -> bool {
        self.settled.contains(id)
    }

    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }

    /// Settles every game of the snapshot that became final since the last
    /// cycle. Games are handled one after the other in snapshot order.
    ///
    /// The first cycle only records the games that are already final so a
    /// restart doesn't settle games a second time.
    pub async fn process_cycle(&mut self, snapshots: &[EventSnapshot]) -> CycleSummary {
        let mut summary = CycleSummary::default();
        let establishing_baseline = !self.baseline_established;

        for snapshot in snapshots {
            if !snapshot.completed || self.settled.contains(&snapshot.id) {
                continue;
            }

            if establishing_baseline {
                tracing::info!(
                    id = %snapshot.id,
                    game = %snapshot.name,
                    "game was final before startup, not settling"
                );
                self.settled.insert(snapshot.id.clone());
                summary.baseline += 1;
                continue;
            }

            let Some((winner, target)) = self.target_of(snapshot) else {
                summary.skipped += 1;
                continue;
            };
            match self.settle(snapshot, winner, target).await {
                Ok(secondary) => {
                    tracing::debug!(id = %snapshot.id, ?secondary, "game settled");
                    self.settled.insert(snapshot.id.clone());
                    Metrics::get().settlement("success");
                    summary.settled += 1;
                }
                Err(err) => {
                    tracing::error!(?err, id = %snapshot.id, "failed to settle game");
                    Metrics::get().settlement("failed");
                    summary.failed += 1;
                }
            }
        }

        if establishing_baseline {
            self.baseline_established = true;
            tracing::info!(
                already_final = summary.baseline,
                "recorded games that were final before startup"
            );
        }
        summary
    }

    /// Winner and settlement target of a final game, logging why there is
    /// none otherwise.
    fn target_of<'a>(
        &'a self,
        snapshot: &'a EventSnapshot,
    ) -> Option<(&'a CompetitorRecord, &'a SettlementTarget)> {
        let winner = match outcome::resolve(snapshot) {
            Outcome::Winner(winner) => winner,
            Outcome::Tie => {
                tracing::debug!(id = %snapshot.id, game = %snapshot.name, "game ended in a tie");
                Metrics::get().skipped("tie");
                return None;
            }
            Outcome::Undecidable => {
                tracing::debug!(id = %snapshot.id, game = %snapshot.name, "no usable scores");
                Metrics::get().skipped("undecidable");
                return None;
            }
            Outcome::Pending => return None,
        };
        let Some(target) = self.targets.target(&winner.display_name) else {
            tracing::error!(
                id = %snapshot.id,
                winner = %winner.display_name,
                "no settlement target configured for winner"
            );
            Metrics::get().skipped("missing_target");
            return None;
        };
        Some((winner, target))
    }

    /// Forwards the fees to the winner's target. Only an error of this
    /// primary transaction fails the settlement, the buy-back is best-effort.
    async fn settle(
        &self,
        snapshot: &EventSnapshot,
        winner: &CompetitorRecord,
        target: &SettlementTarget,
    ) -> Result<SecondaryOutcome> {
        tracing::info!(
            id = %snapshot.id,
            game = %snapshot.name,
            winner = %winner.display_name,
            target = %target.identifier,
            "settling completed game"
        );
        let receipt = self.forward_fees(&target.identifier).await?;

        let secondary = self.buyback(target).await;
        if let SecondaryOutcome::Burned { tx_hash, quantity } = &secondary {
            tracing::info!(?tx_hash, %quantity, "buy-back burned tokens");
            self.notifier
                .announce(&Announcement {
                    game: snapshot.name.clone(),
                    winner: winner.display_name.clone(),
                    tx_hash: receipt.tx_hash,
                    burned: *quantity,
                })
                .await;
        }
        Ok(secondary)
    }

    async fn forward_fees(&self, identifier: &TargetId) -> Result<SettlementReceipt> {
        let intent = match identifier {
            TargetId::Name(name) => TransactionIntent::new(
                self.settlement_contract,
                &LeaguePoolByName::forwardFeesToBCCall {
                    tokenName: name.clone(),
                },
                "forwardFeesToBC",
            ),
            TargetId::Address(token) => TransactionIntent::new(
                self.settlement_contract,
                &LeaguePoolByAddress::forwardFeesToBCCall { token: *token },
                "forwardFeesToBC",
            ),
        };
        self.execute(&intent).await
    }

    async fn buyback(&self, target: &SettlementTarget) -> SecondaryOutcome {
        let Some(token) = target.secondary_contract else {
            return SecondaryOutcome::Skipped;
        };
        match self.try_buyback(token).await {
            Ok((tx_hash, quantity)) => {
                Metrics::get().secondary_action("success");
                SecondaryOutcome::Burned { tx_hash, quantity }
            }
            Err(err) => {
                tracing::warn!(?err, %token, "buy-back not executed");
                Metrics::get().secondary_action("failed");
                SecondaryOutcome::Failed(err)
            }
        }
    }

    async fn try_buyback(&self, token: Address) -> Result<(B256, U256)> {
        let intent = TransactionIntent::new(
            token,
            &TeamToken::buybackAndBurnCall {},
            "buybackAndBurn",
        );
        let receipt = self.execute(&intent).await?;
        let decimals = self
            .chain
            .decimals(token)
            .await
            .context("failed to read token decimals")?;
        let quantity = burn::burned_quantity(&receipt.logs, token, self.sink, decimals);
        Ok((receipt.tx_hash, quantity))
    }

    /// Prices, submits and waits for the transaction. Reverted transactions
    /// are errors.
    async fn execute(&self, intent: &TransactionIntent) -> Result<SettlementReceipt> {
        let fees = self.gas.price(intent).await?;
        let tx_hash = self
            .submitter
            .submit(intent, fees)
            .await
            .with_context(|| format!("failed to submit {}", intent.label))?;
        tracing::info!(
            call = intent.label,
            ?tx_hash,
            gas_limit = ?fees.gas_limit,
            gas_price = fees.gas_price,
            "transaction sent, waiting for confirmation"
        );
        let receipt = self
            .submitter
            .confirm(tx_hash)
            .await
            .with_context(|| format!("failed to confirm {}", intent.label))?;
        ensure!(receipt.success, "{} transaction {tx_hash} reverted", intent.label);
        tracing::info!(
            call = intent.label,
            ?tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "transaction confirmed"
        );
        Ok(receipt)
    }
}
