use alloy::primitives::{U256, utils::format_units};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "game_settler")]
pub struct Metrics {
    /// Settlement attempts by result.
    #[metric(labels("result"))]
    settlements: prometheus::IntCounterVec,

    /// Buy-back attempts by result.
    #[metric(labels("result"))]
    secondary_actions: prometheus::IntCounterVec,

    /// Completed games that could not be settled, by reason.
    #[metric(labels("reason"))]
    skipped_events: prometheus::IntCounterVec,

    /// Number of finished poll cycles.
    cycles: prometheus::IntCounter,

    /// Native balance of the operating account.
    operator_balance: prometheus::Gauge,
}

impl Metrics {
    pub fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    pub fn settlement(&self, result: &str) {
        self.settlements.with_label_values(&[result]).inc();
    }

    pub fn secondary_action(&self, result: &str) {
        self.secondary_actions.with_label_values(&[result]).inc();
    }

    pub fn skipped(&self, reason: &str) {
        self.skipped_events.with_label_values(&[reason]).inc();
    }

    pub fn cycle(&self) {
        self.cycles.inc();
    }

    /// Balance in whole native units. Unrepresentable balances are reported
    /// as NaN rather than as a plausible value.
    pub fn record_balance(&self, balance: U256) {
        self.operator_balance.set(as_native_units(balance));
    }
}

fn as_native_units(balance: U256) -> f64 {
    format_units(balance, "ether")
        .ok()
        .and_then(|balance| balance.parse().ok())
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::utils::parse_ether};

    #[test]
    fn converts_balance_to_native_units() {
        assert_eq!(as_native_units(parse_ether("0.5").unwrap()), 0.5);
        assert_eq!(as_native_units(U256::ZERO), 0.0);
        assert!(as_native_units(U256::MAX).is_finite());
    }
}
