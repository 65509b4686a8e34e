pub mod arguments;
pub mod balance;
pub mod burn;
pub mod chain;
pub mod contracts;
pub mod feed;
pub mod gas;
mod metrics;
pub mod notifier;
pub mod outcome;
pub mod settlement_service;
mod shutdown;
pub mod targets;
pub mod traits;

use {
    arguments::Arguments,
    balance::{BalanceGuard, LOW_BALANCE_THRESHOLD},
    chain::AlloyChain,
    clap::Parser,
    feed::EspnScoreboard,
    gas::GasStrategy,
    notifier::{Notifier, XAnnouncer, XCredentials},
    observe::metrics::LivenessChecking,
    settlement_service::{CycleSummary, SettlementService},
    std::{
        sync::{Arc, RwLock},
        time::{Duration, Instant},
    },
    targets::SettlementTargets,
    traits::{ChainRead, ScoreFeed},
};

/// Upper bound for a single cycle. Cycles wait for every transaction to be
/// mined, so this is generous.
const MAX_CYCLE_DURATION: Duration = Duration::from_secs(30 * 60);

struct Liveness {
    max_cycle_age: Duration,
    last_cycle_time: RwLock<Instant>,
}

#[async_trait::async_trait]
impl LivenessChecking for Liveness {
    async fn is_alive(&self) -> bool {
        let last_cycle_time = self.last_cycle_time.read().unwrap();
        last_cycle_time.elapsed() <= self.max_cycle_age
    }
}

impl Liveness {
    fn new(max_cycle_age: Duration) -> Self {
        Self {
            max_cycle_age,
            last_cycle_time: RwLock::new(Instant::now()),
        }
    }

    fn cycle(&self) {
        *self.last_cycle_time.write().unwrap() = Instant::now();
    }
}

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    let obs_config = observe::Config::new(
        &args.logging.log_filter,
        args.logging.log_stderr_threshold,
        args.logging.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    observe::metrics::setup_registry(None, None);
    tracing::info!("running game settler with validated arguments:\n{}", args);
    run(args).await;
}

/// Assumes tracing and metrics registry have already been set up.
pub async fn run(args: Arguments) {
    let targets = SettlementTargets::from_path(&args.targets_path)
        .await
        .expect("failed to load settlement targets");
    let chain = Arc::new(
        AlloyChain::new(&args.node_url, &args.private_key).expect("failed to set up node access"),
    );
    let feed = EspnScoreboard::new(args.scoreboard_url.clone(), args.http_timeout)
        .expect("failed to create scoreboard client");
    let notifier = notifier(&args);

    tracing::info!(
        account = %chain.account(),
        settlement_contract = %args.settlement_contract,
        targets = targets.len(),
        identifier_kind = ?targets.kind(),
        gas_strategy = ?args.gas_strategy,
        announcements = notifier.is_enabled(),
        "starting settlement loop"
    );

    let liveness = Arc::new(Liveness::new(args.poll_interval() + MAX_CYCLE_DURATION));
    observe::metrics::serve_metrics(liveness.clone(), args.metrics_address);

    let balance_guard = BalanceGuard::new(chain.clone(), LOW_BALANCE_THRESHOLD);
    balance_guard.run().await;

    let mut service = SettlementService::new(
        chain.clone(),
        chain.clone(),
        GasStrategy::new(chain, args.gas_strategy, args.fallback_gas_price_wei),
        targets,
        notifier,
        args.settlement_contract,
        args.sink_address,
    );

    // Spawned so signals arriving mid-cycle are not lost.
    let mut shutdown = tokio::spawn(shutdown::signal_handler());
    loop {
        cycle(&feed, &mut service, &balance_guard).await;
        liveness.cycle();
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(args.poll_interval()) => (),
        }
    }
    tracing::info!(settled = service.settled_count(), "settlement loop stopped");
}

fn notifier(args: &Arguments) -> Notifier {
    let announcements = &args.announcements;
    let Some(credentials) = XCredentials::from_parts(
        announcements.x_consumer_key.clone(),
        announcements.x_consumer_secret.clone(),
        announcements.x_access_token.clone(),
        announcements.x_access_token_secret.clone(),
    ) else {
        tracing::info!("no X credentials, announcements are disabled");
        return Notifier::disabled();
    };
    let announcer = XAnnouncer::new(
        credentials,
        announcements.explorer_url.clone(),
        args.http_timeout,
    )
    .expect("failed to create X client");
    Notifier::new(Arc::new(announcer))
}

async fn cycle(
    feed: &dyn ScoreFeed,
    service: &mut SettlementService,
    balance_guard: &BalanceGuard,
) -> CycleSummary {
    tracing::debug!("starting a new settlement cycle");
    let snapshots = feed.fetch().await;
    let summary = service.process_cycle(&snapshots).await;
    balance_guard.run().await;
    metrics::Metrics::get().cycle();
    tracing::info!(
        games = snapshots.len(),
        settled = summary.settled,
        already_final = summary.baseline,
        skipped = summary.skipped,
        failed = summary.failed,
        "settlement cycle finished"
    );
    summary
}
